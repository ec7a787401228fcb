/*
 * Copyright (C) 2023 Asim Ihsan
 * SPDX-License-Identifier: AGPL-3.0-only
 *
 * This program is free software: you can redistribute it and/or modify it under
 * the terms of the GNU Affero General Public License as published by the Free
 * Software Foundation, version 3.
 *
 * This program is distributed in the hope that it will be useful, but WITHOUT ANY
 * WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A
 * PARTICULAR PURPOSE. See the GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License along
 * with this program. If not, see <https://www.gnu.org/licenses/>
 */

//! Q-learning with a linear function approximator.
//!
//! See Chapter 22, Reinforcement Learning, section 22.4.2 (approximating Q-functions). The
//! Q-function is `Q(s, a) = sum of w_f * f(s, a)` over named features `f`, so the learner only
//! keeps one weight per feature no matter how large the state space is.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use rand::seq::SliceRandom;
use rand::Rng as _;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub type Float = f64;
pub type Rng = rand_pcg::Pcg64;

/// Bumped whenever the weights file layout changes.
pub const WEIGHTS_FILE_VERSION: u32 = 1;

/// Learner error.
#[derive(Debug, thiserror::Error)]
pub enum LearningError {
    /// Reading or writing a weights file failed.
    #[error("weights file i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// A weights file could not be encoded or decoded.
    #[error("weights file is malformed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A weights file was written by an incompatible version.
    #[error("weights file version {found} is not supported, expected {expected}")]
    UnsupportedVersion { expected: u32, found: u32 },

    /// A weights file holds a different set of features than the environment provides.
    #[error("weights file has features {found}, environment has {expected}")]
    FeatureMismatch { expected: String, found: String },
}

/// Outcome of one environment step.
#[derive(Debug, Clone, PartialEq)]
pub struct Step<_State> {
    pub state: _State,
    pub reward: Float,
    pub terminal: bool,
}

/// An episodic environment the learner can play in and describe with features.
pub trait LearningEnvironment {
    type State: Clone;
    type Action: Copy + PartialEq + Debug;
    type Feature: Clone + Ord + Debug + Serialize + DeserializeOwned;

    /// Start a new episode and return its first state.
    fn reset(&mut self) -> Self::State;

    /// Take `action` in the current state.
    fn step(&mut self, action: Self::Action) -> Step<Self::State>;

    fn legal_actions(&self, state: &Self::State) -> Vec<Self::Action>;
    fn is_terminal(&self, state: &Self::State) -> bool;
    fn features(&self, state: &Self::State, action: Self::Action) -> BTreeMap<Self::Feature, Float>;

    /// Every feature `features` may return.
    fn feature_names(&self) -> Vec<Self::Feature>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LearnerConfig {
    pub episodes: usize,

    /// Learning rate.
    pub alpha: Float,

    /// Exploration rate of the first training episode.
    pub epsilon: Float,

    /// Exploration rate of the last training episode. The rate falls linearly in between, so
    /// setting this to `epsilon` keeps it constant.
    pub final_epsilon: Float,

    pub discount: Float,

    /// An episode that has not ended after this many steps is cut short.
    pub max_steps_per_episode: usize,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            episodes: 1000,
            alpha: 0.1,
            epsilon: 0.7,
            final_epsilon: 0.05,
            discount: 0.5,
            max_steps_per_episode: 1000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingReport {
    pub episodes: usize,
    pub steps: usize,
    /// Episodes cut short by `max_steps_per_episode`.
    pub capped_episodes: usize,
    /// Undiscounted reward of every episode.
    pub returns: Vec<Float>,
}

#[derive(Serialize, Deserialize)]
struct WeightsFile<_Feature> {
    version: u32,
    weights: Vec<(_Feature, Float)>,
}

/// Linear approximate Q-learner.
pub struct ApproxQLearner<_Feature: Ord> {
    weights: BTreeMap<_Feature, Float>,
    config: LearnerConfig,
    rng: Rc<RefCell<Rng>>,
}

impl<_Feature> ApproxQLearner<_Feature>
where
    _Feature: Clone + Ord + Debug + Serialize + DeserializeOwned,
{
    /// New learner with every weight at zero.
    pub fn new(
        feature_names: Vec<_Feature>,
        config: LearnerConfig,
        rng: Rc<RefCell<Rng>>,
    ) -> Self {
        Self {
            weights: feature_names.into_iter().map(|name| (name, 0.0)).collect(),
            config,
            rng,
        }
    }

    pub fn weights(&self) -> &BTreeMap<_Feature, Float> {
        &self.weights
    }

    pub fn weight(&self, feature: &_Feature) -> Float {
        self.weights.get(feature).copied().unwrap_or(0.0)
    }

    pub fn config(&self) -> &LearnerConfig {
        &self.config
    }

    /// Same weights, drawing ties and exploration from `rng` from now on.
    pub fn with_rng(mut self, rng: Rc<RefCell<Rng>>) -> Self {
        self.rng = rng;
        self
    }

    /// Exploration rate used in training episode `episode`.
    pub fn exploration_rate(&self, episode: usize) -> Float {
        let last = self.config.episodes.saturating_sub(1);
        if last == 0 {
            return self.config.epsilon;
        }
        let progress = episode.min(last) as Float / last as Float;
        self.config.epsilon + (self.config.final_epsilon - self.config.epsilon) * progress
    }

    pub fn q_value<_Env>(&self, env: &_Env, state: &_Env::State, action: _Env::Action) -> Float
    where
        _Env: LearningEnvironment<Feature = _Feature>,
    {
        env.features(state, action)
            .iter()
            .map(|(feature, value)| self.weight(feature) * value)
            .sum()
    }

    /// max over legal a of Q(s, a); zero for terminal states and states without legal actions.
    pub fn value<_Env>(&self, env: &_Env, state: &_Env::State) -> Float
    where
        _Env: LearningEnvironment<Feature = _Feature>,
    {
        if env.is_terminal(state) {
            return 0.0;
        }
        env.legal_actions(state)
            .into_iter()
            .map(|action| self.q_value(env, state, action))
            .fold(None, |best: Option<Float>, q| Some(best.map_or(q, |best| best.max(q))))
            .unwrap_or(0.0)
    }

    /// Greedy action. Ties are broken uniformly at random.
    pub fn best_action<_Env>(&self, env: &_Env, state: &_Env::State) -> Option<_Env::Action>
    where
        _Env: LearningEnvironment<Feature = _Feature>,
    {
        let scored: Vec<(_Env::Action, Float)> = env
            .legal_actions(state)
            .into_iter()
            .map(|action| (action, self.q_value(env, state, action)))
            .collect();
        let best = scored
            .iter()
            .map(|(_, q)| *q)
            .fold(Float::NEG_INFINITY, Float::max);
        let maximizers: Vec<_Env::Action> = scored
            .into_iter()
            .filter(|(_, q)| *q == best)
            .map(|(action, _)| action)
            .collect();
        maximizers.choose(&mut *self.rng.borrow_mut()).copied()
    }

    /// Epsilon-greedy action: a uniform legal action with probability `epsilon`, the greedy one
    /// otherwise.
    pub fn choose_action<_Env>(
        &self,
        env: &_Env,
        state: &_Env::State,
        epsilon: Float,
    ) -> Option<_Env::Action>
    where
        _Env: LearningEnvironment<Feature = _Feature>,
    {
        let explore = self.rng.borrow_mut().gen::<Float>() < epsilon;
        if explore {
            env.legal_actions(state)
                .choose(&mut *self.rng.borrow_mut())
                .copied()
        } else {
            self.best_action(env, state)
        }
    }

    /// One temporal-difference update after taking `action` in `state`:
    /// `w_f += alpha * (r + gamma * V(s') - Q(s, a)) * f(s, a)`, where V(s') is zero if the
    /// step ended the episode.
    pub fn update<_Env>(
        &mut self,
        env: &_Env,
        state: &_Env::State,
        action: _Env::Action,
        step: &Step<_Env::State>,
    ) where
        _Env: LearningEnvironment<Feature = _Feature>,
    {
        let future = if step.terminal {
            0.0
        } else {
            self.value(env, &step.state)
        };
        let features = env.features(state, action);
        let current: Float = features
            .iter()
            .map(|(feature, value)| self.weight(feature) * value)
            .sum();
        let difference = step.reward + self.config.discount * future - current;
        for (feature, value) in features {
            *self.weights.entry(feature).or_insert(0.0) += self.config.alpha * difference * value;
        }
    }

    /// Play `config.episodes` episodes with epsilon-greedy actions, updating after every step.
    #[tracing::instrument(level = "info", skip_all, fields(episodes = self.config.episodes))]
    pub fn train<_Env>(&mut self, env: &mut _Env) -> TrainingReport
    where
        _Env: LearningEnvironment<Feature = _Feature>,
    {
        let mut report = TrainingReport::default();
        for episode in 0..self.config.episodes {
            let epsilon = self.exploration_rate(episode);
            let mut state = env.reset();
            let mut steps = 0;
            let mut total_reward = 0.0;
            while !env.is_terminal(&state) {
                if steps >= self.config.max_steps_per_episode {
                    report.capped_episodes += 1;
                    tracing::debug!(episode, steps, "episode hit the step cap");
                    break;
                }
                let Some(action) = self.choose_action(env, &state, epsilon) else {
                    break;
                };
                let step = env.step(action);
                self.update(env, &state, action, &step);
                total_reward += step.reward;
                steps += 1;
                let terminal = step.terminal;
                state = step.state;
                if terminal {
                    break;
                }
            }
            tracing::debug!(episode, epsilon, steps, total_reward, "training episode");
            report.steps += steps;
            report.returns.push(total_reward);
            report.episodes += 1;
        }
        if report.capped_episodes > 0 {
            tracing::warn!(
                capped = report.capped_episodes,
                "some training episodes hit the step cap"
            );
        }
        tracing::info!(steps = report.steps, weights = ?self.weights, "training finished");
        report
    }

    pub fn to_json(&self) -> Result<String, LearningError> {
        let file = WeightsFile {
            version: WEIGHTS_FILE_VERSION,
            weights: self
                .weights
                .iter()
                .map(|(feature, weight)| (feature.clone(), *weight))
                .collect(),
        };
        Ok(serde_json::to_string(&file)?)
    }

    /// Learner with the weights stored in `json`. Fails unless they cover exactly
    /// `feature_names`.
    pub fn from_json(
        json: &str,
        feature_names: Vec<_Feature>,
        config: LearnerConfig,
        rng: Rc<RefCell<Rng>>,
    ) -> Result<Self, LearningError> {
        let file: WeightsFile<_Feature> = serde_json::from_str(json)?;
        if file.version != WEIGHTS_FILE_VERSION {
            return Err(LearningError::UnsupportedVersion {
                expected: WEIGHTS_FILE_VERSION,
                found: file.version,
            });
        }
        let weights: BTreeMap<_Feature, Float> = file.weights.into_iter().collect();
        let mut expected = feature_names;
        expected.sort();
        expected.dedup();
        let found: Vec<_Feature> = weights.keys().cloned().collect();
        if found != expected {
            return Err(LearningError::FeatureMismatch {
                expected: format!("{:?}", expected),
                found: format!("{:?}", found),
            });
        }
        Ok(Self {
            weights,
            config,
            rng,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), LearningError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_json()?)?;
        tracing::debug!(path = %path.display(), "saved weights");
        Ok(())
    }

    pub fn load(
        path: &Path,
        feature_names: Vec<_Feature>,
        config: LearnerConfig,
        rng: Rc<RefCell<Rng>>,
    ) -> Result<Self, LearningError> {
        let json = fs::read_to_string(path)?;
        let learner = Self::from_json(&json, feature_names, config, rng)?;
        tracing::debug!(path = %path.display(), "loaded weights");
        Ok(learner)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;
    use rand::SeedableRng;

    use super::*;
    use crate::Rng;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
    enum ChainFeature {
        Bias,
        Forward,
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Move {
        Back,
        Forward,
    }

    /// Cells 0..=goal. Every step costs 1; reaching the goal pays `goal_reward` instead.
    struct Chain {
        position: u8,
        goal: u8,
        goal_reward: Float,
    }

    impl Chain {
        fn new(goal: u8) -> Self {
            Self {
                position: 0,
                goal,
                goal_reward: 10.0,
            }
        }
    }

    impl LearningEnvironment for Chain {
        type State = u8;
        type Action = Move;
        type Feature = ChainFeature;

        fn reset(&mut self) -> u8 {
            self.position = 0;
            0
        }

        fn step(&mut self, action: Move) -> Step<u8> {
            self.position = match action {
                Move::Back => self.position.saturating_sub(1),
                Move::Forward => (self.position + 1).min(self.goal),
            };
            let terminal = self.position == self.goal;
            Step {
                state: self.position,
                reward: if terminal { self.goal_reward } else { -1.0 },
                terminal,
            }
        }

        fn legal_actions(&self, _state: &u8) -> Vec<Move> {
            vec![Move::Back, Move::Forward]
        }

        fn is_terminal(&self, state: &u8) -> bool {
            *state == self.goal
        }

        fn features(&self, _state: &u8, action: Move) -> BTreeMap<ChainFeature, Float> {
            BTreeMap::from([
                (ChainFeature::Bias, 1.0),
                (
                    ChainFeature::Forward,
                    if action == Move::Forward { 1.0 } else { 0.0 },
                ),
            ])
        }

        fn feature_names(&self) -> Vec<ChainFeature> {
            vec![ChainFeature::Bias, ChainFeature::Forward]
        }
    }

    fn rng() -> Rc<RefCell<Rng>> {
        Rc::new(RefCell::new(Rng::seed_from_u64(42)))
    }

    fn learner(env: &Chain, config: LearnerConfig) -> ApproxQLearner<ChainFeature> {
        ApproxQLearner::new(env.feature_names(), config, rng())
    }

    #[test]
    fn test_weights_start_at_zero() {
        let env = Chain::new(4);
        let learner = learner(&env, LearnerConfig::default());
        assert_eq!(learner.weights().len(), 2);
        assert!(learner.weights().values().all(|weight| *weight == 0.0));
        assert_abs_diff_eq!(learner.q_value(&env, &0, Move::Forward), 0.0);
    }

    #[test]
    fn test_single_update_from_zero_weights() {
        let mut env = Chain::new(4);
        let mut learner = learner(&env, LearnerConfig::default());
        let state = env.reset();
        let step = env.step(Move::Forward);
        learner.update(&env, &state, Move::Forward, &step);
        // diff = -1 + 0.5 * 0 - 0, so every active feature moves by alpha * diff.
        assert_abs_diff_eq!(learner.weight(&ChainFeature::Bias), -0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(learner.weight(&ChainFeature::Forward), -0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_terminal_update_ignores_future() {
        let mut env = Chain::new(1);
        let mut learner = learner(&env, LearnerConfig::default());
        learner.weights.insert(ChainFeature::Bias, 5.0);
        let state = env.reset();
        let step = env.step(Move::Forward);
        assert!(step.terminal);
        learner.update(&env, &state, Move::Forward, &step);
        // diff = 10 - 5
        assert_abs_diff_eq!(learner.weight(&ChainFeature::Bias), 5.5, epsilon = 1e-12);
        assert_abs_diff_eq!(learner.weight(&ChainFeature::Forward), 0.5, epsilon = 1e-12);
    }

    proptest! {
        #[test]
        fn test_update_moves_every_active_weight_by_the_same_error(
            bias in -10.0..10.0f64,
            forward in -10.0..10.0f64,
            alpha in 0.0..1.0f64,
        ) {
            let mut env = Chain::new(4);
            let config = LearnerConfig { alpha, ..LearnerConfig::default() };
            let mut learner = learner(&env, config);
            learner.weights.insert(ChainFeature::Bias, bias);
            learner.weights.insert(ChainFeature::Forward, forward);

            let state = env.reset();
            let step = env.step(Move::Forward);
            learner.update(&env, &state, Move::Forward, &step);

            let future = bias.max(bias + forward);
            let difference = -1.0 + config.discount * future - (bias + forward);
            prop_assert!((learner.weight(&ChainFeature::Bias) - (bias + alpha * difference)).abs() < 1e-9);
            prop_assert!((learner.weight(&ChainFeature::Forward) - (forward + alpha * difference)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_value_is_max_q_and_zero_at_terminal() {
        let env = Chain::new(3);
        let mut learner = learner(&env, LearnerConfig::default());
        learner.weights.insert(ChainFeature::Bias, 1.0);
        learner.weights.insert(ChainFeature::Forward, 2.0);
        assert_abs_diff_eq!(learner.value(&env, &0), 3.0);
        assert_abs_diff_eq!(learner.value(&env, &3), 0.0);
        assert_eq!(learner.best_action(&env, &0), Some(Move::Forward));
    }

    #[test]
    fn test_ties_are_broken_at_random() {
        let env = Chain::new(3);
        let learner = learner(&env, LearnerConfig::default());
        let picks: Vec<Move> = (0..50)
            .filter_map(|_| learner.best_action(&env, &0))
            .collect();
        assert!(picks.contains(&Move::Back));
        assert!(picks.contains(&Move::Forward));
    }

    #[test]
    fn test_training_learns_to_move_forward() {
        let mut env = Chain::new(4);
        let config = LearnerConfig {
            episodes: 300,
            alpha: 0.05,
            epsilon: 0.3,
            final_epsilon: 0.3,
            discount: 0.9,
            max_steps_per_episode: 200,
        };
        let mut learner = learner(&env, config);
        let report = learner.train(&mut env);
        assert_eq!(report.episodes, 300);
        assert_eq!(report.returns.len(), 300);
        assert!(learner.weight(&ChainFeature::Forward) > 0.0);
        assert_eq!(learner.best_action(&env, &0), Some(Move::Forward));
    }

    #[test]
    fn test_exploration_falls_linearly() {
        let env = Chain::new(4);
        let config = LearnerConfig {
            episodes: 5,
            epsilon: 0.7,
            final_epsilon: 0.1,
            ..LearnerConfig::default()
        };
        let learner = learner(&env, config);
        assert_abs_diff_eq!(learner.exploration_rate(0), 0.7, epsilon = 1e-12);
        assert_abs_diff_eq!(learner.exploration_rate(2), 0.4, epsilon = 1e-12);
        assert_abs_diff_eq!(learner.exploration_rate(4), 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(learner.exploration_rate(9), 0.1, epsilon = 1e-12);

        let single = LearnerConfig {
            episodes: 1,
            ..config
        };
        assert_abs_diff_eq!(self::learner(&env, single).exploration_rate(0), 0.7);
    }

    #[test]
    fn test_greedy_choice_without_exploration() {
        let env = Chain::new(3);
        let mut learner = learner(&env, LearnerConfig::default());
        learner.weights.insert(ChainFeature::Forward, 1.0);
        for _ in 0..20 {
            assert_eq!(learner.choose_action(&env, &0, 0.0), Some(Move::Forward));
        }
        let picks: Vec<Move> = (0..50)
            .filter_map(|_| learner.choose_action(&env, &0, 1.0))
            .collect();
        assert!(picks.contains(&Move::Back));
    }

    #[test]
    fn test_step_cap_cuts_episodes_short() {
        let mut env = Chain::new(200);
        let config = LearnerConfig {
            episodes: 3,
            epsilon: 1.0,
            final_epsilon: 1.0,
            max_steps_per_episode: 5,
            ..LearnerConfig::default()
        };
        let mut learner = learner(&env, config);
        let report = learner.train(&mut env);
        assert_eq!(report.capped_episodes, 3);
        assert_eq!(report.steps, 15);
    }

    #[test]
    fn test_json_round_trip() {
        let mut env = Chain::new(4);
        let config = LearnerConfig {
            episodes: 20,
            ..LearnerConfig::default()
        };
        let mut trained = learner(&env, config);
        trained.train(&mut env);
        let json = trained.to_json().unwrap();
        let loaded =
            ApproxQLearner::from_json(&json, env.feature_names(), config, rng()).unwrap();
        assert_eq!(loaded.weights(), trained.weights());
    }

    #[test]
    fn test_save_and_load() {
        let env = Chain::new(4);
        let mut saved = learner(&env, LearnerConfig::default());
        saved.weights.insert(ChainFeature::Forward, 0.25);
        let path = std::env::temp_dir()
            .join(format!("approximate-q-learning-{}", std::process::id()))
            .join("weights.json");
        saved.save(&path).unwrap();
        let loaded =
            ApproxQLearner::load(&path, env.feature_names(), LearnerConfig::default(), rng())
                .unwrap();
        assert_eq!(loaded.weights(), saved.weights());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_load_rejects_other_features() {
        let env = Chain::new(4);
        let json = learner(&env, LearnerConfig::default()).to_json().unwrap();
        let result = ApproxQLearner::from_json(
            &json,
            vec![ChainFeature::Bias],
            LearnerConfig::default(),
            rng(),
        );
        assert!(matches!(result, Err(LearningError::FeatureMismatch { .. })));
    }

    #[test]
    fn test_load_rejects_missing_file() {
        let result = ApproxQLearner::<ChainFeature>::load(
            Path::new("/nonexistent/weights.json"),
            vec![ChainFeature::Bias],
            LearnerConfig::default(),
            rng(),
        );
        assert!(matches!(result, Err(LearningError::Io(_))));
    }
}
