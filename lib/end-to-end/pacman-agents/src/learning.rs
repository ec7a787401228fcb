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

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use approximate_q_learning::{
    ApproxQLearner, LearnerConfig, LearningEnvironment, LearningError, Step, TrainingReport,
};
use intelligent_agents::Agent;
use pacman_logic::{
    Action, Feature, Float, Game, GameState, GhostAgent, GhostTransitionTable, Rng,
    StochasticGhost, World,
};
use rand::SeedableRng;

/// A [`Game`] the approximate learner can train in. The reward of a step is the change in score
/// over the whole tick, time penalty included.
pub struct LearningGame {
    game: Game,
}

impl LearningGame {
    /// Game against one [`StochasticGhost`] per ghost start, all drawing from `rng`.
    pub fn new(world: Rc<World>, ghost_table: GhostTransitionTable, rng: Rc<RefCell<Rng>>) -> Self {
        let ghosts: Vec<GhostAgent> = (0..world.start().ghosts.len())
            .map(|index| {
                Box::new(StochasticGhost::new(
                    index,
                    Rc::clone(&world),
                    ghost_table,
                    Rc::clone(&rng),
                )) as GhostAgent
            })
            .collect();
        Self::with_ghosts(world, ghosts)
    }

    pub fn with_ghosts(world: Rc<World>, ghosts: Vec<GhostAgent>) -> Self {
        Self {
            game: Game::new(world, ghosts),
        }
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn world(&self) -> &Rc<World> {
        self.game.world()
    }
}

impl LearningEnvironment for LearningGame {
    type State = GameState;
    type Action = Action;
    type Feature = Feature;

    fn reset(&mut self) -> GameState {
        self.game.reset();
        self.game.state().clone()
    }

    fn step(&mut self, action: Action) -> Step<GameState> {
        let before = self.game.state().score;
        let end = self.game.tick(action);
        let state = self.game.state().clone();
        Step {
            reward: state.score - before,
            state,
            terminal: end.is_terminal(),
        }
    }

    fn legal_actions(&self, state: &GameState) -> Vec<Action> {
        if self.is_terminal(state) {
            return Vec::new();
        }
        self.world().legal_actions(&state.pacman)
    }

    fn is_terminal(&self, state: &GameState) -> bool {
        self.world().end_state(state).is_terminal()
    }

    fn features(&self, state: &GameState, action: Action) -> BTreeMap<Feature, Float> {
        self.world().features(state, action)
    }

    fn feature_names(&self) -> Vec<Feature> {
        Feature::ALL.to_vec()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LearningAgentConfig {
    pub learner: LearnerConfig,

    /// Ghost model used during training.
    pub ghost_table: GhostTransitionTable,

    /// Seeds exploration and the training ghosts. Training never touches the rng the agent
    /// plays with, so trained weights do not depend on which games are played afterwards.
    pub training_seed: u64,

    /// Where trained weights are cached. Matching weights are used as is; anything else is
    /// trained again and written back.
    pub weights_path: Option<PathBuf>,
}

impl Default for LearningAgentConfig {
    fn default() -> Self {
        Self {
            learner: LearnerConfig::default(),
            ghost_table: GhostTransitionTable::default(),
            training_seed: 42,
            weights_path: None,
        }
    }
}

/// Pacman agent that acts greedily on a linear Q-function.
pub struct LearningAgent {
    game: LearningGame,
    learner: ApproxQLearner<Feature>,
    report: Option<TrainingReport>,
}

impl LearningAgent {
    /// Load cached weights, or train from scratch if there are none. `rng` breaks ties while
    /// playing.
    pub fn new(world: Rc<World>, config: &LearningAgentConfig, rng: Rc<RefCell<Rng>>) -> Self {
        if let Some(path) = &config.weights_path {
            match Self::load(Rc::clone(&world), path, config, Rc::clone(&rng)) {
                Ok(agent) => return agent,
                Err(error) => {
                    tracing::warn!(path = %path.display(), %error, "cannot use cached weights, training");
                }
            }
        }

        let training_rng = Rc::new(RefCell::new(Rng::seed_from_u64(config.training_seed)));
        let mut training = LearningGame::new(
            Rc::clone(&world),
            config.ghost_table,
            Rc::clone(&training_rng),
        );
        let mut learner =
            ApproxQLearner::new(training.feature_names(), config.learner, training_rng);
        let report = learner.train(&mut training);
        let learner = learner.with_rng(Rc::clone(&rng));
        let game = LearningGame::new(world, config.ghost_table, rng);
        if let Some(path) = &config.weights_path {
            if let Err(error) = learner.save(path) {
                tracing::warn!(path = %path.display(), %error, "failed to cache weights");
            }
        }
        Self {
            game,
            learner,
            report: Some(report),
        }
    }

    /// Agent with the weights stored at `path`, without any training.
    pub fn load(
        world: Rc<World>,
        path: &Path,
        config: &LearningAgentConfig,
        rng: Rc<RefCell<Rng>>,
    ) -> Result<Self, LearningError> {
        let game = LearningGame::new(world, config.ghost_table, Rc::clone(&rng));
        let learner = ApproxQLearner::load(path, game.feature_names(), config.learner, rng)?;
        tracing::info!(path = %path.display(), weights = ?learner.weights(), "loaded weights");
        Ok(Self {
            game,
            learner,
            report: None,
        })
    }

    pub fn learner(&self) -> &ApproxQLearner<Feature> {
        &self.learner
    }

    /// How training went; None if the weights came from the cache.
    pub fn report(&self) -> Option<&TrainingReport> {
        self.report.as_ref()
    }
}

impl Agent for LearningAgent {
    type Action = Action;
    type Percept = GameState;

    fn act(&mut self, state: &GameState) -> Action {
        self.learner
            .best_action(&self.game, state)
            .unwrap_or(Action::Stop)
    }
}
