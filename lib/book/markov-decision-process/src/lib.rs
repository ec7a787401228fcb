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

//! Exact solvers for finite Markov Decision Processes.
//!
//! See Chapter 17, Making Complex Decisions: value iteration (section 17.2.1) and policy
//! iteration (section 17.2.2). The state space is enumerated up front, so both solvers sweep the
//! whole space with Bellman backups until they converge or hit a fixed iteration cap.

use std::fmt::Debug;
use std::hash::Hash;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

mod policy_iteration;
mod policy_store;
mod rollout;
mod value_iteration;

pub use policy_iteration::policy_iteration;
pub use policy_store::{PolicyEntry, PolicyStore, POLICY_FILE_VERSION};
pub use rollout::{mean_rollout_return, rollout_return};
pub use value_iteration::value_iteration;

pub type Float = f64;
pub type Rng = rand_pcg::Pcg64;

/// MDP solver error.
#[derive(Debug, thiserror::Error)]
pub enum MdpError {
    /// A transition led to a state that the enumeration never produced.
    #[error("state is not part of the enumerated state space: {0}")]
    UnknownState(String),

    /// Reading or writing a policy file failed.
    #[error("policy file i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// A policy file could not be encoded or decoded.
    #[error("policy file is malformed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A policy file was written by an incompatible version.
    #[error("policy file version {found} is not supported, expected {expected}")]
    UnsupportedVersion { expected: u32, found: u32 },

    /// A policy file does not cover exactly the current state space.
    #[error("policy file covers {found} states, state space has {expected} ({missing} missing)")]
    SchemaMismatch {
        expected: usize,
        found: usize,
        missing: usize,
    },

    /// A policy file was solved under other settings than the ones asked for.
    #[error("policy file was solved with {found}, expected {expected}")]
    SettingsMismatch { expected: String, found: String },
}

/// One outcome of taking an action in a state.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition<_State> {
    pub probability: Float,
    pub next: _State,
    pub reward: Float,
}

/// A finite MDP whose states can all be enumerated.
///
/// `actions` must return the legal actions in a fixed order; greedy action selection keeps the
/// first maximizer in that order. Terminal states report their absorbing value and are never
/// expanded.
pub trait MarkovDecisionProcess {
    type State: Clone + Debug;
    type Key: Clone + Eq + Hash + Ord + Debug + Serialize + DeserializeOwned;
    type Action: Copy + Eq + Hash + Debug + Serialize + DeserializeOwned;

    fn states(&self) -> Vec<Self::State>;
    fn key(&self, state: &Self::State) -> Self::Key;
    fn terminal_value(&self, state: &Self::State) -> Option<Float>;
    fn actions(&self, state: &Self::State) -> Vec<Self::Action>;
    fn transitions(
        &self,
        state: &Self::State,
        action: Self::Action,
    ) -> Vec<Transition<Self::State>>;
    fn discount(&self) -> Float;

    /// Action stored for states that have not been improved yet, and for states without any
    /// legal action.
    fn default_action(&self) -> Self::Action;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Value iteration stops once the summed absolute change of a sweep drops below this.
    pub epsilon: Float,

    /// Hard cap on sweeps (value iteration) or outer steps (policy iteration).
    pub max_iterations: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            epsilon: 0.01,
            max_iterations: 100,
        }
    }
}

/// What happened while solving. Hitting the iteration cap is not an error, but `converged` stays
/// false and the policy may be suboptimal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolveReport {
    pub iterations: usize,
    pub converged: bool,

    /// Summed absolute value change of every sweep.
    pub deltas: Vec<Float>,

    /// Number of states whose action changed in every policy improvement step. Empty for value
    /// iteration.
    pub changed_actions: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct Solution<_Key: Ord, _Action> {
    pub policy: PolicyStore<_Key, _Action>,
    pub report: SolveReport,
}

/// Q(s, a) = sum over s' of T(s, a, s') * (R(s, a, s') + gamma * V(s')).
pub fn q_value<_Mdp: MarkovDecisionProcess>(
    mdp: &_Mdp,
    values: &PolicyStore<_Mdp::Key, _Mdp::Action>,
    state: &_Mdp::State,
    action: _Mdp::Action,
) -> Result<Float, MdpError> {
    let gamma = mdp.discount();
    let mut total = 0.0;
    for transition in mdp.transitions(state, action) {
        let key = mdp.key(&transition.next);
        let next_value = values
            .value(&key)
            .ok_or_else(|| MdpError::UnknownState(format!("{:?}", key)))?;
        total += transition.probability * (transition.reward + gamma * next_value);
    }
    Ok(total)
}

/// Best action and its Q-value, or None if the state has no legal action. Ties go to the action
/// that comes first in `actions`.
pub fn greedy_action<_Mdp: MarkovDecisionProcess>(
    mdp: &_Mdp,
    values: &PolicyStore<_Mdp::Key, _Mdp::Action>,
    state: &_Mdp::State,
) -> Result<Option<(_Mdp::Action, Float)>, MdpError> {
    let mut best: Option<(_Mdp::Action, Float)> = None;
    for action in mdp.actions(state) {
        let value = q_value(mdp, values, state, action)?;
        match best {
            Some((_, best_value)) if value <= best_value => {}
            _ => best = Some((action, value)),
        }
    }
    Ok(best)
}


#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::test_mdp::{Corridor, Move};
    use super::*;

    #[test]
    fn test_q_value_of_deterministic_step_into_goal() {
        let corridor = Corridor {
            length: 2,
            success: 1.0,
            discount: 0.5,
        };
        let values = PolicyStore::initial(&corridor, &corridor.states());
        // 1.0 * (100 + 0.5 * 100) + 0.0 * (-200 + 0.5 * -200)
        let q = q_value(&corridor, &values, &1, Move::Right).unwrap();
        assert_abs_diff_eq!(q, 150.0, epsilon = 1e-9);
        let q = q_value(&corridor, &values, &1, Move::Left).unwrap();
        assert_abs_diff_eq!(q, -300.0, epsilon = 1e-9);
    }

    #[test]
    fn test_greedy_action_prefers_first_on_tie() {
        let corridor = Corridor {
            length: 4,
            success: 0.5,
            discount: 0.5,
        };
        let mut values = PolicyStore::initial(&corridor, &corridor.states());
        for cell in 1..4 {
            values.insert(
                cell,
                PolicyEntry {
                    value: 0.0,
                    action: Move::Right,
                },
            );
        }
        // A 50/50 slip makes both actions from the middle cell identical.
        let (action, _) = greedy_action(&corridor, &values, &2).unwrap().unwrap();
        assert_eq!(action, Move::Left);
    }

    #[test]
    fn test_unknown_next_state_is_an_error() {
        struct Leaky;

        impl MarkovDecisionProcess for Leaky {
            type State = u8;
            type Key = u8;
            type Action = Move;

            fn states(&self) -> Vec<u8> {
                vec![0]
            }
            fn key(&self, state: &u8) -> u8 {
                *state
            }
            fn terminal_value(&self, _state: &u8) -> Option<Float> {
                None
            }
            fn actions(&self, _state: &u8) -> Vec<Move> {
                vec![Move::Right]
            }
            fn transitions(&self, _state: &u8, _action: Move) -> Vec<Transition<u8>> {
                vec![Transition {
                    probability: 1.0,
                    next: 7,
                    reward: 0.0,
                }]
            }
            fn discount(&self) -> Float {
                0.5
            }
            fn default_action(&self) -> Move {
                Move::Right
            }
        }

        let result = value_iteration(&Leaky, &SolverConfig::default());
        assert!(matches!(result, Err(MdpError::UnknownState(_))));
    }
}
