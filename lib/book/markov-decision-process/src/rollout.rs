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

use rand::Rng as _;

use crate::{Float, MarkovDecisionProcess, Rng};

/// Sample one episode from `start` and return its discounted reward.
///
/// `policy` may return None or an illegal action, in which case the first legal action is taken.
/// The episode ends at a terminal state, at a state without legal actions, or after `horizon`
/// steps.
pub fn rollout_return<_Mdp, _Policy>(
    mdp: &_Mdp,
    policy: _Policy,
    start: &_Mdp::State,
    horizon: usize,
    rng: &mut Rng,
) -> Float
where
    _Mdp: MarkovDecisionProcess,
    _Policy: Fn(&_Mdp::State) -> Option<_Mdp::Action>,
{
    let gamma = mdp.discount();
    let mut discount = 1.0;
    let mut total = 0.0;
    let mut state = start.clone();

    for _ in 0..horizon {
        if mdp.terminal_value(&state).is_some() {
            break;
        }
        let actions = mdp.actions(&state);
        let Some(&first) = actions.first() else {
            break;
        };
        let action = policy(&state)
            .filter(|action| actions.contains(action))
            .unwrap_or(first);

        let mut transitions = mdp.transitions(&state, action);
        let mut sample: Float = rng.gen();
        let index = transitions
            .iter()
            .position(|transition| {
                sample -= transition.probability;
                sample < 0.0
            })
            .unwrap_or(transitions.len().saturating_sub(1));
        if transitions.is_empty() {
            break;
        }
        let transition = transitions.swap_remove(index);

        total += discount * transition.reward;
        discount *= gamma;
        state = transition.next;
    }
    total
}

/// Average of `episodes` independent rollouts.
pub fn mean_rollout_return<_Mdp, _Policy>(
    mdp: &_Mdp,
    policy: _Policy,
    start: &_Mdp::State,
    horizon: usize,
    episodes: usize,
    rng: &mut Rng,
) -> Float
where
    _Mdp: MarkovDecisionProcess,
    _Policy: Fn(&_Mdp::State) -> Option<_Mdp::Action>,
{
    if episodes == 0 {
        return 0.0;
    }
    let total: Float = (0..episodes)
        .map(|_| rollout_return(mdp, &policy, start, horizon, rng))
        .sum();
    total / episodes as Float
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;

    use crate::test_mdp::{Corridor, Move};

    use super::*;

    #[test]
    fn test_deterministic_rollout_return() {
        let corridor = Corridor {
            length: 4,
            success: 1.0,
            discount: 0.5,
        };
        let mut rng = Rng::seed_from_u64(42);
        // Two empty steps, then the goal reward discounted twice.
        let total = rollout_return(&corridor, |_: &u8| Some(Move::Right), &1, 10, &mut rng);
        assert_abs_diff_eq!(total, 25.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rollout_stops_at_horizon() {
        let corridor = Corridor {
            length: 4,
            success: 1.0,
            discount: 0.5,
        };
        let mut rng = Rng::seed_from_u64(42);
        let total = rollout_return(&corridor, |_: &u8| Some(Move::Right), &1, 2, &mut rng);
        assert_abs_diff_eq!(total, 0.0);
    }

    #[test]
    fn test_rollout_from_terminal_is_zero() {
        let corridor = Corridor::default();
        let mut rng = Rng::seed_from_u64(42);
        let total = rollout_return(&corridor, |_: &u8| Some(Move::Right), &5, 10, &mut rng);
        assert_abs_diff_eq!(total, 0.0);
    }

    #[test]
    fn test_zero_episodes_mean_is_zero() {
        let corridor = Corridor::default();
        let mut rng = Rng::seed_from_u64(42);
        let mean = mean_rollout_return(&corridor, |_: &u8| None, &2, 10, 0, &mut rng);
        assert_abs_diff_eq!(mean, 0.0);
    }
}
