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

use crate::{
    greedy_action, q_value, Float, MarkovDecisionProcess, MdpError, PolicyStore, SolveReport,
    Solution, SolverConfig,
};

/// Policy iteration with a single evaluation sweep per step (modified policy iteration).
///
/// Each step evaluates the stored policy once, V(s) = Q(s, pi(s)) from the previous values, then
/// replaces every action with the greedy one. A state whose stored action is not legal is
/// evaluated with its first legal action instead. Converged once an improvement step changes no
/// action.
#[tracing::instrument(level = "info", skip_all, fields(max_iterations = config.max_iterations))]
pub fn policy_iteration<_Mdp: MarkovDecisionProcess>(
    mdp: &_Mdp,
    config: &SolverConfig,
) -> Result<Solution<_Mdp::Key, _Mdp::Action>, MdpError> {
    let states = mdp.states();
    let mut store = PolicyStore::initial(mdp, &states);
    let mut report = SolveReport::default();
    tracing::info!(states = states.len(), "starting policy iteration");

    for iteration in 1..=config.max_iterations {
        let delta = evaluate_policy(mdp, &states, &mut store)?;
        let changed = improve_policy(mdp, &states, &mut store)?;

        report.iterations = iteration;
        report.deltas.push(delta);
        report.changed_actions.push(changed);
        tracing::debug!(iteration, delta, changed, "policy iteration step");
        if changed == 0 {
            report.converged = true;
            break;
        }
    }

    if report.converged {
        tracing::info!(iterations = report.iterations, "policy iteration converged");
    } else {
        tracing::warn!(
            iterations = report.iterations,
            "policy iteration hit the iteration cap before converging"
        );
    }
    Ok(Solution {
        policy: store,
        report,
    })
}

fn evaluate_policy<_Mdp: MarkovDecisionProcess>(
    mdp: &_Mdp,
    states: &[_Mdp::State],
    store: &mut PolicyStore<_Mdp::Key, _Mdp::Action>,
) -> Result<Float, MdpError> {
    let previous = store.clone();
    let mut delta = 0.0;
    for state in states {
        if mdp.terminal_value(state).is_some() {
            continue;
        }
        let actions = mdp.actions(state);
        let Some(&first) = actions.first() else {
            continue;
        };
        let key = mdp.key(state);
        let action = previous
            .action(&key)
            .filter(|action| actions.contains(action))
            .unwrap_or(first);
        let value = q_value(mdp, &previous, state, action)?;
        delta += (value - previous.value(&key).unwrap_or(0.0)).abs();
        store.set_value(&key, value);
    }
    Ok(delta)
}

fn improve_policy<_Mdp: MarkovDecisionProcess>(
    mdp: &_Mdp,
    states: &[_Mdp::State],
    store: &mut PolicyStore<_Mdp::Key, _Mdp::Action>,
) -> Result<usize, MdpError> {
    let evaluated = store.clone();
    let mut changed = 0;
    for state in states {
        if mdp.terminal_value(state).is_some() {
            continue;
        }
        let Some((action, _)) = greedy_action(mdp, &evaluated, state)? else {
            continue;
        };
        let key = mdp.key(state);
        if evaluated.action(&key) != Some(action) {
            changed += 1;
            store.set_action(&key, action);
        }
    }
    Ok(changed)
}
