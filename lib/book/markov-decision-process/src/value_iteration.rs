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
    greedy_action, MarkovDecisionProcess, MdpError, PolicyEntry, PolicyStore, SolveReport,
    Solution, SolverConfig,
};

/// Synchronous value iteration.
///
/// Every sweep computes V'(s) = max over a of Q(s, a) from the values of the previous sweep only,
/// and records the greedy action next to it. Stops once the summed absolute change of a sweep is
/// below `config.epsilon`, or after `config.max_iterations` sweeps.
#[tracing::instrument(level = "info", skip_all, fields(epsilon = config.epsilon, max_iterations = config.max_iterations))]
pub fn value_iteration<_Mdp: MarkovDecisionProcess>(
    mdp: &_Mdp,
    config: &SolverConfig,
) -> Result<Solution<_Mdp::Key, _Mdp::Action>, MdpError> {
    let states = mdp.states();
    let mut store = PolicyStore::initial(mdp, &states);
    let mut report = SolveReport::default();
    tracing::info!(states = states.len(), "starting value iteration");

    for iteration in 1..=config.max_iterations {
        let previous = store.clone();
        let mut delta = 0.0;
        for state in &states {
            if mdp.terminal_value(state).is_some() {
                continue;
            }
            let Some((action, value)) = greedy_action(mdp, &previous, state)? else {
                continue;
            };
            let key = mdp.key(state);
            delta += (value - previous.value(&key).unwrap_or(0.0)).abs();
            store.insert(key, PolicyEntry { value, action });
        }

        report.iterations = iteration;
        report.deltas.push(delta);
        tracing::debug!(iteration, delta, "value iteration sweep");
        if delta < config.epsilon {
            report.converged = true;
            break;
        }
    }

    if report.converged {
        tracing::info!(iterations = report.iterations, "value iteration converged");
    } else {
        tracing::warn!(
            iterations = report.iterations,
            "value iteration hit the iteration cap before converging"
        );
    }
    Ok(Solution {
        policy: store,
        report,
    })
}
