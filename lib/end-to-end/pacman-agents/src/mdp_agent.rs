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

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::rc::Rc;

use intelligent_agents::Agent;
use markov_decision_process::{
    policy_iteration, value_iteration, MarkovDecisionProcess, MdpError, PolicyStore, SolveReport,
    SolverConfig,
};
use pacman_logic::{Action, Float, GameState, GhostTransitionTable, StateKey, World};
use serde::{Deserialize, Serialize};

use crate::PacmanMdp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Planner {
    Value,
    Policy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MdpAgentConfig {
    pub planner: Planner,
    pub discount: Float,
    pub solver: SolverConfig,

    /// How the planner expects ghosts to move.
    pub ghost_table: GhostTransitionTable,

    /// Where the solved policy is cached. A readable file covering the current world, solved
    /// with the same planner, discount, solver and ghost table, is used as is; anything else is
    /// solved again and written back.
    pub policy_path: Option<PathBuf>,
}

impl Default for MdpAgentConfig {
    fn default() -> Self {
        Self {
            planner: Planner::Value,
            discount: 0.5,
            solver: SolverConfig::default(),
            ghost_table: GhostTransitionTable::default(),
            policy_path: None,
        }
    }
}

/// Everything besides the world that a cached policy depends on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
struct PolicySettings {
    planner: Planner,
    discount: Float,
    solver: SolverConfig,
    ghost_table: GhostTransitionTable,
}

impl From<&MdpAgentConfig> for PolicySettings {
    fn from(config: &MdpAgentConfig) -> Self {
        Self {
            planner: config.planner,
            discount: config.discount,
            solver: config.solver,
            ghost_table: config.ghost_table,
        }
    }
}

/// Pacman agent that plans once, at construction, and afterwards only looks up the action of
/// the current state.
pub struct MdpAgent {
    mdp: PacmanMdp,
    policy: PolicyStore<StateKey, Action>,
    report: Option<SolveReport>,
}

impl MdpAgent {
    pub fn new(world: Rc<World>, config: &MdpAgentConfig) -> Result<Self, MdpError> {
        let mdp = PacmanMdp::new(world, config.ghost_table, config.discount);
        let settings = PolicySettings::from(config);

        if let Some(path) = &config.policy_path {
            let expected: BTreeSet<StateKey> =
                mdp.states().iter().map(|state| mdp.key(state)).collect();
            match PolicyStore::load(path, &expected, &settings) {
                Ok(policy) => {
                    tracing::info!(path = %path.display(), states = policy.len(), "loaded policy");
                    return Ok(Self {
                        mdp,
                        policy,
                        report: None,
                    });
                }
                Err(error) => {
                    tracing::warn!(path = %path.display(), %error, "cannot use cached policy, solving");
                }
            }
        }

        let mut solution = match config.planner {
            Planner::Value => value_iteration(&mdp, &config.solver)?,
            Planner::Policy => policy_iteration(&mdp, &config.solver)?,
        };
        solution.policy.set_settings(&settings)?;
        if let Some(path) = &config.policy_path {
            if let Err(error) = solution.policy.save(path) {
                tracing::warn!(path = %path.display(), %error, "failed to cache policy");
            }
        }
        Ok(Self {
            mdp,
            policy: solution.policy,
            report: Some(solution.report),
        })
    }

    pub fn policy(&self) -> &PolicyStore<StateKey, Action> {
        &self.policy
    }

    /// How solving went; None if the policy came from the cache.
    pub fn report(&self) -> Option<&SolveReport> {
        self.report.as_ref()
    }

    pub fn mdp(&self) -> &PacmanMdp {
        &self.mdp
    }
}

impl Agent for MdpAgent {
    type Action = Action;
    type Percept = GameState;

    fn act(&mut self, state: &GameState) -> Action {
        let legal = self.mdp.actions(state);
        let key = self.mdp.key(state);
        match self.policy.action(&key) {
            Some(action) if legal.contains(&action) => action,
            stored => {
                tracing::debug!(?key, ?stored, "no usable stored action");
                legal.first().copied().unwrap_or(Action::Stop)
            }
        }
    }
}
