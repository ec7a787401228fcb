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

use std::rc::Rc;

use markov_decision_process::{MarkovDecisionProcess, Transition};
use pacman_logic::{
    Action, EndState, Float, GameState, GhostTransitionTable, SimulationKind, StateKey, World,
    CAPTURE_PENALTY, WIN_BONUS,
};

/// A pacman world seen as an MDP.
///
/// Pacman picks the action; every ghost then moves independently according to `table`, so the
/// joint ghost distribution is the product of the per-ghost ones. The reward of a transition is
/// the change in score. If pacman's own move ends the game the ghosts never move and the Q-state
/// leads to that ended state with probability 1.
#[derive(Debug, Clone)]
pub struct PacmanMdp {
    world: Rc<World>,
    table: GhostTransitionTable,
    discount: Float,
}

impl PacmanMdp {
    pub fn new(world: Rc<World>, table: GhostTransitionTable, discount: Float) -> Self {
        Self {
            world,
            table,
            discount,
        }
    }

    pub fn world(&self) -> &Rc<World> {
        &self.world
    }

    pub fn table(&self) -> &GhostTransitionTable {
        &self.table
    }

    fn joint_ghost_actions(&self, state: &GameState) -> Vec<(Vec<Action>, Float)> {
        let mut joint: Vec<(Vec<Action>, Float)> = vec![(Vec::new(), 1.0)];
        for ghost in 0..state.ghosts.len() {
            let distribution = self.table.distribution(&self.world, state, ghost);
            joint = joint
                .into_iter()
                .flat_map(|(prefix, probability)| {
                    distribution.iter().map(move |(action, ghost_probability)| {
                        let mut actions = prefix.clone();
                        actions.push(*action);
                        (actions, probability * ghost_probability)
                    })
                })
                .collect();
        }
        joint
    }
}

impl MarkovDecisionProcess for PacmanMdp {
    type State = GameState;
    type Key = StateKey;
    type Action = Action;

    fn states(&self) -> Vec<GameState> {
        self.world.all_states()
    }

    fn key(&self, state: &GameState) -> StateKey {
        self.world.key(state)
    }

    fn terminal_value(&self, state: &GameState) -> Option<Float> {
        match self.world.end_state(state) {
            EndState::Lose => Some(-CAPTURE_PENALTY),
            EndState::Win => Some(WIN_BONUS),
            EndState::NotEnded => None,
        }
    }

    fn actions(&self, state: &GameState) -> Vec<Action> {
        if self.world.end_state(state).is_terminal() {
            return Vec::new();
        }
        self.world.legal_actions(&state.pacman)
    }

    fn transitions(&self, state: &GameState, action: Action) -> Vec<Transition<GameState>> {
        let moved = self
            .world
            .simulate(SimulationKind::PacmanMove(action), state);
        if self.world.end_state(&moved).is_terminal() {
            return vec![Transition {
                probability: 1.0,
                reward: moved.score - state.score,
                next: moved,
            }];
        }
        self.joint_ghost_actions(&moved)
            .into_iter()
            .map(|(actions, probability)| {
                let next = self
                    .world
                    .simulate(SimulationKind::GhostMoves(&actions), &moved);
                Transition {
                    probability,
                    reward: next.score - state.score,
                    next,
                }
            })
            .collect()
    }

    fn discount(&self) -> Float {
        self.discount
    }

    fn default_action(&self) -> Action {
        Action::Up
    }
}
