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

//! Ghost agents. Each one controls the ghost at a fixed index of [`GameState::ghosts`].

use std::cell::RefCell;
use std::rc::Rc;

use intelligent_agents::Agent;
use rand::Rng as _;
use serde::{Deserialize, Serialize};

use crate::{best_chase, Action, Float, GameState, Position, Rng, World};

/// Any agent that picks a ghost's action from the current game state.
pub type GhostAgent = Box<dyn Agent<Action = Action, Percept = GameState>>;

/// Model of a ghost that mostly chases pacman.
///
/// The ghost takes its A* chase action with probability `chase_probability` and splits the rest
/// evenly over its other legal actions. A ghost with a single legal action takes it, and a boxed
/// in ghost stays put. If the chase action is not legal, e.g. pacman is unreachable, every legal
/// action is equally likely.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GhostTransitionTable {
    /// Probability of taking the chase action.
    pub chase_probability: Float,
}

impl Default for GhostTransitionTable {
    fn default() -> Self {
        Self {
            chase_probability: 0.8,
        }
    }
}

impl GhostTransitionTable {
    /// A ghost that always chases.
    pub fn deterministic() -> Self {
        Self {
            chase_probability: 1.0,
        }
    }

    /// Actions of ghost `ghost` in `state` with their probabilities. Actions with probability
    /// zero are left out; the rest sum to one.
    pub fn distribution(
        &self,
        world: &World,
        state: &GameState,
        ghost: usize,
    ) -> Vec<(Action, Float)> {
        let Some(position) = state.ghosts.get(ghost).copied() else {
            return vec![(Action::Stop, 1.0)];
        };
        let legal = world.legal_actions(&position);
        match legal.len() {
            0 => vec![(Action::Stop, 1.0)],
            1 => vec![(legal[0], 1.0)],
            count => {
                let chase = best_chase(world, world.moves(), position, state.pacman);
                if !legal.contains(&chase) {
                    let uniform = 1.0 / count as Float;
                    return legal.into_iter().map(|action| (action, uniform)).collect();
                }
                let other = (1.0 - self.chase_probability) / (count - 1) as Float;
                legal
                    .into_iter()
                    .map(|action| {
                        if action == chase {
                            (action, self.chase_probability)
                        } else {
                            (action, other)
                        }
                    })
                    .filter(|(_, probability)| *probability > 0.0)
                    .collect()
            }
        }
    }
}

/// Ghost that takes the legal action ending closest to pacman in straight-line distance.
pub struct GreedyGhost {
    index: usize,
    world: Rc<World>,
}

impl GreedyGhost {
    /// Ghost controlling `state.ghosts[index]`.
    pub fn new(index: usize, world: Rc<World>) -> Self {
        Self { index, world }
    }
}

impl Agent for GreedyGhost {
    type Action = Action;
    type Percept = GameState;

    fn act(&mut self, state: &GameState) -> Action {
        let Some(position) = state.ghosts.get(self.index).copied() else {
            return Action::Stop;
        };
        let mut best = (Action::Stop, Float::INFINITY);
        for action in self.world.legal_actions(&position) {
            let moved = position + self.world.moves().displacement(action);
            let distance = moved.distance(&state.pacman);
            if distance < best.1 {
                best = (action, distance);
            }
        }
        best.0
    }
}

/// Ghost that follows an A* path to pacman every tick.
pub struct AStarGhost {
    index: usize,
    world: Rc<World>,
}

impl AStarGhost {
    /// Ghost controlling `state.ghosts[index]`.
    pub fn new(index: usize, world: Rc<World>) -> Self {
        Self { index, world }
    }
}

impl Agent for AStarGhost {
    type Action = Action;
    type Percept = GameState;

    fn act(&mut self, state: &GameState) -> Action {
        match state.ghosts.get(self.index) {
            Some(position) => best_chase(&self.world, self.world.moves(), *position, state.pacman),
            None => Action::Stop,
        }
    }
}

/// Ghost that samples its action from a [`GhostTransitionTable`].
pub struct StochasticGhost {
    index: usize,
    world: Rc<World>,
    table: GhostTransitionTable,
    rng: Rc<RefCell<Rng>>,
}

impl StochasticGhost {
    /// Ghost controlling `state.ghosts[index]`, drawing from `rng`.
    pub fn new(
        index: usize,
        world: Rc<World>,
        table: GhostTransitionTable,
        rng: Rc<RefCell<Rng>>,
    ) -> Self {
        Self {
            index,
            world,
            table,
            rng,
        }
    }
}

impl Agent for StochasticGhost {
    type Action = Action;
    type Percept = GameState;

    fn act(&mut self, state: &GameState) -> Action {
        let distribution = self.table.distribution(&self.world, state, self.index);
        let mut sample: Float = self.rng.borrow_mut().gen();
        for (action, probability) in &distribution {
            sample -= probability;
            if sample < 0.0 {
                return *action;
            }
        }
        distribution
            .last()
            .map_or(Action::Stop, |(action, _)| *action)
    }
}

/// Behaviour of a [`ScatterChaseGhost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GhostMode {
    /// Chasing pacman.
    Chase,
    /// Heading for the ghost's corner.
    Scatter,
}

impl GhostMode {
    /// Ticks the scheduled phase lasts.
    fn duration(&self) -> usize {
        match self {
            GhostMode::Chase => ScatterChaseGhost::CHASE_TICKS,
            GhostMode::Scatter => ScatterChaseGhost::SCATTER_TICKS,
        }
    }

    fn other(&self) -> GhostMode {
        match self {
            GhostMode::Chase => GhostMode::Scatter,
            GhostMode::Scatter => GhostMode::Chase,
        }
    }
}

/// Ghost that alternates between chasing pacman and heading for its own corner, using A* for
/// both.
///
/// Phases follow a fixed clock. A ghost that reaches its corner chases for the rest of the
/// scatter phase; the clock is not restarted.
pub struct ScatterChaseGhost {
    index: usize,
    world: Rc<World>,
    corner: Position,
    phase: GhostMode,
    mode: GhostMode,
    ticks: usize,
}

impl ScatterChaseGhost {
    /// Ticks spent chasing before scattering.
    pub const CHASE_TICKS: usize = 40;

    /// Ticks spent scattering before chasing again.
    pub const SCATTER_TICKS: usize = 20;

    /// Ghost controlling `state.ghosts[index]`, starting in chase mode and scattering to
    /// corner `index % 4` of [`World::corners`].
    pub fn new(index: usize, world: Rc<World>) -> Self {
        let corner = world.corners()[index % 4];
        Self::with_corner(index, world, corner)
    }

    pub fn with_corner(index: usize, world: Rc<World>, corner: Position) -> Self {
        Self {
            index,
            world,
            corner,
            phase: GhostMode::Chase,
            mode: GhostMode::Chase,
            ticks: 0,
        }
    }

    /// Current mode.
    pub fn mode(&self) -> GhostMode {
        self.mode
    }

    pub fn corner(&self) -> Position {
        self.corner
    }
}

impl Agent for ScatterChaseGhost {
    type Action = Action;
    type Percept = GameState;

    fn act(&mut self, state: &GameState) -> Action {
        let Some(position) = state.ghosts.get(self.index).copied() else {
            return Action::Stop;
        };
        if self.mode == GhostMode::Scatter && position == self.corner {
            self.mode = GhostMode::Chase;
        }
        let target = match self.mode {
            GhostMode::Chase => state.pacman,
            GhostMode::Scatter => self.corner,
        };
        let action = best_chase(&self.world, self.world.moves(), position, target);

        self.ticks += 1;
        if self.ticks == self.phase.duration() {
            self.ticks = 0;
            self.phase = self.phase.other();
            self.mode = self.phase;
            tracing::trace!(ghost = self.index, mode = ?self.mode, "ghost changes mode");
        }
        action
    }
}
