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

#![warn(missing_docs)]

//! Pacman game logic.
//!
//! A grid world with one pacman, a list of ghosts and food pellets. The [`World`] holds the fixed
//! rules (which positions are valid, how a move changes a [`GameState`], when a game ends) and is
//! shared read-only by every agent. A [`Game`] owns one mutable state and the ghost agents, and
//! advances one tick per pacman action.

mod action;
mod game;
mod geometry;
mod ghosts;
mod grid;
pub mod layouts;
mod search;
mod state;
mod world;

pub use action::{Action, MoveSet, BASE_STEP};
pub use game::Game;
pub use geometry::{Position, CELL_WIDTH};
pub use ghosts::{
    AStarGhost, GhostAgent, GhostMode, GhostTransitionTable, GreedyGhost, ScatterChaseGhost,
    StochasticGhost,
};
pub use grid::{Grid, Layout, Tile};
pub use search::{best_chase, chase_distance, nearest_food_distance};
pub use state::{EndState, FoodSet, GameState, StateKey};
pub use world::{Feature, SimulationKind, World, CAPTURE_PENALTY, FOOD_REWARD, WIN_BONUS};

/// Integer type for positions.
pub type Int = i32;

/// Floating point type for scores and features.
pub type Float = f64;

/// Random number generator used by stochastic agents.
pub type Rng = rand_pcg::Pcg64;

/// Hash set used by the state enumeration.
pub type HashSet<T> = rustc_hash::FxHashSet<T>;

/// Layout parsing error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    /// Layout has no rows or no columns.
    #[error("layout is empty")]
    Empty,

    /// A row is not as wide as the first row.
    #[error("row {row} has {found} tiles, expected {expected}")]
    RaggedRow {
        /// Row index.
        row: usize,
        /// Width of the first row.
        expected: usize,
        /// Width of this row.
        found: usize,
    },

    /// A character does not name a tile.
    #[error("unknown tile {tile:?} at row {row}, column {column}")]
    UnknownTile {
        /// The offending character.
        tile: char,
        /// Row index.
        row: usize,
        /// Column index.
        column: usize,
    },

    /// Layout has no pacman start marker.
    #[error("layout has no pacman start")]
    MissingPacman,

    /// Layout has more than one pacman start marker.
    #[error("layout has more than one pacman start")]
    DuplicatePacman,
}
