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

use serde::{Deserialize, Serialize};

use crate::{Float, Int, Position};

/// Cell indices that still hold food. Ordered, so two sets with the same cells compare and hash
/// the same no matter in which order the food was eaten.
pub type FoodSet = BTreeSet<usize>;

/// Everything that changes during a game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    /// Pacman position.
    pub pacman: Position,
    /// Ghost positions, in a fixed ghost order.
    pub ghosts: Vec<Position>,
    /// Remaining food.
    pub food: FoodSet,
    /// Cumulative score.
    pub score: Float,
}

impl GameState {
    /// Number of food cells left.
    pub fn food_remaining(&self) -> usize {
        self.food.len()
    }
}

/// Structural identity of a state inside an enumerated world: pacman cell, ghost cells in ghost
/// order and the sorted food cells. The score is left out because within one world it follows
/// from the other fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateKey {
    /// Pacman cell as (column, row).
    pub pacman: (Int, Int),
    /// Ghost cells as (column, row).
    pub ghosts: Vec<(Int, Int)>,
    /// Food cell indices, ascending.
    pub food: Vec<usize>,
}

/// Whether a game is over, and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EndState {
    /// Still running.
    NotEnded,
    /// A ghost caught pacman.
    Lose,
    /// Pacman ate every food without being caught.
    Win,
}

impl EndState {
    /// True for [`EndState::Lose`] and [`EndState::Win`].
    pub fn is_terminal(&self) -> bool {
        !matches!(self, EndState::NotEnded)
    }
}
