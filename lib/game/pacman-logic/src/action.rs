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

use serde::{Deserialize, Serialize};

use crate::{Float, Int, Position};

/// Length of a speed 1 step in world units.
pub const BASE_STEP: Int = 5;

/// A move of one agent. The declaration order is the enumeration order used everywhere a
/// choice between equally good actions has to be made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Action {
    /// Towards smaller y.
    Up,
    /// Towards larger y.
    Down,
    /// Towards smaller x.
    Left,
    /// Towards larger x.
    Right,
    /// Stay in place.
    Stop,
}

impl Action {
    /// Every action, in enumeration order.
    pub const ALL: [Action; 5] = [
        Action::Up,
        Action::Down,
        Action::Left,
        Action::Right,
        Action::Stop,
    ];

    /// Every action except [`Action::Stop`], in enumeration order.
    pub const MOVES: [Action; 4] = [Action::Up, Action::Down, Action::Left, Action::Right];

    fn unit(&self) -> Position {
        match self {
            Action::Up => Position::new(0, -1),
            Action::Down => Position::new(0, 1),
            Action::Left => Position::new(-1, 0),
            Action::Right => Position::new(1, 0),
            Action::Stop => Position::new(0, 0),
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Action::Up => "up",
            Action::Down => "down",
            Action::Left => "left",
            Action::Right => "right",
            Action::Stop => "stop",
        };
        write!(f, "{}", name)
    }
}

/// Displacement of every action for one agent. A speed of 4 moves a whole cell per action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MoveSet {
    speed: Int,
}

impl MoveSet {
    /// One whole cell per action. Used by the planning agents and the worlds they plan in.
    pub const WHOLE_CELL: MoveSet = MoveSet { speed: 4 };

    /// Move set with the given speed multiplier.
    pub const fn new(speed: Int) -> Self {
        Self { speed }
    }

    /// Speed multiplier.
    pub fn speed(&self) -> Int {
        self.speed
    }

    /// Displacement of `action` in world units.
    pub fn displacement(&self, action: Action) -> Position {
        let unit = action.unit();
        let length = BASE_STEP * self.speed;
        Position::new(unit.x * length, unit.y * length)
    }

    /// Length of a non-stop step in world units.
    pub fn step_length(&self) -> Float {
        Float::from(BASE_STEP * self.speed)
    }
}

impl Default for MoveSet {
    fn default() -> Self {
        Self::WHOLE_CELL
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CELL_WIDTH;

    #[test]
    fn test_whole_cell_moves_one_cell() {
        let moves = MoveSet::WHOLE_CELL;
        assert_eq!(
            moves.displacement(Action::Right),
            Position::new(CELL_WIDTH, 0)
        );
        assert_eq!(moves.displacement(Action::Up), Position::new(0, -CELL_WIDTH));
        assert_eq!(moves.displacement(Action::Stop), Position::new(0, 0));
    }

    #[test]
    fn test_move_sets_are_independent_values() {
        let slow = MoveSet::new(1);
        let fast = MoveSet::new(2);
        assert_eq!(slow.displacement(Action::Down), Position::new(0, 5));
        assert_eq!(fast.displacement(Action::Down), Position::new(0, 10));
        assert_eq!(MoveSet::default(), MoveSet::WHOLE_CELL);
    }

    #[test]
    fn test_moves_exclude_stop() {
        assert!(!Action::MOVES.contains(&Action::Stop));
        assert_eq!(Action::ALL[..4], Action::MOVES);
    }
}
