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

use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

use crate::{Float, Int};

/// Width and height of one grid cell in world units.
pub const CELL_WIDTH: Int = 20;

/// A point in world units. The top-left corner of cell `(column, row)` is at
/// `(CELL_WIDTH * column, CELL_WIDTH * row)`, and y grows downwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate.
    pub x: Int,
    /// Vertical coordinate, growing downwards.
    pub y: Int,
}

impl Position {
    /// Create a position from world coordinates.
    pub const fn new(x: Int, y: Int) -> Self {
        Self { x, y }
    }

    /// Top-left corner of a cell.
    pub const fn of_cell(column: Int, row: Int) -> Self {
        Self {
            x: column * CELL_WIDTH,
            y: row * CELL_WIDTH,
        }
    }

    /// Column and row of the cell containing this point.
    pub fn cell(&self) -> (Int, Int) {
        (
            self.x.div_euclid(CELL_WIDTH),
            self.y.div_euclid(CELL_WIDTH),
        )
    }

    /// Euclidean distance in world units.
    pub fn distance(&self, other: &Position) -> Float {
        let dx = Float::from(self.x - other.x);
        let dy = Float::from(self.y - other.y);
        dx.hypot(dy)
    }

    /// True if the point lies on a cell boundary along at least one axis, i.e. an agent here is
    /// moving along a corridor rather than cutting a corner.
    pub fn is_axis_aligned(&self) -> bool {
        self.x.rem_euclid(CELL_WIDTH) == 0 || self.y.rem_euclid(CELL_WIDTH) == 0
    }
}

impl Add for Position {
    type Output = Position;

    fn add(self, rhs: Position) -> Position {
        Position::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Position {
    type Output = Position;

    fn sub(self, rhs: Position) -> Position {
        Position::new(self.x - rhs.x, self.y - rhs.y)
    }
}
