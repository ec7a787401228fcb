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

use crate::{FoodSet, Int, LayoutError, Position, CELL_WIDTH};

/// One cell of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tile {
    /// Nothing can stand here.
    Wall,
    /// Agents can stand here. Whether food lies here is part of the game state, not the grid.
    Open,
}

/// Fixed walls of a world, stored row by row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    width: usize,
    height: usize,
    tiles: Vec<Tile>,
}

impl Grid {
    /// Number of columns.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of cells, walls included.
    pub fn cell_count(&self) -> usize {
        self.tiles.len()
    }

    /// Index of the cell containing `position`, or None outside the grid.
    pub fn index_of(&self, position: &Position) -> Option<usize> {
        let (column, row) = position.cell();
        if column < 0 || row < 0 {
            return None;
        }
        let (column, row) = (column as usize, row as usize);
        if column >= self.width || row >= self.height {
            return None;
        }
        Some(row * self.width + column)
    }

    /// Top-left corner of the cell at `index`.
    pub fn position_of(&self, index: usize) -> Position {
        Position::of_cell((index % self.width) as Int, (index / self.width) as Int)
    }

    /// Tile at `index`.
    pub fn tile(&self, index: usize) -> Option<Tile> {
        self.tiles.get(index).copied()
    }

    fn is_open_at(&self, position: &Position) -> bool {
        self.index_of(position)
            .and_then(|index| self.tile(index))
            .map_or(false, |tile| tile == Tile::Open)
    }

    /// True if an agent whose top-left corner is at `position` fits: its top-left and
    /// bottom-right pixels both lie on open tiles, and it is aligned with a corridor on at least
    /// one axis.
    pub fn is_valid(&self, position: &Position) -> bool {
        let bottom_right = *position + Position::new(CELL_WIDTH - 1, CELL_WIDTH - 1);
        self.is_open_at(position) && self.is_open_at(&bottom_right) && position.is_axis_aligned()
    }

    /// Indices of every open cell, in row-major order.
    pub fn open_cells(&self) -> Vec<usize> {
        self.tiles
            .iter()
            .enumerate()
            .filter(|(_, tile)| **tile == Tile::Open)
            .map(|(index, _)| index)
            .collect()
    }
}

/// A parsed text map: the grid plus where everything starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Walls.
    pub grid: Grid,
    /// Pacman start.
    pub pacman: Position,
    /// Ghost starts, in reading order.
    pub ghosts: Vec<Position>,
    /// Cells holding food at the start.
    pub food: FoodSet,
}

impl Layout {
    /// Parse a layout from rows of text: `#` wall, `.` food, `_` or space empty path, `P` pacman
    /// start and `G` ghost start. Lowercase `p` and `g` are starts on a cell that holds food.
    pub fn parse(rows: &[&str]) -> Result<Self, LayoutError> {
        let height = rows.len();
        let width = rows.first().map_or(0, |row| row.chars().count());
        if height == 0 || width == 0 {
            return Err(LayoutError::Empty);
        }

        let mut tiles = Vec::with_capacity(width * height);
        let mut pacman = None;
        let mut ghosts = Vec::new();
        let mut food = FoodSet::new();
        for (row, line) in rows.iter().enumerate() {
            let found = line.chars().count();
            if found != width {
                return Err(LayoutError::RaggedRow {
                    row,
                    expected: width,
                    found,
                });
            }
            for (column, tile) in line.chars().enumerate() {
                let index = row * width + column;
                let position = Position::of_cell(column as Int, row as Int);
                match tile {
                    '#' => tiles.push(Tile::Wall),
                    '.' => {
                        tiles.push(Tile::Open);
                        food.insert(index);
                    }
                    '_' | ' ' => tiles.push(Tile::Open),
                    'P' | 'p' => {
                        if pacman.replace(position).is_some() {
                            return Err(LayoutError::DuplicatePacman);
                        }
                        tiles.push(Tile::Open);
                        if tile == 'p' {
                            food.insert(index);
                        }
                    }
                    'G' | 'g' => {
                        ghosts.push(position);
                        tiles.push(Tile::Open);
                        if tile == 'g' {
                            food.insert(index);
                        }
                    }
                    _ => {
                        return Err(LayoutError::UnknownTile { tile, row, column });
                    }
                }
            }
        }

        Ok(Self {
            grid: Grid {
                width,
                height,
                tiles,
            },
            pacman: pacman.ok_or(LayoutError::MissingPacman)?,
            ghosts,
            food,
        })
    }
}
