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

//! Built-in worlds.

use crate::{Float, LayoutError, World};

/// Small world for the exact MDP solvers: one ghost, four food and 24 open cells.
pub const VALUE_ITERATION_LAYOUT: [&str; 9] = [
    "#########",
    "#___G___#",
    "#_##.##_#",
    "#_.###._#",
    "#_##.##_#",
    "#___P___#",
    "#########",
    "#########",
    "#########",
];

/// Larger world for the approximate learner: one ghost and 160 food. Both agents start on a
/// cell that holds food.
pub const LEARNING_LAYOUT: [&str; 20] = [
    "####################",
    "#g......#.......####",
    "#.##.##.#.##.##.####",
    "#...............####",
    "#.##.#.###.#.##.####",
    "#....#..#..#....####",
    "#.##.##.#.##.#######",
    "#.##.#.....#.#######",
    "#......###......####",
    "####.#.....#.##.####",
    "####.#.###.#.##.####",
    "#.......#.......####",
    "#.##.##.#.#####.####",
    "#..#....p....#..####",
    "##.#.#.###.#.#.#####",
    "#....#..#..#....####",
    "#.#####.#.#####.####",
    "#...............####",
    "####################",
    "####################",
];

/// Score lost per tick in the learning world.
pub const LEARNING_TIME_PENALTY: Float = 0.1;

/// The value iteration world.
pub fn value_iteration_world() -> Result<World, LayoutError> {
    World::from_rows(&VALUE_ITERATION_LAYOUT)
}

/// The learning world, with its time penalty.
pub fn learning_world() -> Result<World, LayoutError> {
    Ok(World::from_rows(&LEARNING_LAYOUT)?.with_time_penalty(LEARNING_TIME_PENALTY))
}
