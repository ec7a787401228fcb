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

use graph_search::{a_star, breadth_first_distance, SearchOutcome};

use crate::{Action, Float, FoodSet, MoveSet, Position, World, CELL_WIDTH};

fn chase(world: &World, moves: &MoveSet, from: Position, target: Position) -> SearchOutcome<Action> {
    let step_length = moves.step_length();
    a_star(
        from,
        |position: &Position| {
            Action::MOVES
                .into_iter()
                .map(|action| (action, *position + moves.displacement(action)))
                .filter(|(_, next)| world.is_valid(next))
                .collect()
        },
        // Admissible only when every move covers a whole cell. With shorter moves the one-cell
        // goal radius lets it overestimate by up to CELL_WIDTH / step_length steps.
        |position: &Position| position.distance(&target) / step_length,
        |position: &Position| position.distance(&target) < Float::from(CELL_WIDTH),
    )
}

/// First action of an A* path from `from` to within one cell of `target`.
///
/// Returns [`Action::Stop`] if `from` already is that close, and also, with a warning, if
/// `target` cannot be reached at all.
pub fn best_chase(world: &World, moves: &MoveSet, from: Position, target: Position) -> Action {
    match chase(world, moves, from, target) {
        SearchOutcome::Found { first_action, .. } => first_action.unwrap_or(Action::Stop),
        SearchOutcome::Exhausted => {
            tracing::warn!(?from, ?target, "no path to chase target, standing still");
            Action::Stop
        }
    }
}

/// Number of A* steps from `from` to within one cell of `target`, or None if unreachable.
pub fn chase_distance(
    world: &World,
    moves: &MoveSet,
    from: Position,
    target: Position,
) -> Option<usize> {
    chase(world, moves, from, target).cost()
}

/// BFS hop count from `from` to the nearest cell in `food`. No reachable food counts as 0.
pub fn nearest_food_distance(
    world: &World,
    moves: &MoveSet,
    from: Position,
    food: &FoodSet,
) -> usize {
    breadth_first_distance(
        from,
        |position: &Position| {
            Action::MOVES
                .into_iter()
                .map(|action| *position + moves.displacement(action))
                .filter(|next| world.is_valid(next))
                .collect()
        },
        |position: &Position| {
            world
                .grid()
                .index_of(position)
                .map_or(false, |index| food.contains(&index))
        },
    )
    .unwrap_or(0)
}
