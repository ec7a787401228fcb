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

//! Uninformed and informed graph search.
//!
//! See Chapter 3, Solving Problems by Searching: breadth-first search (section 3.4.1) and A*
//! search (section 3.5.2). Both searches share the same skeleton: a frontier, and a visited set
//! that a node joins the moment it is generated. Callers replan every tick, so A* only keeps the
//! first action of each frontier path instead of the whole path.

use std::collections::VecDeque;
use std::hash::Hash;

mod priority_queue;

pub use priority_queue::PriorityQueue;

pub type Float = f64;
pub type HashSet<T> = rustc_hash::FxHashSet<T>;

/// Graph search error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    /// Nothing left on the frontier.
    #[error("priority queue is empty, search space exhausted")]
    EmptyQueue,
}

/// Result of a search. `Exhausted` means the frontier ran dry before any goal was popped; it is
/// never a valid answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome<_Action> {
    Found {
        /// First action of the discovered path. None if the start node already is a goal.
        first_action: Option<_Action>,
        /// Number of steps of the discovered path.
        cost: usize,
    },
    Exhausted,
}

impl<_Action: Copy> SearchOutcome<_Action> {
    pub fn first_action(&self) -> Option<_Action> {
        match self {
            SearchOutcome::Found { first_action, .. } => *first_action,
            SearchOutcome::Exhausted => None,
        }
    }

    pub fn cost(&self) -> Option<usize> {
        match self {
            SearchOutcome::Found { cost, .. } => Some(*cost),
            SearchOutcome::Exhausted => None,
        }
    }
}

/// A* search with unit step costs.
///
/// Nodes are ordered by `(f, g)` with `f = g + h`, and then by insertion order, so equal nodes
/// are expanded first-in first-out and the result is reproducible. The goal test is applied to
/// popped nodes. `heuristic` must be expressed in steps for the search to stay admissible.
pub fn a_star<_Node, _Action, _Successors, _Heuristic, _Goal>(
    start: _Node,
    mut successors: _Successors,
    heuristic: _Heuristic,
    is_goal: _Goal,
) -> SearchOutcome<_Action>
where
    _Node: Copy + Eq + Hash,
    _Action: Copy,
    _Successors: FnMut(&_Node) -> Vec<(_Action, _Node)>,
    _Heuristic: Fn(&_Node) -> Float,
    _Goal: Fn(&_Node) -> bool,
{
    let mut frontier: PriorityQueue<(Float, usize), (_Node, Option<_Action>)> =
        PriorityQueue::new();
    let mut visited: HashSet<_Node> = HashSet::default();
    visited.insert(start);
    frontier.push((heuristic(&start), 0), (start, None));

    let mut expansions: usize = 0;
    loop {
        let ((_, cost), (node, first_action)) = match frontier.pop() {
            Ok(entry) => entry,
            Err(SearchError::EmptyQueue) => {
                tracing::trace!(expansions, "a* frontier exhausted");
                return SearchOutcome::Exhausted;
            }
        };
        if is_goal(&node) {
            return SearchOutcome::Found { first_action, cost };
        }
        expansions += 1;
        for (action, next) in successors(&node) {
            if !visited.insert(next) {
                continue;
            }
            let next_cost = cost + 1;
            frontier.push(
                (next_cost as Float + heuristic(&next), next_cost),
                (next, first_action.or(Some(action))),
            );
        }
    }
}

/// Breadth-first search for the nearest node satisfying `is_goal`. Returns the hop count, or
/// None when every reachable node has been visited without meeting a goal.
pub fn breadth_first_distance<_Node, _Successors, _Goal>(
    start: _Node,
    mut successors: _Successors,
    is_goal: _Goal,
) -> Option<usize>
where
    _Node: Copy + Eq + Hash,
    _Successors: FnMut(&_Node) -> Vec<_Node>,
    _Goal: Fn(&_Node) -> bool,
{
    let mut frontier: VecDeque<(usize, _Node)> = VecDeque::new();
    let mut visited: HashSet<_Node> = HashSet::default();
    visited.insert(start);
    frontier.push_back((0, start));

    while let Some((cost, node)) = frontier.pop_front() {
        if is_goal(&node) {
            return Some(cost);
        }
        for next in successors(&node) {
            if visited.insert(next) {
                frontier.push_back((cost + 1, next));
            }
        }
    }
    None
}
