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

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::SearchError;

/// A heap entry. The sequence number is assigned at push time and only ever increases, so two
/// entries with equal priority come out in the order they went in.
#[derive(Debug)]
struct Entry<_Priority, _Item> {
    priority: _Priority,
    sequence: u64,
    item: _Item,
}

impl<_Priority: PartialOrd, _Item> PartialEq for Entry<_Priority, _Item> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<_Priority: PartialOrd, _Item> Eq for Entry<_Priority, _Item> {}

impl<_Priority: PartialOrd, _Item> PartialOrd for Entry<_Priority, _Item> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// BinaryHeap is a max-heap, so the comparison is reversed to pop the smallest (priority,
// sequence) tuple first. Incomparable priorities (NaN) are treated as equal and fall back to
// insertion order.
impl<_Priority: PartialOrd, _Item> Ord for Entry<_Priority, _Item> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .partial_cmp(&self.priority)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// Deterministic min-priority queue. Ties are broken first-in first-out.
#[derive(Debug)]
pub struct PriorityQueue<_Priority: PartialOrd, _Item> {
    heap: BinaryHeap<Entry<_Priority, _Item>>,
    next_sequence: u64,
}

impl<_Priority: PartialOrd, _Item> Default for PriorityQueue<_Priority, _Item> {
    fn default() -> Self {
        Self::new()
    }
}

impl<_Priority: PartialOrd, _Item> PriorityQueue<_Priority, _Item> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_sequence: 0,
        }
    }

    pub fn push(&mut self, priority: _Priority, item: _Item) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.heap.push(Entry {
            priority,
            sequence,
            item,
        });
    }

    /// Remove the item with the smallest priority. An empty queue means the caller's search
    /// space is exhausted.
    pub fn pop(&mut self) -> Result<(_Priority, _Item), SearchError> {
        self.heap
            .pop()
            .map(|entry| (entry.priority, entry.item))
            .ok_or(SearchError::EmptyQueue)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
