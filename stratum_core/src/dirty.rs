// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty tracking for the scene arena.
//!
//! Changed slots are collected into a [`DirtySet`] between frames and
//! drained once per evaluation. Two properties matter for correctness:
//!
//! - **Deduplication** — marking the same slot repeatedly between drains
//!   records it once. Duplicate marks are allowed and cheap; writes during
//!   the drain are idempotent, so "last processed wins" holds trivially.
//! - **Drain order** — world-matrix recomputation must see a parent before
//!   any of its children. [`drain_ordered_by`](DirtySet::drain_ordered_by)
//!   sorts the drained slots by their position in the depth-first pre-order
//!   traversal, which is exactly parent-before-child order.
//!
//! Subtree propagation (marking a node marks its descendants, because world
//! transforms and effective hidden state are inherited) is the caller's
//! job — the scene store walks the subtree at mark time, using
//! [`mark`](DirtySet::mark)'s return value to prune already-dirty branches.

use alloc::vec::Vec;

/// A deduplicating set of dirty slot indices with stable drain ordering.
#[derive(Clone, Debug, Default)]
pub struct DirtySet {
    flagged: Vec<bool>,
    order: Vec<u32>,
}

impl DirtySet {
    /// Creates an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            flagged: Vec::new(),
            order: Vec::new(),
        }
    }

    /// Marks a slot dirty. Returns `false` if it was already marked.
    pub fn mark(&mut self, idx: u32) -> bool {
        let i = idx as usize;
        if i >= self.flagged.len() {
            self.flagged.resize(i + 1, false);
        }
        if self.flagged[i] {
            return false;
        }
        self.flagged[i] = true;
        self.order.push(idx);
        true
    }

    /// Whether a slot is currently marked.
    #[must_use]
    pub fn is_marked(&self, idx: u32) -> bool {
        self.flagged.get(idx as usize).copied().unwrap_or(false)
    }

    /// Unmarks a slot without draining (used when a slot is destroyed).
    pub fn unmark(&mut self, idx: u32) {
        let i = idx as usize;
        if i < self.flagged.len() && self.flagged[i] {
            self.flagged[i] = false;
            self.order.retain(|&o| o != idx);
        }
    }

    /// Number of marked slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether nothing is marked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Drains every marked slot in mark order.
    pub fn drain(&mut self) -> Vec<u32> {
        for &idx in &self.order {
            self.flagged[idx as usize] = false;
        }
        core::mem::take(&mut self.order)
    }

    /// Drains every marked slot, ordered by `position[idx]` ascending.
    ///
    /// Slots whose position reads [`u32::MAX`] (freed or detached from the
    /// traversal) are dropped from the result.
    pub fn drain_ordered_by(&mut self, position: &[u32]) -> Vec<u32> {
        let mut out = self.drain();
        out.retain(|&idx| {
            position
                .get(idx as usize)
                .is_some_and(|&pos| pos != u32::MAX)
        });
        out.sort_unstable_by_key(|&idx| position[idx as usize]);
        out
    }
}
