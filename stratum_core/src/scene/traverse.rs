// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree traversal utilities.

use alloc::vec::Vec;

use super::id::{INVALID, NodeId};
use super::store::SceneStore;

/// An iterator over the direct children of a node.
///
/// Created by [`SceneStore::children`].
#[derive(Debug)]
pub struct Children<'a> {
    store: &'a SceneStore,
    current: u32,
}

impl<'a> Children<'a> {
    pub(crate) fn new(store: &'a SceneStore, first: u32) -> Self {
        Self {
            store,
            current: first,
        }
    }
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = self.store.next_sibling[idx as usize];
        Some(NodeId {
            idx,
            generation: self.store.generation[idx as usize],
        })
    }
}

/// A depth-first pre-order iterator over a node and its descendants.
///
/// Child lists are append-only for live nodes, so this order is stable
/// between frames — the property the batch index's per-entity offset lists
/// depend on. Created by [`SceneStore::subtree`].
#[derive(Debug)]
pub struct Subtree<'a> {
    store: &'a SceneStore,
    stack: Vec<u32>,
}

impl<'a> Subtree<'a> {
    pub(crate) fn new(store: &'a SceneStore, root: u32) -> Self {
        Self {
            store,
            stack: alloc::vec![root],
        }
    }
}

impl Iterator for Subtree<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let idx = self.stack.pop()?;
        // Push children in reverse so the first child is visited next.
        let mut children = Vec::new();
        let mut child = self.store.first_child[idx as usize];
        while child != INVALID {
            children.push(child);
            child = self.store.next_sibling[child as usize];
        }
        self.stack.extend(children.iter().rev());
        Some(NodeId {
            idx,
            generation: self.store.generation[idx as usize],
        })
    }
}
