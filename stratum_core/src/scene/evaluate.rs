// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame evaluation and change tracking.
//!
//! Evaluation follows a drain-recompute pattern:
//!
//! 1. If topology changed, rebuild the depth-first pre-order traversal and
//!    the slot → position table.
//! 2. Drain the transform channel in traversal order (parent before child)
//!    and recompute each node's `world_transform` according to its
//!    scale-inheritance policy, plus `effective_hidden` as
//!    `parent_effective_hidden || hidden`.
//!
//! Recomputation is idempotent: evaluating twice under identical inputs
//! yields bit-identical matrices, and a node whose ancestry did not change
//! keeps its previous world matrix untouched — the whole point of keeping
//! per-frame cost proportional to the number of changed nodes.
//!
//! [`FrameChanges`] uses raw slot indices (`u32`) rather than [`NodeId`]
//! handles, matching the dirty set's representation; consumers that need
//! handles walk back through the store.
//!
//! [`NodeId`]: super::NodeId

use alloc::vec::Vec;

use crate::transform::Transform2d;

use super::id::{INVALID, NodeId};
use super::store::{ScalePolicy, SceneStore};

/// The set of changes produced by a single [`SceneStore::evaluate`] call.
#[derive(Clone, Debug, Default)]
pub struct FrameChanges {
    /// Slots whose world transform was recomputed.
    pub transforms: Vec<u32>,
    /// Slots that transitioned from visible to effectively hidden.
    pub hidden: Vec<u32>,
    /// Slots that transitioned from effectively hidden to visible.
    pub unhidden: Vec<u32>,
    /// Slots added since the last evaluate.
    pub added: Vec<u32>,
    /// Slots removed since the last evaluate.
    pub removed: Vec<u32>,
    /// Whether the tree topology changed (traversal order was rebuilt).
    pub topology_changed: bool,
}

impl FrameChanges {
    /// Clears all change lists.
    pub fn clear(&mut self) {
        self.transforms.clear();
        self.hidden.clear();
        self.unhidden.clear();
        self.added.clear();
        self.removed.clear();
        self.topology_changed = false;
    }
}

/// Composes a parent world matrix with a local matrix under a policy.
fn compose(policy: ScalePolicy, parent_world: &Transform2d, local: &Transform2d) -> Transform2d {
    let parent = match policy {
        ScalePolicy::Full => *parent_world,
        ScalePolicy::LockX => parent_world.with_scale(parent_world.scale_x(), 1.0),
        ScalePolicy::LockY => parent_world.with_scale(1.0, parent_world.scale_y()),
        ScalePolicy::IgnoreScale => parent_world.with_scale(1.0, 1.0),
    };
    parent * *local
}

impl SceneStore {
    /// Evaluates the scene, recomputing dirty world transforms and returning
    /// the set of changes.
    pub fn evaluate(&mut self) -> FrameChanges {
        let mut changes = FrameChanges::default();
        self.evaluate_into(&mut changes);
        changes
    }

    /// Like [`evaluate`](Self::evaluate), but reuses a caller-provided
    /// buffer to avoid allocation.
    pub fn evaluate_into(&mut self, changes: &mut FrameChanges) {
        changes.clear();

        // Rebuild traversal order if needed.
        if self.traversal_dirty {
            self.rebuild_traversal_order();
            changes.topology_changed = true;
            self.traversal_dirty = false;
        }

        // Drain the transform channel in parent-before-child order. Freed
        // slots that were marked before destruction fall out here.
        let dirty = self.transform_dirty.drain_ordered_by(&self.traversal_pos);
        for &idx in &dirty {
            self.recompute_slot(idx, changes);
        }
        changes.transforms = dirty;

        // Move lifecycle lists.
        core::mem::swap(&mut self.pending_added, &mut changes.added);
        core::mem::swap(&mut self.pending_removed, &mut changes.removed);
    }

    /// Recomputes the world matrices of `root` and its whole subtree
    /// immediately, without draining dirty state.
    ///
    /// The editing layer uses this when it needs fresh world positions
    /// between frames (e.g. resolving a socket position while a connection
    /// is being created). Pending dirty marks stay pending; the next
    /// [`evaluate`](Self::evaluate) recomputes the same slots again, which
    /// is idempotent.
    pub fn update_world_subtree(&mut self, root: NodeId) {
        self.validate(root);
        let nodes: Vec<u32> = self.subtree(root).map(|n| n.idx).collect();
        let mut scratch = FrameChanges::default();
        for idx in nodes {
            self.recompute_slot(idx, &mut scratch);
        }
    }

    /// Recomputes one slot's world matrix and effective hidden state from
    /// its parent. The parent must already be current.
    fn recompute_slot(&mut self, idx: u32, changes: &mut FrameChanges) {
        let parent_idx = self.parent[idx as usize];
        let local = &self.local_transform[idx as usize];
        let world = if parent_idx == INVALID {
            *local
        } else {
            compose(
                self.policy[idx as usize],
                &self.world_transform[parent_idx as usize],
                local,
            )
        };
        self.world_transform[idx as usize] = world;

        let parent_hidden =
            parent_idx != INVALID && self.effective_hidden[parent_idx as usize];
        let new_hidden = parent_hidden || self.hidden[idx as usize];
        let old_hidden = self.effective_hidden[idx as usize];
        if new_hidden != old_hidden {
            if new_hidden {
                changes.hidden.push(idx);
            } else {
                changes.unhidden.push(idx);
            }
            self.effective_hidden[idx as usize] = new_hidden;
        }
    }

    /// Returns the current traversal order (depth-first pre-order).
    ///
    /// Only valid after [`evaluate`](Self::evaluate) has been called at
    /// least once.
    #[must_use]
    pub fn traversal_order(&self) -> &[u32] {
        &self.traversal_order
    }

    /// Rebuilds the depth-first pre-order traversal of all live nodes and
    /// the slot → position table used to order dirty drains.
    fn rebuild_traversal_order(&mut self) {
        self.traversal_order.clear();
        for idx in 0..self.len {
            if self.parent[idx as usize] == INVALID && !self.free_list.contains(&idx) {
                self.dfs_collect(idx);
            }
        }

        self.traversal_pos.clear();
        self.traversal_pos.resize(self.len as usize, u32::MAX);
        for (pos, &idx) in self.traversal_order.iter().enumerate() {
            #[expect(
                clippy::cast_possible_truncation,
                reason = "slot count is bounded by the u32 arena size"
            )]
            {
                self.traversal_pos[idx as usize] = pos as u32;
            }
        }
    }

    /// Depth-first pre-order collection starting from `idx`.
    fn dfs_collect(&mut self, idx: u32) {
        self.traversal_order.push(idx);
        let mut child = self.first_child[idx as usize];
        while child != INVALID {
            self.dfs_collect(child);
            child = self.next_sibling[child as usize];
        }
    }
}
