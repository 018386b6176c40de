// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays node storage with allocation, topology, and property
//! management.

use alloc::vec::Vec;

use kurbo::Point;

use crate::dirty::DirtySet;
use crate::error::SceneError;
use crate::props::RenderProps;
use crate::transform::Transform2d;

use super::id::{INVALID, NodeId};
use super::traverse::{Children, Subtree};

/// How much of an ancestor's scale factor affects a descendant's effective
/// size. Selected once per node at construction and fixed for its lifetime.
///
/// The policies exist so that containers can keep fixed-height title bars
/// and fixed-size square handles no matter how much the container body is
/// stretched: a handle rides along with its parent's position while opting
/// out of the undesired axis scaling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScalePolicy {
    /// Ordinary affine composition; size and position both inherited.
    Full,
    /// The parent's Y scale is forced to 1 before composing — the node
    /// inherits parent X scaling only.
    LockX,
    /// The parent's X scale is forced to 1 before composing — the node
    /// inherits parent Y scaling only.
    LockY,
    /// Both parent scales are forced to 1; only the parent translation is
    /// inherited and the node's size comes purely from its local matrix.
    IgnoreScale,
}

/// What a transform node represents, dispatched by the batch index and the
/// editing layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// The root of a container subtree.
    Container,
    /// A rectangular part: title bar, body, property row, socket, or a
    /// resize/visibility handle.
    Handle,
    /// One fixed-metric letter quad of a text run.
    Glyph,
}

/// Struct-of-arrays storage for all transform nodes.
///
/// Nodes are addressed by [`NodeId`] handles. Internally, each node occupies
/// a slot in parallel arrays. Destroyed nodes are recycled via a free list,
/// and generation counters prevent stale handle access.
#[derive(Debug, Default)]
pub struct SceneStore {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) prev_sibling: Vec<u32>,

    // -- Local properties (set by callers) --
    pub(crate) local_transform: Vec<Transform2d>,
    pub(crate) policy: Vec<ScalePolicy>,
    pub(crate) kind: Vec<NodeKind>,
    pub(crate) props: Vec<Vec<RenderProps>>,
    pub(crate) hidden: Vec<bool>,

    // -- Computed properties (written by evaluate) --
    pub(crate) world_transform: Vec<Transform2d>,
    pub(crate) effective_hidden: Vec<bool>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,

    // -- Dirty tracking --
    pub(crate) transform_dirty: DirtySet,

    // -- Traversal cache --
    pub(crate) traversal_order: Vec<u32>,
    pub(crate) traversal_pos: Vec<u32>,
    pub(crate) traversal_dirty: bool,

    // -- Lifecycle tracking --
    pub(crate) pending_added: Vec<u32>,
    pub(crate) pending_removed: Vec<u32>,
}

impl SceneStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            traversal_dirty: true,
            ..Self::default()
        }
    }

    // -- Allocation API --

    /// Creates a new node and returns its handle.
    ///
    /// The node starts with an identity local transform, visible, and with
    /// no parent.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::EmptyRenderProps`] if `props` is empty — every
    /// node in the graph is drawable, and an instance with no render
    /// properties could never be routed to a batch.
    pub fn create_node(
        &mut self,
        kind: NodeKind,
        policy: ScalePolicy,
        props: Vec<RenderProps>,
    ) -> Result<NodeId, SceneError> {
        if props.is_empty() {
            return Err(SceneError::EmptyRenderProps);
        }

        let idx = if let Some(idx) = self.free_list.pop() {
            // Reuse a freed slot.
            self.generation[idx as usize] += 1;
            self.parent[idx as usize] = INVALID;
            self.first_child[idx as usize] = INVALID;
            self.next_sibling[idx as usize] = INVALID;
            self.prev_sibling[idx as usize] = INVALID;
            self.local_transform[idx as usize] = Transform2d::IDENTITY;
            self.policy[idx as usize] = policy;
            self.kind[idx as usize] = kind;
            self.props[idx as usize] = props;
            self.hidden[idx as usize] = false;
            self.world_transform[idx as usize] = Transform2d::IDENTITY;
            self.effective_hidden[idx as usize] = false;
            idx
        } else {
            // Allocate a new slot.
            let idx = self.len;
            self.len += 1;
            self.parent.push(INVALID);
            self.first_child.push(INVALID);
            self.next_sibling.push(INVALID);
            self.prev_sibling.push(INVALID);
            self.local_transform.push(Transform2d::IDENTITY);
            self.policy.push(policy);
            self.kind.push(kind);
            self.props.push(props);
            self.hidden.push(false);
            self.world_transform.push(Transform2d::IDENTITY);
            self.effective_hidden.push(false);
            self.generation.push(0);
            idx
        };

        self.traversal_dirty = true;
        self.pending_added.push(idx);
        self.transform_dirty.mark(idx);

        Ok(NodeId {
            idx,
            generation: self.generation[idx as usize],
        })
    }

    /// Destroys a node, freeing its slot for reuse.
    ///
    /// # Panics
    ///
    /// Panics if the node has children (remove them first, or use
    /// [`destroy_subtree`](Self::destroy_subtree)) or if the handle is
    /// stale.
    pub fn destroy_node(&mut self, id: NodeId) {
        self.validate(id);
        let idx = id.idx;
        assert!(
            self.first_child[idx as usize] == INVALID,
            "cannot destroy node with children"
        );

        // Remove from parent's child list if attached.
        if self.parent[idx as usize] != INVALID {
            self.unlink_from_parent(idx);
        }

        self.transform_dirty.unmark(idx);

        // Bump generation so old handles immediately fail validation.
        self.generation[idx as usize] += 1;

        self.free_list.push(idx);
        self.traversal_dirty = true;
        self.pending_removed.push(idx);
    }

    /// Destroys a node and its entire subtree, children first.
    pub fn destroy_subtree(&mut self, id: NodeId) {
        self.validate(id);
        // Collect the subtree pre-order, then destroy in reverse so every
        // node is childless when its turn comes.
        let order: Vec<NodeId> = self.subtree(id).collect();
        for &node in order.iter().rev() {
            self.destroy_node(node);
        }
    }

    /// Returns whether the given handle refers to a live node.
    #[must_use]
    pub fn is_alive(&self, id: NodeId) -> bool {
        (id.idx < self.len)
            && self.generation[id.idx as usize] == id.generation
            && !self.free_list.contains(&id.idx)
    }

    // -- Topology API --

    /// Adds `child` as the last child of `parent`.
    ///
    /// Marks the child's subtree for world recomputation under the new
    /// ancestry.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::Cycle`] if `child` is `parent` or an ancestor
    /// of it — the graph must stay a forest.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale, or if `child` already has a parent.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), SceneError> {
        self.validate(parent);
        self.validate(child);
        let p = parent.idx;
        let c = child.idx;
        assert!(
            self.parent[c as usize] == INVALID,
            "child already has a parent"
        );
        if self.is_self_or_ancestor(c, p) {
            return Err(SceneError::Cycle);
        }

        self.link_as_last_child(p, c);
        self.mark_subtree_transform(c);
        self.traversal_dirty = true;
        Ok(())
    }

    /// Removes `child` from its current parent, making it a root.
    ///
    /// Marks the child's subtree for world recomputation after detaching
    /// from the old ancestry.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the node has no parent.
    pub fn remove_from_parent(&mut self, child: NodeId) {
        self.validate(child);
        let c = child.idx;
        assert!(self.parent[c as usize] != INVALID, "node has no parent");

        self.unlink_from_parent(c);
        self.mark_subtree_transform(c);
        self.traversal_dirty = true;
    }

    /// Moves `child` to be the last child of `new_parent`, unlinking it from
    /// its current parent first (no-op if it has none).
    ///
    /// Removal from the old parent's child list is O(children of the old
    /// parent); the append is O(children of the new parent).
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::Cycle`] if `child` is `new_parent` or an
    /// ancestor of it. The child is left in place on error.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale.
    pub fn reparent(&mut self, child: NodeId, new_parent: NodeId) -> Result<(), SceneError> {
        self.validate(child);
        self.validate(new_parent);
        let c = child.idx;
        let p = new_parent.idx;
        if self.is_self_or_ancestor(c, p) {
            return Err(SceneError::Cycle);
        }

        if self.parent[c as usize] != INVALID {
            self.unlink_from_parent(c);
        }
        self.link_as_last_child(p, c);
        self.mark_subtree_transform(c);
        self.traversal_dirty = true;
        Ok(())
    }

    /// Returns the parent of a node, if any.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.validate(id);
        let p = self.parent[id.idx as usize];
        if p == INVALID {
            None
        } else {
            Some(NodeId {
                idx: p,
                generation: self.generation[p as usize],
            })
        }
    }

    /// Returns an iterator over the direct children of a node, in the order
    /// they were appended.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Children<'_> {
        self.validate(id);
        Children::new(self, self.first_child[id.idx as usize])
    }

    /// Returns a depth-first pre-order iterator over `id` and every node
    /// below it. This is the stable enumeration order the batch index relies
    /// on: the node itself, then its transform children depth-first.
    #[must_use]
    pub fn subtree(&self, id: NodeId) -> Subtree<'_> {
        self.validate(id);
        Subtree::new(self, id.idx)
    }

    /// Returns the root of the subtree containing `id` (possibly `id`
    /// itself).
    #[must_use]
    pub fn root_of(&self, id: NodeId) -> NodeId {
        self.validate(id);
        let mut idx = id.idx;
        while self.parent[idx as usize] != INVALID {
            idx = self.parent[idx as usize];
        }
        NodeId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Returns the handles of root nodes (those with no parent).
    #[must_use]
    pub fn roots(&self) -> Vec<NodeId> {
        let mut roots = Vec::new();
        for idx in 0..self.len {
            if self.parent[idx as usize] == INVALID && !self.free_list.contains(&idx) {
                roots.push(NodeId {
                    idx,
                    generation: self.generation[idx as usize],
                });
            }
        }
        roots
    }

    // -- Property getters (read-only, no dirty marking) --

    /// Returns the local transform of a node.
    #[must_use]
    pub fn local_transform(&self, id: NodeId) -> Transform2d {
        self.validate(id);
        self.local_transform[id.idx as usize]
    }

    /// Returns the scale-inheritance policy of a node.
    #[must_use]
    pub fn scale_policy(&self, id: NodeId) -> ScalePolicy {
        self.validate(id);
        self.policy[id.idx as usize]
    }

    /// Returns the kind of a node.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.validate(id);
        self.kind[id.idx as usize]
    }

    /// Returns the render properties of a node (always non-empty).
    #[must_use]
    pub fn props(&self, id: NodeId) -> &[RenderProps] {
        self.validate(id);
        &self.props[id.idx as usize]
    }

    /// Returns whether the node itself is flagged hidden.
    #[must_use]
    pub fn hidden(&self, id: NodeId) -> bool {
        self.validate(id);
        self.hidden[id.idx as usize]
    }

    /// Returns the computed world transform of a node.
    ///
    /// Only valid after [`evaluate`](Self::evaluate) (or
    /// [`update_world_subtree`](Self::update_world_subtree)) has run.
    #[must_use]
    pub fn world_transform(&self, id: NodeId) -> Transform2d {
        self.validate(id);
        self.world_transform[id.idx as usize]
    }

    /// Returns the translation component of a node's world matrix.
    ///
    /// Only valid after the most recent world recomputation.
    #[must_use]
    pub fn origin(&self, id: NodeId) -> Point {
        self.validate(id);
        self.world_transform[id.idx as usize].translation()
    }

    /// Returns whether the node is effectively hidden (including by an
    /// ancestor's hidden flag).
    ///
    /// Only valid after [`evaluate`](Self::evaluate) has been called.
    #[must_use]
    pub fn effective_hidden(&self, id: NodeId) -> bool {
        self.validate(id);
        self.effective_hidden[id.idx as usize]
    }

    // -- Mutation API (auto-marks dirty, never recomputes) --

    /// Replaces the local transform of a node.
    pub fn set_transform(&mut self, id: NodeId, transform: Transform2d) {
        self.validate(id);
        self.local_transform[id.idx as usize] = transform;
        self.mark_subtree_transform(id.idx);
    }

    /// Overwrites the translation component of the local matrix.
    pub fn set_position(&mut self, id: NodeId, x: f64, y: f64) {
        self.validate(id);
        self.local_transform[id.idx as usize].set_translation(x, y);
        self.mark_subtree_transform(id.idx);
    }

    /// Shifts the translation component of the local matrix by a delta.
    pub fn translate(&mut self, id: NodeId, dx: f64, dy: f64) {
        self.validate(id);
        let t = self.local_transform[id.idx as usize].translation();
        self.local_transform[id.idx as usize].set_translation(t.x + dx, t.y + dy);
        self.mark_subtree_transform(id.idx);
    }

    /// Overwrites the diagonal scale components of the local matrix.
    pub fn set_scale(&mut self, id: NodeId, sx: f64, sy: f64) {
        self.validate(id);
        self.local_transform[id.idx as usize].set_scale(sx, sy);
        self.mark_subtree_transform(id.idx);
    }

    /// Sets the hidden flag.
    ///
    /// Hidden state is inherited, so this is routed through the transform
    /// channel: the same drain pass recomputes both world transforms and
    /// `effective_hidden` for the subtree.
    pub fn set_hidden(&mut self, id: NodeId, hidden: bool) {
        self.validate(id);
        self.hidden[id.idx as usize] = hidden;
        self.mark_subtree_transform(id.idx);
    }

    /// Replaces the render properties of a node.
    ///
    /// The new payload reaches the GPU the next time the owning entity is
    /// mapped (mark it dirty in the frame engine).
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::EmptyRenderProps`] if `props` is empty.
    pub fn set_props(&mut self, id: NodeId, props: Vec<RenderProps>) -> Result<(), SceneError> {
        self.validate(id);
        if props.is_empty() {
            return Err(SceneError::EmptyRenderProps);
        }
        self.props[id.idx as usize] = props;
        Ok(())
    }

    // -- Internal helpers --

    /// Panics if the handle is stale.
    pub(crate) fn validate(&self, id: NodeId) {
        assert!(
            id.idx < self.len && self.generation[id.idx as usize] == id.generation,
            "stale NodeId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    /// Whether `maybe_ancestor` is `idx` or appears on `idx`'s parent chain.
    fn is_self_or_ancestor(&self, maybe_ancestor: u32, idx: u32) -> bool {
        let mut cur = idx;
        while cur != INVALID {
            if cur == maybe_ancestor {
                return true;
            }
            cur = self.parent[cur as usize];
        }
        false
    }

    /// Appends `c` to `p`'s child list.
    fn link_as_last_child(&mut self, p: u32, c: u32) {
        self.parent[c as usize] = p;
        self.prev_sibling[c as usize] = INVALID;
        self.next_sibling[c as usize] = INVALID;

        if self.first_child[p as usize] == INVALID {
            self.first_child[p as usize] = c;
        } else {
            // Walk to last child.
            let mut last = self.first_child[p as usize];
            while self.next_sibling[last as usize] != INVALID {
                last = self.next_sibling[last as usize];
            }
            self.next_sibling[last as usize] = c;
            self.prev_sibling[c as usize] = last;
        }
    }

    /// Removes `idx` from its parent's child list without touching dirty
    /// state.
    fn unlink_from_parent(&mut self, idx: u32) {
        let p = self.parent[idx as usize];
        let prev = self.prev_sibling[idx as usize];
        let next = self.next_sibling[idx as usize];

        if prev != INVALID {
            self.next_sibling[prev as usize] = next;
        } else {
            // Was first child.
            self.first_child[p as usize] = next;
        }

        if next != INVALID {
            self.prev_sibling[next as usize] = prev;
        }

        self.parent[idx as usize] = INVALID;
        self.prev_sibling[idx as usize] = INVALID;
        self.next_sibling[idx as usize] = INVALID;
    }

    /// Marks the subtree rooted at `idx` on the transform channel.
    ///
    /// World transforms and effective hidden state are inherited, so a
    /// change anywhere invalidates everything below it. Already-dirty
    /// branches are pruned: if a node is marked, its descendants were marked
    /// with it.
    pub(crate) fn mark_subtree_transform(&mut self, idx: u32) {
        let mut stack = alloc::vec![idx];
        while let Some(cur) = stack.pop() {
            if !self.transform_dirty.mark(cur) && cur != idx {
                continue;
            }
            let mut child = self.first_child[cur as usize];
            while child != INVALID {
                stack.push(child);
                child = self.next_sibling[child as usize];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use crate::props::{DrawMode, RenderProps, TextureId, UvQuad};

    use super::*;

    pub(super) fn fill_props() -> Vec<RenderProps> {
        vec![RenderProps::new(DrawMode::Fill, TextureId(0), UvQuad::FULL, 0).unwrap()]
    }

    fn node(store: &mut SceneStore) -> NodeId {
        store
            .create_node(NodeKind::Handle, ScalePolicy::Full, fill_props())
            .unwrap()
    }

    #[test]
    fn create_and_destroy() {
        let mut store = SceneStore::new();
        let id = node(&mut store);
        assert!(store.is_alive(id));
        store.destroy_node(id);
        assert!(!store.is_alive(id));
    }

    #[test]
    fn empty_props_rejected() {
        let mut store = SceneStore::new();
        let result = store.create_node(NodeKind::Handle, ScalePolicy::Full, vec![]);
        assert_eq!(result.unwrap_err(), SceneError::EmptyRenderProps);
        // Nothing was allocated.
        assert_eq!(store.roots().len(), 0);
    }

    #[test]
    fn generation_prevents_stale_access() {
        let mut store = SceneStore::new();
        let id1 = node(&mut store);
        store.destroy_node(id1);
        let id2 = node(&mut store);
        // id2 reuses the same slot but has a different generation.
        assert!(!store.is_alive(id1));
        assert!(store.is_alive(id2));
        assert_eq!(id1.idx, id2.idx);
        assert_ne!(id1.generation, id2.generation);
    }

    #[test]
    fn add_child_and_query() {
        let mut store = SceneStore::new();
        let parent = node(&mut store);
        let child1 = node(&mut store);
        let child2 = node(&mut store);

        store.add_child(parent, child1).unwrap();
        store.add_child(parent, child2).unwrap();

        assert_eq!(store.parent(child1), Some(parent));
        assert_eq!(store.parent(child2), Some(parent));

        let kids: Vec<_> = store.children(parent).collect();
        assert_eq!(kids, vec![child1, child2]);
    }

    #[test]
    fn add_child_rejects_cycles() {
        let mut store = SceneStore::new();
        let a = node(&mut store);
        let b = node(&mut store);
        let c = node(&mut store);
        store.add_child(a, b).unwrap();
        store.add_child(b, c).unwrap();

        // A node cannot become its own child, nor a child of its own
        // descendant.
        assert_eq!(store.reparent(a, a).unwrap_err(), SceneError::Cycle);
        assert_eq!(store.reparent(a, c).unwrap_err(), SceneError::Cycle);
        // The failed reparent left the topology untouched.
        assert_eq!(store.parent(a), None);
        assert_eq!(store.parent(c), Some(b));
    }

    #[test]
    fn remove_from_parent_works() {
        let mut store = SceneStore::new();
        let parent = node(&mut store);
        let child = node(&mut store);

        store.add_child(parent, child).unwrap();
        store.remove_from_parent(child);
        assert_eq!(store.parent(child), None);
        assert!(store.children(parent).next().is_none());
    }

    #[test]
    fn reparent_works() {
        let mut store = SceneStore::new();
        let p1 = node(&mut store);
        let p2 = node(&mut store);
        let child = node(&mut store);

        store.add_child(p1, child).unwrap();
        store.reparent(child, p2).unwrap();
        assert_eq!(store.parent(child), Some(p2));
        assert!(store.children(p1).next().is_none());
    }

    #[test]
    fn reparent_of_root_is_plain_attach() {
        let mut store = SceneStore::new();
        let p = node(&mut store);
        let orphan = node(&mut store);
        store.reparent(orphan, p).unwrap();
        assert_eq!(store.parent(orphan), Some(p));
    }

    #[test]
    fn root_of_walks_to_the_top() {
        let mut store = SceneStore::new();
        let a = node(&mut store);
        let b = node(&mut store);
        let c = node(&mut store);
        store.add_child(a, b).unwrap();
        store.add_child(b, c).unwrap();
        assert_eq!(store.root_of(c), a);
        assert_eq!(store.root_of(a), a);
    }

    #[test]
    fn destroy_subtree_removes_everything() {
        let mut store = SceneStore::new();
        let a = node(&mut store);
        let b = node(&mut store);
        let c = node(&mut store);
        store.add_child(a, b).unwrap();
        store.add_child(b, c).unwrap();

        store.destroy_subtree(a);
        assert!(!store.is_alive(a));
        assert!(!store.is_alive(b));
        assert!(!store.is_alive(c));
    }

    #[test]
    #[should_panic(expected = "cannot destroy node with children")]
    fn destroy_with_children_panics() {
        let mut store = SceneStore::new();
        let parent = node(&mut store);
        let child = node(&mut store);
        store.add_child(parent, child).unwrap();
        store.destroy_node(parent);
    }

    #[test]
    #[should_panic(expected = "stale NodeId")]
    fn destroyed_handle_panics_on_get_transform() {
        let mut store = SceneStore::new();
        let id = node(&mut store);
        store.destroy_node(id);
        let _ = store.world_transform(id);
    }

    #[test]
    #[should_panic(expected = "stale NodeId")]
    fn destroyed_handle_panics_on_set_transform() {
        let mut store = SceneStore::new();
        let id = node(&mut store);
        store.destroy_node(id);
        store.set_transform(id, Transform2d::IDENTITY);
    }

    #[test]
    fn translate_is_relative_set_position_absolute() {
        let mut store = SceneStore::new();
        let id = node(&mut store);
        store.set_position(id, 10.0, 20.0);
        store.translate(id, -4.0, 6.0);
        assert_eq!(
            store.local_transform(id).translation(),
            Point::new(6.0, 26.0)
        );
        store.set_position(id, 1.0, 1.0);
        assert_eq!(
            store.local_transform(id).translation(),
            Point::new(1.0, 1.0)
        );
    }

    #[test]
    fn mutations_mark_the_subtree() {
        let mut store = SceneStore::new();
        let parent = node(&mut store);
        let child = node(&mut store);
        store.add_child(parent, child).unwrap();
        let _ = store.evaluate();
        assert!(store.transform_dirty.is_empty());

        store.set_scale(parent, 2.0, 2.0);
        assert!(store.transform_dirty.is_marked(parent.idx));
        assert!(store.transform_dirty.is_marked(child.idx));
    }

    #[test]
    fn set_props_keeps_nonempty_invariant() {
        let mut store = SceneStore::new();
        let id = node(&mut store);
        assert_eq!(
            store.set_props(id, vec![]).unwrap_err(),
            SceneError::EmptyRenderProps
        );
        assert_eq!(store.props(id).len(), 1);
    }
}
