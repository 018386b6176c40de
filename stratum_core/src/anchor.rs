// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Lazily evaluated derived points.
//!
//! An *anchor* expresses a 2-D point declaratively as
//! `basis + offset * scale`, where the basis is a fixed point, a scene
//! node's world origin, or another anchor. Shape corners, socket positions,
//! and glyph runs are all anchors; chaining one anchor to another is how a
//! corner is expressed relative to a shape's center, or a glyph relative to
//! its predecessor. Chain depth is bounded by scene nesting (typically
//! under 10) and must not cycle — acyclicity is a construction-time
//! discipline, not checked at runtime.
//!
//! # Epoch caching
//!
//! Each anchor memoizes its value with an epoch stamp. A value is computed
//! at most once per epoch; [`advance_epoch`](AnchorStore::advance_epoch) is
//! called by the frame engine exactly once after each completed render, so
//! reads during event handling between renders stay consistent. Mutating an
//! anchor ([`translate`](AnchorStore::translate),
//! [`reanchor`](AnchorStore::reanchor),
//! [`set_scale`](AnchorStore::set_scale)) resets its own stamp so the next
//! read is fresh; anchors *chained onto it* that were already read this
//! epoch keep their memoized value until the next epoch, or until
//! explicitly [`invalidate`](AnchorStore::invalidate)d.
//!
//! Evaluation is an explicit `value(&scene, id)` call returning a point and
//! updating the cache — there are no value-producing getters with hidden
//! side effects, and no process-wide registry.

use alloc::vec::Vec;

use kurbo::{Point, Vec2};

use crate::scene::{NodeId, SceneStore};

/// A handle to an anchor in an [`AnchorStore`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AnchorId(u32);

impl AnchorId {
    /// Returns the raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }
}

/// What an anchor's offset is measured from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AnchorBasis {
    /// A fixed point.
    Point(Point),
    /// A scene node's world origin (valid after the node's world matrix has
    /// been computed).
    Node(NodeId),
    /// Another anchor's value.
    Anchor(AnchorId),
}

/// Arena of derived points with per-epoch memoization.
#[derive(Clone, Debug, Default)]
pub struct AnchorStore {
    basis: Vec<AnchorBasis>,
    offset: Vec<Vec2>,
    scale: Vec<Vec2>,
    cached: Vec<Point>,
    stamp: Vec<u64>,
    epoch: u64,
}

impl AnchorStore {
    /// Creates an empty store at epoch 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: 1,
            ..Self::default()
        }
    }

    /// Creates an anchor with an explicit per-axis scale.
    pub fn create(&mut self, basis: AnchorBasis, offset: Vec2, scale: Vec2) -> AnchorId {
        let idx = self.basis.len();
        self.basis.push(basis);
        self.offset.push(offset);
        self.scale.push(scale);
        self.cached.push(Point::ZERO);
        self.stamp.push(0);
        #[expect(
            clippy::cast_possible_truncation,
            reason = "anchor count is bounded by the u32 arena size"
        )]
        let id = AnchorId(idx as u32);
        id
    }

    /// Creates an anchor with unit scale: `basis + offset`.
    pub fn anchored(&mut self, basis: AnchorBasis, offset: Vec2) -> AnchorId {
        self.create(basis, offset, Vec2::new(1.0, 1.0))
    }

    /// Evaluates an anchor, memoizing the result for the current epoch.
    pub fn value(&mut self, scene: &SceneStore, id: AnchorId) -> Point {
        let i = id.0 as usize;
        if self.stamp[i] == self.epoch {
            return self.cached[i];
        }
        let base = match self.basis[i] {
            AnchorBasis::Point(p) => p,
            AnchorBasis::Node(node) => scene.origin(node),
            AnchorBasis::Anchor(parent) => self.value(scene, parent),
        };
        let v = Point::new(
            base.x + self.offset[i].x * self.scale[i].x,
            base.y + self.offset[i].y * self.scale[i].y,
        );
        self.cached[i] = v;
        self.stamp[i] = self.epoch;
        v
    }

    /// Moves the anchor's origin to `dest`; all dependents shift with it.
    ///
    /// A chained basis delegates up the chain; a node basis degrades to the
    /// fixed destination point (the link to the node is severed, which is
    /// what "move this anchor somewhere else" means for a point that was
    /// riding on a node).
    pub fn translate(&mut self, id: AnchorId, dest: Point) {
        let i = id.0 as usize;
        match self.basis[i] {
            AnchorBasis::Point(_) | AnchorBasis::Node(_) => {
                self.basis[i] = AnchorBasis::Point(dest);
            }
            AnchorBasis::Anchor(parent) => self.translate(parent, dest),
        }
        self.stamp[i] = 0;
    }

    /// Rewrites the anchor's offset — keeps the origin, changes the derived
    /// point's local placement.
    pub fn reanchor(&mut self, id: AnchorId, offset: Vec2) {
        let i = id.0 as usize;
        self.offset[i] = offset;
        self.stamp[i] = 0;
    }

    /// Rewrites the anchor's per-axis scale factor.
    pub fn set_scale(&mut self, id: AnchorId, scale: Vec2) {
        let i = id.0 as usize;
        self.scale[i] = scale;
        self.stamp[i] = 0;
    }

    /// Forces recomputation of this anchor on its next read, without waiting
    /// for the epoch to advance. Used after mutating something an anchor
    /// chain depends on mid-epoch.
    pub fn invalidate(&mut self, id: AnchorId) {
        self.stamp[id.0 as usize] = 0;
    }

    /// Starts a new epoch, invalidating every memoized value at once.
    ///
    /// Called by the frame engine once per completed render.
    pub fn advance_epoch(&mut self) {
        self.epoch += 1;
    }

    /// The current epoch number.
    #[must_use]
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Number of anchors in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.basis.len()
    }

    /// Whether the store holds no anchors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.basis.is_empty()
    }
}
