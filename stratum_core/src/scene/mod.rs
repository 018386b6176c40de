// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene node data model.
//!
//! A *node* is one rectangle in the diagram: a container root, a part of a
//! container (title bar, body, socket, handle), or a single glyph quad. Each
//! node has:
//!
//! - An identity ([`NodeId`]) — a generational handle that becomes stale
//!   when the node is destroyed, preventing use-after-free bugs at the API
//!   level.
//! - Topology — parent, first-child, and sibling links forming an ordered
//!   forest; child lists are append-only for live nodes, which is what
//!   keeps the batch index's enumeration order stable.
//! - **Local properties** set by the caller: local transform,
//!   scale-inheritance policy, node kind, render properties, hidden flag.
//! - **Computed properties** produced by
//!   [`evaluate`](SceneStore::evaluate): `world_transform` (policy-aware
//!   product of ancestor transforms) and `effective_hidden`.
//!
//! Nodes are stored in struct-of-arrays layout with index-based handles for
//! cache-friendly traversal.
//!
//! # Dirty tracking
//!
//! Transform, scale, hidden-flag, and topology mutations mark the affected
//! subtree on the transform channel (world matrices and effective hidden
//! state are inherited properties). [`evaluate`](SceneStore::evaluate)
//! drains the channel in parent-before-child order once per frame.

mod evaluate;
mod id;
mod store;
mod traverse;

pub use evaluate::FrameChanges;
pub use id::{ConnectionId, INVALID, NodeId, SceneEntity};
pub use store::{NodeKind, ScalePolicy, SceneStore};
pub use traverse::{Children, Subtree};
