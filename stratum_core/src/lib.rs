// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene graph, anchors, and frame scheduling for incremental batch
//! rendering of nested 2-D box diagrams.
//!
//! `stratum_core` provides the data structures behind an interactive diagram
//! editor: a hierarchical transform graph with per-node scale-inheritance
//! policies, lazily evaluated derived points, dirty tracking, and a
//! coalescing frame scheduler. It is `no_std` compatible (with `alloc`) and
//! uses array-based struct-of-arrays storage with index handles for
//! cache-friendly traversal.
//!
//! # Architecture
//!
//! The crate is organized around a frame loop that turns editing mutations
//! into incremental GPU updates:
//!
//! ```text
//!   mutation ──► SceneStore (marks dirty) ──► Scheduler::request_render()
//!                                                  │
//!                     ┌────────────────────────────┘
//!                     ▼
//!   SceneStore::evaluate() ──► FrameChanges ──► batch index (stratum_render)
//!                                                  │
//!                     ┌────────────────────────────┘
//!                     ▼
//!   AnchorStore::advance_epoch() ──► Scheduler::frame_finished()
//! ```
//!
//! **[`scene`]** — Struct-of-arrays node tree with generational handles.
//! Local transforms, scale policies, and render properties are set by the
//! caller; world transforms and effective hidden state are computed by
//! evaluation.
//!
//! **[`transform`]** — Column-major 3×3 affine transform for node
//! positioning, with per-axis scale surgery for the inheritance policies.
//!
//! **[`anchor`]** — Derived points (`basis + offset * scale`) with
//! per-epoch memoization, chained to express shape corners and glyph runs.
//!
//! **[`dirty`]** — Deduplicating dirty sets drained in parent-before-child
//! order once per evaluation.
//!
//! **[`scheduler`]** — Render-request coalescing state machine with a
//! minimum inter-frame interval, driven by host timer wakes.
//!
//! **[`props`]** — Render properties: the (draw mode, texture, z-index, UV
//! quad) attributes that route an instance to a GPU batch.
//!
//! **[`diagram`]** — The assembly layer: containers with title bars, rows,
//! sockets and handles; glyph runs; connections; snapshot export/import.
//!
//! **[`trace`]** — [`TraceSink`](trace::TraceSink) trait and event types
//! for frame-loop instrumentation, with zero-overhead
//! [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one
//!   branch per call site).

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod anchor;
pub mod diagram;
pub mod dirty;
pub mod error;
pub mod props;
pub mod scene;
pub mod scheduler;
pub mod time;
pub mod trace;
pub mod transform;
