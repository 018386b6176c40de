// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! GPU batch index, batch storage, and frame engine for stratum.
//!
//! This crate sits between [`stratum_core`]'s scene evaluation and a
//! platform graphics backend. It routes every scene entity's instance data
//! into type-grouped, GPU-resident batches and keeps the mapping current
//! with O(1) in-place updates, so per-frame cost tracks the number of
//! *changed* entities rather than total scene size. It defines:
//!
//! - [`BatchKey`] / [`BatchStorage`] — batch identity, paint ordering, and
//!   the fixed-capacity instance buffers
//! - [`BatchIndex`] — the (entity → batch, buffer slot) mapping behind
//!   incremental updates
//! - [`FrameEngine`] — the dirty-drain → evaluate → map → submit pipeline
//! - [`GpuBackend`] / [`TextureProvider`] — the contracts a platform
//!   backend implements
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables frame-loop instrumentation in
//!   the engine.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

mod backend;
mod batch;
mod engine;
mod error;
mod index;

pub use backend::{BufferId, DrawCall, GpuBackend, MemoryBackend, TextureBinding, TextureProvider};
pub use batch::{BatchConfig, BatchKey, BatchStorage, MATRIX_FLOATS, UV_FLOATS};
pub use engine::{ConnectionEndpoints, FrameEngine, FrameStats};
pub use error::RenderError;
pub use index::BatchIndex;
