// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render-side failures.

use core::fmt;

use crate::batch::BatchKey;

/// An error raised while mapping entities into batches or submitting draws.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderError {
    /// Appending one more instance would exceed a batch's preallocated
    /// capacity. Nothing was written. Recoverable only by raising the
    /// configured capacity and rebatching; the current frame's remaining
    /// submissions are abandoned, but previously written batches and world
    /// matrices stay valid.
    Capacity {
        /// The batch that is full.
        key: BatchKey,
        /// Its configured instance capacity.
        capacity: u32,
    },
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Capacity { key, capacity } => write!(
                f,
                "batch {key:?} is full ({capacity} instances); raise the capacity and rebatch"
            ),
        }
    }
}

impl core::error::Error for RenderError {}
