// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The contract a graphics backend implements.
//!
//! The render crate owns *what* is drawn (batch membership, buffer layout,
//! paint order); the backend owns *how* (API objects, pipelines, attribute
//! binding, the actual instanced draw). Buffers are addressed in `f32`
//! units throughout — the batch storage never thinks in bytes.
//!
//! Window and surface setup, shader compilation, and texture pixel
//! generation all live behind this boundary. The core's only view of a
//! texture is [`TextureProvider`]: an opaque id in, a unit plus pixel
//! dimensions out.

use alloc::vec::Vec;
use core::fmt;

use stratum_core::props::{DrawMode, TextureId};

/// A handle to a backend-owned GPU buffer.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub u32);

impl fmt::Debug for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BufferId({})", self.0)
    }
}

/// One instanced draw covering a whole batch.
#[derive(Clone, Copy, Debug)]
pub struct DrawCall {
    /// How the instance geometry is assembled.
    pub mode: DrawMode,
    /// The texture every instance samples.
    pub texture: TextureId,
    /// Per-instance world matrices (9 `f32` each; 18 for a connection).
    pub matrix_buffer: BufferId,
    /// Per-instance texture coordinates (8 `f32` each). Unused by
    /// [`Line`](DrawMode::Line) batches, which sample a fixed coordinate.
    pub uv_buffer: BufferId,
    /// Number of instances to draw.
    pub instances: u32,
}

/// What a platform graphics backend implements.
///
/// All operations are synchronous from the caller's point of view; a
/// backend may internally record and defer, but the written data must be
/// what the next draw observes.
pub trait GpuBackend {
    /// Allocates a buffer holding `float_capacity` `f32`s and returns its
    /// handle. Buffers are fixed-size for their whole lifetime.
    fn create_buffer(&mut self, float_capacity: u32) -> BufferId;

    /// Overwrites `data.len()` floats at `float_offset`.
    fn write_buffer(&mut self, id: BufferId, float_offset: u32, data: &[f32]);

    /// Issues one instanced draw.
    fn draw(&mut self, call: &DrawCall);
}

/// A texture as visible to the core: a bound unit plus pixel dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureBinding {
    /// The texture unit the backend bound this texture to.
    pub unit: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// The external atlas supplier.
///
/// Pixel generation (palette strips, the glyph atlas) happens outside the
/// core; the core only ever asks where a texture ended up.
pub trait TextureProvider {
    /// Resolves a texture id to its binding, or `None` if the id was never
    /// registered.
    fn texture(&self, id: TextureId) -> Option<TextureBinding>;
}

/// An in-memory [`GpuBackend`] holding buffers as plain `Vec<f32>`s.
///
/// Used by the test suites in this crate and for headless inspection of
/// what a frame would upload and draw. Writes past a buffer's capacity
/// panic, mirroring the hard fault a real backend would hit.
#[derive(Clone, Debug, Default)]
pub struct MemoryBackend {
    buffers: Vec<Vec<f32>>,
    /// Every draw issued since creation (or the last [`Self::take_draws`]).
    draws: Vec<DrawCall>,
}

impl MemoryBackend {
    /// Creates a backend with no buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read access to a buffer's contents.
    #[must_use]
    pub fn buffer(&self, id: BufferId) -> &[f32] {
        &self.buffers[id.0 as usize]
    }

    /// The draws issued so far, oldest first.
    #[must_use]
    pub fn draws(&self) -> &[DrawCall] {
        &self.draws
    }

    /// Takes and clears the recorded draws (one frame's worth).
    pub fn take_draws(&mut self) -> Vec<DrawCall> {
        core::mem::take(&mut self.draws)
    }
}

impl GpuBackend for MemoryBackend {
    fn create_buffer(&mut self, float_capacity: u32) -> BufferId {
        let id = BufferId(
            u32::try_from(self.buffers.len()).expect("buffer count exceeds u32"),
        );
        self.buffers.push(alloc::vec![0.0; float_capacity as usize]);
        id
    }

    fn write_buffer(&mut self, id: BufferId, float_offset: u32, data: &[f32]) {
        let buffer = &mut self.buffers[id.0 as usize];
        let start = float_offset as usize;
        buffer[start..start + data.len()].copy_from_slice(data);
    }

    fn draw(&mut self, call: &DrawCall) {
        self.draws.push(*call);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_backend_stores_and_overwrites() {
        let mut backend = MemoryBackend::new();
        let buf = backend.create_buffer(8);
        backend.write_buffer(buf, 0, &[1.0, 2.0, 3.0]);
        backend.write_buffer(buf, 2, &[9.0]);
        assert_eq!(backend.buffer(buf)[..4], [1.0, 2.0, 9.0, 0.0]);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn memory_backend_rejects_overflow_writes() {
        let mut backend = MemoryBackend::new();
        let buf = backend.create_buffer(2);
        backend.write_buffer(buf, 1, &[1.0, 2.0]);
    }

    #[test]
    fn draws_are_recorded_in_order() {
        let mut backend = MemoryBackend::new();
        let a = backend.create_buffer(9);
        let b = backend.create_buffer(8);
        let call = DrawCall {
            mode: DrawMode::Fill,
            texture: TextureId(0),
            matrix_buffer: a,
            uv_buffer: b,
            instances: 3,
        };
        backend.draw(&call);
        assert_eq!(backend.draws().len(), 1);
        assert_eq!(backend.take_draws()[0].instances, 3);
        assert!(backend.draws().is_empty());
    }
}
