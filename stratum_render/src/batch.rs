// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Batch keys and GPU-resident batch storage.
//!
//! A *batch* groups every instance that can be drawn with one instanced
//! call: equal (z-index, draw mode, texture). Per batch the storage owns
//! two fixed-capacity buffers — instance world matrices (9 `f32` per slot)
//! and texture-coordinate quads (8 `f32` per slot) — plus a logical length
//! per buffer that only ever grows. In-place slot writes never move data,
//! which is what lets the batch index update a single instance without
//! touching its neighbors.
//!
//! Batches live in a `BTreeMap` keyed by [`BatchKey`], whose derived
//! ordering is (z ascending, draw mode, texture); iterating the map *is*
//! paint order.

use alloc::collections::BTreeMap;

use stratum_core::props::{DrawMode, RenderProps, TextureId, Z_MIN};

use crate::backend::{BufferId, DrawCall, GpuBackend};
use crate::error::RenderError;

/// Floats per matrix slot.
pub const MATRIX_FLOATS: u32 = 9;

/// Floats per texture-coordinate slot.
pub const UV_FLOATS: u32 = 8;

/// Identity of one batch. Equal keys ⇒ drawn together in one instanced
/// call. The derived `Ord` (z first, then mode, then texture) fixes paint
/// order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BatchKey {
    /// Paint-order index.
    pub z: i16,
    /// How instances are assembled.
    pub mode: DrawMode,
    /// The texture all instances sample.
    pub texture: TextureId,
}

impl BatchKey {
    /// The batch a render property routes to. Texture coordinates are
    /// deliberately not part of the key — equivalent instances may sample
    /// different regions.
    #[must_use]
    pub const fn of(props: &RenderProps) -> Self {
        Self {
            z: props.z,
            mode: props.mode,
            texture: props.texture,
        }
    }
}

/// Static batch configuration, fixed for a session.
#[derive(Clone, Copy, Debug)]
pub struct BatchConfig {
    /// Slot capacity of every batch buffer. A quad instance consumes one
    /// matrix slot and one UV slot; a connection consumes two matrix
    /// slots, so at most `max_instances / 2` connections fit.
    pub max_instances: u32,
    /// The texture the fixed connection batch samples.
    pub connection_texture: TextureId,
}

impl BatchConfig {
    /// Default slot capacity, comfortably above the largest diagrams the
    /// editor produces.
    pub const DEFAULT_MAX_INSTANCES: u32 = 5000;

    /// Configuration at the default capacity.
    #[must_use]
    pub const fn new(connection_texture: TextureId) -> Self {
        Self {
            max_instances: Self::DEFAULT_MAX_INSTANCES,
            connection_texture,
        }
    }

    /// Returns the configuration with a different slot capacity.
    #[must_use]
    pub const fn with_max_instances(mut self, max_instances: u32) -> Self {
        self.max_instances = max_instances;
        self
    }
}

/// One batch's buffers and logical lengths, in slots.
#[derive(Clone, Copy, Debug)]
struct Batch {
    matrix_buffer: BufferId,
    uv_buffer: BufferId,
    matrix_len: u32,
    uv_len: u32,
}

/// Owner of every batch's GPU buffers, in paint order.
#[derive(Debug)]
pub struct BatchStorage {
    config: BatchConfig,
    batches: BTreeMap<BatchKey, Batch>,
}

impl BatchStorage {
    /// Creates an empty storage. Batches are allocated on first use.
    #[must_use]
    pub const fn new(config: BatchConfig) -> Self {
        Self {
            config,
            batches: BTreeMap::new(),
        }
    }

    /// The static configuration.
    #[must_use]
    pub const fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// The fixed key every connection maps to: the lowest z, line mode,
    /// the configured connection texture. Sorts before all quad batches of
    /// the same z, so lines paint underneath boxes.
    #[must_use]
    pub const fn connection_key(&self) -> BatchKey {
        BatchKey {
            z: Z_MIN,
            mode: DrawMode::Line,
            texture: self.config.connection_texture,
        }
    }

    /// Whether a batch exists for `key`.
    #[must_use]
    pub fn contains(&self, key: BatchKey) -> bool {
        self.batches.contains_key(&key)
    }

    /// Number of live batches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    /// Whether no batch has been created yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Creates the batch for `key` if it does not exist yet, allocating
    /// both buffers at the configured capacity.
    pub fn ensure_batch(&mut self, backend: &mut dyn GpuBackend, key: BatchKey) {
        if self.batches.contains_key(&key) {
            return;
        }
        let batch = Batch {
            matrix_buffer: backend.create_buffer(self.config.max_instances * MATRIX_FLOATS),
            uv_buffer: backend.create_buffer(self.config.max_instances * UV_FLOATS),
            matrix_len: 0,
            uv_len: 0,
        };
        self.batches.insert(key, batch);
    }

    /// Appends a matrix payload at the batch's current length and returns
    /// the slot it landed in.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Capacity`] when the batch is full; nothing is
    /// written.
    pub fn append_matrix(
        &mut self,
        backend: &mut dyn GpuBackend,
        key: BatchKey,
        matrix: &[f32; 9],
    ) -> Result<u32, RenderError> {
        let capacity = self.config.max_instances;
        let batch = self.batch_mut(key);
        if batch.matrix_len >= capacity {
            return Err(RenderError::Capacity { key, capacity });
        }
        let slot = batch.matrix_len;
        batch.matrix_len += 1;
        let buffer = batch.matrix_buffer;
        backend.write_buffer(buffer, slot * MATRIX_FLOATS, matrix);
        Ok(slot)
    }

    /// Appends a texture-coordinate payload at the batch's current length
    /// and returns the slot it landed in.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Capacity`] when the batch is full; nothing is
    /// written.
    pub fn append_uv(
        &mut self,
        backend: &mut dyn GpuBackend,
        key: BatchKey,
        uv: &[f32; 8],
    ) -> Result<u32, RenderError> {
        let capacity = self.config.max_instances;
        let batch = self.batch_mut(key);
        if batch.uv_len >= capacity {
            return Err(RenderError::Capacity { key, capacity });
        }
        let slot = batch.uv_len;
        batch.uv_len += 1;
        let buffer = batch.uv_buffer;
        backend.write_buffer(buffer, slot * UV_FLOATS, uv);
        Ok(slot)
    }

    /// Overwrites the matrix payload at a previously returned slot. The
    /// logical length is unchanged; the fixed slot width means a write can
    /// never spill into a neighboring instance.
    ///
    /// # Panics
    ///
    /// Panics if the slot was never appended.
    pub fn write_matrix_at(
        &mut self,
        backend: &mut dyn GpuBackend,
        key: BatchKey,
        slot: u32,
        matrix: &[f32; 9],
    ) {
        let batch = self.batch_mut(key);
        assert!(slot < batch.matrix_len, "matrix slot {slot} was never appended");
        let buffer = batch.matrix_buffer;
        backend.write_buffer(buffer, slot * MATRIX_FLOATS, matrix);
    }

    /// Overwrites the texture-coordinate payload at a previously returned
    /// slot. The logical length is unchanged.
    ///
    /// # Panics
    ///
    /// Panics if the slot was never appended.
    pub fn write_uv_at(
        &mut self,
        backend: &mut dyn GpuBackend,
        key: BatchKey,
        slot: u32,
        uv: &[f32; 8],
    ) {
        let batch = self.batch_mut(key);
        assert!(slot < batch.uv_len, "uv slot {slot} was never appended");
        let buffer = batch.uv_buffer;
        backend.write_buffer(buffer, slot * UV_FLOATS, uv);
    }

    /// Logical matrix length of a batch, in slots.
    #[must_use]
    pub fn matrix_len(&self, key: BatchKey) -> u32 {
        self.batches.get(&key).map_or(0, |b| b.matrix_len)
    }

    /// Logical texture-coordinate length of a batch, in slots.
    #[must_use]
    pub fn uv_len(&self, key: BatchKey) -> u32 {
        self.batches.get(&key).map_or(0, |b| b.uv_len)
    }

    /// Resets every batch's logical length to zero, keeping the allocated
    /// buffers. The first step of a full rebatch.
    pub fn reset_lengths(&mut self) {
        for batch in self.batches.values_mut() {
            batch.matrix_len = 0;
            batch.uv_len = 0;
        }
    }

    /// Issues one instanced draw per non-empty batch, in paint order.
    /// Returns `(batches drawn, total instances)`.
    pub fn submit_all(&self, backend: &mut dyn GpuBackend) -> (u32, u32) {
        let mut drawn = 0;
        let mut instances = 0;
        for (&key, batch) in &self.batches {
            let count = if key.mode == DrawMode::Line {
                // Two endpoint matrices per line instance.
                batch.matrix_len / 2
            } else {
                batch.uv_len
            };
            if count == 0 {
                continue;
            }
            backend.draw(&DrawCall {
                mode: key.mode,
                texture: key.texture,
                matrix_buffer: batch.matrix_buffer,
                uv_buffer: batch.uv_buffer,
                instances: count,
            });
            drawn += 1;
            instances += count;
        }
        (drawn, instances)
    }

    fn batch_mut(&mut self, key: BatchKey) -> &mut Batch {
        self.batches
            .get_mut(&key)
            .expect("batch must be created before use")
    }
}

#[cfg(test)]
mod tests {
    use stratum_core::props::{UvQuad, Z_DEFAULT};

    use crate::backend::MemoryBackend;

    use super::*;

    fn key(z: i16, mode: DrawMode) -> BatchKey {
        BatchKey {
            z,
            mode,
            texture: TextureId(0),
        }
    }

    fn storage() -> BatchStorage {
        BatchStorage::new(BatchConfig::new(TextureId(2)).with_max_instances(4))
    }

    const M: [f32; 9] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 5.0, 6.0, 1.0];

    #[test]
    fn key_of_props_ignores_uv() {
        let a = RenderProps::new(DrawMode::Fill, TextureId(3), UvQuad::FULL, 2).unwrap();
        let b = RenderProps::new(
            DrawMode::Fill,
            TextureId(3),
            UvQuad::from_strip(1, 4, 0.005),
            2,
        )
        .unwrap();
        assert_eq!(BatchKey::of(&a), BatchKey::of(&b));
        assert_eq!(BatchKey::of(&a).z, Z_DEFAULT + 2);
    }

    #[test]
    fn keys_order_by_z_then_mode() {
        let mut keys = [
            key(12, DrawMode::Outline),
            key(9, DrawMode::Outline),
            key(12, DrawMode::Fill),
        ];
        keys.sort();
        assert_eq!(
            keys,
            [
                key(9, DrawMode::Outline),
                key(12, DrawMode::Fill),
                key(12, DrawMode::Outline),
            ]
        );
    }

    #[test]
    fn append_advances_write_does_not() {
        let mut backend = MemoryBackend::new();
        let mut storage = storage();
        let k = key(10, DrawMode::Fill);
        storage.ensure_batch(&mut backend, k);

        let s0 = storage.append_matrix(&mut backend, k, &M).unwrap();
        let s1 = storage.append_matrix(&mut backend, k, &M).unwrap();
        assert_eq!((s0, s1), (0, 1));
        assert_eq!(storage.matrix_len(k), 2);

        let mut updated = M;
        updated[6] = -1.0;
        storage.write_matrix_at(&mut backend, k, s0, &updated);
        assert_eq!(storage.matrix_len(k), 2);
    }

    #[test]
    fn slot_writes_leave_neighbors_untouched() {
        let mut backend = MemoryBackend::new();
        let mut storage = storage();
        let k = key(10, DrawMode::Fill);
        storage.ensure_batch(&mut backend, k);

        let a = storage.append_matrix(&mut backend, k, &M).unwrap();
        let mut b_payload = M;
        b_payload[6] = 99.0;
        let b = storage.append_matrix(&mut backend, k, &b_payload).unwrap();

        let batch = storage.batches[&k];
        let before: alloc::vec::Vec<f32> =
            backend.buffer(batch.matrix_buffer)[(b * MATRIX_FLOATS) as usize..][..9].to_vec();

        let mut a_updated = M;
        a_updated[7] = -42.0;
        storage.write_matrix_at(&mut backend, k, a, &a_updated);

        let after = &backend.buffer(batch.matrix_buffer)[(b * MATRIX_FLOATS) as usize..][..9];
        assert_eq!(before, after, "slot B must be bit-identical");
        assert_eq!(
            backend.buffer(batch.matrix_buffer)[(a * MATRIX_FLOATS) as usize + 7],
            -42.0
        );
    }

    #[test]
    fn capacity_is_reported_not_overrun() {
        let mut backend = MemoryBackend::new();
        let mut storage =
            BatchStorage::new(BatchConfig::new(TextureId(2)).with_max_instances(2));
        let k = key(10, DrawMode::Fill);
        storage.ensure_batch(&mut backend, k);

        storage.append_matrix(&mut backend, k, &M).unwrap();
        storage.append_matrix(&mut backend, k, &M).unwrap();
        let err = storage.append_matrix(&mut backend, k, &M).unwrap_err();
        assert_eq!(err, RenderError::Capacity { key: k, capacity: 2 });
        // The failed append changed nothing.
        assert_eq!(storage.matrix_len(k), 2);
    }

    #[test]
    fn submit_draws_in_paint_order_and_skips_empties() {
        let mut backend = MemoryBackend::new();
        let mut storage = storage();
        let top = key(20, DrawMode::Fill);
        let bottom = key(5, DrawMode::Fill);
        let empty = key(1, DrawMode::Outline);
        // Created out of paint order on purpose.
        storage.ensure_batch(&mut backend, top);
        storage.ensure_batch(&mut backend, empty);
        storage.ensure_batch(&mut backend, bottom);

        storage.append_matrix(&mut backend, top, &M).unwrap();
        storage.append_uv(&mut backend, top, &[0.0; 8]).unwrap();
        storage.append_matrix(&mut backend, bottom, &M).unwrap();
        storage.append_uv(&mut backend, bottom, &[0.0; 8]).unwrap();

        let (batches, instances) = storage.submit_all(&mut backend);
        assert_eq!((batches, instances), (2, 2));
        let draws = backend.draws();
        assert_eq!(draws.len(), 2);
        // Lower z first.
        assert_eq!(draws[0].matrix_buffer, storage.batches[&bottom].matrix_buffer);
        assert_eq!(draws[1].matrix_buffer, storage.batches[&top].matrix_buffer);
    }

    #[test]
    fn connection_batch_counts_two_matrices_per_instance() {
        let mut backend = MemoryBackend::new();
        let mut storage = storage();
        let k = storage.connection_key();
        assert_eq!(k.z, Z_MIN);
        assert_eq!(k.mode, DrawMode::Line);
        storage.ensure_batch(&mut backend, k);

        storage.append_matrix(&mut backend, k, &M).unwrap();
        storage.append_matrix(&mut backend, k, &M).unwrap();
        let (_, instances) = storage.submit_all(&mut backend);
        assert_eq!(instances, 1);
    }

    #[test]
    fn reset_keeps_buffers_but_zeroes_lengths() {
        let mut backend = MemoryBackend::new();
        let mut storage = storage();
        let k = key(10, DrawMode::Fill);
        storage.ensure_batch(&mut backend, k);
        storage.append_matrix(&mut backend, k, &M).unwrap();
        let buffer = storage.batches[&k].matrix_buffer;

        storage.reset_lengths();
        assert_eq!(storage.matrix_len(k), 0);
        // Re-appending reuses the same allocation at slot 0.
        let slot = storage.append_matrix(&mut backend, k, &M).unwrap();
        assert_eq!(slot, 0);
        assert_eq!(storage.batches[&k].matrix_buffer, buffer);
    }
}
