// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The batch index: where each entity's instance data lives.
//!
//! Mapping an entity routes every render property it contributes to the
//! right batch and remembers the buffer slot each payload landed in, so a
//! repeat mapping is a set of O(1) in-place writes rather than a
//! re-insertion. The recorded slot lists are keyed by (batch, entity) and
//! are filled in the entity's *stable enumeration order* — the node itself,
//! then its transform children depth-first. Child lists are append-only for
//! live nodes, so position `n` in a slot list means the same primitive
//! every frame; slot lists never shrink or reorder, growth only appends
//! (a newly added child simply runs off the end of the list and triggers
//! fresh appends).
//!
//! Destroyed entities leave their slots behind as inert dead data; the
//! index does not compact in place. The editing layer is expected to
//! trigger a full rebatch instead (see
//! [`FrameEngine::rebatch_all`](crate::FrameEngine::rebatch_all)).

use alloc::vec::Vec;

use hashbrown::HashMap;

use stratum_core::scene::{ConnectionId, NodeId, SceneEntity, SceneStore};

use crate::backend::GpuBackend;
use crate::batch::{BatchKey, BatchStorage};
use crate::error::RenderError;

/// A hidden instance rasterizes to nothing: all four corners of the unit
/// quad collapse onto the origin at w = 0.
const ZERO_MATRIX: [f32; 9] = [0.0; 9];

/// Recorded buffer slots for one (batch, entity) pairing, in enumeration
/// order.
#[derive(Clone, Debug, Default)]
struct SlotList {
    matrix: Vec<u32>,
    uv: Vec<u32>,
}

/// Maps scene entities to (batch, buffer slot) and keeps the mapping
/// current.
#[derive(Debug, Default)]
pub struct BatchIndex {
    slots: HashMap<(BatchKey, SceneEntity), SlotList>,
    /// Per-batch position counters, reset at the start of each container
    /// mapping. The cursor value is the position in the entity's slot list
    /// the next payload for that batch belongs at.
    cursors: HashMap<BatchKey, usize>,
}

impl BatchIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets every recorded slot. Pair with
    /// [`BatchStorage::reset_lengths`] for a full rebatch.
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Maps a container subtree: for every render property of the root and
    /// each descendant (depth-first), writes the instance's world matrix
    /// and texture coordinates into its batch — appending on first sight,
    /// overwriting in place thereafter.
    ///
    /// World matrices and effective hidden state must be current
    /// (evaluate first). Hidden instances keep their slots but get a zero
    /// matrix payload, so visibility changes never disturb the offsets of
    /// later instances.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Capacity`] if an append would exceed a
    /// batch's configured capacity. Slots recorded before the failure stay
    /// valid.
    pub fn map_container(
        &mut self,
        scene: &SceneStore,
        storage: &mut BatchStorage,
        backend: &mut dyn GpuBackend,
        root: NodeId,
    ) -> Result<(), RenderError> {
        self.cursors.clear();
        let entity = SceneEntity::Container(root);

        for node in scene.subtree(root) {
            let world = if scene.effective_hidden(node) {
                ZERO_MATRIX
            } else {
                scene.world_transform(node).to_f32_array()
            };

            for props in scene.props(node) {
                let key = BatchKey::of(props);
                storage.ensure_batch(backend, key);

                let cursor = self.cursors.entry(key).or_insert(0);
                let position = *cursor;
                *cursor += 1;

                let list = self.slots.entry((key, entity)).or_default();
                if position < list.matrix.len() {
                    storage.write_matrix_at(backend, key, list.matrix[position], &world);
                    storage.write_uv_at(backend, key, list.uv[position], &props.uv.0);
                } else {
                    let matrix_slot = storage.append_matrix(backend, key, &world)?;
                    let uv_slot = storage.append_uv(backend, key, &props.uv.0)?;
                    list.matrix.push(matrix_slot);
                    list.uv.push(uv_slot);
                }
            }
        }
        Ok(())
    }

    /// Maps a connection: exactly two endpoint matrices (the sockets' world
    /// matrices) into the fixed connection batch, with no render-property
    /// iteration.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Capacity`] if the connection batch cannot
    /// hold two more matrices; in that case nothing is written.
    pub fn map_connection(
        &mut self,
        scene: &SceneStore,
        storage: &mut BatchStorage,
        backend: &mut dyn GpuBackend,
        id: ConnectionId,
        a: NodeId,
        b: NodeId,
    ) -> Result<(), RenderError> {
        let key = storage.connection_key();
        storage.ensure_batch(backend, key);

        let matrix_a = scene.world_transform(a).to_f32_array();
        let matrix_b = scene.world_transform(b).to_f32_array();

        let list = self.slots.entry((key, SceneEntity::Connection(id))).or_default();
        if list.matrix.is_empty() {
            // Both endpoints or neither: check capacity for the pair up
            // front so a half-mapped connection can never exist.
            let capacity = storage.config().max_instances;
            if storage.matrix_len(key) + 2 > capacity {
                return Err(RenderError::Capacity { key, capacity });
            }
            let slot_a = storage.append_matrix(backend, key, &matrix_a)?;
            let slot_b = storage.append_matrix(backend, key, &matrix_b)?;
            list.matrix.push(slot_a);
            list.matrix.push(slot_b);
        } else {
            storage.write_matrix_at(backend, key, list.matrix[0], &matrix_a);
            storage.write_matrix_at(backend, key, list.matrix[1], &matrix_b);
        }
        Ok(())
    }

    /// Number of (batch, entity) pairings recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether nothing has been mapped yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use stratum_core::props::{DrawMode, RenderProps, TextureId, UvQuad};
    use stratum_core::scene::{NodeKind, ScalePolicy};
    use stratum_core::transform::Transform2d;

    use crate::backend::MemoryBackend;
    use crate::batch::{BatchConfig, MATRIX_FLOATS, UV_FLOATS};

    use super::*;

    fn props(z_bias: i16) -> RenderProps {
        RenderProps::new(DrawMode::Fill, TextureId(0), UvQuad::FULL, z_bias).unwrap()
    }

    fn node(scene: &mut SceneStore, list: Vec<RenderProps>) -> NodeId {
        scene
            .create_node(NodeKind::Handle, ScalePolicy::Full, list)
            .unwrap()
    }

    fn setup() -> (SceneStore, BatchStorage, BatchIndex, MemoryBackend) {
        (
            SceneStore::new(),
            BatchStorage::new(BatchConfig::new(TextureId(2)).with_max_instances(16)),
            BatchIndex::new(),
            MemoryBackend::new(),
        )
    }

    #[test]
    fn first_map_appends_second_overwrites() {
        let (mut scene, mut storage, mut index, mut backend) = setup();
        let a = node(&mut scene, vec![props(0)]);
        scene.set_position(a, 5.0, 5.0);
        let _ = scene.evaluate();

        index.map_container(&scene, &mut storage, &mut backend, a).unwrap();
        let key = BatchKey::of(&props(0));
        assert_eq!(storage.matrix_len(key), 1);

        // Moving and re-mapping writes in place: the length stays put.
        scene.set_position(a, 9.0, 9.0);
        let _ = scene.evaluate();
        index.map_container(&scene, &mut storage, &mut backend, a).unwrap();
        assert_eq!(storage.matrix_len(key), 1);
    }

    #[test]
    fn updating_one_node_leaves_the_other_region_bit_identical() {
        let (mut scene, mut storage, mut index, mut backend) = setup();
        let a = node(&mut scene, vec![props(0)]);
        let b = node(&mut scene, vec![props(0)]);
        scene.set_position(a, 1.0, 1.0);
        scene.set_position(b, 2.0, 2.0);
        let _ = scene.evaluate();

        index.map_container(&scene, &mut storage, &mut backend, a).unwrap();
        index.map_container(&scene, &mut storage, &mut backend, b).unwrap();

        let key = BatchKey::of(&props(0));
        // B landed after A in the same batch.
        let b_slot = index.slots[&(key, SceneEntity::Container(b))].matrix[0];
        assert_eq!(b_slot, 1);
        storage.submit_all(&mut backend);
        let buffer_id = backend.take_draws()[0].matrix_buffer;
        let b_region_before: Vec<f32> =
            backend.buffer(buffer_id)[(b_slot * MATRIX_FLOATS) as usize..][..9].to_vec();

        // Update A only.
        scene.set_position(a, -40.0, 13.0);
        let _ = scene.evaluate();
        index.map_container(&scene, &mut storage, &mut backend, a).unwrap();

        let b_region_after =
            &backend.buffer(buffer_id)[(b_slot * MATRIX_FLOATS) as usize..][..9];
        assert_eq!(b_region_before, b_region_after);
        // And A's region did change.
        let a_slot = index.slots[&(key, SceneEntity::Container(a))].matrix[0];
        assert_eq!(
            backend.buffer(buffer_id)[(a_slot * MATRIX_FLOATS) as usize + 6],
            -40.0
        );
    }

    #[test]
    fn subtree_maps_depth_first_into_per_batch_lists() {
        let (mut scene, mut storage, mut index, mut backend) = setup();
        // Root and grandchild share a batch; the child lands in another.
        let root = node(&mut scene, vec![props(0)]);
        let child = node(&mut scene, vec![props(5)]);
        let grandchild = node(&mut scene, vec![props(0)]);
        scene.add_child(root, child).unwrap();
        scene.add_child(child, grandchild).unwrap();
        let _ = scene.evaluate();

        index
            .map_container(&scene, &mut storage, &mut backend, root)
            .unwrap();

        let shared = BatchKey::of(&props(0));
        let other = BatchKey::of(&props(5));
        let entity = SceneEntity::Container(root);
        assert_eq!(index.slots[&(shared, entity)].matrix.len(), 2);
        assert_eq!(index.slots[&(other, entity)].matrix.len(), 1);
        assert_eq!(storage.matrix_len(shared), 2);
        assert_eq!(storage.uv_len(shared), 2);
    }

    #[test]
    fn added_child_appends_without_disturbing_recorded_slots() {
        let (mut scene, mut storage, mut index, mut backend) = setup();
        let root = node(&mut scene, vec![props(0)]);
        let first = node(&mut scene, vec![props(0)]);
        scene.add_child(root, first).unwrap();
        let _ = scene.evaluate();
        index
            .map_container(&scene, &mut storage, &mut backend, root)
            .unwrap();

        let key = BatchKey::of(&props(0));
        let entity = SceneEntity::Container(root);
        let slots_before = index.slots[&(key, entity)].matrix.clone();

        // A later child runs off the end of the list and appends.
        let second = node(&mut scene, vec![props(0)]);
        scene.add_child(root, second).unwrap();
        let _ = scene.evaluate();
        index
            .map_container(&scene, &mut storage, &mut backend, root)
            .unwrap();

        let slots_after = &index.slots[&(key, entity)].matrix;
        assert_eq!(&slots_after[..slots_before.len()], &slots_before[..]);
        assert_eq!(slots_after.len(), slots_before.len() + 1);
        assert_eq!(storage.matrix_len(key), 3);
    }

    #[test]
    fn hidden_nodes_keep_slots_with_zero_payload() {
        let (mut scene, mut storage, mut index, mut backend) = setup();
        let root = node(&mut scene, vec![props(0)]);
        let child = node(&mut scene, vec![props(0)]);
        scene.add_child(root, child).unwrap();
        scene.set_position(root, 3.0, 0.0);
        let _ = scene.evaluate();
        index
            .map_container(&scene, &mut storage, &mut backend, root)
            .unwrap();

        scene.set_hidden(child, true);
        let _ = scene.evaluate();
        index
            .map_container(&scene, &mut storage, &mut backend, root)
            .unwrap();

        let key = BatchKey::of(&props(0));
        // Length unchanged: the hidden instance kept its slot.
        assert_eq!(storage.matrix_len(key), 2);
        let child_slot = index.slots[&(key, SceneEntity::Container(root))].matrix[1];
        storage.submit_all(&mut backend);
        let buffer = backend.take_draws()[0].matrix_buffer;
        assert_eq!(
            &backend.buffer(buffer)[(child_slot * MATRIX_FLOATS) as usize..][..9],
            &[0.0; 9]
        );
    }

    #[test]
    fn uv_updates_reach_the_recorded_slot() {
        let (mut scene, mut storage, mut index, mut backend) = setup();
        let a = node(&mut scene, vec![props(0)]);
        let _ = scene.evaluate();
        index.map_container(&scene, &mut storage, &mut backend, a).unwrap();

        // Swap the texture region; mode/texture/z unchanged, so the batch
        // and slot stay put.
        scene
            .set_props(
                a,
                vec![RenderProps::new(
                    DrawMode::Fill,
                    TextureId(0),
                    UvQuad::from_strip(2, 4, 0.005),
                    0,
                )
                .unwrap()],
            )
            .unwrap();
        index.map_container(&scene, &mut storage, &mut backend, a).unwrap();

        let key = BatchKey::of(&props(0));
        assert_eq!(storage.uv_len(key), 1);
        let slot = index.slots[&(key, SceneEntity::Container(a))].uv[0];
        storage.submit_all(&mut backend);
        let buffer = backend.take_draws()[0].uv_buffer;
        let uv = &backend.buffer(buffer)[(slot * UV_FLOATS) as usize..][..8];
        assert_eq!(uv, &UvQuad::from_strip(2, 4, 0.005).0);
    }

    #[test]
    fn connection_maps_two_matrices_and_updates_in_place() {
        let (mut scene, mut storage, mut index, mut backend) = setup();
        let a = node(&mut scene, vec![props(0)]);
        let b = node(&mut scene, vec![props(0)]);
        scene.set_position(a, 1.0, 0.0);
        scene.set_position(b, 2.0, 0.0);
        let _ = scene.evaluate();

        let id = ConnectionId(0);
        index
            .map_connection(&scene, &mut storage, &mut backend, id, a, b)
            .unwrap();
        let key = storage.connection_key();
        assert_eq!(storage.matrix_len(key), 2);

        scene.set_position(a, 50.0, 0.0);
        let _ = scene.evaluate();
        index
            .map_connection(&scene, &mut storage, &mut backend, id, a, b)
            .unwrap();
        assert_eq!(storage.matrix_len(key), 2, "update must not re-append");

        storage.submit_all(&mut backend);
        let buffer = backend.take_draws()[0].matrix_buffer;
        assert_eq!(backend.buffer(buffer)[6], 50.0);
    }

    #[test]
    fn connection_capacity_failure_writes_nothing() {
        let (mut scene, _, mut index, mut backend) = setup();
        let mut storage =
            BatchStorage::new(BatchConfig::new(TextureId(2)).with_max_instances(3));
        let a = node(&mut scene, vec![props(0)]);
        let b = node(&mut scene, vec![props(0)]);
        let _ = scene.evaluate();

        index
            .map_connection(&scene, &mut storage, &mut backend, ConnectionId(0), a, b)
            .unwrap();
        // One matrix slot left — not enough for an endpoint pair.
        let err = index
            .map_connection(&scene, &mut storage, &mut backend, ConnectionId(1), a, b)
            .unwrap_err();
        assert!(matches!(err, RenderError::Capacity { .. }));
        assert_eq!(storage.matrix_len(storage.connection_key()), 2);
        assert_eq!(index.len(), 1, "the failed connection must not be recorded");
    }

    #[test]
    fn capacity_error_surfaces_from_container_mapping() {
        let (mut scene, _, mut index, mut backend) = setup();
        let mut storage =
            BatchStorage::new(BatchConfig::new(TextureId(2)).with_max_instances(1));
        let root = node(&mut scene, vec![props(0)]);
        let child = node(&mut scene, vec![props(0)]);
        scene.add_child(root, child).unwrap();
        let _ = scene.evaluate();

        let err = index
            .map_container(&scene, &mut storage, &mut backend, root)
            .unwrap_err();
        assert!(matches!(err, RenderError::Capacity { capacity: 1, .. }));
    }

    #[test]
    fn clear_forgets_recorded_slots() {
        let (mut scene, mut storage, mut index, mut backend) = setup();
        let a = node(&mut scene, vec![props(0)]);
        let _ = scene.evaluate();
        index.map_container(&scene, &mut storage, &mut backend, a).unwrap();
        assert!(!index.is_empty());

        index.clear();
        storage.reset_lengths();
        assert!(index.is_empty());

        // Remapping starts from slot zero again.
        index.map_container(&scene, &mut storage, &mut backend, a).unwrap();
        let key = BatchKey::of(&props(0));
        assert_eq!(index.slots[&(key, SceneEntity::Container(a))].matrix[0], 0);
    }
}
