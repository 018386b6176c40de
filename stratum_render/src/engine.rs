// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The frame engine: dirty drain → evaluate → map → submit.
//!
//! [`FrameEngine`] glues the pieces into one frame pipeline. Within a
//! frame the ordering guarantees hold by construction: evaluation finishes
//! before any batch mapping reads a world matrix, and all mapping finishes
//! before any draw is submitted. Everything runs synchronously on the
//! caller's thread; the only suspension point in the whole pipeline is the
//! scheduler's inter-frame cooldown, which the host drives with timer
//! wakes.
//!
//! The frame protocol:
//!
//! 1. Mutate the scene, [`mark_dirty`](FrameEngine::mark_dirty) the
//!    affected entities, call [`request_render`](FrameEngine::request_render).
//! 2. On [`Begin`](RequestOutcome::Begin), call
//!    [`render_frame`](FrameEngine::render_frame).
//! 3. Wake at [`next_wake`](FrameEngine::next_wake) and call
//!    [`poll`](FrameEngine::poll); when it returns `true`, render the
//!    trailing frame.
//!
//! Moving a container silently moves its sockets, so the editing layer
//! marks both the container *and* its attached connections dirty.

use alloc::boxed::Box;
use alloc::vec::Vec;

use stratum_core::anchor::AnchorStore;
use stratum_core::diagram::Diagram;
use stratum_core::scene::{ConnectionId, NodeId, SceneEntity, SceneStore};
use stratum_core::scheduler::{RequestOutcome, Scheduler, SchedulerConfig};
use stratum_core::time::HostTime;
use stratum_core::trace::{TraceEvent, TraceSink, Tracer};

use crate::backend::GpuBackend;
use crate::batch::{BatchConfig, BatchStorage};
use crate::error::RenderError;
use crate::index::BatchIndex;

/// Resolves a connection id to its two endpoint sockets.
///
/// The engine stays decoupled from the editing layer's bookkeeping through
/// this seam; [`Diagram`] implements it directly.
pub trait ConnectionEndpoints {
    /// The endpoint sockets of a connection, or `None` if it no longer
    /// exists.
    fn endpoints(&self, id: ConnectionId) -> Option<(NodeId, NodeId)>;
}

impl ConnectionEndpoints for Diagram {
    fn endpoints(&self, id: ConnectionId) -> Option<(NodeId, NodeId)> {
        Self::endpoints(self, id)
    }
}

/// What one completed frame did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Nodes whose world transform was recomputed.
    pub recomputed: u32,
    /// Non-empty batches drawn.
    pub batches: u32,
    /// Total instances across all draws.
    pub instances: u32,
}

/// Owns the batch index, batch storage, scheduler, and dirty queue.
#[derive(Debug)]
pub struct FrameEngine {
    storage: BatchStorage,
    index: BatchIndex,
    scheduler: Scheduler,
    tracer: Tracer,
    dirty: Vec<SceneEntity>,
    frame: u64,
}

impl FrameEngine {
    /// Creates an idle engine with empty batches.
    #[must_use]
    pub fn new(batch: BatchConfig, scheduler: SchedulerConfig) -> Self {
        Self {
            storage: BatchStorage::new(batch),
            index: BatchIndex::new(),
            scheduler: Scheduler::new(scheduler),
            tracer: Tracer::disabled(),
            dirty: Vec::new(),
            frame: 0,
        }
    }

    /// Installs a trace sink for frame-loop instrumentation.
    pub fn set_trace_sink(&mut self, sink: Box<dyn TraceSink>) {
        self.tracer.set_sink(sink);
    }

    /// Queues an entity for remapping in the next frame.
    ///
    /// Duplicates across the same frame are allowed and cheap — mapping is
    /// idempotent given the final scene state, so last processed wins.
    pub fn mark_dirty(&mut self, entity: SceneEntity) {
        self.dirty.push(entity);
    }

    /// Requests a frame. On [`Begin`](RequestOutcome::Begin) the caller
    /// renders now; any other outcome means the request was folded into
    /// the single trailing frame.
    pub fn request_render(&mut self, now: HostTime) -> RequestOutcome {
        let outcome = self.scheduler.request_render(now);
        if outcome == RequestOutcome::Coalesced {
            self.tracer.emit(TraceEvent::RequestCoalesced);
        }
        outcome
    }

    /// Timer wake; returns `true` when the trailing frame should render
    /// now.
    pub fn poll(&mut self, now: HostTime) -> bool {
        self.scheduler.poll(now)
    }

    /// When the host should call [`poll`](Self::poll) next.
    #[must_use]
    pub fn next_wake(&self) -> Option<HostTime> {
        self.scheduler.next_wake()
    }

    /// Renders one frame: evaluates the scene, drains the dirty queue
    /// through the batch index, submits every batch in paint order, and
    /// advances the anchor epoch.
    ///
    /// Entities that died between marking and rendering are skipped. `now`
    /// is the host's current time, used to start the inter-frame cooldown.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Capacity`] if mapping overflows a batch. The
    /// frame's remaining mapping and all submissions are abandoned, but
    /// previously written batches and all world matrices stay valid; the
    /// scheduler still runs its cooldown so later frames proceed. Recover
    /// by raising the capacity and [`rebatch_all`](Self::rebatch_all)ing.
    ///
    /// # Panics
    ///
    /// Panics if no frame is in flight (call
    /// [`request_render`](Self::request_render) or [`poll`](Self::poll)
    /// first).
    pub fn render_frame(
        &mut self,
        scene: &mut SceneStore,
        anchors: &mut AnchorStore,
        endpoints: &dyn ConnectionEndpoints,
        backend: &mut dyn GpuBackend,
        now: HostTime,
    ) -> Result<FrameStats, RenderError> {
        self.frame += 1;
        let frame = self.frame;
        self.tracer.emit(TraceEvent::FrameBegin { frame });

        let changes = scene.evaluate();
        #[expect(
            clippy::cast_possible_truncation,
            reason = "node counts are bounded by the u32 arena size"
        )]
        let recomputed = changes.transforms.len() as u32;
        self.tracer.emit(TraceEvent::Evaluated { recomputed });

        match self.drain_and_map(scene, endpoints, backend) {
            Ok(()) => {
                let (batches, instances) = self.storage.submit_all(backend);
                self.tracer.emit(TraceEvent::Submitted { batches, instances });
                anchors.advance_epoch();
                self.tracer.emit(TraceEvent::FrameEnd { frame });
                self.scheduler.frame_finished(now);
                Ok(FrameStats {
                    recomputed,
                    batches,
                    instances,
                })
            }
            Err(err) => {
                self.scheduler.frame_aborted(now);
                Err(err)
            }
        }
    }

    /// Clears the batch index and every batch's logical length, then maps
    /// every given entity from scratch. Used after entity destruction
    /// (dead slots are never compacted in place) and after raising the
    /// batch capacity.
    ///
    /// The pending dirty queue is dropped — everything gets remapped
    /// anyway.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Capacity`] if the live entities alone exceed
    /// the configured capacity.
    pub fn rebatch_all(
        &mut self,
        scene: &mut SceneStore,
        endpoints: &dyn ConnectionEndpoints,
        entities: &[SceneEntity],
        backend: &mut dyn GpuBackend,
    ) -> Result<(), RenderError> {
        let _ = scene.evaluate();
        self.index.clear();
        self.storage.reset_lengths();
        self.dirty.clear();
        for &entity in entities {
            self.map_entity(scene, endpoints, backend, entity)?;
        }
        Ok(())
    }

    /// The batch storage (read access for hosts and tests).
    #[must_use]
    pub const fn storage(&self) -> &BatchStorage {
        &self.storage
    }

    /// The scheduler state machine.
    #[must_use]
    pub const fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    fn drain_and_map(
        &mut self,
        scene: &SceneStore,
        endpoints: &dyn ConnectionEndpoints,
        backend: &mut dyn GpuBackend,
    ) -> Result<(), RenderError> {
        let dirty = core::mem::take(&mut self.dirty);
        for entity in dirty {
            self.map_entity(scene, endpoints, backend, entity)?;
        }
        Ok(())
    }

    fn map_entity(
        &mut self,
        scene: &SceneStore,
        endpoints: &dyn ConnectionEndpoints,
        backend: &mut dyn GpuBackend,
        entity: SceneEntity,
    ) -> Result<(), RenderError> {
        match entity {
            SceneEntity::Container(root) => {
                if scene.is_alive(root) {
                    self.index.map_container(scene, &mut self.storage, backend, root)?;
                }
            }
            SceneEntity::Connection(id) => {
                if let Some((a, b)) = endpoints.endpoints(id)
                    && scene.is_alive(a)
                    && scene.is_alive(b)
                {
                    self.index
                        .map_connection(scene, &mut self.storage, backend, id, a, b)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use kurbo::Point;

    use stratum_core::diagram::theme::{CONTAINER_HEIGHT, CONTAINER_WIDTH, TEXTURE_CONNECTIONS};
    use stratum_core::diagram::{ContainerType, Diagram};
    use stratum_core::props::DrawMode;
    use stratum_core::time::HostTime;

    use crate::backend::MemoryBackend;

    use super::*;

    const MS: u64 = 1_000_000;

    struct World {
        scene: SceneStore,
        anchors: AnchorStore,
        diagram: Diagram,
        engine: FrameEngine,
        backend: MemoryBackend,
    }

    fn world(names: &[&str]) -> World {
        let mut scene = SceneStore::new();
        let mut anchors = AnchorStore::new();
        let mut diagram = Diagram::new();
        for (i, name) in names.iter().enumerate() {
            #[expect(
                clippy::cast_precision_loss,
                reason = "test container counts are tiny"
            )]
            let x = 450.0 * i as f64;
            diagram
                .add_container(
                    &mut scene,
                    &mut anchors,
                    name,
                    ContainerType::Class,
                    Point::new(x, 0.0),
                    Point::new(x + CONTAINER_WIDTH, -CONTAINER_HEIGHT),
                )
                .unwrap();
        }
        World {
            scene,
            anchors,
            diagram,
            engine: FrameEngine::new(
                BatchConfig::new(TEXTURE_CONNECTIONS),
                SchedulerConfig::interactive(),
            ),
            backend: MemoryBackend::new(),
        }
    }

    impl World {
        fn mark_all(&mut self) {
            for entity in self.diagram.entities() {
                self.engine.mark_dirty(entity);
            }
        }

        fn frame(&mut self, now: HostTime) -> FrameStats {
            assert_eq!(self.engine.request_render(now), RequestOutcome::Begin);
            self.engine
                .render_frame(
                    &mut self.scene,
                    &mut self.anchors,
                    &self.diagram,
                    &mut self.backend,
                    now,
                )
                .unwrap()
        }
    }

    #[test]
    fn a_frame_draws_the_whole_diagram() {
        let mut w = world(&["Shape"]);
        w.mark_all();
        let stats = w.frame(HostTime(0));

        assert!(stats.recomputed > 0);
        assert!(stats.batches > 0);
        // One instance per render property in the subtree.
        assert!(stats.instances > 4, "title, body, handles, glyphs all drawn");
        assert_eq!(w.backend.draws().len(), stats.batches as usize);
    }

    #[test]
    fn connections_draw_before_quads() {
        let mut w = world(&["A", "B"]);
        w.diagram.connect(("A", None), ("B", None)).unwrap();
        w.mark_all();
        w.frame(HostTime(0));

        let draws = w.backend.take_draws();
        assert_eq!(draws[0].mode, DrawMode::Line);
        assert_eq!(draws[0].instances, 1);
        assert!(draws[1..].iter().all(|d| d.mode != DrawMode::Line));
    }

    #[test]
    fn incremental_frame_touches_no_lengths() {
        let mut w = world(&["A"]);
        w.mark_all();
        let first = w.frame(HostTime(0));

        // Move the container; a second frame maps the same entity in
        // place — instance counts must not grow.
        w.diagram
            .move_container(&mut w.scene, "A", Point::new(300.0, 100.0))
            .unwrap();
        w.engine
            .mark_dirty(SceneEntity::Container(w.diagram.container("A").unwrap().root));
        assert!(!w.engine.poll(HostTime(7 * MS)), "no trailing frame pending");
        let second = w.frame(HostTime(7 * MS));

        assert_eq!(first.instances, second.instances);
        assert_eq!(first.batches, second.batches);
    }

    #[test]
    fn anchor_epoch_advances_once_per_frame() {
        let mut w = world(&["A"]);
        w.mark_all();
        let before = w.anchors.epoch();
        w.frame(HostTime(0));
        assert_eq!(w.anchors.epoch(), before + 1);
    }

    #[test]
    fn five_requests_coalesce_into_two_frames() {
        let mut w = world(&["A"]);
        w.mark_all();
        let mut frames = 0;

        if w.engine.request_render(HostTime(0)) == RequestOutcome::Begin {
            w.engine
                .render_frame(
                    &mut w.scene,
                    &mut w.anchors,
                    &w.diagram,
                    &mut w.backend,
                    HostTime(0),
                )
                .unwrap();
            frames += 1;
        }
        for i in 1..5 {
            assert_eq!(
                w.engine.request_render(HostTime(i)),
                RequestOutcome::Coalesced
            );
        }

        let wake = w.engine.next_wake().unwrap();
        if w.engine.poll(wake) {
            w.engine
                .render_frame(&mut w.scene, &mut w.anchors, &w.diagram, &mut w.backend, wake)
                .unwrap();
            frames += 1;
        }
        assert!(!w.engine.poll(w.engine.next_wake().unwrap()));
        assert!(w.engine.scheduler().is_idle());
        assert_eq!(frames, 2);
    }

    #[test]
    fn capacity_failure_aborts_the_frame_but_not_the_session() {
        let mut w = world(&["A"]);
        w.engine = FrameEngine::new(
            BatchConfig::new(TEXTURE_CONNECTIONS).with_max_instances(2),
            SchedulerConfig::interactive(),
        );
        w.mark_all();

        assert_eq!(w.engine.request_render(HostTime(0)), RequestOutcome::Begin);
        let err = w
            .engine
            .render_frame(
                &mut w.scene,
                &mut w.anchors,
                &w.diagram,
                &mut w.backend,
                HostTime(0),
            )
            .unwrap_err();
        assert!(matches!(err, RenderError::Capacity { .. }));
        // Nothing was submitted.
        assert!(w.backend.draws().is_empty());

        // The scheduler cools down normally and accepts new work.
        assert!(!w.engine.poll(HostTime(6 * MS)));
        assert!(w.engine.scheduler().is_idle());
        assert_eq!(
            w.engine.request_render(HostTime(7 * MS)),
            RequestOutcome::Begin
        );
    }

    #[test]
    fn destroyed_entities_are_skipped_not_errors() {
        let mut w = world(&["A", "B"]);
        let id = w.diagram.connect(("A", None), ("B", None)).unwrap();
        w.mark_all();
        w.frame(HostTime(0));

        // Destroy B (taking the connection with it) but leave the stale
        // dirty marks in place.
        w.engine
            .mark_dirty(SceneEntity::Container(w.diagram.container("B").unwrap().root));
        w.engine.mark_dirty(SceneEntity::Connection(id));
        w.diagram.destroy_container(&mut w.scene, "B").unwrap();

        assert!(!w.engine.poll(HostTime(7 * MS)), "no trailing frame pending");
        let stats = w.frame(HostTime(7 * MS));
        // The stale marks mapped nothing new.
        assert!(stats.batches > 0);
    }

    #[test]
    fn rebatch_shrinks_to_the_live_set() {
        let mut w = world(&["A", "B"]);
        w.diagram.connect(("A", None), ("B", None)).unwrap();
        w.mark_all();
        let full = w.frame(HostTime(0));
        let _ = w.backend.take_draws();

        w.diagram.destroy_container(&mut w.scene, "B").unwrap();
        let entities = w.diagram.entities();
        w.engine
            .rebatch_all(&mut w.scene, &w.diagram, &entities, &mut w.backend)
            .unwrap();

        assert!(!w.engine.poll(HostTime(7 * MS)), "no trailing frame pending");
        let trimmed = w.frame(HostTime(7 * MS));
        assert!(
            trimmed.instances < full.instances,
            "dead slots must be gone after a rebatch"
        );
        // The destroyed connection no longer draws.
        assert!(
            w.backend
                .take_draws()
                .iter()
                .all(|d| d.mode != DrawMode::Line || d.instances == 0)
        );
    }
}
