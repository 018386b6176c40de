// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame-loop instrumentation.
//!
//! [`TraceSink`] is the contract for receiving frame events; [`Tracer`] is
//! the call-site wrapper the frame engine holds. With the `trace` feature
//! disabled (the default) every `Tracer` method body compiles to nothing,
//! so instrumentation costs one dead branch per call site at most. With the
//! feature enabled, events flow to whatever sink the host installed —
//! a ring buffer, a log, a profiler bridge.

use alloc::boxed::Box;
use core::fmt;

/// One frame-loop event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TraceEvent {
    /// A frame began building.
    FrameBegin {
        /// Monotonically increasing frame counter.
        frame: u64,
    },
    /// Scene evaluation finished.
    Evaluated {
        /// Number of nodes whose world transform was recomputed.
        recomputed: u32,
    },
    /// All batches were submitted.
    Submitted {
        /// Number of non-empty batches drawn.
        batches: u32,
        /// Total instances across all draws.
        instances: u32,
    },
    /// The frame completed (cooldown begins).
    FrameEnd {
        /// Frame counter, matching the corresponding
        /// [`FrameBegin`](Self::FrameBegin).
        frame: u64,
    },
    /// A render request arrived while busy and was folded into the trailing
    /// frame.
    RequestCoalesced,
}

/// Receives frame events.
pub trait TraceSink {
    /// Handles one event. Called synchronously from the frame loop; keep it
    /// cheap.
    fn event(&mut self, event: TraceEvent);
}

/// Call-site wrapper around an optional [`TraceSink`].
#[derive(Default)]
pub struct Tracer {
    sink: Option<Box<dyn TraceSink>>,
}

impl fmt::Debug for Tracer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracer")
            .field("installed", &self.sink.is_some())
            .finish()
    }
}

impl Tracer {
    /// A tracer with no sink installed.
    #[must_use]
    pub const fn disabled() -> Self {
        Self { sink: None }
    }

    /// Installs a sink.
    pub fn set_sink(&mut self, sink: Box<dyn TraceSink>) {
        self.sink = Some(sink);
    }

    /// Emits an event to the installed sink, if any.
    #[inline]
    pub fn emit(&mut self, event: TraceEvent) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            sink.event(event);
        }
        #[cfg(not(feature = "trace"))]
        let _ = event;
    }
}

#[cfg(all(test, feature = "trace"))]
mod tests {
    use alloc::rc::Rc;
    use alloc::vec::Vec;
    use core::cell::RefCell;

    use super::*;

    struct VecSink(Rc<RefCell<Vec<TraceEvent>>>);

    impl TraceSink for VecSink {
        fn event(&mut self, event: TraceEvent) {
            self.0.borrow_mut().push(event);
        }
    }

    #[test]
    fn events_reach_the_sink() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let mut tracer = Tracer::disabled();
        tracer.set_sink(Box::new(VecSink(events.clone())));

        tracer.emit(TraceEvent::FrameBegin { frame: 1 });
        tracer.emit(TraceEvent::FrameEnd { frame: 1 });

        assert_eq!(
            *events.borrow(),
            alloc::vec![
                TraceEvent::FrameBegin { frame: 1 },
                TraceEvent::FrameEnd { frame: 1 },
            ]
        );
    }

    #[test]
    fn emit_without_sink_is_a_noop() {
        let mut tracer = Tracer::disabled();
        tracer.emit(TraceEvent::RequestCoalesced);
    }
}
