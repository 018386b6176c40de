// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame scheduling with render-request coalescing.
//!
//! Interactive editing produces far more render requests than frames should
//! be drawn — every pointer event while dragging asks for one. The
//! [`Scheduler`] collapses that volume into at most one in-flight frame
//! plus at most one trailing frame, with a configured minimum spacing
//! between frame starts.
//!
//! # State machine
//!
//! ```text
//!            request_render              frame_finished
//!   Idle ──────────────────► Rendering ────────────────► Cooldown
//!    ▲                          │  ▲                        │
//!    │                          │  │ poll (pending set)     │
//!    │        poll (no pending) │  └────────────────────────┤
//!    └──────────────────────────┴───────────────────────────┘
//! ```
//!
//! Requests arriving while not Idle only set a single trailing-pending
//! flag — at most one extra frame is ever queued, regardless of how many
//! requests arrive while busy.
//!
//! The cooldown is the minimum inter-frame delay, measured from the frame's
//! *start*; a frame that ran longer than the interval pays no extra wait.
//! The core owns the state machine but never reads a clock: the host drives
//! [`poll`](Scheduler::poll) from a timer wake at
//! [`next_wake`](Scheduler::next_wake), the one suspension point in the
//! whole pipeline.

use crate::time::{Duration, HostTime};

/// Configuration for the [`Scheduler`].
#[derive(Clone, Copy, Debug)]
pub struct SchedulerConfig {
    /// Minimum spacing between consecutive frame starts.
    pub min_frame_interval: Duration,
}

impl SchedulerConfig {
    /// Default configuration for interactive editing (6 ms between frames,
    /// comfortably ahead of a 60 Hz display while bounding event-storm
    /// rendering).
    #[must_use]
    pub const fn interactive() -> Self {
        Self {
            min_frame_interval: Duration::from_millis(6),
        }
    }

    /// Configuration with an explicit inter-frame interval.
    #[must_use]
    pub const fn with_interval(min_frame_interval: Duration) -> Self {
        Self { min_frame_interval }
    }
}

/// Outcome of a render request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestOutcome {
    /// The scheduler was idle; the caller should render a frame now.
    Begin,
    /// A frame is in flight or cooling down; the request was folded into
    /// the single trailing frame.
    Coalesced,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Idle,
    Rendering { started: HostTime },
    Cooldown { resume_at: HostTime },
}

/// Render-request coalescing state machine.
#[derive(Clone, Debug)]
pub struct Scheduler {
    config: SchedulerConfig,
    state: State,
    trailing_pending: bool,
}

impl Scheduler {
    /// Creates an idle scheduler.
    #[must_use]
    pub const fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            state: State::Idle,
            trailing_pending: false,
        }
    }

    /// Requests a frame.
    ///
    /// Returns [`Begin`](RequestOutcome::Begin) when idle — the caller must
    /// then render and report via [`frame_finished`](Self::frame_finished)
    /// or [`frame_aborted`](Self::frame_aborted). Any other state sets the
    /// trailing-pending flag and returns
    /// [`Coalesced`](RequestOutcome::Coalesced).
    pub fn request_render(&mut self, now: HostTime) -> RequestOutcome {
        match self.state {
            State::Idle => {
                self.state = State::Rendering { started: now };
                RequestOutcome::Begin
            }
            State::Rendering { .. } | State::Cooldown { .. } => {
                self.trailing_pending = true;
                RequestOutcome::Coalesced
            }
        }
    }

    /// Reports that the current frame completed; enters the cooldown.
    ///
    /// # Panics
    ///
    /// Panics if no frame is in flight.
    pub fn frame_finished(&mut self, now: HostTime) {
        let State::Rendering { started } = self.state else {
            panic!("frame_finished without a frame in flight");
        };
        let resume_at = started
            .saturating_add(self.config.min_frame_interval)
            .max(now);
        self.state = State::Cooldown { resume_at };
    }

    /// Reports that the current frame failed partway.
    ///
    /// The failure itself is the caller's to surface; the scheduler runs
    /// the same cooldown path as a completed frame so that subsequent
    /// frames (including a pending trailing one) can proceed.
    pub fn frame_aborted(&mut self, now: HostTime) {
        self.frame_finished(now);
    }

    /// Timer wake. Returns `true` when the caller should render the
    /// trailing frame now; transitions to Idle when the cooldown elapses
    /// with nothing pending.
    pub fn poll(&mut self, now: HostTime) -> bool {
        let State::Cooldown { resume_at } = self.state else {
            return false;
        };
        if now < resume_at {
            return false;
        }
        if self.trailing_pending {
            self.trailing_pending = false;
            self.state = State::Rendering { started: now };
            true
        } else {
            self.state = State::Idle;
            false
        }
    }

    /// The time at which the host should call [`poll`](Self::poll) next,
    /// or `None` when no wake is scheduled.
    #[must_use]
    pub fn next_wake(&self) -> Option<HostTime> {
        match self.state {
            State::Cooldown { resume_at } => Some(resume_at),
            State::Idle | State::Rendering { .. } => None,
        }
    }

    /// Whether the scheduler is idle (no frame in flight or cooling down).
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.state == State::Idle
    }

    /// Whether a trailing frame is queued.
    #[must_use]
    pub const fn trailing_pending(&self) -> bool {
        self.trailing_pending
    }
}
