//! Per-actor context handed to behaviour hooks.
//!
//! Grounded on `airssys-rt/src/actor/context.rs`'s pattern of bundling the
//! state a running actor needs to act on itself (register descriptors, arm
//! timers) into one small, cheaply-passed struct rather than threading each
//! collaborator through every hook signature individually.

use std::os::fd::RawFd;
use std::sync::Arc;

use crate::error::ActorResult;
use crate::fdset::FdSet;
use crate::timer::TimerWheel;

/// Readiness reported for one registered descriptor during `on_event`.
#[derive(Debug, Clone, Copy)]
pub struct ReadyEvent {
    pub fd: RawFd,
    pub readable: bool,
    pub writable: bool,
    pub exceptional: bool,
}

pub(crate) struct Shared {
    pub(crate) fds: FdSet,
    pub(crate) timers: TimerWheel,
}

/// A handle to an actor's own collaborators, passed to every hook so
/// behaviour implementations can register descriptors and arm timers from
/// within `on_thread_initiate`, `on_msg`, `on_timer`, or `on_event`.
#[derive(Clone)]
pub struct ActorContext {
    pub(crate) shared: Arc<Shared>,
    number: i32,
}

impl ActorContext {
    pub(crate) fn new(shared: Arc<Shared>, number: i32) -> Self {
        ActorContext { shared, number }
    }

    /// This actor's registry number, or `-1` if unregistered.
    pub fn number(&self) -> i32 {
        self.number
    }

    /// Register interest in a descriptor for the next and subsequent poll
    /// iterations.
    pub fn watch_fd(&self, fd: RawFd, read: bool, write: bool, except: bool) -> ActorResult<()> {
        self.shared.fds.append(fd, read, write, except)
    }

    /// Stop watching a descriptor.
    pub fn unwatch_fd(&self, fd: RawFd) {
        self.shared.fds.remove(fd);
    }

    /// Arm a timer. See [`TimerWheel::set`].
    pub fn set_timer(&self, delay_ms: u64, id: i32, period_ms: u64) -> ActorResult<()> {
        self.shared.timers.set(delay_ms, id, period_ms)
    }

    /// Cancel a timer (or all timers, with `id = -1`).
    pub fn cancel_timer(&self, id: i32) {
        self.shared.timers.cancel(id)
    }
}

impl std::fmt::Debug for ActorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorContext")
            .field("number", &self.number)
            .finish_non_exhaustive()
    }
}
