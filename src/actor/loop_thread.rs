//! The event loop: the heart of the runtime (§4.4 of the design spec).
//!
//! Each iteration, in order: drain due timers, then (if the inbox is empty)
//! block in `poll(2)` bounded by the next timer deadline, then dequeue and
//! dispatch exactly one message. This ordering guarantees a due timer is
//! never starved by a busy descriptor, and that at most one hook runs per
//! iteration (§5: no two hooks of the same actor ever run concurrently,
//! trivially true here since it is all one thread).

use std::sync::Arc;
use std::time::Duration;

use nix::poll::{poll, PollFlags, PollTimeout};

use crate::actor::behavior::ActorBehavior;
use crate::actor::context::ReadyEvent;
use crate::actor::handle::SharedState;
use crate::inbox::Envelope;

const DEFAULT_STOP_RETURN: i32 = 0;

pub(crate) fn run<H: ActorBehavior>(
    mut behavior: H,
    shared: Arc<SharedState<H::Message>>,
) -> (H, i32) {
    let ctx = shared.context();

    shared
        .ctx_shared
        .fds
        .append(shared.wake.read_fd(), true, false, false)
        .expect("wake pipe fd is always valid and non-negative");

    if let Err(e) = behavior.on_thread_initiate(&ctx) {
        tracing::error!(
            actor = ctx.number(),
            error = %e,
            "on_thread_initiate failed; actor exiting without entering its wait loop"
        );
        return (behavior, DEFAULT_STOP_RETURN);
    }
    tracing::info!(actor = ctx.number(), "actor running");

    let ret = loop {
        while let Some(id) = shared.ctx_shared.timers.timeout() {
            tracing::trace!(actor = ctx.number(), timer = id, "timer fired");
            behavior.on_timer(&ctx, id);
        }

        if shared.inbox.is_empty() {
            match wait_for_readiness(&shared) {
                Ok(events) if !events.is_empty() => {
                    tracing::trace!(actor = ctx.number(), count = events.len(), "fds ready");
                    behavior.on_event(&ctx, &events);
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(actor = ctx.number(), error = %e, "poll failed");
                }
            }
        }

        match shared.inbox.get_envelope() {
            Some(Envelope::Stop(ret)) => break ret,
            Some(Envelope::User(msg)) => {
                tracing::debug!(actor = ctx.number(), "dispatching message");
                behavior.on_msg(&ctx, msg);
            }
            None => {}
        }
    };

    tracing::info!(actor = ctx.number(), "actor shutting down");
    behavior.on_thread_terminate(&ctx);
    (behavior, ret)
}

/// Block until a registered descriptor is ready or the next timer deadline
/// elapses, whichever comes first. Consumes (and hides from the caller) any
/// wake-pipe readiness; returns readiness for every other registered fd.
fn wait_for_readiness<M: Send + 'static>(
    shared: &Arc<SharedState<M>>,
) -> std::io::Result<Vec<ReadyEvent>> {
    let mut input = shared.ctx_shared.fds.rebuild();
    if input.is_empty() {
        // The wake pipe is always registered by `run`, so this is
        // unreachable in practice; guard against a busy-loop anyway.
        let span = Duration::from_millis(shared.ctx_shared.timers.millis_until_next().min(50));
        std::thread::sleep(span);
        return Ok(Vec::new());
    }

    let timeout_ms = shared.ctx_shared.timers.millis_until_next();
    let timeout = PollTimeout::try_from(timeout_ms.min(u32::MAX as u64) as u32)
        .unwrap_or(PollTimeout::MAX);

    let n = poll(&mut input.poll_fds, timeout)?;
    if n <= 0 {
        return Ok(Vec::new());
    }

    let wake_fd = shared.wake.read_fd();
    let mut events = Vec::with_capacity(input.len());
    for (&fd, pfd) in input.fds.iter().zip(input.poll_fds.iter()) {
        let Some(revents) = pfd.revents() else {
            continue;
        };
        if revents.is_empty() {
            continue;
        }
        if fd == wake_fd {
            shared.wake.drain().ok();
            continue;
        }
        events.push(ReadyEvent {
            fd,
            readable: revents.contains(PollFlags::POLLIN),
            writable: revents.contains(PollFlags::POLLOUT),
            exceptional: revents.contains(PollFlags::POLLPRI),
        });
    }
    Ok(events)
}

