//! Actor handles: the owning, startable/stoppable [`ActorHandle`] and the
//! cheap, ownership-free [`ActorSender`] used by collaborators (notifiers,
//! registries) that only need to post messages.
//!
//! Grounded on `airssys-rt/src/osl/actors/network.rs`'s
//! `NetworkActor<M, B> where B: MessageBroker<M>` pattern: a notifier is
//! addressed generically by the messages it accepts, never by owning the
//! notifiee. `ActorSender<M>` plays that role here — it is `Clone`, holds
//! only an `Arc` to shared queues, and outlives neither actor nor caller by
//! virtue of ownership (nothing stops either side from dropping first).

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::Mutex;

use crate::actor::behavior::ActorBehavior;
use crate::actor::context::{ActorContext, Shared as CtxShared};
use crate::actor::loop_thread;
use crate::actor::state::{ActorLifecycle, ActorState};
use crate::error::{ActorError, ActorResult};
use crate::fdset::FdSet;
use crate::inbox::Inbox;
use crate::registry::{ActorRegistry, RegistryStatus};
use crate::timer::TimerWheel;
use crate::util::wake_pipe::WakePipe;

pub(crate) struct SharedState<M: Send + 'static> {
    pub(crate) inbox: Inbox<M>,
    pub(crate) wake: WakePipe,
    pub(crate) number: AtomicI32,
    pub(crate) terminating: AtomicBool,
    pub(crate) ctx_shared: Arc<CtxShared>,
}

impl<M: Send + 'static> SharedState<M> {
    fn new() -> ActorResult<Self> {
        Ok(SharedState {
            inbox: Inbox::new(),
            wake: WakePipe::new()?,
            number: AtomicI32::new(-1),
            terminating: AtomicBool::new(false),
            ctx_shared: Arc::new(CtxShared {
                fds: FdSet::new(),
                timers: TimerWheel::new(),
            }),
        })
    }

    pub(crate) fn context(&self) -> ActorContext {
        ActorContext::new(
            Arc::clone(&self.ctx_shared),
            self.number.load(Ordering::Relaxed),
        )
    }
}

/// A cheap, cloneable reference used to post messages to an actor without
/// owning it.
///
/// Posting after the actor has begun shutting down returns
/// [`ActorError::Terminate`]; the message is still dropped, never leaked.
pub struct ActorSender<M: Send + 'static> {
    shared: Arc<SharedState<M>>,
}

impl<M: Send + 'static> Clone for ActorSender<M> {
    fn clone(&self) -> Self {
        ActorSender {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<M: Send + 'static> ActorSender<M> {
    /// Post a normal-priority message.
    pub fn post(&self, msg: M) -> ActorResult<()> {
        self.post_inner(msg, false)
    }

    /// Post a priority message, observed before any already-queued
    /// non-priority message.
    pub fn post_priority(&self, msg: M) -> ActorResult<()> {
        self.post_inner(msg, true)
    }

    fn post_inner(&self, msg: M, priority: bool) -> ActorResult<()> {
        if self.shared.terminating.load(Ordering::Acquire) {
            // msg is dropped here; ownership never returns to the caller.
            return Err(ActorError::Terminate);
        }
        if priority {
            self.shared.inbox.put_front(msg);
        } else {
            self.shared.inbox.put_back(msg);
        }
        self.shared.wake.wake()
    }
}

impl<M: Send + 'static> std::fmt::Debug for ActorSender<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorSender").finish_non_exhaustive()
    }
}

/// An owning handle to one actor: constructs the behaviour, starts its
/// dedicated OS thread, and later stops/joins it.
///
/// Generic over the concrete behaviour type rather than a `dyn` trait
/// object, matching the teacher's zero-cost-abstraction preference
/// (compile-time dispatch for the hot dispatch path in `loop_thread`).
pub struct ActorHandle<H: ActorBehavior> {
    shared: Arc<SharedState<H::Message>>,
    lifecycle: ActorLifecycle,
    thread: Option<JoinHandle<ThreadResult<H>>>,
    behavior: Option<H>,
    registry: Mutex<Option<Arc<ActorRegistry>>>,
}

// `loop_thread::run` hands the behaviour back alongside the stop return
// value so `on_post_join` (documented to run on the caller's thread after
// the OS thread is joined) has something to call.
type ThreadResult<H> = (H, i32);

impl<H: ActorBehavior> ActorHandle<H> {
    /// Construct a new, not-yet-started handle, running `on_pre_create` on
    /// the caller's thread.
    pub fn new(mut behavior: H) -> ActorResult<Self> {
        behavior.on_pre_create()?;
        Ok(ActorHandle {
            shared: Arc::new(SharedState::new()?),
            lifecycle: ActorLifecycle::new(),
            thread: None,
            behavior: Some(behavior),
            registry: Mutex::new(None),
        })
    }

    pub fn state(&self) -> ActorState {
        self.lifecycle.current()
    }

    /// Assign this actor's registry number. Used by
    /// `crate::registry::ActorRegistry::set_attribute`.
    pub(crate) fn set_number(&self, number: i32) {
        self.shared.number.store(number, Ordering::Relaxed);
    }

    /// Record the registry this actor was registered with, so subsequent
    /// `start`/`stop`/`join` calls can keep that registry's status entry
    /// current. Called by `ActorRegistry::set_attribute`.
    pub(crate) fn attach_registry(&self, registry: Arc<ActorRegistry>, number: i32) {
        self.set_number(number);
        *self.registry.lock() = Some(registry);
    }

    /// Push a status update into the attached registry, if any. A no-op for
    /// an actor that was never registered (`number() == -1`).
    fn sync_registry(&self, status: RegistryStatus) {
        let number = self.number();
        if number == -1 {
            return;
        }
        if let Some(registry) = self.registry.lock().as_ref() {
            registry.set_status(number, status);
        }
    }

    pub fn number(&self) -> i32 {
        self.shared.number.load(Ordering::Relaxed)
    }

    /// A cheap, cloneable sender for this actor's inbox.
    pub fn sender(&self) -> ActorSender<H::Message> {
        ActorSender {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Spawn the dedicated OS thread and run the event loop. Fails with
    /// [`ActorError::Context`] if already started.
    pub fn start(&mut self) -> ActorResult<()> {
        if self.lifecycle.current() != ActorState::Ready {
            return Err(ActorError::Context(
                "start called on an actor that is not in Ready state".into(),
            ));
        }
        let behavior = self
            .behavior
            .take()
            .ok_or_else(|| ActorError::Context("actor already started".into()))?;
        let shared = Arc::clone(&self.shared);
        let thread = std::thread::Builder::new()
            .name(format!("actor-{}", self.number()))
            .spawn(move || loop_thread::run(behavior, shared))
            .map_err(|e| ActorError::Resource(e.to_string()))?;
        self.thread = Some(thread);
        self.lifecycle.transition_to(ActorState::Running);
        self.sync_registry(RegistryStatus::Running);
        Ok(())
    }

    /// Post the framework's stop message. `immediately` drops any pending
    /// messages ahead of it; otherwise pending messages drain first.
    pub fn stop(&self, immediately: bool, ret: i32) -> ActorResult<()> {
        self.shared.terminating.store(true, Ordering::Release);
        self.shared.inbox.put_stop(ret, immediately);
        self.lifecycle.transition_to(ActorState::ShuttingDown);
        self.sync_registry(RegistryStatus::ShuttingDown);
        self.shared.wake.wake()
    }

    /// Wait for the event-loop thread to exit, then run `on_post_join` on
    /// the caller's thread. Returns the value passed to `stop`.
    pub fn join(&mut self) -> ActorResult<i32> {
        let thread = self
            .thread
            .take()
            .ok_or_else(|| ActorError::Context("actor was never started".into()))?;
        let (mut behavior, ret) = thread
            .join()
            .map_err(|_| ActorError::System(std::io::Error::other("actor thread panicked")))?;
        self.lifecycle.transition_to(ActorState::Stopped);
        self.sync_registry(RegistryStatus::Stopped);
        behavior.on_post_join();
        self.behavior = Some(behavior);
        Ok(ret)
    }
}

impl<H: ActorBehavior> std::fmt::Debug for ActorHandle<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorHandle")
            .field("number", &self.number())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
