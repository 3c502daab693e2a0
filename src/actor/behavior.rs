//! The actor capability set.
//!
//! Grounded on `airssys-rt/src/actor/traits.rs`'s `Actor` trait (associated
//! message type, named lifecycle hooks, doc-example-per-hook style), reworked
//! from an `async_trait` future-returning interface into a plain synchronous
//! one: every hook here runs on the actor's single dedicated OS thread, so
//! there is nothing to `.await`.
//!
//! Only [`ActorBehavior::on_msg`] is required; every other hook has a no-op
//! default, matching the source's "most actors only care about messages"
//! shape.

use crate::actor::context::{ActorContext, ReadyEvent};
use crate::error::ActorResult;

/// The set of callbacks the event loop (`crate::actor::loop_thread`) invokes
/// on an actor's behalf.
///
/// # Example
///
/// ```
/// use threadwheel::actor::behavior::ActorBehavior;
/// use threadwheel::actor::context::ActorContext;
///
/// struct Counter(i64);
///
/// impl ActorBehavior for Counter {
///     type Message = i64;
///
///     fn on_msg(&mut self, _ctx: &ActorContext, msg: i64) {
///         self.0 += msg;
///     }
/// }
/// ```
pub trait ActorBehavior: Send + 'static {
    /// The message type this actor accepts, excluding the framework's own
    /// `Stop` envelope (see `crate::inbox::Envelope`).
    type Message: Send + 'static;

    /// Validate configuration before the event-loop thread is spawned. Runs
    /// on the caller's thread. A non-`Ok` return aborts `start` and no
    /// thread is created.
    fn on_pre_create(&mut self) -> ActorResult<()> {
        Ok(())
    }

    /// First work done on the actor's own thread, before the loop begins
    /// waiting. A non-`Ok` return prevents the loop from ever entering its
    /// wait phase; the thread terminates immediately.
    fn on_thread_initiate(&mut self, _ctx: &ActorContext) -> ActorResult<()> {
        Ok(())
    }

    /// Handle one dequeued user message. Errors are logged and swallowed —
    /// see `crate::error` module docs — so this hook has no `Result` return.
    fn on_msg(&mut self, ctx: &ActorContext, msg: Self::Message);

    /// Handle one timer firing.
    fn on_timer(&mut self, _ctx: &ActorContext, _id: i32) {}

    /// Handle readiness on watched descriptors.
    fn on_event(&mut self, _ctx: &ActorContext, _events: &[ReadyEvent]) {}

    /// Last work done on the actor's own thread before it exits.
    fn on_thread_terminate(&mut self, _ctx: &ActorContext) {}

    /// Called on the joining thread after the OS thread has been joined.
    fn on_post_join(&mut self) {}
}
