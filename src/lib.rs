//! Thread-per-actor runtime: a priority-capable mailbox, a millisecond timer
//! wheel, and readiness-based I/O multiplexing, with TCP listener/connection,
//! UDP, and a rotating log sink built on top as specialisations of the same
//! event loop.
//!
//! # Quick start
//!
//! ```
//! use threadwheel::actor::behavior::ActorBehavior;
//! use threadwheel::actor::context::ActorContext;
//! use threadwheel::actor::handle::ActorHandle;
//!
//! struct Counter(i64);
//!
//! impl ActorBehavior for Counter {
//!     type Message = i64;
//!
//!     fn on_msg(&mut self, _ctx: &ActorContext, msg: i64) {
//!         self.0 += msg;
//!     }
//! }
//!
//! let mut handle = ActorHandle::new(Counter(0)).unwrap();
//! handle.start().unwrap();
//! let sender = handle.sender();
//! for v in [1, 2, 3, 4, 5] {
//!     sender.post(v).unwrap();
//! }
//! handle.stop(false, 0).unwrap();
//! handle.join().unwrap();
//! ```
//!
//! Each actor owns a private [`inbox::Inbox`], [`timer::TimerWheel`], and
//! [`fdset::FdSet`], driven by a single dedicated OS thread running
//! [`actor::loop_thread`]'s event loop. Collaborators never reach into an
//! actor's state directly: they post immutable, owned messages through an
//! [`actor::handle::ActorSender`] and let the actor's own thread decide what
//! to do with them.

pub mod actor;
pub mod error;
pub mod fdset;
pub mod inbox;
pub mod logsink;
pub mod net;
pub mod registry;
pub mod time;
pub mod timer;
pub mod util;

pub use error::{ActorError, ActorResult};
