//! Crate-wide error taxonomy.
//!
//! [`ActorError`] is returned from every fallible public entry point
//! (`start`, `post`, `stop`, FD-set and timer-wheel mutators). Hook-level
//! failures (`on_msg`, `on_timer`, `on_event`) do not flow through this type:
//! they are logged and swallowed by the event loop so that one bad message
//! can never tear down a long-lived actor. Those are reported instead via
//! [`ReceiveFault`].

use thiserror::Error;

/// Errors returned by the actor runtime's public API.
///
/// `code()` maps each variant to the legacy integer taxonomy carried over
/// from the original design, for callers that need the numeric form.
#[derive(Debug, Error)]
pub enum ActorError {
    /// An argument failed validation (e.g. a negative fd, a zero delay).
    #[error("invalid parameter: {0}")]
    Param(String),

    /// The call is not valid in the actor's current lifecycle state.
    #[error("invalid context: {0}")]
    Context(String),

    /// The resource is in use and cannot accept the operation right now.
    #[error("busy: {0}")]
    Busy(String),

    /// The actor is shutting down or has already stopped.
    #[error("actor is terminating")]
    Terminate,

    /// A required OS resource could not be acquired or released.
    #[error("resource error: {0}")]
    Resource(String),

    /// An underlying syscall failed.
    #[error("system error: {0}")]
    System(#[from] std::io::Error),
}

impl ActorError {
    /// The legacy numeric error code for this variant.
    pub fn code(&self) -> i32 {
        match self {
            ActorError::Param(_) => -1,
            ActorError::Context(_) => -2,
            ActorError::Busy(_) => -3,
            ActorError::Terminate => -4,
            ActorError::Resource(_) => -5,
            ActorError::System(_) => -6,
        }
    }

    /// Whether a retry of the same call might succeed without intervention.
    pub fn is_transient(&self) -> bool {
        matches!(self, ActorError::Busy(_) | ActorError::System(_))
    }

    /// Whether the actor is now (or soon will be) unusable.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ActorError::Terminate)
    }
}

/// Non-fatal faults reported out-of-band via `on_error`, a notifier message,
/// or standard output, rather than propagated as an `Err`.
///
/// These never stop the actor; they describe something the actor corrected
/// on its own (a subclass contract violation) or a transient I/O failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReceiveFault {
    /// A subclass's `on_receive` reported an `accepted` count outside
    /// `0..=len`. The framework forces full consumption and continues.
    #[error("subclass contract violation in on_receive: {0}")]
    IllegalUse(String),

    /// A syscall on a socket failed outside the connect/reconnect path.
    #[error("socket call failed: {0}")]
    ApiCall(String),

    /// Data was queued to send while the connection was not established.
    #[error("send data was lost: connection not established")]
    SendDataWasLost,
}

/// Convenience alias for the runtime's public `Result` type.
pub type ActorResult<T> = Result<T, ActorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_legacy_taxonomy() {
        assert_eq!(ActorError::Param("x".into()).code(), -1);
        assert_eq!(ActorError::Context("x".into()).code(), -2);
        assert_eq!(ActorError::Busy("x".into()).code(), -3);
        assert_eq!(ActorError::Terminate.code(), -4);
        assert_eq!(ActorError::Resource("x".into()).code(), -5);
        assert_eq!(
            ActorError::System(std::io::Error::other("boom")).code(),
            -6
        );
    }

    #[test]
    fn terminate_is_fatal_others_are_not() {
        assert!(ActorError::Terminate.is_fatal());
        assert!(!ActorError::Param("x".into()).is_fatal());
    }

    #[test]
    fn busy_and_system_are_transient() {
        assert!(ActorError::Busy("x".into()).is_transient());
        assert!(ActorError::System(std::io::Error::other("boom")).is_transient());
        assert!(!ActorError::Param("x".into()).is_transient());
    }

    #[test]
    fn display_messages_are_stable() {
        assert_eq!(ActorError::Terminate.to_string(), "actor is terminating");
        assert_eq!(
            ReceiveFault::SendDataWasLost.to_string(),
            "send data was lost: connection not established"
        );
    }
}
