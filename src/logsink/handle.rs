//! Fire-and-forget client for posting lines to a log sink actor.
//!
//! [`LogHandle::resolve`] looks the sink up in the global registry once (by
//! [`crate::registry::DEFAULT_LOG_SINK_NUMBER`], populated by
//! [`crate::registry::ActorRegistry::register_log_sink`]) and caches the
//! resulting sender; every `log()` call after that is a plain `post`, so
//! callers pay the lookup cost once rather than on every line written.

use crate::actor::handle::ActorSender;
use crate::error::{ActorError, ActorResult};
use crate::logsink::sink::LogMsg;
use crate::registry::ActorRegistry;

/// A cheap handle for sending lines to a [`crate::logsink::sink::LogSinkActor`].
#[derive(Clone)]
pub struct LogHandle {
    sender: ActorSender<LogMsg>,
}

impl LogHandle {
    /// Wrap an already-resolved sender (e.g. `actor_handle.sender()`),
    /// bypassing the registry. Mainly useful in tests.
    pub fn new(sender: ActorSender<LogMsg>) -> Self {
        LogHandle { sender }
    }

    /// Resolve the process-wide log sink via [`crate::registry::global`].
    /// Fails with [`sink_not_registered`] if nothing has called
    /// `register_log_sink` yet.
    pub fn resolve() -> ActorResult<Self> {
        Self::resolve_from(crate::registry::global())
    }

    /// Resolve against a specific registry rather than the process-wide
    /// singleton; used when a caller threads its own registry through for
    /// testing.
    pub fn resolve_from(registry: &ActorRegistry) -> ActorResult<Self> {
        registry
            .log_sink()
            .map(LogHandle::new)
            .ok_or_else(sink_not_registered)
    }

    /// Post a line built from the current time and thread.
    pub fn log(&self, text: impl Into<String>) -> ActorResult<()> {
        self.sender.post(LogMsg::now(text))
    }

    /// Post a pre-built message (e.g. to backdate a timestamp in a test).
    pub fn log_msg(&self, msg: LogMsg) -> ActorResult<()> {
        self.sender.post(msg)
    }
}

impl std::fmt::Debug for LogHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogHandle").finish_non_exhaustive()
    }
}

/// Marker error used when a log handle is requested before any sink has
/// registered under the expected number.
pub fn sink_not_registered() -> ActorError {
    ActorError::Context("no log sink actor is registered under the expected number".into())
}
