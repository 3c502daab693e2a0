//! Process-wide actor registry.
//!
//! A single mutex guards an ordered `Vec` of entries; lookup by actor number
//! is linear, lookup by index is O(1). This deliberately diverges from
//! `airssys-rt/src/broker/registry.rs`'s `DashMap`-based concurrent registry
//! — see `DESIGN.md` — because the spec pins this exact shape (§3/§4.7) and
//! the scale (one process's actors, checked rarely, on non-hot paths) does
//! not reward a lock-free structure.
//!
//! There is no deletion before process exit: an entry's status can reach
//! [`RegistryStatus::Destroyed`], which is terminal, but the slot itself
//! stays in the vector so `get_instance_by_index` remains stable.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::actor::behavior::ActorBehavior;
use crate::actor::handle::{ActorHandle, ActorSender};
use crate::error::{ActorError, ActorResult};
use crate::logsink::sink::{LogMsg, LogSinkActor};

/// Actor number reserved for the default log sink instance.
pub const DEFAULT_LOG_SINK_NUMBER: i32 = i32::MAX - 1;

/// The registry's view of one actor's lifecycle. Distinct from
/// `crate::actor::state::ActorState` in that `Unknown` here really does mean
/// "never registered", not merely "not yet started".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryStatus {
    Ready,
    Running,
    ShuttingDown,
    Stopped,
    Destroyed,
}

struct Entry {
    number: i32,
    status: RegistryStatus,
}

/// A process-wide directory of actor numbers to status.
///
/// The registry does not hold actor handles generically (there is no single
/// concrete type to store them as without a `dyn` object, and the spec
/// explicitly avoids polymorphic actors — see `SPEC_FULL.md` §9); instead it
/// tracks number/status pairs, and callers that need the handle itself keep
/// their own `Arc`/owned copy (typically an [`ActorHandle`] plus a cloned
/// [`crate::actor::handle::ActorSender`] handed out to collaborators). The
/// one exception is the log sink: its message type is concrete and known to
/// this crate, so [`ActorRegistry::register_log_sink`] caches its sender
/// directly for [`crate::logsink::handle::LogHandle::resolve`] to find.
#[derive(Default)]
pub struct ActorRegistry {
    entries: Mutex<Vec<Entry>>,
    log_sink: Mutex<Option<ActorSender<LogMsg>>>,
}

impl ActorRegistry {
    pub fn new() -> Self {
        ActorRegistry {
            entries: Mutex::new(Vec::new()),
            log_sink: Mutex::new(None),
        }
    }

    /// Register `handle` under `number`, starting it at `Ready` status, and
    /// attach `self` to the handle so later `start`/`stop`/`join` calls keep
    /// this entry's status current (§4.7). Overwrites any existing entry for
    /// the same number.
    pub fn set_attribute<H: ActorBehavior>(
        self: &Arc<Self>,
        handle: &ActorHandle<H>,
        number: i32,
    ) -> ActorResult<()> {
        if number < 0 {
            return Err(ActorError::Param(format!(
                "actor number must be >= 0, got {number}"
            )));
        }
        handle.attach_registry(Arc::clone(self), number);
        let mut entries = self.entries.lock();
        match entries.iter_mut().find(|e| e.number == number) {
            Some(e) => e.status = RegistryStatus::Ready,
            None => entries.push(Entry {
                number,
                status: RegistryStatus::Ready,
            }),
        }
        Ok(())
    }

    /// Register the process-wide log sink under [`DEFAULT_LOG_SINK_NUMBER`]
    /// and cache its sender so [`crate::logsink::handle::LogHandle::resolve`]
    /// can look it up by number.
    pub fn register_log_sink(self: &Arc<Self>, handle: &ActorHandle<LogSinkActor>) -> ActorResult<()> {
        self.set_attribute(handle, DEFAULT_LOG_SINK_NUMBER)?;
        *self.log_sink.lock() = Some(handle.sender());
        Ok(())
    }

    /// The currently registered log sink's sender, if one has registered.
    pub fn log_sink(&self) -> Option<ActorSender<LogMsg>> {
        self.log_sink.lock().clone()
    }

    /// Update the status of a previously registered number. No-op if the
    /// number was never registered.
    pub fn set_status(&self, number: i32, status: RegistryStatus) {
        let mut entries = self.entries.lock();
        if let Some(e) = entries.iter_mut().find(|e| e.number == number) {
            e.status = status;
        }
    }

    /// Look up status by actor number. `None` means never registered.
    pub fn get_status(&self, number: i32) -> Option<RegistryStatus> {
        self.entries
            .lock()
            .iter()
            .find(|e| e.number == number)
            .map(|e| e.status)
    }

    /// Look up by positional index (registration order), O(1).
    pub fn get_by_index(&self, index: usize) -> Option<(i32, RegistryStatus)> {
        self.entries
            .lock()
            .get(index)
            .map(|e| (e.number, e.status))
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// A process-wide singleton, mirroring the source's single global directory.
/// Framework collaborators (the TCP listener's notifier lookup, the log
/// handle) resolve against this instance unless a caller threads its own
/// `ActorRegistry` through explicitly for testing. Returned as an `Arc`
/// since `set_attribute`/`register_log_sink` need to hand a clone of it to
/// each registered `ActorHandle`.
pub fn global() -> &'static Arc<ActorRegistry> {
    static REGISTRY: std::sync::OnceLock<Arc<ActorRegistry>> = std::sync::OnceLock::new();
    REGISTRY.get_or_init(|| Arc::new(ActorRegistry::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::behavior::ActorBehavior;
    use crate::actor::context::ActorContext;

    struct NoOp;
    impl ActorBehavior for NoOp {
        type Message = ();
        fn on_msg(&mut self, _ctx: &ActorContext, _msg: ()) {}
    }

    fn handle() -> ActorHandle<NoOp> {
        ActorHandle::new(NoOp).unwrap()
    }

    #[test]
    fn registration_starts_at_ready() {
        let registry = Arc::new(ActorRegistry::new());
        let h = handle();
        registry.set_attribute(&h, 5).unwrap();
        assert_eq!(registry.get_status(5), Some(RegistryStatus::Ready));
        assert_eq!(h.number(), 5);
    }

    #[test]
    fn unregistered_number_is_none() {
        let registry = Arc::new(ActorRegistry::new());
        assert_eq!(registry.get_status(999), None);
    }

    #[test]
    fn lookup_by_index_is_positional() {
        let registry = Arc::new(ActorRegistry::new());
        let h0 = handle();
        let h1 = handle();
        registry.set_attribute(&h0, 10).unwrap();
        registry.set_attribute(&h1, 20).unwrap();
        assert_eq!(registry.get_by_index(0), Some((10, RegistryStatus::Ready)));
        assert_eq!(registry.get_by_index(1), Some((20, RegistryStatus::Ready)));
    }

    #[test]
    fn destroyed_is_terminal_but_slot_survives() {
        let registry = Arc::new(ActorRegistry::new());
        let h = handle();
        registry.set_attribute(&h, 1).unwrap();
        registry.set_status(1, RegistryStatus::Destroyed);
        assert_eq!(registry.get_status(1), Some(RegistryStatus::Destroyed));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn reregistering_a_number_overwrites_status() {
        let registry = Arc::new(ActorRegistry::new());
        let h = handle();
        registry.set_attribute(&h, 1).unwrap();
        registry.set_status(1, RegistryStatus::Stopped);
        registry.set_attribute(&h, 1).unwrap();
        assert_eq!(registry.get_status(1), Some(RegistryStatus::Ready));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn start_stop_join_propagate_into_the_attached_registry() {
        let registry = Arc::new(ActorRegistry::new());
        let mut h = handle();
        registry.set_attribute(&h, 7).unwrap();
        assert_eq!(registry.get_status(7), Some(RegistryStatus::Ready));

        h.start().unwrap();
        assert_eq!(registry.get_status(7), Some(RegistryStatus::Running));

        h.stop(false, 0).unwrap();
        assert_eq!(registry.get_status(7), Some(RegistryStatus::ShuttingDown));

        h.join().unwrap();
        assert_eq!(registry.get_status(7), Some(RegistryStatus::Stopped));
    }

    #[test]
    fn an_unregistered_handle_never_touches_any_registry() {
        // number() stays -1, so start/stop/join must not panic looking for
        // a registry that was never attached.
        let mut h = handle();
        h.start().unwrap();
        h.stop(false, 0).unwrap();
        h.join().unwrap();
    }

    #[test]
    fn register_log_sink_makes_it_resolvable_by_number() {
        use crate::logsink::sink::{LogSinkActor, LogSinkConfig};

        let registry = Arc::new(ActorRegistry::new());
        assert!(registry.log_sink().is_none());

        let sink_handle = ActorHandle::new(LogSinkActor::new(LogSinkConfig::default())).unwrap();
        registry.register_log_sink(&sink_handle).unwrap();

        assert_eq!(
            registry.get_status(DEFAULT_LOG_SINK_NUMBER),
            Some(RegistryStatus::Ready)
        );
        assert!(registry.log_sink().is_some());
    }
}
