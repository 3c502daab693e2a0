//! Thread-safe, priority-capable message inbox.
//!
//! Performance characteristics: `put`/`get` are O(1) amortized (backed by a
//! `VecDeque`), guarded by a single `parking_lot::Mutex` held only for the
//! duration of one operation. There is no backpressure strategy — callers
//! are expected to bound message production themselves, since the runtime
//! targets long-lived control-plane actors rather than high-throughput data
//! pipelines.
//!
//! # Priority ordering
//!
//! A message enqueued via [`Inbox::put_front`] is observed before any
//! message enqueued later via [`Inbox::put_back`], and before currently
//! queued non-priority messages iff none are already waiting ahead of it.
//! FIFO order is preserved within a priority class.
//!
//! ```
//! use threadwheel::inbox::Inbox;
//!
//! let inbox: Inbox<i32> = Inbox::new();
//! inbox.put_back(1);
//! inbox.put_back(2);
//! inbox.put_front(0); // observed first
//! assert_eq!(inbox.get(), Some(0));
//! assert_eq!(inbox.get(), Some(1));
//! assert_eq!(inbox.get(), Some(2));
//! ```

use std::collections::VecDeque;

use parking_lot::Mutex;

/// A message wrapper distinguishing the framework's own shutdown signal from
/// ordinary user messages.
///
/// The framework owns the `Stop` variant unconditionally: no subclass can
/// construct one directly except through [`super::actor::handle::ActorHandle::stop`].
#[derive(Debug)]
pub enum Envelope<M> {
    /// An ordinary message to be dispatched to `on_msg`.
    User(M),
    /// The framework's shutdown message, carrying the caller-supplied return
    /// value.
    Stop(i32),
}

/// A double-ended, mutex-guarded message queue.
#[derive(Debug)]
pub struct Inbox<M> {
    queue: Mutex<VecDeque<Envelope<M>>>,
}

impl<M> Default for Inbox<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> Inbox<M> {
    /// Construct an empty inbox.
    pub fn new() -> Self {
        Inbox {
            queue: Mutex::new(VecDeque::new()),
        }
    }

    /// Enqueue a user message at the tail (normal priority).
    pub fn put_back(&self, msg: M) {
        self.queue.lock().push_back(Envelope::User(msg));
    }

    /// Enqueue a user message at the head (priority / immediate).
    pub fn put_front(&self, msg: M) {
        self.queue.lock().push_front(Envelope::User(msg));
    }

    /// Enqueue the framework's stop envelope. `immediately` selects head vs.
    /// tail placement.
    pub fn put_stop(&self, ret: i32, immediately: bool) {
        let mut q = self.queue.lock();
        if immediately {
            q.push_front(Envelope::Stop(ret));
        } else {
            q.push_back(Envelope::Stop(ret));
        }
    }

    /// Pop the next envelope, if any.
    pub fn get(&self) -> Option<M>
    where
        M: Sized,
    {
        match self.queue.lock().pop_front()? {
            Envelope::User(m) => Some(m),
            Envelope::Stop(_) => None,
        }
    }

    /// Pop the next raw envelope (used by the event loop, which must
    /// distinguish `Stop` from a user message).
    pub fn get_envelope(&self) -> Option<Envelope<M>> {
        self.queue.lock().pop_front()
    }

    /// Drop and delete every pending envelope.
    pub fn remove_all(&self) {
        self.queue.lock().clear();
    }

    /// Snapshot check: true iff no envelope is currently queued.
    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    /// Number of envelopes currently queued.
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn fifo_within_same_priority() {
        let inbox: Inbox<i32> = Inbox::new();
        inbox.put_back(1);
        inbox.put_back(2);
        inbox.put_back(3);
        assert_eq!(inbox.get(), Some(1));
        assert_eq!(inbox.get(), Some(2));
        assert_eq!(inbox.get(), Some(3));
        assert_eq!(inbox.get(), None);
    }

    #[test]
    fn priority_message_observed_before_queued_tail_messages() {
        let inbox: Inbox<i32> = Inbox::new();
        inbox.put_back(1);
        inbox.put_back(2);
        inbox.put_front(0);
        assert_eq!(inbox.get(), Some(0));
        assert_eq!(inbox.get(), Some(1));
        assert_eq!(inbox.get(), Some(2));
    }

    #[test]
    fn remove_all_drops_everything() {
        let inbox: Inbox<i32> = Inbox::new();
        inbox.put_back(1);
        inbox.put_back(2);
        inbox.remove_all();
        assert!(inbox.is_empty());
        assert_eq!(inbox.get(), None);
    }

    #[test]
    fn stop_envelope_is_distinguished_from_user_messages() {
        let inbox: Inbox<i32> = Inbox::new();
        inbox.put_back(1);
        inbox.put_stop(42, false);
        match inbox.get_envelope() {
            Some(Envelope::User(1)) => {}
            other => panic!("expected User(1), got {other:?}"),
        }
        match inbox.get_envelope() {
            Some(Envelope::Stop(42)) => {}
            other => panic!("expected Stop(42), got {other:?}"),
        }
    }

    #[test]
    fn immediate_stop_jumps_ahead_of_pending_messages() {
        let inbox: Inbox<i32> = Inbox::new();
        inbox.put_back(1);
        inbox.put_back(2);
        inbox.put_stop(0, true);
        match inbox.get_envelope() {
            Some(Envelope::Stop(0)) => {}
            other => panic!("expected Stop(0) first, got {other:?}"),
        }
    }

    #[test]
    fn concurrent_posts_are_not_lost() {
        let inbox = Arc::new(Inbox::<i32>::new());
        let mut handles = vec![];
        for t in 0..8 {
            let inbox = Arc::clone(&inbox);
            handles.push(thread::spawn(move || {
                for i in 0..100 {
                    inbox.put_back(t * 100 + i);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(inbox.len(), 800);
    }
}
