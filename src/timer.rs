//! Millisecond-resolution timer wheel.
//!
//! Backed by a `Vec` kept in deadline-ascending order by stable insertion
//! (ties broken so existing entries precede new ones at equal deadlines, per
//! the spec's determinism requirement when several timers share a delay).
//! Guarded by a single mutex; safe to `cancel` from any thread.
//!
//! Periodic re-insertion is handled internally by [`TimerWheel::timeout`]
//! rather than left to the caller: a popped periodic record is immediately
//! re-inserted with `deadline += period_ms` before the id is returned. See
//! `DESIGN.md` for why this diverges from the source's caller-reinserts
//! description without changing any externally observable behaviour.

use parking_lot::Mutex;

use crate::error::{ActorError, ActorResult};
use crate::time::TimeValue;

#[derive(Debug, Clone)]
struct TimerRecord {
    deadline: TimeValue,
    id: i32,
    period_ms: u64,
}

/// An ordered collection of pending one-shot and periodic timers.
#[derive(Debug, Default)]
pub struct TimerWheel {
    records: Mutex<Vec<TimerRecord>>,
}

impl TimerWheel {
    pub fn new() -> Self {
        TimerWheel {
            records: Mutex::new(Vec::new()),
        }
    }

    /// Schedule a timer to fire `delay_ms` from now. `period_ms = 0` means
    /// one-shot. Rejects `delay_ms == 0`.
    pub fn set(&self, delay_ms: u64, id: i32, period_ms: u64) -> ActorResult<()> {
        if delay_ms == 0 {
            return Err(ActorError::Param("timer delay must be > 0".into()));
        }
        if id < 0 {
            return Err(ActorError::Param("timer id must be >= 0".into()));
        }
        let deadline = TimeValue::now().plus_millis(delay_ms as i64);
        self.insert(TimerRecord {
            deadline,
            id,
            period_ms,
        });
        Ok(())
    }

    fn insert(&self, record: TimerRecord) {
        let mut records = self.records.lock();
        let pos = records
            .iter()
            .position(|r| record.deadline < r.deadline)
            .unwrap_or(records.len());
        records.insert(pos, record);
    }

    /// Cancel every timer matching `id`. `id == -1` cancels all.
    pub fn cancel(&self, id: i32) {
        let mut records = self.records.lock();
        if id == -1 {
            records.clear();
        } else {
            records.retain(|r| r.id != id);
        }
    }

    /// If the head timer is due, pop it (re-inserting it if periodic) and
    /// return its id.
    pub fn timeout(&self) -> Option<i32> {
        let mut records = self.records.lock();
        let now = TimeValue::now();
        if records.first().map(|r| r.deadline <= now) != Some(true) {
            return None;
        }
        let due = records.remove(0);
        let id = due.id;
        if due.period_ms > 0 {
            drop(records);
            self.insert(TimerRecord {
                deadline: due.deadline.plus_millis(due.period_ms as i64),
                id: due.id,
                period_ms: due.period_ms,
            });
        }
        Some(id)
    }

    /// The head's deadline, if any timers are pending.
    pub fn next_deadline(&self) -> Option<TimeValue> {
        self.records.lock().first().map(|r| r.deadline)
    }

    /// Milliseconds until the next timer fires, capped at one year when no
    /// timer is scheduled (used by the event loop to bound its poll
    /// timeout).
    pub fn millis_until_next(&self) -> u64 {
        const ONE_YEAR_MS: u64 = 365 * 24 * 60 * 60 * 1000;
        match self.next_deadline() {
            Some(deadline) => deadline.millis_until(&TimeValue::now()),
            None => ONE_YEAR_MS,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn set_rejects_zero_delay() {
        let wheel = TimerWheel::new();
        assert_eq!(wheel.set(0, 1, 0).unwrap_err().code(), -1);
    }

    #[test]
    fn head_is_always_the_earliest_deadline() {
        let wheel = TimerWheel::new();
        wheel.set(500, 1, 0).unwrap();
        wheel.set(10, 2, 0).unwrap();
        wheel.set(250, 3, 0).unwrap();
        let first_deadline = wheel.next_deadline().unwrap();
        // the id=2 timer (10ms) must be the soonest.
        sleep(Duration::from_millis(20));
        assert_eq!(wheel.timeout(), Some(2));
        assert!(wheel.next_deadline().unwrap() > first_deadline || wheel.len() == 2);
    }

    #[test]
    fn cancel_minus_one_empties_the_wheel() {
        let wheel = TimerWheel::new();
        wheel.set(100, 1, 0).unwrap();
        wheel.set(200, 2, 0).unwrap();
        wheel.cancel(-1);
        assert!(wheel.is_empty());
    }

    #[test]
    fn cancel_by_id_removes_only_matching_timers() {
        let wheel = TimerWheel::new();
        wheel.set(100, 1, 0).unwrap();
        wheel.set(100, 2, 0).unwrap();
        wheel.cancel(1);
        assert_eq!(wheel.len(), 1);
    }

    #[test]
    fn periodic_timer_reinserts_itself_on_timeout() {
        let wheel = TimerWheel::new();
        wheel.set(10, 7, 10).unwrap();
        sleep(Duration::from_millis(20));
        assert_eq!(wheel.timeout(), Some(7));
        // re-armed, still present, not yet due again.
        assert_eq!(wheel.len(), 1);
    }

    #[test]
    fn stable_insert_breaks_ties_in_insertion_order() {
        let wheel = TimerWheel::new();
        // Use an explicit insert path via `set` at the "same" delay — to
        // observe order we rely on timeout() popping head-first.
        wheel.set(10, 1, 0).unwrap();
        wheel.set(10, 2, 0).unwrap();
        sleep(Duration::from_millis(15));
        assert_eq!(wheel.timeout(), Some(1));
        assert_eq!(wheel.timeout(), Some(2));
    }
}
