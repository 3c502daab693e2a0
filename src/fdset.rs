//! Registered file-descriptor set, rebuildable into a `poll(2)` input.
//!
//! The source description builds three `select(2)`-style bitmasks plus a
//! `max_fd + 1` bound. This is re-expressed idiomatically as a
//! `Vec<PollFd>` suitable for `nix::poll::poll`, while preserving the
//! invariant that "no registered descriptors" is distinguishable from "some
//! descriptors, none of them currently interesting" (the `rebuild` output is
//! simply empty in the former case, and the event loop skips the readiness
//! call entirely rather than reconstructing a null-bitmask sentinel).

use std::os::fd::{BorrowedFd, RawFd};

use nix::poll::{PollFd, PollFlags};
use parking_lot::Mutex;

use crate::error::{ActorError, ActorResult};

#[derive(Debug, Clone, Copy)]
struct FdEntry {
    fd: RawFd,
    read: bool,
    write: bool,
    except: bool,
}

impl FdEntry {
    fn flags(&self) -> PollFlags {
        let mut flags = PollFlags::empty();
        if self.read {
            flags |= PollFlags::POLLIN;
        }
        if self.write {
            flags |= PollFlags::POLLOUT;
        }
        if self.except {
            flags |= PollFlags::POLLPRI;
        }
        flags
    }
}

/// A mutable collection of `(fd, interest)` entries, owned by one actor and
/// rebuilt into poll input once per loop iteration.
#[derive(Debug, Default)]
pub struct FdSet {
    entries: Mutex<Vec<FdEntry>>,
}

impl FdSet {
    pub fn new() -> Self {
        FdSet {
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Register interest in `fd`. Rejects `fd < 0` and rejects registering
    /// with no watch bit set.
    pub fn append(&self, fd: RawFd, read: bool, write: bool, except: bool) -> ActorResult<()> {
        if fd < 0 {
            return Err(ActorError::Param(format!("negative fd: {fd}")));
        }
        if !(read || write || except) {
            return Err(ActorError::Param(
                "append requires at least one watch bit".into(),
            ));
        }
        self.entries.lock().push(FdEntry {
            fd,
            read,
            write,
            except,
        });
        Ok(())
    }

    /// Remove every entry matching `fd`.
    pub fn remove(&self, fd: RawFd) {
        self.entries.lock().retain(|e| e.fd != fd);
    }

    /// True iff no entries are currently registered.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Build the `poll(2)` input for the currently registered entries.
    /// `fds` and `poll_fds` are parallel, same-order vectors (kept separate
    /// because `poll()` needs a contiguous `&mut [PollFd]` while callers
    /// still need to recover which raw fd each slot came from). Safety: the
    /// caller must keep every registered fd open and valid for the duration
    /// of the resulting `PollFd` borrows (true here because `rebuild` is
    /// only ever called synchronously from within one iteration of the
    /// owning actor's event loop, immediately before the `poll` call that
    /// consumes it).
    pub fn rebuild(&self) -> PollInput {
        let entries = self.entries.lock();
        let mut fds = Vec::with_capacity(entries.len());
        let mut poll_fds = Vec::with_capacity(entries.len());
        for e in entries.iter() {
            // SAFETY: fds registered here are owned and kept open by the
            // actor for at least the lifetime of this poll iteration.
            let borrowed = unsafe { BorrowedFd::borrow_raw(e.fd) };
            fds.push(e.fd);
            poll_fds.push(PollFd::new(borrowed, e.flags()));
        }
        PollInput { fds, poll_fds }
    }
}

/// Parallel raw-fd and `PollFd` vectors produced by [`FdSet::rebuild`].
#[derive(Debug, Default)]
pub struct PollInput {
    pub fds: Vec<RawFd>,
    pub poll_fds: Vec<PollFd<'static>>,
}

impl PollInput {
    pub fn is_empty(&self) -> bool {
        self.poll_fds.is_empty()
    }

    pub fn len(&self) -> usize {
        self.poll_fds.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_rejects_negative_fd() {
        let set = FdSet::new();
        assert_eq!(
            set.append(-1, true, false, false).unwrap_err().code(),
            -1
        );
    }

    #[test]
    fn append_rejects_no_watch_bits() {
        let set = FdSet::new();
        assert_eq!(set.append(3, false, false, false).unwrap_err().code(), -1);
    }

    #[test]
    fn remove_drops_all_matching_entries() {
        let set = FdSet::new();
        set.append(3, true, false, false).unwrap();
        set.append(3, false, true, false).unwrap();
        set.append(4, true, false, false).unwrap();
        set.remove(3);
        assert_eq!(set.rebuild().len(), 1);
    }

    #[test]
    fn empty_set_rebuilds_to_empty_vec() {
        let set = FdSet::new();
        assert!(set.is_empty());
        assert!(set.rebuild().is_empty());
    }
}
