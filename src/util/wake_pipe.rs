//! Self-pipe used to interrupt a blocking `poll(2)` call from another
//! thread.
//!
//! Every successful `post` to an actor writes one byte into the write end;
//! the event loop registers the read end in its [`crate::fdset::FdSet`] and,
//! on wakeup, consumes exactly one byte before handing any remaining
//! readiness to `on_event`.

use std::io::{Read, Write};
use std::os::fd::{AsRawFd, OwnedFd, RawFd};

use nix::fcntl::{fcntl, FcntlArg, OFlag};
use nix::unistd::pipe;

use crate::error::{ActorError, ActorResult};

const WAKE_BYTE: u8 = b'!';

/// A pipe pair dedicated to waking one actor's event loop.
#[derive(Debug)]
pub struct WakePipe {
    read_fd: OwnedFd,
    write_fd: OwnedFd,
}

impl WakePipe {
    /// Create a new pipe pair with both ends set non-blocking.
    pub fn new() -> ActorResult<Self> {
        let (read_fd, write_fd) = pipe().map_err(|e| ActorError::Resource(e.to_string()))?;
        set_nonblocking(&read_fd)?;
        set_nonblocking(&write_fd)?;
        Ok(WakePipe { read_fd, write_fd })
    }

    /// The read end's raw fd, to be registered in the event loop's FD set.
    pub fn read_fd(&self) -> RawFd {
        self.read_fd.as_raw_fd()
    }

    /// Write one wake byte. Best-effort: a full pipe buffer (meaning a wake
    /// is already pending) is not an error.
    pub fn wake(&self) -> ActorResult<()> {
        let mut file = std::fs::File::from(
            self.write_fd
                .try_clone()
                .map_err(|e| ActorError::Resource(e.to_string()))?,
        );
        match file.write_all(&[WAKE_BYTE]) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(()),
            Err(e) => Err(ActorError::System(e)),
        }
    }

    /// Drain every currently pending wake byte. Called once per loop
    /// iteration when the read end is reported ready.
    pub fn drain(&self) -> ActorResult<()> {
        let mut file = std::fs::File::from(
            self.read_fd
                .try_clone()
                .map_err(|e| ActorError::Resource(e.to_string()))?,
        );
        let mut buf = [0u8; 64];
        loop {
            match file.read(&mut buf) {
                Ok(0) => return Ok(()),
                Ok(_) => continue,
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) => return Err(ActorError::System(e)),
            }
        }
    }
}

fn set_nonblocking(fd: &OwnedFd) -> ActorResult<()> {
    let flags = fcntl(fd, FcntlArg::F_GETFL).map_err(|e| ActorError::Resource(e.to_string()))?;
    let mut flags = OFlag::from_bits_truncate(flags);
    flags.insert(OFlag::O_NONBLOCK);
    fcntl(fd, FcntlArg::F_SETFL(flags)).map_err(|e| ActorError::Resource(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wake_then_drain_consumes_exactly_what_was_written() {
        let wp = WakePipe::new().unwrap();
        wp.wake().unwrap();
        wp.wake().unwrap();
        wp.wake().unwrap();
        wp.drain().unwrap();
        // A second drain with nothing pending must not block or error.
        wp.drain().unwrap();
    }
}
