//! Event types forwarded to a configured notifier actor.
//!
//! Grounded on `airssys-rt/src/osl/actors/network.rs`'s
//! `NetworkResponse`/`From<NetworkResponse>` pattern: notifiers are not
//! addressed by a concrete actor type, only by accepting a message their
//! `Message` type can be built `From`. A behaviour that wants to receive
//! these forwards them by implementing `From<NetEvent>` for its own message
//! enum and registering an [`crate::actor::handle::ActorSender`] as the
//! notifier.

use std::net::{IpAddr, Ipv4Addr};
use std::os::fd::RawFd;

use crate::error::ReceiveFault;

/// One network-originated event, forwarded to a connection/listener/UDP
/// actor's configured notifier.
#[derive(Debug, Clone)]
pub enum NetEvent {
    /// The listener at `listen_port` accepted a new connection. The
    /// receiver owns `accepted_fd` and is responsible for closing it (by
    /// handing it to a connection actor via `set_fd`, or closing it
    /// directly if unwanted).
    Accepted {
        listen_port: u16,
        accepted_fd: RawFd,
        peer_addr: IpAddr,
        peer_port: u16,
    },

    /// A connection actor's status changed.
    StatusChanged {
        actor_number: i32,
        connected: bool,
    },

    /// Bytes received on a connection or UDP socket after subclass framing
    /// (`on_receive`) accepted them.
    Data {
        actor_number: i32,
        bytes: Vec<u8>,
        peer_addr: Option<IpAddr>,
        peer_port: Option<u16>,
    },

    /// A non-fatal fault occurred (see `crate::error::ReceiveFault`).
    Fault {
        actor_number: i32,
        fault: ReceiveFault,
    },
}

impl NetEvent {
    pub fn loopback_accepted(listen_port: u16, accepted_fd: RawFd, peer_port: u16) -> Self {
        NetEvent::Accepted {
            listen_port,
            accepted_fd,
            peer_addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
            peer_port,
        }
    }
}
