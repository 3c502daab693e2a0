//! TCP connection actor: server- or client-role endpoint with client-side
//! auto-reconnect and a byte-stream receive protocol (§4.5).
//!
//! The reconnect state machine and receive-buffer bookkeeping are original
//! to the design this crate implements (the teacher has no equivalent: its
//! network actors are thin tokio wrappers with no manual state machine).
//! Socket-call style (validate, map errors to a `thiserror` variant with a
//! descriptive message) is grounded on
//! `airssys-osl/src/executors/network/socket.rs`.

use std::net::{Ipv4Addr, SocketAddrV4, ToSocketAddrs};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};

use nix::errno::Errno;
use nix::sys::socket::{
    connect, getsockopt, socket, sockopt, AddressFamily, SockFlag, SockType, SockaddrIn,
};

use crate::actor::behavior::ActorBehavior;
use crate::actor::context::{ActorContext, ReadyEvent};
use crate::actor::handle::ActorSender;
use crate::error::{ActorError, ActorResult, ReceiveFault};
use crate::net::messages::NetEvent;

/// Timer id reserved for the client-role reconnect attempt.
pub const RECONNECT_TIMER_ID: i32 = i32::MAX - 1;

/// Default receive-buffer capacity.
pub const DEFAULT_BUFFER_CAPACITY: usize = 65_535;

/// Messages accepted by [`TcpConnectionActor`].
#[derive(Debug)]
pub enum ConnMsg {
    /// Re-home this (server-role) actor onto an already-accepted
    /// descriptor, e.g. handed off from a [`super::listener::TcpListenerActor`].
    SetFd(RawFd),
    /// Queue bytes to send once connected. Dropped (reported as
    /// [`ReceiveFault::SendDataWasLost`]) if not connected.
    Send(Vec<u8>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Unknown,
    Server,
    Client,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InternalStatus {
    Disconnected,
    Connecting,
    Connected,
}

impl InternalStatus {
    fn external_connected(self) -> bool {
        matches!(self, InternalStatus::Connected)
    }
}

/// Client-role reconnect parameters.
#[derive(Debug, Clone)]
pub struct TcpClientConfig {
    pub server_addr: String,
    pub server_port: u16,
    pub t1_ms: u64,
    pub t2_ms: u64,
}

impl Default for TcpClientConfig {
    fn default() -> Self {
        TcpClientConfig {
            server_addr: String::new(),
            server_port: 0,
            t1_ms: 5_000,
            t2_ms: 1_000,
        }
    }
}

/// Receives bytes accumulated in the connection's buffer and reports how
/// many were consumed, per the over-/under-consumption contract in §4.5.
///
/// Implementors provide application-level framing (e.g. a length-prefixed
/// reader) on top of the raw byte stream.
pub trait ReceiveHandler: Send + 'static {
    /// `data` is the unconsumed tail of the receive buffer. Return the
    /// number of bytes consumed, in `0..=data.len()`; a subclass that
    /// returns a value outside this range triggers an
    /// [`ReceiveFault::IllegalUse`] and has its `data` forcibly fully
    /// consumed.
    fn on_receive(&mut self, data: &[u8]) -> i64;
}

/// A TCP endpoint: bound to an already-accepted fd (server role) or driven
/// by a reconnecting client state machine (client role).
pub struct TcpConnectionActor<R: ReceiveHandler, M: From<NetEvent> + Send + 'static> {
    role: Role,
    status: InternalStatus,
    socket_fd: Option<OwnedFd>,
    initial_fd: Option<RawFd>,
    client_config: Option<TcpClientConfig>,
    notifier: Option<ActorSender<M>>,
    receiver: R,
    buffer: Vec<u8>,
    pos: usize,
    len: usize,
    active: bool,
}

impl<R: ReceiveHandler, M: From<NetEvent> + Send + 'static> TcpConnectionActor<R, M> {
    /// Construct a server-role actor that will take ownership of
    /// `accepted_fd` once started.
    pub fn from_accepted_fd(
        accepted_fd: RawFd,
        receiver: R,
        notifier: Option<ActorSender<M>>,
    ) -> Self {
        TcpConnectionActor {
            role: Role::Server,
            status: InternalStatus::Disconnected,
            socket_fd: None,
            initial_fd: Some(accepted_fd),
            client_config: None,
            notifier,
            receiver,
            buffer: vec![0u8; DEFAULT_BUFFER_CAPACITY],
            pos: 0,
            len: 0,
            active: true,
        }
    }

    /// Construct a client-role actor that dials `config.server_addr` and
    /// reconnects per `config.t1_ms`/`config.t2_ms`.
    pub fn connecting_to(
        config: TcpClientConfig,
        receiver: R,
        notifier: Option<ActorSender<M>>,
    ) -> Self {
        TcpConnectionActor {
            role: Role::Client,
            status: InternalStatus::Disconnected,
            socket_fd: None,
            initial_fd: None,
            client_config: Some(config),
            notifier,
            receiver,
            buffer: vec![0u8; DEFAULT_BUFFER_CAPACITY],
            pos: 0,
            len: 0,
            active: true,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status.external_connected()
    }

    fn raw_fd(&self) -> Option<RawFd> {
        self.socket_fd.as_ref().map(|fd| fd.as_raw_fd())
    }

    fn notify(&self, event: NetEvent) {
        match &self.notifier {
            Some(sender) => {
                if let Err(e) = sender.post(M::from(event)) {
                    tracing::warn!(error = %e, "failed to notify connection's notifier actor");
                }
            }
            None => tracing::info!(?event, "tcp connection event (no notifier configured)"),
        }
    }

    fn change_status(&mut self, ctx: &ActorContext, next: InternalStatus) {
        let was_connected = self.status.external_connected();
        self.status = next;
        if was_connected != next.external_connected() {
            self.notify(NetEvent::StatusChanged {
                actor_number: ctx.number(),
                connected: next.external_connected(),
            });
        }
    }

    fn close_socket(&mut self, ctx: &ActorContext) {
        if let Some(fd) = self.raw_fd() {
            ctx.unwatch_fd(fd);
        }
        self.socket_fd = None;
        self.pos = 0;
        self.len = 0;
    }

    fn arm_reconnect(&mut self, ctx: &ActorContext, delay_ms: u64) {
        if !self.active || delay_ms == 0 {
            return;
        }
        // A stale reconnect timer, if any, is replaced rather than doubled.
        ctx.cancel_timer(RECONNECT_TIMER_ID);
        if let Err(e) = ctx.set_timer(delay_ms, RECONNECT_TIMER_ID, 0) {
            tracing::error!(actor = ctx.number(), error = %e, "failed to arm reconnect timer");
        }
    }

    /// (Re-)attempt a client-role connection.
    fn open(&mut self, ctx: &ActorContext) {
        let Some(config) = self.client_config.clone() else {
            return;
        };
        let addr = match resolve_ipv4(&config.server_addr, config.server_port) {
            Ok(a) => a,
            Err(e) => {
                tracing::warn!(actor = ctx.number(), error = %e, "dns resolution failed");
                self.arm_reconnect(ctx, config.t2_ms);
                return;
            }
        };
        let fd = match socket(
            AddressFamily::Inet,
            SockType::Stream,
            SockFlag::SOCK_NONBLOCK,
            None,
        ) {
            Ok(fd) => fd,
            Err(e) => {
                self.notify(NetEvent::Fault {
                    actor_number: ctx.number(),
                    fault: ReceiveFault::ApiCall(format!("socket() failed: {e}")),
                });
                self.arm_reconnect(ctx, config.t2_ms);
                return;
            }
        };
        let raw = fd.as_raw_fd();
        let sockaddr = SockaddrIn::from(addr);
        match connect(raw, &sockaddr) {
            Ok(()) => {
                self.socket_fd = Some(fd);
                if ctx.watch_fd(raw, true, false, false).is_ok() {
                    self.change_status(ctx, InternalStatus::Connected);
                }
            }
            Err(Errno::EINPROGRESS) => {
                self.socket_fd = Some(fd);
                if ctx.watch_fd(raw, true, true, false).is_ok() {
                    self.status = InternalStatus::Connecting;
                }
            }
            Err(e) => {
                self.notify(NetEvent::Fault {
                    actor_number: ctx.number(),
                    fault: ReceiveFault::ApiCall(format!("connect() failed: {e}")),
                });
                self.arm_reconnect(ctx, config.t2_ms);
            }
        }
    }

    fn handle_set_fd(&mut self, ctx: &ActorContext, fd: RawFd) {
        self.close_socket(ctx);
        // SAFETY: the caller (typically a listener's notifier) transfers
        // ownership of an fd it obtained from `accept()` and will not use
        // again.
        let owned = unsafe { OwnedFd::from_raw_fd(fd) };
        self.role = Role::Server;
        if ctx.watch_fd(fd, true, false, false).is_ok() {
            self.socket_fd = Some(owned);
            self.change_status(ctx, InternalStatus::Connected);
        }
    }

    fn handle_send(&mut self, ctx: &ActorContext, data: Vec<u8>) {
        if !self.status.external_connected() {
            self.notify(NetEvent::Fault {
                actor_number: ctx.number(),
                fault: ReceiveFault::SendDataWasLost,
            });
            return;
        }
        let Some(fd) = self.raw_fd() else {
            return;
        };
        match nix::unistd::write(unsafe { std::os::fd::BorrowedFd::borrow_raw(fd) }, &data) {
            Ok(n) if n == data.len() => {}
            Ok(_) => {
                self.notify(NetEvent::Fault {
                    actor_number: ctx.number(),
                    fault: ReceiveFault::ApiCall("short write on tcp connection".into()),
                });
            }
            Err(e) => {
                self.notify(NetEvent::Fault {
                    actor_number: ctx.number(),
                    fault: ReceiveFault::ApiCall(format!("send() failed: {e}")),
                });
                self.drop_connection(ctx);
            }
        }
    }

    fn drop_connection(&mut self, ctx: &ActorContext) {
        self.close_socket(ctx);
        self.change_status(ctx, InternalStatus::Disconnected);
        if self.role == Role::Client {
            let t1 = self.client_config.as_ref().map(|c| c.t1_ms).unwrap_or(0);
            self.arm_reconnect(ctx, t1);
        }
    }

    fn finish_connecting(&mut self, ctx: &ActorContext) {
        let Some(fd) = self.raw_fd() else { return };
        let err = getsockopt(
            &unsafe { std::os::fd::BorrowedFd::borrow_raw(fd) },
            sockopt::SocketError,
        )
        .unwrap_or(0);
        if err == 0 {
            ctx.unwatch_fd(fd);
            if ctx.watch_fd(fd, true, false, false).is_ok() {
                self.change_status(ctx, InternalStatus::Connected);
            }
        } else {
            let t1 = self
                .client_config
                .as_ref()
                .map(|c| c.t1_ms)
                .unwrap_or(5_000);
            self.notify(NetEvent::Fault {
                actor_number: ctx.number(),
                fault: ReceiveFault::ApiCall(format!("connect failed with errno {err}")),
            });
            self.close_socket(ctx);
            self.change_status(ctx, InternalStatus::Disconnected);
            self.arm_reconnect(ctx, t1);
        }
    }

    /// Pull bytes off the socket and drive `receiver.on_receive` per the
    /// pos/accepted/len contract.
    fn handle_readable(&mut self, ctx: &ActorContext) {
        let Some(fd) = self.raw_fd() else { return };
        loop {
            if self.len == self.buffer.len() {
                // Buffer is full and the subclass isn't consuming; stop
                // reading until it does (next readiness notification).
                break;
            }
            let borrowed = unsafe { std::os::fd::BorrowedFd::borrow_raw(fd) };
            match nix::unistd::read(borrowed, &mut self.buffer[self.len..]) {
                Ok(0) => {
                    self.drop_connection(ctx);
                    return;
                }
                Ok(n) => self.len += n,
                Err(Errno::EWOULDBLOCK) => break,
                Err(e) => {
                    self.notify(NetEvent::Fault {
                        actor_number: ctx.number(),
                        fault: ReceiveFault::ApiCall(format!("recv() failed: {e}")),
                    });
                    self.drop_connection(ctx);
                    return;
                }
            }
        }
        self.drain_buffer(ctx);
    }

    fn drain_buffer(&mut self, ctx: &ActorContext) {
        loop {
            let available = self.len - self.pos;
            if available == 0 {
                break;
            }
            let accepted = self.receiver.on_receive(&self.buffer[self.pos..self.len]);
            if !(0..=available as i64).contains(&accepted) {
                self.notify(NetEvent::Fault {
                    actor_number: ctx.number(),
                    fault: ReceiveFault::IllegalUse(format!(
                        "on_receive returned {accepted}, expected 0..={available}"
                    )),
                });
                self.pos = self.len;
                break;
            }
            if accepted == 0 {
                break;
            }
            self.pos += accepted as usize;
        }
        if self.pos > 0 {
            self.buffer.copy_within(self.pos..self.len, 0);
            self.len -= self.pos;
            self.pos = 0;
        }
    }
}

fn resolve_ipv4(host: &str, port: u16) -> std::io::Result<SocketAddrV4> {
    if let Ok(ip) = host.parse::<Ipv4Addr>() {
        return Ok(SocketAddrV4::new(ip, port));
    }
    (host, port)
        .to_socket_addrs()?
        .find_map(|a| match a {
            std::net::SocketAddr::V4(v4) => Some(v4),
            _ => None,
        })
        .ok_or_else(|| std::io::Error::other(format!("could not resolve {host} to an ipv4 address")))
}

impl<R: ReceiveHandler, M: From<NetEvent> + Send + 'static> ActorBehavior
    for TcpConnectionActor<R, M>
{
    type Message = ConnMsg;

    fn on_pre_create(&mut self) -> ActorResult<()> {
        if self.role == Role::Unknown {
            self.role = Role::Server;
        }
        if self.role == Role::Client {
            let config = self
                .client_config
                .as_ref()
                .ok_or_else(|| ActorError::Context("client role requires a config".into()))?;
            // See DESIGN.md open question 4: a port of 0 is rejected rather
            // than silently keeping a stale value.
            if config.server_port == 0 {
                return Err(ActorError::Param(
                    "tcp client requires a non-zero server_port".into(),
                ));
            }
        }
        Ok(())
    }

    fn on_thread_initiate(&mut self, ctx: &ActorContext) -> ActorResult<()> {
        match self.role {
            Role::Server => {
                if let Some(fd) = self.initial_fd.take() {
                    self.handle_set_fd(ctx, fd);
                }
            }
            Role::Client => self.open(ctx),
            Role::Unknown => unreachable!("resolved in on_pre_create"),
        }
        Ok(())
    }

    fn on_msg(&mut self, ctx: &ActorContext, msg: ConnMsg) {
        match msg {
            ConnMsg::SetFd(fd) => self.handle_set_fd(ctx, fd),
            ConnMsg::Send(data) => self.handle_send(ctx, data),
        }
    }

    fn on_timer(&mut self, ctx: &ActorContext, id: i32) {
        if id == RECONNECT_TIMER_ID && self.active && self.role == Role::Client {
            self.open(ctx);
        }
    }

    fn on_event(&mut self, ctx: &ActorContext, events: &[ReadyEvent]) {
        let Some(fd) = self.raw_fd() else { return };
        let Some(ev) = events.iter().find(|e| e.fd == fd) else {
            return;
        };
        match self.status {
            InternalStatus::Connecting => self.finish_connecting(ctx),
            InternalStatus::Connected => {
                if ev.readable || ev.exceptional {
                    self.handle_readable(ctx);
                }
            }
            InternalStatus::Disconnected => {}
        }
    }

    fn on_thread_terminate(&mut self, ctx: &ActorContext) {
        self.active = false;
        ctx.cancel_timer(RECONNECT_TIMER_ID);
        self.close_socket(ctx);
    }
}
