//! UDP socket actor (§4.6).
//!
//! Bound (fixed port) or ephemeral, depending on configuration. Send-before-
//! bind is supported: the first `send_to` creates the socket and registers
//! read interest lazily, mirroring the ephemeral-port path described in the
//! design spec.

use std::net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4};
use std::os::fd::{AsRawFd, OwnedFd};

use nix::sys::socket::{
    bind, getsockname, recvfrom, sendto, setsockopt, socket, sockopt, AddressFamily, MsgFlags,
    SockFlag, SockType, SockaddrIn,
};

use crate::actor::behavior::ActorBehavior;
use crate::actor::context::{ActorContext, ReadyEvent};
use crate::actor::handle::ActorSender;
use crate::error::{ActorError, ActorResult, ReceiveFault};
use crate::net::messages::NetEvent;

/// Configuration for a [`UdpSocketActor`]. `bind_port = 0` means ephemeral.
#[derive(Debug, Clone, Copy, Default)]
pub struct UdpConfig {
    pub bind_port: u16,
}

#[derive(Debug)]
pub enum UdpMsg {
    SendTo { addr: SocketAddr, data: Vec<u8> },
}

pub struct UdpSocketActor<M: From<NetEvent> + Send + 'static> {
    config: UdpConfig,
    fd: Option<OwnedFd>,
    notifier: Option<ActorSender<M>>,
}

impl<M: From<NetEvent> + Send + 'static> UdpSocketActor<M> {
    pub fn new(config: UdpConfig, notifier: Option<ActorSender<M>>) -> Self {
        UdpSocketActor {
            config,
            fd: None,
            notifier,
        }
    }

    fn notify(&self, event: NetEvent) {
        match &self.notifier {
            Some(sender) => {
                if let Err(e) = sender.post(M::from(event)) {
                    tracing::warn!(error = %e, "failed to notify udp socket's notifier actor");
                }
            }
            None => tracing::info!(?event, "udp socket event (no notifier configured)"),
        }
    }

    fn ensure_socket(&mut self, ctx: &ActorContext) -> ActorResult<()> {
        if self.fd.is_some() {
            return Ok(());
        }
        let fd = socket(
            AddressFamily::Inet,
            SockType::Datagram,
            SockFlag::SOCK_NONBLOCK,
            None,
        )
        .map_err(|e| ActorError::Resource(format!("socket() failed: {e}")))?;
        setsockopt(&fd, sockopt::ReuseAddr, &true)
            .map_err(|e| ActorError::Resource(format!("setsockopt(SO_REUSEADDR) failed: {e}")))?;
        let addr = SockaddrIn::from(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, self.config.bind_port));
        bind(fd.as_raw_fd(), &addr)
            .map_err(|e| ActorError::Resource(format!("bind() failed: {e}")))?;
        ctx.watch_fd(fd.as_raw_fd(), true, false, false)?;
        if self.config.bind_port == 0 {
            if let Ok(bound) = getsockname::<SockaddrIn>(fd.as_raw_fd()) {
                tracing::info!(actor = ctx.number(), port = bound.port(), "udp socket bound to ephemeral port");
            }
        }
        self.fd = Some(fd);
        Ok(())
    }

    fn handle_send_to(&mut self, ctx: &ActorContext, addr: SocketAddr, data: Vec<u8>) {
        if let Err(e) = self.ensure_socket(ctx) {
            self.notify(NetEvent::Fault {
                actor_number: ctx.number(),
                fault: ReceiveFault::ApiCall(e.to_string()),
            });
            return;
        }
        let SocketAddr::V4(v4) = addr else {
            self.notify(NetEvent::Fault {
                actor_number: ctx.number(),
                fault: ReceiveFault::ApiCall("udp destination must be ipv4".into()),
            });
            return;
        };
        let Some(fd) = self.fd.as_ref().map(|f| f.as_raw_fd()) else {
            return;
        };
        let dest = SockaddrIn::from(v4);
        match sendto(fd, &data, &dest, MsgFlags::empty()) {
            Ok(n) if n == data.len() => {}
            Ok(_) => {
                self.notify(NetEvent::Fault {
                    actor_number: ctx.number(),
                    fault: ReceiveFault::ApiCall("short write on udp socket".into()),
                });
            }
            Err(e) => {
                self.notify(NetEvent::Fault {
                    actor_number: ctx.number(),
                    fault: ReceiveFault::ApiCall(format!("sendto() failed: {e}")),
                });
            }
        }
    }

    fn handle_readable(&mut self, ctx: &ActorContext) {
        let Some(fd) = self.fd.as_ref().map(|f| f.as_raw_fd()) else {
            return;
        };
        let mut buf = [0u8; 65_535];
        loop {
            match recvfrom::<SockaddrIn>(fd, &mut buf) {
                Ok((n, Some(from))) => {
                    self.notify(NetEvent::Data {
                        actor_number: ctx.number(),
                        bytes: buf[..n].to_vec(),
                        peer_addr: Some(IpAddr::V4(from.ip())),
                        peer_port: Some(from.port()),
                    });
                }
                Ok((_, None)) => continue,
                Err(nix::errno::Errno::EWOULDBLOCK) => break,
                Err(e) => {
                    self.notify(NetEvent::Fault {
                        actor_number: ctx.number(),
                        fault: ReceiveFault::ApiCall(format!("recvfrom() failed: {e}")),
                    });
                    break;
                }
            }
        }
    }
}

impl<M: From<NetEvent> + Send + 'static> ActorBehavior for UdpSocketActor<M> {
    type Message = UdpMsg;

    fn on_thread_initiate(&mut self, ctx: &ActorContext) -> ActorResult<()> {
        if self.config.bind_port != 0 {
            self.ensure_socket(ctx)?;
        }
        Ok(())
    }

    fn on_msg(&mut self, ctx: &ActorContext, msg: UdpMsg) {
        match msg {
            UdpMsg::SendTo { addr, data } => self.handle_send_to(ctx, addr, data),
        }
    }

    fn on_event(&mut self, ctx: &ActorContext, events: &[ReadyEvent]) {
        let Some(fd) = self.fd.as_ref().map(|f| f.as_raw_fd()) else {
            return;
        };
        if events.iter().any(|e| e.fd == fd && e.readable) {
            self.handle_readable(ctx);
        }
    }

    fn on_thread_terminate(&mut self, ctx: &ActorContext) {
        if let Some(fd) = self.fd.as_ref().map(|f| f.as_raw_fd()) {
            ctx.unwatch_fd(fd);
        }
        self.fd = None;
    }
}
