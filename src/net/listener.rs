//! TCP listener actor (§4.6).
//!
//! Grounded on `airssys-osl/src/operations/network/socket.rs` and
//! `executors/network/socket.rs` for the socket-operation doc style
//! (validate-then-execute, `thiserror`-flavoured failure messages); the
//! concrete socket calls are new since the teacher's network executors are
//! async (`tokio::net`) and this actor's event loop is not.

use std::net::{IpAddr, Ipv4Addr, SocketAddrV4};
use std::os::fd::{AsRawFd, OwnedFd, RawFd};

use nix::sys::socket::{
    accept, bind, getpeername, listen, setsockopt, socket, sockopt, AddressFamily, Backlog,
    SockFlag, SockType, SockaddrIn,
};

use crate::actor::behavior::ActorBehavior;
use crate::actor::context::ActorContext;
use crate::actor::handle::ActorSender;
use crate::error::{ActorError, ActorResult};
use crate::net::messages::NetEvent;

/// Configuration for a [`TcpListenerActor`], set before `start`.
#[derive(Debug, Clone)]
pub struct TcpListenerConfig {
    pub port: u16,
}

/// Accepts inbound TCP connections and forwards each as
/// [`NetEvent::Accepted`] to a configured notifier; the notifier owns
/// closing the accepted descriptor.
pub struct TcpListenerActor<M: From<NetEvent> + Send + 'static> {
    config: TcpListenerConfig,
    notifier: Option<ActorSender<M>>,
    listen_fd: Option<OwnedFd>,
}

impl<M: From<NetEvent> + Send + 'static> TcpListenerActor<M> {
    pub fn new(config: TcpListenerConfig, notifier: Option<ActorSender<M>>) -> Self {
        TcpListenerActor {
            config,
            notifier,
            listen_fd: None,
        }
    }

    fn raw_fd(&self) -> Option<RawFd> {
        self.listen_fd.as_ref().map(|fd| fd.as_raw_fd())
    }

    fn notify(&self, event: NetEvent) {
        match &self.notifier {
            Some(sender) => {
                if let Err(e) = sender.post(M::from(event)) {
                    tracing::warn!(error = %e, "failed to notify listener's notifier actor");
                }
            }
            None => tracing::info!(?event, "tcp listener event (no notifier configured)"),
        }
    }
}

impl<M: From<NetEvent> + Send + 'static> ActorBehavior for TcpListenerActor<M> {
    type Message = ();

    fn on_pre_create(&mut self) -> ActorResult<()> {
        if self.config.port == 0 {
            return Err(ActorError::Param(
                "tcp listener requires a non-zero port".into(),
            ));
        }
        Ok(())
    }

    fn on_thread_initiate(&mut self, ctx: &ActorContext) -> ActorResult<()> {
        let fd = socket(
            AddressFamily::Inet,
            SockType::Stream,
            SockFlag::SOCK_NONBLOCK,
            None,
        )
        .map_err(|e| ActorError::Resource(format!("socket() failed: {e}")))?;
        setsockopt(&fd, sockopt::ReuseAddr, &true)
            .map_err(|e| ActorError::Resource(format!("setsockopt(SO_REUSEADDR) failed: {e}")))?;
        let addr = SockaddrIn::from(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, self.config.port));
        bind(fd.as_raw_fd(), &addr)
            .map_err(|e| ActorError::Resource(format!("bind() failed: {e}")))?;
        listen(&fd, Backlog::MAXCONN)
            .map_err(|e| ActorError::Resource(format!("listen() failed: {e}")))?;
        ctx.watch_fd(fd.as_raw_fd(), true, false, false)?;
        tracing::info!(
            actor = ctx.number(),
            port = self.config.port,
            "tcp listener bound"
        );
        self.listen_fd = Some(fd);
        Ok(())
    }

    fn on_msg(&mut self, _ctx: &ActorContext, _msg: ()) {}

    fn on_event(&mut self, ctx: &ActorContext, events: &[crate::actor::context::ReadyEvent]) {
        let Some(listen_fd) = self.raw_fd() else {
            return;
        };
        let readable = events
            .iter()
            .any(|e| e.fd == listen_fd && (e.readable || e.exceptional));
        if !readable {
            return;
        }
        loop {
            match accept(listen_fd) {
                Ok(accepted_fd) => {
                    let (peer_addr, peer_port) = getpeername::<SockaddrIn>(accepted_fd)
                        .map(|a| (IpAddr::V4(a.ip()), a.port()))
                        .unwrap_or((IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0));
                    tracing::info!(
                        actor = ctx.number(),
                        peer = %peer_addr,
                        "tcp listener accepted connection"
                    );
                    self.notify(NetEvent::Accepted {
                        listen_port: self.config.port,
                        accepted_fd,
                        peer_addr,
                        peer_port,
                    });
                }
                Err(nix::errno::Errno::EWOULDBLOCK) => break,
                Err(e) => {
                    tracing::error!(actor = ctx.number(), error = %e, "accept() failed, closing listener");
                    ctx.unwatch_fd(listen_fd);
                    self.listen_fd = None;
                    break;
                }
            }
        }
    }

    fn on_thread_terminate(&mut self, ctx: &ActorContext) {
        if let Some(fd) = self.raw_fd() {
            ctx.unwatch_fd(fd);
        }
        self.listen_fd = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_port_is_rejected_pre_start() {
        let mut actor: TcpListenerActor<NetEvent> =
            TcpListenerActor::new(TcpListenerConfig { port: 0 }, None);
        assert_eq!(actor.on_pre_create().unwrap_err().code(), -1);
    }
}
