//! End-to-end scenarios exercising real OS resources: threads, sockets,
//! timers, and the filesystem. Mirrors the scenario numbering used
//! throughout the design documentation (`SPEC_FULL.md` §8).

use std::net::TcpListener as StdTcpListener;
use std::os::fd::IntoRawFd;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use threadwheel::actor::behavior::ActorBehavior;
use threadwheel::actor::context::ActorContext;
use threadwheel::actor::handle::ActorHandle;
use threadwheel::net::connection::{ConnMsg, ReceiveHandler, TcpClientConfig, TcpConnectionActor};
use threadwheel::net::messages::NetEvent;

struct CounterBehavior {
    total: Arc<AtomicI64>,
}

impl ActorBehavior for CounterBehavior {
    type Message = i64;

    fn on_msg(&mut self, _ctx: &ActorContext, msg: i64) {
        self.total.fetch_add(msg, Ordering::SeqCst);
    }
}

fn wait_until(mut predicate: impl FnMut() -> bool, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if predicate() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    predicate()
}

/// Scenario 1: draining all five messages before a graceful stop yields the
/// full sum.
#[test]
fn scenario_inbox_drain_then_stop() {
    let total = Arc::new(AtomicI64::new(0));
    let mut handle = ActorHandle::new(CounterBehavior {
        total: Arc::clone(&total),
    })
    .unwrap();
    handle.start().unwrap();
    let sender = handle.sender();
    for v in 1..=5 {
        sender.post(v).unwrap();
    }
    handle.stop(false, 0).unwrap();
    handle.join().unwrap();
    assert_eq!(total.load(Ordering::SeqCst), 15);
}

/// Scenario 2: an immediate stop observed ahead of the tail drops every
/// pending message.
#[test]
fn scenario_immediate_stop_drops_tail() {
    let total = Arc::new(AtomicI64::new(0));
    let mut handle = ActorHandle::new(CounterBehavior {
        total: Arc::clone(&total),
    })
    .unwrap();
    handle.start().unwrap();
    let sender = handle.sender();
    for v in 1..=5 {
        sender.post(v).unwrap();
    }
    handle.stop(true, 0).unwrap();
    handle.join().unwrap();
    assert_eq!(total.load(Ordering::SeqCst), 0);
}

struct TimerBehavior {
    fires: Arc<Mutex<Vec<i32>>>,
}

impl ActorBehavior for TimerBehavior {
    type Message = ();

    fn on_thread_initiate(&mut self, ctx: &ActorContext) -> threadwheel::ActorResult<()> {
        ctx.set_timer(100, 7, 100)
    }

    fn on_msg(&mut self, _ctx: &ActorContext, _msg: ()) {}

    fn on_timer(&mut self, _ctx: &ActorContext, id: i32) {
        self.fires.lock().unwrap().push(id);
    }
}

/// Scenario 3: a 100ms-period timer fires roughly 3 times within 350ms.
#[test]
fn scenario_periodic_timer_fires_repeatedly() {
    let fires = Arc::new(Mutex::new(Vec::new()));
    let mut handle = ActorHandle::new(TimerBehavior {
        fires: Arc::clone(&fires),
    })
    .unwrap();
    handle.start().unwrap();
    std::thread::sleep(Duration::from_millis(350));
    handle.stop(false, 0).unwrap();
    handle.join().unwrap();

    let observed = fires.lock().unwrap().clone();
    assert!(
        (2..=4).contains(&observed.len()),
        "expected roughly 3 fires, got {observed:?}"
    );
    assert!(observed.iter().all(|&id| id == 7));
}

struct CollectingReceiver {
    collected: Arc<Mutex<Vec<u8>>>,
}

impl ReceiveHandler for CollectingReceiver {
    fn on_receive(&mut self, data: &[u8]) -> i64 {
        self.collected.lock().unwrap().extend_from_slice(data);
        data.len() as i64
    }
}

struct NoOpReceiver;
impl ReceiveHandler for NoOpReceiver {
    fn on_receive(&mut self, _data: &[u8]) -> i64 {
        0
    }
}

/// Scenario 4: bytes sent across two back-to-back `Send` messages arrive as
/// one contiguous stream on the receiving side.
#[test]
fn scenario_tcp_echo_with_framing() {
    let listener = StdTcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let accepted = Arc::new(Mutex::new(None));
    let accepted_clone = Arc::clone(&accepted);
    let accept_thread = std::thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        stream.set_nonblocking(true).unwrap();
        *accepted_clone.lock().unwrap() = Some(stream.into_raw_fd());
    });

    let mut client: ActorHandle<TcpConnectionActor<NoOpReceiver, NetEvent>> =
        ActorHandle::new(TcpConnectionActor::connecting_to(
            TcpClientConfig {
                server_addr: "127.0.0.1".into(),
                server_port: port,
                t1_ms: 5_000,
                t2_ms: 1_000,
            },
            NoOpReceiver,
            None,
        ))
        .unwrap();
    client.start().unwrap();

    accept_thread.join().unwrap();
    let accepted_fd = accepted.lock().unwrap().take().unwrap();

    let collected = Arc::new(Mutex::new(Vec::new()));
    let mut server: ActorHandle<TcpConnectionActor<CollectingReceiver, NetEvent>> =
        ActorHandle::new(TcpConnectionActor::from_accepted_fd(
            accepted_fd,
            CollectingReceiver {
                collected: Arc::clone(&collected),
            },
            None,
        ))
        .unwrap();
    server.start().unwrap();

    // Give the client's nonblocking connect time to complete before sending.
    std::thread::sleep(Duration::from_millis(150));
    let sender = client.sender();
    sender.post(ConnMsg::Send(b"hello".to_vec())).unwrap();
    sender.post(ConnMsg::Send(b"world".to_vec())).unwrap();

    let ok = wait_until(
        || collected.lock().unwrap().as_slice() == b"helloworld",
        Duration::from_secs(3),
    );
    assert!(
        ok,
        "expected contiguous helloworld, got {:?}",
        collected.lock().unwrap()
    );

    client.stop(false, 0).unwrap();
    client.join().unwrap();
    server.stop(false, 0).unwrap();
    server.join().unwrap();
}

struct EventCollector {
    events: Arc<Mutex<Vec<NetEvent>>>,
}

impl ActorBehavior for EventCollector {
    type Message = NetEvent;

    fn on_msg(&mut self, _ctx: &ActorContext, msg: NetEvent) {
        self.events.lock().unwrap().push(msg);
    }
}

/// Scenario 5: a client pointed at a closed port keeps retrying on the T2
/// cadence, reporting exactly one fault per attempt, never connecting.
#[test]
fn scenario_reconnect_after_refusal() {
    // Bind, read the port, then drop the listener so the port refuses.
    let probe = StdTcpListener::bind("127.0.0.1:0").unwrap();
    let closed_port = probe.local_addr().unwrap().port();
    drop(probe);

    let events = Arc::new(Mutex::new(Vec::new()));
    let mut collector = ActorHandle::new(EventCollector {
        events: Arc::clone(&events),
    })
    .unwrap();
    collector.start().unwrap();

    let mut client: ActorHandle<TcpConnectionActor<NoOpReceiver, NetEvent>> =
        ActorHandle::new(TcpConnectionActor::connecting_to(
            TcpClientConfig {
                server_addr: "127.0.0.1".into(),
                server_port: closed_port,
                t1_ms: 5_000,
                t2_ms: 200,
            },
            NoOpReceiver,
            Some(collector.sender()),
        ))
        .unwrap();
    client.start().unwrap();

    std::thread::sleep(Duration::from_millis(900));
    client.stop(false, 0).unwrap();
    client.join().unwrap();
    collector.stop(false, 0).unwrap();
    collector.join().unwrap();

    let observed = events.lock().unwrap().clone();
    let fault_count = observed
        .iter()
        .filter(|e| matches!(e, NetEvent::Fault { .. }))
        .count();
    let connected_count = observed
        .iter()
        .filter(|e| matches!(e, NetEvent::StatusChanged { connected: true, .. }))
        .count();
    assert_eq!(connected_count, 0, "must never report Connected");
    assert!(
        fault_count >= 2,
        "expected multiple reconnect attempts within 900ms at 200ms cadence, got {fault_count}"
    );
}
