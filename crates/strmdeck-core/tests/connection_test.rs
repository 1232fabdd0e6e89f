#![allow(clippy::unwrap_used)]
// Connection manager behavior against a scripted push transport, on a
// paused clock so backoff timings are exact.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::time::Instant;

use strmdeck_api::push::PING_FRAME;
use strmdeck_api::{Error, EventKind, PushChannel, PushFrame, PushTransport};
use strmdeck_core::{
    ConnectionManager, ConnectionState, ConnectionStatus, EventRouter, Notification, Notifier,
    ReconnectPolicy, Severity,
};

// ── Scripted transport ──────────────────────────────────────────────

enum Step {
    Refuse,
    /// Accept; yield `frames`, then either hang open or end the stream.
    Accept {
        frames: Vec<PushFrame>,
        stay_open: bool,
    },
}

fn stay_open() -> Step {
    Step::Accept {
        frames: Vec::new(),
        stay_open: true,
    }
}

#[derive(Default)]
struct ScriptedTransport {
    script: Mutex<VecDeque<Step>>,
    opens: Mutex<Vec<Instant>>,
    sent: Arc<Mutex<Vec<String>>>,
    fail_sends: bool,
}

impl ScriptedTransport {
    fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(steps.into()),
            ..Self::default()
        })
    }

    fn with_failing_sends(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(steps.into()),
            fail_sends: true,
            ..Self::default()
        })
    }

    fn open_offsets(&self, start: Instant) -> Vec<u64> {
        self.opens
            .lock()
            .unwrap()
            .iter()
            .map(|t| (*t - start).as_secs())
            .collect()
    }

    fn open_count(&self) -> usize {
        self.opens.lock().unwrap().len()
    }

    fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl PushTransport for ScriptedTransport {
    async fn open(&self) -> Result<Box<dyn PushChannel>, Error> {
        self.opens.lock().unwrap().push(Instant::now());
        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Step::Refuse);

        match step {
            Step::Refuse => Err(Error::WebSocketConnect("connection refused".into())),
            Step::Accept { frames, stay_open } => Ok(Box::new(ScriptedChannel {
                frames: frames.into(),
                stay_open,
                sent: Arc::clone(&self.sent),
                fail_sends: self.fail_sends,
            })),
        }
    }
}

struct ScriptedChannel {
    frames: VecDeque<PushFrame>,
    stay_open: bool,
    sent: Arc<Mutex<Vec<String>>>,
    fail_sends: bool,
}

#[async_trait]
impl PushChannel for ScriptedChannel {
    async fn next_frame(&mut self) -> Option<Result<PushFrame, Error>> {
        if let Some(frame) = self.frames.pop_front() {
            return Some(Ok(frame));
        }
        if self.stay_open {
            std::future::pending::<()>().await;
        }
        None
    }

    async fn send_text(&mut self, text: String) -> Result<(), Error> {
        if self.fail_sends {
            return Err(Error::WebSocketClosed {
                code: 1006,
                reason: "peer gone".into(),
            });
        }
        self.sent.lock().unwrap().push(text);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn manager(
    transport: &Arc<ScriptedTransport>,
    router: EventRouter,
    notifier: &Notifier,
    heartbeat: Option<Duration>,
) -> ConnectionManager {
    let transport: Arc<dyn PushTransport> = transport.clone();
    ConnectionManager::new(
        transport,
        ReconnectPolicy::default(),
        heartbeat,
        Arc::new(router),
        notifier.clone(),
    )
}

fn drain(feed: &mut broadcast::Receiver<Notification>) -> Vec<Notification> {
    let mut out = Vec::new();
    while let Ok(n) = feed.try_recv() {
        out.push(n);
    }
    out
}

fn count(notes: &[Notification], severity: Severity) -> usize {
    notes.iter().filter(|n| n.severity == severity).count()
}

// ── Reconnect schedule ──────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn gives_up_after_five_reconnects() {
    let transport = ScriptedTransport::new(Vec::new());
    let notifier = Notifier::new(Duration::from_secs(3));
    let mut feed = notifier.subscribe();
    let manager = manager(&transport, EventRouter::new(), &notifier, None);

    let start = Instant::now();
    manager.connect().await;
    tokio::time::sleep(Duration::from_secs(120)).await;

    assert_eq!(transport.open_offsets(start), vec![0, 1, 3, 7, 15, 31]);
    assert_eq!(
        manager.status(),
        ConnectionStatus {
            state: ConnectionState::Failed,
            attempt: 5
        }
    );

    let notes = drain(&mut feed);
    assert_eq!(count(&notes, Severity::Error), 1);
    assert_eq!(count(&notes, Severity::Info), 0);
}

#[tokio::test(start_paused = true)]
async fn successful_open_resets_attempts() {
    let transport = ScriptedTransport::new(vec![
        Step::Refuse,
        Step::Refuse,
        Step::Accept {
            frames: vec![PushFrame::Close {
                code: 1001,
                reason: "restarting".into(),
            }],
            stay_open: false,
        },
        stay_open(),
    ]);
    let notifier = Notifier::new(Duration::from_secs(3));
    let mut feed = notifier.subscribe();
    let manager = manager(&transport, EventRouter::new(), &notifier, None);

    let start = Instant::now();
    manager.connect().await;
    tokio::time::sleep(Duration::from_secs(60)).await;

    // refuse, +1s refuse, +2s open then close, +1s (reset) open
    assert_eq!(transport.open_offsets(start), vec![0, 1, 3, 4]);
    assert_eq!(
        manager.status(),
        ConnectionStatus {
            state: ConnectionState::Open,
            attempt: 0
        }
    );

    let notes = drain(&mut feed);
    assert_eq!(count(&notes, Severity::Info), 1, "only the first open is announced");
    assert_eq!(count(&notes, Severity::Error), 0);
}

#[tokio::test(start_paused = true)]
async fn stream_end_without_close_frame_reconnects() {
    let transport = ScriptedTransport::new(vec![
        Step::Accept {
            frames: Vec::new(),
            stay_open: false,
        },
        stay_open(),
    ]);
    let notifier = Notifier::new(Duration::from_secs(3));
    let manager = manager(&transport, EventRouter::new(), &notifier, None);

    let start = Instant::now();
    manager.connect().await;
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(transport.open_offsets(start), vec![0, 1]);
    assert_eq!(manager.state(), ConnectionState::Open);
}

// ── Inbound frames ──────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn malformed_payload_keeps_channel_open() {
    let transport = ScriptedTransport::new(vec![Step::Accept {
        frames: vec![
            PushFrame::Text("{not json".into()),
            PushFrame::Text(r#"{"type":"task_update","task":{"progress":"lots"}}"#.into()),
            PushFrame::Text(r#"{"type":"scan_progress","value":3}"#.into()),
            PushFrame::Text(r#"{"type":"log","message":"scan finished","level":"info"}"#.into()),
        ],
        stay_open: true,
    }]);
    let hits = Arc::new(AtomicUsize::new(0));
    let mut router = EventRouter::new();
    let counter = Arc::clone(&hits);
    router.on(EventKind::Log, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let notifier = Notifier::new(Duration::from_secs(3));
    let manager = manager(&transport, router, &notifier, None);

    manager.connect().await;
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(transport.open_count(), 1);
    assert_eq!(manager.state(), ConnectionState::Open);
}

// ── Heartbeat ───────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn heartbeat_pings_while_open() {
    let transport = ScriptedTransport::new(vec![stay_open()]);
    let notifier = Notifier::new(Duration::from_secs(3));
    let manager = manager(
        &transport,
        EventRouter::new(),
        &notifier,
        Some(Duration::from_secs(25)),
    );

    manager.connect().await;
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(transport.sent(), vec![PING_FRAME.to_owned(), PING_FRAME.to_owned()]);
    assert_eq!(manager.state(), ConnectionState::Open);
}

#[tokio::test(start_paused = true)]
async fn failed_heartbeat_counts_as_unexpected_close() {
    let transport = ScriptedTransport::with_failing_sends(vec![stay_open(), stay_open()]);
    let notifier = Notifier::new(Duration::from_secs(3));
    let manager = manager(
        &transport,
        EventRouter::new(),
        &notifier,
        Some(Duration::from_secs(25)),
    );

    let start = Instant::now();
    manager.connect().await;
    tokio::time::sleep(Duration::from_secs(30)).await;

    // ping fails at 25s, reconnect after 1s
    assert_eq!(transport.open_offsets(start), vec![0, 26]);
    assert_eq!(manager.state(), ConnectionState::Open);
}

// ── Manual control ──────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn shutdown_suppresses_reconnects() {
    let transport = ScriptedTransport::new(Vec::new());
    let notifier = Notifier::new(Duration::from_secs(3));
    let mut feed = notifier.subscribe();
    let manager = manager(&transport, EventRouter::new(), &notifier, None);

    manager.connect().await;
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(
        manager.status(),
        ConnectionStatus {
            state: ConnectionState::Disconnected,
            attempt: 1
        }
    );

    manager.shutdown().await;
    tokio::time::sleep(Duration::from_secs(120)).await;
    manager.connect().await;
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(transport.open_count(), 1);
    assert_eq!(manager.state(), ConnectionState::Disconnected);
    assert_eq!(count(&drain(&mut feed), Severity::Error), 0);
}

#[tokio::test(start_paused = true)]
async fn shutdown_closes_open_channel() {
    let transport = ScriptedTransport::new(vec![stay_open()]);
    let notifier = Notifier::new(Duration::from_secs(3));
    let manager = manager(&transport, EventRouter::new(), &notifier, None);

    manager.connect().await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(manager.state(), ConnectionState::Open);

    manager.shutdown().await;

    assert!(manager.is_shut_down());
    assert_eq!(manager.state(), ConnectionState::Disconnected);
    assert_eq!(transport.open_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn manual_connect_from_failed_resets_budget() {
    let mut steps: Vec<Step> = (0..6).map(|_| Step::Refuse).collect();
    steps.push(stay_open());
    let transport = ScriptedTransport::new(steps);
    let notifier = Notifier::new(Duration::from_secs(3));
    let manager = manager(&transport, EventRouter::new(), &notifier, None);

    manager.connect().await;
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(manager.state(), ConnectionState::Failed);

    manager.connect().await;
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(transport.open_count(), 7);
    assert_eq!(
        manager.status(),
        ConnectionStatus {
            state: ConnectionState::Open,
            attempt: 0
        }
    );
}

#[tokio::test(start_paused = true)]
async fn manual_connect_cancels_pending_timer() {
    let transport = ScriptedTransport::new(vec![Step::Refuse, stay_open()]);
    let notifier = Notifier::new(Duration::from_secs(3));
    let manager = manager(&transport, EventRouter::new(), &notifier, None);

    let start = Instant::now();
    manager.connect().await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(manager.state(), ConnectionState::Disconnected);

    manager.connect().await;
    tokio::time::sleep(Duration::from_secs(10)).await;

    // second open happened immediately, and the old timer never fired
    assert_eq!(transport.open_offsets(start), vec![0, 0]);
    assert_eq!(manager.state(), ConnectionState::Open);
}

#[tokio::test(start_paused = true)]
async fn connect_while_open_is_a_noop() {
    let transport = ScriptedTransport::new(vec![stay_open(), stay_open()]);
    let notifier = Notifier::new(Duration::from_secs(3));
    let manager = manager(&transport, EventRouter::new(), &notifier, None);

    manager.connect().await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    manager.connect().await;
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(transport.open_count(), 1);
}
