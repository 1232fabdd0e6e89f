// ── Push-channel connection manager ──
//
// Owns the push channel lifecycle: open, read, heartbeat, and bounded
// reconnection. One supervisor task per manager runs the whole loop, so
// there is never more than one pending reconnect timer.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;
use strum::{AsRefStr, Display};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use strmdeck_api::push::PING_FRAME;
use strmdeck_api::{PushChannel, PushFrame, PushTransport};

use crate::config::ReconnectPolicy;
use crate::notify::Notifier;
use crate::router::EventRouter;

// ── ConnectionState ──────────────────────────────────────────────────

/// Push-channel state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionState {
    /// Not connected. With `attempt > 0`, a reconnect is scheduled.
    Disconnected,
    Connecting,
    Open,
    Closing,
    /// Reconnect budget exhausted. Only a manual `connect()` leaves this.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    /// Consecutive failed reconnects since the last successful open.
    pub attempt: u32,
}

// ── ConnectionManager ────────────────────────────────────────────────

/// Handle to the push-channel supervisor.
///
/// Cheaply cloneable. Dropping the last handle cancels the supervisor.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    link: Arc<Link>,
    /// Session teardown. Once cancelled, `connect()` is refused.
    shutdown: CancellationToken,
    supervisor: Mutex<Option<Supervisor>>,
}

impl Drop for ManagerInner {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

struct Supervisor {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// State shared with the supervisor task.
struct Link {
    transport: Arc<dyn PushTransport>,
    policy: ReconnectPolicy,
    heartbeat: Option<Duration>,
    router: Arc<EventRouter>,
    notifier: Notifier,
    status: watch::Sender<ConnectionStatus>,
    /// The first successful open has been announced.
    announced: AtomicBool,
}

impl Link {
    fn set(&self, state: ConnectionState, attempt: u32) {
        self.status.send_if_modified(|s| {
            let next = ConnectionStatus { state, attempt };
            let changed = *s != next;
            *s = next;
            changed
        });
    }
}

impl ConnectionManager {
    pub fn new(
        transport: Arc<dyn PushTransport>,
        policy: ReconnectPolicy,
        heartbeat: Option<Duration>,
        router: Arc<EventRouter>,
        notifier: Notifier,
    ) -> Self {
        let (status, _) = watch::channel(ConnectionStatus {
            state: ConnectionState::Disconnected,
            attempt: 0,
        });
        Self {
            inner: Arc::new(ManagerInner {
                link: Arc::new(Link {
                    transport,
                    policy,
                    heartbeat,
                    router,
                    notifier,
                    status,
                    announced: AtomicBool::new(false),
                }),
                shutdown: CancellationToken::new(),
                supervisor: Mutex::new(None),
            }),
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Start (or restart) the supervisor.
    ///
    /// No-op while the channel is open or an open is in flight. While a
    /// reconnect is pending, the timer is cancelled and the channel is
    /// opened immediately with the attempt count kept. From `Failed`, the
    /// attempt budget starts over.
    pub async fn connect(&self) {
        if self.inner.shutdown.is_cancelled() {
            warn!("connect after shutdown ignored");
            return;
        }

        let mut slot = self.inner.supervisor.lock().await;
        let status = self.status();

        let running = slot.as_ref().is_some_and(|s| !s.handle.is_finished());
        if running
            && matches!(
                status.state,
                ConnectionState::Open | ConnectionState::Connecting | ConnectionState::Closing
            )
        {
            debug!(state = %status.state, "connect: already active");
            return;
        }

        if let Some(old) = slot.take() {
            old.cancel.cancel();
            let _ = old.handle.await;
        }

        let start_attempt = match status.state {
            ConnectionState::Failed => 0,
            _ => status.attempt,
        };
        if status.state == ConnectionState::Failed {
            info!("manual reconnect after failure, attempt budget reset");
        }

        let cancel = self.inner.shutdown.child_token();
        let link = Arc::clone(&self.inner.link);
        let handle = tokio::spawn(supervise(link, cancel.clone(), start_attempt));
        *slot = Some(Supervisor { cancel, handle });
    }

    /// Tear down: suppress reconnects, cancel any pending timer, close the
    /// channel if open, and wait for the supervisor to exit.
    pub async fn shutdown(&self) {
        self.inner.shutdown.cancel();

        let supervisor = self.inner.supervisor.lock().await.take();
        if let Some(sup) = supervisor {
            sup.cancel.cancel();
            let _ = sup.handle.await;
        }

        self.inner.link.set(ConnectionState::Disconnected, 0);
        debug!("connection manager shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    // ── State observation ────────────────────────────────────────────

    pub fn status(&self) -> ConnectionStatus {
        *self.inner.link.status.borrow()
    }

    pub fn state(&self) -> ConnectionState {
        self.status().state
    }

    /// Subscribe to status changes.
    pub fn watch(&self) -> watch::Receiver<ConnectionStatus> {
        self.inner.link.status.subscribe()
    }
}

// ── Supervisor loop ──────────────────────────────────────────────────

enum ReadEnd {
    Cancelled,
    Lost(String),
}

/// Main loop: open → read → on loss, backoff → reopen, until the budget
/// is spent or the token is cancelled.
async fn supervise(link: Arc<Link>, cancel: CancellationToken, mut attempt: u32) {
    loop {
        link.set(ConnectionState::Connecting, attempt);

        let opened = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = link.transport.open() => result,
        };

        match opened {
            Ok(mut channel) => {
                attempt = 0;
                link.set(ConnectionState::Open, 0);
                info!("push channel open");
                if !link.announced.swap(true, Ordering::SeqCst) {
                    link.notifier.info("Real-time updates connected");
                }

                match read_until_lost(&link, channel.as_mut(), &cancel).await {
                    ReadEnd::Cancelled => {
                        link.set(ConnectionState::Closing, 0);
                        if let Err(e) = channel.close().await {
                            debug!(error = %e, "close handshake failed");
                        }
                        break;
                    }
                    ReadEnd::Lost(reason) => {
                        warn!(reason = %reason, "push channel lost");
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, attempt, "push channel failed to open");
            }
        }

        if attempt >= link.policy.max_attempts {
            link.set(ConnectionState::Failed, attempt);
            error!(attempts = attempt, "push channel reconnect budget exhausted");
            link.notifier.error(format!(
                "Real-time connection lost after {attempt} reconnect attempts; reconnect manually"
            ));
            return;
        }

        attempt += 1;
        let delay = link.policy.backoff.delay(attempt);
        link.set(ConnectionState::Disconnected, attempt);
        info!(
            attempt,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "scheduling reconnect"
        );

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }
    }

    debug!("push supervisor exiting");
}

/// Read frames until the channel is lost or the token is cancelled.
/// Malformed payloads are dropped by the router and never end the read.
async fn read_until_lost(
    link: &Link,
    channel: &mut dyn PushChannel,
    cancel: &CancellationToken,
) -> ReadEnd {
    let mut heartbeat = link.heartbeat.map(|period| {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    });

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return ReadEnd::Cancelled,
            () = next_beat(heartbeat.as_mut()) => {
                if let Err(e) = channel.send_text(PING_FRAME.to_owned()).await {
                    return ReadEnd::Lost(format!("heartbeat failed: {e}"));
                }
            }
            frame = channel.next_frame() => match frame {
                Some(Ok(PushFrame::Text(text))) => {
                    link.router.dispatch_text(&text);
                }
                Some(Ok(PushFrame::Close { code, reason })) => {
                    return ReadEnd::Lost(format!("closed by server (code {code}) {reason}"));
                }
                Some(Err(e)) => return ReadEnd::Lost(e.to_string()),
                None => return ReadEnd::Lost("stream ended".into()),
            }
        }
    }
}

async fn next_beat(interval: Option<&mut Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
