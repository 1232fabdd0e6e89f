// ── Session facade ──
//
// Full lifecycle management for one connection to the service. Wires the
// request client, push channel, router, store, and notifier together and
// exposes every user-facing operation. Cheaply cloneable via `Arc<SessionInner>`.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use strmdeck_api::models::{
    ActionAck, CreateTaskAck, HealthStatus, LogQuery, LogsResponse, MemoryConfig, MemoryStatus,
    NewTask, ProbeResult, ProxyConfig, ProxyStatus, ScraperConfigRecord, ScraperConfigUpdate,
    SystemConfigEntry, SystemConfigUpdate, SystemStats, TaskAction, TaskRecord, TaskStats,
};
use strmdeck_api::{EventKind, PushEvent, PushTransport, WsTransport, routes};

use crate::config::SessionConfig;
use crate::connection::{ConnectionManager, ConnectionStatus};
use crate::error::CoreError;
use crate::model::{DataKind, LogEntry, Page, ScraperConfig, Settings, Stats, Task};
use crate::notify::Notifier;
use crate::request::RequestClient;
use crate::router::EventRouter;
use crate::store::StateStore;

// ── Session ──────────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<SessionInner>`. Construct, `start()` to
/// open the push channel, then switch pages or call operations.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    config: SessionConfig,
    store: Arc<StateStore>,
    notifier: Notifier,
    requests: RequestClient,
    connection: ConnectionManager,
    page: watch::Sender<Option<Page>>,
    cancel: CancellationToken,
    /// Dashboard stats timer, registered on the first dashboard visit.
    stats_timer: Mutex<Option<JoinHandle<()>>>,
}

impl Session {
    /// Create a session that opens its push channel over WebSocket.
    pub fn new(config: SessionConfig) -> Result<Self, CoreError> {
        let transport = Arc::new(WsTransport::new(config.push_url()?));
        Self::with_transport(config, transport)
    }

    /// Create a session over a caller-supplied push transport.
    pub fn with_transport(
        config: SessionConfig,
        transport: Arc<dyn PushTransport>,
    ) -> Result<Self, CoreError> {
        let notifier = Notifier::new(config.notification_ttl);
        let store = Arc::new(StateStore::new(config.log_capacity));
        let requests = RequestClient::from_config(&config, notifier.clone())?;

        let router = Arc::new(build_router(&store, &notifier));
        let connection = ConnectionManager::new(
            transport,
            config.reconnect,
            config.heartbeat,
            router,
            notifier.clone(),
        );
        let (page, _) = watch::channel(None);

        Ok(Self {
            inner: Arc::new(SessionInner {
                config,
                store,
                notifier,
                requests,
                connection,
                page,
                cancel: CancellationToken::new(),
                stats_timer: Mutex::new(None),
            }),
        })
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Open the push channel. Also the manual reconnect after `Failed`.
    pub async fn connect(&self) {
        self.inner.connection.connect().await;
    }

    /// Tear down: stop the stats timer, suppress reconnects, and close
    /// the push channel.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        if let Some(handle) = self.inner.stats_timer.lock().await.take() {
            // A refresh may be mid-retry; do not wait out its backoff.
            handle.abort();
            let _ = handle.await;
        }
        self.inner.connection.shutdown().await;

        debug!("session shut down");
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.inner.store
    }

    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.inner.connection
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.inner.connection.status()
    }

    pub fn current_page(&self) -> Option<Page> {
        *self.inner.page.borrow()
    }

    pub fn watch_page(&self) -> watch::Receiver<Option<Page>> {
        self.inner.page.subscribe()
    }

    // ── Pages and loading ────────────────────────────────────────────

    /// Show `page`: load every kind it displays. The dashboard also
    /// starts the periodic stats refresh the first time it is shown.
    ///
    /// All kinds are attempted; the first failure is returned.
    pub async fn switch_page(&self, page: Page) -> Result<(), CoreError> {
        self.inner.page.send_replace(Some(page));
        debug!(page = %page, "switching page");

        if page == Page::Dashboard {
            self.ensure_stats_timer().await;
        }

        let mut first_err = None;
        for &kind in page.kinds() {
            if let Err(e) = self.load_full(kind).await {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Fetch the authoritative list for `kind` and replace it in the store.
    pub async fn load_full(&self, kind: DataKind) -> Result<(), CoreError> {
        let store = &self.inner.store;
        match kind {
            DataKind::Tasks => {
                let records: Vec<TaskRecord> = self.call(&routes::list_tasks()).await?;
                store.replace_tasks(records.into_iter().map(Task::from).collect());
            }
            DataKind::Scrapers => {
                let records: Vec<ScraperConfigRecord> =
                    self.call(&routes::list_scrapers()).await?;
                store.replace_scrapers(records.into_iter().map(ScraperConfig::from).collect());
            }
            DataKind::Settings => {
                let entries: Vec<SystemConfigEntry> =
                    self.call(&routes::list_system_configs()).await?;
                // Either manager may be absent on the service; that part
                // of the settings is then left empty without a notification.
                let proxy_req = routes::proxy_status();
                let memory_req = routes::memory_status();
                let (proxy, memory) = tokio::join!(
                    self.inner.requests.call_quiet::<ProxyStatus>(&proxy_req),
                    self.inner.requests.call_quiet::<MemoryStatus>(&memory_req),
                );
                let proxy = proxy
                    .inspect_err(|e| debug!(error = %e, "proxy status unavailable"))
                    .ok();
                let memory = memory
                    .inspect_err(|e| debug!(error = %e, "memory status unavailable"))
                    .ok();
                store.replace_settings(Settings::from_parts(entries, proxy, memory));
            }
            DataKind::Stats => {
                let system_req = routes::system_stats();
                let tasks_req = routes::task_stats();
                let (system, tasks) = tokio::try_join!(
                    self.call::<SystemStats>(&system_req),
                    self.call::<TaskStats>(&tasks_req),
                )?;
                store.apply_stats(Stats::from_parts(&system, &tasks));
                store.mark_loaded(DataKind::Stats);
            }
            DataKind::Logs => {
                let query = LogQuery {
                    level: None,
                    limit: Some(u32::try_from(store.log_capacity()).unwrap_or(u32::MAX)),
                };
                let logs: LogsResponse = self.call(&routes::logs(&query)).await?;
                store.replace_logs(
                    logs.into_records()
                        .into_iter()
                        .map(LogEntry::from)
                        .collect(),
                );
            }
        }
        debug!(kind = %kind, "full load applied");
        Ok(())
    }

    /// Reload every kind the current page displays.
    pub async fn refresh(&self) -> Result<(), CoreError> {
        let Some(page) = self.current_page() else {
            return Ok(());
        };
        let mut first_err = None;
        for &kind in page.kinds() {
            if let Err(e) = self.load_full(kind).await {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    pub async fn health(&self) -> Result<HealthStatus, CoreError> {
        self.call(&routes::health()).await
    }

    // ── Tasks ────────────────────────────────────────────────────────

    /// Create a task. Returns the id the service assigned.
    pub async fn create_task(&self, task: &NewTask) -> Result<i64, CoreError> {
        let ack: CreateTaskAck = self.call(&routes::create_task(task)?).await?;
        info!(task_id = ack.task_id, name = %task.name, "task created");
        self.inner
            .notifier
            .success(format!("Task \"{}\" created", task.name));
        self.reload(DataKind::Tasks).await;
        Ok(ack.task_id)
    }

    pub async fn start_task(&self, id: i64) -> Result<ActionAck, CoreError> {
        self.task_action(id, TaskAction::Start).await
    }

    pub async fn pause_task(&self, id: i64) -> Result<ActionAck, CoreError> {
        self.task_action(id, TaskAction::Pause).await
    }

    pub async fn cancel_task(&self, id: i64) -> Result<ActionAck, CoreError> {
        self.task_action(id, TaskAction::Cancel).await
    }

    pub async fn retry_task(&self, id: i64) -> Result<ActionAck, CoreError> {
        self.task_action(id, TaskAction::Retry).await
    }

    /// Run a lifecycle action, then reload tasks. A service refusal (for
    /// example cancelling a task that already finished) is returned with
    /// its detail text and the mirror is left alone.
    pub async fn task_action(&self, id: i64, action: TaskAction) -> Result<ActionAck, CoreError> {
        let ack: ActionAck = self.call(&routes::task_action(id, action)).await?;
        info!(task_id = id, action = %action, "task action accepted");
        self.inner.notifier.success(action_message(id, action));
        self.reload(DataKind::Tasks).await;
        Ok(ack)
    }

    /// Delete a task. The mirror drops it once the service confirms.
    pub async fn delete_task(&self, id: i64) -> Result<(), CoreError> {
        self.inner
            .requests
            .call_raw(&routes::delete_task(id))
            .await?;
        self.inner.store.remove_task(id);
        info!(task_id = id, "task deleted");
        self.inner.notifier.success(format!("Task {id} deleted"));
        self.reload(DataKind::Tasks).await;
        Ok(())
    }

    // ── Scrapers ─────────────────────────────────────────────────────

    /// Replace a scraper's configuration, then reload scrapers.
    pub async fn update_scraper(
        &self,
        id: i64,
        update: &ScraperConfigUpdate,
    ) -> Result<(), CoreError> {
        self.inner
            .requests
            .call_raw(&routes::update_scraper(id, update)?)
            .await?;
        info!(scraper_id = id, name = %update.name, "scraper updated");
        self.inner
            .notifier
            .success(format!("{} updated", crate::model::display_name(&update.name)));
        self.reload(DataKind::Scrapers).await;
        Ok(())
    }

    /// Probe a scraper's upstream. A failed probe is a warning, not an error.
    pub async fn test_scraper(&self, id: i64) -> Result<ProbeResult, CoreError> {
        let result: ProbeResult = self.call(&routes::test_scraper(id)).await?;
        let label = self
            .inner
            .store
            .scraper(id)
            .map_or_else(|| format!("Scraper {id}"), |s| s.display_name.clone());
        self.report_probe(&label, &result);
        Ok(result)
    }

    /// Reorder scrapers: `names` run first, in the given order, then the
    /// rest in their current order. Priorities are reassigned as `0..n`
    /// and only scrapers whose priority changed are written back.
    ///
    /// Returns the number of scrapers updated.
    pub async fn reorder_scrapers(&self, names: &[String]) -> Result<usize, CoreError> {
        if self.inner.store.scraper_count() == 0 {
            self.load_full(DataKind::Scrapers).await?;
        }

        let plan = reorder_plan(&self.inner.store.scrapers_snapshot(), names)?;
        let mut updated = 0;
        for (scraper, priority) in plan {
            if scraper.priority == priority {
                continue;
            }
            let mut update = scraper.to_update();
            update.priority = priority;
            self.inner
                .requests
                .call_raw(&routes::update_scraper(scraper.id, &update)?)
                .await?;
            updated += 1;
        }

        info!(updated, "scrapers reordered");
        self.inner.notifier.success("Scraper order saved");
        self.reload(DataKind::Scrapers).await;
        Ok(updated)
    }

    // ── Settings ─────────────────────────────────────────────────────

    pub async fn update_setting(
        &self,
        key: &str,
        value: &str,
        description: Option<String>,
    ) -> Result<(), CoreError> {
        let update = SystemConfigUpdate {
            key: key.to_owned(),
            value: value.to_owned(),
            description,
        };
        self.inner
            .requests
            .call_raw(&routes::update_system_config(&update)?)
            .await?;
        info!(key, "setting updated");
        self.inner.notifier.success(format!("Setting {key} saved"));
        self.reload(DataKind::Settings).await;
        Ok(())
    }

    pub async fn update_proxy(&self, config: &ProxyConfig) -> Result<(), CoreError> {
        self.inner
            .requests
            .call_raw(&routes::update_proxy(config)?)
            .await?;
        self.inner.notifier.success("Proxy configuration saved");
        self.reload(DataKind::Settings).await;
        Ok(())
    }

    pub async fn test_proxy(&self) -> Result<ProbeResult, CoreError> {
        let result: ProbeResult = self.call(&routes::test_proxy()).await?;
        self.report_probe("Proxy", &result);
        Ok(result)
    }

    pub async fn update_memory(&self, config: &MemoryConfig) -> Result<(), CoreError> {
        self.inner
            .requests
            .call_raw(&routes::update_memory(config)?)
            .await?;
        self.inner.notifier.success("Memory limits saved");
        self.reload(DataKind::Settings).await;
        Ok(())
    }

    // ── Logs ─────────────────────────────────────────────────────────

    /// Query the service's log history without touching the mirror.
    pub async fn fetch_logs(&self, query: &LogQuery) -> Result<Vec<LogEntry>, CoreError> {
        let logs: LogsResponse = self.call(&routes::logs(query)).await?;
        Ok(logs
            .into_records()
            .into_iter()
            .map(LogEntry::from)
            .collect())
    }

    pub async fn clear_logs(&self) -> Result<(), CoreError> {
        self.inner.requests.call_raw(&routes::clear_logs()).await?;
        self.inner.store.clear_logs();
        self.inner.notifier.success("Logs cleared");
        Ok(())
    }

    // ── Private helpers ──────────────────────────────────────────────

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        request: &strmdeck_api::CommandRequest,
    ) -> Result<T, CoreError> {
        self.inner.requests.call(request).await
    }

    /// Reload after a successful mutation. Failures were already surfaced
    /// by the request client; the mutation itself stands.
    async fn reload(&self, kind: DataKind) {
        if let Err(e) = self.load_full(kind).await {
            warn!(kind = %kind, error = %e, "reload after mutation failed");
        }
    }

    fn report_probe(&self, label: &str, result: &ProbeResult) {
        let detail = result.message.as_deref().unwrap_or_default();
        if result.success {
            self.inner
                .notifier
                .success(format!("{label} test passed {detail}").trim_end().to_owned());
        } else {
            self.inner
                .notifier
                .warning(format!("{label} test failed {detail}").trim_end().to_owned());
        }
    }

    async fn ensure_stats_timer(&self) {
        if self.inner.cancel.is_cancelled() {
            return;
        }
        let mut slot = self.inner.stats_timer.lock().await;
        if slot.is_some() {
            return;
        }
        let period = self.inner.config.stats_refresh;
        debug!(period_secs = period.as_secs(), "starting dashboard stats refresh");
        *slot = Some(tokio::spawn(stats_refresh_task(
            self.clone(),
            period,
            self.inner.cancel.child_token(),
        )));
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("server", &self.inner.config.server.as_str())
            .field("connection", &self.inner.connection.status())
            .field("page", &self.current_page())
            .finish_non_exhaustive()
    }
}

// ── Push wiring ──────────────────────────────────────────────────────

fn build_router(store: &Arc<StateStore>, notifier: &Notifier) -> EventRouter {
    let mut router = EventRouter::new();

    let s = Arc::clone(store);
    router.on(EventKind::Log, move |event| {
        if let PushEvent::Log(record) = event {
            s.apply_log(LogEntry::from(record.clone()));
        }
    });

    let s = Arc::clone(store);
    router.on(EventKind::TaskUpdate, move |event| {
        if let PushEvent::TaskUpdate(patches) = event {
            s.apply_task_update(patches);
        }
    });

    let s = Arc::clone(store);
    router.on(EventKind::StatsUpdate, move |event| {
        if let PushEvent::StatsUpdate(payload) = event {
            s.apply_stats(Stats::from(payload.clone()));
        }
    });

    let n = notifier.clone();
    router.on(EventKind::Alert, move |event| {
        if let PushEvent::Alert(alert) = event {
            n.warning(alert.text());
        }
    });

    router
}

// ── Background tasks ─────────────────────────────────────────────────

/// Periodically reload dashboard stats until cancelled.
async fn stats_refresh_task(
    session: Session,
    period: std::time::Duration,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                if let Err(e) = session.load_full(DataKind::Stats).await {
                    warn!(error = %e, "periodic stats refresh failed");
                }
            }
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

fn action_message(id: i64, action: TaskAction) -> String {
    match action {
        TaskAction::Start => format!("Task {id} started"),
        TaskAction::Pause => format!("Task {id} paused"),
        TaskAction::Cancel => format!("Task {id} cancelled"),
        TaskAction::Retry => format!("Task {id} queued for retry"),
    }
}

/// Pair each scraper with its new priority.
fn reorder_plan(
    current: &[Arc<ScraperConfig>],
    names: &[String],
) -> Result<Vec<(Arc<ScraperConfig>, i32)>, CoreError> {
    let mut seen = HashSet::new();
    let mut ordered = Vec::with_capacity(current.len());

    for name in names {
        let scraper = current
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| CoreError::NotFound {
                kind: "scraper".into(),
                name: name.clone(),
            })?;
        if seen.insert(scraper.id) {
            ordered.push(Arc::clone(scraper));
        }
    }
    ordered.extend(
        current
            .iter()
            .filter(|s| !seen.contains(&s.id))
            .cloned(),
    );

    Ok(ordered
        .into_iter()
        .zip(0..)
        .collect())
}
