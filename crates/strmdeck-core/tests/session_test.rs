// End-to-end `Session` behavior: commands against wiremock, push events
// through a scripted transport.
#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use strmdeck_api::{Error, PushChannel, PushFrame, PushTransport};
use strmdeck_core::{
    Backoff, ConnectionState, DataKind, NewTask, OrganizeStrategy, Page, PatchOutcome,
    RetryPolicy, Session, SessionConfig, Severity, TaskStatus,
};

// ── Push transport stubs ────────────────────────────────────────────

/// Never connects; for tests that only exercise commands.
struct Offline;

#[async_trait]
impl PushTransport for Offline {
    async fn open(&self) -> Result<Box<dyn PushChannel>, Error> {
        Err(Error::WebSocketConnect("offline".into()))
    }
}

/// Accepts once and replays `frames`, then stays open.
struct Replay(Mutex<Option<VecDeque<String>>>);

#[async_trait]
impl PushTransport for Replay {
    async fn open(&self) -> Result<Box<dyn PushChannel>, Error> {
        let frames = self.0.lock().unwrap().take();
        match frames {
            Some(frames) => Ok(Box::new(ReplayChannel(frames))),
            None => Err(Error::WebSocketConnect("already replayed".into())),
        }
    }
}

struct ReplayChannel(VecDeque<String>);

#[async_trait]
impl PushChannel for ReplayChannel {
    async fn next_frame(&mut self) -> Option<Result<PushFrame, Error>> {
        match self.0.pop_front() {
            Some(text) => Some(Ok(PushFrame::Text(text))),
            None => std::future::pending().await,
        }
    }

    async fn send_text(&mut self, _text: String) -> Result<(), Error> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn config(base: &str) -> SessionConfig {
    let mut config = SessionConfig::for_server(base).unwrap();
    config.retry = RetryPolicy {
        timeout: Duration::from_millis(500),
        max_retries: 2,
        backoff: Backoff::new(Duration::from_millis(10), None),
    };
    config.heartbeat = None;
    config
}

async fn setup() -> (MockServer, Session) {
    let server = MockServer::start().await;
    let session = Session::with_transport(config(&server.uri()), Arc::new(Offline)).unwrap();
    (server, session)
}

fn task_json(id: i64, status: &str) -> Value {
    json!({
        "id": id, "name": format!("task-{id}"),
        "source_path": "/src", "destination_path": "/dst",
        "organize_strategy": "category", "status": status,
        "progress": 0.0, "total_files": 0, "processed_files": 0, "failed_files": 0,
        "created_at": format!("2025-03-0{id}T08:00:00"),
    })
}

fn scraper_json(id: i64, name: &str, priority: i32) -> Value {
    json!({
        "id": id, "name": name, "enabled": true, "api_key": null, "cookie": null,
        "priority": priority, "timeout": 30, "retry_count": 3,
        "created_at": "2025-03-01T08:00:00", "updated_at": null,
    })
}

async fn requests_to(server: &MockServer, verb: &str, route: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.method.as_str() == verb && r.url.path() == route)
        .count()
}

async fn mount_tasks(server: &MockServer, tasks: Value) {
    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tasks))
        .mount(server)
        .await;
}

// ── Tasks ───────────────────────────────────────────────────────────

#[tokio::test]
async fn created_task_appears_pending_after_reload() {
    let (server, session) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/tasks"))
        .and(body_partial_json(json!({ "name": "task-3", "organize_strategy": "category" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true, "task_id": 3 })))
        .mount(&server)
        .await;
    mount_tasks(&server, json!([task_json(3, "pending")])).await;

    let mut feed = session.notifier().subscribe();
    let id = session
        .create_task(&NewTask {
            name: "task-3".into(),
            source_path: "/src".into(),
            destination_path: "/dst".into(),
            organize_strategy: OrganizeStrategy::Category,
        })
        .await
        .unwrap();

    assert_eq!(id, 3);
    assert_eq!(session.store().task(3).unwrap().status, TaskStatus::Pending);
    let note = feed.try_recv().unwrap();
    assert_eq!(note.severity, Severity::Success);
    assert_eq!(note.text, "Task \"task-3\" created");
}

#[tokio::test]
async fn refused_cancel_leaves_mirror_alone() {
    let (server, session) = setup().await;
    mount_tasks(&server, json!([task_json(5, "completed")])).await;
    Mock::given(method("POST"))
        .and(path("/api/tasks/5/cancel"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "detail": "任务已完成，无法取消" })))
        .mount(&server)
        .await;

    session.load_full(DataKind::Tasks).await.unwrap();
    let mut feed = session.notifier().subscribe();

    let err = session.cancel_task(5).await.unwrap_err();

    assert_eq!(err.to_string(), "任务已完成，无法取消");
    assert_eq!(session.store().task(5).unwrap().status, TaskStatus::Completed);
    assert_eq!(requests_to(&server, "GET", "/api/tasks").await, 1);
    assert_eq!(requests_to(&server, "POST", "/api/tasks/5/cancel").await, 1);

    let note = feed.try_recv().unwrap();
    assert_eq!(note.severity, Severity::Error);
    assert_eq!(note.text, "任务已完成，无法取消");
    assert!(feed.try_recv().is_err());
}

#[tokio::test]
async fn pushed_cancel_survives_late_response() {
    let (server, session) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([task_json(4, "running")])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([task_json(4, "cancelled")])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/tasks/4/cancel"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "success": true }))
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&server)
        .await;

    session.load_full(DataKind::Tasks).await.unwrap();
    assert_eq!(session.store().task(4).unwrap().status, TaskStatus::Running);

    let pending = tokio::spawn({
        let session = session.clone();
        async move { session.cancel_task(4).await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let outcome = session.store().apply_patch(&strmdeck_api::models::TaskPatch {
        id: 4,
        status: Some(TaskStatus::Cancelled),
        ..Default::default()
    });
    assert_eq!(outcome, PatchOutcome::Applied);
    assert_eq!(session.store().task(4).unwrap().status, TaskStatus::Cancelled);
    assert!(!pending.is_finished());

    pending.await.unwrap().unwrap();

    assert_eq!(session.store().task(4).unwrap().status, TaskStatus::Cancelled);
}

#[tokio::test]
async fn patch_for_unseen_task_waits_for_full_load() {
    let (server, session) = setup().await;
    mount_tasks(&server, json!([task_json(1, "pending"), task_json(9, "running")])).await;

    let outcome = session.store().apply_patch(&strmdeck_api::models::TaskPatch {
        id: 9,
        progress: Some(40.0),
        ..Default::default()
    });
    assert_eq!(outcome, PatchOutcome::UnknownTask);
    assert!(session.store().task(9).is_none());

    session.load_full(DataKind::Tasks).await.unwrap();

    assert_eq!(session.store().task(9).unwrap().status, TaskStatus::Running);
    let ids: Vec<i64> = session.store().tasks_snapshot().iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![9, 1]);
}

#[tokio::test]
async fn confirmed_delete_removes_task() {
    let (server, session) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([task_json(4, "failed")])))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_tasks(&server, json!([])).await;
    Mock::given(method("DELETE"))
        .and(path("/api/tasks/4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .mount(&server)
        .await;

    session.load_full(DataKind::Tasks).await.unwrap();
    assert!(session.store().task(4).is_some());

    session.delete_task(4).await.unwrap();

    assert!(session.store().task(4).is_none());
    assert_eq!(session.store().task_count(), 0);
}

// ── Scrapers ────────────────────────────────────────────────────────

#[tokio::test]
async fn reorder_writes_only_changed_priorities() {
    let (server, session) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/scraper-configs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            scraper_json(1, "tmdb", 0),
            scraper_json(2, "douban", 1),
            scraper_json(3, "imdb", 2),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/scraper-configs/3"))
        .and(body_partial_json(json!({ "name": "imdb", "priority": 1 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/scraper-configs/2"))
        .and(body_partial_json(json!({ "name": "douban", "priority": 2 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    let updated = session
        .reorder_scrapers(&["tmdb".into(), "imdb".into()])
        .await
        .unwrap();

    assert_eq!(updated, 2);
    assert_eq!(requests_to(&server, "PUT", "/api/scraper-configs/1").await, 0);
}

#[tokio::test]
async fn scraper_display_names_are_friendly() {
    let (server, session) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/scraper-configs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            scraper_json(1, "tvdb", 1),
            scraper_json(2, "imdb", 0),
        ])))
        .mount(&server)
        .await;

    session.switch_page(Page::Scrapers).await.unwrap();

    let names: Vec<String> = session
        .store()
        .scrapers_snapshot()
        .iter()
        .map(|s| s.display_name.clone())
        .collect();
    assert_eq!(names, vec!["IMDb", "TheTVDB"]);
}

// ── Settings ────────────────────────────────────────────────────────

#[tokio::test]
async fn settings_load_tolerates_missing_proxy_manager() {
    let (server, session) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/system-configs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "key": "max_workers", "value": "4", "description": "Worker count" }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/proxy/status"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "detail": "代理管理器未初始化" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/memory/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "max_memory_mb": 1024, "warning_threshold": 0.8, "critical_threshold": 0.95
        })))
        .mount(&server)
        .await;

    session.switch_page(Page::Settings).await.unwrap();

    let settings = session.store().settings().unwrap();
    assert_eq!(settings.get_u32("max_workers"), Some(4));
    assert!(settings.proxy.is_none());
    assert_eq!(settings.memory.as_ref().unwrap().max_memory_mb, 1024);
}

#[tokio::test]
async fn uninitialized_managers_do_not_notify() {
    let (server, session) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/system-configs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/proxy/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "error": "代理管理器未初始化" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/memory/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "error": "内存管理器未初始化" })))
        .mount(&server)
        .await;

    let mut feed = session.notifier().subscribe();
    session.switch_page(Page::Settings).await.unwrap();

    let settings = session.store().settings().unwrap();
    assert!(settings.proxy.is_none());
    assert!(settings.memory.is_none());
    assert!(feed.try_recv().is_err());
    assert!(session.notifier().active().is_empty());
}

// ── Dashboard ───────────────────────────────────────────────────────

async fn mount_stats(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/stats/system"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "cpu_percent": 12.5, "memory_percent": 40.0,
            "disk_usage": {
                "/": { "total": 100, "used": 30, "free": 70, "percent": 30.0 },
                "/mnt/media": { "total": 100, "used": 90, "free": 10, "percent": 90.0 }
            },
            "network_io": { "bytes_sent": 1, "bytes_recv": 2, "packets_sent": 3, "packets_recv": 4 }
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/stats/tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tasks": { "pending": 1, "running": 2, "completed": 3, "failed": 1 },
            "files": {}
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn dashboard_refreshes_stats_until_shutdown() {
    let server = MockServer::start().await;
    let mut config = config(&server.uri());
    config.stats_refresh = Duration::from_millis(200);
    let session = Session::with_transport(config, Arc::new(Offline)).unwrap();
    mount_stats(&server).await;
    mount_tasks(&server, json!([])).await;

    session.switch_page(Page::Dashboard).await.unwrap();

    let stats = session.store().stats().unwrap();
    assert_eq!(stats.total_tasks, 7);
    assert_eq!(stats.running_tasks, 2);
    assert!((stats.disk_usage - 30.0).abs() < f64::EPSILON);

    tokio::time::sleep(Duration::from_millis(700)).await;
    let refreshed = requests_to(&server, "GET", "/api/stats/system").await;
    assert!(refreshed >= 3, "expected periodic refreshes, saw {refreshed}");

    session.shutdown().await;
    let after_shutdown = requests_to(&server, "GET", "/api/stats/system").await;
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(
        requests_to(&server, "GET", "/api/stats/system").await,
        after_shutdown
    );
}

// ── Push events ─────────────────────────────────────────────────────

#[tokio::test]
async fn push_events_update_the_mirror() {
    let server = MockServer::start().await;
    mount_tasks(&server, json!([task_json(2, "pending")])).await;

    let frames = [
        json!({ "type": "task_update", "task": { "id": 2, "status": "running", "progress": 10.0 } }),
        json!({ "type": "task_update", "data": [{ "id": 2, "progress": 55.0 }, { "id": 77, "progress": 1.0 }] }),
        json!({ "type": "stats_update", "stats": { "total_tasks": 1, "running_tasks": 1, "cpu_usage": 5.0 } }),
        json!({ "type": "log", "message": "scan started", "level": "INFO" }),
        json!({ "type": "alert", "data": { "type": "memory", "data": { "level": "warning", "message": "Memory usage high" } } }),
        json!({ "type": "mystery" }),
    ];
    let transport = Replay(Mutex::new(Some(
        frames.iter().map(Value::to_string).collect(),
    )));
    let session = Session::with_transport(config(&server.uri()), Arc::new(transport)).unwrap();
    session.load_full(DataKind::Tasks).await.unwrap();
    let mut feed = session.notifier().subscribe();

    session.connect().await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(session.connection_status().state, ConnectionState::Open);

    let task = session.store().task(2).unwrap();
    assert_eq!(task.status, TaskStatus::Running);
    assert!((task.progress - 55.0).abs() < f64::EPSILON);
    assert!(session.store().task(77).is_none());

    assert_eq!(session.store().stats().unwrap().running_tasks, 1);

    let logs = session.store().logs();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].level, "info");

    let mut texts = Vec::new();
    while let Ok(n) = feed.try_recv() {
        texts.push((n.severity, n.text));
    }
    assert!(texts.contains(&(Severity::Warning, "Memory usage high".to_owned())));

    session.shutdown().await;
    assert_eq!(session.connection_status().state, ConnectionState::Disconnected);
}
