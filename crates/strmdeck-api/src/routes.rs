// Route constructors for every logical operation on the command surface.

use crate::Error;
use crate::command::CommandRequest;
use crate::models::{
    LogQuery, MemoryConfig, NewTask, ProxyConfig, ScraperConfigUpdate, SystemConfigUpdate,
    TaskAction,
};

// ── Health ───────────────────────────────────────────────────────────

pub fn health() -> CommandRequest {
    CommandRequest::get("/api/health")
}

// ── Tasks ────────────────────────────────────────────────────────────

pub fn list_tasks() -> CommandRequest {
    CommandRequest::get("/api/tasks")
}

pub fn create_task(task: &NewTask) -> Result<CommandRequest, Error> {
    CommandRequest::post("/api/tasks").json(task)
}

/// `POST /api/tasks/{id}/{start|pause|cancel|retry}`
pub fn task_action(id: i64, action: TaskAction) -> CommandRequest {
    CommandRequest::post(format!("/api/tasks/{id}/{action}"))
}

pub fn delete_task(id: i64) -> CommandRequest {
    CommandRequest::delete(format!("/api/tasks/{id}"))
}

// ── Scrapers ─────────────────────────────────────────────────────────

pub fn list_scrapers() -> CommandRequest {
    CommandRequest::get("/api/scraper-configs")
}

pub fn update_scraper(id: i64, update: &ScraperConfigUpdate) -> Result<CommandRequest, Error> {
    CommandRequest::put(format!("/api/scraper-configs/{id}")).json(update)
}

pub fn test_scraper(id: i64) -> CommandRequest {
    CommandRequest::post(format!("/api/scraper-configs/{id}/test"))
}

// ── Settings ─────────────────────────────────────────────────────────

pub fn list_system_configs() -> CommandRequest {
    CommandRequest::get("/api/system-configs")
}

pub fn update_system_config(update: &SystemConfigUpdate) -> Result<CommandRequest, Error> {
    CommandRequest::put("/api/system-configs").json(update)
}

pub fn proxy_status() -> CommandRequest {
    CommandRequest::get("/api/proxy/status")
}

pub fn update_proxy(config: &ProxyConfig) -> Result<CommandRequest, Error> {
    CommandRequest::put("/api/proxy/config").json(config)
}

pub fn test_proxy() -> CommandRequest {
    CommandRequest::post("/api/proxy/test")
}

pub fn memory_status() -> CommandRequest {
    CommandRequest::get("/api/memory/status")
}

pub fn update_memory(config: &MemoryConfig) -> Result<CommandRequest, Error> {
    CommandRequest::put("/api/memory/config").json(config)
}

// ── Stats ────────────────────────────────────────────────────────────

pub fn system_stats() -> CommandRequest {
    CommandRequest::get("/api/stats/system")
}

pub fn task_stats() -> CommandRequest {
    CommandRequest::get("/api/stats/tasks")
}

// ── Logs ─────────────────────────────────────────────────────────────

pub fn logs(query: &LogQuery) -> CommandRequest {
    let mut req = CommandRequest::get("/api/logs");
    if let Some(level) = &query.level {
        req = req.query("level", level);
    }
    if let Some(limit) = query.limit {
        req = req.query("limit", limit);
    }
    req
}

pub fn clear_logs() -> CommandRequest {
    CommandRequest::delete("/api/logs")
}
