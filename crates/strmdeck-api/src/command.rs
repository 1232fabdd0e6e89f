// Async client for the request/response command surface.
//
// Base path: the server root (routes carry their own `/api/...` prefix).
// One `execute` is one attempt, bounded by the per-call deadline. Retry
// policy lives in `strmdeck-core`.

use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::Error;
use crate::transport::TransportConfig;

// ── Request ──────────────────────────────────────────────────────────

/// A single logical command: method, route, optional query and JSON body.
///
/// Built by the constructors in [`crate::routes`]; cheap to clone so the
/// retry loop can re-issue the identical request.
#[derive(Debug, Clone)]
pub struct CommandRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    body: Option<Value>,
}

impl CommandRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body. Encoding happens once, up front.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, Error> {
        let value = serde_json::to_value(body).map_err(|e| Error::InvalidBody(e.to_string()))?;
        self.body = Some(value);
        Ok(self)
    }

    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// `"POST /api/tasks"`, used as a log field.
    pub fn endpoint(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

// ── Error response shapes ────────────────────────────────────────────

#[derive(serde::Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    detail: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    message: Option<String>,
}

struct ErrorParts {
    message: String,
    code: Option<String>,
    details: Option<Value>,
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the command surface.
pub struct CommandClient {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl CommandClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build a client for `base_url` with a per-call deadline.
    pub fn new(
        base_url: &str,
        transport: &TransportConfig,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::from_reqwest(base_url, http, timeout)
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn from_reqwest(
        base_url: &str,
        http: reqwest::Client,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self {
            http,
            base_url,
            timeout,
        })
    }

    /// Force a trailing slash so relative joins keep any path prefix.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{path}/"));
        Ok(url)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    // ── URL builder ──────────────────────────────────────────────────

    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    // ── Execution ────────────────────────────────────────────────────

    /// Issue one attempt and return the raw success body.
    ///
    /// The whole exchange (send and body read) shares one deadline; on
    /// expiry the in-flight request is dropped and `Error::Timeout` is
    /// returned. Failure statuses and success bodies carrying a top-level
    /// `error` both become `Error::Api`.
    pub async fn execute(&self, request: &CommandRequest) -> Result<String, Error> {
        let url = self.url(request.path())?;
        debug!(method = %request.method(), %url, "command call");

        let mut builder = self.http.request(request.method().clone(), url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        let exchange = async {
            let resp = builder.send().await?;
            let status = resp.status();
            let body = resp.text().await?;
            Ok::<_, Error>((status, body))
        };

        let (status, body) = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| Error::Timeout {
                timeout: self.timeout,
            })??;

        if !status.is_success() {
            return Err(parse_error(status, &body));
        }
        if let Some(err) = embedded_error(status, &body) {
            return Err(err);
        }
        Ok(body)
    }

    /// [`execute`](Self::execute) and decode the body as `T`.
    pub async fn execute_json<T: DeserializeOwned>(
        &self,
        request: &CommandRequest,
    ) -> Result<T, Error> {
        let body = self.execute(request).await?;
        decode(&body)
    }
}

/// Decode a success body. An empty body decodes as JSON `null`.
pub fn decode<T: DeserializeOwned>(body: &str) -> Result<T, Error> {
    let text = if body.trim().is_empty() { "null" } else { body };
    serde_json::from_str(text).map_err(|e| Error::deserialization(&e, body))
}

// ── Error parsing ────────────────────────────────────────────────────

fn parse_error(status: StatusCode, raw: &str) -> Error {
    let parts = serde_json::from_str::<ErrorResponse>(raw)
        .ok()
        .and_then(describe)
        .unwrap_or_else(|| ErrorParts {
            message: status_text(status),
            code: None,
            details: None,
        });

    Error::Api {
        status: status.as_u16(),
        message: parts.message,
        code: parts.code,
        details: parts.details,
    }
}

/// A 2xx answer whose body is an object with a non-null `error` field.
fn embedded_error(status: StatusCode, raw: &str) -> Option<Error> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let error = value.as_object()?.get("error")?;
    let parts = error_field(error)?;
    Some(Error::Api {
        status: status.as_u16(),
        message: parts.message,
        code: parts.code,
        details: parts.details,
    })
}

fn describe(body: ErrorResponse) -> Option<ErrorParts> {
    if let Some(message) = body.detail.as_ref().and_then(detail_text) {
        return Some(ErrorParts {
            message,
            code: None,
            details: body.detail,
        });
    }
    if let Some(parts) = body.error.as_ref().and_then(error_field) {
        return Some(parts);
    }
    body.message.map(|message| ErrorParts {
        message,
        code: None,
        details: None,
    })
}

/// `{detail: "..."}` or a validation list `{detail: [{loc, msg, type}]}`.
fn detail_text(detail: &Value) -> Option<String> {
    match detail {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let msgs: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str).or(item.as_str()))
                .collect();
            (!msgs.is_empty()).then(|| msgs.join("; "))
        }
        other => Some(other.to_string()),
    }
}

/// `{error: "..."}` or `{error: {code, message, details}}`.
fn error_field(error: &Value) -> Option<ErrorParts> {
    match error {
        Value::String(s) => Some(ErrorParts {
            message: s.clone(),
            code: None,
            details: None,
        }),
        Value::Object(map) => {
            let message = map.get("message").and_then(Value::as_str)?.to_owned();
            let code = map
                .get("code")
                .filter(|c| !c.is_null())
                .map(|c| c.as_str().map_or_else(|| c.to_string(), str::to_owned));
            Some(ErrorParts {
                message,
                code,
                details: map.get("details").cloned(),
            })
        }
        _ => None,
    }
}

fn status_text(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map_or_else(|| status.as_str().to_owned(), str::to_owned)
}
