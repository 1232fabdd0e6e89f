// ── Request client ──
//
// Retrying wrapper around `CommandClient`. Only deadline expiry and
// failures that never reached the service are retried; everything the
// service answers is final. Terminal failures are surfaced once through
// the notifier before being returned.

use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};

use strmdeck_api::{CommandClient, CommandRequest, TransportConfig};

use crate::config::{RetryPolicy, SessionConfig};
use crate::error::CoreError;
use crate::notify::Notifier;

pub struct RequestClient {
    client: CommandClient,
    policy: RetryPolicy,
    notifier: Notifier,
}

impl RequestClient {
    pub fn new(client: CommandClient, policy: RetryPolicy, notifier: Notifier) -> Self {
        Self {
            client,
            policy,
            notifier,
        }
    }

    /// Build the HTTP client from session settings.
    pub fn from_config(config: &SessionConfig, notifier: Notifier) -> Result<Self, CoreError> {
        let transport = TransportConfig {
            accept_invalid_certs: config.insecure,
        };
        let client = CommandClient::new(config.server.as_str(), &transport, config.retry.timeout)?;
        Ok(Self::new(client, config.retry, notifier))
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `request` with retries and decode the answer as `T`.
    pub async fn call<T: DeserializeOwned>(&self, request: &CommandRequest) -> Result<T, CoreError> {
        self.call_quiet(request)
            .await
            .inspect_err(|err| self.surface(err))
    }

    /// Like [`call`](Self::call), but a terminal failure is only returned,
    /// never surfaced. For optional data whose absence is not an error.
    pub async fn call_quiet<T: DeserializeOwned>(
        &self,
        request: &CommandRequest,
    ) -> Result<T, CoreError> {
        let body = self.execute(request).await?;
        strmdeck_api::command::decode(&body).map_err(|e| {
            let err = CoreError::from(e);
            error!(endpoint = %request.endpoint(), error = %err, "response did not match schema");
            err
        })
    }

    /// Run `request` with retries and return the raw success body.
    pub async fn call_raw(&self, request: &CommandRequest) -> Result<String, CoreError> {
        self.execute(request)
            .await
            .inspect_err(|err| self.surface(err))
    }

    async fn execute(&self, request: &CommandRequest) -> Result<String, CoreError> {
        let endpoint = request.endpoint();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            match self.client.execute(request).await {
                Ok(body) => {
                    debug!(endpoint = %endpoint, attempt, "command succeeded");
                    return Ok(body);
                }
                Err(e) if e.is_retryable() && attempt <= self.policy.max_retries => {
                    let delay = self.policy.backoff.delay(attempt);
                    warn!(
                        endpoint = %endpoint,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "command failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    let err = CoreError::from(e).after_attempts(attempt);
                    error!(endpoint = %endpoint, attempt, status = ?status_of(&err), error = %err, "command failed");
                    return Err(err);
                }
            }
        }
    }

    /// One user-visible notification per terminal failure. Application
    /// errors carry the service's detail text unchanged.
    fn surface(&self, err: &CoreError) {
        self.notifier.error(err.to_string());
    }
}

fn status_of(err: &CoreError) -> Option<u16> {
    match err {
        CoreError::Application { status, .. } => Some(*status),
        _ => None,
    }
}
