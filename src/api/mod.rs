//! Lambda Cloud API client.
//!
//! [`LambdaClient`] issues every call through [`LambdaClient::execute`], which
//! applies a constant-delay retry budget. Launches bypass that budget and run
//! their own unbounded capacity backoff; see [`LambdaClient::launch`].

mod catalog;
mod error;
mod instances;
mod launch;
mod sleep;
mod transport;
mod types;
mod wait;

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::LambdaConfig;

pub use catalog::retain_available;
pub use error::LambdaApiError;
pub use launch::LaunchState;
pub use sleep::{SleepFuture, Sleeper, TokioSleeper};
pub use transport::{
    ApiRequest, ApiResponse, HttpTransport, Method, Transport, TransportError, TransportFuture,
};
pub use types::{
    INSTANCE_NAME_PREFIX, Instance, InstanceId, InstanceState, InstanceTypeEntry,
    InstanceTypeInfo, InstanceTypeName, InstanceTypeSpecs, LaunchRequest, Region, RegionName,
    SshKey, SshKeyName, TerminateOutcome,
};

use types::Envelope;

const DEFAULT_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);
const DEFAULT_CAPACITY_RETRY_DELAY: Duration = Duration::from_secs(1);
const DEFAULT_SETTLE: Duration = Duration::from_secs(30);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(600);

/// Attempt budget for a generic API call. The delay between attempts is
/// constant.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero behaves like one.
    pub max_attempts: u32,
    /// Pause between consecutive attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy.
    #[must_use]
    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// A policy that never retries.
    #[must_use]
    pub const fn single_attempt() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ATTEMPTS, DEFAULT_RETRY_DELAY)
    }
}

/// How long to wait for a freshly launched instance to report a hostname.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct WaitPolicy {
    /// Fixed pause before the first hostname query.
    pub settle: Duration,
    /// Pause between hostname queries.
    pub poll_interval: Duration,
    /// Polling budget after the settle period; zero queries exactly once.
    pub timeout: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            settle: DEFAULT_SETTLE,
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_WAIT_TIMEOUT,
        }
    }
}

/// Client for the Lambda Cloud instance API.
///
/// The client is stateless apart from its immutable credential and policies;
/// every operation is a fresh snapshot of the remote service.
#[derive(Clone, Debug)]
pub struct LambdaClient<T = HttpTransport, S = TokioSleeper> {
    transport: T,
    sleeper: S,
    retry: RetryPolicy,
    capacity_retry_delay: Duration,
    wait: WaitPolicy,
}

impl LambdaClient {
    /// Constructs a client that talks to the configured endpoint over HTTPS.
    ///
    /// # Errors
    ///
    /// Returns [`LambdaApiError::Config`] when the configuration fails
    /// validation (for example, the API key is missing) and
    /// [`LambdaApiError::Transport`] when the HTTP client cannot be built.
    pub fn new(config: &LambdaConfig) -> Result<Self, LambdaApiError> {
        config.validate()?;
        let transport = HttpTransport::new(
            config.base_url.as_str(),
            config.api_key.as_str(),
            config.http_timeout(),
        )?;
        Ok(Self::from_parts(transport, TokioSleeper)
            .with_retry_policy(config.retry_policy())
            .with_capacity_retry_delay(config.capacity_retry_delay())
            .with_wait_policy(config.wait_policy()))
    }
}

impl<T, S> LambdaClient<T, S>
where
    T: Transport + Sync,
    S: Sleeper + Sync,
{
    /// Assembles a client from an arbitrary transport and sleeper using the
    /// default policies.
    #[must_use]
    pub fn from_parts(transport: T, sleeper: S) -> Self {
        Self {
            transport,
            sleeper,
            retry: RetryPolicy::default(),
            capacity_retry_delay: DEFAULT_CAPACITY_RETRY_DELAY,
            wait: WaitPolicy::default(),
        }
    }

    /// Overrides the retry policy for generic calls.
    #[must_use]
    pub const fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Overrides the delay between capacity-rejected launch attempts.
    #[must_use]
    pub const fn with_capacity_retry_delay(mut self, delay: Duration) -> Self {
        self.capacity_retry_delay = delay;
        self
    }

    /// Overrides the hostname wait policy.
    #[must_use]
    pub const fn with_wait_policy(mut self, wait: WaitPolicy) -> Self {
        self.wait = wait;
        self
    }

    /// Retry policy applied by [`LambdaClient::request`].
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Hostname wait policy.
    #[must_use]
    pub const fn wait_policy(&self) -> WaitPolicy {
        self.wait
    }

    /// Issues `method path` with the configured retry policy and returns the
    /// parsed JSON body.
    ///
    /// # Errors
    ///
    /// See [`LambdaClient::execute`].
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, LambdaApiError> {
        self.execute(method, path, body, self.retry).await
    }

    /// Issues an authenticated call, retrying network failures and error
    /// statuses up to `policy.max_attempts` times with a constant delay.
    ///
    /// # Errors
    ///
    /// Returns the last [`LambdaApiError::Transport`] or
    /// [`LambdaApiError::Status`] once attempts are exhausted, or
    /// [`LambdaApiError::Decode`] immediately when a success body is not JSON.
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        policy: RetryPolicy,
    ) -> Result<Value, LambdaApiError> {
        let request = ApiRequest::new(method, path, body.cloned());
        let max_attempts = policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            debug!(%method, path, attempt, "issuing API call");
            let failure = match self.transport.send(&request).await {
                Ok(response) if response.is_success() => {
                    return serde_json::from_str(&response.body).map_err(LambdaApiError::from);
                }
                Ok(response) => LambdaApiError::from_status(response.status, &response.body),
                Err(err) => LambdaApiError::from(err),
            };

            if attempt >= max_attempts {
                return Err(failure);
            }

            warn!(
                %method,
                path,
                attempt,
                max_attempts,
                delay_ms = u64::try_from(policy.delay.as_millis()).unwrap_or(u64::MAX),
                error = %failure,
                "request failed; retrying"
            );
            self.sleeper.sleep(policy.delay).await;
            attempt += 1;
        }
    }

    async fn get_data<D: DeserializeOwned>(&self, path: &str) -> Result<D, LambdaApiError> {
        let value = self.request(Method::Get, path, None).await?;
        unwrap_data(value)
    }

    async fn pause(
        &self,
        duration: Duration,
        cancel: &CancellationToken,
        operation: &str,
    ) -> Result<(), LambdaApiError> {
        if cancel.is_cancelled() {
            return Err(LambdaApiError::cancelled(operation));
        }
        if duration.is_zero() {
            return Ok(());
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(LambdaApiError::cancelled(operation)),
            () = self.sleeper.sleep(duration) => Ok(()),
        }
    }
}

/// Drives `call` to completion unless `cancel` fires first, in which case
/// the call is dropped mid-flight.
async fn until_cancelled<V, F>(
    cancel: &CancellationToken,
    operation: &str,
    call: F,
) -> Result<V, LambdaApiError>
where
    F: Future<Output = Result<V, LambdaApiError>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(LambdaApiError::cancelled(operation)),
        result = call => result,
    }
}

fn unwrap_data<D: DeserializeOwned>(value: Value) -> Result<D, LambdaApiError> {
    let envelope: Envelope<D> = serde_json::from_value(value)?;
    Ok(envelope.data)
}

#[cfg(test)]
mod tests;
