//! Waiting for a launched instance to report a hostname.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{InstanceId, LambdaApiError, LambdaClient, Sleeper, Transport, until_cancelled};

const OPERATION: &str = "wait_for_hostname";
const MIN_POLL_STEP: Duration = Duration::from_millis(1);

impl<T, S> LambdaClient<T, S>
where
    T: Transport + Sync,
    S: Sleeper + Sync,
{
    /// Sleeps the settle period, then polls [`LambdaClient::instance_hostname`]
    /// until a hostname appears or the polling budget runs out.
    ///
    /// The service has no explicit readiness signal; a non-empty hostname is
    /// the only indication that provisioning finished. The polling budget is
    /// charged with whichever is larger: the poll intervals slept so far or
    /// the wall-clock time since polling began, so slow describe calls count
    /// against it. Each describe is dropped mid-flight when `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns [`LambdaApiError::Cancelled`] when `cancel` fires,
    /// [`LambdaApiError::HostnameTimeout`] when the budget is exhausted, and
    /// propagates describe failures.
    pub async fn wait_for_hostname(
        &self,
        id: &InstanceId,
        cancel: &CancellationToken,
    ) -> Result<String, LambdaApiError> {
        info!(
            instance_id = %id,
            settle_secs = self.wait.settle.as_secs(),
            "waiting for instance to settle"
        );
        self.pause(self.wait.settle, cancel, OPERATION).await?;

        let started = Instant::now();
        let mut slept = Duration::ZERO;
        loop {
            let snapshot = until_cancelled(cancel, OPERATION, self.instance_hostname(id)).await?;
            if let Some(hostname) = snapshot {
                info!(instance_id = %id, hostname = %hostname, "instance reachable");
                return Ok(hostname);
            }

            let waited = slept.max(started.elapsed());
            if waited >= self.wait.timeout {
                return Err(LambdaApiError::HostnameTimeout {
                    instance_id: id.to_string(),
                    waited_secs: self.wait.settle.saturating_add(waited).as_secs(),
                });
            }

            debug!(
                instance_id = %id,
                waited_secs = waited.as_secs(),
                "hostname not assigned yet"
            );
            self.pause(self.wait.poll_interval, cancel, OPERATION)
                .await?;
            slept = slept.saturating_add(self.wait.poll_interval.max(MIN_POLL_STEP));
        }
    }
}
