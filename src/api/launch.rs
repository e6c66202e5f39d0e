//! Launching with an unbounded capacity backoff.

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::types::LaunchData;
use super::{
    InstanceId, LambdaApiError, LambdaClient, LaunchRequest, Method, RetryPolicy, Sleeper,
    Transport, unwrap_data, until_cancelled,
};

const LAUNCH_PATH: &str = "instance-operations/launch";
const OPERATION: &str = "launch";

/// Progress of a launch through its capacity backoff loop.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LaunchState {
    /// About to issue launch attempt number `attempt`.
    Attempting {
        /// One-based attempt counter.
        attempt: u32,
    },
    /// Waiting out a capacity rejection before attempt `next_attempt`.
    BackingOff {
        /// Attempt to issue once the delay elapses.
        next_attempt: u32,
    },
    /// The service accepted the launch.
    Launched(InstanceId),
}

impl<T, S> LambdaClient<T, S>
where
    T: Transport + Sync,
    S: Sleeper + Sync,
{
    /// Launches one instance, retrying for as long as the service reports
    /// insufficient capacity.
    ///
    /// Each attempt is exactly one HTTP request. Capacity rejections are
    /// followed by a constant delay; there is no attempt cap, so callers bound
    /// the loop through `cancel`.
    ///
    /// # Errors
    ///
    /// Returns [`LambdaApiError::Cancelled`] when `cancel` fires, and any
    /// non-capacity failure immediately.
    pub async fn launch(
        &self,
        request: &LaunchRequest,
        cancel: &CancellationToken,
    ) -> Result<InstanceId, LambdaApiError> {
        let payload = serde_json::to_value(request)?;
        let mut state = LaunchState::Attempting { attempt: 1 };

        loop {
            state = match state {
                LaunchState::Attempting { attempt } => {
                    self.attempt_launch(&payload, attempt, cancel).await?
                }
                LaunchState::BackingOff { next_attempt } => {
                    self.pause(self.capacity_retry_delay, cancel, OPERATION)
                        .await?;
                    LaunchState::Attempting {
                        attempt: next_attempt,
                    }
                }
                LaunchState::Launched(id) => {
                    info!(
                        instance_id = %id,
                        instance_type = %request.instance_type_name,
                        region = %request.region_name,
                        "instance launched"
                    );
                    return Ok(id);
                }
            };
        }
    }

    async fn attempt_launch(
        &self,
        payload: &Value,
        attempt: u32,
        cancel: &CancellationToken,
    ) -> Result<LaunchState, LambdaApiError> {
        let result = until_cancelled(
            cancel,
            OPERATION,
            self.execute(
                Method::Post,
                LAUNCH_PATH,
                Some(payload),
                RetryPolicy::single_attempt(),
            ),
        )
        .await;

        match result.and_then(first_instance_id) {
            Ok(id) => Ok(LaunchState::Launched(id)),
            Err(err) if err.is_capacity_error() => {
                info!(
                    attempt,
                    delay_ms = u64::try_from(self.capacity_retry_delay.as_millis())
                        .unwrap_or(u64::MAX),
                    "insufficient capacity; retrying launch"
                );
                Ok(LaunchState::BackingOff {
                    next_attempt: attempt.saturating_add(1),
                })
            }
            Err(err) => Err(err),
        }
    }
}

fn first_instance_id(value: Value) -> Result<InstanceId, LambdaApiError> {
    let data: LaunchData = unwrap_data(value)?;
    data.instance_ids
        .into_iter()
        .next()
        .ok_or_else(|| LambdaApiError::UnexpectedResponse {
            message: String::from("launch response listed no instance ids"),
        })
}
