//! Instance queries and termination.

use serde_json::Value;
use tracing::info;

use super::types::{TerminateData, TerminateRequest};
use super::{
    Instance, InstanceId, LambdaApiError, LambdaClient, Method, Sleeper, TerminateOutcome,
    Transport, unwrap_data,
};

const INSTANCES_PATH: &str = "instances";
const TERMINATE_PATH: &str = "instance-operations/terminate";

impl<T, S> LambdaClient<T, S>
where
    T: Transport + Sync,
    S: Sleeper + Sync,
{
    /// Fetches a single instance.
    ///
    /// # Errors
    ///
    /// Returns [`LambdaApiError::Status`] with
    /// [`LambdaApiError::is_not_found`] set when the id is unknown, and
    /// propagates other failures.
    pub async fn describe_instance(&self, id: &InstanceId) -> Result<Instance, LambdaApiError> {
        if id.trim().is_empty() {
            return Err(LambdaApiError::Validation(String::from(
                "instance id must not be empty",
            )));
        }
        self.get_data(&format!("{INSTANCES_PATH}/{id}")).await
    }

    /// Returns the instance hostname, or `None` while provisioning is still
    /// under way. This is a single snapshot; it never polls.
    ///
    /// # Errors
    ///
    /// Propagates failures from [`LambdaClient::describe_instance`].
    pub async fn instance_hostname(
        &self,
        id: &InstanceId,
    ) -> Result<Option<String>, LambdaApiError> {
        let instance = self.describe_instance(id).await?;
        Ok(instance.hostname().map(str::to_owned))
    }

    /// Lists every instance owned by the credential.
    ///
    /// # Errors
    ///
    /// Propagates transport, status, and decode failures.
    pub async fn list_instances(&self) -> Result<Vec<Instance>, LambdaApiError> {
        self.get_data(INSTANCES_PATH).await
    }

    /// Requests termination of `ids` in one batched call.
    ///
    /// # Errors
    ///
    /// Returns [`LambdaApiError::Validation`] when `ids` is empty and
    /// propagates API failures.
    pub async fn terminate(&self, ids: &[InstanceId]) -> Result<Vec<Instance>, LambdaApiError> {
        if ids.is_empty() {
            return Err(LambdaApiError::Validation(String::from(
                "no instance ids given for termination",
            )));
        }

        let body: Value = serde_json::to_value(TerminateRequest { instance_ids: ids })?;
        let value = self
            .request(Method::Post, TERMINATE_PATH, Some(&body))
            .await?;
        let data: TerminateData = unwrap_data(value)?;
        info!(
            requested = ids.len(),
            terminated = data.terminated_instances.len(),
            "termination requested"
        );
        Ok(data.terminated_instances)
    }

    /// Terminates every instance owned by the credential.
    ///
    /// Returns [`TerminateOutcome::NothingToTerminate`] without a second call
    /// when the listing is empty, so callers can tell "nothing to do" apart
    /// from an executed termination.
    ///
    /// # Errors
    ///
    /// Propagates failures from the listing or the termination call.
    pub async fn terminate_all(&self) -> Result<TerminateOutcome, LambdaApiError> {
        let ids: Vec<InstanceId> = self
            .list_instances()
            .await?
            .into_iter()
            .map(|instance| instance.id)
            .collect();

        if ids.is_empty() {
            info!("no instances to terminate");
            return Ok(TerminateOutcome::NothingToTerminate);
        }

        self.terminate(&ids).await.map(TerminateOutcome::Terminated)
    }
}
