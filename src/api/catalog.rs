//! Catalog and SSH key queries.

use std::collections::BTreeMap;

use super::{InstanceTypeEntry, LambdaApiError, LambdaClient, Sleeper, SshKey, Transport};

const INSTANCE_TYPES_PATH: &str = "instance-types";
const SSH_KEYS_PATH: &str = "ssh-keys";

/// Drops catalog entries with no region reporting spare capacity.
#[must_use]
pub fn retain_available(
    mut catalog: BTreeMap<String, InstanceTypeEntry>,
) -> BTreeMap<String, InstanceTypeEntry> {
    catalog.retain(|_, entry| entry.has_capacity());
    catalog
}

impl<T, S> LambdaClient<T, S>
where
    T: Transport + Sync,
    S: Sleeper + Sync,
{
    /// Fetches the complete instance-type catalog, including types with no
    /// capacity anywhere.
    ///
    /// # Errors
    ///
    /// Propagates transport, status, and decode failures.
    pub async fn instance_type_catalog(
        &self,
    ) -> Result<BTreeMap<String, InstanceTypeEntry>, LambdaApiError> {
        self.get_data(INSTANCE_TYPES_PATH).await
    }

    /// Fetches the catalog and keeps only types that can be launched right
    /// now. The result is never cached.
    ///
    /// # Errors
    ///
    /// Propagates transport, status, and decode failures.
    pub async fn list_available_instance_types(
        &self,
    ) -> Result<BTreeMap<String, InstanceTypeEntry>, LambdaApiError> {
        self.instance_type_catalog().await.map(retain_available)
    }

    /// Lists the SSH keys registered with the account, in service order.
    ///
    /// # Errors
    ///
    /// Propagates transport, status, and decode failures.
    pub async fn list_ssh_keys(&self) -> Result<Vec<SshKey>, LambdaApiError> {
        self.get_data(SSH_KEYS_PATH).await
    }
}
