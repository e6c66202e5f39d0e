//! Wire models for the Lambda Cloud API and newtypes for its identifiers.

use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::LambdaApiError;

macro_rules! newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a raw identifier.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrows the raw identifier.
            #[must_use]
            pub const fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }

        impl Deref for $name {
            type Target = str;
            fn deref(&self) -> &Self::Target {
                self.as_str()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

newtype!(
    /// Identifier the service assigns to an instance at launch.
    InstanceId
);
newtype!(
    /// Region name such as `us-east-1`.
    RegionName
);
newtype!(
    /// Instance type name such as `gpu_1x_a100`.
    InstanceTypeName
);
newtype!(
    /// Name of an SSH key registered with the account.
    SshKeyName
);

/// Prefix applied to the names of instances launched by this client.
pub const INSTANCE_NAME_PREFIX: &str = "lambda-toolio-";

#[derive(Clone, Debug, Deserialize)]
pub(super) struct Envelope<T> {
    pub(super) data: T,
}

/// A region as reported by the catalog and instance listings.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Region {
    /// Region name used when launching.
    pub name: RegionName,
    /// Human-readable location.
    #[serde(default)]
    pub description: String,
}

/// Hardware summary of an instance type.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct InstanceTypeSpecs {
    /// Virtual CPUs.
    #[serde(default)]
    pub vcpus: u32,
    /// Memory in GiB.
    #[serde(default)]
    pub memory_gib: u32,
    /// Local storage in GiB.
    #[serde(default)]
    pub storage_gib: u32,
    /// Number of GPUs.
    #[serde(default)]
    pub gpus: u32,
}

/// Descriptive metadata of an instance type.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct InstanceTypeInfo {
    /// Instance type name.
    pub name: InstanceTypeName,
    /// Marketing description (for example `1x A100 (40 GB SXM4)`).
    #[serde(default)]
    pub description: String,
    /// Hourly price in US cents.
    #[serde(default)]
    pub price_cents_per_hour: u64,
    /// Hardware summary.
    #[serde(default)]
    pub specs: InstanceTypeSpecs,
}

impl InstanceTypeInfo {
    /// Hourly price formatted as dollars, for example `$1.10`.
    #[must_use]
    pub fn hourly_price(&self) -> String {
        let cents = self.price_cents_per_hour;
        format!("${}.{:02}", cents.div_euclid(100), cents.rem_euclid(100))
    }
}

/// One catalog entry: the type plus the regions with spare capacity.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct InstanceTypeEntry {
    /// Instance type metadata.
    pub instance_type: InstanceTypeInfo,
    /// Regions currently able to host a new instance of this type.
    #[serde(default)]
    pub regions_with_capacity_available: Vec<Region>,
}

impl InstanceTypeEntry {
    /// Returns `true` when at least one region reports spare capacity.
    #[must_use]
    pub fn has_capacity(&self) -> bool {
        !self.regions_with_capacity_available.is_empty()
    }

    /// Region names in the order the service listed them.
    pub fn region_names(&self) -> impl Iterator<Item = &RegionName> {
        self.regions_with_capacity_available
            .iter()
            .map(|region| &region.name)
    }
}

/// An SSH key registered with the account.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SshKey {
    /// Service identifier.
    pub id: String,
    /// Key name used in launch requests.
    pub name: SshKeyName,
    /// Public half of the key.
    #[serde(default)]
    pub public_key: String,
}

/// Lifecycle state derived from the service's status string.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InstanceState {
    /// Still booting; the hostname may be absent.
    Provisioning,
    /// Running and reachable.
    Ready,
    /// Running but failing health checks.
    Unhealthy,
    /// Terminating or gone.
    Terminated,
    /// Status the client does not recognise, or no status at all.
    Unknown,
}

impl InstanceState {
    /// Maps a raw status string onto a lifecycle state.
    #[must_use]
    pub fn from_status(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "booting" => Self::Provisioning,
            "active" => Self::Ready,
            "unhealthy" => Self::Unhealthy,
            "terminating" | "terminated" => Self::Terminated,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Provisioning => "provisioning",
            Self::Ready => "ready",
            Self::Unhealthy => "unhealthy",
            Self::Terminated => "terminated",
            Self::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// Point-in-time view of an instance owned by the credential.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Instance {
    /// Service identifier.
    pub id: InstanceId,
    /// Optional user-facing name.
    #[serde(default)]
    pub name: Option<String>,
    /// Public IPv4 address once assigned.
    #[serde(default)]
    pub ip: Option<String>,
    /// Raw status string.
    #[serde(default)]
    pub status: Option<String>,
    /// Hostname; absent until provisioning completes.
    #[serde(default)]
    pub hostname: Option<String>,
    /// Region hosting the instance.
    #[serde(default)]
    pub region: Option<Region>,
    /// Instance type metadata.
    #[serde(default)]
    pub instance_type: Option<InstanceTypeInfo>,
    /// Keys authorised on the instance.
    #[serde(default)]
    pub ssh_key_names: Vec<SshKeyName>,
}

impl Instance {
    /// Lifecycle state derived from [`Instance::status`].
    #[must_use]
    pub fn state(&self) -> InstanceState {
        self.status
            .as_deref()
            .map_or(InstanceState::Unknown, InstanceState::from_status)
    }

    /// Hostname when present and non-blank.
    #[must_use]
    pub fn hostname(&self) -> Option<&str> {
        self.hostname
            .as_deref()
            .map(str::trim)
            .filter(|hostname| !hostname.is_empty())
    }
}

/// Body of a launch request. Quantity is always one.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct LaunchRequest {
    /// Target region.
    pub region_name: RegionName,
    /// Requested instance type.
    pub instance_type_name: InstanceTypeName,
    /// Exactly one key to authorise on the instance.
    pub ssh_key_names: Vec<SshKeyName>,
    /// Number of instances; fixed at one.
    pub quantity: u32,
    /// Label shown in the Lambda console.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl LaunchRequest {
    /// Builds a single-instance request labelled `lambda-toolio-<uuid>`,
    /// trimming inputs.
    ///
    /// # Errors
    ///
    /// Returns [`LambdaApiError::Validation`] when any argument is blank.
    pub fn new(
        instance_type: &str,
        region: &str,
        ssh_key: &str,
    ) -> Result<Self, LambdaApiError> {
        let fields = [
            ("instance_type", instance_type.trim()),
            ("region", region.trim()),
            ("ssh_key", ssh_key.trim()),
        ];
        if let Some((field, _)) = fields.iter().find(|(_, value)| value.is_empty()) {
            return Err(LambdaApiError::Validation(format!(
                "launch request is missing {field}"
            )));
        }

        Ok(Self {
            region_name: RegionName::from(region.trim()),
            instance_type_name: InstanceTypeName::from(instance_type.trim()),
            ssh_key_names: vec![SshKeyName::from(ssh_key.trim())],
            quantity: 1,
            name: Some(format!("{INSTANCE_NAME_PREFIX}{}", Uuid::new_v4().simple())),
        })
    }

    /// Replaces the generated instance label.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

#[derive(Clone, Debug, Deserialize)]
pub(super) struct LaunchData {
    #[serde(default)]
    pub(super) instance_ids: Vec<InstanceId>,
}

#[derive(Clone, Debug, Serialize)]
pub(super) struct TerminateRequest<'a> {
    pub(super) instance_ids: &'a [InstanceId],
}

#[derive(Clone, Debug, Deserialize)]
pub(super) struct TerminateData {
    #[serde(default)]
    pub(super) terminated_instances: Vec<Instance>,
}

/// Result of [`super::LambdaClient::terminate_all`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TerminateOutcome {
    /// The credential owned no instances; no termination was requested.
    NothingToTerminate,
    /// A batched termination ran; holds the instances the service reported.
    Terminated(Vec<Instance>),
}

#[derive(Clone, Debug, Deserialize)]
pub(super) struct ErrorEnvelope {
    pub(super) error: ErrorBody,
}

#[derive(Clone, Debug, Deserialize)]
pub(super) struct ErrorBody {
    #[serde(default)]
    pub(super) code: Option<String>,
    #[serde(default)]
    pub(super) message: String,
    #[serde(default)]
    pub(super) suggestion: Option<String>,
}
