//! Configuration loading via `ortho-config`.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::api::{RetryPolicy, WaitPolicy};

/// Base URL of the Lambda Cloud public API.
pub const DEFAULT_BASE_URL: &str = "https://cloud.lambdalabs.com/api/v1";

/// Lambda Cloud settings derived from environment variables, configuration
/// files, and CLI flags.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "LAMBDA",
    discovery(
        app_name = "lambda-toolio",
        env_var = "LAMBDA_TOOLIO_CONFIG_PATH",
        config_file_name = "lambda-toolio.toml",
        dotfile_name = ".lambda-toolio.toml",
        project_file_name = "lambda-toolio.toml"
    )
)]
pub struct LambdaConfig {
    /// Bearer token used for every API call. This value is required.
    pub api_key: String,
    /// API endpoint. Overridable so staging endpoints and local fakes can be
    /// targeted.
    #[ortho_config(default = DEFAULT_BASE_URL.to_owned())]
    pub base_url: String,
    /// Attempts made by a generic API call before the failure surfaces.
    #[ortho_config(default = 3)]
    pub request_attempts: u32,
    /// Constant delay between generic API call attempts, in milliseconds.
    #[ortho_config(default = 1000)]
    pub request_retry_delay_ms: u64,
    /// Delay between launch attempts rejected for insufficient capacity, in
    /// milliseconds.
    #[ortho_config(default = 1000)]
    pub capacity_retry_delay_ms: u64,
    /// Per-request HTTP timeout, in seconds.
    #[ortho_config(default = 30)]
    pub http_timeout_secs: u64,
    /// Fixed wait after a launch before the hostname is first queried, in
    /// seconds.
    #[ortho_config(default = 30)]
    pub settle_secs: u64,
    /// Interval between hostname checks once the settle period has elapsed.
    #[ortho_config(default = 5)]
    pub hostname_poll_interval_secs: u64,
    /// Upper bound on hostname polling after the settle period. Zero checks
    /// exactly once.
    #[ortho_config(default = 600)]
    pub hostname_timeout_secs: u64,
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }
}

impl LambdaConfig {
    /// Builds a configuration holding `api_key` with every other field at its
    /// default.
    #[must_use]
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_owned(),
            request_attempts: 3,
            request_retry_delay_ms: 1000,
            capacity_retry_delay_ms: 1000,
            http_timeout_secs: 30,
            settle_secs: 30,
            hostname_poll_interval_secs: 5,
            hostname_timeout_secs: 600,
        }
    }

    fn require_field(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(format!(
                "missing {}: set {} (a .env file works too) or add {} to lambda-toolio.toml",
                metadata.description, metadata.env_var, metadata.toml_key
            )));
        }
        Ok(())
    }

    /// Loads configuration without attempting to parse CLI arguments. Values
    /// merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("lambda-toolio")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Performs semantic validation. Error messages include guidance on how
    /// to provide missing values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when the credential or endpoint
    /// is blank and [`ConfigError::Invalid`] when the retry budget is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::require_field(
            &self.api_key,
            &FieldMetadata::new("Lambda Cloud API key", "LAMBDA_API_KEY", "api_key"),
        )?;
        Self::require_field(
            &self.base_url,
            &FieldMetadata::new("API base URL", "LAMBDA_BASE_URL", "base_url"),
        )?;
        if self.request_attempts == 0 {
            return Err(ConfigError::Invalid(String::from(
                "request_attempts must be at least 1",
            )));
        }
        if self.hostname_poll_interval_secs == 0 && self.hostname_timeout_secs > 0 {
            return Err(ConfigError::Invalid(String::from(
                "hostname_poll_interval_secs must be positive when hostname_timeout_secs is set",
            )));
        }
        Ok(())
    }

    /// Retry policy applied to generic API calls.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.request_attempts,
            Duration::from_millis(self.request_retry_delay_ms),
        )
    }

    /// Delay between launch attempts rejected for lack of capacity.
    #[must_use]
    pub const fn capacity_retry_delay(&self) -> Duration {
        Duration::from_millis(self.capacity_retry_delay_ms)
    }

    /// Per-request HTTP timeout.
    #[must_use]
    pub const fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Settle-then-poll policy used while waiting for a hostname.
    #[must_use]
    pub const fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy {
            settle: Duration::from_secs(self.settle_secs),
            poll_interval: Duration::from_secs(self.hostname_poll_interval_secs),
            timeout: Duration::from_secs(self.hostname_timeout_secs),
        }
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Indicates a field holds a value the client cannot work with.
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
