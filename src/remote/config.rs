//! SSH settings for remote script execution and the associated errors.
//!
//! Configuration is loaded via `ortho-config`, which merges defaults,
//! configuration files, and environment variables.

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

/// Default remote account on Lambda Cloud images.
pub const DEFAULT_SSH_USER: &str = "ubuntu";

/// Default interpreter used to run remote scripts.
pub const DEFAULT_INTERPRETER: &str = "python";

/// SSH settings loaded via `ortho-config`.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "LAMBDA_SSH",
    discovery(
        app_name = "lambda-toolio",
        env_var = "LAMBDA_TOOLIO_CONFIG_PATH",
        config_file_name = "lambda-toolio.toml",
        dotfile_name = ".lambda-toolio.toml",
        project_file_name = "lambda-toolio.toml"
    )
)]
pub struct RemoteConfig {
    /// Path to the `ssh` executable.
    #[ortho_config(default = "ssh".to_owned())]
    pub ssh_bin: String,
    /// Remote user to connect as.
    #[ortho_config(default = DEFAULT_SSH_USER.to_owned())]
    pub ssh_user: String,
    /// TCP port of the remote SSH daemon.
    #[ortho_config(default = 22)]
    pub ssh_port: u16,
    /// Interpreter invoked with the script path (for example `python3 -u`).
    #[ortho_config(default = DEFAULT_INTERPRETER.to_owned())]
    pub interpreter: String,
    /// Whether to force batch mode for SSH to avoid password prompts.
    #[ortho_config(default = true)]
    pub ssh_batch_mode: bool,
    /// Whether to enforce host key checking; disabled by default because
    /// every launch produces a fresh host key.
    #[ortho_config(default = false)]
    pub ssh_strict_host_key_checking: bool,
    /// Known hosts file override; defaults to `/dev/null` for ephemeral hosts.
    #[ortho_config(default = "/dev/null".to_owned())]
    pub ssh_known_hosts_file: String,
    /// Private key matching the SSH key chosen at launch. Supports tilde
    /// expansion. When absent, SSH falls back to its default key locations.
    pub ssh_identity_file: Option<String>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            ssh_bin: String::from("ssh"),
            ssh_user: DEFAULT_SSH_USER.to_owned(),
            ssh_port: 22,
            interpreter: DEFAULT_INTERPRETER.to_owned(),
            ssh_batch_mode: true,
            ssh_strict_host_key_checking: false,
            ssh_known_hosts_file: String::from("/dev/null"),
            ssh_identity_file: None,
        }
    }
}

impl RemoteConfig {
    /// Ensures configuration values are present after trimming whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::InvalidConfig`] when any required field is
    /// empty.
    pub fn validate(&self) -> Result<(), RemoteError> {
        Self::require_value(&self.ssh_bin, "ssh_bin")?;
        Self::require_value(&self.ssh_user, "ssh_user")?;
        Self::require_value(&self.interpreter, "interpreter")?;
        Self::require_optional_value(self.ssh_identity_file.as_deref(), "ssh_identity_file")?;
        if self.ssh_port == 0 {
            return Err(RemoteError::InvalidConfig {
                field: String::from("ssh_port"),
            });
        }
        Ok(())
    }

    /// Loads configuration from defaults, configuration files, and
    /// environment variables without parsing CLI arguments.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Load`] when merging sources fails.
    pub fn load_without_cli_args() -> Result<Self, RemoteError> {
        Self::load_from_iter([std::ffi::OsString::from("lambda-toolio")])
            .map_err(|err| RemoteError::Load(err.to_string()))
    }

    fn require_optional_value(value: Option<&str>, field: &str) -> Result<(), RemoteError> {
        match value {
            None => Ok(()),
            Some(v) if !v.trim().is_empty() => Ok(()),
            Some(_) => Err(RemoteError::InvalidConfig {
                field: field.to_owned(),
            }),
        }
    }

    fn require_value(value: &str, field: &str) -> Result<(), RemoteError> {
        Self::require_optional_value(Some(value), field)
    }
}

/// Errors surfaced while configuring or spawning remote execution.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum RemoteError {
    /// Raised when configuration is missing required values.
    #[error("missing {field}: set LAMBDA_SSH_{env_suffix} or add {field} to lambda-toolio.toml", env_suffix = field.to_uppercase())]
    InvalidConfig {
        /// Configuration field that failed validation.
        field: String,
    },
    /// Raised when layered configuration cannot be merged.
    #[error("ssh configuration parsing failed: {0}")]
    Load(String),
    /// Raised when a command cannot be spawned.
    #[error("failed to spawn {program}: {message}")]
    Spawn {
        /// Command that failed to start.
        program: String,
        /// Operating system error string.
        message: String,
    },
}
