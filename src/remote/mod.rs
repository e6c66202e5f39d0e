//! Remote script execution over the system `ssh` client.
//!
//! Unlike every other operation in the crate, running a script never returns
//! an error: failures are logged and reported through [`ScriptOutcome`] so
//! the caller can carry on with teardown.

use std::ffi::OsString;

use camino::Utf8Path;
use shell_escape::unix::escape;
use tracing::{error, info};

mod config;
mod types;

pub use config::{DEFAULT_INTERPRETER, DEFAULT_SSH_USER, RemoteConfig, RemoteError};
pub use types::{CommandOutput, CommandRunner, ProcessCommandRunner, StreamingCommandRunner};

/// What happened when a remote script ran.
#[derive(Clone, Debug, Eq, PartialEq)]
#[must_use]
pub enum ScriptOutcome {
    /// The script exited with status zero.
    Completed,
    /// The script could not be run or exited unsuccessfully.
    Failed {
        /// Remote exit status, when one was reported.
        exit_code: Option<i32>,
        /// Human-readable failure description.
        message: String,
    },
}

impl ScriptOutcome {
    /// Returns `true` for [`ScriptOutcome::Completed`].
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Runs scripts that already exist on a remote instance.
#[derive(Clone, Debug)]
pub struct ScriptRunner<R: CommandRunner> {
    config: RemoteConfig,
    runner: R,
}

impl ScriptRunner<ProcessCommandRunner> {
    /// Convenience constructor that wires the capturing process runner.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::InvalidConfig`] when validation fails.
    pub fn with_process_runner(config: RemoteConfig) -> Result<Self, RemoteError> {
        Self::new(config, ProcessCommandRunner)
    }
}

impl<R: CommandRunner> ScriptRunner<R> {
    /// Creates a runner using the provided configuration and command runner.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::InvalidConfig`] when configuration validation
    /// fails.
    pub fn new(config: RemoteConfig, runner: R) -> Result<Self, RemoteError> {
        config.validate()?;
        Ok(Self { config, runner })
    }

    /// Returns a reference to the underlying configuration.
    #[must_use]
    pub const fn config(&self) -> &RemoteConfig {
        &self.config
    }

    /// Runs `script_path` on `hostname` as the configured user and waits for
    /// it to finish.
    ///
    /// A nonzero exit, a missing exit status, or a failure to start `ssh`
    /// is logged and returned as [`ScriptOutcome::Failed`]; it is never
    /// propagated as an error.
    ///
    /// # Security
    ///
    /// `script_path` is shell-escaped; the configured interpreter is passed
    /// verbatim so it may carry flags.
    pub fn run_script(&self, hostname: &str, script_path: &Utf8Path) -> ScriptOutcome {
        let host = hostname.trim();
        if host.is_empty() || script_path.as_str().trim().is_empty() {
            let message = String::from("hostname and script path are required");
            error!(%message, "remote script not started");
            return ScriptOutcome::Failed {
                exit_code: None,
                message,
            };
        }

        let command = self.build_remote_command(script_path);
        let args = self.build_ssh_args(host, &command);
        info!(host, script = %script_path, "running remote script");

        let output = match self.runner.run(&self.config.ssh_bin, &args) {
            Ok(output) => output,
            Err(err) => {
                error!(host, script = %script_path, error = %err, "remote script failed to start");
                return ScriptOutcome::Failed {
                    exit_code: None,
                    message: err.to_string(),
                };
            }
        };

        if output.is_success() {
            info!(host, script = %script_path, "remote script completed");
            return ScriptOutcome::Completed;
        }

        let status_text = output
            .code
            .map_or_else(|| String::from("unknown"), |code| code.to_string());
        let stderr = output.stderr.trim();
        let message = if stderr.is_empty() {
            format!("remote script exited with status {status_text}")
        } else {
            format!("remote script exited with status {status_text}: {stderr}")
        };
        error!(host, script = %script_path, status = %status_text, "remote script failed");
        ScriptOutcome::Failed {
            exit_code: output.code,
            message,
        }
    }

    fn build_remote_command(&self, script_path: &Utf8Path) -> String {
        let escaped = escape(script_path.as_str().into());
        format!("{} {escaped}", self.config.interpreter.trim())
    }

    fn build_ssh_args(&self, hostname: &str, remote_command: &str) -> Vec<OsString> {
        let mut args = vec![
            OsString::from("-p"),
            OsString::from(self.config.ssh_port.to_string()),
        ];

        if let Some(ref identity_file) = self.config.ssh_identity_file {
            args.push(OsString::from("-i"));
            args.push(OsString::from(expand_tilde(identity_file)));
        }

        if self.config.ssh_batch_mode {
            args.push(OsString::from("-o"));
            args.push(OsString::from("BatchMode=yes"));
        }

        if !self.config.ssh_strict_host_key_checking {
            args.push(OsString::from("-o"));
            args.push(OsString::from("StrictHostKeyChecking=no"));
        }

        if !self.config.ssh_known_hosts_file.trim().is_empty() {
            args.push(OsString::from("-o"));
            args.push(OsString::from(format!(
                "UserKnownHostsFile={}",
                self.config.ssh_known_hosts_file
            )));
        }

        args.push(OsString::from(format!(
            "{}@{hostname}",
            self.config.ssh_user
        )));
        args.push(OsString::from(remote_command));
        args
    }
}

/// Expands a leading `~/` prefix to the user's home directory, leaving the
/// input unchanged when `HOME` is unset.
///
/// # Examples
///
/// ```
/// # use lambda_toolio::remote::expand_tilde;
/// assert_eq!(expand_tilde("/absolute/key"), "/absolute/key");
/// ```
#[must_use]
pub fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = std::env::var_os("HOME")
    {
        return format!("{}/{rest}", home.to_string_lossy());
    }
    path.to_owned()
}

#[cfg(test)]
mod tests;
