//! Client library for Lambda Cloud GPU instances.
//!
//! The crate covers the short lifecycle of a rented GPU box: find an
//! instance type with capacity, launch it (riding out capacity shortages),
//! wait for a hostname, run a script over SSH, and terminate everything.
//! [`api::LambdaClient`] talks to the HTTP API, [`remote::ScriptRunner`]
//! drives `ssh`, and [`assistant::Assistant`] stitches both into an
//! interactive session.

pub mod api;
pub mod assistant;
pub mod config;
pub mod prompt;
pub mod remote;
#[cfg(test)]
mod test_helpers;
pub mod test_support;

pub use api::{
    Instance, InstanceId, InstanceState, InstanceTypeEntry, LambdaApiError, LambdaClient,
    LaunchRequest, RetryPolicy, SshKey, TerminateOutcome, WaitPolicy,
};
pub use assistant::{Assistant, AssistantError, SessionSummary};
pub use config::{ConfigError, LambdaConfig};
pub use prompt::{DialoguerPrompter, PromptError, Prompter};
pub use remote::{
    CommandOutput, CommandRunner, ProcessCommandRunner, RemoteConfig, RemoteError, ScriptOutcome,
    ScriptRunner, StreamingCommandRunner,
};
