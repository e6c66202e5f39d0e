//! Command-line interface definitions for the `lambda-toolio` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::Parser;

/// Top-level CLI for the `lambda-toolio` binary.
#[derive(Debug, Parser)]
#[command(
    name = "lambda-toolio",
    version,
    about = "Launch, reach, and tear down Lambda Cloud GPU instances",
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// Walk through launching an instance, running a script, and cleaning up.
    #[command(name = "assistant")]
    Assistant,
    /// List instance types that currently have capacity, with their regions.
    #[command(name = "types")]
    Types,
    /// List the SSH keys registered with the account.
    #[command(name = "keys")]
    Keys,
    /// List instances owned by the account.
    #[command(name = "instances")]
    Instances,
    /// Launch one instance, retrying while capacity is short.
    #[command(name = "launch")]
    Launch(LaunchCommand),
    /// Print the hostname of an instance, or an empty line while it boots.
    #[command(name = "hostname")]
    Hostname(HostnameCommand),
    /// Run a script that already exists on an instance.
    #[command(name = "run-script")]
    RunScript(RunScriptCommand),
    /// Terminate every instance owned by the account.
    #[command(name = "terminate")]
    Terminate,
}

/// Arguments for the `lambda-toolio launch` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct LaunchCommand {
    /// Instance type name, for example `gpu_1x_a100`.
    #[arg(long, value_name = "TYPE")]
    pub(crate) instance_type: String,
    /// Region to launch in, for example `us-east-1`.
    #[arg(long, value_name = "REGION")]
    pub(crate) region: String,
    /// Name of the SSH key to authorise on the instance.
    #[arg(long, value_name = "NAME")]
    pub(crate) ssh_key: String,
    /// Wait for the instance to report a hostname and print it.
    #[arg(long)]
    pub(crate) wait: bool,
}

/// Arguments for the `lambda-toolio hostname` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct HostnameCommand {
    /// Instance identifier returned by `launch`.
    #[arg(value_name = "INSTANCE_ID")]
    pub(crate) instance_id: String,
}

/// Arguments for the `lambda-toolio run-script` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct RunScriptCommand {
    /// Hostname or address of the instance.
    #[arg(long, value_name = "HOST")]
    pub(crate) hostname: String,
    /// Path of the script on the instance.
    #[arg(long, value_name = "PATH")]
    pub(crate) script: String,
}
