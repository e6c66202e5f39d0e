//! Binary entry point for the `lambda-toolio` CLI.

use std::io::{self, Write};
use std::process;

use camino::Utf8Path;
use clap::Parser;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use lambda_toolio::api::{InstanceTypeEntry, Sleeper, Transport};
use lambda_toolio::{
    Assistant, AssistantError, CommandRunner, DialoguerPrompter, InstanceId, LambdaApiError,
    LambdaClient, LambdaConfig, LaunchRequest, RemoteConfig, RemoteError, ScriptOutcome,
    ScriptRunner, StreamingCommandRunner, TerminateOutcome,
};

mod cli;
#[cfg(test)]
mod test_helpers;

use cli::{Cli, HostnameCommand, LaunchCommand, RunScriptCommand};

const EXIT_FAILURE: i32 = 1;
const EXIT_INTERRUPTED: i32 = 130;

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Api(#[from] LambdaApiError),
    #[error("remote execution error: {0}")]
    Remote(#[from] RemoteError),
    #[error("assistant stopped: {0}")]
    Assistant(#[from] AssistantError),
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
    #[error("interrupted")]
    Interrupted,
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            Self::Api(err) | Self::Assistant(AssistantError::Api(err)) if err.is_cancelled() => {
                EXIT_INTERRUPTED
            }
            Self::Interrupted => EXIT_INTERRUPTED,
            _ => EXIT_FAILURE,
        }
    }
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let cancel = CancellationToken::new();
    cancel_on_interrupt(cancel.clone());

    let exit_code = match dispatch(cli, &cancel).await {
        Ok(()) => 0,
        Err(err) => {
            report_error(&err);
            err.exit_code()
        }
    };

    process::exit(exit_code);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init()
        .ok();
}

fn cancel_on_interrupt(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; cancelling");
            cancel.cancel();
        }
    });
}

async fn dispatch(cli: Cli, cancel: &CancellationToken) -> Result<(), CliError> {
    let mut out = io::stdout();
    match cli {
        Cli::Assistant => run_assistant(cancel.clone(), &mut out).await,
        Cli::RunScript(command) => {
            let scripts = ScriptRunner::new(load_remote_config()?, StreamingCommandRunner)?;
            run_script(&scripts, &command, &mut out)
        }
        Cli::Types => {
            let client = load_client()?;
            until_interrupted(cancel, list_types(&client, &mut out)).await
        }
        Cli::Keys => {
            let client = load_client()?;
            until_interrupted(cancel, list_keys(&client, &mut out)).await
        }
        Cli::Instances => {
            let client = load_client()?;
            until_interrupted(cancel, list_instances(&client, &mut out)).await
        }
        Cli::Launch(command) => launch(&load_client()?, &command, cancel, &mut out).await,
        Cli::Hostname(command) => {
            let client = load_client()?;
            until_interrupted(cancel, show_hostname(&client, &command, &mut out)).await
        }
        Cli::Terminate => {
            let client = load_client()?;
            until_interrupted(cancel, terminate(&client, &mut out)).await
        }
    }
}

/// Abandons `command` once Ctrl-C fires. Launch and the assistant watch the
/// token themselves.
async fn until_interrupted<F>(cancel: &CancellationToken, command: F) -> Result<(), CliError>
where
    F: Future<Output = Result<(), CliError>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(CliError::Interrupted),
        result = command => result,
    }
}

fn load_client() -> Result<LambdaClient, CliError> {
    let config =
        LambdaConfig::load_without_cli_args().map_err(|err| CliError::Config(err.to_string()))?;
    Ok(LambdaClient::new(&config)?)
}

fn load_remote_config() -> Result<RemoteConfig, CliError> {
    RemoteConfig::load_without_cli_args().map_err(|err| CliError::Config(err.to_string()))
}

async fn run_assistant(cancel: CancellationToken, out: &mut impl Write) -> Result<(), CliError> {
    let client = load_client()?;
    let scripts = ScriptRunner::new(load_remote_config()?, StreamingCommandRunner)?;
    let assistant = Assistant::new(client, scripts, DialoguerPrompter::new(), cancel);
    let summary = assistant.run().await?;
    writeln!(
        out,
        "launched {} instance(s), terminated {}",
        summary.launched.len(),
        summary.terminated
    )?;
    Ok(())
}

async fn list_types<T, S>(
    client: &LambdaClient<T, S>,
    out: &mut impl Write,
) -> Result<(), CliError>
where
    T: Transport + Sync,
    S: Sleeper + Sync,
{
    let available = client.list_available_instance_types().await?;
    if available.is_empty() {
        writeln!(out, "no instance types have capacity right now")?;
    }
    for (type_key, entry) in &available {
        writeln!(out, "{}", render_type(type_key, entry))?;
    }
    Ok(())
}

fn render_type(type_key: &str, entry: &InstanceTypeEntry) -> String {
    let info = &entry.instance_type;
    let regions: Vec<&str> = entry.region_names().map(|name| name.as_str()).collect();
    format!(
        "{type_key}\t{}\t{}/hr\t{}",
        info.description,
        info.hourly_price(),
        regions.join(",")
    )
}

async fn list_keys<T, S>(client: &LambdaClient<T, S>, out: &mut impl Write) -> Result<(), CliError>
where
    T: Transport + Sync,
    S: Sleeper + Sync,
{
    let keys = client.list_ssh_keys().await?;
    if keys.is_empty() {
        writeln!(out, "no SSH keys registered")?;
    }
    for key in keys {
        writeln!(out, "{}\t{}", key.name, key.id)?;
    }
    Ok(())
}

async fn list_instances<T, S>(
    client: &LambdaClient<T, S>,
    out: &mut impl Write,
) -> Result<(), CliError>
where
    T: Transport + Sync,
    S: Sleeper + Sync,
{
    let instances = client.list_instances().await?;
    if instances.is_empty() {
        writeln!(out, "no instances")?;
    }
    for instance in &instances {
        let region = instance
            .region
            .as_ref()
            .map_or("-", |placement| placement.name.as_str());
        let instance_type = instance
            .instance_type
            .as_ref()
            .map_or("-", |info| info.name.as_str());
        writeln!(
            out,
            "{}\t{}\t{}\t{region}\t{instance_type}",
            instance.id,
            instance.state(),
            instance.hostname().unwrap_or("-")
        )?;
    }
    Ok(())
}

async fn launch<T, S>(
    client: &LambdaClient<T, S>,
    command: &LaunchCommand,
    cancel: &CancellationToken,
    out: &mut impl Write,
) -> Result<(), CliError>
where
    T: Transport + Sync,
    S: Sleeper + Sync,
{
    let request = LaunchRequest::new(&command.instance_type, &command.region, &command.ssh_key)?;
    let id = client.launch(&request, cancel).await?;
    writeln!(out, "{id}")?;
    if command.wait {
        let hostname = client.wait_for_hostname(&id, cancel).await?;
        writeln!(out, "{hostname}")?;
    }
    Ok(())
}

async fn show_hostname<T, S>(
    client: &LambdaClient<T, S>,
    command: &HostnameCommand,
    out: &mut impl Write,
) -> Result<(), CliError>
where
    T: Transport + Sync,
    S: Sleeper + Sync,
{
    let hostname = client
        .instance_hostname(&InstanceId::from(command.instance_id.as_str()))
        .await?;
    writeln!(out, "{}", hostname.unwrap_or_default())?;
    Ok(())
}

fn run_script<R: CommandRunner>(
    scripts: &ScriptRunner<R>,
    command: &RunScriptCommand,
    out: &mut impl Write,
) -> Result<(), CliError> {
    match scripts.run_script(&command.hostname, Utf8Path::new(&command.script)) {
        ScriptOutcome::Completed => writeln!(out, "script completed")?,
        ScriptOutcome::Failed { message, .. } => writeln!(out, "script failed: {message}")?,
    }
    Ok(())
}

async fn terminate<T, S>(client: &LambdaClient<T, S>, out: &mut impl Write) -> Result<(), CliError>
where
    T: Transport + Sync,
    S: Sleeper + Sync,
{
    match client.terminate_all().await? {
        TerminateOutcome::NothingToTerminate => writeln!(out, "nothing to terminate")?,
        TerminateOutcome::Terminated(instances) => {
            writeln!(out, "terminated {} instance(s)", instances.len())?;
            for instance in instances {
                writeln!(out, "{}", instance.id)?;
            }
        }
    }
    Ok(())
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
