//! Interactive launch, run, and teardown session.
//!
//! One round walks the user through picking an instance type, region, and
//! SSH key; launches and waits for the instance; optionally runs a script on
//! it; then offers to terminate everything the account owns. Rounds repeat
//! until the user declines another launch.

use camino::Utf8Path;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::api::{
    InstanceId, InstanceTypeEntry, LambdaApiError, LambdaClient, LaunchRequest, Region, Sleeper,
    SshKey, TerminateOutcome, Transport,
};
use crate::prompt::{PromptError, Prompter, choose};
use crate::remote::{CommandRunner, ScriptOutcome, ScriptRunner};

/// Errors that end an assistant session.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum AssistantError {
    /// Raised when the catalog or key listing fails.
    #[error(transparent)]
    Api(#[from] LambdaApiError),
    /// Raised when the terminal interaction fails.
    #[error(transparent)]
    Prompt(#[from] PromptError),
}

/// What a session did.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SessionSummary {
    /// Instances launched during the session, in launch order.
    pub launched: Vec<InstanceId>,
    /// Instances the service reported as terminated.
    pub terminated: usize,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum RoundEnd {
    Again,
    Stop,
}

struct Selection {
    instance_type: String,
    region: String,
    ssh_key: String,
}

/// Drives the interactive session.
pub struct Assistant<T, S, R: CommandRunner, P> {
    client: LambdaClient<T, S>,
    scripts: ScriptRunner<R>,
    prompter: P,
    cancel: CancellationToken,
}

impl<T, S, R, P> Assistant<T, S, R, P>
where
    T: Transport + Sync,
    S: Sleeper + Sync,
    R: CommandRunner,
    P: Prompter,
{
    /// Creates an assistant. `cancel` aborts any launch or hostname wait in
    /// progress.
    pub const fn new(
        client: LambdaClient<T, S>,
        scripts: ScriptRunner<R>,
        prompter: P,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            scripts,
            prompter,
            cancel,
        }
    }

    /// Runs rounds until the user stops or a round cannot continue.
    ///
    /// Launch, wait, script, and termination failures are reported and the
    /// session goes on. A cancelled launch or wait still offers termination
    /// and then ends the session.
    ///
    /// # Errors
    ///
    /// Returns [`AssistantError::Api`] when the catalog or SSH key listing
    /// fails and [`AssistantError::Prompt`] when the terminal fails.
    pub async fn run(&self) -> Result<SessionSummary, AssistantError> {
        let mut summary = SessionSummary::default();
        while self.round(&mut summary).await? == RoundEnd::Again {}
        info!(
            launched = summary.launched.len(),
            terminated = summary.terminated,
            "assistant session finished"
        );
        Ok(summary)
    }

    async fn round(&self, summary: &mut SessionSummary) -> Result<RoundEnd, AssistantError> {
        let Some(selection) = self.select_launch().await? else {
            return Ok(RoundEnd::Stop);
        };

        let interrupted = self.launch_and_use(&selection, summary).await?;
        self.offer_termination(summary).await?;
        if interrupted {
            return Ok(RoundEnd::Stop);
        }

        if self.prompter.confirm("Launch another instance?", false)? {
            Ok(RoundEnd::Again)
        } else {
            Ok(RoundEnd::Stop)
        }
    }

    async fn select_launch(&self) -> Result<Option<Selection>, AssistantError> {
        let available: Vec<(String, InstanceTypeEntry)> = self
            .client
            .list_available_instance_types()
            .await?
            .into_iter()
            .collect();
        if available.is_empty() {
            self.prompter
                .say("No instance types have capacity right now.");
            return Ok(None);
        }

        let (type_key, entry) = choose(
            &self.prompter,
            "Instance type",
            &available,
            |(_, candidate): &(String, InstanceTypeEntry)| describe_instance_type(candidate),
        )?;
        let region = self.select_region(entry)?;

        let keys = self.client.list_ssh_keys().await?;
        if keys.is_empty() {
            self.prompter
                .say("No SSH keys are registered; add one in the Lambda Cloud dashboard.");
            return Ok(None);
        }
        let key = choose(&self.prompter, "SSH key", &keys, |ssh_key: &SshKey| {
            ssh_key.name.to_string()
        })?;

        Ok(Some(Selection {
            instance_type: type_key.clone(),
            region,
            ssh_key: key.name.to_string(),
        }))
    }

    fn select_region(&self, entry: &InstanceTypeEntry) -> Result<String, PromptError> {
        let regions = &entry.regions_with_capacity_available;
        if let [only] = regions.as_slice() {
            self.prompter
                .say(&format!("Using the only available region, {}.", only.name));
            return Ok(only.name.to_string());
        }
        let region = choose(&self.prompter, "Region", regions, describe_region)?;
        Ok(region.name.to_string())
    }

    /// Returns `true` when the round was cancelled.
    async fn launch_and_use(
        &self,
        selection: &Selection,
        summary: &mut SessionSummary,
    ) -> Result<bool, AssistantError> {
        let request = match LaunchRequest::new(
            &selection.instance_type,
            &selection.region,
            &selection.ssh_key,
        ) {
            Ok(request) => request,
            Err(err) => {
                self.report_failure("Launch", &err);
                return Ok(false);
            }
        };

        self.prompter.say(&format!(
            "Launching {} in {}...",
            selection.instance_type, selection.region
        ));
        let id = match self.client.launch(&request, &self.cancel).await {
            Ok(id) => id,
            Err(err) => {
                self.report_failure("Launch", &err);
                return Ok(err.is_cancelled());
            }
        };
        summary.launched.push(id.clone());
        self.prompter.say(&format!(
            "Launched {id}; waiting for it to report a hostname..."
        ));

        let hostname = match self.client.wait_for_hostname(&id, &self.cancel).await {
            Ok(hostname) => hostname,
            Err(err) => {
                self.report_failure("Waiting for the hostname", &err);
                return Ok(err.is_cancelled());
            }
        };
        self.prompter
            .say(&format!("Instance {id} is reachable at {hostname}."));

        self.offer_script(&hostname)?;
        Ok(false)
    }

    fn offer_script(&self, hostname: &str) -> Result<(), PromptError> {
        if !self
            .prompter
            .confirm(&format!("Run a script on {hostname}?"), true)?
        {
            return Ok(());
        }

        let script = self.prompter.input("Path of the script on the instance")?;
        if script.trim().is_empty() {
            self.prompter.say("No script given; skipping.");
            return Ok(());
        }

        match self
            .scripts
            .run_script(hostname, Utf8Path::new(script.trim()))
        {
            ScriptOutcome::Completed => self.prompter.say("Script completed."),
            ScriptOutcome::Failed { message, .. } => {
                self.prompter.say(&format!("Script failed: {message}"));
            }
        }
        Ok(())
    }

    async fn offer_termination(&self, summary: &mut SessionSummary) -> Result<(), PromptError> {
        if !self
            .prompter
            .confirm("Terminate all running instances?", true)?
        {
            return Ok(());
        }

        match self.client.terminate_all().await {
            Ok(TerminateOutcome::NothingToTerminate) => {
                self.prompter.say("Nothing to terminate.");
            }
            Ok(TerminateOutcome::Terminated(instances)) => {
                summary.terminated = summary.terminated.saturating_add(instances.len());
                self.prompter
                    .say(&format!("Terminated {} instance(s).", instances.len()));
            }
            Err(err) => self.report_failure("Termination", &err),
        }
        Ok(())
    }

    fn report_failure(&self, step: &str, err: &LambdaApiError) {
        warn!(step, error = %err, "assistant step failed");
        self.prompter.say(&format!("{step} failed: {err}"));
    }
}

fn describe_instance_type(entry: &InstanceTypeEntry) -> String {
    let info = &entry.instance_type;
    format!(
        "{} - {} ({}/hr)",
        info.name,
        info.description,
        info.hourly_price()
    )
}

fn describe_region(region: &Region) -> String {
    if region.description.trim().is_empty() {
        region.name.to_string()
    } else {
        format!("{} ({})", region.name, region.description)
    }
}
