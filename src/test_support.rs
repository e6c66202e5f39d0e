//! Test support utilities shared across unit and integration tests.
//!
//! Every double here is cheap to clone and shares its state, so a test can
//! keep a handle for assertions after moving a clone into the code under
//! test.

use std::collections::VecDeque;
use std::ffi::OsString;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use crate::api::{
    ApiRequest, ApiResponse, SleepFuture, Sleeper, Transport, TransportError, TransportFuture,
};
use crate::prompt::{PromptError, Prompter};
use crate::remote::{CommandOutput, CommandRunner, RemoteError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Transport that replays queued responses in FIFO order and records every
/// request it receives. An exhausted queue yields a network failure.
#[derive(Clone, Debug, Default)]
pub struct ScriptedTransport {
    responses: Arc<Mutex<VecDeque<Result<ApiResponse, TransportError>>>>,
    requests: Arc<Mutex<Vec<ApiRequest>>>,
    latency: Duration,
}

impl ScriptedTransport {
    /// Creates a transport with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every response by `latency` on the tokio clock. Pair with a
    /// paused runtime to simulate slow or hung calls.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Queues a response with `status` and a JSON body.
    pub fn push_json(&self, status: u16, body: &Value) {
        self.push_body(status, body.to_string());
    }

    /// Queues a `200 OK` response with a JSON body.
    pub fn push_ok(&self, body: &Value) {
        self.push_json(200, body);
    }

    /// Queues an error response in the service's error envelope.
    pub fn push_error(&self, status: u16, code: &str, message: &str) {
        self.push_json(status, &error_body(code, message));
    }

    /// Queues a response with a raw body.
    pub fn push_body(&self, status: u16, body: impl Into<String>) {
        lock(&self.responses).push_back(Ok(ApiResponse {
            status,
            body: body.into(),
        }));
    }

    /// Queues a connection failure.
    pub fn push_network_failure(&self) {
        lock(&self.responses).push_back(Err(TransportError::Network(String::from(
            "connection refused",
        ))));
    }

    /// Returns a snapshot of the requests sent so far.
    #[must_use]
    pub fn requests(&self) -> Vec<ApiRequest> {
        lock(&self.requests).clone()
    }

    /// Number of requests sent so far.
    #[must_use]
    pub fn request_count(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Number of queued responses not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        lock(&self.responses).len()
    }
}

impl Transport for ScriptedTransport {
    fn send<'a>(&'a self, request: &'a ApiRequest) -> TransportFuture<'a> {
        lock(&self.requests).push(request.clone());
        let outcome = lock(&self.responses).pop_front().unwrap_or_else(|| {
            Err(TransportError::Network(String::from(
                "no scripted response available",
            )))
        });
        let latency = self.latency;
        Box::pin(async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            outcome
        })
    }
}

/// Sleeper that returns immediately and records each requested duration.
///
/// It can optionally cancel a token when the n-th sleep begins, which lets
/// tests interrupt a backoff or polling loop at a precise point.
#[derive(Clone, Debug, Default)]
pub struct RecordingSleeper {
    sleeps: Arc<Mutex<Vec<Duration>>>,
    cancel_on: Option<(usize, CancellationToken)>,
}

impl RecordingSleeper {
    /// Creates a sleeper that never cancels anything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sleeper that cancels `token` when sleep number `nth`
    /// (one-based) starts.
    #[must_use]
    pub fn cancelling_on(nth: usize, token: CancellationToken) -> Self {
        Self {
            sleeps: Arc::default(),
            cancel_on: Some((nth, token)),
        }
    }

    /// Durations requested so far, in order.
    #[must_use]
    pub fn sleeps(&self) -> Vec<Duration> {
        lock(&self.sleeps).clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) -> SleepFuture<'_> {
        let count = {
            let mut sleeps = lock(&self.sleeps);
            sleeps.push(duration);
            sleeps.len()
        };
        if let Some((nth, token)) = &self.cancel_on
            && *nth == count
        {
            token.cancel();
        }
        Box::pin(std::future::ready(()))
    }
}

/// Scripted command runner that returns pre-seeded outputs in FIFO order.
///
/// Used to drive deterministic command outcomes without spawning processes.
#[derive(Clone, Debug, Default)]
pub struct ScriptedRunner {
    responses: Arc<Mutex<VecDeque<CommandOutput>>>,
    invocations: Arc<Mutex<Vec<CommandInvocation>>>,
}

/// Records a single invocation made through [`ScriptedRunner`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandInvocation {
    /// Program name as passed to the runner.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<OsString>,
}

impl CommandInvocation {
    /// Returns a shell-like command string for assertions.
    #[must_use]
    pub fn command_string(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.clone());
        parts.extend(
            self.args
                .iter()
                .map(|arg| arg.to_string_lossy().into_owned()),
        );
        parts.join(" ")
    }
}

impl ScriptedRunner {
    /// Creates a new runner with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all invocations recorded so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<CommandInvocation> {
        lock(&self.invocations).clone()
    }

    /// Pushes a successful exit status.
    pub fn push_success(&self) {
        self.push_output(Some(0), "", "");
    }

    /// Pushes a failing exit code with stderr text.
    pub fn push_failure(&self, code: i32) {
        self.push_output(Some(code), "", "simulated failure");
    }

    /// Pushes a response with no exit code to simulate abnormal termination.
    pub fn push_missing_exit_code(&self) {
        self.push_output(None, "", "");
    }

    /// Pushes an explicit command output response.
    pub fn push_output(
        &self,
        code: Option<i32>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) {
        lock(&self.responses).push_back(CommandOutput {
            code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        });
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, RemoteError> {
        lock(&self.invocations).push(CommandInvocation {
            program: program.to_owned(),
            args: args.to_vec(),
        });
        lock(&self.responses)
            .pop_front()
            .ok_or_else(|| RemoteError::Spawn {
                program: program.to_owned(),
                message: String::from("no scripted response available"),
            })
    }
}

/// Answer queued on a [`ScriptedPrompter`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PromptAnswer {
    /// Index returned from [`Prompter::select`].
    Select(usize),
    /// Answer returned from [`Prompter::confirm`].
    Confirm(bool),
    /// Text returned from [`Prompter::input`].
    Input(String),
}

/// Prompter that replays queued answers and records what it was asked and
/// told. A missing or mismatched answer fails the prompt.
#[derive(Clone, Debug, Default)]
pub struct ScriptedPrompter {
    answers: Arc<Mutex<VecDeque<PromptAnswer>>>,
    prompts: Arc<Mutex<Vec<String>>>,
    messages: Arc<Mutex<Vec<String>>>,
}

impl ScriptedPrompter {
    /// Creates a prompter that answers in the given order.
    #[must_use]
    pub fn with_answers(answers: impl IntoIterator<Item = PromptAnswer>) -> Self {
        Self {
            answers: Arc::new(Mutex::new(answers.into_iter().collect())),
            ..Self::default()
        }
    }

    /// Prompt texts shown so far, in order.
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }

    /// Informational messages shown so far, in order.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        lock(&self.messages).clone()
    }

    /// Number of answers not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        lock(&self.answers).len()
    }

    fn next(&self, prompt: &str) -> Result<PromptAnswer, PromptError> {
        lock(&self.prompts).push(prompt.to_owned());
        lock(&self.answers)
            .pop_front()
            .ok_or_else(|| PromptError::Terminal(format!("no scripted answer for '{prompt}'")))
    }
}

fn mismatch(prompt: &str, answer: &PromptAnswer) -> PromptError {
    PromptError::Terminal(format!("scripted answer {answer:?} does not fit '{prompt}'"))
}

impl Prompter for ScriptedPrompter {
    fn select(&self, prompt: &str, items: &[String]) -> Result<usize, PromptError> {
        if items.is_empty() {
            return Err(PromptError::NoChoices {
                prompt: prompt.to_owned(),
            });
        }
        match self.next(prompt)? {
            PromptAnswer::Select(index) => Ok(index),
            other => Err(mismatch(prompt, &other)),
        }
    }

    fn confirm(&self, prompt: &str, _default: bool) -> Result<bool, PromptError> {
        match self.next(prompt)? {
            PromptAnswer::Confirm(answer) => Ok(answer),
            other => Err(mismatch(prompt, &other)),
        }
    }

    fn input(&self, prompt: &str) -> Result<String, PromptError> {
        match self.next(prompt)? {
            PromptAnswer::Input(text) => Ok(text),
            other => Err(mismatch(prompt, &other)),
        }
    }

    fn say(&self, message: &str) {
        lock(&self.messages).push(message.to_owned());
    }
}

/// Catalog body listing each `(type, regions)` pair.
#[must_use]
pub fn instance_types_body(entries: &[(&str, &[&str])]) -> Value {
    let data: serde_json::Map<String, Value> = entries
        .iter()
        .map(|(name, regions)| {
            let region_values: Vec<Value> = regions
                .iter()
                .map(|region| json!({ "name": region, "description": region }))
                .collect();
            let entry = json!({
                "instance_type": {
                    "name": name,
                    "description": format!("{name} description"),
                    "price_cents_per_hour": 110,
                    "specs": { "vcpus": 30, "memory_gib": 200, "storage_gib": 512, "gpus": 1 }
                },
                "regions_with_capacity_available": region_values,
            });
            ((*name).to_owned(), entry)
        })
        .collect();
    json!({ "data": data })
}

/// SSH key listing body.
#[must_use]
pub fn ssh_keys_body(names: &[&str]) -> Value {
    let keys: Vec<Value> = names
        .iter()
        .enumerate()
        .map(|(index, name)| {
            json!({ "id": format!("key-{index}"), "name": name, "public_key": "ssh-ed25519 AAAA" })
        })
        .collect();
    json!({ "data": keys })
}

fn instance_value(id: &str, hostname: Option<&str>) -> Value {
    let status = if hostname.is_some() { "active" } else { "booting" };
    json!({
        "id": id,
        "name": format!("lambda-toolio-{id}"),
        "status": status,
        "hostname": hostname,
        "ip": hostname,
        "region": { "name": "us-east-1", "description": "Virginia, USA" },
        "ssh_key_names": ["laptop"],
    })
}

/// Single-instance body; `hostname` is `null` when absent.
#[must_use]
pub fn instance_body(id: &str, hostname: Option<&str>) -> Value {
    json!({ "data": instance_value(id, hostname) })
}

/// Instance listing body with one booting instance per id.
#[must_use]
pub fn instances_body(ids: &[&str]) -> Value {
    let instances: Vec<Value> = ids.iter().map(|id| instance_value(id, None)).collect();
    json!({ "data": instances })
}

/// Launch acceptance body.
#[must_use]
pub fn launch_body(ids: &[&str]) -> Value {
    json!({ "data": { "instance_ids": ids } })
}

/// Termination acceptance body.
#[must_use]
pub fn terminate_body(ids: &[&str]) -> Value {
    let instances: Vec<Value> = ids.iter().map(|id| instance_value(id, None)).collect();
    json!({ "data": { "terminated_instances": instances } })
}

/// Error envelope body.
#[must_use]
pub fn error_body(code: &str, message: &str) -> Value {
    json!({ "error": { "code": code, "message": message } })
}
