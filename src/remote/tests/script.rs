//! Tests for script invocation and outcome reporting.

use super::super::*;
use crate::test_support::ScriptedRunner;
use camino::Utf8PathBuf;
use rstest::{fixture, rstest};

fn strings(args: &[OsString]) -> Vec<String> {
    args.iter()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect()
}

#[fixture]
fn script() -> Utf8PathBuf {
    Utf8PathBuf::from("/home/ubuntu/train.py")
}

#[rstest]
fn zero_exit_completes(script: Utf8PathBuf) {
    let runner = ScriptedRunner::new();
    runner.push_success();
    let scripts =
        ScriptRunner::new(RemoteConfig::default(), runner.clone()).expect("config should validate");

    let outcome = scripts.run_script("1.2.3.4", &script);

    assert_eq!(outcome, ScriptOutcome::Completed);
    let invocations = runner.invocations();
    let invocation = invocations.first().expect("ssh should be invoked");
    assert_eq!(invocation.program, "ssh");
    assert_eq!(
        strings(&invocation.args),
        vec![
            "-p",
            "22",
            "-o",
            "BatchMode=yes",
            "-o",
            "StrictHostKeyChecking=no",
            "-o",
            "UserKnownHostsFile=/dev/null",
            "ubuntu@1.2.3.4",
            "python /home/ubuntu/train.py",
        ]
    );
}

#[rstest]
#[case::nonzero(Some(3), "remote script exited with status 3: simulated failure")]
#[case::signalled(None, "remote script exited with status unknown")]
fn unsuccessful_exit_fails_without_raising(
    script: Utf8PathBuf,
    #[case] code: Option<i32>,
    #[case] expected_message: &str,
) {
    let runner = ScriptedRunner::new();
    match code {
        Some(value) => runner.push_failure(value),
        None => runner.push_missing_exit_code(),
    }
    let scripts =
        ScriptRunner::new(RemoteConfig::default(), runner).expect("config should validate");

    let outcome = scripts.run_script("1.2.3.4", &script);

    assert_eq!(
        outcome,
        ScriptOutcome::Failed {
            exit_code: code,
            message: expected_message.to_owned(),
        }
    );
    assert!(!outcome.is_success());
}

#[rstest]
fn spawn_failure_is_reported_as_failed(script: Utf8PathBuf) {
    let runner = ScriptedRunner::new();
    let scripts =
        ScriptRunner::new(RemoteConfig::default(), runner).expect("config should validate");

    let outcome = scripts.run_script("1.2.3.4", &script);

    match outcome {
        ScriptOutcome::Failed {
            exit_code: None,
            message,
        } => assert!(message.contains("failed to spawn ssh"), "{message}"),
        other => panic!("expected spawn failure, got {other:?}"),
    }
}

#[rstest]
#[case::blank_host("  ", "/home/ubuntu/train.py")]
#[case::blank_script("1.2.3.4", "")]
fn blank_arguments_fail_without_running_ssh(#[case] host: &str, #[case] path: &str) {
    let runner = ScriptedRunner::new();
    let scripts = ScriptRunner::new(RemoteConfig::default(), runner.clone())
        .expect("config should validate");

    let outcome = scripts.run_script(host, Utf8Path::new(path));

    assert!(matches!(outcome, ScriptOutcome::Failed { .. }));
    assert!(runner.invocations().is_empty());
}

#[rstest]
fn custom_settings_flow_into_the_ssh_command() {
    let cfg = RemoteConfig {
        ssh_bin: String::from("/usr/local/bin/ssh"),
        ssh_user: String::from("lambda"),
        ssh_port: 2222,
        interpreter: String::from("python3 -u"),
        ssh_batch_mode: false,
        ssh_strict_host_key_checking: true,
        ssh_known_hosts_file: String::new(),
        ssh_identity_file: Some(String::from("/keys/lambda")),
    };
    let runner = ScriptedRunner::new();
    runner.push_success();
    let scripts = ScriptRunner::new(cfg, runner.clone()).expect("config should validate");

    let outcome = scripts.run_script("gpu.example", Utf8Path::new("jobs/my job.py"));

    assert!(outcome.is_success());
    let invocations = runner.invocations();
    let invocation = invocations.first().expect("ssh should be invoked");
    assert_eq!(invocation.program, "/usr/local/bin/ssh");
    assert_eq!(
        strings(&invocation.args),
        vec![
            "-p",
            "2222",
            "-i",
            "/keys/lambda",
            "lambda@gpu.example",
            "python3 -u 'jobs/my job.py'",
        ]
    );
}
