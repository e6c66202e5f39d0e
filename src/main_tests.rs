//! Unit tests for the `lambda-toolio` CLI binary implementation.
//!
//! Keeping these tests in a separate module helps keep `src/main.rs` focused
//! on wiring.

use std::time::Duration;

use clap::CommandFactory;
use clap_mangen::Man;

use super::*;
use crate::test_helpers::EnvGuard;
use lambda_toolio::WaitPolicy;
use lambda_toolio::test_support::{
    RecordingSleeper, ScriptedRunner, ScriptedTransport, instance_body, instance_types_body,
    instances_body, launch_body, ssh_keys_body, terminate_body,
};
use rstest::rstest;

type TestClient = LambdaClient<ScriptedTransport, RecordingSleeper>;

fn client(transport: &ScriptedTransport) -> TestClient {
    LambdaClient::from_parts(transport.clone(), RecordingSleeper::new()).with_wait_policy(
        WaitPolicy {
            settle: Duration::from_secs(1),
            poll_interval: Duration::from_secs(1),
            timeout: Duration::from_secs(5),
        },
    )
}

fn rendered(buffer: Vec<u8>) -> String {
    String::from_utf8(buffer).expect("utf8")
}

fn launch_command(wait: bool) -> LaunchCommand {
    LaunchCommand {
        instance_type: String::from("gpu_1x_a100"),
        region: String::from("us-east-1"),
        ssh_key: String::from("laptop"),
        wait,
    }
}

#[tokio::test]
async fn types_lists_only_entries_with_capacity() {
    let transport = ScriptedTransport::new();
    transport.push_ok(&instance_types_body(&[
        ("gpu_1x_a100", &["us-east-1", "us-west-1"]),
        ("gpu_8x_h100", &[]),
    ]));
    let mut out = Vec::new();

    list_types(&client(&transport), &mut out)
        .await
        .expect("listing should succeed");

    assert_eq!(
        rendered(out),
        "gpu_1x_a100\tgpu_1x_a100 description\t$1.10/hr\tus-east-1,us-west-1\n"
    );
}

#[tokio::test]
async fn keys_reports_an_empty_account() {
    let transport = ScriptedTransport::new();
    transport.push_ok(&ssh_keys_body(&[]));
    let mut out = Vec::new();

    list_keys(&client(&transport), &mut out)
        .await
        .expect("listing should succeed");

    assert_eq!(rendered(out), "no SSH keys registered\n");
}

#[tokio::test]
async fn instances_show_state_and_placeholder_hostname() {
    let transport = ScriptedTransport::new();
    transport.push_ok(&instances_body(&["i-1"]));
    let mut out = Vec::new();

    list_instances(&client(&transport), &mut out)
        .await
        .expect("listing should succeed");

    assert_eq!(rendered(out), "i-1\tprovisioning\t-\tus-east-1\t-\n");
}

#[rstest]
#[case::without_wait(false, "i-123\n")]
#[case::with_wait(true, "i-123\n1.2.3.4\n")]
#[tokio::test]
async fn launch_prints_the_id_and_optionally_the_hostname(
    #[case] wait: bool,
    #[case] expected: &str,
) {
    let transport = ScriptedTransport::new();
    transport.push_ok(&launch_body(&["i-123"]));
    transport.push_ok(&instance_body("i-123", Some("1.2.3.4")));
    let mut out = Vec::new();

    launch(
        &client(&transport),
        &launch_command(wait),
        &CancellationToken::new(),
        &mut out,
    )
    .await
    .expect("launch should succeed");

    assert_eq!(rendered(out), expected);
}

#[tokio::test]
async fn cancelled_launch_exits_with_interrupt_status() {
    let transport = ScriptedTransport::new();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let mut out = Vec::new();

    let err = launch(&client(&transport), &launch_command(false), &cancel, &mut out)
        .await
        .expect_err("launch should be cancelled");

    assert_eq!(err.exit_code(), EXIT_INTERRUPTED);
    assert!(out.is_empty());
}

#[tokio::test(start_paused = true)]
async fn interrupt_abandons_a_hung_listing() {
    let transport = ScriptedTransport::new().with_latency(Duration::from_secs(3600));
    transport.push_ok(&instance_types_body(&[("gpu_1x_a100", &["us-east-1"])]));
    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        interrupt.cancel();
    });
    let mut out = Vec::new();

    let err = until_interrupted(&cancel, list_types(&client(&transport), &mut out))
        .await
        .expect_err("listing should be abandoned");

    assert!(matches!(err, CliError::Interrupted));
    assert_eq!(err.exit_code(), EXIT_INTERRUPTED);
    assert!(out.is_empty());
}

#[rstest]
#[case::booting(None, "\n")]
#[case::ready(Some("1.2.3.4"), "1.2.3.4\n")]
#[tokio::test]
async fn hostname_prints_snapshot_or_blank_line(
    #[case] hostname: Option<&str>,
    #[case] expected: &str,
) {
    let transport = ScriptedTransport::new();
    transport.push_ok(&instance_body("i-7", hostname));
    let mut out = Vec::new();
    let command = HostnameCommand {
        instance_id: String::from("i-7"),
    };

    show_hostname(&client(&transport), &command, &mut out)
        .await
        .expect("describe should succeed");

    assert_eq!(rendered(out), expected);
}

#[tokio::test]
async fn terminate_reports_each_terminated_instance() {
    let transport = ScriptedTransport::new();
    transport.push_ok(&instances_body(&["i-1", "i-2"]));
    transport.push_ok(&terminate_body(&["i-1", "i-2"]));
    let mut out = Vec::new();

    terminate(&client(&transport), &mut out)
        .await
        .expect("termination should succeed");

    assert_eq!(rendered(out), "terminated 2 instance(s)\ni-1\ni-2\n");
}

#[tokio::test]
async fn terminate_reports_nothing_to_do() {
    let transport = ScriptedTransport::new();
    transport.push_ok(&instances_body(&[]));
    let mut out = Vec::new();

    terminate(&client(&transport), &mut out)
        .await
        .expect("listing should succeed");

    assert_eq!(rendered(out), "nothing to terminate\n");
    assert_eq!(transport.request_count(), 1);
}

#[rstest]
#[case::completed(Some(0), "script completed\n")]
#[case::failed(Some(1), "script failed: remote script exited with status 1\n")]
fn run_script_reports_outcome_without_failing(
    #[case] code: Option<i32>,
    #[case] expected: &str,
) {
    let runner = ScriptedRunner::new();
    runner.push_output(code, "", "");
    let scripts = ScriptRunner::new(RemoteConfig::default(), runner).expect("config");
    let command = RunScriptCommand {
        hostname: String::from("1.2.3.4"),
        script: String::from("train.py"),
    };
    let mut out = Vec::new();

    run_script(&scripts, &command, &mut out).expect("script failures are not errors");

    assert_eq!(rendered(out), expected);
}

#[tokio::test]
async fn blank_api_key_is_a_configuration_error() {
    let _guard = EnvGuard::set_var("LAMBDA_API_KEY", "   ").await;

    let err = load_client().expect_err("blank key should be rejected");

    assert!(
        err.to_string().contains("LAMBDA_API_KEY"),
        "unexpected error: {err}"
    );
    assert_eq!(err.exit_code(), EXIT_FAILURE);
}

#[test]
fn write_error_writes_cli_error() {
    let mut buf = Vec::new();
    let err = CliError::Config(String::from("missing Lambda Cloud API key"));
    write_error(&mut buf, &err);
    assert_eq!(
        rendered(buf),
        "configuration error: missing Lambda Cloud API key\n"
    );
}

#[test]
fn cli_parses_launch_flags() {
    let cli = Cli::try_parse_from([
        "lambda-toolio",
        "launch",
        "--instance-type",
        "gpu_1x_a100",
        "--region",
        "us-east-1",
        "--ssh-key",
        "laptop",
        "--wait",
    ])
    .expect("arguments should parse");

    let Cli::Launch(command) = cli else {
        panic!("expected launch, got {cli:?}");
    };
    assert_eq!(command.instance_type, "gpu_1x_a100");
    assert!(command.wait);
}

#[test]
fn every_subcommand_renders_its_own_manual_page() {
    let root = Cli::command();
    for subcommand in root.get_subcommands() {
        assert!(
            subcommand.get_about().is_some(),
            "{} has no summary",
            subcommand.get_name()
        );
        let bin_name = format!("lambda-toolio {}", subcommand.get_name());
        let mut buffer = Vec::new();
        Man::new(subcommand.clone().bin_name(bin_name.clone()))
            .render_synopsis_section(&mut buffer)
            .expect("synopsis should render");
        let synopsis = rendered(buffer).replace("\\-", "-");
        assert!(
            synopsis.contains(&bin_name),
            "synopsis for {bin_name} was: {synopsis}"
        );
    }
}
