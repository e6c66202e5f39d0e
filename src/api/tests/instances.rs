//! Tests for instance queries and termination.

use super::*;
use crate::test_support::{instance_body, instances_body, terminate_body};
use rstest::rstest;
use serde_json::json;

#[rstest]
#[case::provisioning(None, None, InstanceState::Provisioning)]
#[case::ready(Some("1.2.3.4"), Some("1.2.3.4"), InstanceState::Ready)]
#[tokio::test]
async fn hostname_is_a_single_snapshot(
    #[case] reported: Option<&str>,
    #[case] expected: Option<&str>,
    #[case] state: InstanceState,
) {
    let transport = ScriptedTransport::new();
    let sleeper = RecordingSleeper::new();
    transport.push_ok(&instance_body("i-123", reported));
    transport.push_ok(&instance_body("i-123", reported));
    let client = client_with(&transport, &sleeper);
    let id = InstanceId::from("i-123");

    let hostname = client
        .instance_hostname(&id)
        .await
        .expect("describe should succeed");
    let instance = client
        .describe_instance(&id)
        .await
        .expect("describe should succeed");

    assert_eq!(hostname.as_deref(), expected);
    assert_eq!(instance.state(), state);
    assert_eq!(paths(&transport), vec!["instances/i-123", "instances/i-123"]);
    assert!(sleeper.sleeps().is_empty());
}

#[tokio::test]
async fn blank_hostname_counts_as_absent() {
    let transport = ScriptedTransport::new();
    let sleeper = RecordingSleeper::new();
    transport.push_ok(&instance_body("i-1", Some("  ")));
    let client = client_with(&transport, &sleeper);

    let hostname = client
        .instance_hostname(&InstanceId::from("i-1"))
        .await
        .expect("describe should succeed");

    assert_eq!(hostname, None);
}

#[tokio::test]
async fn unknown_instance_reports_not_found() {
    let transport = ScriptedTransport::new();
    let sleeper = RecordingSleeper::new();
    let client = client_with(&transport, &sleeper).with_retry_policy(RetryPolicy::single_attempt());
    transport.push_error(404, "global/object-does-not-exist", "Instance not found");

    let err = client
        .describe_instance(&InstanceId::from("i-missing"))
        .await
        .expect_err("unknown id should fail");

    assert!(err.is_not_found());
}

#[tokio::test]
async fn blank_instance_id_is_rejected_locally() {
    let transport = ScriptedTransport::new();
    let sleeper = RecordingSleeper::new();
    let client = client_with(&transport, &sleeper);

    let err = client
        .describe_instance(&InstanceId::from(" "))
        .await
        .expect_err("blank id should fail");

    assert!(matches!(err, LambdaApiError::Validation(_)));
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn terminate_all_with_no_instances_makes_one_call() {
    let transport = ScriptedTransport::new();
    let sleeper = RecordingSleeper::new();
    transport.push_ok(&instances_body(&[]));
    let client = client_with(&transport, &sleeper);

    let outcome = client.terminate_all().await.expect("listing should succeed");

    assert_eq!(outcome, TerminateOutcome::NothingToTerminate);
    assert_eq!(paths(&transport), vec!["instances"]);
}

#[tokio::test]
async fn terminate_all_batches_every_id_into_one_call() {
    let transport = ScriptedTransport::new();
    let sleeper = RecordingSleeper::new();
    transport.push_ok(&instances_body(&["i-1", "i-2", "i-3"]));
    transport.push_ok(&terminate_body(&["i-1", "i-2", "i-3"]));
    let client = client_with(&transport, &sleeper);

    let outcome = client.terminate_all().await.expect("termination should succeed");

    let TerminateOutcome::Terminated(instances) = outcome else {
        panic!("expected Terminated, got {outcome:?}");
    };
    assert_eq!(instances.len(), 3);
    assert_eq!(
        paths(&transport),
        vec!["instances", "instance-operations/terminate"]
    );
    let requests = transport.requests();
    let terminate = requests.last().expect("terminate request");
    assert_eq!(terminate.method, Method::Post);
    assert_eq!(
        terminate.body,
        Some(json!({ "instance_ids": ["i-1", "i-2", "i-3"] }))
    );
}

#[tokio::test]
async fn terminate_without_ids_is_rejected_locally() {
    let transport = ScriptedTransport::new();
    let sleeper = RecordingSleeper::new();
    let client = client_with(&transport, &sleeper);

    let err = client.terminate(&[]).await.expect_err("empty batch");

    assert!(matches!(err, LambdaApiError::Validation(_)));
    assert_eq!(transport.request_count(), 0);
}
