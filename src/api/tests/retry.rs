//! Tests for the generic retry loop.

use super::*;
use rstest::rstest;
use serde_json::json;

#[rstest]
#[case::first_attempt(0)]
#[case::second_attempt(1)]
#[case::last_attempt(2)]
#[tokio::test]
async fn succeeds_on_the_first_good_attempt(#[case] failures: usize) {
    let transport = ScriptedTransport::new();
    let sleeper = RecordingSleeper::new();
    for _ in 0..failures {
        transport.push_network_failure();
    }
    transport.push_ok(&json!({ "data": [] }));
    let client = client_with(&transport, &sleeper);

    let value = client
        .request(Method::Get, "instances", None)
        .await
        .expect("request should succeed within the budget");

    assert_eq!(value, json!({ "data": [] }));
    assert_eq!(transport.request_count(), failures + 1);
    assert_eq!(sleeper.sleeps(), vec![RETRY_DELAY; failures]);
}

#[tokio::test]
async fn exhausted_budget_returns_the_last_failure() {
    let transport = ScriptedTransport::new();
    let sleeper = RecordingSleeper::new();
    transport.push_network_failure();
    transport.push_error(503, "global/unavailable", "try later");
    transport.push_error(500, "global/unknown", "boom");
    let client = client_with(&transport, &sleeper);

    let err = client
        .request(Method::Get, "instances", None)
        .await
        .expect_err("all attempts fail");

    assert_eq!(
        err,
        LambdaApiError::Status {
            status: 500,
            code: Some(String::from("global/unknown")),
            message: String::from("boom"),
        }
    );
    assert_eq!(transport.request_count(), 3);
    assert_eq!(sleeper.sleeps(), vec![RETRY_DELAY, RETRY_DELAY]);
}

#[tokio::test]
async fn malformed_success_body_is_not_retried() {
    let transport = ScriptedTransport::new();
    let sleeper = RecordingSleeper::new();
    transport.push_body(200, "<html>gateway</html>");
    let client = client_with(&transport, &sleeper);

    let err = client
        .request(Method::Get, "instances", None)
        .await
        .expect_err("non-JSON body should fail");

    assert!(matches!(err, LambdaApiError::Decode { .. }), "{err:?}");
    assert_eq!(transport.request_count(), 1);
    assert!(sleeper.sleeps().is_empty());
}

#[tokio::test]
async fn zero_attempts_behaves_like_one() {
    let transport = ScriptedTransport::new();
    let sleeper = RecordingSleeper::new();
    transport.push_network_failure();
    let client = client_with(&transport, &sleeper)
        .with_retry_policy(RetryPolicy::new(0, RETRY_DELAY));

    let err = client
        .request(Method::Get, "instances", None)
        .await
        .expect_err("single failure should surface");

    assert!(matches!(err, LambdaApiError::Transport { .. }));
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn request_body_and_method_reach_the_transport() {
    let transport = ScriptedTransport::new();
    let sleeper = RecordingSleeper::new();
    transport.push_ok(&json!({ "data": {} }));
    let client = client_with(&transport, &sleeper);
    let body = json!({ "instance_ids": ["i-1"] });

    client
        .request(Method::Post, "instance-operations/terminate", Some(&body))
        .await
        .expect("request should succeed");

    let requests = transport.requests();
    let request = requests.first().expect("one request");
    assert_eq!(request.method, Method::Post);
    assert_eq!(request.path, "instance-operations/terminate");
    assert_eq!(request.body.as_ref(), Some(&body));
}
