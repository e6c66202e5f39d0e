//! Tests for error classification.

use super::*;
use rstest::rstest;

#[rstest]
#[case::by_message(
    400,
    r#"{"error":{"code":"global/invalid-parameters","message":"Not enough capacity: Insufficient capacity."}}"#,
    true
)]
#[case::by_code(
    400,
    r#"{"error":{"code":"instance-operations/launch/insufficient-capacity","message":"no room"}}"#,
    true
)]
#[case::other_400(
    400,
    r#"{"error":{"code":"global/invalid-parameters","message":"Invalid region"}}"#,
    false
)]
#[case::capacity_text_on_500(
    500,
    r#"{"error":{"code":"global/unknown","message":"insufficient capacity"}}"#,
    false
)]
#[case::raw_body(400, "insufficient capacity", true)]
fn capacity_errors_are_recognised(#[case] status: u16, #[case] body: &str, #[case] expected: bool) {
    assert_eq!(
        LambdaApiError::from_status(status, body).is_capacity_error(),
        expected
    );
}

#[rstest]
fn error_envelope_suggestion_is_appended() {
    let err = LambdaApiError::from_status(
        401,
        r#"{"error":{"code":"global/invalid-api-key","message":"API key was invalid","suggestion":"Create a new key"}}"#,
    );
    assert_eq!(
        err.to_string(),
        "API returned HTTP 401: API key was invalid (Create a new key)"
    );
}

#[rstest]
fn not_found_is_detected() {
    let err = LambdaApiError::from_status(404, "not here");
    assert!(err.is_not_found());
    assert!(!err.is_capacity_error());
    assert_eq!(
        err,
        LambdaApiError::Status {
            status: 404,
            code: None,
            message: String::from("not here"),
        }
    );
}

#[rstest]
fn cancellation_is_detected() {
    let err = LambdaApiError::cancelled("launch");
    assert!(err.is_cancelled());
    assert_eq!(err.to_string(), "launch cancelled");
}
