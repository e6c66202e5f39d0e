//! Unit tests for the Lambda Cloud client.
//!
//! Every test drives the client through [`ScriptedTransport`] and
//! [`RecordingSleeper`], so nothing touches the network or waits in real
//! time.

use std::time::Duration;

use super::*;
use crate::test_support::{RecordingSleeper, ScriptedTransport};

mod errors;
mod instances;
mod retry;

type TestClient = LambdaClient<ScriptedTransport, RecordingSleeper>;

const RETRY_DELAY: Duration = Duration::from_millis(250);
const CAPACITY_DELAY: Duration = Duration::from_secs(2);

fn client_with(transport: &ScriptedTransport, sleeper: &RecordingSleeper) -> TestClient {
    LambdaClient::from_parts(transport.clone(), sleeper.clone())
        .with_retry_policy(RetryPolicy::new(3, RETRY_DELAY))
        .with_capacity_retry_delay(CAPACITY_DELAY)
}

fn paths(transport: &ScriptedTransport) -> Vec<String> {
    transport
        .requests()
        .into_iter()
        .map(|request| request.path)
        .collect()
}
