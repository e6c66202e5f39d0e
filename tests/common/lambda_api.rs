//! Shared settings for tests that talk to a `wiremock` stand-in for the
//! Lambda Cloud API.
//!
//! Integration tests are compiled as separate crates, so this helper is
//! shared via:
//!
//! ```rust
//! #[path = "common/lambda_api.rs"]
//! mod lambda_api;
//! ```

use wiremock::MockServer;

/// API key handed to the client under test.
pub const API_KEY: &str = "secret_abc";

/// Authorization header value the client must send for [`API_KEY`].
pub const BEARER: &str = "Bearer secret_abc";

/// Base URL that routes the client's calls to `server` under `/api/v1`.
pub fn base_url(server: &MockServer) -> String {
    format!("{}/api/v1", server.uri())
}
