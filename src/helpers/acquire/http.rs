//! HTTP plumbing shared by the fetcher and the manifest client
//!
//! ## Timeouts
//!
//! Set `BTP_HTTP_TIMEOUT` (seconds) to change the connect/read timeout:
//! ```bash
//! export BTP_HTTP_TIMEOUT=120
//! ```

use serde::de::DeserializeOwned;
use std::time::Duration;

/// Default HTTP timeout in seconds
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

const USER_AGENT: &str = concat!("buildtools-plus/", env!("CARGO_PKG_VERSION"));

/// Timeout from `BTP_HTTP_TIMEOUT`, or the default.
pub fn timeout_from_env() -> Duration {
    let secs = std::env::var("BTP_HTTP_TIMEOUT")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);
    clamp_timeout(secs)
}

/// Clamp to a reasonable range (5-600 seconds)
pub fn clamp_timeout(secs: u64) -> Duration {
    Duration::from_secs(secs.clamp(5, 600))
}

/// Build the agent used for every request.
///
/// The timeout bounds connecting and each individual read, not the whole
/// transfer, so large artifacts on slow links still complete.
pub fn agent(timeout: Duration) -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout_connect(timeout)
        .timeout_read(timeout)
        .user_agent(USER_AGENT)
        .build()
}

/// Turn a ureq error into a one-line reason.
pub fn describe_error(err: ureq::Error) -> String {
    match err {
        ureq::Error::Status(code, response) => {
            format!("server returned HTTP {} {}", code, response.status_text())
        }
        ureq::Error::Transport(transport) => transport.to_string(),
    }
}

/// GET a URL and deserialize the JSON body.
pub fn get_json<T: DeserializeOwned>(agent: &ureq::Agent, url: &str) -> Result<T, GetJsonError> {
    let response = agent.get(url).call().map_err(|e| match e {
        ureq::Error::Status(404, _) => GetJsonError::NotFound,
        other => GetJsonError::Transfer(describe_error(other)),
    })?;

    response
        .into_json::<T>()
        .map_err(|e| GetJsonError::Malformed(e.to_string()))
}

/// Why a JSON GET failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GetJsonError {
    NotFound,
    Transfer(String),
    Malformed(String),
}
