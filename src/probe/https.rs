//! HTTPS probe implementation.

use std::time::Duration;
use super::{ProbeError, ProbeReply};

/// Build the URL probed for `host` and `path`.
pub fn https_url(host: &str, path: &str) -> String {
    format!("https://{}{}", host, path)
}

/// Map a reqwest error onto a probe error.
pub(crate) fn request_error(e: reqwest::Error, timeout: Duration) -> ProbeError {
    if e.is_timeout() {
        ProbeError::Timeout(timeout)
    } else {
        ProbeError::Network(e.to_string())
    }
}

/// Run an HTTPS GET against `host` and report the response status.
///
/// Any status is a successful probe; deciding whether it means up is left
/// to the probe kind.
pub async fn run_https_probe(
    client: &reqwest::Client,
    host: &str,
    path: &str,
    timeout: Duration,
) -> Result<ProbeReply, ProbeError> {
    let url = https_url(host, path);

    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| request_error(e, timeout))?;

    Ok(ProbeReply::status(response.status().as_u16() as i32))
}
