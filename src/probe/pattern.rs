//! Pattern probe: an HTTPS GET whose body must match a regular expression.

use regex::Regex;
use std::time::Duration;

use super::https::{https_url, request_error};
use super::{is_http_success, ProbeError, ProbeReply, STATUS_PATTERN_MISMATCH};

/// Fetch `https://host+path` and look for `pattern` in the body.
///
/// Non-success statuses are reported as is without reading the body.
pub async fn run_pattern_probe(
    client: &reqwest::Client,
    host: &str,
    path: &str,
    pattern: &Regex,
    timeout: Duration,
) -> Result<ProbeReply, ProbeError> {
    let url = https_url(host, path);

    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| request_error(e, timeout))?;

    let status = response.status().as_u16() as i32;
    if !is_http_success(status) {
        return Ok(ProbeReply::status(status));
    }

    let body = response
        .text()
        .await
        .map_err(|e| request_error(e, timeout))?;

    Ok(match_body(status, &body, pattern))
}

fn match_body(status: i32, body: &str, pattern: &Regex) -> ProbeReply {
    if pattern.is_match(body) {
        ProbeReply::status(status)
    } else {
        ProbeReply {
            status_code: STATUS_PATTERN_MISMATCH,
            message: format!("pattern {} not found", pattern.as_str()),
            response_time: None,
        }
    }
}
