//! Ping probe implementation using the system `ping` command.

use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use tokio::process::Command;

use super::{ProbeError, ProbeReply, STATUS_REACHABLE};

/// Send a single echo request to `host`.
///
/// The reported response time is the round trip parsed from the command output.
pub async fn run_ping_probe(host: &str, timeout: Duration) -> Result<ProbeReply, ProbeError> {
    let timeout_secs = timeout.as_secs().max(1);

    let mut command = Command::new("ping");
    command
        .args(["-c", "1", "-W", &timeout_secs.to_string(), host])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = tokio::time::timeout(command_deadline(timeout), command.output())
        .await
        .map_err(|_| ProbeError::Timeout(timeout))?
        .map_err(|e| ProbeError::Command(format!("failed to execute ping: {}", e)))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("timeout")
            || stdout.contains("100% packet loss")
            || stdout.contains("100.0% packet loss")
        {
            return Err(ProbeError::Timeout(timeout));
        }
        let detail = if stderr.trim().is_empty() { stdout.trim() } else { stderr.trim() };
        return Err(ProbeError::Command(format!("ping failed: {}", detail)));
    }

    let millis = parse_ping_output(&stdout)?;
    Ok(ProbeReply {
        status_code: STATUS_REACHABLE,
        message: String::new(),
        response_time: Some(millis.round() as i64),
    })
}

/// How long the ping command may run in total.
///
/// The -W flag only bounds the wait for a reply, not name resolution.
fn command_deadline(timeout: Duration) -> Duration {
    timeout.saturating_add(Duration::from_secs(1))
}

/// Parse ping command output for the round trip in milliseconds.
fn parse_ping_output(output: &str) -> Result<f64, ProbeError> {
    // Per-packet line "time=X.XXX ms" (Linux, some macOS)
    static PER_PACKET: OnceLock<Regex> = OnceLock::new();
    let per_packet = PER_PACKET.get_or_init(|| {
        Regex::new(r"time[=<](?P<val>[0-9.]+)\s*ms").expect("static regex")
    });

    if let Some(ms) = per_packet
        .captures(output)
        .and_then(|caps| caps.name("val"))
        .and_then(|m| m.as_str().parse::<f64>().ok())
    {
        return Ok(ms);
    }

    // Summary line, average is the second field:
    // "round-trip min/avg/max/stddev = a/b/c/d ms" (macOS)
    // "rtt min/avg/max/mdev = a/b/c/d ms" (Linux)
    static SUMMARY: OnceLock<Regex> = OnceLock::new();
    let summary = SUMMARY.get_or_init(|| {
        Regex::new(r"(?:round-trip|rtt)\s+min/avg/max/(?:stddev|mdev)\s*=\s*([0-9.]+)/([0-9.]+)/([0-9.]+)")
            .expect("static regex")
    });

    if let Some(ms) = summary
        .captures(output)
        .and_then(|caps| caps.get(2))
        .and_then(|m| m.as_str().parse::<f64>().ok())
    {
        return Ok(ms);
    }

    Err(ProbeError::Command(format!(
        "failed to parse ping output: {}",
        output
    )))
}
