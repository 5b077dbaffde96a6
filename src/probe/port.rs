//! TCP port probe.

use std::time::{Duration, Instant};
use tokio::net::TcpStream;

use super::{ProbeError, ProbeReply, STATUS_REACHABLE};

/// Open a TCP connection to `host:port` within `timeout`.
pub async fn run_port_probe(host: &str, port: u16, timeout: Duration) -> Result<ProbeReply, ProbeError> {
    let start = Instant::now();

    let stream = tokio::time::timeout(timeout, TcpStream::connect((host, port)))
        .await
        .map_err(|_| ProbeError::Timeout(timeout))?
        .map_err(|e| ProbeError::Network(format!("failed to connect to {}:{}: {}", host, port, e)))?;
    let elapsed = start.elapsed().as_millis() as i64;
    drop(stream);

    Ok(ProbeReply {
        status_code: STATUS_REACHABLE,
        message: String::new(),
        response_time: Some(elapsed),
    })
}
