//! Probe module for service reachability checks.
//!
//! Supports HTTPS, Ping, Port and Pattern probes. A probe never fails:
//! network errors are encoded into the returned [`DataPoint`].

mod https;
mod pattern;
mod ping;
mod port;

pub use https::*;
pub use pattern::*;
pub use ping::*;
pub use port::*;

use crate::store::DataPoint;

use chrono::Utc;
use regex::Regex;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Status code for a ping or port probe that got an answer.
pub const STATUS_REACHABLE: i32 = 0;
/// Status code for a request that failed before a status was received.
pub const STATUS_REQUEST_FAILED: i32 = 600;
/// Status code for a pattern probe whose body did not match.
pub const STATUS_PATTERN_MISMATCH: i32 = 601;

/// Probe error types.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),
    #[error("network error: {0}")]
    Network(String),
    #[error("command failed: {0}")]
    Command(String),
}

/// What a successful probe observed.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeReply {
    pub status_code: i32,
    pub message: String,
    /// Measured round trip in milliseconds, if the probe knows better than wall time.
    pub response_time: Option<i64>,
}

impl ProbeReply {
    pub fn status(status_code: i32) -> Self {
        Self {
            status_code,
            message: String::new(),
            response_time: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpsProbe {
    pub path: String,
    /// When set, only these codes count as up.
    pub valid_status_codes: Option<Vec<i32>>,
}

#[derive(Debug, Clone)]
pub struct PingProbe;

#[derive(Debug, Clone)]
pub struct PortProbe {
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct PatternProbe {
    pub path: String,
    pub pattern: Regex,
}

/// The closed set of probe kinds a service can be checked with.
#[derive(Debug, Clone)]
pub enum ProbeKind {
    Https(HttpsProbe),
    Ping(PingProbe),
    Port(PortProbe),
    Pattern(PatternProbe),
}

impl ProbeKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            ProbeKind::Https(_) => "https",
            ProbeKind::Ping(_) => "ping",
            ProbeKind::Port(_) => "port",
            ProbeKind::Pattern(_) => "pattern",
        }
    }

    /// Whether `point` counts as up for this kind of probe.
    pub fn is_up(&self, point: &DataPoint) -> bool {
        if point.is_disabled() {
            return false;
        }

        match self {
            ProbeKind::Https(https) => match &https.valid_status_codes {
                Some(codes) => codes.contains(&point.status_code),
                None => is_http_success(point.status_code),
            },
            ProbeKind::Pattern(_) => is_http_success(point.status_code),
            ProbeKind::Ping(_) | ProbeKind::Port(_) => point.status_code == STATUS_REACHABLE,
        }
    }

    /// Human readable status for `point`.
    ///
    /// HTTP based probes prefer the canonical reason phrase over the stored message.
    pub fn status_message(&self, point: &DataPoint) -> String {
        if point.is_disabled() {
            if point.status_message.is_empty() {
                return "The service is disabled".to_string();
            }
            return point.status_message.clone();
        }

        match self {
            ProbeKind::Https(_) | ProbeKind::Pattern(_) => u16::try_from(point.status_code)
                .ok()
                .and_then(|code| reqwest::StatusCode::from_u16(code).ok())
                .and_then(|status| status.canonical_reason())
                .map(str::to_string)
                .unwrap_or_else(|| point.status_message.clone()),
            ProbeKind::Ping(_) | ProbeKind::Port(_) => {
                if point.status_code == STATUS_REACHABLE {
                    "Reachable".to_string()
                } else {
                    point.status_message.clone()
                }
            }
        }
    }
}

/// HTTP success or redirect (200 through 308 inclusive).
pub fn is_http_success(status_code: i32) -> bool {
    (200..=308).contains(&status_code)
}

/// A configured service.
#[derive(Debug, Clone)]
pub struct ServiceDefinition {
    pub name: String,
    pub host: String,
    pub disabled: bool,
    pub kind: ProbeKind,
}

/// Runs probes with a shared HTTP client and a bounded timeout.
#[derive(Debug, Clone)]
pub struct Prober {
    client: reqwest::Client,
    timeout: Duration,
}

impl Prober {
    pub fn new(timeout: Duration) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProbeError::Network(e.to_string()))?;

        Ok(Self { client, timeout })
    }

    /// Probe `service` once.
    ///
    /// Disabled services are not contacted; a disabled placeholder is returned instead.
    pub async fn probe(&self, service: &ServiceDefinition) -> DataPoint {
        if service.disabled {
            return DataPoint::disabled(Utc::now().timestamp());
        }

        let start = Instant::now();
        let result = match &service.kind {
            ProbeKind::Https(https) => {
                run_https_probe(&self.client, &service.host, &https.path, self.timeout).await
            }
            ProbeKind::Ping(_) => run_ping_probe(&service.host, self.timeout).await,
            ProbeKind::Port(port) => run_port_probe(&service.host, port.port, self.timeout).await,
            ProbeKind::Pattern(pattern) => {
                run_pattern_probe(
                    &self.client,
                    &service.host,
                    &pattern.path,
                    &pattern.pattern,
                    self.timeout,
                )
                .await
            }
        };
        let elapsed = start.elapsed().as_millis() as i64;
        let timestamp = Utc::now().timestamp();

        match result {
            // Sub-millisecond answers still count as a latency sample.
            Ok(reply) => DataPoint::new(
                timestamp,
                reply.status_code,
                reply.response_time.unwrap_or(elapsed).max(1),
                reply.message,
            ),
            Err(e) => DataPoint::new(timestamp, STATUS_REQUEST_FAILED, elapsed, e.to_string()),
        }
    }
}
