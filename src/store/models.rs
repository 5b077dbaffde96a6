//! Historic data model types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Status code recorded when a service is disabled and was not probed.
pub const STATUS_DISABLED: i32 = -1;

/// A single raw probe result as stored in the historic data file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPoint {
    /// Unix timestamp in seconds
    #[serde(rename = "t")]
    pub timestamp: i64,
    #[serde(rename = "c")]
    pub status_code: i32,
    /// Response time in milliseconds, or -1 for disabled services
    #[serde(rename = "r")]
    pub response_time: i64,
    /// Only set for non-standard errors, empty in most cases.
    #[serde(rename = "m", default)]
    pub status_message: String,
}

impl DataPoint {
    pub fn new(timestamp: i64, status_code: i32, response_time: i64, status_message: impl Into<String>) -> Self {
        Self {
            timestamp,
            status_code,
            response_time,
            status_message: status_message.into(),
        }
    }

    /// Placeholder point for a service that was skipped because it is disabled.
    pub fn disabled(timestamp: i64) -> Self {
        Self::new(timestamp, STATUS_DISABLED, -1, "The service is disabled")
    }

    pub fn is_disabled(&self) -> bool {
        self.status_code == STATUS_DISABLED
    }
}

/// Every service's points keyed by host, in insertion (time) order.
pub type HistoricSeries = BTreeMap<String, Vec<DataPoint>>;
