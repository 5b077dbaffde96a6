//! Status change logs.
//!
//! A log is the run-length encoding of a series by status code: one entry
//! per run of consecutive points sharing a status code.

use crate::probe::ProbeKind;
use crate::store::DataPoint;

use super::rollup::format_timestamp;

use serde::{Deserialize, Serialize};
use std::fmt::Display;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogStatus {
    pub code: i32,
    pub message: String,
}

/// One run of identical status codes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceLog {
    pub up: bool,
    pub disabled: bool,
    /// Start of the run
    pub time: i64,
    pub time_string: String,
    /// Seconds until the next run starts, or until the last point for the final run.
    pub duration: i64,
    pub duration_string: String,
    pub status: LogStatus,
}

/// Format seconds as "H h, M min".
pub fn duration_string(seconds: i64) -> String {
    format!("{} h, {} min", seconds / 3600, (seconds % 3600) / 60)
}

/// Collapse `points` into one entry per run of equal status codes, oldest first.
///
/// The final run is closed at the timestamp of the last point.
pub fn compress_logs<Tz>(kind: &ProbeKind, points: &[DataPoint], tz: &Tz) -> Vec<ServiceLog>
where
    Tz: chrono::TimeZone,
    Tz::Offset: Display,
{
    let entry = |first: &DataPoint, end: i64| {
        let duration = end - first.timestamp;
        ServiceLog {
            up: kind.is_up(first),
            disabled: first.is_disabled(),
            time: first.timestamp,
            time_string: format_timestamp(tz, first.timestamp),
            duration,
            duration_string: duration_string(duration),
            status: LogStatus {
                code: first.status_code,
                message: kind.status_message(first),
            },
        }
    };

    let (mut logs, open) = points.iter().fold(
        (Vec::new(), None::<&DataPoint>),
        |(mut logs, open), point| match open {
            Some(first) if first.status_code == point.status_code => (logs, Some(first)),
            Some(first) => {
                logs.push(entry(first, point.timestamp));
                (logs, Some(point))
            }
            None => (logs, Some(point)),
        },
    );

    if let (Some(first), Some(last)) = (open, points.last()) {
        logs.push(entry(first, last.timestamp));
    }

    logs
}
