//! Daily uptime rollups, uptime windows and response time samples.

use crate::probe::ProbeKind;
use crate::store::DataPoint;

use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::ops::Range;

/// Number of days covered by the daily statistics.
pub const DAYS: usize = 90;

/// Marks a day or window without any usable data.
pub const NO_DATA: f64 = -1.0;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Window lengths in days, matching the fields of [`UptimeStatistics`].
pub const UPTIME_WINDOWS: [usize; 4] = [1, 7, 30, 90];

/// Average uptime over the last 1, 7, 30 and 90 days.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UptimeStatistics {
    #[serde(rename = "1")]
    pub one_day: f64,
    #[serde(rename = "7")]
    pub seven_days: f64,
    #[serde(rename = "30")]
    pub thirty_days: f64,
    #[serde(rename = "90")]
    pub ninety_days: f64,
}

impl UptimeStatistics {
    pub fn no_data() -> Self {
        Self::from_values([NO_DATA; 4])
    }

    pub fn from_values(values: [f64; 4]) -> Self {
        Self {
            one_day: values[0],
            seven_days: values[1],
            thirty_days: values[2],
            ninety_days: values[3],
        }
    }

    pub fn values(&self) -> [f64; 4] {
        [self.one_day, self.seven_days, self.thirty_days, self.ninety_days]
    }
}

/// A response time sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseTime {
    /// Milliseconds
    pub value: i64,
    pub time: i64,
    pub time_string: String,
}

/// Round to five decimal places, halves away from zero.
pub fn round(value: f64) -> f64 {
    (value * 100_000.0).round() / 100_000.0
}

/// Points with a timestamp in `range`.
///
/// `points` must be in ascending timestamp order.
pub fn points_in(points: &[DataPoint], range: Range<i64>) -> &[DataPoint] {
    let start = points.partition_point(|p| p.timestamp < range.start);
    let end = points.partition_point(|p| p.timestamp < range.end);
    &points[start..end.max(start)]
}

/// The instant local midnight starts on `date` in `tz`.
fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> i64 {
    let midnight = date.and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&midnight).earliest() {
        Some(dt) => dt.timestamp(),
        // Midnight skipped by a DST change, the day starts an hour later.
        None => tz
            .from_local_datetime(&(midnight + ChronoDuration::hours(1)))
            .earliest()
            .map(|dt| dt.timestamp())
            .unwrap_or_else(|| midnight.and_utc().timestamp()),
    }
}

/// Half-open day windows for offsets `0..DAYS`, today first.
pub fn day_windows<Tz: TimeZone>(now: &DateTime<Tz>) -> Vec<Range<i64>> {
    let tz = now.timezone();
    let today = now.date_naive();

    (0..DAYS as i64)
        .map(|offset| {
            let start = local_midnight(&tz, today - ChronoDuration::days(offset));
            start..start + SECONDS_PER_DAY
        })
        .collect()
}

/// Labels for the day windows, today first.
pub fn day_labels<Tz: TimeZone>(now: &DateTime<Tz>) -> Vec<String> {
    let today = now.date_naive();
    (0..DAYS as i64)
        .map(|offset| (today - ChronoDuration::days(offset)).format("%B %d, %Y").to_string())
        .collect()
}

/// Fraction of non-disabled points that are up.
///
/// Disabled points are left out entirely; [`NO_DATA`] when nothing remains.
pub fn uptime_ratio(kind: &ProbeKind, points: &[DataPoint]) -> f64 {
    let (up, counted) = points
        .iter()
        .filter(|p| !p.is_disabled())
        .fold((0usize, 0usize), |(up, counted), p| {
            (up + kind.is_up(p) as usize, counted + 1)
        });

    if counted == 0 {
        return NO_DATA;
    }
    round(up as f64 / counted as f64)
}

/// Uptime ratio for each day window.
pub fn daily_uptime(kind: &ProbeKind, points: &[DataPoint], windows: &[Range<i64>]) -> Vec<f64> {
    windows
        .iter()
        .map(|window| uptime_ratio(kind, points_in(points, window.clone())))
        .collect()
}

/// Mean of the values that carry data, or [`NO_DATA`].
pub fn average(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, count) = values
        .into_iter()
        .filter(|v| *v >= 0.0)
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));

    if count == 0 {
        return NO_DATA;
    }
    round(sum / count as f64)
}

/// Average the first 1, 7, 30 and 90 daily values.
pub fn uptime_windows(daily: &[f64]) -> UptimeStatistics {
    UptimeStatistics::from_values(
        UPTIME_WINDOWS.map(|days| average(daily.iter().take(days).copied())),
    )
}

/// Response times of the last 24 hours, oldest first.
///
/// Non-positive values are placeholders for disabled or failed probes and are skipped.
pub fn response_times<Tz>(points: &[DataPoint], now: &DateTime<Tz>) -> Vec<ResponseTime>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let to = now.timestamp();
    let tz = now.timezone();

    points_in(points, to - SECONDS_PER_DAY..to + 1)
        .iter()
        .filter(|p| p.response_time > 0)
        .map(|p| ResponseTime {
            value: p.response_time,
            time: p.timestamp,
            time_string: format_timestamp(&tz, p.timestamp),
        })
        .collect()
}

/// Format a timestamp as "January 02, 2006, 15:04" in `tz`.
pub fn format_timestamp<Tz>(tz: &Tz, timestamp: i64) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    tz.timestamp_opt(timestamp, 0)
        .earliest()
        .map(|dt| dt.format("%B %d, %Y, %H:%M").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::HttpsProbe;
    use chrono::{FixedOffset, Utc};

    fn https() -> ProbeKind {
        ProbeKind::Https(HttpsProbe {
            path: String::new(),
            valid_status_codes: None,
        })
    }

    #[test]
    fn test_round() {
        assert_eq!(round(2.0 / 3.0), 0.66667);
        assert_eq!(round(0.123454), 0.12345);
        assert_eq!(round(1.0), 1.0);
        assert_eq!(round(-1.0), -1.0);
    }

    #[test]
    fn test_round_is_idempotent() {
        for v in [0.0, 1.0 / 3.0, 2.0 / 3.0, 0.999995, 0.5, 0.123455, 0.987654321] {
            let once = round(v);
            assert_eq!(round(once), once, "value {}", v);
        }
    }

    #[test]
    fn test_points_in_half_open() {
        let points: Vec<_> = [10, 20, 30, 40].iter().map(|t| DataPoint::new(*t, 200, 1, "")).collect();
        let ts: Vec<_> = points_in(&points, 20..40).iter().map(|p| p.timestamp).collect();
        assert_eq!(ts, [20, 30]);
        assert!(points_in(&points, 41..100).is_empty());
        assert!(points_in(&points, 30..20).is_empty());
    }

    #[test]
    fn test_uptime_ratio_sentinels() {
        let kind = https();
        assert_eq!(uptime_ratio(&kind, &[]), NO_DATA);
        assert_eq!(uptime_ratio(&kind, &[DataPoint::disabled(1), DataPoint::disabled(2)]), NO_DATA);

        let all_down = [DataPoint::new(1, 500, 1, ""), DataPoint::new(2, 600, 1, "")];
        assert_eq!(uptime_ratio(&kind, &all_down), 0.0);
    }

    #[test]
    fn test_uptime_ratio_ignores_disabled() {
        let points = [
            DataPoint::new(1, 200, 1, ""),
            DataPoint::disabled(2),
            DataPoint::new(3, 500, 1, ""),
        ];
        assert_eq!(uptime_ratio(&https(), &points), 0.5);
    }

    #[test]
    fn test_day_windows_follow_local_midnight() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let now = tz.with_ymd_and_hms(2024, 3, 10, 1, 30, 0).unwrap();
        let windows = day_windows(&now);

        assert_eq!(windows.len(), DAYS);
        let today = tz.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap().timestamp();
        assert_eq!(windows[0], today..today + SECONDS_PER_DAY);
        assert_eq!(windows[1], today - SECONDS_PER_DAY..today);
        assert_eq!(windows[89].start, today - 89 * SECONDS_PER_DAY);
    }

    #[test]
    fn test_daily_uptime_buckets_by_day() {
        let now = Utc.with_ymd_and_hms(2024, 5, 2, 12, 0, 0).unwrap();
        let today = Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap().timestamp();
        let points = vec![
            DataPoint::new(today - SECONDS_PER_DAY, 500, 1, ""),
            DataPoint::new(today - 1, 500, 1, ""),
            DataPoint::new(today, 200, 1, ""),
            DataPoint::new(today + 60, 200, 1, ""),
        ];

        let daily = daily_uptime(&https(), &points, &day_windows(&now));
        assert_eq!(daily[0], 1.0);
        assert_eq!(daily[1], 0.0);
        assert!(daily[2..].iter().all(|v| *v == NO_DATA));
    }

    #[test]
    fn test_uptime_windows() {
        let mut daily = vec![NO_DATA; DAYS];
        daily[0] = 1.0;
        daily[3] = 0.5;
        daily[40] = 0.0;

        let windows = uptime_windows(&daily);
        assert_eq!(windows.one_day, 1.0);
        assert_eq!(windows.seven_days, 0.75);
        assert_eq!(windows.thirty_days, 0.75);
        assert_eq!(windows.ninety_days, 0.5);
    }

    #[test]
    fn test_uptime_windows_without_data() {
        let mut daily = vec![NO_DATA; DAYS];
        assert_eq!(uptime_windows(&daily), UptimeStatistics::no_data());

        daily[10] = 0.25;
        let windows = uptime_windows(&daily);
        assert_eq!(windows.one_day, NO_DATA);
        assert_eq!(windows.seven_days, NO_DATA);
        assert_eq!(windows.thirty_days, 0.25);
    }

    #[test]
    fn test_response_times_last_day_only() {
        let now = Utc.with_ymd_and_hms(2024, 5, 2, 12, 0, 0).unwrap();
        let t = now.timestamp();
        let points = vec![
            DataPoint::new(t - SECONDS_PER_DAY - 1, 200, 80, ""),
            DataPoint::new(t - 120, 200, 50, ""),
            DataPoint::disabled(t - 90),
            DataPoint::new(t - 60, 600, 0, "refused"),
            DataPoint::new(t, 200, 55, ""),
        ];

        let samples = response_times(&points, &now);
        let values: Vec<_> = samples.iter().map(|s| s.value).collect();
        assert_eq!(values, [50, 55]);
        assert!(samples.iter().all(|s| s.value > 0));
        assert_eq!(samples[1].time_string, "May 02, 2024, 12:00");
    }

    #[test]
    fn test_day_labels() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let labels = day_labels(&now);
        assert_eq!(labels.len(), DAYS);
        assert_eq!(labels[0], "March 01, 2024");
        assert_eq!(labels[1], "February 29, 2024");
    }
}
