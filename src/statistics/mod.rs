//! Statistics generated from the historic data of every service.
//!
//! Everything here is a pure function of the services' history and the
//! generation time; the output is serialized as JSON for the frontend.

mod export;
mod fleet;
mod logs;
mod rollup;

pub use export::*;
pub use fleet::*;
pub use logs::*;
pub use rollup::*;

use crate::crawler::MonitoredService;

use chrono::{DateTime, Duration as ChronoDuration, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::ops::Range;

/// Logs cover this many days back from generation time.
const LOG_DAYS: i64 = 90;

/// Rollup statistics for one service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatistics {
    pub name: String,
    pub host: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub up: bool,
    pub disabled: bool,
    pub uptime: UptimeStatistics,
    /// One value per day, today first.
    pub daily_statistics: Vec<f64>,
}

/// Service statistics with the full log and response times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedService {
    #[serde(flatten)]
    pub service: ServiceStatistics,
    pub logs: Vec<ServiceLog>,
    pub response_times: Vec<ResponseTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceList {
    pub services: Vec<ServiceStatistics>,
    pub days: Vec<String>,
    pub statistics: FleetStatistics,
    pub time_zone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDetails {
    pub service: DetailedService,
    pub days: Vec<String>,
    pub time_zone: String,
}

/// Compute the detailed statistics of one service.
///
/// `windows` are the day windows from [`day_windows`] for the same `now`.
pub fn service_statistics<Tz>(
    service: &MonitoredService,
    now: &DateTime<Tz>,
    windows: &[Range<i64>],
) -> DetailedService
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let def = &service.definition;
    let history = service.history.as_slice();

    let (up, daily_statistics, uptime) = if def.disabled {
        (false, vec![NO_DATA; windows.len()], UptimeStatistics::no_data())
    } else {
        let daily = daily_uptime(&def.kind, history, windows);
        let uptime = uptime_windows(&daily);
        (service.is_up(), daily, uptime)
    };

    let to = now.timestamp();
    let from = (now.clone() - ChronoDuration::days(LOG_DAYS)).timestamp();
    let logs = compress_logs(&def.kind, points_in(history, from..to + 1), &now.timezone());

    DetailedService {
        service: ServiceStatistics {
            name: def.name.clone(),
            host: def.host.clone(),
            kind: def.kind.type_name().to_string(),
            up,
            disabled: def.disabled,
            uptime,
            daily_statistics,
        },
        logs,
        response_times: response_times(history, now),
    }
}

/// Generate the service list and the per service details.
pub fn generate<Tz>(services: &[MonitoredService], now: &DateTime<Tz>) -> (ServiceList, Vec<ServiceDetails>)
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let days = day_labels(now);
    let time_zone = now.format("%:z").to_string();
    let windows = day_windows(now);

    let detailed: Vec<DetailedService> = services
        .iter()
        .map(|service| service_statistics(service, now, &windows))
        .collect();

    let summaries: Vec<ServiceStatistics> = detailed.iter().map(|d| d.service.clone()).collect();
    let list = ServiceList {
        statistics: fleet_statistics(&summaries),
        services: summaries,
        days: days.clone(),
        time_zone: time_zone.clone(),
    };

    let details = detailed
        .into_iter()
        .map(|service| ServiceDetails {
            service,
            days: days.clone(),
            time_zone: time_zone.clone(),
        })
        .collect();

    tracing::debug!("Generated statistics for {} services", services.len());
    (list, details)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{HttpsProbe, ProbeKind, ServiceDefinition};
    use crate::store::DataPoint;
    use chrono::{FixedOffset, Utc};

    fn monitored(host: &str, disabled: bool, history: Vec<DataPoint>) -> MonitoredService {
        MonitoredService::new(
            ServiceDefinition {
                name: host.to_string(),
                host: host.to_string(),
                disabled,
                kind: ProbeKind::Https(HttpsProbe {
                    path: "/".to_string(),
                    valid_status_codes: None,
                }),
            },
            history,
        )
    }

    #[test]
    fn test_end_to_end_example() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let t0 = now.timestamp() - 600;
        let service = monitored(
            "a.example.com",
            false,
            vec![
                DataPoint::new(t0, 200, 50, ""),
                DataPoint::new(t0 + 60, 200, 55, ""),
                DataPoint::new(t0 + 120, 500, 40, ""),
            ],
        );

        let (list, details) = generate(&[service], &now);
        let stats = &list.services[0];
        assert_eq!(stats.daily_statistics[0], 0.66667);
        assert!(stats.daily_statistics[1..].iter().all(|v| *v == NO_DATA));
        assert_eq!(stats.uptime.one_day, 0.66667);
        assert_eq!(stats.uptime.ninety_days, 0.66667);
        assert!(!stats.up);

        let detail = &details[0].service;
        assert_eq!(detail.logs.len(), 2);
        assert_eq!(detail.logs[0].status.code, 200);
        assert_eq!(detail.logs[0].duration, 120);
        assert_eq!(detail.logs[1].status.code, 500);
        let values: Vec<_> = detail.response_times.iter().map(|r| r.value).collect();
        assert_eq!(values, [50, 55, 40]);

        assert_eq!(list.statistics.counts.down, 1);
        assert_eq!(list.statistics.uptime.one_day, 0.66667);
    }

    #[test]
    fn test_disabled_service_reports_no_data() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let t = now.timestamp();
        let service = monitored(
            "off.example.com",
            true,
            vec![DataPoint::new(t - 120, 200, 20, ""), DataPoint::disabled(t - 60)],
        );

        let (list, details) = generate(&[service], &now);
        let stats = &list.services[0];
        assert!(!stats.up);
        assert!(stats.disabled);
        assert!(stats.daily_statistics.iter().all(|v| *v == NO_DATA));
        assert_eq!(stats.uptime, UptimeStatistics::no_data());
        assert_eq!(list.statistics.counts, CountStatistics { up: 0, down: 0, disabled: 1, total: 1 });

        let logs = &details[0].service.logs;
        assert_eq!(logs.len(), 2);
        assert!(logs[1].disabled);
    }

    #[test]
    fn test_logs_only_cover_last_ninety_days() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let t = now.timestamp();
        let service = monitored(
            "a.example.com",
            false,
            vec![
                DataPoint::new(t - 100 * 86_400, 500, 10, ""),
                DataPoint::new(t - 3600, 200, 10, ""),
                DataPoint::new(t, 200, 10, ""),
            ],
        );

        let (_, details) = generate(&[service], &now);
        let logs = &details[0].service.logs;
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status.code, 200);
        assert_eq!(logs[0].duration_string, "1 h, 0 min");
    }

    #[test]
    fn test_output_shape() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let now = tz.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let service = monitored("a.example.com", false, vec![DataPoint::new(now.timestamp(), 200, 30, "")]);

        let (list, details) = generate(&[service], &now);
        assert_eq!(list.time_zone, "+02:00");
        assert_eq!(list.days.len(), DAYS);
        assert_eq!(list.days[0], "June 01, 2024");

        let json = serde_json::to_value(&list).unwrap();
        assert_eq!(json["services"][0]["type"], "https");
        assert_eq!(json["services"][0]["dailyStatistics"].as_array().unwrap().len(), DAYS);
        assert_eq!(json["statistics"]["uptime"]["1"], 1.0);
        assert_eq!(json["statistics"]["counts"]["up"], 1);

        let json = serde_json::to_value(&details[0]).unwrap();
        assert_eq!(json["service"]["host"], "a.example.com");
        assert_eq!(json["service"]["logs"][0]["durationString"], "0 h, 0 min");
        assert_eq!(json["service"]["responseTimes"][0]["timeString"], "June 01, 2024, 12:00");
        assert_eq!(json["timeZone"], "+02:00");
    }
}
