//! Statistics across all configured services.

use super::rollup::{average, UptimeStatistics};
use super::ServiceStatistics;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountStatistics {
    pub up: usize,
    pub down: usize,
    pub disabled: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetStatistics {
    pub uptime: UptimeStatistics,
    pub counts: CountStatistics,
}

/// Count services by state. Disabled services count as neither up nor down.
pub fn count_statistics(services: &[ServiceStatistics]) -> CountStatistics {
    services.iter().fold(CountStatistics::default(), |mut counts, service| {
        if service.disabled {
            counts.disabled += 1;
        } else if service.up {
            counts.up += 1;
        } else {
            counts.down += 1;
        }
        counts.total += 1;
        counts
    })
}

/// Mean of the enabled services' uptime windows.
///
/// Services without data for a window do not take part in that window's mean.
pub fn fleet_uptime(services: &[ServiceStatistics]) -> UptimeStatistics {
    let enabled: Vec<[f64; 4]> = services
        .iter()
        .filter(|s| !s.disabled)
        .map(|s| s.uptime.values())
        .collect();

    UptimeStatistics::from_values(std::array::from_fn(|i| {
        average(enabled.iter().map(|values| values[i]))
    }))
}

pub fn fleet_statistics(services: &[ServiceStatistics]) -> FleetStatistics {
    FleetStatistics {
        uptime: fleet_uptime(services),
        counts: count_statistics(services),
    }
}
