//! Crawler that probes every configured service and records the results.

use crate::config::{self, ConfigError, Settings};
use crate::probe::{ProbeError, Prober, ServiceDefinition};
use crate::store::{DataPoint, HistoricSeries, HistoryStore, StoreError};

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Fatal crawl errors. Probe failures are recorded as data instead.
#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("historic store error: {0}")]
    Store(#[from] StoreError),
    #[error("failed to set up probes: {0}")]
    Probe(#[from] ProbeError),
}

/// A configured service together with its historic data.
#[derive(Debug, Clone)]
pub struct MonitoredService {
    pub definition: ServiceDefinition,
    /// Points in ascending time order.
    pub history: Vec<DataPoint>,
}

impl MonitoredService {
    pub fn new(definition: ServiceDefinition, history: Vec<DataPoint>) -> Self {
        Self { definition, history }
    }

    pub fn host(&self) -> &str {
        &self.definition.host
    }

    pub fn last_point(&self) -> Option<&DataPoint> {
        self.history.last()
    }

    /// Whether the most recent point is up. False without data.
    pub fn is_up(&self) -> bool {
        self.last_point()
            .map(|p| self.definition.kind.is_up(p))
            .unwrap_or(false)
    }

    /// Whether the last two points disagree on up/down.
    pub fn changed_state(&self) -> bool {
        match self.history.as_slice() {
            [.., previous, last] => {
                self.definition.kind.is_up(previous) != self.definition.kind.is_up(last)
            }
            _ => false,
        }
    }

    pub fn record(&mut self, point: DataPoint) {
        self.history.push(point);
    }
}

/// Pair each definition with its stored points.
///
/// Series for hosts that are no longer configured are dropped.
pub fn attach_history(definitions: Vec<ServiceDefinition>, mut series: HistoricSeries) -> Vec<MonitoredService> {
    definitions
        .into_iter()
        .map(|def| {
            let history = series.remove(&def.host).unwrap_or_default();
            MonitoredService::new(def, history)
        })
        .collect()
}

/// Rebuild the whole store contents from the monitored services.
pub fn collect_history(services: &[MonitoredService]) -> HistoricSeries {
    services
        .iter()
        .map(|s| (s.definition.host.clone(), s.history.clone()))
        .collect()
}

/// Load configured services with their history, without probing.
pub fn load_services(settings: &Settings) -> Result<Vec<MonitoredService>, CrawlError> {
    let definitions = config::load_services(settings)?;
    let series = HistoryStore::new(&settings.data_path).load()?;
    Ok(attach_history(definitions, series))
}

/// Runs one crawl cycle.
pub struct Crawler {
    prober: Prober,
    concurrency: usize,
}

impl Crawler {
    pub fn new(prober: Prober, concurrency: usize) -> Self {
        Self {
            prober,
            concurrency: concurrency.max(1),
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, CrawlError> {
        let prober = Prober::new(settings.probe_timeout)?;
        Ok(Self::new(prober, settings.concurrency))
    }

    /// Probe every service once and append the result to its history.
    ///
    /// With a concurrency of one, services are probed in configuration order.
    pub async fn crawl(&self, services: &mut [MonitoredService]) {
        tracing::info!(
            "Crawling {} services (concurrency {})",
            services.len(),
            self.concurrency
        );

        if self.concurrency == 1 {
            for service in services.iter_mut() {
                let point = self.prober.probe(&service.definition).await;
                apply_result(service, point);
            }
            return;
        }

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for (idx, service) in services.iter().enumerate() {
            let prober = self.prober.clone();
            let definition = service.definition.clone();
            let semaphore = semaphore.clone();

            tasks.spawn(async move {
                // The semaphore is never closed.
                let _permit = semaphore.acquire_owned().await.ok();
                (idx, prober.probe(&definition).await)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, point)) => apply_result(&mut services[idx], point),
                Err(e) => tracing::error!("Probe task failed: {}", e),
            }
        }
    }
}

fn apply_result(service: &mut MonitoredService, point: DataPoint) {
    let def = &service.definition;

    if point.is_disabled() {
        tracing::info!(service = %def.host, kind = def.kind.type_name(), "Service is DISABLED");
    } else if def.kind.is_up(&point) {
        tracing::info!(service = %def.host, kind = def.kind.type_name(), "Service is UP");
    } else {
        tracing::warn!(
            service = %def.host,
            kind = def.kind.type_name(),
            status_code = point.status_code,
            status_message = %def.kind.status_message(&point),
            "Service is DOWN"
        );
    }

    service.record(point);

    if service.changed_state() {
        tracing::info!(service = %service.host(), up = service.is_up(), "Service changed state");
    }
}

/// Load, probe and persist. Returns the services with their updated history.
pub async fn crawl_services(settings: &Settings) -> Result<Vec<MonitoredService>, CrawlError> {
    let definitions = config::load_services(settings)?;
    let store = HistoryStore::new(&settings.data_path);
    let series = store.load()?;

    let mut services = attach_history(definitions, series);
    let crawler = Crawler::from_settings(settings)?;
    crawler.crawl(&mut services).await;

    store.save(&collect_history(&services))?;
    tracing::info!("Crawl finished, historic data written to {}", store.path().display());

    Ok(services)
}
