//! Configuration module for downtimerobot.
//!
//! Runtime settings come from environment variables with sensible defaults.
//! The monitored services are read from a YAML file.

use crate::probe::{HttpsProbe, PatternProbe, PingProbe, PortProbe, ProbeKind, ServiceDefinition};

use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration error types.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid service {service}: {reason}")]
    Invalid { service: String, reason: String },
}

/// Runtime settings loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Services file (default: "downtimerobot.yml")
    pub config_path: PathBuf,
    /// Historic data file (default: "historicData.json")
    pub data_path: PathBuf,
    /// Directory receiving the generated JSON assets (default: "public/data")
    pub output_dir: PathBuf,
    /// Upper bound for a single probe (default: 10s)
    pub probe_timeout: Duration,
    /// Number of probes in flight at once (default: 1)
    pub concurrency: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from("downtimerobot.yml"),
            data_path: PathBuf::from("historicData.json"),
            output_dir: PathBuf::from("public/data"),
            probe_timeout: Duration::from_secs(10),
            concurrency: 1,
        }
    }
}

impl Settings {
    /// Load settings from environment variables.
    ///
    /// Environment variables:
    /// - `DOWNTIMEROBOT_CONFIG`: services file
    /// - `DOWNTIMEROBOT_DATA_PATH`: historic data file
    /// - `DOWNTIMEROBOT_OUTPUT_DIR`: output directory
    /// - `DOWNTIMEROBOT_PROBE_TIMEOUT`: probe timeout in seconds
    /// - `DOWNTIMEROBOT_CONCURRENCY`: probe worker count
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Self {
        let mut cfg = Self::default();

        if let Some(path) = lookup("DOWNTIMEROBOT_CONFIG") {
            cfg.config_path = PathBuf::from(path);
        }

        if let Some(path) = lookup("DOWNTIMEROBOT_DATA_PATH") {
            cfg.data_path = PathBuf::from(path);
        }

        if let Some(dir) = lookup("DOWNTIMEROBOT_OUTPUT_DIR") {
            cfg.output_dir = PathBuf::from(dir);
        }

        if let Some(timeout) = lookup("DOWNTIMEROBOT_PROBE_TIMEOUT")
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|secs| *secs > 0.0)
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        {
            cfg.probe_timeout = timeout;
        }

        if let Some(n) = lookup("DOWNTIMEROBOT_CONCURRENCY").and_then(|s| s.parse::<usize>().ok()) {
            cfg.concurrency = n.max(1);
        }

        cfg
    }
}

/// Top level of the services file.
#[derive(Debug, Default, Deserialize)]
pub struct ServicesConfig {
    #[serde(default)]
    pub services: ServiceGroups,
}

/// Services grouped by probe kind.
#[derive(Debug, Default, Deserialize)]
pub struct ServiceGroups {
    #[serde(default)]
    pub https: Vec<HttpsServiceConfig>,
    #[serde(default)]
    pub ping: Vec<PingServiceConfig>,
    #[serde(default)]
    pub port: Vec<PortServiceConfig>,
    #[serde(default)]
    pub pattern: Vec<PatternServiceConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpsServiceConfig {
    pub name: String,
    pub host: String,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub valid_status_codes: Option<Vec<i32>>,
}

#[derive(Debug, Deserialize)]
pub struct PingServiceConfig {
    pub name: String,
    pub host: String,
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct PortServiceConfig {
    pub name: String,
    pub host: String,
    #[serde(default)]
    pub disabled: bool,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct PatternServiceConfig {
    pub name: String,
    pub host: String,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub path: String,
    pub pattern: String,
}

impl ServicesConfig {
    /// Read and parse the services file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        // An empty document deserializes to unit, not to an empty mapping.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Validate and flatten into service definitions.
    ///
    /// Order is https, ping, port, pattern; file order within each kind.
    pub fn into_definitions(self) -> Result<Vec<ServiceDefinition>, ConfigError> {
        let groups = self.services;
        let mut definitions = Vec::new();

        for s in groups.https {
            definitions.push(ServiceDefinition {
                name: s.name,
                host: s.host,
                disabled: s.disabled,
                kind: ProbeKind::Https(HttpsProbe {
                    path: s.path,
                    valid_status_codes: s.valid_status_codes,
                }),
            });
        }

        for s in groups.ping {
            definitions.push(ServiceDefinition {
                name: s.name,
                host: s.host,
                disabled: s.disabled,
                kind: ProbeKind::Ping(PingProbe),
            });
        }

        for s in groups.port {
            if s.port == 0 {
                return Err(ConfigError::Invalid {
                    service: s.name,
                    reason: "port must be between 1 and 65535".to_string(),
                });
            }
            definitions.push(ServiceDefinition {
                name: s.name,
                host: s.host,
                disabled: s.disabled,
                kind: ProbeKind::Port(PortProbe { port: s.port }),
            });
        }

        for s in groups.pattern {
            let pattern = Regex::new(&s.pattern).map_err(|e| ConfigError::Invalid {
                service: s.name.clone(),
                reason: format!("invalid pattern: {}", e),
            })?;
            definitions.push(ServiceDefinition {
                name: s.name,
                host: s.host,
                disabled: s.disabled,
                kind: ProbeKind::Pattern(PatternProbe { path: s.path, pattern }),
            });
        }

        validate_definitions(&definitions)?;
        Ok(definitions)
    }
}

fn validate_definitions(definitions: &[ServiceDefinition]) -> Result<(), ConfigError> {
    let mut hosts = HashSet::new();

    for def in definitions {
        if def.name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                service: def.host.clone(),
                reason: "name must not be empty".to_string(),
            });
        }
        if def.host.trim().is_empty() {
            return Err(ConfigError::Invalid {
                service: def.name.clone(),
                reason: "host must not be empty".to_string(),
            });
        }
        // Historic data is keyed by host.
        if !hosts.insert(def.host.as_str()) {
            return Err(ConfigError::Invalid {
                service: def.name.clone(),
                reason: format!("host {} is configured more than once", def.host),
            });
        }
    }

    Ok(())
}

/// Load the service definitions named by `settings`.
pub fn load_services(settings: &Settings) -> Result<Vec<ServiceDefinition>, ConfigError> {
    let services = ServicesConfig::from_file(&settings.config_path)?.into_definitions()?;
    tracing::info!(
        "Loaded {} services from {}",
        services.len(),
        settings.config_path.display()
    );
    Ok(services)
}
