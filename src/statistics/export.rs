//! Writes the generated statistics as static JSON assets.

use super::{ServiceDetails, ServiceList};

use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the service list inside the output directory.
pub const SERVICE_LIST_FILE: &str = "serviceList.json";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// File name of a service's details, derived from its host.
pub fn details_file_name(host: &str) -> String {
    let safe: String = host
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    format!("{}.json", safe)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ExportError> {
    let io_err = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).map_err(|source| ExportError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    writer.flush().map_err(io_err)
}

/// Write `serviceList.json` and one `<host>.json` per service into `dir`.
pub fn write_assets(dir: &Path, list: &ServiceList, details: &[ServiceDetails]) -> Result<(), ExportError> {
    std::fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    write_json(&dir.join(SERVICE_LIST_FILE), list)?;

    for detail in details {
        let path = dir.join(details_file_name(&detail.service.service.host));
        tracing::debug!("Writing {}", path.display());
        write_json(&path, detail)?;
    }

    tracing::info!("Wrote statistics for {} services to {}", details.len(), dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::MonitoredService;
    use crate::probe::{PingProbe, ProbeKind, ServiceDefinition};
    use crate::statistics::generate;
    use crate::store::DataPoint;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    #[test]
    fn test_details_file_name() {
        assert_eq!(details_file_name("example.com"), "example.com.json");
        assert_eq!(details_file_name("a/b"), "a_b.json");
    }

    #[test]
    fn test_write_assets() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let service = MonitoredService::new(
            ServiceDefinition {
                name: "Router".to_string(),
                host: "10.0.0.1".to_string(),
                disabled: false,
                kind: ProbeKind::Ping(PingProbe),
            },
            vec![DataPoint::new(now.timestamp(), 0, 3, "")],
        );
        let (list, details) = generate(&[service], &now);

        let dir = TempDir::new().unwrap();
        let out = dir.path().join("public/data");
        write_assets(&out, &list, &details).unwrap();

        let raw = std::fs::read_to_string(out.join(SERVICE_LIST_FILE)).unwrap();
        let reread: ServiceList = serde_json::from_str(&raw).unwrap();
        assert_eq!(reread, list);

        let raw = std::fs::read_to_string(out.join("10.0.0.1.json")).unwrap();
        let reread: ServiceDetails = serde_json::from_str(&raw).unwrap();
        assert_eq!(reread.service.logs[0].status.message, "Reachable");
        assert!(reread.service.service.up);
    }
}
