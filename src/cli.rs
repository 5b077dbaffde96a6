use crate::config::Settings;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "downtimerobot")]
#[command(about = "Probe configured services and generate uptime statistics", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub overrides: SettingsArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Probe all configured services and store the results
    Crawl,
    /// Generate statistics from the stored results without probing
    Stats,
    /// Crawl, then generate statistics
    Run,
}

/// Flags overriding the environment settings.
#[derive(Args, Default)]
pub struct SettingsArgs {
    /// Services file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Historic data file
    #[arg(long, global = true)]
    pub data: Option<PathBuf>,

    /// Directory for the generated JSON files
    #[arg(long, global = true)]
    pub output: Option<PathBuf>,

    /// Probe timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Number of probes run at the same time
    #[arg(long, global = true)]
    pub concurrency: Option<usize>,
}

impl SettingsArgs {
    pub fn apply(self, mut settings: Settings) -> Settings {
        if let Some(path) = self.config {
            settings.config_path = path;
        }
        if let Some(path) = self.data {
            settings.data_path = path;
        }
        if let Some(dir) = self.output {
            settings.output_dir = dir;
        }
        if let Some(secs) = self.timeout.filter(|s| *s > 0) {
            settings.probe_timeout = Duration::from_secs(secs);
        }
        if let Some(n) = self.concurrency {
            settings.concurrency = n.max(1);
        }
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_settings() {
        let cli = Cli::try_parse_from([
            "downtimerobot",
            "crawl",
            "--data",
            "/tmp/history.json",
            "--timeout",
            "3",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Crawl));

        let settings = cli.overrides.apply(Settings::default());
        assert_eq!(settings.data_path, PathBuf::from("/tmp/history.json"));
        assert_eq!(settings.probe_timeout, Duration::from_secs(3));
        assert_eq!(settings.config_path, PathBuf::from("downtimerobot.yml"));
    }

    #[test]
    fn test_command_is_required() {
        assert!(Cli::try_parse_from(["downtimerobot"]).is_err());
    }
}
