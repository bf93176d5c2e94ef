//! Layered exporter configuration.
//!
//! Sources are applied in increasing priority:
//!
//! 1. built-in defaults
//! 2. an optional TOML file (`--config`)
//! 3. `POSTFIX_EXPORTER_*` environment variables, with `__` separating
//!    nested keys (e.g. `POSTFIX_EXPORTER_LOG_SUMMARY__ENABLED=true`)
//! 4. command-line flags
//!
//! ```toml
//! listen_address = "0.0.0.0:9154"
//! metrics_path = "/metrics"
//!
//! [log_summary]
//! enabled = true
//! logfile = "/var/log/mail.log"
//! refresh_interval = 60
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use postfix_adapters::SummaryFeed;
use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0:9154";
pub const DEFAULT_METRICS_PATH: &str = "/metrics";
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_JOURNAL_UNIT: &str = "postfix";

const ENV_PREFIX: &str = "POSTFIX_EXPORTER";

/// Validated exporter settings, immutable for the process lifetime.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub listen_address: String,
    pub metrics_path: String,
    /// Seconds before an external command is killed.
    pub command_timeout: u64,
    pub log_summary: LogSummarySettings,
    pub tools: ToolSettings,
}

/// Traffic counter collection from a `pflogsumm` report.
#[derive(Debug, Clone, Deserialize)]
pub struct LogSummarySettings {
    pub enabled: bool,
    /// Flat mail logfile, required unless `journal` is set.
    pub logfile: Option<PathBuf>,
    /// Read today's entries from the systemd journal instead of a logfile.
    pub journal: bool,
    pub journal_unit: String,
    /// Minimum seconds between report regenerations.
    pub refresh_interval: u64,
}

/// Locations of the external tools.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolSettings {
    pub postqueue: PathBuf,
    pub postconf: PathBuf,
    pub pflogsumm: PathBuf,
    pub journalctl: PathBuf,
}

/// Values given on the command line. `None` leaves lower layers in effect.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub listen_address: Option<String>,
    pub metrics_path: Option<String>,
    pub command_timeout: Option<u64>,
    pub log_summary: Option<bool>,
    pub logfile: Option<PathBuf>,
    pub journal: Option<bool>,
    pub journal_unit: Option<String>,
    pub refresh_interval: Option<u64>,
    pub postqueue: Option<PathBuf>,
    pub postconf: Option<PathBuf>,
    pub pflogsumm: Option<PathBuf>,
    pub journalctl: Option<PathBuf>,
}

impl Settings {
    /// Load defaults, `file`, the environment, then `overrides`, and validate.
    pub fn load(file: Option<&Path>, overrides: &Overrides) -> Result<Self, ConfigError> {
        Self::load_from(file, true, overrides)
    }

    fn load_from(
        file: Option<&Path>,
        use_env: bool,
        overrides: &Overrides,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("listen_address", DEFAULT_LISTEN_ADDRESS)?
            .set_default("metrics_path", DEFAULT_METRICS_PATH)?
            .set_default("command_timeout", DEFAULT_COMMAND_TIMEOUT_SECS)?
            .set_default("log_summary.enabled", false)?
            .set_default("log_summary.journal", false)?
            .set_default("log_summary.journal_unit", DEFAULT_JOURNAL_UNIT)?
            .set_default("log_summary.refresh_interval", DEFAULT_REFRESH_INTERVAL_SECS)?
            .set_default("tools.postqueue", "postqueue")?
            .set_default("tools.postconf", "postconf")?
            .set_default("tools.pflogsumm", "pflogsumm")?
            .set_default("tools.journalctl", "journalctl")?;

        if let Some(path) = file {
            builder = builder.add_source(File::from(path));
        }

        if use_env {
            builder = builder.add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let settings: Settings = builder
            .set_override_option("listen_address", overrides.listen_address.clone())?
            .set_override_option("metrics_path", overrides.metrics_path.clone())?
            .set_override_option("command_timeout", overrides.command_timeout)?
            .set_override_option("log_summary.enabled", overrides.log_summary)?
            .set_override_option("log_summary.logfile", path_value(&overrides.logfile))?
            .set_override_option("log_summary.journal", overrides.journal)?
            .set_override_option("log_summary.journal_unit", overrides.journal_unit.clone())?
            .set_override_option("log_summary.refresh_interval", overrides.refresh_interval)?
            .set_override_option("tools.postqueue", path_value(&overrides.postqueue))?
            .set_override_option("tools.postconf", path_value(&overrides.postconf))?
            .set_override_option("tools.pflogsumm", path_value(&overrides.pflogsumm))?
            .set_override_option("tools.journalctl", path_value(&overrides.journalctl))?
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Reject configurations the exporter cannot serve.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.listen_address.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::InvalidListenAddress(
                self.listen_address.clone(),
            ));
        }

        if !self.metrics_path.starts_with('/') || self.metrics_path == "/" {
            return Err(ConfigError::InvalidMetricsPath(self.metrics_path.clone()));
        }

        if self.command_timeout == 0 {
            return Err(ConfigError::ZeroCommandTimeout);
        }

        let summary = &self.log_summary;
        if summary.enabled {
            if !summary.journal && summary.logfile.is_none() {
                return Err(ConfigError::MissingLogfile);
            }
            if summary.refresh_interval == 0 {
                return Err(ConfigError::ZeroRefreshInterval);
            }
        }

        Ok(())
    }

    /// Parsed listen address. Always valid after [`Settings::validate`].
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen_address
            .parse()
            .map_err(|_| ConfigError::InvalidListenAddress(self.listen_address.clone()))
    }

    /// Where the log summary is read from, `None` when collection is disabled.
    ///
    /// The journal takes precedence over a logfile when both are configured.
    pub fn summary_feed(&self) -> Option<SummaryFeed> {
        let summary = &self.log_summary;
        if !summary.enabled {
            return None;
        }
        if summary.journal {
            return Some(SummaryFeed::Journal {
                unit: summary.journal_unit.clone(),
            });
        }
        summary.logfile.clone().map(SummaryFeed::Logfile)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.log_summary.refresh_interval)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout)
    }
}

fn path_value(path: &Option<PathBuf>) -> Option<String> {
    path.as_ref().map(|p| p.to_string_lossy().into_owned())
}
