//! Log summary adapter using `pflogsumm`.
//!
//! `pflogsumm` aggregates a day of Postfix log entries into a report whose
//! "Grand Totals" section lists message counters:
//!
//! ```text
//! Grand Totals
//! ------------
//! messages
//!
//!    1234   received
//!    1200   delivered
//!       0   forwarded
//!      12   deferred  (34  deferrals)
//!       3   bounced
//!     100   rejected (7%)
//! ```
//!
//! The report is fed either from a flat logfile or from the systemd journal.

use std::ffi::OsStr;
use std::fmt::Debug;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::command;
use crate::AdapterError;

/// Where `pflogsumm` reads its log lines from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryFeed {
    /// A flat mail logfile, e.g. `/var/log/mail.log`.
    Logfile(PathBuf),
    /// Today's entries for a systemd unit, read through `journalctl`.
    Journal { unit: String },
}

/// Produces a log summary report.
#[async_trait]
pub trait LogSummarizer: Send + Sync + Debug {
    /// Generate a fresh report from `feed`.
    async fn summarize(&self, feed: &SummaryFeed) -> Result<String, AdapterError>;
}

/// Summarizer backed by the `pflogsumm` and `journalctl` tools.
#[derive(Debug, Clone)]
pub struct Pflogsumm {
    pflogsumm: PathBuf,
    journalctl: PathBuf,
    timeout: Duration,
}

impl Pflogsumm {
    /// Create a new builder for configuring the summarizer.
    pub fn builder() -> PflogsummBuilder {
        PflogsummBuilder::default()
    }
}

#[async_trait]
impl LogSummarizer for Pflogsumm {
    async fn summarize(&self, feed: &SummaryFeed) -> Result<String, AdapterError> {
        match feed {
            SummaryFeed::Logfile(path) => {
                let args = [OsStr::new("-d"), OsStr::new("today"), path.as_os_str()];
                command::run(&self.pflogsumm, args, None, self.timeout).await
            }
            SummaryFeed::Journal { unit } => {
                // Both stages share one deadline
                let deadline = Instant::now() + self.timeout;
                let log = command::run(
                    &self.journalctl,
                    ["-u", unit.as_str(), "--since", "today", "--no-pager", "-o", "short"],
                    None,
                    self.timeout,
                )
                .await?;

                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return Err(AdapterError::Timeout {
                        program: self.pflogsumm.display().to_string(),
                        after: self.timeout,
                    });
                }
                command::run(
                    &self.pflogsumm,
                    ["-d", "today"],
                    Some(log.into_bytes()),
                    remaining,
                )
                .await
            }
        }
    }
}

/// Builder for Pflogsumm.
#[derive(Debug, Default)]
pub struct PflogsummBuilder {
    pflogsumm: Option<PathBuf>,
    journalctl: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl PflogsummBuilder {
    /// Set the `pflogsumm` binary (default: `pflogsumm` on `$PATH`).
    pub fn pflogsumm(mut self, path: impl Into<PathBuf>) -> Self {
        self.pflogsumm = Some(path.into());
        self
    }

    /// Set the `journalctl` binary (default: `journalctl` on `$PATH`).
    pub fn journalctl(mut self, path: impl Into<PathBuf>) -> Self {
        self.journalctl = Some(path.into());
        self
    }

    /// Set the timeout for one summary generation (default: 10 seconds).
    ///
    /// In journal mode `journalctl` and `pflogsumm` share this budget.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the summarizer.
    pub fn build(self) -> Pflogsumm {
        Pflogsumm {
            pflogsumm: self.pflogsumm.unwrap_or_else(|| PathBuf::from("pflogsumm")),
            journalctl: self.journalctl.unwrap_or_else(|| PathBuf::from("journalctl")),
            timeout: self.timeout.unwrap_or(Duration::from_secs(10)),
        }
    }
}

/// Read the counter printed before `label` in a `pflogsumm` report.
///
/// Matches the first line whose second field equals `label`. pflogsumm
/// scales large counts with a `k` or `m` suffix (units of 1024); those are
/// expanded. Returns `None` when no line matches or the count is garbled.
pub fn extract_statistic(report: &str, label: &str) -> Option<f64> {
    let count = report.lines().find_map(|line| {
        let mut fields = line.split_whitespace();
        let count = fields.next()?;
        (fields.next()? == label).then_some(count)
    })?;

    let (digits, scale) = match count.as_bytes().last()? {
        b'k' => (&count[..count.len() - 1], 1024.0),
        b'm' => (&count[..count.len() - 1], 1024.0 * 1024.0),
        _ => (count, 1.0),
    };

    digits.parse::<f64>().ok().map(|v| v * scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = "\
Postfix log summaries for Oct 19

Grand Totals
------------
messages

   1234   received
   1200   delivered
      0   forwarded
     12   deferred  (34  deferrals)
      3   bounced
    100   rejected (7%)
      0   reject warnings
      2   held
      0   discarded (0%)

  5234k   bytes received
   612k   bytes delivered
";

    #[test]
    fn test_extract_grand_totals() {
        assert_eq!(extract_statistic(REPORT, "received"), Some(1234.0));
        assert_eq!(extract_statistic(REPORT, "delivered"), Some(1200.0));
        assert_eq!(extract_statistic(REPORT, "forwarded"), Some(0.0));
        assert_eq!(extract_statistic(REPORT, "deferred"), Some(12.0));
        assert_eq!(extract_statistic(REPORT, "bounced"), Some(3.0));
        assert_eq!(extract_statistic(REPORT, "rejected"), Some(100.0));
        assert_eq!(extract_statistic(REPORT, "held"), Some(2.0));
        assert_eq!(extract_statistic(REPORT, "discarded"), Some(0.0));
    }

    #[test]
    fn bytes_lines_do_not_shadow_counts() {
        // "bytes received" has "bytes" as its second field
        let report = "  5234k   bytes received\n";
        assert_eq!(extract_statistic(report, "received"), None);
    }

    #[test]
    fn test_extract_scaled_counts() {
        assert_eq!(extract_statistic("  600k   received\n", "received"), Some(614400.0));
        assert_eq!(
            extract_statistic("     2m   delivered\n", "delivered"),
            Some(2.0 * 1024.0 * 1024.0)
        );
    }

    #[test]
    fn test_extract_missing_label() {
        assert_eq!(extract_statistic(REPORT, "quarantined"), None);
        assert_eq!(extract_statistic("", "received"), None);
    }

    #[test]
    fn test_extract_garbled_count() {
        assert_eq!(extract_statistic("   abc   received\n", "received"), None);
    }

    #[test]
    fn test_builder_defaults() {
        let summarizer = Pflogsumm::builder().build();
        assert_eq!(summarizer.pflogsumm, PathBuf::from("pflogsumm"));
        assert_eq!(summarizer.journalctl, PathBuf::from("journalctl"));
        assert_eq!(summarizer.timeout, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn missing_pflogsumm_is_error() {
        let summarizer = Pflogsumm::builder()
            .pflogsumm("/nonexistent/pflogsumm")
            .build();
        let feed = SummaryFeed::Logfile(PathBuf::from("/var/log/mail.log"));
        assert!(summarizer.summarize(&feed).await.is_err());
    }

    #[cfg(unix)]
    fn script(dir: &std::path::Path, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn journal_stages_share_one_timeout() {
        let dir = tempfile::tempdir().unwrap();
        // Each stage fits the timeout alone, both together do not
        let summarizer = Pflogsumm::builder()
            .journalctl(script(dir.path(), "journalctl", "sleep 0.6; echo line"))
            .pflogsumm(script(dir.path(), "pflogsumm", "sleep 0.6; cat"))
            .timeout(Duration::from_secs(1))
            .build();
        let feed = SummaryFeed::Journal {
            unit: "postfix".to_string(),
        };

        let err = summarizer.summarize(&feed).await.unwrap_err();
        assert!(matches!(err, AdapterError::Timeout { .. }), "{:?}", err);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_journal_pipes_into_pflogsumm() {
        let dir = tempfile::tempdir().unwrap();
        let summarizer = Pflogsumm::builder()
            .journalctl(script(dir.path(), "journalctl", "echo '   7   received'"))
            .pflogsumm(script(dir.path(), "pflogsumm", "cat"))
            .build();
        let feed = SummaryFeed::Journal {
            unit: "postfix".to_string(),
        };

        let report = summarizer.summarize(&feed).await.unwrap();
        assert_eq!(extract_statistic(&report, "received"), Some(7.0));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn logfile_path_passed_as_single_argument() {
        // `echo` stands in for pflogsumm and reflects its argument vector
        let summarizer = Pflogsumm::builder().pflogsumm("echo").build();
        let feed = SummaryFeed::Logfile(PathBuf::from("/var/log/mail log; true"));
        let out = summarizer.summarize(&feed).await.unwrap();
        assert_eq!(out.trim(), "-d today /var/log/mail log; true");
    }
}
