//! Time-gated cache for the log summary report.

use std::sync::Arc;
use std::time::Duration;

use postfix_adapters::{extract_statistic, AdapterError, LogSummarizer, SummaryFeed};
use postfix_types::TrafficLabel;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Caches the most recent log summary report.
///
/// Generating a report is far more expensive than counting a queue, so the
/// summarizer runs at most once per `refresh_interval`. Between
/// regenerations the previous report is served verbatim, which means the
/// traffic gauges may be up to `refresh_interval` stale. A poll that
/// triggers a regeneration waits at most one command timeout for it, in
/// journal mode as well.
///
/// The generation timestamp advances even when the summarizer fails. A
/// failing or slow summarizer is therefore retried once per interval, not on
/// every poll; meanwhile the last good report (or an empty one) is served.
#[derive(Debug)]
pub struct LogSummaryCache {
    summarizer: Arc<dyn LogSummarizer>,
    feed: SummaryFeed,
    refresh_interval: Duration,
    report: String,
    last_generated: Option<Instant>,
}

impl LogSummaryCache {
    /// Create an empty cache. The first refresh always generates a report.
    pub fn new(
        summarizer: Arc<dyn LogSummarizer>,
        feed: SummaryFeed,
        refresh_interval: Duration,
    ) -> Self {
        Self {
            summarizer,
            feed,
            refresh_interval,
            report: String::new(),
            last_generated: None,
        }
    }

    /// Regenerate the report if the refresh interval has elapsed.
    ///
    /// Returns `Ok(true)` when a new report was generated, `Ok(false)` when
    /// the cached report is still current, and the adapter error when a
    /// generation attempt failed.
    pub async fn refresh(&mut self) -> Result<bool, AdapterError> {
        let now = Instant::now();
        if let Some(last) = self.last_generated {
            if now.duration_since(last) < self.refresh_interval {
                return Ok(false);
            }
        }

        self.last_generated = Some(now);
        match self.summarizer.summarize(&self.feed).await {
            Ok(report) => {
                debug!(bytes = report.len(), "regenerated log summary");
                self.report = report;
                Ok(true)
            }
            Err(e) => {
                warn!(error = %e, "log summary generation failed, serving previous report");
                Err(e)
            }
        }
    }

    /// Value of `label` in the current report, zero when absent.
    pub fn lookup(&self, label: TrafficLabel) -> f64 {
        extract_statistic(&self.report, label.as_str()).unwrap_or(0.0)
    }

    /// Refresh if due, then read `label`.
    pub async fn statistic(&mut self, label: TrafficLabel) -> f64 {
        // Failures are already logged and degrade to the cached report.
        let _ = self.refresh().await;
        self.lookup(label)
    }

    /// The report currently served.
    pub fn report(&self) -> &str {
        &self.report
    }

    /// When generation was last attempted.
    pub fn last_generated(&self) -> Option<Instant> {
        self.last_generated
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }
}
