//! The scrape engine: one full refresh of every gauge.

use std::sync::Arc;

use postfix_adapters::{AdapterError, QueueSource};
use postfix_types::{QueueName, SampleSet, TrafficLabel};
use tracing::warn;

use crate::cache::LogSummaryCache;

/// Refreshes the sample set from the data-source adapters.
///
/// Adapter failures never escape a refresh. A failed or unparsable lookup
/// sets its gauge to zero, so a broken adapter is indistinguishable from an
/// empty queue in the exposition; it shows up only in the logs and in
/// [`ScrapeEngine::last_failures`].
#[derive(Debug)]
pub struct ScrapeEngine {
    queues: Arc<dyn QueueSource>,
    summary: Option<LogSummaryCache>,
    samples: SampleSet,
    last_failures: usize,
}

impl ScrapeEngine {
    /// Create an engine. Traffic gauges exist only when `summary` is given.
    pub fn new(queues: Arc<dyn QueueSource>, summary: Option<LogSummaryCache>) -> Self {
        let samples = SampleSet::new(summary.is_some());
        Self {
            queues,
            summary,
            samples,
            last_failures: 0,
        }
    }

    /// Run one refresh cycle. Adapter calls are issued sequentially.
    pub async fn refresh(&mut self) {
        let mut failures = 0;

        let total = self.queues.total_queue_length().await;
        self.samples
            .set_total_queue(value_or_zero(total, "total queue", &mut failures));

        // One postconf call shared by all six queue counts
        match self.queues.queue_directory().await {
            Ok(root) => {
                for queue in QueueName::ALL {
                    let count = self.queues.count_queue(&root, queue).await;
                    let value = value_or_zero(count, queue.as_str(), &mut failures);
                    self.samples.set_queue(queue, value);
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to resolve queue directory");
                failures += 1;
                for queue in QueueName::ALL {
                    self.samples.set_queue(queue, 0.0);
                }
            }
        }

        if let Some(cache) = self.summary.as_mut() {
            // At most one regeneration per refresh; the eight lookups share it
            if cache.refresh().await.is_err() {
                failures += 1;
            }
            for label in TrafficLabel::ALL {
                self.samples.set_traffic(label, cache.lookup(label));
            }
        }

        self.last_failures = failures;
    }

    /// Gauges as of the last refresh.
    pub fn samples(&self) -> &SampleSet {
        &self.samples
    }

    /// Number of adapter failures during the last refresh.
    pub fn last_failures(&self) -> usize {
        self.last_failures
    }
}

fn value_or_zero(result: Result<String, AdapterError>, what: &str, failures: &mut usize) -> f64 {
    match result {
        Ok(raw) => parse_value(&raw),
        Err(e) => {
            warn!(source = what, error = %e, "adapter call failed");
            *failures += 1;
            0.0
        }
    }
}

/// Interpret raw adapter output as a gauge value.
///
/// Empty, non-numeric, or non-finite output reads as zero.
pub fn parse_value(raw: &str) -> f64 {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}
