//! The collector façade registered with the metrics registry.

use std::sync::Arc;

use async_trait::async_trait;
use postfix_adapters::{LogSummarizer, Pflogsumm, PostfixQueues, QueueSource};
use postfix_types::{GaugeDesc, Sample};
use tokio::sync::Mutex;
use tracing::debug;

use crate::cache::LogSummaryCache;
use crate::config::Settings;
use crate::engine::ScrapeEngine;
use crate::registry::Collector;

/// Serializes scrapes of the Postfix exporter.
///
/// `collect` holds an exclusive lock for the whole refresh-and-emit cycle,
/// so overlapping polls never interleave: a second poll waits for the first
/// to finish and then runs its own full refresh. `describe` reads a
/// descriptor list fixed at construction and never waits on the lock.
#[derive(Debug)]
pub struct PostfixCollector {
    descs: Vec<GaugeDesc>,
    engine: Mutex<ScrapeEngine>,
}

impl PostfixCollector {
    pub fn new(engine: ScrapeEngine) -> Self {
        Self {
            descs: engine.samples().descs(),
            engine: Mutex::new(engine),
        }
    }

    /// Build the collector with the Postfix adapters described by `settings`.
    pub fn from_settings(settings: &Settings) -> Self {
        let timeout = settings.command_timeout();

        let queues: Arc<dyn QueueSource> = Arc::new(
            PostfixQueues::builder()
                .postqueue(&settings.tools.postqueue)
                .postconf(&settings.tools.postconf)
                .timeout(timeout)
                .build(),
        );

        let summary = settings.summary_feed().map(|feed| {
            let summarizer: Arc<dyn LogSummarizer> = Arc::new(
                Pflogsumm::builder()
                    .pflogsumm(&settings.tools.pflogsumm)
                    .journalctl(&settings.tools.journalctl)
                    .timeout(timeout)
                    .build(),
            );
            LogSummaryCache::new(summarizer, feed, settings.refresh_interval())
        });

        Self::new(ScrapeEngine::new(queues, summary))
    }
}

#[async_trait]
impl Collector for PostfixCollector {
    fn describe(&self) -> Vec<GaugeDesc> {
        self.descs.clone()
    }

    async fn collect(&self) -> Vec<Sample> {
        let mut engine = self.engine.lock().await;
        engine.refresh().await;
        debug!(
            failures = engine.last_failures(),
            gauges = engine.samples().len(),
            "scrape complete"
        );
        engine.samples().samples()
    }
}
