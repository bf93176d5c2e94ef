//! A minimal pull-based metrics registry.
//!
//! Collectors are registered once at startup. Every call to
//! [`Registry::gather`] asks each collector for fresh samples and renders
//! them in the Prometheus text exposition format.

use std::collections::HashSet;
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use postfix_types::{GaugeDesc, Sample};

use crate::error::RegistryError;
use crate::prometheus::format_prometheus;

/// A source of metrics polled on every scrape.
#[async_trait]
pub trait Collector: Send + Sync + Debug {
    /// Static identity of every metric this collector emits.
    ///
    /// Must not touch any data source.
    fn describe(&self) -> Vec<GaugeDesc>;

    /// Current value of every described metric.
    async fn collect(&self) -> Vec<Sample>;
}

/// The set of registered collectors.
#[derive(Debug, Default)]
pub struct Registry {
    collectors: RwLock<Vec<Arc<dyn Collector>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a collector.
    ///
    /// Fails if any metric it describes is already described by a
    /// registered collector.
    pub fn register(&self, collector: Arc<dyn Collector>) -> Result<(), RegistryError> {
        let mut collectors = self.collectors.write();

        let known: HashSet<String> = collectors
            .iter()
            .flat_map(|c| c.describe())
            .map(|d| d.fq_name())
            .collect();

        let mut incoming = HashSet::new();
        for desc in collector.describe() {
            let name = desc.fq_name();
            if known.contains(&name) || !incoming.insert(name.clone()) {
                return Err(RegistryError::Duplicate(name));
            }
        }

        collectors.push(collector);
        Ok(())
    }

    /// Identities of every registered metric.
    pub fn describe(&self) -> Vec<GaugeDesc> {
        self.collectors
            .read()
            .iter()
            .flat_map(|c| c.describe())
            .collect()
    }

    /// Collect every registered collector, in registration order.
    pub async fn collect(&self) -> Vec<Sample> {
        // Clone the handles so the lock is not held across collection
        let collectors: Vec<Arc<dyn Collector>> = self.collectors.read().clone();

        let mut samples = Vec::new();
        for collector in collectors {
            samples.extend(collector.collect().await);
        }
        samples
    }

    /// Collect and render in Prometheus text format.
    pub async fn gather(&self) -> String {
        format_prometheus(&self.collect().await)
    }
}
