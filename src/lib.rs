//! # postfix-exporter
//!
//! A Prometheus exporter for Postfix queue depths and log summary counters.
//!
//! Every poll of the metrics endpoint runs one full scrape: the total queue
//! length from `postqueue`, a file count for each of the six Postfix queues,
//! and optionally eight traffic counters read from a `pflogsumm` report. The
//! report is expensive to produce, so it is cached and regenerated at most
//! once per refresh interval.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  HTTP poll ──▶ Registry ──▶ PostfixCollector (exclusive lock)│
//! │                                   │                          │
//! │                                   ▼                          │
//! │                              ScrapeEngine ──▶ SampleSet      │
//! │                               │        │                     │
//! │                               ▼        ▼                     │
//! │                      QueueSource   LogSummaryCache           │
//! │                                        │                     │
//! │                                        ▼                     │
//! │                                  LogSummarizer               │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`cache`]**: the time-gated log summary cache
//! - **[`engine`]**: one refresh cycle over every gauge
//! - **[`collector`]**: the lock-serialized façade the registry polls
//! - **[`registry`]**: collector registration and gathering
//! - **[`prometheus`]**: text exposition and the HTTP endpoint
//! - **[`config`]**: layered settings and startup validation
//!
//! ## Usage
//!
//! ```bash
//! # Queue depths only
//! postfix-exporter --listen-address 0.0.0.0:9154
//!
//! # With traffic counters from the systemd journal
//! postfix-exporter --log-summary --journal
//! ```
//!
//! ### As a library
//!
//! ```no_run
//! use std::sync::Arc;
//! use postfix_adapters::PostfixQueues;
//! use postfix_exporter::{PostfixCollector, Registry, ScrapeEngine};
//!
//! # tokio_test::block_on(async {
//! let engine = ScrapeEngine::new(Arc::new(PostfixQueues::builder().build()), None);
//! let registry = Registry::new();
//! registry.register(Arc::new(PostfixCollector::new(engine))).unwrap();
//!
//! println!("{}", registry.gather().await);
//! # });
//! ```

pub mod cache;
pub mod collector;
pub mod config;
pub mod engine;
pub mod error;
pub mod prometheus;
pub mod registry;

#[cfg(test)]
mod testing;

pub use cache::LogSummaryCache;
pub use collector::PostfixCollector;
pub use config::{Overrides, Settings};
pub use engine::ScrapeEngine;
pub use error::{ConfigError, RegistryError};
pub use registry::{Collector, Registry};
