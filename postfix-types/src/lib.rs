//! # postfix-types
//!
//! Core types for the Postfix exporter. This crate defines the fixed set of
//! gauges the exporter owns and the closed label sets (queue names and log
//! summary counters) used to address them.
//!
//! ## Design Goals
//!
//! - **Zero required dependencies**: Core types work without any serialization framework
//! - **Fixed cardinality**: A [`SampleSet`] never gains or loses gauges after construction
//! - **Closed label sets**: Queue names and traffic labels are enums, never free strings
//!
//! ## Features
//!
//! - `serde`: Serialization of samples and labels via serde
//!
//! ## Example
//!
//! ```rust
//! use postfix_types::{QueueName, SampleSet, TrafficLabel};
//!
//! let mut samples = SampleSet::new(true);
//! samples.set_total_queue(12.0);
//! samples.set_queue(QueueName::Deferred, 3.0);
//! samples.set_traffic(TrafficLabel::Received, 100.0);
//!
//! assert_eq!(samples.len(), 15);
//! assert_eq!(samples.queue(QueueName::Deferred), 3.0);
//! ```

mod gauge;
mod labels;
mod sample;

pub use gauge::*;
pub use labels::*;
pub use sample::*;

/// Namespace prefix shared by every exported metric.
pub const NAMESPACE: &str = "postfix";
