//! # postfix-adapters
//!
//! Data-source adapters for collecting Postfix state.
//!
//! Each adapter answers one narrow question about the mail system and
//! returns a raw value or an [`AdapterError`]. Adapters never shell out:
//! external tools are invoked with discrete argument vectors under a
//! bounded timeout, and queue directories are counted by walking the
//! filesystem directly.
//!
//! ## Adapters
//!
//! - **Queues** ([`queue::PostfixQueues`]) - total queue length via
//!   `postqueue -p`, the queue root via `postconf`, and per-queue file counts
//! - **Log summary** ([`pflogsumm::Pflogsumm`]) - a `pflogsumm` report fed from
//!   a logfile or from the systemd journal
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use postfix_adapters::queue::{PostfixQueues, QueueSource};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let queues = PostfixQueues::builder()
//!         .timeout(Duration::from_secs(5))
//!         .build();
//!
//!     println!("total: {}", queues.total_queue_length().await?);
//!     Ok(())
//! }
//! ```

mod command;
pub mod error;
pub mod pflogsumm;
pub mod queue;

pub use error::AdapterError;
pub use pflogsumm::{extract_statistic, LogSummarizer, Pflogsumm, SummaryFeed};
pub use queue::{PostfixQueues, QueueSource};

// Re-export types for convenience
pub use postfix_types::{QueueName, TrafficLabel};
