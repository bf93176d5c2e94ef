//! Postfix queue adapter.
//!
//! Reads the total queue length from `postqueue -p`, the queue root from
//! `postconf -h queue_directory`, and counts per-queue message files by
//! walking the queue directory directly.
//!
//! ## Example
//!
//! ```rust,no_run
//! use postfix_adapters::queue::{PostfixQueues, QueueSource};
//! use postfix_types::QueueName;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let queues = PostfixQueues::builder().build();
//!
//!     let root = queues.queue_directory().await?;
//!     let deferred = queues.count_queue(&root, QueueName::Deferred).await?;
//!
//!     println!("deferred: {}", deferred);
//!     Ok(())
//! }
//! ```

use std::fmt::Debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use postfix_types::QueueName;

use crate::command;
use crate::AdapterError;

/// Source of raw queue-depth values.
///
/// Results are raw strings; the caller owns numeric interpretation so that
/// empty or garbled output degrades the same way as a failed call.
#[async_trait]
pub trait QueueSource: Send + Sync + Debug {
    /// Total number of messages across all queues.
    async fn total_queue_length(&self) -> Result<String, AdapterError>;

    /// The configured Postfix queue root directory.
    async fn queue_directory(&self) -> Result<PathBuf, AdapterError>;

    /// Number of message files under `<root>/<queue>`.
    async fn count_queue(&self, root: &Path, queue: QueueName) -> Result<String, AdapterError>;
}

/// Queue adapter backed by the Postfix command-line tools and the queue
/// directory on disk.
#[derive(Debug, Clone)]
pub struct PostfixQueues {
    postqueue: PathBuf,
    postconf: PathBuf,
    timeout: Duration,
}

impl PostfixQueues {
    /// Create a new builder for configuring the adapter.
    pub fn builder() -> PostfixQueuesBuilder {
        PostfixQueuesBuilder::default()
    }
}

#[async_trait]
impl QueueSource for PostfixQueues {
    async fn total_queue_length(&self) -> Result<String, AdapterError> {
        let output = command::run(&self.postqueue, ["-p"], None, self.timeout).await?;
        Ok(parse_postqueue_total(&output))
    }

    async fn queue_directory(&self) -> Result<PathBuf, AdapterError> {
        let output =
            command::run(&self.postconf, ["-h", "queue_directory"], None, self.timeout).await?;
        let dir = output.trim();
        if dir.is_empty() {
            return Err(AdapterError::Parse(
                "postconf returned an empty queue_directory".to_string(),
            ));
        }
        Ok(PathBuf::from(dir))
    }

    async fn count_queue(&self, root: &Path, queue: QueueName) -> Result<String, AdapterError> {
        let dir = root.join(queue.as_str());
        let count = tokio::task::spawn_blocking(move || count_files(&dir))
            .await
            .map_err(|e| AdapterError::Io(io::Error::new(io::ErrorKind::Other, e)))??;
        Ok(count.to_string())
    }
}

/// Builder for PostfixQueues.
#[derive(Debug, Default)]
pub struct PostfixQueuesBuilder {
    postqueue: Option<PathBuf>,
    postconf: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl PostfixQueuesBuilder {
    /// Set the `postqueue` binary (default: `postqueue` on `$PATH`).
    pub fn postqueue(mut self, path: impl Into<PathBuf>) -> Self {
        self.postqueue = Some(path.into());
        self
    }

    /// Set the `postconf` binary (default: `postconf` on `$PATH`).
    pub fn postconf(mut self, path: impl Into<PathBuf>) -> Self {
        self.postconf = Some(path.into());
        self
    }

    /// Set the per-command timeout (default: 10 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the adapter.
    pub fn build(self) -> PostfixQueues {
        PostfixQueues {
            postqueue: self.postqueue.unwrap_or_else(|| PathBuf::from("postqueue")),
            postconf: self.postconf.unwrap_or_else(|| PathBuf::from("postconf")),
            timeout: self.timeout.unwrap_or(Duration::from_secs(10)),
        }
    }
}

/// Extract the request count from `postqueue -p` output.
///
/// The last line is either `-- 3 Kbytes in 12 Requests.` (fifth field is
/// the count) or `Mail queue is empty`. Anything else yields the fifth
/// field if present, otherwise an empty string.
pub fn parse_postqueue_total(output: &str) -> String {
    let Some(last) = output.lines().rev().find(|l| !l.trim().is_empty()) else {
        return String::new();
    };

    if last.trim_start().starts_with("Mail queue is empty") {
        return "0".to_string();
    }

    last.split_whitespace()
        .nth(4)
        .map(str::to_string)
        .unwrap_or_default()
}

/// Recursively count regular files below `dir`.
///
/// Symlinks are not followed. A missing or unreadable top-level directory
/// is an error; unreadable entries further down are skipped.
pub fn count_files(dir: &Path) -> io::Result<u64> {
    let mut count = 0;
    let mut pending = vec![dir.to_path_buf()];
    let mut top = true;

    while let Some(current) = pending.pop() {
        let entries = match fs::read_dir(&current) {
            Ok(entries) => entries,
            Err(e) if top => return Err(e),
            Err(_) => continue,
        };
        top = false;

        for entry in entries.flatten() {
            match entry.file_type() {
                Ok(ft) if ft.is_dir() => pending.push(entry.path()),
                Ok(ft) if ft.is_file() => count += 1,
                _ => {}
            }
        }
    }

    Ok(count)
}
