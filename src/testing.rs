//! Stub adapters with call counters for unit tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use postfix_adapters::{AdapterError, LogSummarizer, QueueSource, SummaryFeed};
use postfix_types::QueueName;
use tokio::sync::Notify;

fn unavailable(what: &str) -> AdapterError {
    AdapterError::Parse(format!("{} unavailable", what))
}

/// Queue source returning canned values.
///
/// A queue without a canned count fails. When a gate is installed, every
/// `total_queue_length` call parks until the gate is notified. Overlapping
/// refresh cycles (a new `total_queue_length` before the previous cycle's
/// bounce count) are counted.
#[derive(Debug, Default)]
pub struct StubQueues {
    total: Mutex<String>,
    root: Mutex<Option<PathBuf>>,
    counts: Mutex<HashMap<QueueName, String>>,
    gate: Option<Arc<Notify>>,
    calls: AtomicUsize,
    in_cycle: AtomicBool,
    overlaps: AtomicUsize,
}

impl StubQueues {
    /// Every queue reports `count`, the total reports `total`.
    pub fn uniform(total: &str, count: &str) -> Self {
        let stub = Self::default();
        stub.set_total(total);
        *stub.root.lock() = Some(PathBuf::from("/var/spool/postfix"));
        for queue in QueueName::ALL {
            stub.set_count(queue, count);
        }
        stub
    }

    pub fn with_gate(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn set_total(&self, total: &str) {
        *self.total.lock() = total.to_string();
    }

    pub fn set_count(&self, queue: QueueName, count: &str) {
        self.counts.lock().insert(queue, count.to_string());
    }

    pub fn remove_count(&self, queue: QueueName) {
        self.counts.lock().remove(&queue);
    }

    pub fn clear_root(&self) {
        *self.root.lock() = None;
    }

    /// Number of adapter calls of any kind.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn overlaps(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueueSource for StubQueues {
    async fn total_queue_length(&self) -> Result<String, AdapterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.in_cycle.swap(true, Ordering::SeqCst) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        tokio::task::yield_now().await;
        Ok(self.total.lock().clone())
    }

    async fn queue_directory(&self) -> Result<PathBuf, AdapterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.root.lock().clone().ok_or_else(|| unavailable("queue_directory"))
    }

    async fn count_queue(&self, _root: &Path, queue: QueueName) -> Result<String, AdapterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if queue == QueueName::Bounce {
            self.in_cycle.store(false, Ordering::SeqCst);
        }
        self.counts
            .lock()
            .get(&queue)
            .cloned()
            .ok_or_else(|| unavailable(queue.as_str()))
    }
}

/// Summarizer producing a minimal pflogsumm report.
#[derive(Debug)]
pub struct StubSummarizer {
    received: AtomicU64,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl StubSummarizer {
    pub fn new(received: u64) -> Self {
        Self {
            received: AtomicU64::new(received),
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_received(&self, received: u64) {
        self.received.store(received, Ordering::SeqCst);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LogSummarizer for StubSummarizer {
    async fn summarize(&self, _feed: &SummaryFeed) -> Result<String, AdapterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(unavailable("pflogsumm"));
        }
        Ok(format!(
            "Grand Totals\n------------\nmessages\n\n   {}   received\n     40   delivered\n      2   bounced\n",
            self.received.load(Ordering::SeqCst)
        ))
    }
}
