//! Closed label sets addressing the exporter's gauges.

use core::fmt;

/// A Postfix queue subdirectory below `queue_directory`.
///
/// The set is closed: paths are only ever built from these names, so no
/// caller-supplied string reaches the filesystem or a command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum QueueName {
    Incoming,
    Active,
    Maildrop,
    Deferred,
    Hold,
    Bounce,
}

impl QueueName {
    /// All queues, in scrape order.
    pub const ALL: [QueueName; 6] = [
        QueueName::Incoming,
        QueueName::Active,
        QueueName::Maildrop,
        QueueName::Deferred,
        QueueName::Hold,
        QueueName::Bounce,
    ];

    /// Directory name of this queue below the queue root.
    pub const fn as_str(&self) -> &'static str {
        match self {
            QueueName::Incoming => "incoming",
            QueueName::Active => "active",
            QueueName::Maildrop => "maildrop",
            QueueName::Deferred => "deferred",
            QueueName::Hold => "hold",
            QueueName::Bounce => "bounce",
        }
    }

    pub(crate) const fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for QueueName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message counter reported in the "Grand Totals" section of a
/// `pflogsumm` report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum TrafficLabel {
    Received,
    Delivered,
    Forwarded,
    Deferred,
    Bounced,
    Rejected,
    Held,
    Discarded,
}

impl TrafficLabel {
    /// All labels, in scrape order.
    pub const ALL: [TrafficLabel; 8] = [
        TrafficLabel::Received,
        TrafficLabel::Delivered,
        TrafficLabel::Forwarded,
        TrafficLabel::Deferred,
        TrafficLabel::Bounced,
        TrafficLabel::Rejected,
        TrafficLabel::Held,
        TrafficLabel::Discarded,
    ];

    /// The word `pflogsumm` prints after the count.
    pub const fn as_str(&self) -> &'static str {
        match self {
            TrafficLabel::Received => "received",
            TrafficLabel::Delivered => "delivered",
            TrafficLabel::Forwarded => "forwarded",
            TrafficLabel::Deferred => "deferred",
            TrafficLabel::Bounced => "bounced",
            TrafficLabel::Rejected => "rejected",
            TrafficLabel::Held => "held",
            TrafficLabel::Discarded => "discarded",
        }
    }

    pub(crate) const fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for TrafficLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
