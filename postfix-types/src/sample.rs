//! The fixed set of gauges the exporter owns.

use crate::{Gauge, GaugeDesc, QueueName, TrafficLabel};

/// One emitted value: fully-qualified name, help text, and current value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Sample {
    pub name: String,
    pub help: String,
    pub value: f64,
}

impl Sample {
    pub fn from_gauge(gauge: &Gauge) -> Self {
        Self {
            name: gauge.desc().fq_name(),
            help: gauge.desc().help.to_string(),
            value: gauge.value(),
        }
    }
}

/// Fixed-cardinality collection of the exporter's gauges.
///
/// Seven queue-depth gauges are always present. The eight traffic-counter
/// gauges exist only when log summary collection is enabled at
/// construction. No gauge is added or removed afterwards, so every gauge
/// that is ever described is also collected and vice versa.
#[derive(Debug, Clone)]
pub struct SampleSet {
    total_queue: Gauge,
    queues: [Gauge; 6],
    traffic: Option<[Gauge; 8]>,
}

impl SampleSet {
    /// Create the sample set, with traffic gauges when `with_traffic` is set.
    pub fn new(with_traffic: bool) -> Self {
        Self {
            total_queue: Gauge::new(GaugeDesc::new("total_queue_length", "length of mail queue")),
            queues: QueueName::ALL.map(|q| Gauge::new(queue_desc(q))),
            traffic: with_traffic.then(|| TrafficLabel::ALL.map(|l| Gauge::new(traffic_desc(l)))),
        }
    }

    /// Whether the traffic-counter gauges are present.
    pub fn has_traffic(&self) -> bool {
        self.traffic.is_some()
    }

    /// Number of gauges present (7 or 15).
    pub fn len(&self) -> usize {
        1 + self.queues.len() + self.traffic.as_ref().map_or(0, |t| t.len())
    }

    /// Always false; the queue gauges are unconditional.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn set_total_queue(&mut self, value: f64) {
        self.total_queue.set(value);
    }

    pub fn total_queue(&self) -> f64 {
        self.total_queue.value()
    }

    pub fn set_queue(&mut self, queue: QueueName, value: f64) {
        self.queues[queue.index()].set(value);
    }

    pub fn queue(&self, queue: QueueName) -> f64 {
        self.queues[queue.index()].value()
    }

    /// Set a traffic gauge. Ignored when traffic gauges are absent.
    pub fn set_traffic(&mut self, label: TrafficLabel, value: f64) {
        if let Some(traffic) = self.traffic.as_mut() {
            traffic[label.index()].set(value);
        }
    }

    /// Current value of a traffic gauge, `None` when traffic gauges are absent.
    pub fn traffic(&self, label: TrafficLabel) -> Option<f64> {
        self.traffic.as_ref().map(|t| t[label.index()].value())
    }

    /// Iterate over every present gauge: total, the six queues, then traffic.
    pub fn iter(&self) -> impl Iterator<Item = &Gauge> {
        core::iter::once(&self.total_queue)
            .chain(self.queues.iter())
            .chain(self.traffic.iter().flat_map(|t| t.iter()))
    }

    /// Identities of every present gauge.
    pub fn descs(&self) -> Vec<GaugeDesc> {
        self.iter().map(|g| g.desc().clone()).collect()
    }

    /// Current values of every present gauge.
    pub fn samples(&self) -> Vec<Sample> {
        self.iter().map(Sample::from_gauge).collect()
    }
}

fn queue_desc(queue: QueueName) -> GaugeDesc {
    let (name, help) = match queue {
        QueueName::Incoming => ("incoming_queue_length", "length of incoming mail queue"),
        QueueName::Active => ("active_queue_length", "length of active mail queue"),
        QueueName::Maildrop => ("maildrop_queue_length", "length of maildrop queue"),
        QueueName::Deferred => ("deferred_queue_length", "length of deferred mail queue"),
        QueueName::Hold => ("hold_queue_length", "length of hold mail queue"),
        QueueName::Bounce => ("bounce_queue_length", "length of bounce mail queue"),
    };
    GaugeDesc::new(name, help)
}

fn traffic_desc(label: TrafficLabel) -> GaugeDesc {
    GaugeDesc::new(
        label.as_str(),
        format!("number of {} messages (from log summary)", label.as_str()),
    )
}
