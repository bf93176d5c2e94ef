//! Gauge identity and value.

use std::borrow::Cow;

use crate::NAMESPACE;

/// The immutable identity of a gauge: namespace, name, and help text.
///
/// Identity is fixed for the process lifetime. Two descriptors are equal
/// when all three parts are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct GaugeDesc {
    pub namespace: &'static str,
    pub name: &'static str,
    pub help: Cow<'static, str>,
}

impl GaugeDesc {
    /// Create a descriptor in the `postfix` namespace.
    pub fn new(name: &'static str, help: impl Into<Cow<'static, str>>) -> Self {
        Self {
            namespace: NAMESPACE,
            name,
            help: help.into(),
        }
    }

    /// Fully-qualified metric name, `<namespace>_<name>`.
    pub fn fq_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.to_string()
        } else {
            format!("{}_{}", self.namespace, self.name)
        }
    }
}

/// A named, unit-less value that is overwritten on every refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct Gauge {
    desc: GaugeDesc,
    value: f64,
}

impl Gauge {
    /// Create a gauge reading zero.
    pub fn new(desc: GaugeDesc) -> Self {
        Self { desc, value: 0.0 }
    }

    pub fn desc(&self) -> &GaugeDesc {
        &self.desc
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Overwrite the current value.
    pub fn set(&mut self, value: f64) {
        self.value = value;
    }
}
