pub mod info;
pub mod latency;

use std::collections::BTreeMap;

use serde::Serialize;

pub use info::InfoParser;

/// Key under which the latency probe result is merged.
pub const LATENCY_KEY: &str = "latency";
/// Key of the label identifying who shipped the metrics.
pub const CLIENT_KEY: &str = "client";

/// One value shipped to Logstash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Int(i64),
    Label(String),
}

/// The metrics gathered during one cycle.
///
/// Serializes as a flat JSON object, e.g.
/// `{"connected_clients":1,"latency":0,"client":"acme-redis"}`.
/// A fresh set is built every cycle and handed to the sender by value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MetricSet(BTreeMap<String, MetricValue>);

impl MetricSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_int(&mut self, name: impl Into<String>, value: i64) {
        self.0.insert(name.into(), MetricValue::Int(value));
    }

    pub fn insert_label(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), MetricValue::Label(value.into()));
    }

    #[cfg(test)]
    pub fn int(&self, name: &str) -> Option<i64> {
        match self.0.get(name) {
            Some(MetricValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    #[cfg(test)]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_flat() {
        let mut set = MetricSet::new();
        set.insert_int("connected_clients", 1);
        set.insert_label(CLIENT_KEY, "acme-redis");

        let json: serde_json::Value = serde_json::to_value(&set).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"connected_clients": 1, "client": "acme-redis"})
        );
    }
}
