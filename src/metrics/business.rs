//! Application-level event counters.

use crate::metrics::{MetricsError, MetricsRegistry};
use prometheus_client::encoding::{EncodeLabelSet, EncodeLabelValue, LabelValueEncoder};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;

/// Kind of item operation counted by `business_items_processed_total`.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum ItemOperation {
    Read,
    Create,
}

impl ItemOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemOperation::Read => "read",
            ItemOperation::Create => "create",
        }
    }
}

impl EncodeLabelValue for ItemOperation {
    fn encode(&self, encoder: &mut LabelValueEncoder<'_>) -> Result<(), std::fmt::Error> {
        EncodeLabelValue::encode(&self.as_str(), encoder)
    }
}

/// Labels of the item counter.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct ItemLabels {
    r#type: ItemOperation,
}

/// Business event instruments.
#[derive(Clone)]
pub struct BusinessMetrics {
    items_processed: Family<ItemLabels, Counter>,
}

impl BusinessMetrics {
    pub fn register(registry: &MetricsRegistry) -> Result<Self, MetricsError> {
        let items_processed = Family::<ItemLabels, Counter>::default();
        registry.register(
            "business_items_processed",
            "Total business items processed",
            items_processed.clone(),
        )?;
        Ok(Self { items_processed })
    }

    /// Count one item operation.
    pub fn record_item(&self, operation: ItemOperation) {
        self.items_processed
            .get_or_create(&ItemLabels { r#type: operation })
            .inc();
    }

    /// Number of item operations of the given kind so far.
    pub fn items_processed(&self, operation: ItemOperation) -> u64 {
        self.items_processed
            .get(&ItemLabels { r#type: operation })
            .map(|counter| counter.get())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_item() {
        let registry = MetricsRegistry::new();
        let metrics = BusinessMetrics::register(&registry).unwrap();

        metrics.record_item(ItemOperation::Read);
        metrics.record_item(ItemOperation::Read);
        metrics.record_item(ItemOperation::Create);

        assert_eq!(metrics.items_processed(ItemOperation::Read), 2);
        assert_eq!(metrics.items_processed(ItemOperation::Create), 1);

        let body = registry.snapshot().unwrap().body;
        assert!(body.contains("business_items_processed_total{type=\"read\"} 2"));
        assert!(body.contains("business_items_processed_total{type=\"create\"} 1"));
    }

    #[test]
    fn test_reading_unseen_operation_adds_no_series() {
        let registry = MetricsRegistry::new();
        let metrics = BusinessMetrics::register(&registry).unwrap();
        metrics.record_item(ItemOperation::Read);

        assert_eq!(metrics.items_processed(ItemOperation::Create), 0);

        let body = registry.snapshot().unwrap().body;
        assert!(!body.contains("type=\"create\""));
    }
}
