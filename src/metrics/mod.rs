use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

use crate::domain::order::{Material, Order, OrderItem};

// ============================================================================
// Metrics Module - Prometheus metrics for the order flow
// ============================================================================
//
// Covers:
// - Tag classification (items per material, readings without a code)
// - Image analysis attempts and failures
// - Finalized orders and their size
// - Planned uploads
//
// ============================================================================

pub struct Metrics {
    registry: Registry,

    // Classification Metrics
    pub items_classified: IntCounterVec,
    pub readings_dropped: IntCounter,

    // Analysis Metrics
    pub analysis_attempts: IntCounter,
    pub analysis_failures: IntCounterVec,

    // Order Metrics
    pub orders_finalized: IntCounter,
    pub order_items: Histogram,

    // Delivery Metrics
    pub uploads_planned: IntCounter,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let items_classified = IntCounterVec::new(
            Opts::new("items_classified_total", "Order items classified, by material"),
            &["material"],
        )?;
        registry.register(Box::new(items_classified.clone()))?;

        let readings_dropped = IntCounter::new(
            "readings_dropped_total",
            "Tag readings discarded because they had no code",
        )?;
        registry.register(Box::new(readings_dropped.clone()))?;

        let analysis_attempts = IntCounter::new(
            "analysis_attempts_total",
            "Calls made to the image analysis service",
        )?;
        registry.register(Box::new(analysis_attempts.clone()))?;

        let analysis_failures = IntCounterVec::new(
            Opts::new("analysis_failures_total", "Image analyses that failed after retries"),
            &["reason"],
        )?;
        registry.register(Box::new(analysis_failures.clone()))?;

        let orders_finalized = IntCounter::new(
            "orders_finalized_total",
            "Orders signed and stored",
        )?;
        registry.register(Box::new(orders_finalized.clone()))?;

        let order_items = Histogram::with_opts(
            HistogramOpts::new("order_items", "Items per finalized order")
                .buckets(vec![1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0]),
        )?;
        registry.register(Box::new(order_items.clone()))?;

        let uploads_planned = IntCounter::new(
            "uploads_planned_total",
            "Order sheets queued for remote upload",
        )?;
        registry.register(Box::new(uploads_planned.clone()))?;

        Ok(Self {
            registry,
            items_classified,
            readings_dropped,
            analysis_attempts,
            analysis_failures,
            orders_finalized,
            order_items,
            uploads_planned,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_classified(&self, items: &[OrderItem], readings: usize) {
        for item in items {
            self.items_classified
                .with_label_values(&[item.material.as_str()])
                .inc();
        }
        self.readings_dropped
            .inc_by(readings.saturating_sub(items.len()) as u64);
    }

    pub fn record_finalized(&self, order: &Order) {
        self.orders_finalized.inc();
        self.order_items.observe(order.total_items() as f64);
    }

    pub fn classified_count(&self, material: Material) -> u64 {
        self.items_classified
            .with_label_values(&[material.as_str()])
            .get()
    }

    /// Text exposition format, as served on a /metrics endpoint
    pub fn render(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{classify_batch, RawTagReading};

    #[test]
    fn test_record_classified_counts_by_material() {
        let metrics = Metrics::new().unwrap();
        let readings = vec![
            RawTagReading::new("A123", None, None),
            RawTagReading::new("1102", None, None),
            RawTagReading::new("1501", None, None),
            RawTagReading::default(),
        ];
        let items = classify_batch(&readings);

        metrics.record_classified(&items, readings.len());

        assert_eq!(metrics.classified_count(Material::Oro), 1);
        assert_eq!(metrics.classified_count(Material::Acero), 2);
        assert_eq!(metrics.readings_dropped.get(), 1);
    }

    #[test]
    fn test_render_includes_registered_metrics() {
        let metrics = Metrics::new().unwrap();
        metrics.orders_finalized.inc();

        let text = metrics.render().unwrap();
        assert!(text.contains("orders_finalized_total 1"));
    }
}
