use prometheus::{
    Encoder, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub orders_created_total: IntCounterVec,
    pub reservation_conflicts_total: IntCounter,
    pub order_completions_total: IntCounterVec,
    pub reconciler_releases_total: IntCounterVec,
    pub order_creation_seconds: HistogramVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let orders_created_total = IntCounterVec::new(
            Opts::new("orders_created_total", "Order creations by outcome"),
            &["outcome"],
        )
        .expect("valid orders_created_total metric");

        let reservation_conflicts_total = IntCounter::new(
            "reservation_conflicts_total",
            "Reservations lost to a concurrent order",
        )
        .expect("valid reservation_conflicts_total metric");

        let order_completions_total = IntCounterVec::new(
            Opts::new("order_completions_total", "Order completions by trigger"),
            &["trigger"],
        )
        .expect("valid order_completions_total metric");

        let reconciler_releases_total = IntCounterVec::new(
            Opts::new(
                "reconciler_releases_total",
                "Availability rows repaired by the sweep",
            ),
            &["entity"],
        )
        .expect("valid reconciler_releases_total metric");

        let order_creation_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "order_creation_seconds",
                "Latency of order creation in seconds",
            ),
            &["outcome"],
        )
        .expect("valid order_creation_seconds metric");

        registry
            .register(Box::new(orders_created_total.clone()))
            .expect("register orders_created_total");
        registry
            .register(Box::new(reservation_conflicts_total.clone()))
            .expect("register reservation_conflicts_total");
        registry
            .register(Box::new(order_completions_total.clone()))
            .expect("register order_completions_total");
        registry
            .register(Box::new(reconciler_releases_total.clone()))
            .expect("register reconciler_releases_total");
        registry
            .register(Box::new(order_creation_seconds.clone()))
            .expect("register order_creation_seconds");

        Self {
            registry,
            orders_created_total,
            reservation_conflicts_total,
            order_completions_total,
            reconciler_releases_total,
            order_creation_seconds,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
