use prometheus::{
    Encoder, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub packages_created_total: IntCounter,
    pub status_changes_total: IntCounterVec,
    pub events_in_queue: IntGauge,
    pub route_optimizations_total: IntCounterVec,
    pub ai_request_latency_seconds: HistogramVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let packages_created_total =
            IntCounter::new("packages_created_total", "Total packages created")
                .expect("valid packages_created_total metric");

        let status_changes_total = IntCounterVec::new(
            Opts::new("status_changes_total", "Package status changes by target status"),
            &["status"],
        )
        .expect("valid status_changes_total metric");

        let events_in_queue = IntGauge::new(
            "events_in_queue",
            "Package events waiting for the notification engine",
        )
        .expect("valid events_in_queue metric");

        let route_optimizations_total = IntCounterVec::new(
            Opts::new(
                "route_optimizations_total",
                "Route optimizations by source (ai or fallback)",
            ),
            &["source"],
        )
        .expect("valid route_optimizations_total metric");

        let ai_request_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "ai_request_latency_seconds",
                "Latency of chat-completion requests in seconds",
            ),
            &["operation", "outcome"],
        )
        .expect("valid ai_request_latency_seconds metric");

        registry
            .register(Box::new(packages_created_total.clone()))
            .expect("register packages_created_total");
        registry
            .register(Box::new(status_changes_total.clone()))
            .expect("register status_changes_total");
        registry
            .register(Box::new(events_in_queue.clone()))
            .expect("register events_in_queue");
        registry
            .register(Box::new(route_optimizations_total.clone()))
            .expect("register route_optimizations_total");
        registry
            .register(Box::new(ai_request_latency_seconds.clone()))
            .expect("register ai_request_latency_seconds");

        Self {
            registry,
            packages_created_total,
            status_changes_total,
            events_in_queue,
            route_optimizations_total,
            ai_request_latency_seconds,
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

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
