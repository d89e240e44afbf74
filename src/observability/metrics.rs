use prometheus::{
    Encoder, GaugeVec, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub offers_total: IntCounterVec,
    pub dispatch_queue_depth: IntGauge,
    pub offer_resolution_seconds: HistogramVec,
    pub rider_utilization: GaugeVec,
    pub manual_assignments_total: IntCounter,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let offers_total = IntCounterVec::new(
            Opts::new("offers_total", "Resolved assignment offers by outcome"),
            &["outcome"],
        )
        .expect("valid offers_total metric");

        let dispatch_queue_depth =
            IntGauge::new("dispatch_queue_depth", "Orders waiting for dispatch")
                .expect("valid dispatch_queue_depth metric");

        let offer_resolution_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "offer_resolution_seconds",
                "Time from offer creation to resolution in seconds",
            ),
            &["outcome"],
        )
        .expect("valid offer_resolution_seconds metric");

        let rider_utilization = GaugeVec::new(
            Opts::new("rider_utilization", "Rider batch utilization ratio [0..1]"),
            &["rider_id"],
        )
        .expect("valid rider_utilization metric");

        let manual_assignments_total = IntCounter::new(
            "manual_assignments_total",
            "Orders parked for manual assignment",
        )
        .expect("valid manual_assignments_total metric");

        registry
            .register(Box::new(offers_total.clone()))
            .expect("register offers_total");
        registry
            .register(Box::new(dispatch_queue_depth.clone()))
            .expect("register dispatch_queue_depth");
        registry
            .register(Box::new(offer_resolution_seconds.clone()))
            .expect("register offer_resolution_seconds");
        registry
            .register(Box::new(rider_utilization.clone()))
            .expect("register rider_utilization");
        registry
            .register(Box::new(manual_assignments_total.clone()))
            .expect("register manual_assignments_total");

        Self {
            registry,
            offers_total,
            dispatch_queue_depth,
            offer_resolution_seconds,
            rider_utilization,
            manual_assignments_total,
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
