use prometheus::{Counter, Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub lifecycle_transitions_total: IntCounterVec,
    pub active_sessions: IntGauge,
    pub pickups_in_store: IntGauge,
    pub completed_payout_total: Counter,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let lifecycle_transitions_total = IntCounterVec::new(
            Opts::new(
                "lifecycle_transitions_total",
                "Lifecycle operations by operation and outcome",
            ),
            &["operation", "outcome"],
        )
        .expect("valid lifecycle_transitions_total metric");

        let active_sessions = IntGauge::new("active_sessions", "Currently authenticated sessions")
            .expect("valid active_sessions metric");

        let pickups_in_store = IntGauge::new("pickups_in_store", "Pickup records in the store")
            .expect("valid pickups_in_store metric");

        let completed_payout_total = Counter::new(
            "completed_payout_total",
            "Sum of totals across approved pickups",
        )
        .expect("valid completed_payout_total metric");

        registry
            .register(Box::new(lifecycle_transitions_total.clone()))
            .expect("register lifecycle_transitions_total");
        registry
            .register(Box::new(active_sessions.clone()))
            .expect("register active_sessions");
        registry
            .register(Box::new(pickups_in_store.clone()))
            .expect("register pickups_in_store");
        registry
            .register(Box::new(completed_payout_total.clone()))
            .expect("register completed_payout_total");

        Self {
            registry,
            lifecycle_transitions_total,
            active_sessions,
            pickups_in_store,
            completed_payout_total,
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
