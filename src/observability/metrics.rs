use prometheus::{
    Encoder, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub dispatches_total: IntCounterVec,
    pub cod_validations_total: IntCounterVec,
    pub webhook_events_total: IntCounterVec,
    pub unassigned_orders: IntGauge,
    pub kurir_active_orders: IntGaugeVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let dispatches_total = IntCounterVec::new(
            Opts::new("dispatches_total", "Dispatch attempts by variant and outcome"),
            &["variant", "outcome"],
        )
        .expect("valid dispatches_total metric");

        let cod_validations_total = IntCounterVec::new(
            Opts::new("cod_validations_total", "COD eligibility checks by verdict"),
            &["verdict"],
        )
        .expect("valid cod_validations_total metric");

        let webhook_events_total = IntCounterVec::new(
            Opts::new("webhook_events_total", "Payment webhook events by provider and outcome"),
            &["provider", "outcome"],
        )
        .expect("valid webhook_events_total metric");

        let unassigned_orders = IntGauge::new(
            "unassigned_orders",
            "Confirmed orders currently without a courier",
        )
        .expect("valid unassigned_orders metric");

        let kurir_active_orders = IntGaugeVec::new(
            Opts::new("kurir_active_orders", "Active orders per courier"),
            &["kurir_id"],
        )
        .expect("valid kurir_active_orders metric");

        registry
            .register(Box::new(dispatches_total.clone()))
            .expect("register dispatches_total");
        registry
            .register(Box::new(cod_validations_total.clone()))
            .expect("register cod_validations_total");
        registry
            .register(Box::new(webhook_events_total.clone()))
            .expect("register webhook_events_total");
        registry
            .register(Box::new(unassigned_orders.clone()))
            .expect("register unassigned_orders");
        registry
            .register(Box::new(kurir_active_orders.clone()))
            .expect("register kurir_active_orders");

        Self {
            registry,
            dispatches_total,
            cod_validations_total,
            webhook_events_total,
            unassigned_orders,
            kurir_active_orders,
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
