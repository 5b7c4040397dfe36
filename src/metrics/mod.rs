use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

// ============================================================================
// Metrics Module - Prometheus metrics for the order lifecycle
// ============================================================================
//
// Provides metrics for:
// - Committed transitions (by event, source and target state)
// - No-op fires (no candidate or every guard rejected)
// - Guard evaluations and their outcomes
// - Fire latency, dominated by blocking external calls inside guards
// - Notification dispatch and drops
//
// The host application decides how to expose `render()`.
// ============================================================================

/// Central metrics registry for the lifecycle engine
pub struct Metrics {
    registry: Registry,

    // Engine Metrics
    pub transitions_total: IntCounterVec,
    pub transition_noops_total: IntCounterVec,
    pub guard_evaluations_total: IntCounterVec,
    pub fire_duration: HistogramVec,

    // Notification Metrics
    pub notifications_total: IntCounterVec,
    pub notifications_dropped_total: IntCounter,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        // Engine Metrics
        let transitions_total = IntCounterVec::new(
            Opts::new("order_transitions_total", "Total committed state transitions"),
            &["event", "from_state", "to_state"],
        )?;
        registry.register(Box::new(transitions_total.clone()))?;

        let transition_noops_total = IntCounterVec::new(
            Opts::new("order_transition_noops_total", "Total fires that left the state unchanged"),
            &["event", "state", "reason"],
        )?;
        registry.register(Box::new(transition_noops_total.clone()))?;

        let guard_evaluations_total = IntCounterVec::new(
            Opts::new("order_guard_evaluations_total", "Total guard evaluations"),
            &["guard", "result"],
        )?;
        registry.register(Box::new(guard_evaluations_total.clone()))?;

        let fire_duration = HistogramVec::new(
            HistogramOpts::new("order_fire_duration_seconds", "Duration of a single fire, guards included")
                .buckets(vec![0.0001, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["event"],
        )?;
        registry.register(Box::new(fire_duration.clone()))?;

        // Notification Metrics
        let notifications_total = IntCounterVec::new(
            Opts::new("order_notifications_total", "Total notifications handed to the outbound channel"),
            &["recipient"],
        )?;
        registry.register(Box::new(notifications_total.clone()))?;

        let notifications_dropped_total = IntCounter::new(
            "order_notifications_dropped_total",
            "Total notifications dropped because the outbound channel was full or closed",
        )?;
        registry.register(Box::new(notifications_dropped_total.clone()))?;

        Ok(Self {
            registry,
            transitions_total,
            transition_noops_total,
            guard_evaluations_total,
            fire_duration,
            notifications_total,
            notifications_dropped_total,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render every registered metric in the text exposition format
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    pub fn record_transition(&self, event: &str, from_state: &str, to_state: &str) {
        self.transitions_total.with_label_values(&[event, from_state, to_state]).inc();
    }

    pub fn record_noop(&self, event: &str, state: &str, reason: &str) {
        self.transition_noops_total.with_label_values(&[event, state, reason]).inc();
    }

    pub fn record_guard(&self, guard: &str, passed: bool) {
        let result = if passed { "passed" } else { "rejected" };
        self.guard_evaluations_total.with_label_values(&[guard, result]).inc();
    }

    pub fn observe_fire(&self, event: &str, duration_secs: f64) {
        self.fire_duration.with_label_values(&[event]).observe(duration_secs);
    }

    pub fn record_notification(&self, recipient: &str) {
        self.notifications_total.with_label_values(&[recipient]).inc();
    }

    pub fn record_notification_dropped(&self) {
        self.notifications_dropped_total.inc();
    }
}
