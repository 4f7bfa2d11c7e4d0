use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the static `Metrics`.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE
        .get_or_init(|| async {
            info!("Initializing Metrics ...");
            Metrics::new()
        })
        .await
}

#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Fetch metrics
    pub token_fetch_requests: IntCounterVec,
    pub token_fetch_failures: IntCounterVec,
    pub token_fetch_duration: HistogramVec,

    // Cache metrics
    pub token_cache_hits: IntCounterVec,
    pub token_expiry_unix: IntGaugeVec,

    // Hook metrics
    pub hook_invocations: IntCounterVec,
}

impl Metrics {
    // metric names and label sets are static; construction can only fail on a programming error
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("rdsiam".into()), None).unwrap();

        let metrics: Arc<Metrics> = Arc::new(Self {
            // Fetch
            token_fetch_requests: IntCounterVec::new(Opts::new("token_fetch_requests_total", "Total token fetch attempts by endpoint"), &["endpoint"]).unwrap(),
            token_fetch_failures: IntCounterVec::new(Opts::new("token_fetch_failures_total", "Token fetch failures by reason"), &["endpoint", "reason"]).unwrap(),
            token_fetch_duration: HistogramVec::new(HistogramOpts::new("token_fetch_duration_seconds", "Token fetch duration seconds").buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]), &["endpoint"]).unwrap(),

            // Cache
            token_cache_hits: IntCounterVec::new(Opts::new("token_cache_hits_total", "Tokens served from cache"), &["endpoint"]).unwrap(),
            token_expiry_unix: IntGaugeVec::new(Opts::new("token_expiry_unix_seconds", "Cached token local expiry timestamp"), &["endpoint"]).unwrap(),

            // Hook
            hook_invocations: IntCounterVec::new(Opts::new("hook_invocations_total", "Before-connect hook invocations by result"), &["endpoint", "result"]).unwrap(),

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.token_fetch_requests.clone())).unwrap();
        reg.register(Box::new(metrics.token_fetch_failures.clone())).unwrap();
        reg.register(Box::new(metrics.token_fetch_duration.clone())).unwrap();
        reg.register(Box::new(metrics.token_cache_hits.clone())).unwrap();
        reg.register(Box::new(metrics.token_expiry_unix.clone())).unwrap();
        reg.register(Box::new(metrics.hook_invocations.clone())).unwrap();

        metrics
    }

    /// Prometheus text exposition of every registered metric.
    pub fn encode_text(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
