use lazy_static::lazy_static;
use prometheus::{Counter, Encoder, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref READINGS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "ledger_readings_total",
        "Total readings received from MQTT"
    ))
    .unwrap();
    pub static ref VALID_READINGS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "ledger_valid_readings_total",
        "Total readings accepted by edge validation"
    ))
    .unwrap();
    pub static ref INVALID_READINGS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "ledger_invalid_readings_total",
        "Total malformed or implausible readings rejected"
    ))
    .unwrap();
    pub static ref UNAUTHORIZED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "ledger_unauthorized_submissions_total",
        "Total submissions rejected because the device was not authorized"
    ))
    .unwrap();
    pub static ref ENCODING_OVERFLOW_TOTAL: Counter = Counter::with_opts(Opts::new(
        "ledger_encoding_overflow_total",
        "Total readings rejected for exceeding their fixed-point width"
    ))
    .unwrap();
    pub static ref AUTHORIZATIONS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "ledger_device_authorizations_total",
        "Total device authorization grants"
    ))
    .unwrap();
    pub static ref APPEND_LATENCY_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "ledger_append_latency_seconds",
            "Time taken to commit a reading to the ledger"
        )
        .buckets(vec![
            0.0001, 0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0
        ])
    )
    .unwrap();
    pub static ref DATA_POINTS: Gauge = Gauge::with_opts(Opts::new(
        "ledger_data_points",
        "Total data points held across all shipments"
    ))
    .unwrap();
    pub static ref CHANNEL_FULL_TOTAL: Counter = Counter::with_opts(Opts::new(
        "ledger_channel_full_total",
        "Total number of times the ingest channel was full (backpressure events)"
    ))
    .unwrap();
}

pub fn init_metrics() {
    REGISTRY.register(Box::new(READINGS_TOTAL.clone())).unwrap();
    REGISTRY
        .register(Box::new(VALID_READINGS_TOTAL.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(INVALID_READINGS_TOTAL.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(UNAUTHORIZED_TOTAL.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(ENCODING_OVERFLOW_TOTAL.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(AUTHORIZATIONS_TOTAL.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(APPEND_LATENCY_SECONDS.clone()))
        .unwrap();
    REGISTRY.register(Box::new(DATA_POINTS.clone())).unwrap();
    REGISTRY
        .register(Box::new(CHANNEL_FULL_TOTAL.clone()))
        .unwrap();
}

pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}
