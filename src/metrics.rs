// src/metrics.rs
use once_cell::sync::Lazy;
use prometheus::{register_histogram_vec, register_int_counter_vec, HistogramVec, IntCounterVec};

pub static REFRESH_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "wdo_refresh_total", "Dashboard refreshes", &["outcome"] // complete|partial
    ).unwrap()
});

pub static UNAVAILABLE_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "wdo_input_unavailable_total", "Inputs that could not be resolved", &["input"]
    ).unwrap()
});

pub static COLLECT_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "wdo_collect_latency_seconds",
        "Collaborator round latency",
        &["path"], // collect|quote_tables
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    ).unwrap()
});
