// src/lib.rs
pub mod types;
pub mod config;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod publishing;
pub mod providers;
pub mod pricing;
pub mod inputs;
pub mod refresh;
