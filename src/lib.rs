// src/lib.rs - Library interface for blackbox tuning analysis

pub mod axis_names;
pub mod config;
pub mod constants;
pub mod data_analysis;
pub mod data_input;
pub mod error;
pub mod pipeline;
pub mod types;

pub use config::AnalysisConfig;
pub use data_input::sample_store::SampleStore;
pub use error::{AnalyzerError, Result};
pub use pipeline::{analyze_log, AnalysisReport};

/// Crate version reported in every action plan.
pub fn crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
