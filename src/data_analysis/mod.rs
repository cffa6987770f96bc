// src/data_analysis/mod.rs

pub mod action_plan;
pub mod derivative;
pub mod fft_utils;
pub mod filter_recommendation;
pub mod filter_response;
pub mod findings;
pub mod frame_profile;
pub mod hover_oscillation;
pub mod log_quality;
pub mod motor_analysis;
pub mod nav;
pub mod noise_fingerprint;
pub mod peak_detection;
pub mod signal_stats;
pub mod spectral_analysis;
pub mod tracking_response;

// src/data_analysis/mod.rs
