// src/types.rs
// Type aliases for per-axis result arrays

use crate::axis_names::AXIS_COUNT;
use crate::data_analysis::hover_oscillation::HoverOscillation;
use crate::data_analysis::spectral_analysis::NoiseProfile;
use crate::data_analysis::tracking_response::AxisResponse;

// Compile-time assertion: the per-axis arrays below are indexed Roll/Pitch/Yaw.
const _: () = assert!(AXIS_COUNT == 3, "AXIS_COUNT must be 3 (Roll, Pitch, Yaw)");

// Spectral analysis results, `None` where the gyro channel is absent or degenerate
pub type AxisNoiseProfiles = [Option<NoiseProfile>; AXIS_COUNT];

// Tracking response per axis
pub type AxisResponses = [AxisResponse; AXIS_COUNT];

// Hover oscillation per axis
pub type AxisOscillations = [Option<HoverOscillation>; AXIS_COUNT];

// (low_hz, high_hz) cutoff range
pub type CutoffRange = (f64, f64);
