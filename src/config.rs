// src/config.rs

use serde::{Deserialize, Serialize};

use crate::axis_names::AXIS_COUNT;
use crate::constants::{
    DEFAULT_ALTHOLD_STATES, DEFAULT_HOVER_THROTTLE_PCT, DEFAULT_POSHOLD_STATES, NAV_MIN_PHASE_S,
    NOMINAL_CELL_VOLTAGE, PROP_BAND_MARGIN,
};
use crate::data_analysis::filter_response::FilterType;

/// Inclusive frequency band in Hz.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyBand {
    pub low_hz: f64,
    pub high_hz: f64,
}

impl FrequencyBand {
    pub fn new(low_hz: f64, high_hz: f64) -> Self {
        Self {
            low_hz: low_hz.min(high_hz),
            high_hz: low_hz.max(high_hz),
        }
    }

    pub fn contains(&self, freq_hz: f64) -> bool {
        freq_hz >= self.low_hz && freq_hz <= self.high_hz
    }
}

/// Aircraft description supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AircraftInfo {
    /// Nominal prop diameter in inches.
    pub frame_inches: f64,
    pub blade_count: u32,
    pub motor_count: usize,
    pub cell_count: Option<u32>,
    pub motor_kv: Option<f64>,
    /// Known prop-harmonic bands, used as-is by the fingerprinter.
    pub prop_harmonic_bands: Vec<FrequencyBand>,
}

impl Default for AircraftInfo {
    fn default() -> Self {
        Self {
            frame_inches: 5.0,
            blade_count: 3,
            motor_count: 4,
            cell_count: None,
            motor_kv: None,
            prop_harmonic_bands: Vec::new(),
        }
    }
}

impl AircraftInfo {
    /// Motor rotation frequency (Hz) at full throttle, from KV and nominal pack voltage.
    pub fn max_rotation_hz(&self) -> Option<f64> {
        match (self.motor_kv, self.cell_count) {
            (Some(kv), Some(cells)) if kv > 0.0 && cells > 0 => {
                Some(kv * cells as f64 * NOMINAL_CELL_VOLTAGE / 60.0)
            }
            _ => None,
        }
    }

    /// Motor rotation frequency at `throttle_pct`, assuming RPM scales linearly with throttle.
    pub fn rotation_hz_at(&self, throttle_pct: f64) -> Option<f64> {
        self.max_rotation_hz()
            .map(|max_hz| max_hz * (throttle_pct / 100.0).clamp(0.0, 1.0))
    }

    /// Blade-pass bands (fundamental and 2nd harmonic) for a throttle range in percent.
    ///
    /// Empty when KV or cell count is unknown.
    pub fn derived_prop_bands(&self, throttle_low_pct: f64, throttle_high_pct: f64) -> Vec<FrequencyBand> {
        let (Some(low), Some(high)) = (
            self.rotation_hz_at(throttle_low_pct),
            self.rotation_hz_at(throttle_high_pct),
        ) else {
            return Vec::new();
        };
        if high <= 0.0 {
            return Vec::new();
        }
        let blades = self.blade_count.max(1) as f64;
        (1..=2)
            .map(|harmonic| {
                let k = blades * harmonic as f64;
                FrequencyBand::new(
                    low * k * (1.0 - PROP_BAND_MARGIN),
                    high * k * (1.0 + PROP_BAND_MARGIN),
                )
            })
            .collect()
    }

    /// Supplied bands followed by the bands derived for the given throttle range.
    pub fn prop_bands_for(&self, throttle_range_pct: Option<(f64, f64)>) -> Vec<FrequencyBand> {
        let (low, high) = throttle_range_pct
            .unwrap_or((DEFAULT_HOVER_THROTTLE_PCT, DEFAULT_HOVER_THROTTLE_PCT));
        let mut bands = self.prop_harmonic_bands.clone();
        bands.extend(self.derived_prop_bands(low, high));
        bands
    }
}

/// Currently configured tuning values, when the caller knows them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TuneSettings {
    pub gyro_lpf_hz: Option<f64>,
    pub gyro_lpf_type: FilterType,
    pub dterm_lpf_hz: Option<f64>,
    pub dterm_lpf_type: FilterType,
    pub dyn_notch_min_hz: Option<f64>,
    /// Static gyro notch centre, Hz.
    pub gyro_notch_hz: Option<f64>,
    /// P gains, indexed Roll/Pitch/Yaw.
    pub p_gains: [Option<f64>; AXIS_COUNT],
    /// D gains, indexed Roll/Pitch/Yaw.
    pub d_gains: [Option<f64>; AXIS_COUNT],
}

impl Default for TuneSettings {
    fn default() -> Self {
        Self {
            gyro_lpf_hz: None,
            gyro_lpf_type: FilterType::PT1,
            dterm_lpf_hz: None,
            dterm_lpf_type: FilterType::PT1,
            dyn_notch_min_hz: None,
            gyro_notch_hz: None,
            p_gains: [None; AXIS_COUNT],
            d_gains: [None; AXIS_COUNT],
        }
    }
}

/// Navigation-state codes that select the phase-gated analyzers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NavConfig {
    pub althold_states: Vec<i32>,
    pub poshold_states: Vec<i32>,
    pub min_phase_s: f64,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            althold_states: DEFAULT_ALTHOLD_STATES.to_vec(),
            poshold_states: DEFAULT_POSHOLD_STATES.to_vec(),
            min_phase_s: NAV_MIN_PHASE_S,
        }
    }
}

/// Everything the pipeline needs besides the recording itself.
///
/// Constructed by the caller and passed explicitly; the crate keeps no global state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub aircraft: AircraftInfo,
    pub current: TuneSettings,
    pub nav: NavConfig,
    /// Corrupt-frame ratio reported by the decoder, if known.
    pub corrupt_frame_ratio: Option<f64>,
}
