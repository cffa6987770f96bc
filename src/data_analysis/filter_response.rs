// src/data_analysis/filter_response.rs

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_BIQUAD_Q;

/// Low-pass filter topologies used by flight controllers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FilterType {
    PT1,
    Biquad,
    PT2,
    PT3,
    PT4, // Rarely used but supported
}

impl FilterType {
    /// Get filter type name for display
    pub fn name(&self) -> &'static str {
        match self {
            FilterType::PT1 => "PT1",
            FilterType::Biquad => "BIQUAD",
            FilterType::PT2 => "PT2",
            FilterType::PT3 => "PT3",
            FilterType::PT4 => "PT4",
        }
    }

    /// Number of cascaded first-order sections, `None` for BIQUAD
    pub fn ptn_order(&self) -> Option<u32> {
        match self {
            FilterType::PT1 => Some(1),
            FilterType::PT2 => Some(2),
            FilterType::PT3 => Some(3),
            FilterType::PT4 => Some(4),
            FilterType::Biquad => None,
        }
    }
}

/// Phase lag of a filter at one signal frequency
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PhaseLag {
    /// Phase in degrees, ≤ 0 for a low-pass
    pub degrees: f64,
    /// Equivalent time shift: `(degrees / 360) / f * 1000`
    pub ms: f64,
}

impl PhaseLag {
    pub const NONE: PhaseLag = PhaseLag {
        degrees: 0.0,
        ms: 0.0,
    };
}

/// Phase shift in degrees of a low-pass filter at `signal_freq_hz`.
///
/// PTn stages are modeled as n identical first-order sections at the same cutoff,
/// giving `-n * atan(f / fc)`. BIQUAD is a second-order section with quality factor `q`:
/// `-atan2((f / fc) / q, 1 - (f / fc)^2)`, passing through -90° at the cutoff for any Q.
/// A cutoff of zero or below means the filter is disabled and yields 0°.
pub fn phase_shift(filter_type: FilterType, signal_freq_hz: f64, cutoff_hz: f64, q: f64) -> f64 {
    if cutoff_hz <= 0.0 || !cutoff_hz.is_finite() || !signal_freq_hz.is_finite() {
        return 0.0;
    }
    let ratio = signal_freq_hz / cutoff_hz;
    match filter_type.ptn_order() {
        Some(n) => -(n as f64) * ratio.atan().to_degrees(),
        None => {
            let q = if q > 0.0 && q.is_finite() {
                q
            } else {
                DEFAULT_BIQUAD_Q
            };
            -(ratio / q).atan2(1.0 - ratio * ratio).to_degrees()
        }
    }
}

/// Phase lag in degrees and milliseconds at `signal_freq_hz`.
///
/// Disabled filters (cutoff ≤ 0) and non-positive signal frequencies give no lag.
pub fn estimate_filter_phase_lag(
    cutoff_hz: f64,
    signal_freq_hz: f64,
    filter_type: FilterType,
    q: f64,
) -> PhaseLag {
    if cutoff_hz <= 0.0 || signal_freq_hz <= 0.0 {
        return PhaseLag::NONE;
    }
    let degrees = phase_shift(filter_type, signal_freq_hz, cutoff_hz, q);
    let ms = (degrees / 360.0) / signal_freq_hz * 1000.0;
    if !degrees.is_finite() || !ms.is_finite() {
        return PhaseLag::NONE;
    }
    PhaseLag { degrees, ms }
}

/// Calculate frequency response magnitude for PT1 filter
/// H(s) = 1 / (1 + s/ωc) where ωc = 2π * cutoff_hz
pub fn pt1_response(frequency_hz: f64, cutoff_hz: f64) -> f64 {
    ptn_response(frequency_hz, cutoff_hz, 1)
}

/// Magnitude of two cascaded PT1 sections
pub fn pt2_response(frequency_hz: f64, cutoff_hz: f64) -> f64 {
    ptn_response(frequency_hz, cutoff_hz, 2)
}

/// Magnitude of three cascaded PT1 sections
pub fn pt3_response(frequency_hz: f64, cutoff_hz: f64) -> f64 {
    ptn_response(frequency_hz, cutoff_hz, 3)
}

/// Magnitude of four cascaded PT1 sections
pub fn pt4_response(frequency_hz: f64, cutoff_hz: f64) -> f64 {
    ptn_response(frequency_hz, cutoff_hz, 4)
}

fn ptn_response(frequency_hz: f64, cutoff_hz: f64, order: u32) -> f64 {
    if cutoff_hz <= 0.0 {
        return 1.0; // No filtering
    }
    let s_norm = frequency_hz / cutoff_hz;
    (1.0 + s_norm * s_norm).powf(-(order as f64) / 2.0)
}

/// Calculate frequency response magnitude for a second-order low-pass BIQUAD
/// |H| = 1 / sqrt((1 - x²)² + (x/Q)²) with x = f/fc
pub fn biquad_response(frequency_hz: f64, cutoff_hz: f64, q: f64) -> f64 {
    if cutoff_hz <= 0.0 {
        return 1.0; // No filtering
    }
    let q = if q > 0.0 { q } else { DEFAULT_BIQUAD_Q };
    let x = frequency_hz / cutoff_hz;
    1.0 / ((1.0 - x * x).powi(2) + (x / q).powi(2)).sqrt()
}

/// Magnitude response of any supported filter type
pub fn magnitude_response(
    filter_type: FilterType,
    frequency_hz: f64,
    cutoff_hz: f64,
    q: f64,
) -> f64 {
    match filter_type {
        FilterType::PT1 => pt1_response(frequency_hz, cutoff_hz),
        FilterType::PT2 => pt2_response(frequency_hz, cutoff_hz),
        FilterType::PT3 => pt3_response(frequency_hz, cutoff_hz),
        FilterType::PT4 => pt4_response(frequency_hz, cutoff_hz),
        FilterType::Biquad => biquad_response(frequency_hz, cutoff_hz, q),
    }
}

/// Attenuation in dB (positive means reduced) at `frequency_hz`
pub fn attenuation_db(filter_type: FilterType, frequency_hz: f64, cutoff_hz: f64, q: f64) -> f64 {
    let magnitude = magnitude_response(filter_type, frequency_hz, cutoff_hz, q);
    if magnitude > 0.0 {
        -20.0 * magnitude.log10()
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ptn_phase_at_cutoff() {
        for (filter_type, n) in [
            (FilterType::PT1, 1.0),
            (FilterType::PT2, 2.0),
            (FilterType::PT3, 3.0),
        ] {
            for fc in [25.0, 100.0, 437.5] {
                let phase = phase_shift(filter_type, fc, fc, DEFAULT_BIQUAD_Q);
                assert_relative_eq!(phase, -45.0 * n, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_biquad_phase_at_cutoff_any_q() {
        for q in [0.5, DEFAULT_BIQUAD_Q, 2.0, 250.0] {
            let phase = phase_shift(FilterType::Biquad, 100.0, 100.0, q);
            assert_relative_eq!(phase, -90.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_biquad_phase_sweeps_0_to_minus_180() {
        let low = phase_shift(FilterType::Biquad, 10.0, 100.0, 0.5);
        assert!(low.abs() < 15.0);
        let high = phase_shift(FilterType::Biquad, 10_000.0, 100.0, DEFAULT_BIQUAD_Q);
        assert!(high < -178.0 && high >= -180.0);
        let mut previous = 0.0;
        for f in (1..400).map(|i| i as f64) {
            let phase = phase_shift(FilterType::Biquad, f, 100.0, DEFAULT_BIQUAD_Q);
            assert!(phase <= previous);
            previous = phase;
        }
    }

    #[test]
    fn test_phase_lag_pt1_65hz_at_50hz() {
        let lag = estimate_filter_phase_lag(65.0, 50.0, FilterType::PT1, DEFAULT_BIQUAD_Q);
        assert!((lag.degrees - (-37.6)).abs() < 0.1);
        assert_relative_eq!(lag.ms, (lag.degrees / 360.0) / 50.0 * 1000.0);
    }

    #[test]
    fn test_zero_cutoff_means_no_lag() {
        for filter_type in [
            FilterType::PT1,
            FilterType::PT2,
            FilterType::PT3,
            FilterType::Biquad,
        ] {
            for f in [1.0, 50.0, 300.0] {
                assert_eq!(
                    estimate_filter_phase_lag(0.0, f, filter_type, DEFAULT_BIQUAD_Q),
                    PhaseLag::NONE
                );
                assert_eq!(phase_shift(filter_type, f, -10.0, DEFAULT_BIQUAD_Q), 0.0);
            }
        }
    }

    #[test]
    fn test_pt1_response() {
        // At cutoff frequency, magnitude should be ~0.707 (-3dB)
        let response = pt1_response(100.0, 100.0);
        assert!((response - std::f64::consts::FRAC_1_SQRT_2).abs() < 0.001);

        // At 10x cutoff frequency, should be much lower
        let response_10x = pt1_response(1000.0, 100.0);
        assert!(response_10x < 0.1);
    }

    #[test]
    fn test_cascaded_response_and_attenuation() {
        assert_relative_eq!(pt2_response(200.0, 200.0), 0.5, epsilon = 1e-12);
        assert!(pt3_response(3000.0, 300.0) < 0.001);
        assert_relative_eq!(
            biquad_response(100.0, 100.0, DEFAULT_BIQUAD_Q),
            std::f64::consts::FRAC_1_SQRT_2,
            epsilon = 1e-12
        );
        assert_eq!(attenuation_db(FilterType::PT1, 50.0, 0.0, DEFAULT_BIQUAD_Q), 0.0);
        assert!(attenuation_db(FilterType::PT2, 400.0, 100.0, DEFAULT_BIQUAD_Q) > 20.0);
    }

    #[test]
    fn test_filter_type_names() {
        assert_eq!(FilterType::PT2.name(), "PT2");
        assert_eq!(FilterType::Biquad.name(), "BIQUAD");
        assert_eq!(FilterType::PT3.ptn_order(), Some(3));
        assert_eq!(FilterType::Biquad.ptn_order(), None);
    }
}
