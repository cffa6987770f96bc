// src/data_analysis/hover_oscillation.rs

use ndarray::Array1;
use ndarray_stats::QuantileExt;
use serde::Serialize;

use crate::axis_names::{AXIS_COUNT, AXIS_NAMES, GYRO_CHANNELS};
use crate::constants::{
    HOVER_OSC_BAND_HZ, HOVER_OSC_MODERATE_DEG_S, HOVER_OSC_SEVERE_DEG_S,
    HOVER_PEAK_DOMINANCE_DB, HOVER_PEAK_HALF_WIDTH_BINS, HOVER_SCORE_MODERATE,
    HOVER_SCORE_SEVERE, HOVER_THROTTLE_MIN_PCT, HOVER_THROTTLE_STD_MAX_PCT, HOVER_WINDOW_S,
};
use crate::data_analysis::motor_analysis::throttle_duty_pct;
use crate::data_analysis::signal_stats;
use crate::data_analysis::spectral_analysis::{power_to_db, welch_psd, WelchConfig};
use crate::data_input::sample_store::SampleStore;
use crate::types::AxisOscillations;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OscillationSeverity {
    None,
    Moderate,
    Severe,
}

impl OscillationSeverity {
    pub fn from_amplitude(amplitude_deg_s: f64) -> Self {
        if amplitude_deg_s >= HOVER_OSC_SEVERE_DEG_S {
            OscillationSeverity::Severe
        } else if amplitude_deg_s >= HOVER_OSC_MODERATE_DEG_S {
            OscillationSeverity::Moderate
        } else {
            OscillationSeverity::None
        }
    }

    pub fn score(&self) -> f64 {
        match self {
            OscillationSeverity::None => 100.0,
            OscillationSeverity::Moderate => HOVER_SCORE_MODERATE,
            OscillationSeverity::Severe => HOVER_SCORE_SEVERE,
        }
    }
}

/// Low-frequency gyro oscillation during steady hover on one axis
#[derive(Debug, Clone, Serialize)]
pub struct HoverOscillation {
    pub axis: String,
    /// Dominant frequency in the 2-25 Hz band; `None` when no peak stands out
    pub freq_hz: Option<f64>,
    /// Sine amplitude of the dominant peak, deg/s
    pub amplitude_deg_s: f64,
    pub severity: OscillationSeverity,
    pub hover_windows: usize,
}

/// Start indices of the 1 s windows that qualify as steady hover.
///
/// Without a throttle channel every full window qualifies.
pub fn find_hover_windows(store: &SampleStore) -> (usize, Vec<usize>) {
    let window = (HOVER_WINDOW_S * store.sample_rate()).round() as usize;
    if window == 0 || store.n_rows() < window {
        return (window, Vec::new());
    }
    let starts = (0..store.n_rows() / window).map(|k| k * window);

    let throttle = match throttle_duty_pct(store) {
        Some(t) => t,
        None => return (window, starts.collect()),
    };
    let hover = starts
        .filter(|&start| {
            let slice = &throttle[start..start + window];
            if slice.iter().any(|v| !v.is_finite()) {
                return false;
            }
            match (signal_stats::mean(slice), signal_stats::std_dev(slice)) {
                (Some(mean), Some(sd)) => {
                    mean > HOVER_THROTTLE_MIN_PCT && sd < HOVER_THROTTLE_STD_MAX_PCT
                }
                _ => false,
            }
        })
        .collect();
    (window, hover)
}

/// Welch PSD averaged over the hover windows of one gyro trace.
fn averaged_window_psd(
    gyro: &[f64],
    fs: f64,
    window: usize,
    starts: &[usize],
) -> Option<Vec<(f64, f64)>> {
    let mut sum: Option<Vec<(f64, f64)>> = None;
    let mut count = 0usize;
    for &start in starts {
        let slice = &gyro[start..start + window];
        if slice.iter().any(|v| !v.is_finite()) {
            continue;
        }
        let mean = signal_stats::mean(slice)?;
        let centered: Vec<f64> = slice.iter().map(|v| v - mean).collect();
        let config = WelchConfig {
            segment_length: window,
            ..WelchConfig::default()
        };
        let psd = match welch_psd(&centered, fs, Some(config)) {
            Ok(psd) => psd,
            Err(e) => {
                log::warn!("Hover window at {} skipped: {}", start, e);
                continue;
            }
        };
        match sum.as_mut() {
            Some(acc) => acc.iter_mut().zip(&psd).for_each(|(a, p)| a.1 += p.1),
            None => sum = Some(psd),
        }
        count += 1;
    }
    let mut acc = sum?;
    acc.iter_mut().for_each(|a| a.1 /= count as f64);
    Some(acc)
}

/// Dominant peak in the hover band: `(freq_hz, amplitude_deg_s)`.
fn dominant_peak(psd: &[(f64, f64)]) -> Option<(f64, f64)> {
    let (low, high) = HOVER_OSC_BAND_HZ;
    let band: Vec<usize> = (0..psd.len())
        .filter(|&i| psd[i].0 >= low && psd[i].0 <= high)
        .collect();
    if band.is_empty() {
        return None;
    }
    let band_db: Array1<f64> = band.iter().map(|&i| power_to_db(psd[i].1)).collect();
    let median_db = signal_stats::median(band_db.as_slice()?)?;
    let peak_pos = band_db.argmax().ok()?;
    let peak_db = band_db[peak_pos];
    if peak_db - median_db < HOVER_PEAK_DOMINANCE_DB {
        return None;
    }

    let peak = band[peak_pos];
    let df = if psd.len() > 1 { psd[1].0 - psd[0].0 } else { return None };
    let lo = peak.saturating_sub(HOVER_PEAK_HALF_WIDTH_BINS);
    let hi = (peak + HOVER_PEAK_HALF_WIDTH_BINS).min(psd.len() - 1);
    let power: f64 = psd[lo..=hi].iter().map(|p| p.1 * df).sum();
    Some((psd[peak].0, std::f64::consts::SQRT_2 * power.max(0.0).sqrt()))
}

/// Hover oscillation per axis. An axis is `None` when its gyro is missing or the log
/// has no hover window.
pub fn detect_hover_oscillation(store: &SampleStore) -> AxisOscillations {
    let (window, starts) = find_hover_windows(store);
    log::debug!("Hover: {} windows of {} samples", starts.len(), window);

    std::array::from_fn(|axis| {
        if starts.is_empty() {
            return None;
        }
        let gyro = store.channel(GYRO_CHANNELS[axis])?.to_vec();
        let psd = averaged_window_psd(&gyro, store.sample_rate(), window, &starts)?;
        let (freq_hz, amplitude_deg_s) = match dominant_peak(&psd) {
            Some((f, a)) => (Some(f), a),
            None => (None, 0.0),
        };
        let severity = OscillationSeverity::from_amplitude(amplitude_deg_s);
        if severity != OscillationSeverity::None {
            log::info!(
                "{} hover oscillation {:?} at {:?} Hz, {:.1} deg/s",
                AXIS_NAMES[axis],
                severity,
                freq_hz,
                amplitude_deg_s
            );
        }
        Some(HoverOscillation {
            axis: AXIS_NAMES[axis].to_string(),
            freq_hz,
            amplitude_deg_s,
            severity,
            hover_windows: starts.len(),
        })
    })
}

/// Worst axis severity score; `None` when no axis was measured.
pub fn hover_score(oscillations: &[Option<HoverOscillation>; AXIS_COUNT]) -> Option<f64> {
    oscillations
        .iter()
        .flatten()
        .map(|o| o.severity.score())
        .reduce(f64::min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_analysis::spectral_analysis::test_signals::{lcg_noise, tone};
    use approx::assert_relative_eq;
    use std::collections::BTreeMap;

    fn hover_store(roll: Vec<f64>, throttle: Vec<f64>) -> SampleStore {
        let n = roll.len();
        let mut channels = BTreeMap::new();
        channels.insert("gyro_roll".to_string(), roll);
        channels.insert("gyro_pitch".to_string(), lcg_noise(n, 2));
        channels.insert("throttle".to_string(), throttle);
        SampleStore::new(500.0, channels).unwrap()
    }

    #[test]
    fn test_severe_wobble_detected() {
        let n = 5000;
        let wobble = tone(n, 500.0, 8.0, 8.0);
        let roll: Vec<f64> = wobble
            .iter()
            .zip(lcg_noise(n, 9))
            .map(|(w, e)| w + 0.2 * e)
            .collect();
        let store = hover_store(roll, vec![1450.0; n]);
        let result = detect_hover_oscillation(&store);
        let roll = result[0].as_ref().unwrap();
        assert_eq!(roll.hover_windows, 10);
        assert!((roll.freq_hz.unwrap() - 8.0).abs() <= 1.0);
        assert_relative_eq!(roll.amplitude_deg_s, 8.0, max_relative = 0.15);
        assert_eq!(roll.severity, OscillationSeverity::Severe);
        assert_eq!(result[1].as_ref().unwrap().severity, OscillationSeverity::None);
        assert!(result[2].is_none());
        assert_eq!(hover_score(&result), Some(HOVER_SCORE_SEVERE));
    }

    #[test]
    fn test_throttle_punches_are_not_hover() {
        let n = 5000;
        let throttle: Vec<f64> = (0..n)
            .map(|i| 1500.0 + 200.0 * (i as f64 * 0.01).sin())
            .collect();
        let store = hover_store(lcg_noise(n, 4), throttle);
        let (_, windows) = find_hover_windows(&store);
        assert!(windows.is_empty());
        assert!(detect_hover_oscillation(&store).iter().all(|o| o.is_none()));
        assert_eq!(hover_score(&detect_hover_oscillation(&store)), None);
    }

    #[test]
    fn test_ground_idle_is_not_hover() {
        let n = 2000;
        let store = hover_store(lcg_noise(n, 4), vec![1050.0; n]);
        assert!(find_hover_windows(&store).1.is_empty());
    }
}
