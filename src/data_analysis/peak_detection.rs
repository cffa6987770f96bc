// src/data_analysis/peak_detection.rs

use crate::constants::{
    MAX_PEAKS_PER_AXIS, MIN_PEAK_SEPARATION_HZ, NOISE_FLOOR_HALF_WIDTH_HZ,
    PEAK_DETECTION_WINDOW_RADIUS, PEAK_MIN_PROMINENCE_DB, SPECTRUM_NOISE_FLOOR_HZ,
};
use crate::data_analysis::signal_stats;
use crate::data_analysis::spectral_analysis::Peak;

/// Running-median noise floor of a dB spectrum, `half_width_bins` either side.
pub fn running_median_floor(psd_db: &[f64], half_width_bins: usize) -> Vec<f64> {
    let n = psd_db.len();
    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(half_width_bins);
            let hi = (i + half_width_bins + 1).min(n);
            signal_stats::median(&psd_db[lo..hi]).unwrap_or(f64::NEG_INFINITY)
        })
        .collect()
}

/// True when bin `j` is the maximum of a ±`w` window (ties resolve to the rightmost bin).
/// Near the edges, where a full window does not fit, a 3-point check is used.
fn is_window_peak(values: &[f64], j: usize, w: usize) -> bool {
    if j == 0 || j + 1 >= values.len() {
        return false;
    }
    let amp = values[j];
    if j >= w && j + w < values.len() {
        let ge_left_in_window = (1..=w).all(|k| amp >= values[j - k]);
        ge_left_in_window && (1..=w).all(|k| amp > values[j + k])
    } else {
        amp >= values[j - 1] && amp > values[j + 1]
    }
}

/// Detects spectral peaks in a dB spectrum.
///
/// A bin qualifies when it is the maximum of its ±3-bin window, lies at or above
/// `SPECTRUM_NOISE_FLOOR_HZ`, and rises at least `PEAK_MIN_PROMINENCE_DB` over the
/// running-median floor. Candidates are accepted by descending prominence, skipping any
/// within `MIN_PEAK_SEPARATION_HZ` of an accepted peak, up to `MAX_PEAKS_PER_AXIS`.
pub fn detect_peaks(frequencies: &[f64], psd_db: &[f64]) -> Vec<Peak> {
    if frequencies.len() != psd_db.len() || frequencies.len() < 3 {
        return Vec::new();
    }
    let df = frequencies[1] - frequencies[0];
    if !df.is_finite() || df <= 0.0 {
        return Vec::new();
    }
    let half_width_bins = ((NOISE_FLOOR_HALF_WIDTH_HZ / df).ceil() as usize).max(1);
    let floor = running_median_floor(psd_db, half_width_bins);

    let mut candidates: Vec<Peak> = (1..psd_db.len() - 1)
        .filter(|&j| frequencies[j] >= SPECTRUM_NOISE_FLOOR_HZ)
        .filter(|&j| is_window_peak(psd_db, j, PEAK_DETECTION_WINDOW_RADIUS))
        .map(|j| Peak {
            freq_hz: frequencies[j],
            power_db: psd_db[j],
            prominence: psd_db[j] - floor[j],
        })
        .filter(|p| p.prominence.is_finite() && p.prominence >= PEAK_MIN_PROMINENCE_DB)
        .collect();

    candidates.sort_by(|a, b| b.prominence.total_cmp(&a.prominence));

    let mut accepted: Vec<Peak> = Vec::new();
    for candidate in candidates {
        if accepted.len() >= MAX_PEAKS_PER_AXIS {
            break;
        }
        let too_close_to_existing = accepted
            .iter()
            .any(|p| (candidate.freq_hz - p.freq_hz).abs() < MIN_PEAK_SEPARATION_HZ);
        if !too_close_to_existing {
            accepted.push(candidate);
        }
    }
    accepted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_spectrum(bins: usize, df: f64, level_db: f64) -> (Vec<f64>, Vec<f64>) {
        let freqs = (0..bins).map(|i| i as f64 * df).collect();
        (freqs, vec![level_db; bins])
    }

    #[test]
    fn test_single_spike_is_found() {
        let (freqs, mut psd) = flat_spectrum(257, 1.0, -30.0);
        psd[100] = 0.0;
        psd[99] = -10.0;
        psd[101] = -10.0;
        let peaks = detect_peaks(&freqs, &psd);
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].freq_hz, 100.0);
        assert!((peaks[0].prominence - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_low_frequency_and_weak_peaks_ignored() {
        let (freqs, mut psd) = flat_spectrum(257, 1.0, -30.0);
        psd[5] = 0.0; // below the 10 Hz floor
        psd[150] = -25.0; // only 5 dB prominence
        assert!(detect_peaks(&freqs, &psd).is_empty());
    }

    #[test]
    fn test_separation_and_limit() {
        let (freqs, mut psd) = flat_spectrum(513, 1.0, -40.0);
        psd[100] = 0.0;
        psd[105] = -5.0; // within 10 Hz of a stronger peak
        for (i, bin) in [150, 200, 250, 300, 350, 400].iter().enumerate() {
            psd[*bin] = -10.0 - i as f64;
        }
        let peaks = detect_peaks(&freqs, &psd);
        assert_eq!(peaks.len(), MAX_PEAKS_PER_AXIS);
        assert!(peaks.iter().all(|p| p.freq_hz != 105.0));
        assert_eq!(peaks[0].freq_hz, 100.0);
        for pair in peaks.windows(2) {
            assert!(pair[0].prominence >= pair[1].prominence);
        }
    }

    #[test]
    fn test_running_median_floor_ignores_isolated_spike() {
        let mut psd = vec![-20.0; 50];
        psd[25] = 10.0;
        let floor = running_median_floor(&psd, 5);
        assert!(floor.iter().all(|&f| f == -20.0));
    }
}
