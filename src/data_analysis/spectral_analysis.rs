// src/data_analysis/spectral_analysis.rs

use ndarray::Array1;
use serde::Serialize;

use crate::axis_names::{AXIS_COUNT, AXIS_NAMES, GYRO_CHANNELS};
use crate::constants::{
    MIN_SIGNAL_VARIANCE, MIN_SPECTRAL_SAMPLES, NOISE_BAND_HIGH_START_HZ, NOISE_BAND_LOW_HZ,
    NOISE_BAND_MID_HZ, NOISE_PEAK_PENALTY, NOISE_PEAK_PENALTY_MAX, NOISE_RMS_BAD_DEG_S,
    NOISE_RMS_GOOD_DEG_S, NOISE_START_MARGIN_DB, NOISE_START_MIN_BINS, NOISE_START_MIN_HZ,
    PSD_DB_FLOOR, STRONG_PEAK_PROMINENCE_DB, WELCH_MIN_SEGMENT, WELCH_OVERLAP,
    WELCH_SEGMENT_DIVISOR,
};
use crate::data_analysis::findings::linear_score;
use crate::data_analysis::{fft_utils, peak_detection, signal_stats};
use crate::data_input::sample_store::SampleStore;
use crate::error::{AnalyzerError, Result};
use crate::types::AxisNoiseProfiles;

/// Configuration for Welch's method spectral analysis
#[derive(Debug, Clone)]
pub struct WelchConfig {
    /// Segment length in samples (default: data_length / 8 for minimum 8 averages)
    pub segment_length: usize,
    /// Overlap fraction (default: 50%)
    pub overlap_percent: f64,
}

impl Default for WelchConfig {
    fn default() -> Self {
        Self {
            segment_length: 0, // Will be calculated based on data length
            overlap_percent: WELCH_OVERLAP,
        }
    }
}

/// A spectral peak in dB, with its prominence over the local noise floor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Peak {
    pub freq_hz: f64,
    pub power_db: f64,
    pub prominence: f64,
}

/// Per-axis noise characterization.
#[derive(Debug, Clone, Serialize)]
pub struct NoiseProfile {
    pub axis: String,
    pub frequencies: Vec<f64>,
    pub psd_db: Vec<f64>,
    /// Sorted by descending prominence.
    pub peaks: Vec<Peak>,
    /// Lowest frequency where a sustained rise above the baseline begins; Nyquist if none.
    pub noise_start_freq: f64,
    pub low_band_rms: f64,
    pub mid_band_rms: f64,
    pub high_band_rms: f64,
    pub nyquist_hz: f64,
}

impl NoiseProfile {
    /// Peaks at or above `min_prominence` dB.
    pub fn strong_peaks(&self, min_prominence: f64) -> impl Iterator<Item = &Peak> {
        self.peaks.iter().filter(move |p| p.prominence >= min_prominence)
    }
}

/// Symmetric Hann window of `length` samples; all ones below two samples.
fn hann_window(length: usize) -> Array1<f64> {
    if length <= 1 {
        return Array1::ones(length);
    }
    let span = (length - 1) as f64;
    Array1::from_iter(
        (0..length).map(|i| 0.5 * (1.0 - (2.0 * std::f64::consts::PI * i as f64 / span).cos())),
    )
}

/// Calculates the frequency vector for FFT results
pub fn frequency_vector(nfft: usize, sample_rate: f64) -> Vec<f64> {
    let num_freqs = nfft / 2 + 1;
    (0..num_freqs)
        .map(|i| (i as f64 * sample_rate) / (nfft as f64))
        .collect()
}

/// Converts a power value to decibels, floored so empty bins stay finite
pub fn power_to_db(power: f64) -> f64 {
    10.0 * (power.max(0.0) + PSD_DB_FLOOR).log10()
}

/// Unwraps phase to remove 360° discontinuities
pub fn unwrap_phase(phase_deg: &[f64]) -> Vec<f64> {
    if phase_deg.is_empty() {
        return Vec::new();
    }

    let mut unwrapped = Vec::with_capacity(phase_deg.len());
    unwrapped.push(phase_deg[0]);

    let mut cumulative_offset = 0.0;

    for i in 1..phase_deg.len() {
        let mut diff = phase_deg[i] - phase_deg[i - 1];

        // Detect and correct jumps > 180°
        while diff > 180.0 {
            diff -= 360.0;
            cumulative_offset -= 360.0;
        }
        while diff < -180.0 {
            diff += 360.0;
            cumulative_offset += 360.0;
        }

        unwrapped.push(phase_deg[i] + cumulative_offset);
    }

    unwrapped
}

/// Default Welch segment length: `len / 8`, at least 256, rounded up to a power of two and
/// capped to the largest power of two that fits in the signal.
pub fn default_segment_length(signal_len: usize) -> usize {
    let target = (signal_len / WELCH_SEGMENT_DIVISOR)
        .max(WELCH_MIN_SEGMENT)
        .next_power_of_two();
    if signal_len == 0 {
        return target;
    }
    let largest_fitting = 1usize << (usize::BITS - 1 - signal_len.leading_zeros());
    target.min(largest_fitting)
}

/// Computes Power Spectral Density using Welch's method
///
/// Segments the signal with overlap, applies windowing, computes FFT,
/// and averages power across segments. Returns `(frequency, psd)` pairs.
pub fn welch_psd(
    signal: &[f64],
    sample_rate: f64,
    config: Option<WelchConfig>,
) -> Result<Vec<(f64, f64)>> {
    if signal.is_empty() {
        return Err(AnalyzerError::InsufficientData(
            "empty signal provided".to_string(),
        ));
    }
    if !sample_rate.is_finite() || sample_rate <= 0.0 {
        return Err(AnalyzerError::InvalidInput(format!(
            "invalid sample rate {}",
            sample_rate
        )));
    }

    let mut cfg = config.unwrap_or_default();

    if cfg.segment_length == 0 {
        cfg.segment_length = default_segment_length(signal.len());
    }

    let segment_length = cfg.segment_length;
    let hop_size = ((1.0 - cfg.overlap_percent) * segment_length as f64) as usize;

    if hop_size == 0 {
        return Err(AnalyzerError::InvalidInput(
            "invalid overlap percentage".to_string(),
        ));
    }

    if signal.len() < segment_length {
        return Err(AnalyzerError::InsufficientData(format!(
            "signal of {} samples is shorter than segment length {}",
            signal.len(),
            segment_length
        )));
    }

    let window = hann_window(segment_length);
    let window_power: f64 = window.iter().map(|&w| w * w).sum();

    let num_segments = (signal.len() - segment_length) / hop_size + 1;
    let nfft = segment_length.next_power_of_two();
    let num_freqs = nfft / 2 + 1;

    let mut psd_sum = vec![0.0f64; num_freqs];
    let mut segment_count = 0;

    for seg_idx in 0..num_segments {
        let start = seg_idx * hop_size;
        let end = start + segment_length;
        if end > signal.len() {
            break;
        }
        let segment_slice = &signal[start..end];

        // Apply window and zero-pad
        let mut padded = Array1::<f64>::zeros(nfft);
        for i in 0..segment_length {
            padded[i] = segment_slice[i] * window[i];
        }

        let spectrum = fft_utils::fft_forward(&padded);
        if spectrum.is_empty() {
            continue;
        }

        for i in 0..num_freqs.min(spectrum.len()) {
            let mut psd = spectrum[i].norm_sqr() / (sample_rate * window_power);

            // One-sided spectrum: double power for positive frequencies (except DC and Nyquist)
            let is_nyquist = (nfft % 2 == 0) && (i == num_freqs - 1);
            if i > 0 && !is_nyquist {
                psd *= 2.0;
            }

            psd_sum[i] += psd;
        }

        segment_count += 1;
    }

    if segment_count == 0 {
        return Err(AnalyzerError::InsufficientData(
            "no valid segments processed".to_string(),
        ));
    }

    let frequencies = frequency_vector(nfft, sample_rate);
    Ok(frequencies
        .iter()
        .zip(psd_sum.iter())
        .map(|(&freq, &psd)| (freq, psd / segment_count as f64))
        .collect())
}

/// RMS amplitude of the content between `low_hz` (inclusive) and `high_hz` (exclusive),
/// integrated from a linear one-sided PSD.
pub fn band_rms(frequencies: &[f64], psd: &[f64], low_hz: f64, high_hz: f64) -> f64 {
    if frequencies.len() < 2 {
        return 0.0;
    }
    let df = frequencies[1] - frequencies[0];
    let power: f64 = frequencies
        .iter()
        .zip(psd)
        .filter(|(&f, _)| f >= low_hz && f < high_hz)
        .map(|(_, &p)| p * df)
        .sum();
    power.max(0.0).sqrt()
}

/// First frequency at or above 20 Hz that starts a run of at least
/// `NOISE_START_MIN_BINS` bins above the baseline plus margin. `nyquist_hz` when none.
pub fn find_noise_start(frequencies: &[f64], psd_db: &[f64], nyquist_hz: f64) -> f64 {
    let first = match frequencies.iter().position(|&f| f >= NOISE_START_MIN_HZ) {
        Some(i) => i,
        None => return nyquist_hz,
    };
    let baseline = match signal_stats::median(&psd_db[first..]) {
        Some(b) => b,
        None => return nyquist_hz,
    };
    let threshold = baseline + NOISE_START_MARGIN_DB;

    let mut run_start: Option<usize> = None;
    for i in first..psd_db.len() {
        if psd_db[i] > threshold {
            let start = *run_start.get_or_insert(i);
            if i + 1 - start >= NOISE_START_MIN_BINS {
                return frequencies[start].clamp(0.0, nyquist_hz);
            }
        } else {
            run_start = None;
        }
    }
    nyquist_hz
}

/// Builds a [`NoiseProfile`] for one channel.
///
/// Non-finite samples are dropped and the mean removed before the Welch PSD. Returns
/// `None` when fewer than one segment of finite samples exists, the signal is constant,
/// or the spectrum is not finite.
pub fn analyze_noise(signal: &[f64], sample_rate: f64, axis: &str) -> Option<NoiseProfile> {
    let mut finite = signal_stats::finite_values(signal);
    if finite.len() < MIN_SPECTRAL_SAMPLES {
        log::debug!(
            "{}: only {} finite samples, skipping spectral analysis",
            axis,
            finite.len()
        );
        return None;
    }
    let mean = signal_stats::mean(&finite)?;
    let std = signal_stats::std_dev(&finite)?;
    if std * std <= MIN_SIGNAL_VARIANCE {
        log::debug!("{}: constant signal, skipping spectral analysis", axis);
        return None;
    }
    finite.iter_mut().for_each(|v| *v -= mean);

    let psd_pairs = match welch_psd(&finite, sample_rate, None) {
        Ok(pairs) => pairs,
        Err(e) => {
            log::warn!("{}: Welch PSD failed: {}", axis, e);
            return None;
        }
    };
    if psd_pairs.iter().any(|(_, p)| !p.is_finite()) {
        log::warn!("{}: non-finite PSD values, skipping", axis);
        return None;
    }

    let (frequencies, psd): (Vec<f64>, Vec<f64>) = psd_pairs.into_iter().unzip();
    let psd_db: Vec<f64> = psd.iter().map(|&p| power_to_db(p)).collect();
    let nyquist_hz = sample_rate / 2.0;

    let peaks = peak_detection::detect_peaks(&frequencies, &psd_db);
    let noise_start_freq = find_noise_start(&frequencies, &psd_db, nyquist_hz);
    let low_band_rms = band_rms(&frequencies, &psd, NOISE_BAND_LOW_HZ.0, NOISE_BAND_LOW_HZ.1);
    let mid_band_rms = band_rms(&frequencies, &psd, NOISE_BAND_MID_HZ.0, NOISE_BAND_MID_HZ.1);
    let high_band_rms = band_rms(
        &frequencies,
        &psd,
        NOISE_BAND_HIGH_START_HZ,
        f64::INFINITY,
    );

    log::debug!(
        "{}: {} peaks, noise start {:.1} Hz, band RMS {:.2}/{:.2}/{:.2}",
        axis,
        peaks.len(),
        noise_start_freq,
        low_band_rms,
        mid_band_rms,
        high_band_rms
    );

    Some(NoiseProfile {
        axis: axis.to_string(),
        frequencies,
        psd_db,
        peaks,
        noise_start_freq,
        low_band_rms,
        mid_band_rms,
        high_band_rms,
        nyquist_hz,
    })
}

/// Noise profile of one gyro axis (0=Roll, 1=Pitch, 2=Yaw); `None` when the channel is absent.
pub fn analyze_axis_noise(store: &SampleStore, axis_index: usize) -> Option<NoiseProfile> {
    let channel = store.channel(GYRO_CHANNELS[axis_index])?;
    let data = channel.to_vec();
    analyze_noise(&data, store.sample_rate(), AXIS_NAMES[axis_index])
}

/// Noise profiles for all three gyro axes.
pub fn analyze_all_axes(store: &SampleStore) -> AxisNoiseProfiles {
    std::array::from_fn(|axis_index| analyze_axis_noise(store, axis_index))
}

/// Noise quality score, 0-100.
///
/// Mid plus high band RMS maps linearly from 100 (2 deg/s or less) to 0 (20 deg/s or
/// more); each strong peak then costs 5 points, at most 20.
pub fn noise_score(profile: &NoiseProfile) -> f64 {
    let combined = (profile.mid_band_rms.powi(2) + profile.high_band_rms.powi(2)).sqrt();
    let rms_score = linear_score(combined, NOISE_RMS_GOOD_DEG_S, NOISE_RMS_BAD_DEG_S);
    let strong = profile.strong_peaks(STRONG_PEAK_PROMINENCE_DB).count() as f64;
    let penalty = (strong * NOISE_PEAK_PENALTY).min(NOISE_PEAK_PENALTY_MAX);
    (rms_score - penalty).clamp(0.0, 100.0)
}

/// Mean noise score over the analysed axes; `None` when no axis has a profile.
pub fn combined_noise_score(profiles: &[Option<NoiseProfile>; AXIS_COUNT]) -> Option<f64> {
    let scores: Vec<f64> = profiles.iter().flatten().map(noise_score).collect();
    signal_stats::mean(&scores)
}
