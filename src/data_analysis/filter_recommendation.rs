// src/data_analysis/filter_recommendation.rs

use serde::Serialize;

use crate::constants::{
    BROAD_PEAK_CUTOFF_FRACTION, CUTOFF_ROUNDING_HZ, DTERM_CUTOFF_MARGIN, DYN_NOTCH_MIN_FRACTION,
    GYRO_CUTOFF_MARGIN, MAX_NOTCHES, MIN_PEAK_SEPARATION_HZ, NOTCH_BANDWIDTH_FRACTION,
    NOTCH_MIN_BANDWIDTH_HZ, NOTCH_MIN_PROMINENCE_DB, NO_RISE_NYQUIST_FRACTION,
};
use crate::data_analysis::frame_profile::FrameProfile;
use crate::data_analysis::noise_fingerprint::{NoiseFingerprint, NoiseSource};
use crate::data_analysis::spectral_analysis::NoiseProfile;
use crate::types::CutoffRange;

/// Which low-pass filter a recommendation applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterTarget {
    Gyro,
    DTerm,
}

impl FilterTarget {
    /// Firmware setting name of this filter's cutoff
    pub fn parameter(&self) -> &'static str {
        match self {
            FilterTarget::Gyro => "gyro_main_lpf_hz",
            FilterTarget::DTerm => "dterm_lpf_hz",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FilterTarget::Gyro => "gyro",
            FilterTarget::DTerm => "D-term",
        }
    }

    /// Fraction of the noise start frequency the cutoff is placed at
    pub fn margin(&self) -> f64 {
        match self {
            FilterTarget::Gyro => GYRO_CUTOFF_MARGIN,
            FilterTarget::DTerm => DTERM_CUTOFF_MARGIN,
        }
    }

    pub fn safe_range(&self, frame: &FrameProfile) -> CutoffRange {
        match self {
            FilterTarget::Gyro => frame.gyro_lpf_range,
            FilterTarget::DTerm => frame.dterm_lpf_range,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FilterRecommendation {
    pub target: FilterTarget,
    pub cutoff_hz: f64,
    pub safe_range: CutoffRange,
    /// Lowest noise start frequency across the analysed axes
    pub noise_start_hz: f64,
    /// Set when a broad structural or unknown peak pulled the cutoff down
    pub broad_peak_hz: Option<f64>,
}

/// A narrow notch placement at a rotating-part peak
#[derive(Debug, Clone, Serialize)]
pub struct NotchRecommendation {
    pub center_hz: f64,
    pub q: f64,
    pub axes: Vec<String>,
    pub source: NoiseSource,
    pub prominence: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FilterPlan {
    pub gyro: Option<FilterRecommendation>,
    pub dterm: Option<FilterRecommendation>,
    /// Strongest first
    pub notches: Vec<NotchRecommendation>,
    pub dyn_notch_min_hz: Option<f64>,
}

impl FilterPlan {
    pub fn is_empty(&self) -> bool {
        self.gyro.is_none()
            && self.dterm.is_none()
            && self.notches.is_empty()
            && self.dyn_notch_min_hz.is_none()
    }
}

fn round_to_step(value: f64, step: f64) -> f64 {
    (value / step).round() * step
}

fn clamp_to(value: f64, range: CutoffRange) -> f64 {
    value.clamp(range.0, range.1)
}

/// Notch quality factor for a centre frequency: `center / max(10, 0.15 * center)`.
pub fn notch_q(center_hz: f64) -> f64 {
    center_hz / NOTCH_MIN_BANDWIDTH_HZ.max(NOTCH_BANDWIDTH_FRACTION * center_hz)
}

/// Low-pass cutoff placed just below where noise starts rising.
///
/// Uses the minimum `noise_start_freq` across the available axes. A spectrum without a
/// rise (start at or above 95 % of Nyquist) needs no change and yields `None`. Otherwise
/// the start frequency times the target's margin is rounded to 5 Hz and clamped to the
/// frame's safe range.
pub fn compute_recommended_filter(
    profiles: &[Option<NoiseProfile>],
    target: FilterTarget,
    frame: &FrameProfile,
) -> Option<FilterRecommendation> {
    let analysed: Vec<&NoiseProfile> = profiles.iter().flatten().collect();
    let noise_start_hz = analysed
        .iter()
        .map(|p| p.noise_start_freq)
        .filter(|f| f.is_finite())
        .min_by(|a, b| a.total_cmp(b))?;
    let nyquist_hz = analysed
        .iter()
        .map(|p| p.nyquist_hz)
        .min_by(|a, b| a.total_cmp(b))?;

    if noise_start_hz >= NO_RISE_NYQUIST_FRACTION * nyquist_hz {
        log::debug!(
            "No noise rise below {:.0} Hz, {} low-pass unchanged",
            nyquist_hz,
            target.name()
        );
        return None;
    }

    let safe_range = target.safe_range(frame);
    let raw_cutoff = round_to_step(noise_start_hz * target.margin(), CUTOFF_ROUNDING_HZ);
    let cutoff_hz = clamp_to(raw_cutoff, safe_range);
    log::debug!(
        "{} low-pass: noise starts at {:.1} Hz, recommending {:.0} Hz (safe {:.0}-{:.0})",
        target.name(),
        noise_start_hz,
        cutoff_hz,
        safe_range.0,
        safe_range.1
    );

    Some(FilterRecommendation {
        target,
        cutoff_hz,
        safe_range,
        noise_start_hz,
        broad_peak_hz: None,
    })
}

/// Groups strong notchable peaks within `MIN_PEAK_SEPARATION_HZ` of each other.
fn collect_notches(fingerprint: &NoiseFingerprint) -> Vec<NotchRecommendation> {
    let mut candidates: Vec<_> = fingerprint
        .peaks
        .iter()
        .filter(|p| p.source.is_notchable() && p.prominence >= NOTCH_MIN_PROMINENCE_DB)
        .collect();
    candidates.sort_by(|a, b| b.prominence.total_cmp(&a.prominence));

    let mut notches: Vec<NotchRecommendation> = Vec::new();
    for peak in candidates {
        if let Some(existing) = notches
            .iter_mut()
            .find(|n| (n.center_hz - peak.freq_hz).abs() < MIN_PEAK_SEPARATION_HZ)
        {
            if !existing.axes.contains(&peak.axis) {
                existing.axes.push(peak.axis.clone());
            }
            continue;
        }
        if notches.len() >= MAX_NOTCHES {
            continue;
        }
        notches.push(NotchRecommendation {
            center_hz: peak.freq_hz,
            q: notch_q(peak.freq_hz),
            axes: vec![peak.axis.clone()],
            source: peak.source,
            prominence: peak.prominence,
        });
    }
    notches
}

/// Full filter plan: low-pass cutoffs, notches and dynamic-notch floor.
///
/// Strong prop or motor peaks get notches. Strong structural or unknown peaks below the
/// gyro cutoff cannot be notched reliably, so they pull the gyro low-pass down to 80 %
/// of the lowest such peak instead.
pub fn compute_filter_plan(
    profiles: &[Option<NoiseProfile>],
    fingerprint: &NoiseFingerprint,
    frame: &FrameProfile,
) -> FilterPlan {
    let mut gyro = compute_recommended_filter(profiles, FilterTarget::Gyro, frame);
    let dterm = compute_recommended_filter(profiles, FilterTarget::DTerm, frame);
    let notches = collect_notches(fingerprint);

    let reference_cutoff = gyro
        .as_ref()
        .map_or(frame.gyro_lpf_range.1, |g| g.cutoff_hz);
    let lowest_broad_peak = fingerprint
        .peaks
        .iter()
        .filter(|p| {
            matches!(p.source, NoiseSource::Structural | NoiseSource::Unknown)
                && p.prominence >= NOTCH_MIN_PROMINENCE_DB
                && p.freq_hz < reference_cutoff
        })
        .map(|p| p.freq_hz)
        .min_by(|a, b| a.total_cmp(b));

    if let Some(peak_hz) = lowest_broad_peak {
        let safe_range = frame.gyro_lpf_range;
        let cutoff_hz = clamp_to(
            round_to_step(peak_hz * BROAD_PEAK_CUTOFF_FRACTION, CUTOFF_ROUNDING_HZ),
            safe_range,
        );
        match gyro.as_mut() {
            Some(existing) => {
                if cutoff_hz < existing.cutoff_hz {
                    existing.cutoff_hz = cutoff_hz;
                    existing.broad_peak_hz = Some(peak_hz);
                }
            }
            None => {
                gyro = Some(FilterRecommendation {
                    target: FilterTarget::Gyro,
                    cutoff_hz,
                    safe_range,
                    noise_start_hz: peak_hz,
                    broad_peak_hz: Some(peak_hz),
                });
            }
        }
    }

    let dyn_notch_min_hz = notches
        .iter()
        .map(|n| n.center_hz)
        .min_by(|a, b| a.total_cmp(b))
        .map(|lowest| {
            round_to_step(lowest * DYN_NOTCH_MIN_FRACTION, CUTOFF_ROUNDING_HZ)
                .max(frame.dyn_notch_floor_hz)
        });

    FilterPlan {
        gyro,
        dterm,
        notches,
        dyn_notch_min_hz,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_analysis::frame_profile::get_frame_profile;
    use crate::data_analysis::noise_fingerprint::{Confidence, FingerprintPeak};

    fn profile_with_start(noise_start_freq: f64) -> NoiseProfile {
        NoiseProfile {
            axis: "Roll".to_string(),
            frequencies: Vec::new(),
            psd_db: Vec::new(),
            peaks: Vec::new(),
            noise_start_freq,
            low_band_rms: 0.0,
            mid_band_rms: 0.0,
            high_band_rms: 0.0,
            nyquist_hz: 250.0,
        }
    }

    fn fp_peak(axis: &str, freq_hz: f64, source: NoiseSource, prominence: f64) -> FingerprintPeak {
        FingerprintPeak {
            axis: axis.to_string(),
            freq_hz,
            source,
            confidence: Confidence::High,
            detail: String::new(),
            remedy: source.remedy().to_string(),
            prominence,
            power_db: -10.0,
        }
    }

    #[test]
    fn test_flat_spectrum_needs_no_change() {
        let frame = get_frame_profile(5.0);
        let profiles = [Some(profile_with_start(250.0)), None, None];
        assert!(compute_recommended_filter(&profiles, FilterTarget::Gyro, frame).is_none());
        assert!(compute_recommended_filter(&[], FilterTarget::Gyro, frame).is_none());
    }

    #[test]
    fn test_rise_at_80hz_stays_in_safe_range() {
        for inches in [3.0, 5.0, 7.0, 10.0, 12.0, 15.0] {
            let frame = get_frame_profile(inches);
            let profiles = [Some(profile_with_start(80.0)), None, None];
            for target in [FilterTarget::Gyro, FilterTarget::DTerm] {
                let rec = compute_recommended_filter(&profiles, target, frame).unwrap();
                let range = target.safe_range(frame);
                assert!(rec.cutoff_hz >= range.0 && rec.cutoff_hz <= range.1);
                assert_eq!(rec.noise_start_hz, 80.0);
            }
        }
    }

    #[test]
    fn test_uses_lowest_axis_and_rounds() {
        let frame = get_frame_profile(7.0);
        let profiles = [
            Some(profile_with_start(130.0)),
            Some(profile_with_start(101.0)),
            None,
        ];
        let rec = compute_recommended_filter(&profiles, FilterTarget::Gyro, frame).unwrap();
        // 101 * 0.9 = 90.9 -> 90
        assert_eq!(rec.cutoff_hz, 90.0);
        let dterm = compute_recommended_filter(&profiles, FilterTarget::DTerm, frame).unwrap();
        // 101 * 0.8 = 80.8 -> 80
        assert_eq!(dterm.cutoff_hz, 80.0);
    }

    #[test]
    fn test_plan_notches_prop_peaks() {
        let frame = get_frame_profile(5.0);
        let fingerprint = NoiseFingerprint {
            dominant_source: NoiseSource::PropHarmonics,
            peaks: vec![
                fp_peak("Roll", 200.0, NoiseSource::PropHarmonics, 25.0),
                fp_peak("Pitch", 204.0, NoiseSource::PropHarmonics, 20.0),
                fp_peak("Roll", 400.0, NoiseSource::MotorErpm, 14.0),
                fp_peak("Yaw", 320.0, NoiseSource::MotorErpm, 10.0), // too weak
            ],
        };
        let plan = compute_filter_plan(&[], &fingerprint, frame);
        assert_eq!(plan.notches.len(), 2);
        assert_eq!(plan.notches[0].center_hz, 200.0);
        assert_eq!(plan.notches[0].axes, vec!["Roll".to_string(), "Pitch".to_string()]);
        assert!((plan.notches[0].q - 200.0 / 30.0).abs() < 1e-9);
        // 0.8 * 200 = 160, above the 80 Hz floor
        assert_eq!(plan.dyn_notch_min_hz, Some(160.0));
        assert!(plan.gyro.is_none());
    }

    #[test]
    fn test_plan_broad_peak_lowers_gyro_cutoff() {
        let frame = get_frame_profile(5.0);
        let profiles = [Some(profile_with_start(160.0)), None, None];
        let fingerprint = NoiseFingerprint {
            dominant_source: NoiseSource::Structural,
            peaks: vec![fp_peak("Roll", 130.0, NoiseSource::Structural, 18.0)],
        };
        let plan = compute_filter_plan(&profiles, &fingerprint, frame);
        let gyro = plan.gyro.unwrap();
        // 160 * 0.9 = 144; the 130 Hz peak pulls it to 0.8 * 130 = 104 -> 105
        assert_eq!(gyro.cutoff_hz, 105.0);
        assert_eq!(gyro.broad_peak_hz, Some(130.0));
        assert!(plan.notches.is_empty());
        assert!(plan.dyn_notch_min_hz.is_none());
    }

    #[test]
    fn test_notch_q_has_minimum_bandwidth() {
        assert!((notch_q(50.0) - 5.0).abs() < 1e-9);
        assert!((notch_q(300.0) - 300.0 / 45.0).abs() < 1e-9);
    }
}
