// src/data_analysis/noise_fingerprint.rs

use serde::Serialize;

use crate::config::{AircraftInfo, FrequencyBand};
use crate::constants::{
    DEFAULT_HOVER_THROTTLE_PCT, MOTOR_HARMONICS_CHECKED, MOTOR_HARMONIC_TOLERANCE,
    STRONG_PEAK_PROMINENCE_DB, STRUCTURAL_FREQ_TOLERANCE_HZ, STRUCTURAL_POWER_SPREAD_DB,
};
use crate::data_analysis::spectral_analysis::{NoiseProfile, Peak};

/// Physical origin assigned to a spectral peak
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseSource {
    PropHarmonics,
    MotorErpm,
    Structural,
    Unknown,
    None,
}

impl NoiseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoiseSource::PropHarmonics => "prop_harmonics",
            NoiseSource::MotorErpm => "motor_erpm",
            NoiseSource::Structural => "structural",
            NoiseSource::Unknown => "unknown",
            NoiseSource::None => "none",
        }
    }

    /// Fixed remediation advice for this source.
    pub fn remedy(&self) -> &'static str {
        match self {
            NoiseSource::PropHarmonics => {
                "Balance or replace the propellers and check for chipped blades; \
                 a notch at this frequency absorbs what remains"
            }
            NoiseSource::MotorErpm => {
                "Check motor bearings and bell balance; enable RPM filtering or a \
                 dynamic notch that tracks motor speed"
            }
            NoiseSource::Structural => {
                "Stiffen the frame and arm mounting, tighten loose hardware and \
                 soft-mount the flight controller"
            }
            NoiseSource::Unknown => {
                "Inspect for loose parts and vibrating wiring; lower the gyro \
                 low-pass cutoff if the peak persists"
            }
            NoiseSource::None => "No action needed",
        }
    }

    /// Whether a narrow notch is the right remedy (as opposed to a lower low-pass).
    pub fn is_notchable(&self) -> bool {
        matches!(self, NoiseSource::PropHarmonics | NoiseSource::MotorErpm)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// A detected peak with its classified noise source
#[derive(Debug, Clone, Serialize)]
pub struct FingerprintPeak {
    pub axis: String,
    pub freq_hz: f64,
    pub source: NoiseSource,
    pub confidence: Confidence,
    pub detail: String,
    pub remedy: String,
    pub prominence: f64,
    pub power_db: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NoiseFingerprint {
    pub dominant_source: NoiseSource,
    pub peaks: Vec<FingerprintPeak>,
}

impl NoiseFingerprint {
    pub fn empty() -> Self {
        Self {
            dominant_source: NoiseSource::None,
            peaks: Vec::new(),
        }
    }
}

/// Aircraft-derived hints used to classify peaks
#[derive(Debug, Clone, Default)]
pub struct FingerprintContext {
    pub prop_harmonic_bands: Vec<FrequencyBand>,
    /// Motor rotation frequency in Hz, when it can be estimated.
    pub motor_rotation_hz: Option<f64>,
    pub motor_count: usize,
}

impl FingerprintContext {
    /// Context from aircraft metadata and the throttle range (percent) flown.
    pub fn from_aircraft(aircraft: &AircraftInfo, throttle_range_pct: Option<(f64, f64)>) -> Self {
        let mid_throttle = throttle_range_pct
            .map_or(DEFAULT_HOVER_THROTTLE_PCT, |(low, high)| (low + high) / 2.0);
        Self {
            prop_harmonic_bands: aircraft.prop_bands_for(throttle_range_pct),
            motor_rotation_hz: aircraft
                .rotation_hz_at(mid_throttle)
                .filter(|hz| *hz > 0.0),
            motor_count: aircraft.motor_count,
        }
    }
}

fn matching_band(bands: &[FrequencyBand], freq_hz: f64) -> Option<&FrequencyBand> {
    bands.iter().find(|band| band.contains(freq_hz))
}

fn matching_motor_harmonic(rotation_hz: f64, freq_hz: f64) -> Option<usize> {
    (1..=MOTOR_HARMONICS_CHECKED).find(|&k| {
        let expected = rotation_hz * k as f64;
        (freq_hz - expected).abs() <= expected * MOTOR_HARMONIC_TOLERANCE
    })
}

/// Number of analysed axes carrying a peak near `peak` with comparable power, including
/// the peak's own axis. `None` unless every analysed axis (at least two) matches.
fn structural_axis_count(peak: &Peak, profiles: &[&NoiseProfile]) -> Option<usize> {
    if profiles.len() < 2 {
        return None;
    }
    let all_match = profiles.iter().all(|profile| {
        profile.peaks.iter().any(|other| {
            (other.freq_hz - peak.freq_hz).abs() <= STRUCTURAL_FREQ_TOLERANCE_HZ
                && (other.power_db - peak.power_db).abs() <= STRUCTURAL_POWER_SPREAD_DB
        })
    });
    all_match.then_some(profiles.len())
}

fn classify(
    axis: &str,
    peak: &Peak,
    profiles: &[&NoiseProfile],
    context: &FingerprintContext,
) -> FingerprintPeak {
    let (source, confidence, detail) =
        if let Some(band) = matching_band(&context.prop_harmonic_bands, peak.freq_hz) {
            (
                NoiseSource::PropHarmonics,
                Confidence::High,
                format!(
                    "{:.0} Hz on {} lies in the prop-harmonic band {:.0}-{:.0} Hz",
                    peak.freq_hz, axis, band.low_hz, band.high_hz
                ),
            )
        } else if let Some(axis_count) = structural_axis_count(peak, profiles) {
            let confidence = if axis_count >= 3 {
                Confidence::High
            } else {
                Confidence::Medium
            };
            (
                NoiseSource::Structural,
                confidence,
                format!(
                    "{:.0} Hz appears on all {} analysed axes with similar power",
                    peak.freq_hz, axis_count
                ),
            )
        } else if let Some((rotation_hz, harmonic)) = context
            .motor_rotation_hz
            .and_then(|hz| matching_motor_harmonic(hz, peak.freq_hz).map(|k| (hz, k)))
        {
            (
                NoiseSource::MotorErpm,
                Confidence::Medium,
                format!(
                    "{:.0} Hz on {} matches {}x the estimated motor rotation of {:.0} Hz",
                    peak.freq_hz, axis, harmonic, rotation_hz
                ),
            )
        } else {
            let confidence = if peak.prominence >= STRONG_PEAK_PROMINENCE_DB {
                Confidence::Medium
            } else {
                Confidence::Low
            };
            (
                NoiseSource::Unknown,
                confidence,
                format!(
                    "{:.0} Hz on {} ({:.1} dB above floor) does not match a known source",
                    peak.freq_hz, axis, peak.prominence
                ),
            )
        };

    FingerprintPeak {
        axis: axis.to_string(),
        freq_hz: peak.freq_hz,
        source,
        confidence,
        detail,
        remedy: source.remedy().to_string(),
        prominence: peak.prominence,
        power_db: peak.power_db,
    }
}

/// Classifies every peak of every available axis profile into a noise source.
///
/// Checked in order: supplied prop-harmonic bands, presence on all analysed axes
/// (structural), motor rotation harmonics, otherwise unknown. The dominant source is the
/// one with the highest summed prominence.
pub fn fingerprint_noise(
    profiles: &[Option<NoiseProfile>],
    context: &FingerprintContext,
) -> NoiseFingerprint {
    let analysed: Vec<&NoiseProfile> = profiles.iter().flatten().collect();

    let peaks: Vec<FingerprintPeak> = analysed
        .iter()
        .flat_map(|profile| {
            profile
                .peaks
                .iter()
                .map(|peak| classify(&profile.axis, peak, &analysed, context))
        })
        .collect();

    if peaks.is_empty() {
        return NoiseFingerprint::empty();
    }

    let candidates = [
        NoiseSource::PropHarmonics,
        NoiseSource::MotorErpm,
        NoiseSource::Structural,
        NoiseSource::Unknown,
    ];
    let dominant_source = candidates
        .iter()
        .map(|&source| {
            let total: f64 = peaks
                .iter()
                .filter(|p| p.source == source)
                .map(|p| p.prominence)
                .sum();
            (source, total)
        })
        .filter(|(_, total)| *total > 0.0)
        .fold(None::<(NoiseSource, f64)>, |best, (source, total)| match best {
            Some((_, best_total)) if best_total >= total => best,
            _ => Some((source, total)),
        })
        .map_or(NoiseSource::None, |(source, _)| source);

    log::debug!(
        "Fingerprinted {} peaks, dominant source {}",
        peaks.len(),
        dominant_source.as_str()
    );

    NoiseFingerprint {
        dominant_source,
        peaks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(axis: &str, peaks: &[(f64, f64, f64)]) -> NoiseProfile {
        NoiseProfile {
            axis: axis.to_string(),
            frequencies: vec![0.0, 1.0],
            psd_db: vec![-40.0, -40.0],
            peaks: peaks
                .iter()
                .map(|&(freq_hz, power_db, prominence)| Peak {
                    freq_hz,
                    power_db,
                    prominence,
                })
                .collect(),
            noise_start_freq: 250.0,
            low_band_rms: 0.0,
            mid_band_rms: 0.0,
            high_band_rms: 0.0,
            nyquist_hz: 250.0,
        }
    }

    #[test]
    fn test_empty_input_gives_none() {
        let result = fingerprint_noise(&[], &FingerprintContext::default());
        assert_eq!(result.dominant_source, NoiseSource::None);
        assert!(result.peaks.is_empty());

        let no_peaks = [Some(profile("Roll", &[])), None, None];
        let result = fingerprint_noise(&no_peaks, &FingerprintContext::default());
        assert_eq!(result.dominant_source, NoiseSource::None);
    }

    #[test]
    fn test_prop_band_wins() {
        let profiles = [
            Some(profile("Roll", &[(120.0, -10.0, 20.0)])),
            Some(profile("Pitch", &[(121.0, -12.0, 18.0)])),
            Some(profile("Yaw", &[(119.0, -11.0, 19.0)])),
        ];
        let context = FingerprintContext {
            prop_harmonic_bands: vec![FrequencyBand::new(100.0, 140.0)],
            ..FingerprintContext::default()
        };
        let result = fingerprint_noise(&profiles, &context);
        assert_eq!(result.peaks.len(), 3);
        for peak in &result.peaks {
            assert_eq!(peak.source, NoiseSource::PropHarmonics);
            assert_eq!(peak.confidence, Confidence::High);
        }
        assert_eq!(result.dominant_source, NoiseSource::PropHarmonics);
    }

    #[test]
    fn test_same_frequency_on_all_axes_is_structural() {
        let profiles = [
            Some(profile("Roll", &[(85.0, -10.0, 20.0), (200.0, -20.0, 9.0)])),
            Some(profile("Pitch", &[(87.0, -12.0, 18.0)])),
            Some(profile("Yaw", &[(84.0, -15.0, 16.0)])),
        ];
        let result = fingerprint_noise(&profiles, &FingerprintContext::default());
        let structural: Vec<_> = result
            .peaks
            .iter()
            .filter(|p| (p.freq_hz - 85.0).abs() < 5.0)
            .collect();
        assert_eq!(structural.len(), 3);
        assert!(structural
            .iter()
            .all(|p| p.source == NoiseSource::Structural && p.confidence == Confidence::High));

        let lone = result.peaks.iter().find(|p| p.freq_hz == 200.0).unwrap();
        assert_eq!(lone.source, NoiseSource::Unknown);
        assert_eq!(lone.confidence, Confidence::Low);
        assert_eq!(result.dominant_source, NoiseSource::Structural);
    }

    #[test]
    fn test_power_spread_breaks_structural_match() {
        let profiles = [
            Some(profile("Roll", &[(85.0, 0.0, 30.0)])),
            Some(profile("Pitch", &[(85.0, -25.0, 16.0)])),
        ];
        let result = fingerprint_noise(&profiles, &FingerprintContext::default());
        assert!(result.peaks.iter().all(|p| p.source == NoiseSource::Unknown));
        assert!(result.peaks.iter().all(|p| p.confidence == Confidence::Medium));
    }

    #[test]
    fn test_motor_rotation_harmonic() {
        let profiles = [Some(profile("Roll", &[(242.0, -5.0, 12.0)]))];
        let context = FingerprintContext {
            motor_rotation_hz: Some(120.0),
            motor_count: 4,
            ..FingerprintContext::default()
        };
        let result = fingerprint_noise(&profiles, &context);
        assert_eq!(result.peaks[0].source, NoiseSource::MotorErpm);
        assert_eq!(result.peaks[0].confidence, Confidence::Medium);
    }

    #[test]
    fn test_all_axis_resonance_near_motor_harmonic_stays_structural() {
        let profiles = [
            Some(profile("Roll", &[(120.0, -10.0, 20.0)])),
            Some(profile("Pitch", &[(120.0, -10.0, 20.0)])),
            Some(profile("Yaw", &[(120.0, -10.0, 20.0), (236.0, -30.0, 12.0)])),
        ];
        let context = FingerprintContext {
            motor_rotation_hz: Some(118.0),
            motor_count: 4,
            ..FingerprintContext::default()
        };
        let result = fingerprint_noise(&profiles, &context);
        let at_120: Vec<_> = result.peaks.iter().filter(|p| p.freq_hz == 120.0).collect();
        assert_eq!(at_120.len(), 3);
        assert!(at_120.iter().all(|p| p.source == NoiseSource::Structural));
        assert_eq!(result.dominant_source, NoiseSource::Structural);

        // Yaw-only peak at 2x rotation is still motor noise.
        let lone = result.peaks.iter().find(|p| p.freq_hz == 236.0).unwrap();
        assert_eq!(lone.source, NoiseSource::MotorErpm);
    }

    #[test]
    fn test_every_peak_has_remedy() {
        let profiles = [
            Some(profile("Roll", &[(85.0, -10.0, 20.0), (300.0, -30.0, 9.0)])),
            Some(profile("Pitch", &[(85.0, -10.0, 20.0)])),
            None,
        ];
        let result = fingerprint_noise(&profiles, &FingerprintContext::default());
        assert!(!result.peaks.is_empty());
        assert!(result
            .peaks
            .iter()
            .all(|p| !p.remedy.is_empty() && !p.detail.is_empty()));
        // Two analysed axes only: structural with medium confidence.
        assert!(result
            .peaks
            .iter()
            .filter(|p| p.freq_hz == 85.0)
            .all(|p| p.confidence == Confidence::Medium));
    }
}
