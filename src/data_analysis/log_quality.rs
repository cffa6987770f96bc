// src/data_analysis/log_quality.rs

use serde::Serialize;

use crate::axis_names::{
    motor_channel, GYRO_CHANNELS, MAX_MOTORS, SETPOINT_CHANNELS, THROTTLE_CHANNEL,
};
use crate::constants::{
    CORRUPT_RATIO_FAIL, CORRUPT_RATIO_WARN, GROUND_THROTTLE_PCT, LOW_SAMPLE_RATE_HZ,
    MIN_USABLE_DURATION_S, MIN_USABLE_SAMPLES, NO_STICK_INPUT_DEG_S,
};
use crate::data_analysis::findings::{Finding, Severity};
use crate::data_analysis::motor_analysis::throttle_duty_pct;
use crate::data_input::sample_store::SampleStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QualityGrade {
    Good,
    Marginal,
    Unusable,
}

#[derive(Debug, Clone, Serialize)]
pub struct QualityStats {
    pub has_gyro: bool,
    pub n_rows: usize,
    pub duration_s: f64,
    pub sample_rate: f64,
    pub corrupt_frame_ratio: Option<f64>,
    pub channel_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct QualityReport {
    pub grade: QualityGrade,
    pub usable: bool,
    pub issues: Vec<Finding>,
    pub stats: QualityStats,
}

fn has_finite(store: &SampleStore, name: &str) -> bool {
    store
        .channel(name)
        .is_some_and(|data| data.iter().any(|v| v.is_finite()))
}

/// Present, with finite samples, and every finite sample exactly zero.
fn is_dead_channel(store: &SampleStore, name: &str) -> bool {
    store.channel(name).is_some_and(|data| {
        let mut finite = data.iter().filter(|v| v.is_finite()).peekable();
        finite.peek().is_some() && finite.all(|&v| v == 0.0)
    })
}

fn max_abs(store: &SampleStore, name: &str) -> Option<f64> {
    store
        .channel(name)?
        .iter()
        .filter(|v| v.is_finite())
        .map(|v| v.abs())
        .reduce(f64::max)
}

/// Decides whether a log is worth analyzing before any analyzer runs.
///
/// `corrupt_frame_ratio` comes from the decoder (share of frames it had to drop);
/// `motor_count` limits the motors checked for dead output.
pub fn assess_log_quality(
    store: &SampleStore,
    corrupt_frame_ratio: Option<f64>,
    motor_count: usize,
) -> QualityReport {
    let mut issues = Vec::new();
    let has_gyro = GYRO_CHANNELS.iter().any(|name| has_finite(store, name));

    if !has_gyro {
        issues.push(Finding::critical("No gyro data in the log"));
    }
    if store.n_rows() < MIN_USABLE_SAMPLES || store.duration_s() < MIN_USABLE_DURATION_S {
        issues.push(Finding::critical(format!(
            "Log too short: {} samples, {:.1} s (need {} samples and {:.0} s)",
            store.n_rows(),
            store.duration_s(),
            MIN_USABLE_SAMPLES,
            MIN_USABLE_DURATION_S
        )));
    }
    if let Some(ratio) = corrupt_frame_ratio {
        if ratio > CORRUPT_RATIO_FAIL {
            issues.push(Finding::critical(format!(
                "{:.1}% of frames are corrupt",
                ratio * 100.0
            )));
        } else if ratio > CORRUPT_RATIO_WARN {
            issues.push(Finding::warning(format!(
                "{:.1}% of frames are corrupt; results may be noisy",
                ratio * 100.0
            )));
        }
    }
    if store.sample_rate() < LOW_SAMPLE_RATE_HZ {
        issues.push(Finding::warning(format!(
            "Sample rate {:.0} Hz is low; noise above {:.0} Hz is invisible. Raise the \
             blackbox rate",
            store.sample_rate(),
            store.sample_rate() / 2.0
        )));
    }

    let setpoint_peaks: Vec<f64> = SETPOINT_CHANNELS
        .iter()
        .filter_map(|name| max_abs(store, name))
        .collect();
    let throttle_peak = throttle_duty_pct(store).and_then(|t| {
        t.into_iter().filter(|v| v.is_finite()).reduce(f64::max)
    });
    let sticks_idle = setpoint_peaks.iter().all(|&p| p < NO_STICK_INPUT_DEG_S);
    let throttle_idle = throttle_peak.map_or(true, |p| p < GROUND_THROTTLE_PCT);
    if (!setpoint_peaks.is_empty() || throttle_peak.is_some()) && sticks_idle && throttle_idle {
        issues.push(Finding::warning(
            "No stick input and throttle stays below idle; the log looks like a ground test",
        ));
    }

    let motor_limit = if motor_count == 0 { MAX_MOTORS } else { motor_count.min(MAX_MOTORS) };
    let expected = GYRO_CHANNELS
        .iter()
        .map(|s| s.to_string())
        .chain((0..motor_limit).map(motor_channel))
        .chain(std::iter::once(THROTTLE_CHANNEL.to_string()));
    for name in expected {
        if is_dead_channel(store, &name) {
            issues.push(Finding::warning(format!(
                "Channel '{}' reads 0.0 throughout; dead sensor or logging misconfigured",
                name
            )));
        }
    }

    let grade = match issues.iter().map(|f| f.severity).max() {
        Some(Severity::Critical) => QualityGrade::Unusable,
        Some(Severity::Warning) => QualityGrade::Marginal,
        _ => QualityGrade::Good,
    };
    if grade != QualityGrade::Good {
        log::warn!("Log quality {:?}: {} issues", grade, issues.len());
    }

    QualityReport {
        grade,
        usable: grade != QualityGrade::Unusable,
        issues,
        stats: QualityStats {
            has_gyro,
            n_rows: store.n_rows(),
            duration_s: store.duration_s(),
            sample_rate: store.sample_rate(),
            corrupt_frame_ratio,
            channel_count: store.channel_count(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_analysis::spectral_analysis::test_signals::lcg_noise;
    use std::collections::BTreeMap;

    fn flight_store(n: usize, sample_rate: f64) -> SampleStore {
        let mut channels = BTreeMap::new();
        for (i, name) in GYRO_CHANNELS.iter().enumerate() {
            channels.insert(name.to_string(), lcg_noise(n, i as u64 + 1));
        }
        channels.insert(
            "setpoint_roll".to_string(),
            (0..n).map(|i| 100.0 * (i as f64 * 0.01).sin()).collect(),
        );
        channels.insert("throttle".to_string(), vec![1450.0; n]);
        SampleStore::new(sample_rate, channels).unwrap()
    }

    #[test]
    fn test_clean_flight_is_good() {
        let report = assess_log_quality(&flight_store(2000, 500.0), Some(0.0), 4);
        assert_eq!(report.grade, QualityGrade::Good);
        assert!(report.usable);
        assert!(report.issues.is_empty());
        assert!(report.stats.has_gyro);
    }

    #[test]
    fn test_short_log_unusable() {
        let report = assess_log_quality(&flight_store(400, 500.0), None, 4);
        assert_eq!(report.grade, QualityGrade::Unusable);
        assert!(!report.usable);
    }

    #[test]
    fn test_missing_gyro_unusable() {
        let mut channels = BTreeMap::new();
        channels.insert("throttle".to_string(), vec![1500.0; 2000]);
        let store = SampleStore::new(500.0, channels).unwrap();
        let report = assess_log_quality(&store, None, 4);
        assert_eq!(report.grade, QualityGrade::Unusable);
        assert!(!report.stats.has_gyro);
    }

    #[test]
    fn test_corruption_thresholds() {
        let store = flight_store(2000, 500.0);
        assert_eq!(assess_log_quality(&store, Some(0.05), 4).grade, QualityGrade::Marginal);
        assert_eq!(assess_log_quality(&store, Some(0.15), 4).grade, QualityGrade::Unusable);
    }

    #[test]
    fn test_low_rate_and_ground_test_warn() {
        let n = 1000;
        let mut channels = BTreeMap::new();
        channels.insert("gyro_roll".to_string(), lcg_noise(n, 1));
        channels.insert("setpoint_roll".to_string(), vec![1.0; n]);
        channels.insert("throttle".to_string(), vec![0.0; n]);
        let store = SampleStore::new(200.0, channels).unwrap();
        let report = assess_log_quality(&store, None, 4);
        assert_eq!(report.grade, QualityGrade::Marginal);
        assert_eq!(report.issues.len(), 3);
        assert!(report.issues.iter().any(|f| f.message.contains("ground test")));
        assert!(report.issues.iter().any(|f| f.message.contains("'throttle'")));
    }

    #[test]
    fn test_dead_motor_flagged() {
        let n = 2000;
        let mut channels = BTreeMap::new();
        channels.insert("gyro_roll".to_string(), lcg_noise(n, 1));
        channels.insert("motor0".to_string(), vec![1400.0; n]);
        channels.insert("motor1".to_string(), vec![0.0; n]);
        let store = SampleStore::new(500.0, channels).unwrap();
        let report = assess_log_quality(&store, None, 4);
        assert_eq!(report.grade, QualityGrade::Marginal);
        assert!(report.issues[0].message.contains("motor1"));
    }
}
