// src/data_analysis/motor_analysis.rs

use ndarray_stats::QuantileExt;
use serde::Serialize;

use crate::axis_names::{motor_channel, MAX_MOTORS, THROTTLE_CHANNEL};
use crate::constants::{
    MOTOR_IMBALANCE_WARN_PCT, MOTOR_SATURATION_DUTY_PCT, MOTOR_SATURATION_PENALTY_PER_PCT,
    MOTOR_SATURATION_WARN_PCT, MOTOR_SPREAD_FREE_PCT, MOTOR_SPREAD_PENALTY_PER_PCT,
};
use crate::data_analysis::findings::Finding;
use crate::data_analysis::signal_stats;
use crate::data_input::sample_store::SampleStore;

/// How raw motor output values map to duty cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MotorScale {
    /// 0.0-1.0
    Fraction,
    /// 0-100
    Percent,
    /// PWM pulse width, 1000-2000 µs
    Microseconds,
}

impl MotorScale {
    /// Picks the scale from the largest finite value across all motors.
    pub fn detect(max_value: f64) -> Self {
        if max_value > 100.0 {
            MotorScale::Microseconds
        } else if max_value <= 1.0 {
            MotorScale::Fraction
        } else {
            MotorScale::Percent
        }
    }

    /// Duty cycle in percent, clamped to 0-100.
    pub fn to_duty_pct(&self, value: f64) -> f64 {
        let pct = match self {
            MotorScale::Fraction => value * 100.0,
            MotorScale::Percent => value,
            MotorScale::Microseconds => (value - 1000.0) / 10.0,
        };
        pct.clamp(0.0, 100.0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MotorStats {
    pub index: usize,
    pub mean_pct: f64,
    pub max_pct: f64,
    pub std_pct: f64,
    /// Share of samples at or above the saturation duty, percent
    pub saturation_pct: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MotorAnalysis {
    pub scale: MotorScale,
    pub motors: Vec<MotorStats>,
    /// `(max_mean - min_mean) / overall_mean * 100`; `None` with fewer than two motors
    /// or no output.
    pub balance_spread_pct: Option<f64>,
    /// Motor with the highest mean duty
    pub hardest_motor: Option<usize>,
    pub imbalanced: bool,
    /// Worst per-motor saturation share, percent
    pub max_saturation_pct: f64,
    pub saturated: bool,
    pub findings: Vec<Finding>,
}

/// Duty-cycle statistics and balance across the logged motors.
///
/// Probes `motor0..motor7` and keeps at most `motor_count` of the channels found
/// (all of them when `motor_count` is 0). `None` when no motor channel has finite data.
pub fn analyze_motors(store: &SampleStore, motor_count: usize) -> Option<MotorAnalysis> {
    let limit = if motor_count == 0 { MAX_MOTORS } else { motor_count };
    let channels: Vec<(usize, Vec<f64>)> = (0..MAX_MOTORS)
        .filter_map(|i| {
            store
                .channel(&motor_channel(i))
                .map(|data| (i, signal_stats::finite_values(&data.to_vec())))
        })
        .filter(|(_, data)| !data.is_empty())
        .take(limit)
        .collect();
    if channels.is_empty() {
        return None;
    }

    let max_raw = channels
        .iter()
        .flat_map(|(_, data)| data.iter().copied())
        .fold(f64::NEG_INFINITY, f64::max);
    let scale = MotorScale::detect(max_raw);

    let motors: Vec<MotorStats> = channels
        .iter()
        .filter_map(|(index, raw)| {
            let duty: Vec<f64> = raw.iter().map(|&v| scale.to_duty_pct(v)).collect();
            let saturated = duty
                .iter()
                .filter(|&&d| d >= MOTOR_SATURATION_DUTY_PCT)
                .count();
            Some(MotorStats {
                index: *index,
                mean_pct: signal_stats::mean(&duty)?,
                max_pct: duty.iter().copied().fold(0.0, f64::max),
                std_pct: signal_stats::std_dev(&duty)?,
                saturation_pct: saturated as f64 / duty.len() as f64 * 100.0,
            })
        })
        .collect();

    let means: Vec<f64> = motors.iter().map(|m| m.mean_pct).collect();
    let overall_mean = signal_stats::mean(&means).unwrap_or(0.0);
    let max_mean = means.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min_mean = means.iter().copied().fold(f64::INFINITY, f64::min);
    let balance_spread_pct = (motors.len() >= 2 && overall_mean > 0.0)
        .then(|| (max_mean - min_mean) / overall_mean * 100.0);
    let hardest_motor = motors
        .iter()
        .max_by(|a, b| a.mean_pct.total_cmp(&b.mean_pct))
        .map(|m| m.index);
    let max_saturation_pct = motors
        .iter()
        .map(|m| m.saturation_pct)
        .fold(0.0, f64::max);

    let imbalanced = balance_spread_pct.is_some_and(|s| s > MOTOR_IMBALANCE_WARN_PCT);
    let saturated = max_saturation_pct > MOTOR_SATURATION_WARN_PCT;

    let mut findings = Vec::new();
    if let (true, Some(spread), Some(hardest)) = (imbalanced, balance_spread_pct, hardest_motor) {
        findings.push(Finding::warning(format!(
            "Motor output spread is {:.1}%; motor {} works hardest. Check for a bent prop, \
             weak motor or off-centre CG",
            spread, hardest
        )));
    }
    if saturated {
        findings.push(Finding::warning(format!(
            "Motors saturate for {:.1}% of the log; the aircraft is running out of authority",
            max_saturation_pct
        )));
    }

    log::debug!(
        "Motors: {} channels ({:?}), spread {:?}%, saturation {:.1}%",
        motors.len(),
        scale,
        balance_spread_pct,
        max_saturation_pct
    );

    Some(MotorAnalysis {
        scale,
        motors,
        balance_spread_pct,
        hardest_motor,
        imbalanced,
        max_saturation_pct,
        saturated,
        findings,
    })
}

/// Throttle channel as percent, sample by sample; NaN samples stay NaN.
///
/// The raw scale (µs, fraction or percent) is detected the same way as for motors.
pub fn throttle_duty_pct(store: &SampleStore) -> Option<Vec<f64>> {
    let raw = store.channel(THROTTLE_CHANNEL)?;
    if raw.is_empty() {
        return None;
    }
    let max_raw = *raw.max_skipnan();
    if !max_raw.is_finite() {
        return None;
    }
    let scale = MotorScale::detect(max_raw);
    Some(
        raw.iter()
            .map(|&v| if v.is_finite() { scale.to_duty_pct(v) } else { f64::NAN })
            .collect(),
    )
}

/// Motor score, 0-100: 3 points per percent of spread beyond 5 % and 2 per percent of
/// saturated samples.
pub fn motor_score(analysis: &MotorAnalysis) -> f64 {
    let spread_penalty = analysis
        .balance_spread_pct
        .map_or(0.0, |s| (s - MOTOR_SPREAD_FREE_PCT).max(0.0) * MOTOR_SPREAD_PENALTY_PER_PCT);
    let saturation_penalty = analysis.max_saturation_pct * MOTOR_SATURATION_PENALTY_PER_PCT;
    (100.0 - spread_penalty - saturation_penalty).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::collections::BTreeMap;

    fn store_with_motors(motors: &[Vec<f64>]) -> SampleStore {
        let channels: BTreeMap<String, Vec<f64>> = motors
            .iter()
            .enumerate()
            .map(|(i, data)| (motor_channel(i), data.clone()))
            .collect();
        SampleStore::new(500.0, channels).unwrap()
    }

    #[test]
    fn test_balanced_pwm_motors() {
        let store = store_with_motors(&vec![vec![1400.0; 1000]; 4]);
        let analysis = analyze_motors(&store, 4).unwrap();
        assert_eq!(analysis.scale, MotorScale::Microseconds);
        assert_eq!(analysis.motors.len(), 4);
        assert_relative_eq!(analysis.motors[0].mean_pct, 40.0);
        assert_relative_eq!(analysis.balance_spread_pct.unwrap(), 0.0);
        assert!(!analysis.imbalanced);
        assert!(analysis.findings.is_empty());
        assert_relative_eq!(motor_score(&analysis), 100.0);
    }

    #[test]
    fn test_imbalance_flags_hardest_motor() {
        let store = store_with_motors(&[
            vec![0.40; 1000],
            vec![0.40; 1000],
            vec![0.50; 1000],
            vec![0.42; 1000],
        ]);
        let analysis = analyze_motors(&store, 4).unwrap();
        assert_eq!(analysis.scale, MotorScale::Fraction);
        // (50 - 40) / 43 * 100
        assert_relative_eq!(
            analysis.balance_spread_pct.unwrap(),
            10.0 / 43.0 * 100.0,
            epsilon = 1e-9
        );
        assert!(analysis.imbalanced);
        assert_eq!(analysis.hardest_motor, Some(2));
        assert_eq!(analysis.findings.len(), 1);
        assert!(motor_score(&analysis) < 60.0);
    }

    #[test]
    fn test_saturation_share() {
        let mut busy = vec![50.0; 1000];
        busy[..100].iter_mut().for_each(|v| *v = 100.0);
        let store = store_with_motors(&[busy, vec![50.0; 1000]]);
        let analysis = analyze_motors(&store, 0).unwrap();
        assert_eq!(analysis.scale, MotorScale::Percent);
        assert_relative_eq!(analysis.max_saturation_pct, 10.0);
        assert!(analysis.saturated);
    }

    #[test]
    fn test_throttle_duty_from_pwm() {
        let mut channels = BTreeMap::new();
        channels.insert("throttle".to_string(), vec![1000.0, 1500.0, f64::NAN, 2000.0]);
        let store = SampleStore::new(500.0, channels).unwrap();
        let pct = throttle_duty_pct(&store).unwrap();
        assert_relative_eq!(pct[1], 50.0);
        assert!(pct[2].is_nan());
        assert_relative_eq!(pct[3], 100.0);
    }

    #[test]
    fn test_no_motor_channels() {
        let store = SampleStore::new(500.0, BTreeMap::new()).unwrap();
        assert!(analyze_motors(&store, 4).is_none());
    }
}
