// src/data_analysis/nav/compass.rs

use serde::Serialize;

use crate::axis_names::HEADING_CHANNEL;
use crate::constants::{
    COMPASS_JITTER_BAD_DEG_S, COMPASS_JITTER_GOOD_DEG_S, COMPASS_JITTER_WARN_DEG_S,
    COMPASS_SMOOTHING_S,
};
use crate::data_analysis::derivative::calculate_derivative;
use crate::data_analysis::findings::{linear_score, Finding};
use crate::data_analysis::nav::{Analyzer, NavContext, NavDetail, ScoredFindings};
use crate::data_analysis::signal_stats;
use crate::data_analysis::spectral_analysis::unwrap_phase;
use crate::data_input::sample_store::SampleStore;

#[derive(Debug, Clone, Serialize)]
pub struct CompassMetrics {
    /// RMS of the heading rate after removing its 1 s moving average, deg/s
    pub jitter_deg_s: f64,
    /// Net heading change over the log, degrees
    pub total_rotation_deg: f64,
}

/// High-frequency heading jitter, typically magnetic interference from power wiring.
pub struct CompassAnalyzer;

/// Heading jitter in deg/s from a heading trace in degrees.
pub fn heading_jitter(heading_deg: &[f64], sample_rate: f64) -> Option<f64> {
    let heading = signal_stats::finite_values(heading_deg);
    if heading.len() < 3 {
        return None;
    }
    let unwrapped = unwrap_phase(&heading);
    let rate = calculate_derivative(&unwrapped, sample_rate);
    if rate.is_empty() {
        return None;
    }
    let window = ((COMPASS_SMOOTHING_S * sample_rate).round() as usize).max(1);
    let trend = signal_stats::moving_average_smooth_f64(&rate, window);
    let residual: Vec<f64> = (&rate - &trend).to_vec();
    signal_stats::rms(&residual)
}

impl Analyzer for CompassAnalyzer {
    fn name(&self) -> &'static str {
        "compass"
    }

    fn analyze(&self, store: &SampleStore, _ctx: &NavContext<'_>) -> Option<ScoredFindings> {
        let heading = store.channel(HEADING_CHANNEL)?.to_vec();
        let jitter = heading_jitter(&heading, store.sample_rate())?;
        let unwrapped = unwrap_phase(&signal_stats::finite_values(&heading));
        let total_rotation_deg = match (unwrapped.first(), unwrapped.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        };

        let mut findings = Vec::new();
        if jitter > COMPASS_JITTER_BAD_DEG_S {
            findings.push(Finding::critical(format!(
                "Compass heading jitter {:.1} deg/s; magnetic interference is likely. Move the \
                 compass away from power wiring and recalibrate",
                jitter
            )));
        } else if jitter > COMPASS_JITTER_WARN_DEG_S {
            findings.push(Finding::warning(format!(
                "Compass heading jitter {:.1} deg/s; check compass mounting and wiring",
                jitter
            )));
        }

        Some(ScoredFindings {
            analyzer: self.name(),
            score: linear_score(jitter, COMPASS_JITTER_GOOD_DEG_S, COMPASS_JITTER_BAD_DEG_S),
            findings,
            detail: NavDetail::Compass(CompassMetrics {
                jitter_deg_s: jitter,
                total_rotation_deg,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NavConfig;
    use crate::data_analysis::nav::test_support;
    use crate::data_analysis::spectral_analysis::test_signals::lcg_noise;

    fn ctx(config: &NavConfig) -> NavContext<'_> {
        NavContext {
            phases: &[],
            config,
        }
    }

    #[test]
    fn test_steady_turn_through_north_is_clean() {
        // 30 deg/s yaw, wrapping through 360 several times
        let heading: Vec<f64> = (0..3000).map(|i| (i as f64 * 0.3) % 360.0).collect();
        let jitter = heading_jitter(&heading, 100.0).unwrap();
        assert!(jitter < 0.5, "jitter {}", jitter);

        let config = NavConfig::default();
        let store = test_support::store(100.0, vec![("heading", heading)]);
        let result = CompassAnalyzer.analyze(&store, &ctx(&config)).unwrap();
        assert_eq!(result.score, 100.0);
        assert!(result.findings.is_empty());
        match result.detail {
            NavDetail::Compass(m) => assert!((m.total_rotation_deg - 899.7).abs() < 1e-6),
            _ => panic!("wrong detail"),
        }
    }

    #[test]
    fn test_noisy_heading_warns() {
        let noise = lcg_noise(3000, 11);
        let heading: Vec<f64> = noise.iter().map(|n| 180.0 + 0.5 * n).collect();
        let config = NavConfig::default();
        let store = test_support::store(100.0, vec![("heading", heading)]);
        let result = CompassAnalyzer.analyze(&store, &ctx(&config)).unwrap();
        assert!(!result.findings.is_empty());
        assert!(result.score < 50.0);
    }

    #[test]
    fn test_missing_heading() {
        let config = NavConfig::default();
        let store = test_support::store(100.0, vec![("baro_alt", vec![0.0; 100])]);
        assert!(CompassAnalyzer.analyze(&store, &ctx(&config)).is_none());
    }
}
