// src/data_analysis/nav/estimator.rs

use serde::Serialize;

use crate::axis_names::{BARO_ALT_CHANNEL, NAV_ALT_CHANNEL};
use crate::constants::{
    ESTIMATOR_CORRELATION_BAD, ESTIMATOR_CORRELATION_GOOD, ESTIMATOR_DIVERGENCE_PENALTY,
    ESTIMATOR_RESIDUAL_GROWTH_MIN_M, ESTIMATOR_RESIDUAL_GROWTH_RATIO,
};
use crate::data_analysis::findings::{linear_score, Finding};
use crate::data_analysis::nav::{Analyzer, NavContext, NavDetail, ScoredFindings};
use crate::data_analysis::signal_stats;
use crate::data_input::sample_store::SampleStore;

#[derive(Debug, Clone, Serialize)]
pub struct EstimatorMetrics {
    /// Pearson correlation of barometer and estimated altitude
    pub correlation: f64,
    /// Mean |nav_alt - baro_alt| over the first third of the log, offset removed, metres
    pub early_residual_m: f64,
    /// Same over the last third
    pub late_residual_m: f64,
    pub diverging: bool,
}

/// Agreement between the altitude estimate and the raw barometer.
pub struct EstimatorAnalyzer;

impl Analyzer for EstimatorAnalyzer {
    fn name(&self) -> &'static str {
        "estimator"
    }

    fn analyze(&self, store: &SampleStore, _ctx: &NavContext<'_>) -> Option<ScoredFindings> {
        let baro = store.channel(BARO_ALT_CHANNEL)?;
        let nav = store.channel(NAV_ALT_CHANNEL)?;
        let (baro, nav): (Vec<f64>, Vec<f64>) = baro
            .iter()
            .zip(nav.iter())
            .filter(|(b, n)| b.is_finite() && n.is_finite())
            .map(|(&b, &n)| (b, n))
            .unzip();
        if baro.len() < 3 {
            return None;
        }
        let correlation = signal_stats::pearson_correlation(&baro, &nav)?;

        let residual: Vec<f64> = nav.iter().zip(&baro).map(|(n, b)| n - b).collect();
        let third = residual.len() / 3;
        let offset = signal_stats::mean(&residual[..third])?;
        let mean_abs = |slice: &[f64]| {
            let dev: Vec<f64> = slice.iter().map(|r| (r - offset).abs()).collect();
            signal_stats::mean(&dev)
        };
        let early_residual_m = mean_abs(&residual[..third])?;
        let late_residual_m = mean_abs(&residual[residual.len() - third..])?;
        let diverging = late_residual_m > ESTIMATOR_RESIDUAL_GROWTH_MIN_M
            && late_residual_m > ESTIMATOR_RESIDUAL_GROWTH_RATIO * early_residual_m;

        let mut findings = Vec::new();
        if correlation < ESTIMATOR_CORRELATION_BAD {
            findings.push(Finding::critical(format!(
                "Altitude estimate barely follows the barometer (r = {:.2}); check baro and \
                 accelerometer calibration",
                correlation
            )));
        } else if correlation < ESTIMATOR_CORRELATION_GOOD {
            findings.push(Finding::warning(format!(
                "Altitude estimate loosely follows the barometer (r = {:.2})",
                correlation
            )));
        }
        if diverging {
            findings.push(Finding::warning(format!(
                "Altitude estimate drifts from the barometer ({:.2} m late vs {:.2} m early); \
                 check accelerometer vibration and weights",
                late_residual_m, early_residual_m
            )));
        }

        // 1 - r maps the correlation thresholds onto linear_score's ascending scale.
        let mut score = linear_score(
            1.0 - correlation,
            1.0 - ESTIMATOR_CORRELATION_GOOD,
            1.0 - ESTIMATOR_CORRELATION_BAD,
        );
        if diverging {
            score -= ESTIMATOR_DIVERGENCE_PENALTY;
        }

        Some(ScoredFindings {
            analyzer: self.name(),
            score: score.clamp(0.0, 100.0),
            findings,
            detail: NavDetail::Estimator(EstimatorMetrics {
                correlation,
                early_residual_m,
                late_residual_m,
                diverging,
            }),
        })
    }
}
