// src/data_analysis/nav/baro.rs

use ndarray::Array1;
use serde::Serialize;

use crate::axis_names::BARO_ALT_CHANNEL;
use crate::constants::{
    BARO_HIGHPASS_S, BARO_NOISE_BAD_M, BARO_NOISE_GOOD_M, BARO_SPIKE_PENALTY,
    BARO_SPIKE_PENALTY_MAX, BARO_SPIKE_SIGMA,
};
use crate::data_analysis::findings::{linear_score, Finding};
use crate::data_analysis::nav::{Analyzer, NavContext, NavDetail, ScoredFindings};
use crate::data_analysis::signal_stats;
use crate::data_input::sample_store::SampleStore;

#[derive(Debug, Clone, Serialize)]
pub struct BaroMetrics {
    /// RMS of the altitude after a 1 s high-pass, metres
    pub noise_rms_m: f64,
    /// Separate excursions beyond 4x the local standard deviation
    pub spike_count: usize,
}

/// Barometer noise and spikes, usually prop wash or light leaking onto the sensor.
pub struct BaroAnalyzer;

/// Altitude minus its centered moving average over `window` samples.
pub fn highpass_residual(altitude: &[f64], window: usize) -> Array1<f64> {
    let data = Array1::from(altitude.to_vec());
    let trend = signal_stats::centered_moving_average(&data, window);
    &data - &trend
}

/// Counts runs of samples whose residual exceeds `sigma` times the standard deviation
/// of the preceding `window` samples.
pub fn count_spikes(residual: &Array1<f64>, window: usize, sigma: f64) -> usize {
    let local_std = signal_stats::rolling_std(residual, window);
    let mut count = 0;
    let mut in_spike = false;
    for i in window.max(1)..residual.len() {
        let reference = local_std[i - 1];
        let spiking = reference > 0.0 && residual[i].abs() > sigma * reference;
        if spiking && !in_spike {
            count += 1;
        }
        in_spike = spiking;
    }
    count
}

impl Analyzer for BaroAnalyzer {
    fn name(&self) -> &'static str {
        "baro"
    }

    fn analyze(&self, store: &SampleStore, _ctx: &NavContext<'_>) -> Option<ScoredFindings> {
        let altitude = signal_stats::finite_values(&store.channel(BARO_ALT_CHANNEL)?.to_vec());
        let window = ((BARO_HIGHPASS_S * store.sample_rate()).round() as usize).max(2);
        if altitude.len() < window {
            return None;
        }

        let residual = highpass_residual(&altitude, window);
        let noise_rms_m = signal_stats::rms(&residual.to_vec())?;
        let spike_count = count_spikes(&residual, window, BARO_SPIKE_SIGMA);

        let mut findings = Vec::new();
        if noise_rms_m > BARO_NOISE_BAD_M {
            findings.push(Finding::critical(format!(
                "Barometer noise {:.2} m RMS; cover the sensor with open-cell foam and shield \
                 it from prop wash",
                noise_rms_m
            )));
        } else if noise_rms_m > (BARO_NOISE_GOOD_M + BARO_NOISE_BAD_M) / 2.0 {
            findings.push(Finding::warning(format!(
                "Barometer noise {:.2} m RMS is elevated",
                noise_rms_m
            )));
        }
        if spike_count > 0 {
            findings.push(Finding::warning(format!(
                "{} barometer spikes; check for light or airflow reaching the sensor",
                spike_count
            )));
        }

        let penalty = (spike_count as f64 * BARO_SPIKE_PENALTY).min(BARO_SPIKE_PENALTY_MAX);
        let score = linear_score(noise_rms_m, BARO_NOISE_GOOD_M, BARO_NOISE_BAD_M) - penalty;

        Some(ScoredFindings {
            analyzer: self.name(),
            score: score.clamp(0.0, 100.0),
            findings,
            detail: NavDetail::Baro(BaroMetrics {
                noise_rms_m,
                spike_count,
            }),
        })
    }
}
