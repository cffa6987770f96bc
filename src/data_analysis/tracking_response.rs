// src/data_analysis/tracking_response.rs

use serde::Serialize;

use crate::axis_names::{AXIS_NAMES, GYRO_CHANNELS, SETPOINT_CHANNELS};
use crate::constants::{
    DELAY_PENALTY_PER_MS, MAX_TRACKING_LAG_MS, MIN_SETPOINT_STD_DEG_S, MIN_TRACKING_CORRELATION,
    MOVEMENT_THRESHOLD_DEG_S, OVERSHOOT_PENALTY_PER_PCT, STEP_DETECT_WINDOW_MS, STEP_HOLD_MS,
    STEP_HOLD_TOLERANCE, STEP_MIN_DELTA_DEG_S, STEP_RESPONSE_WINDOW_MS,
};
use crate::data_analysis::frame_profile::FrameProfile;
use crate::data_analysis::signal_stats;
use crate::data_input::sample_store::SampleStore;
use crate::types::AxisResponses;

/// Setpoint tracking quality of one axis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisResponse {
    pub axis: String,
    /// Lag of the best setpoint/gyro correlation, ms
    pub tracking_delay_ms: Option<f64>,
    /// Mean overshoot over detected steps, percent of step size
    pub avg_overshoot_pct: Option<f64>,
    pub step_count: usize,
    pub peak_correlation: Option<f64>,
}

impl AxisResponse {
    pub fn unmeasured(axis: &str) -> Self {
        Self {
            axis: axis.to_string(),
            tracking_delay_ms: None,
            avg_overshoot_pct: None,
            step_count: 0,
            peak_correlation: None,
        }
    }

    pub fn is_measured(&self) -> bool {
        self.tracking_delay_ms.is_some() || self.avg_overshoot_pct.is_some()
    }
}

fn ms_to_samples(ms: f64, sample_rate: f64) -> usize {
    ((ms / 1000.0) * sample_rate).round().max(1.0) as usize
}

/// Replaces non-finite samples with the previous finite value (0 before the first one).
fn hold_last_finite(data: &[f64]) -> Vec<f64> {
    let mut last = 0.0;
    data.iter()
        .map(|&v| {
            if v.is_finite() {
                last = v;
            }
            last
        })
        .collect()
}

/// Lag (samples) and value of the strongest setpoint-to-gyro correlation within
/// `MAX_TRACKING_LAG_MS`.
fn best_lag(setpoint: &[f64], gyro: &[f64], sample_rate: f64) -> Option<(usize, f64)> {
    let max_lag = ms_to_samples(MAX_TRACKING_LAG_MS, sample_rate);
    let mut best: Option<(usize, f64)> = None;
    for lag in 0..=max_lag {
        if let Some(correlation) = signal_stats::lagged_correlation(setpoint, gyro, lag) {
            if best.map_or(true, |(_, c)| correlation > c) {
                best = Some((lag, correlation));
            }
        }
    }
    best
}

/// Overshoot (percent) of every held setpoint step.
///
/// A step is a setpoint change of at least `STEP_MIN_DELTA_DEG_S` within
/// `STEP_DETECT_WINDOW_MS` whose new level then holds for `STEP_HOLD_MS`. Overshoot is the
/// gyro's largest excursion past the new level, in the step's direction, within
/// `STEP_RESPONSE_WINDOW_MS`.
pub fn step_overshoots(setpoint: &[f64], gyro: &[f64], sample_rate: f64) -> Vec<f64> {
    let n = setpoint.len().min(gyro.len());
    let w = ms_to_samples(STEP_DETECT_WINDOW_MS, sample_rate);
    let hold_n = ms_to_samples(STEP_HOLD_MS, sample_rate);
    let response_n = ms_to_samples(STEP_RESPONSE_WINDOW_MS, sample_rate);

    let mut overshoots = Vec::new();
    let mut i = w;
    while i + w < n {
        let old_level = setpoint[i - w];
        if (setpoint[i] - old_level).abs() < STEP_MIN_DELTA_DEG_S {
            i += 1;
            continue;
        }

        let settled = i + w;
        let new_level = setpoint[settled];
        let step = new_level - old_level;
        let hold_end = settled + hold_n;
        if step.abs() < STEP_MIN_DELTA_DEG_S || hold_end > n {
            i += 1;
            continue;
        }
        let tolerance = STEP_HOLD_TOLERANCE * step.abs();
        let held = setpoint[settled..hold_end]
            .iter()
            .all(|v| (v - new_level).abs() <= tolerance);
        if !held {
            i += 1;
            continue;
        }

        let direction = step.signum();
        let response_end = (i + response_n).min(n);
        let excursion = gyro[i..response_end]
            .iter()
            .map(|g| (g - new_level) * direction)
            .fold(f64::NEG_INFINITY, f64::max);
        if excursion.is_finite() {
            overshoots.push(excursion.max(0.0) / step.abs() * 100.0);
        }
        i = hold_end;
    }
    overshoots
}

/// Tracking delay and overshoot for one axis.
///
/// Both metrics are `None` when the setpoint never moves enough to measure: standard
/// deviation under `MIN_SETPOINT_STD_DEG_S` or magnitude never above
/// `MOVEMENT_THRESHOLD_DEG_S`.
pub fn analyze_axis_response(
    setpoint: &[f64],
    gyro: &[f64],
    sample_rate: f64,
    axis: &str,
) -> AxisResponse {
    let n = setpoint.len().min(gyro.len());
    if n < 2 || !sample_rate.is_finite() || sample_rate <= 0.0 {
        return AxisResponse::unmeasured(axis);
    }
    let setpoint = hold_last_finite(&setpoint[..n]);
    let gyro = hold_last_finite(&gyro[..n]);

    let setpoint_std = signal_stats::std_dev(&setpoint).unwrap_or(0.0);
    let max_abs = setpoint.iter().fold(0.0f64, |m, v| m.max(v.abs()));
    if setpoint_std < MIN_SETPOINT_STD_DEG_S || max_abs <= MOVEMENT_THRESHOLD_DEG_S {
        log::debug!("{}: insufficient stick input for response analysis", axis);
        return AxisResponse::unmeasured(axis);
    }

    let best = best_lag(&setpoint, &gyro, sample_rate);
    let tracking_delay_ms = best
        .filter(|(_, correlation)| *correlation > MIN_TRACKING_CORRELATION)
        .map(|(lag, _)| lag as f64 / sample_rate * 1000.0);

    let overshoots = step_overshoots(&setpoint, &gyro, sample_rate);
    let avg_overshoot_pct = signal_stats::mean(&overshoots);

    log::debug!(
        "{}: delay {:?} ms, overshoot {:?}% over {} steps",
        axis,
        tracking_delay_ms,
        avg_overshoot_pct,
        overshoots.len()
    );

    AxisResponse {
        axis: axis.to_string(),
        tracking_delay_ms,
        avg_overshoot_pct,
        step_count: overshoots.len(),
        peak_correlation: best.map(|(_, c)| c),
    }
}

/// Responses for all three axes; axes without setpoint or gyro are unmeasured.
pub fn analyze_responses(store: &SampleStore) -> AxisResponses {
    std::array::from_fn(|axis_index| {
        let axis = AXIS_NAMES[axis_index];
        match (
            store.channel(SETPOINT_CHANNELS[axis_index]),
            store.channel(GYRO_CHANNELS[axis_index]),
        ) {
            (Some(setpoint), Some(gyro)) => analyze_axis_response(
                &setpoint.to_vec(),
                &gyro.to_vec(),
                store.sample_rate(),
                axis,
            ),
            _ => AxisResponse::unmeasured(axis),
        }
    })
}

/// Score of one measured axis: 100 minus 2 per ms of delay beyond the frame target and
/// 3 per percent of overshoot beyond the frame tolerance.
pub fn axis_pid_score(response: &AxisResponse, frame: &FrameProfile) -> Option<f64> {
    if !response.is_measured() {
        return None;
    }
    let delay_penalty = response
        .tracking_delay_ms
        .map_or(0.0, |d| (d - frame.target_delay_ms).max(0.0) * DELAY_PENALTY_PER_MS);
    let overshoot_penalty = response.avg_overshoot_pct.map_or(0.0, |o| {
        (o - frame.overshoot_tolerance_pct).max(0.0) * OVERSHOOT_PENALTY_PER_PCT
    });
    Some((100.0 - delay_penalty - overshoot_penalty).clamp(0.0, 100.0))
}

/// Mean of the measured axis scores; `None` when no axis could be measured.
pub fn pid_score(responses: &[AxisResponse], frame: &FrameProfile) -> Option<f64> {
    let scores: Vec<f64> = responses
        .iter()
        .filter_map(|r| axis_pid_score(r, frame))
        .collect();
    signal_stats::mean(&scores)
}
