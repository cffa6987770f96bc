// src/pipeline.rs

use serde::Serialize;

use crate::axis_names::AXIS_NAMES;
use crate::config::AnalysisConfig;
use crate::constants::GROUND_THROTTLE_PCT;
use crate::data_analysis::action_plan::{build_action_plan, ActionPlan, PlanInputs};
use crate::data_analysis::filter_recommendation::{compute_filter_plan, FilterPlan};
use crate::data_analysis::frame_profile::get_frame_profile;
use crate::data_analysis::hover_oscillation::detect_hover_oscillation;
use crate::data_analysis::log_quality::{assess_log_quality, QualityReport};
use crate::data_analysis::motor_analysis::{analyze_motors, throttle_duty_pct, MotorAnalysis};
use crate::data_analysis::nav::{run_nav_analysis, NavHealth};
use crate::data_analysis::noise_fingerprint::{
    fingerprint_noise, FingerprintContext, NoiseFingerprint,
};
use crate::data_analysis::signal_stats;
use crate::data_analysis::spectral_analysis::analyze_all_axes;
use crate::data_analysis::tracking_response::{analyze_responses, AxisResponse};
use crate::data_input::sample_store::SampleStore;
use crate::types::{AxisNoiseProfiles, AxisOscillations, AxisResponses};

/// Every intermediate result of one analysis run plus the final plan
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub quality: QualityReport,
    pub noise_profiles: AxisNoiseProfiles,
    pub fingerprint: NoiseFingerprint,
    pub filter_plan: FilterPlan,
    pub responses: AxisResponses,
    pub motors: Option<MotorAnalysis>,
    pub nav: Option<NavHealth>,
    pub hover: AxisOscillations,
    pub plan: ActionPlan,
}

/// 10th-90th percentile of the in-flight throttle, percent.
fn flight_throttle_range(store: &SampleStore) -> Option<(f64, f64)> {
    let flying: Vec<f64> = throttle_duty_pct(store)?
        .into_iter()
        .filter(|t| t.is_finite() && *t >= GROUND_THROTTLE_PCT)
        .collect();
    Some((
        signal_stats::percentile(&flying, 10.0)?,
        signal_stats::percentile(&flying, 90.0)?,
    ))
}

/// Runs the full analysis over one recording.
///
/// The quality gate runs first; an unusable log skips the analyzers and comes back with
/// empty results and an `INSUFFICIENT_DATA` plan so callers can still show the issues.
pub fn analyze_log(store: &SampleStore, config: &AnalysisConfig) -> AnalysisReport {
    let motor_count = config.aircraft.motor_count;
    let quality = assess_log_quality(store, config.corrupt_frame_ratio, motor_count);
    let frame = get_frame_profile(config.aircraft.frame_inches);
    log::info!(
        "Analyzing {} samples at {:.0} Hz ({}, quality {:?})",
        store.n_rows(),
        store.sample_rate(),
        frame.name,
        quality.grade
    );

    let (noise_profiles, fingerprint, filter_plan, responses, motors, nav, hover) =
        if quality.usable {
            let noise_profiles = analyze_all_axes(store);
            let context =
                FingerprintContext::from_aircraft(&config.aircraft, flight_throttle_range(store));
            let fingerprint = fingerprint_noise(&noise_profiles, &context);
            let filter_plan = compute_filter_plan(&noise_profiles, &fingerprint, frame);
            (
                noise_profiles,
                fingerprint,
                filter_plan,
                analyze_responses(store),
                analyze_motors(store, motor_count),
                run_nav_analysis(store, &config.nav),
                detect_hover_oscillation(store),
            )
        } else {
            log::warn!("Log unusable, skipping analysis");
            (
                [None, None, None],
                NoiseFingerprint::empty(),
                compute_filter_plan(&[], &NoiseFingerprint::empty(), frame),
                std::array::from_fn(|axis| AxisResponse::unmeasured(AXIS_NAMES[axis])),
                None,
                None,
                [None, None, None],
            )
        };

    let plan = build_action_plan(&PlanInputs {
        quality: &quality,
        noise_profiles: &noise_profiles,
        fingerprint: &fingerprint,
        filter_plan: &filter_plan,
        responses: &responses,
        motors: motors.as_ref(),
        nav: nav.as_ref(),
        hover: &hover,
        frame,
        current: &config.current,
    });

    AnalysisReport {
        quality,
        noise_profiles,
        fingerprint,
        filter_plan,
        responses,
        motors,
        nav,
        hover,
        plan,
    }
}
