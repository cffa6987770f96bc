// src/data_analysis/action_plan.rs

use serde::Serialize;

use crate::axis_names::{AXIS_NAMES, AXIS_PARAM_SUFFIX};
use crate::config::TuneSettings;
use crate::constants::{
    D_INCREASE_FACTOR, DEFAULT_BIQUAD_Q, MIN_CUTOFF_CHANGE_HZ, NOISE_SCORE_OK,
    OSCILLATION_P_DECREASE_FACTOR, PHASE_LAG_REFERENCE_HZ, P_DECREASE_FACTOR, P_INCREASE_FACTOR,
    SLOW_RESPONSE_FACTOR, VERDICT_GOOD_MIN, VERDICT_NEEDS_WORK_MIN, WEIGHT_MOTOR, WEIGHT_NAV,
    WEIGHT_NOISE, WEIGHT_OSCILLATION, WEIGHT_PID,
};
use crate::data_analysis::filter_recommendation::{FilterPlan, FilterRecommendation, FilterTarget};
use crate::data_analysis::filter_response::{attenuation_db, estimate_filter_phase_lag, FilterType};
use crate::data_analysis::findings::Severity;
use crate::data_analysis::frame_profile::FrameProfile;
use crate::data_analysis::hover_oscillation::{hover_score, OscillationSeverity};
use crate::data_analysis::log_quality::{QualityGrade, QualityReport};
use crate::data_analysis::motor_analysis::{motor_score, MotorAnalysis};
use crate::data_analysis::nav::NavHealth;
use crate::data_analysis::noise_fingerprint::{NoiseFingerprint, NoiseSource};
use crate::data_analysis::spectral_analysis::combined_noise_score;
use crate::data_analysis::tracking_response::pid_score;
use crate::types::{AxisNoiseProfiles, AxisOscillations, AxisResponses};

/// Sub-scores and their weighted combination, each 0-100
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Scores {
    pub overall: Option<f64>,
    pub noise: Option<f64>,
    pub pid: Option<f64>,
    pub motor: Option<f64>,
    pub gyro_oscillation: Option<f64>,
    pub nav: Option<f64>,
}

impl Scores {
    /// Weighted mean of the available sub-scores; missing ones drop out and the
    /// remaining weights are renormalised.
    pub fn weighted_overall(&self) -> Option<f64> {
        let weighted = [
            (self.noise, WEIGHT_NOISE),
            (self.pid, WEIGHT_PID),
            (self.motor, WEIGHT_MOTOR),
            (self.gyro_oscillation, WEIGHT_OSCILLATION),
            (self.nav, WEIGHT_NAV),
        ];
        let (sum, weight) = weighted
            .iter()
            .filter_map(|(score, w)| score.map(|s| (s * w, *w)))
            .fold((0.0, 0.0), |(sum, weight), (s, w)| (sum + s, weight + w));
        (weight > 0.0).then(|| (sum / weight).clamp(0.0, 100.0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Good,
    NeedsWork,
    Poor,
    InsufficientData,
}

impl Verdict {
    pub fn from_score(overall: Option<f64>) -> Self {
        match overall {
            Some(s) if s >= VERDICT_GOOD_MIN => Verdict::Good,
            Some(s) if s >= VERDICT_NEEDS_WORK_MIN => Verdict::NeedsWork,
            Some(_) => Verdict::Poor,
            None => Verdict::InsufficientData,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionCategory {
    Oscillation,
    LowPass,
    Notch,
    Hardware,
    Motor,
    Navigation,
    Pid,
}

impl ActionCategory {
    /// Lower runs first.
    pub fn priority(&self) -> u8 {
        match self {
            ActionCategory::Oscillation => 0,
            ActionCategory::LowPass => 1,
            ActionCategory::Notch => 2,
            ActionCategory::Hardware => 3,
            ActionCategory::Motor => 4,
            ActionCategory::Navigation => 5,
            ActionCategory::Pid => 6,
        }
    }
}

/// One recommended change
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Action {
    pub category: ActionCategory,
    pub priority: u8,
    pub description: String,
    /// Firmware setting to change, when the action maps onto one
    pub parameter: Option<String>,
    pub current: Option<f64>,
    pub new: Option<f64>,
    pub rationale: String,
    /// Apply only after the non-deferred actions have been flown
    pub deferred: bool,
}

impl Action {
    fn new(category: ActionCategory, description: String, rationale: String) -> Self {
        Self {
            category,
            priority: category.priority(),
            description,
            parameter: None,
            current: None,
            new: None,
            rationale,
            deferred: false,
        }
    }

    fn with_change(mut self, parameter: &str, current: Option<f64>, new: Option<f64>) -> Self {
        self.parameter = Some(parameter.to_string());
        self.current = current;
        self.new = new;
        self
    }

    /// CLI line applying this action (`set <param> = <new>`).
    pub fn cli_command(&self) -> Option<String> {
        match (&self.parameter, self.new) {
            (Some(parameter), Some(new)) => Some(format!("set {} = {}", parameter, new)),
            _ => None,
        }
    }

    /// Whether this raises a gain or cutoff above its current value.
    fn is_increase(&self) -> bool {
        match (self.current, self.new) {
            (Some(current), Some(new)) => new > current,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionPlan {
    pub scores: Scores,
    pub verdict: Verdict,
    /// Non-deferred first, then by priority
    pub actions: Vec<Action>,
    /// Set when the log quality or missing sub-scores make the plan less trustworthy
    pub low_confidence: bool,
    pub analyzer_version: String,
}

impl ActionPlan {
    pub fn cli_commands(&self) -> Vec<String> {
        self.actions.iter().filter_map(Action::cli_command).collect()
    }

    pub fn primary_actions(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter().filter(|a| !a.deferred)
    }

    pub fn deferred_actions(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter().filter(|a| a.deferred)
    }
}

/// Everything the synthesizer combines
pub struct PlanInputs<'a> {
    pub quality: &'a QualityReport,
    pub noise_profiles: &'a AxisNoiseProfiles,
    pub fingerprint: &'a NoiseFingerprint,
    pub filter_plan: &'a FilterPlan,
    pub responses: &'a AxisResponses,
    pub motors: Option<&'a MotorAnalysis>,
    pub nav: Option<&'a NavHealth>,
    pub hover: &'a AxisOscillations,
    pub frame: &'a FrameProfile,
    pub current: &'a TuneSettings,
}

fn round_gain(value: f64) -> f64 {
    value.round().max(1.0)
}

fn lag_rationale(filter_type: FilterType, cutoff_hz: f64, current_hz: Option<f64>) -> String {
    let lag_at = |cutoff: f64| {
        estimate_filter_phase_lag(cutoff, PHASE_LAG_REFERENCE_HZ, filter_type, DEFAULT_BIQUAD_Q)
    };
    let new_lag = lag_at(cutoff_hz);
    match current_hz {
        Some(current) => {
            let old_lag = lag_at(current);
            format!(
                "{} at {:.0} Hz: {:.1}° ({:.2} ms) now, {:.1}° ({:.2} ms) after",
                filter_type.name(),
                PHASE_LAG_REFERENCE_HZ,
                old_lag.degrees,
                old_lag.ms,
                new_lag.degrees,
                new_lag.ms
            )
        }
        None => format!(
            "{} at {:.0} Hz: {:.1}° ({:.2} ms) phase lag",
            filter_type.name(),
            PHASE_LAG_REFERENCE_HZ,
            new_lag.degrees,
            new_lag.ms
        ),
    }
}

fn lowpass_action(rec: &FilterRecommendation, current: &TuneSettings) -> Option<Action> {
    let (current_hz, filter_type) = match rec.target {
        FilterTarget::Gyro => (current.gyro_lpf_hz, current.gyro_lpf_type),
        FilterTarget::DTerm => (current.dterm_lpf_hz, current.dterm_lpf_type),
    };
    if current_hz.is_some_and(|c| (c - rec.cutoff_hz).abs() < MIN_CUTOFF_CHANGE_HZ) {
        return None;
    }
    let (reason, noise_hz) = match rec.broad_peak_hz {
        Some(peak) => (
            format!("a broad resonance at {:.0} Hz cannot be notched", peak),
            peak,
        ),
        None => (
            format!("noise starts rising at {:.0} Hz", rec.noise_start_hz),
            rec.noise_start_hz,
        ),
    };
    let attenuation = attenuation_db(filter_type, noise_hz, rec.cutoff_hz, DEFAULT_BIQUAD_Q);
    let description = format!(
        "Set the {} low-pass to {:.0} Hz",
        rec.target.name(),
        rec.cutoff_hz
    );
    let rationale = format!(
        "{}; {:.1} dB attenuation at {:.0} Hz, safe range {:.0}-{:.0} Hz. {}",
        reason,
        attenuation,
        noise_hz,
        rec.safe_range.0,
        rec.safe_range.1,
        lag_rationale(filter_type, rec.cutoff_hz, current_hz)
    );
    Some(
        Action::new(ActionCategory::LowPass, description, rationale).with_change(
            rec.target.parameter(),
            current_hz,
            Some(rec.cutoff_hz),
        ),
    )
}

fn filter_actions(plan: &FilterPlan, current: &TuneSettings) -> Vec<Action> {
    let mut actions: Vec<Action> = [plan.gyro.as_ref(), plan.dterm.as_ref()]
        .into_iter()
        .flatten()
        .filter_map(|rec| lowpass_action(rec, current))
        .collect();

    for (i, notch) in plan.notches.iter().enumerate() {
        let description = format!(
            "Notch {:.0} Hz (Q {:.1}) on {}",
            notch.center_hz,
            notch.q,
            notch.axes.join("/")
        );
        let rationale = format!(
            "{} peak {:.1} dB above the noise floor",
            notch.source.as_str(),
            notch.prominence
        );
        let action = Action::new(ActionCategory::Notch, description, rationale);
        // One static gyro notch exists; further peaks rely on the dynamic notch.
        actions.push(if i == 0 {
            action.with_change(
                "gyro_notch_hz",
                current.gyro_notch_hz,
                Some(notch.center_hz.round()),
            )
        } else {
            action
        });
    }

    if let Some(min_hz) = plan.dyn_notch_min_hz {
        let current_min = current.dyn_notch_min_hz;
        if !current_min.is_some_and(|c| (c - min_hz).abs() < MIN_CUTOFF_CHANGE_HZ) {
            actions.push(
                Action::new(
                    ActionCategory::Notch,
                    format!("Set the dynamic notch minimum to {:.0} Hz", min_hz),
                    "keeps the dynamic notch able to reach the lowest rotating-part peak"
                        .to_string(),
                )
                .with_change("dynamic_gyro_notch_min_hz", current_min, Some(min_hz)),
            );
        }
    }
    actions
}

fn hardware_actions(fingerprint: &NoiseFingerprint) -> Vec<Action> {
    let mut seen: Vec<NoiseSource> = Vec::new();
    let mut actions = Vec::new();
    for peak in &fingerprint.peaks {
        if peak.source == NoiseSource::None || seen.contains(&peak.source) {
            continue;
        }
        seen.push(peak.source);
        actions.push(Action::new(
            ActionCategory::Hardware,
            peak.remedy.clone(),
            format!("{} ({:.0} Hz on {})", peak.detail, peak.freq_hz, peak.axis),
        ));
    }
    actions
}

fn motor_actions(motors: &MotorAnalysis) -> Vec<Action> {
    let mut actions = Vec::new();
    if let (true, Some(hardest), Some(spread)) =
        (motors.imbalanced, motors.hardest_motor, motors.balance_spread_pct)
    {
        actions.push(Action::new(
            ActionCategory::Motor,
            format!(
                "Inspect motor {} and its prop; check the centre of gravity",
                hardest
            ),
            format!("motor outputs spread {:.1}% around the mean", spread),
        ));
    }
    if motors.saturated {
        actions.push(Action::new(
            ActionCategory::Motor,
            "Reduce gains or weight; the motors run out of headroom".to_string(),
            format!(
                "{:.1}% of samples at full output",
                motors.max_saturation_pct
            ),
        ));
    }
    actions
}

fn nav_actions(nav: &NavHealth) -> Vec<Action> {
    nav.results
        .iter()
        .flat_map(|result| {
            result
                .findings
                .iter()
                .filter(|f| f.severity >= Severity::Warning)
                .map(move |f| {
                    Action::new(
                        ActionCategory::Navigation,
                        f.message.clone(),
                        format!("{} score {:.0}", result.analyzer, result.score),
                    )
                })
        })
        .collect()
}

fn oscillation_actions(hover: &AxisOscillations, current: &TuneSettings) -> Vec<Action> {
    hover
        .iter()
        .enumerate()
        .filter_map(|(axis, osc)| {
            let osc = osc.as_ref()?;
            if osc.severity == OscillationSeverity::None {
                return None;
            }
            let parameter = format!("mc_p_{}", AXIS_PARAM_SUFFIX[axis]);
            let current_p = current.p_gains[axis];
            let description = format!(
                "Lower {} P by {:.0}% to stop the hover oscillation",
                AXIS_NAMES[axis],
                (1.0 - OSCILLATION_P_DECREASE_FACTOR) * 100.0
            );
            let rationale = format!(
                "{:?} oscillation of {:.1} deg/s at {}",
                osc.severity,
                osc.amplitude_deg_s,
                osc.freq_hz
                    .map_or("an unclear frequency".to_string(), |f| format!("{:.1} Hz", f))
            );
            Some(
                Action::new(ActionCategory::Oscillation, description, rationale).with_change(
                    &parameter,
                    current_p,
                    current_p.map(|p| round_gain(p * OSCILLATION_P_DECREASE_FACTOR)),
                ),
            )
        })
        .collect()
}

fn pid_actions(
    responses: &AxisResponses,
    frame: &FrameProfile,
    current: &TuneSettings,
) -> Vec<Action> {
    let mut actions = Vec::new();
    for (axis, response) in responses.iter().enumerate() {
        let suffix = AXIS_PARAM_SUFFIX[axis];
        let name = AXIS_NAMES[axis];
        let overshoot = response
            .avg_overshoot_pct
            .filter(|&o| o > frame.overshoot_tolerance_pct);

        if let Some(overshoot) = overshoot {
            let rationale = format!(
                "{:.1}% average overshoot, {:.0}% tolerated on a {}",
                overshoot, frame.overshoot_tolerance_pct, frame.name
            );
            let action = match current.d_gains[axis] {
                Some(d) => Action::new(
                    ActionCategory::Pid,
                    format!("Raise {} D to damp overshoot", name),
                    rationale,
                )
                .with_change(
                    &format!("mc_d_{}", suffix),
                    Some(d),
                    Some(round_gain(d * D_INCREASE_FACTOR)),
                ),
                None => {
                    let p = current.p_gains[axis];
                    Action::new(
                        ActionCategory::Pid,
                        format!("Lower {} P to reduce overshoot", name),
                        rationale,
                    )
                    .with_change(
                        &format!("mc_p_{}", suffix),
                        p,
                        p.map(|p| round_gain(p * P_DECREASE_FACTOR)),
                    )
                }
            };
            actions.push(action);
            continue;
        }

        let slow = response
            .tracking_delay_ms
            .filter(|&d| d > frame.target_delay_ms * SLOW_RESPONSE_FACTOR);
        if let Some(delay) = slow {
            let p = current.p_gains[axis];
            if p.is_some_and(|p| p >= frame.p_range.1) {
                continue;
            }
            let new_p = p.map(|p| round_gain((p * P_INCREASE_FACTOR).min(frame.p_range.1)));
            actions.push(
                Action::new(
                    ActionCategory::Pid,
                    format!("Raise {} P for a quicker response", name),
                    format!(
                        "gyro trails setpoint by {:.1} ms, {:.0} ms expected on a {}",
                        delay, frame.target_delay_ms, frame.name
                    ),
                )
                .with_change(&format!("mc_p_{}", suffix), p, new_p),
            );
        }
    }
    actions
}

/// Fuses every analyzer result into scores, a verdict and an ordered action list.
///
/// Gain increases are deferred while any filter change is pending or the noise score is
/// below 70. An unusable log yields `INSUFFICIENT_DATA` and no actions.
pub fn build_action_plan(inputs: &PlanInputs<'_>) -> ActionPlan {
    let mut scores = Scores {
        overall: None,
        noise: combined_noise_score(inputs.noise_profiles),
        pid: pid_score(inputs.responses, inputs.frame),
        motor: inputs.motors.map(motor_score),
        gyro_oscillation: hover_score(inputs.hover),
        nav: inputs.nav.and_then(|n| n.score),
    };
    scores.overall = scores.weighted_overall();

    let verdict = if inputs.quality.usable {
        Verdict::from_score(scores.overall)
    } else {
        Verdict::InsufficientData
    };
    if verdict == Verdict::InsufficientData {
        return ActionPlan {
            scores,
            verdict,
            actions: Vec::new(),
            low_confidence: true,
            analyzer_version: crate::crate_version().to_string(),
        };
    }

    let mut actions = oscillation_actions(inputs.hover, inputs.current);
    actions.extend(filter_actions(inputs.filter_plan, inputs.current));
    actions.extend(hardware_actions(inputs.fingerprint));
    if let Some(motors) = inputs.motors {
        actions.extend(motor_actions(motors));
    }
    if let Some(nav) = inputs.nav {
        actions.extend(nav_actions(nav));
    }
    actions.extend(pid_actions(inputs.responses, inputs.frame, inputs.current));

    let filter_pending = actions
        .iter()
        .any(|a| matches!(a.category, ActionCategory::LowPass | ActionCategory::Notch));
    let noisy = scores.noise.is_some_and(|n| n < NOISE_SCORE_OK);
    for action in actions.iter_mut() {
        let gain = matches!(action.category, ActionCategory::Pid);
        if gain && action.is_increase() && (filter_pending || noisy) {
            action.deferred = true;
        }
    }
    actions.sort_by_key(|a| (a.deferred, a.priority));

    let low_confidence = inputs.quality.grade != QualityGrade::Good
        || scores.noise.is_none()
        || scores.pid.is_none();

    log::info!(
        "Action plan: {:?}, overall {:?}, {} actions ({} deferred)",
        verdict,
        scores.overall,
        actions.len(),
        actions.iter().filter(|a| a.deferred).count()
    );

    ActionPlan {
        scores,
        verdict,
        actions,
        low_confidence,
        analyzer_version: crate::crate_version().to_string(),
    }
}
