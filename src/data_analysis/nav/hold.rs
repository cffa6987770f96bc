// src/data_analysis/nav/hold.rs

use serde::Serialize;

use crate::axis_names::{
    BARO_ALT_CHANNEL, NAV_ALT_CHANNEL, NAV_POS_E_CHANNEL, NAV_POS_N_CHANNEL, NAV_TGT_ALT_CHANNEL,
    NAV_TGT_E_CHANNEL, NAV_TGT_N_CHANNEL,
};
use crate::constants::{
    ALTHOLD_AMPLITUDE_BAD_M, ALTHOLD_AMPLITUDE_GOOD_M, POSHOLD_CEP_BAD_M, POSHOLD_CEP_GOOD_M,
    TOILET_BOWL_MIN_RADIUS_M, TOILET_BOWL_MIN_REVOLUTIONS, TOILET_BOWL_PENALTY,
};
use crate::data_analysis::findings::{linear_score, Finding};
use crate::data_analysis::nav::{Analyzer, NavContext, NavDetail, NavPhase, ScoredFindings};
use crate::data_analysis::signal_stats;
use crate::data_analysis::spectral_analysis::unwrap_phase;
use crate::data_input::sample_store::SampleStore;

#[derive(Debug, Clone, Serialize)]
pub struct AltHoldMetrics {
    pub phase_count: usize,
    pub hold_duration_s: f64,
    /// √2 · RMS deviation from the target altitude, metres
    pub oscillation_amplitude_m: f64,
    pub max_deviation_m: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PosHoldMetrics {
    pub phase_count: usize,
    pub hold_duration_s: f64,
    /// Median radial error, metres
    pub cep_m: f64,
    pub max_radius_m: f64,
    /// Largest number of revolutions of the error vector within one phase
    pub max_revolutions: f64,
    pub toilet_bowl: bool,
}

pub struct AltHoldAnalyzer;

pub struct PosHoldAnalyzer;

/// Samples of `data` within `phase`, clipped to the channel length.
fn phase_slice(data: &ndarray::Array1<f64>, phase: &NavPhase) -> Vec<f64> {
    let end = phase.end_index.min(data.len());
    let start = phase.start_index.min(end);
    data.iter().skip(start).take(end - start).copied().collect()
}

/// Deviation of `actual` from `target`, sample by sample; the phase mean stands in
/// for a missing target.
fn deviations(actual: &[f64], target: Option<&[f64]>) -> Vec<f64> {
    match target {
        Some(target) => actual
            .iter()
            .zip(target)
            .filter(|(a, t)| a.is_finite() && t.is_finite())
            .map(|(a, t)| a - t)
            .collect(),
        None => {
            let finite = signal_stats::finite_values(actual);
            match signal_stats::mean(&finite) {
                Some(m) => finite.iter().map(|a| a - m).collect(),
                None => Vec::new(),
            }
        }
    }
}

/// North/east position error within one phase. A sample is kept only when every
/// coordinate it needs is finite, so the two axes stay aligned; the phase centroid
/// stands in for a missing target.
fn horizontal_errors(
    north: &[f64],
    east: &[f64],
    target: Option<(&[f64], &[f64])>,
) -> (Vec<f64>, Vec<f64>) {
    let pairs: Vec<(f64, f64)> = match target {
        Some((tgt_n, tgt_e)) => north
            .iter()
            .zip(east)
            .zip(tgt_n.iter().zip(tgt_e))
            .filter(|((n, e), (tn, te))| {
                n.is_finite() && e.is_finite() && tn.is_finite() && te.is_finite()
            })
            .map(|((n, e), (tn, te))| (n - tn, e - te))
            .collect(),
        None => {
            let finite: Vec<(f64, f64)> = north
                .iter()
                .zip(east)
                .filter(|(n, e)| n.is_finite() && e.is_finite())
                .map(|(n, e)| (*n, *e))
                .collect();
            if finite.is_empty() {
                return (Vec::new(), Vec::new());
            }
            let count = finite.len() as f64;
            let mean_n = finite.iter().map(|p| p.0).sum::<f64>() / count;
            let mean_e = finite.iter().map(|p| p.1).sum::<f64>() / count;
            finite.iter().map(|(n, e)| (n - mean_n, e - mean_e)).collect()
        }
    };
    pairs.into_iter().unzip()
}

/// Revolutions of the error vector around the target within one phase.
pub fn error_vector_revolutions(north: &[f64], east: &[f64]) -> f64 {
    let angles: Vec<f64> = north
        .iter()
        .zip(east)
        .map(|(n, e)| e.atan2(*n).to_degrees())
        .collect();
    let unwrapped = unwrap_phase(&angles);
    match (unwrapped.first(), unwrapped.last()) {
        (Some(first), Some(last)) => (last - first).abs() / 360.0,
        _ => 0.0,
    }
}

impl Analyzer for AltHoldAnalyzer {
    fn name(&self) -> &'static str {
        "althold"
    }

    fn analyze(&self, store: &SampleStore, ctx: &NavContext<'_>) -> Option<ScoredFindings> {
        let phases: Vec<&NavPhase> = ctx.phases_in(&ctx.config.althold_states).collect();
        if phases.is_empty() {
            return None;
        }
        let altitude = store
            .channel(NAV_ALT_CHANNEL)
            .or_else(|| store.channel(BARO_ALT_CHANNEL))?;
        let target = store.channel(NAV_TGT_ALT_CHANNEL);

        let deviation: Vec<f64> = phases
            .iter()
            .flat_map(|phase| {
                let actual = phase_slice(altitude, phase);
                let tgt = target.map(|t| phase_slice(t, phase));
                deviations(&actual, tgt.as_deref())
            })
            .collect();
        let oscillation_amplitude_m = std::f64::consts::SQRT_2 * signal_stats::rms(&deviation)?;
        let max_deviation_m = deviation.iter().map(|d| d.abs()).fold(0.0, f64::max);
        let hold_duration_s: f64 = phases
            .iter()
            .map(|p| p.duration_s(store.sample_rate()))
            .sum();

        let mut findings = Vec::new();
        if oscillation_amplitude_m > ALTHOLD_AMPLITUDE_BAD_M {
            findings.push(Finding::critical(format!(
                "Altitude hold oscillates ±{:.1} m; lower the altitude P/I gains and check \
                 hover throttle",
                oscillation_amplitude_m
            )));
        } else if oscillation_amplitude_m > ALTHOLD_AMPLITUDE_GOOD_M * 2.0 {
            findings.push(Finding::warning(format!(
                "Altitude hold wanders ±{:.1} m",
                oscillation_amplitude_m
            )));
        }

        Some(ScoredFindings {
            analyzer: self.name(),
            score: linear_score(
                oscillation_amplitude_m,
                ALTHOLD_AMPLITUDE_GOOD_M,
                ALTHOLD_AMPLITUDE_BAD_M,
            ),
            findings,
            detail: NavDetail::AltHold(AltHoldMetrics {
                phase_count: phases.len(),
                hold_duration_s,
                oscillation_amplitude_m,
                max_deviation_m,
            }),
        })
    }
}

impl Analyzer for PosHoldAnalyzer {
    fn name(&self) -> &'static str {
        "poshold"
    }

    fn analyze(&self, store: &SampleStore, ctx: &NavContext<'_>) -> Option<ScoredFindings> {
        let phases: Vec<&NavPhase> = ctx.phases_in(&ctx.config.poshold_states).collect();
        if phases.is_empty() {
            return None;
        }
        let pos_n = store.channel(NAV_POS_N_CHANNEL)?;
        let pos_e = store.channel(NAV_POS_E_CHANNEL)?;
        let tgt_n = store.channel(NAV_TGT_N_CHANNEL);
        let tgt_e = store.channel(NAV_TGT_E_CHANNEL);

        let mut radii = Vec::new();
        let mut max_revolutions: f64 = 0.0;
        let mut toilet_bowl = false;
        for phase in &phases {
            let north = phase_slice(pos_n, phase);
            let east = phase_slice(pos_e, phase);
            let target = match (tgt_n, tgt_e) {
                (Some(tn), Some(te)) => {
                    Some((phase_slice(tn, phase), phase_slice(te, phase)))
                }
                _ => None,
            };
            let (err_n, err_e) = horizontal_errors(
                &north,
                &east,
                target.as_ref().map(|(tn, te)| (tn.as_slice(), te.as_slice())),
            );
            if err_n.is_empty() {
                continue;
            }
            let phase_radii: Vec<f64> = err_n
                .iter()
                .zip(&err_e)
                .map(|(n, e)| n.hypot(*e))
                .collect();
            let revolutions = error_vector_revolutions(&err_n, &err_e);
            let mean_radius = signal_stats::mean(&phase_radii).unwrap_or(0.0);
            if revolutions >= TOILET_BOWL_MIN_REVOLUTIONS && mean_radius >= TOILET_BOWL_MIN_RADIUS_M
            {
                toilet_bowl = true;
            }
            max_revolutions = max_revolutions.max(revolutions);
            radii.extend(phase_radii);
        }

        let cep_m = signal_stats::median(&radii)?;
        let max_radius_m = radii.iter().copied().fold(0.0, f64::max);
        let hold_duration_s: f64 = phases
            .iter()
            .map(|p| p.duration_s(store.sample_rate()))
            .sum();

        let mut findings = Vec::new();
        if toilet_bowl {
            findings.push(Finding::critical(
                "Toilet-bowling in position hold; recalibrate the compass and check its \
                 alignment and interference",
            ));
        }
        if cep_m > POSHOLD_CEP_BAD_M {
            findings.push(Finding::critical(format!(
                "Position hold CEP {:.1} m; check GPS fix quality and position gains",
                cep_m
            )));
        } else if cep_m > (POSHOLD_CEP_GOOD_M + POSHOLD_CEP_BAD_M) / 2.0 {
            findings.push(Finding::warning(format!("Position hold CEP {:.1} m", cep_m)));
        }

        let mut score = linear_score(cep_m, POSHOLD_CEP_GOOD_M, POSHOLD_CEP_BAD_M);
        if toilet_bowl {
            score -= TOILET_BOWL_PENALTY;
        }

        Some(ScoredFindings {
            analyzer: self.name(),
            score: score.clamp(0.0, 100.0),
            findings,
            detail: NavDetail::PosHold(PosHoldMetrics {
                phase_count: phases.len(),
                hold_duration_s,
                cep_m,
                max_radius_m,
                max_revolutions,
                toilet_bowl,
            }),
        })
    }
}
