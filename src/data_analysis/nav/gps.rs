// src/data_analysis/nav/gps.rs

use serde::Serialize;

use crate::constants::{
    EARTH_RADIUS_M, GPS_EPH_BAD_M, GPS_EPH_GOOD_M, GPS_JUMP_PENALTY, GPS_JUMP_PENALTY_MAX,
    GPS_MAX_PLAUSIBLE_SPEED_M_S, GPS_MIN_SATS_WARN, GPS_SATS_BAD, GPS_SATS_GOOD,
};
use crate::data_analysis::findings::{linear_score, Finding};
use crate::data_analysis::nav::{Analyzer, NavContext, NavDetail, ScoredFindings};
use crate::data_analysis::signal_stats;
use crate::data_input::sample_store::{EventFrame, SampleStore};

pub const FIELD_NUM_SAT: &str = "num_sat";
pub const FIELD_EPH: &str = "eph";
pub const FIELD_LAT: &str = "lat";
pub const FIELD_LON: &str = "lon";

#[derive(Debug, Clone, Serialize)]
pub struct GpsMetrics {
    pub frame_count: usize,
    pub avg_sats: Option<f64>,
    pub min_sats: Option<f64>,
    /// Mean horizontal position error estimate, metres
    pub avg_eph_m: Option<f64>,
    /// Consecutive fixes implying more than 50 m/s
    pub position_jumps: usize,
}

pub struct GpsAnalyzer;

/// Great-circle distance in metres between two lat/lon points in degrees.
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();
    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().min(1.0).asin()
}

/// Counts consecutive position fixes whose implied speed exceeds the plausible maximum.
///
/// Time between fixes comes from their sample index.
pub fn count_position_jumps(frames: &[EventFrame], sample_rate: f64) -> usize {
    let fixes: Vec<(usize, f64, f64)> = frames
        .iter()
        .filter_map(|f| Some((f.index, f.get(FIELD_LAT)?, f.get(FIELD_LON)?)))
        .collect();
    fixes
        .windows(2)
        .filter(|pair| {
            let (i0, lat0, lon0) = pair[0];
            let (i1, lat1, lon1) = pair[1];
            let dt = i1.saturating_sub(i0) as f64 / sample_rate;
            if dt <= 0.0 {
                return false;
            }
            haversine_m(lat0, lon0, lat1, lon1) / dt > GPS_MAX_PLAUSIBLE_SPEED_M_S
        })
        .count()
}

fn field_values(frames: &[EventFrame], field: &str) -> Vec<f64> {
    frames.iter().filter_map(|f| f.get(field)).collect()
}

impl Analyzer for GpsAnalyzer {
    fn name(&self) -> &'static str {
        "gps"
    }

    fn analyze(&self, store: &SampleStore, _ctx: &NavContext<'_>) -> Option<ScoredFindings> {
        let frames = store.gps_frames();
        if frames.is_empty() {
            return None;
        }

        let sats = field_values(frames, FIELD_NUM_SAT);
        let eph = field_values(frames, FIELD_EPH);
        let avg_sats = signal_stats::mean(&sats);
        let min_sats = sats.iter().copied().reduce(f64::min);
        let avg_eph_m = signal_stats::mean(&eph);
        let position_jumps = count_position_jumps(frames, store.sample_rate());

        let mut findings = Vec::new();
        let mut components = Vec::new();
        if let Some(avg) = avg_sats {
            components.push(100.0 - linear_score(avg, GPS_SATS_BAD, GPS_SATS_GOOD));
        }
        if let Some(avg) = avg_eph_m {
            components.push(linear_score(avg, GPS_EPH_GOOD_M, GPS_EPH_BAD_M));
        }
        if avg_sats.is_none() && avg_eph_m.is_none() {
            findings.push(Finding::info(
                "GPS frames carry no satellite count or EPH; fix quality not assessed",
            ));
        }
        if let Some(min) = min_sats.filter(|&m| m < GPS_MIN_SATS_WARN) {
            findings.push(Finding::warning(format!(
                "GPS dropped to {:.0} satellites; position hold and RTH may be unreliable",
                min
            )));
        }
        if position_jumps > 0 {
            findings.push(Finding::warning(format!(
                "{} GPS position jumps above {:.0} m/s; check for multipath or GPS interference",
                position_jumps, GPS_MAX_PLAUSIBLE_SPEED_M_S
            )));
        }

        let base = signal_stats::mean(&components).unwrap_or(100.0);
        let penalty = (position_jumps as f64 * GPS_JUMP_PENALTY).min(GPS_JUMP_PENALTY_MAX);

        Some(ScoredFindings {
            analyzer: self.name(),
            score: (base - penalty).clamp(0.0, 100.0),
            findings,
            detail: NavDetail::Gps(GpsMetrics {
                frame_count: frames.len(),
                avg_sats,
                min_sats,
                avg_eph_m,
                position_jumps,
            }),
        })
    }
}
