// src/data_analysis/nav/mod.rs

//! Navigation health: compass, GPS, barometer, altitude estimator and the
//! position/altitude hold controllers.
//!
//! Every analyzer implements [`Analyzer`] and is run over the same store and
//! [`NavContext`]; an analyzer that lacks its inputs returns `None` and is skipped.

pub mod baro;
pub mod compass;
pub mod estimator;
pub mod gps;
pub mod hold;
pub mod phases;

use serde::Serialize;

use crate::axis_names::{
    BARO_ALT_CHANNEL, HEADING_CHANNEL, NAV_ALT_CHANNEL, NAV_POS_N_CHANNEL, NAV_STATE_CHANNEL,
};
use crate::config::NavConfig;
use crate::data_analysis::findings::Finding;
use crate::data_input::sample_store::SampleStore;

pub use baro::{BaroAnalyzer, BaroMetrics};
pub use compass::{CompassAnalyzer, CompassMetrics};
pub use estimator::{EstimatorAnalyzer, EstimatorMetrics};
pub use gps::{GpsAnalyzer, GpsMetrics};
pub use hold::{AltHoldAnalyzer, AltHoldMetrics, PosHoldAnalyzer, PosHoldMetrics};
pub use phases::{segment_nav_phases, NavPhase};

/// Shared inputs for one navigation analysis run
#[derive(Debug, Clone, Copy)]
pub struct NavContext<'a> {
    pub phases: &'a [NavPhase],
    pub config: &'a NavConfig,
}

impl<'a> NavContext<'a> {
    /// Phases whose state code is listed in `codes`.
    pub fn phases_in<'b>(&'b self, codes: &'b [i32]) -> impl Iterator<Item = &'a NavPhase> + 'b {
        self.phases
            .iter()
            .filter(move |p| codes.contains(&p.nav_state_code))
    }
}

/// Analyzer-specific measurements
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NavDetail {
    Compass(CompassMetrics),
    Gps(GpsMetrics),
    Baro(BaroMetrics),
    Estimator(EstimatorMetrics),
    AltHold(AltHoldMetrics),
    PosHold(PosHoldMetrics),
}

/// Output of one navigation analyzer
#[derive(Debug, Clone, Serialize)]
pub struct ScoredFindings {
    pub analyzer: &'static str,
    /// 0-100
    pub score: f64,
    pub findings: Vec<Finding>,
    pub detail: NavDetail,
}

pub trait Analyzer {
    fn name(&self) -> &'static str;

    /// `None` when the log lacks the inputs this analyzer needs.
    fn analyze(&self, store: &SampleStore, ctx: &NavContext<'_>) -> Option<ScoredFindings>;
}

/// Results of every navigation analyzer that had data
#[derive(Debug, Clone, Serialize)]
pub struct NavHealth {
    pub phases: Vec<NavPhase>,
    pub results: Vec<ScoredFindings>,
    /// Mean of the available analyzer scores
    pub score: Option<f64>,
}

macro_rules! detail_accessor {
    ($fn_name:ident, $variant:ident, $metrics:ty) => {
        pub fn $fn_name(&self) -> Option<&$metrics> {
            self.results.iter().find_map(|r| match &r.detail {
                NavDetail::$variant(m) => Some(m),
                _ => None,
            })
        }
    };
}

impl NavHealth {
    fn new(phases: Vec<NavPhase>, results: Vec<ScoredFindings>) -> Self {
        let score = (!results.is_empty())
            .then(|| results.iter().map(|r| r.score).sum::<f64>() / results.len() as f64);
        Self {
            phases,
            results,
            score,
        }
    }

    pub fn result(&self, analyzer: &str) -> Option<&ScoredFindings> {
        self.results.iter().find(|r| r.analyzer == analyzer)
    }

    pub fn score_of(&self, analyzer: &str) -> Option<f64> {
        self.result(analyzer).map(|r| r.score)
    }

    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.results.iter().flat_map(|r| r.findings.iter())
    }

    detail_accessor!(compass, Compass, CompassMetrics);
    detail_accessor!(gps, Gps, GpsMetrics);
    detail_accessor!(baro, Baro, BaroMetrics);
    detail_accessor!(estimator, Estimator, EstimatorMetrics);
    detail_accessor!(althold, AltHold, AltHoldMetrics);
    detail_accessor!(poshold, PosHold, PosHoldMetrics);
}

fn has_nav_inputs(store: &SampleStore) -> bool {
    !store.gps_frames().is_empty()
        || [
            HEADING_CHANNEL,
            BARO_ALT_CHANNEL,
            NAV_ALT_CHANNEL,
            NAV_POS_N_CHANNEL,
            NAV_STATE_CHANNEL,
        ]
        .iter()
        .any(|name| store.has_channel(name))
}

/// Runs every navigation analyzer over `store`.
///
/// `None` when the log carries no navigation data at all, or when no analyzer could
/// produce a result.
pub fn run_nav_analysis(store: &SampleStore, config: &NavConfig) -> Option<NavHealth> {
    if !has_nav_inputs(store) {
        return None;
    }

    let phases = store
        .channel(NAV_STATE_CHANNEL)
        .map(|states| {
            segment_nav_phases(
                &states.to_vec(),
                store.sample_rate(),
                config.min_phase_s,
            )
        })
        .unwrap_or_default();
    let ctx = NavContext {
        phases: &phases,
        config,
    };

    let analyzers: [&dyn Analyzer; 6] = [
        &CompassAnalyzer,
        &GpsAnalyzer,
        &BaroAnalyzer,
        &EstimatorAnalyzer,
        &AltHoldAnalyzer,
        &PosHoldAnalyzer,
    ];
    let results: Vec<ScoredFindings> = analyzers
        .iter()
        .filter_map(|analyzer| {
            let result = analyzer.analyze(store, &ctx);
            match &result {
                Some(r) => log::debug!("{}: score {:.1}", analyzer.name(), r.score),
                None => log::debug!("{}: skipped, inputs missing", analyzer.name()),
            }
            result
        })
        .collect();

    if results.is_empty() {
        return None;
    }
    let health = NavHealth::new(phases, results);
    log::info!(
        "Navigation health: {} analyzers, score {:?}",
        health.results.len(),
        health.score
    );
    Some(health)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::BTreeMap;

    use crate::data_input::sample_store::SampleStore;

    pub fn store(sample_rate: f64, channels: Vec<(&str, Vec<f64>)>) -> SampleStore {
        let map: BTreeMap<String, Vec<f64>> = channels
            .into_iter()
            .map(|(name, data)| (name.to_string(), data))
            .collect();
        SampleStore::new(sample_rate, map).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_analysis::spectral_analysis::test_signals::lcg_noise;
    use crate::data_input::sample_store::EventFrame;

    #[test]
    fn test_no_nav_data() {
        let store = test_support::store(500.0, vec![("gyro_roll", vec![0.0; 1000])]);
        assert!(run_nav_analysis(&store, &NavConfig::default()).is_none());
    }

    #[test]
    fn test_hold_analyzers_skip_without_hold_phase() {
        let n = 2000;
        let noise = lcg_noise(n, 3);
        let heading: Vec<f64> = (0..n).map(|i| 90.0 + 0.05 * noise[i]).collect();
        let baro: Vec<f64> = (0..n).map(|i| 10.0 + 0.02 * noise[(i + 7) % n]).collect();
        let frames: Vec<EventFrame> = (0..20)
            .map(|k| {
                EventFrame::new(k * 100)
                    .with("num_sat", 14.0)
                    .with("eph", 1.0)
                    .with("lat", 47.0)
                    .with("lon", 8.0)
            })
            .collect();
        let store = test_support::store(
            100.0,
            vec![
                ("heading", heading),
                ("baro_alt", baro),
                ("nav_state", vec![0.0; n]),
            ],
        )
        .with_gps_frames(frames);

        let health = run_nav_analysis(&store, &NavConfig::default()).unwrap();
        assert_eq!(health.phases.len(), 1);
        assert!(health.compass().is_some());
        assert!(health.gps().is_some());
        assert!(health.baro().is_some());
        assert!(health.althold().is_none());
        assert!(health.poshold().is_none());
        assert!(health.score_of("althold").is_none());
        assert!(health.score.is_some());
    }
}
