// tests/nav_analysis_test.rs

use std::collections::BTreeMap;

use blackbox_tune_analyzer::config::NavConfig;
use blackbox_tune_analyzer::data_analysis::nav::run_nav_analysis;
use blackbox_tune_analyzer::data_input::sample_store::EventFrame;
use blackbox_tune_analyzer::SampleStore;

const SAMPLE_RATE: f64 = 100.0;

/// Slowly turning heading, steady baro and estimator altitude, a GPS fix every second.
fn nav_store(nav_state: Vec<f64>) -> SampleStore {
    let n = nav_state.len();
    let altitude: Vec<f64> = (0..n)
        .map(|i| 20.0 + 0.2 * (2.0 * std::f64::consts::PI * 0.5 * i as f64 / SAMPLE_RATE).sin())
        .collect();

    let mut channels = BTreeMap::new();
    channels.insert(
        "heading".to_string(),
        (0..n).map(|i| (i as f64 * 0.1) % 360.0).collect(),
    );
    channels.insert("baro_alt".to_string(), altitude.clone());
    channels.insert("nav_alt".to_string(), altitude);
    channels.insert("nav_tgt_alt".to_string(), vec![20.0; n]);
    channels.insert("nav_state".to_string(), nav_state);

    let gps = (0..n)
        .step_by(SAMPLE_RATE as usize)
        .map(|i| {
            EventFrame::new(i)
                .with("num_sat", 14.0)
                .with("eph", 1.0)
                .with("lat", 47.0 + i as f64 * 1e-8)
                .with("lon", 8.0)
        })
        .collect();
    SampleStore::new(SAMPLE_RATE, channels)
        .unwrap()
        .with_gps_frames(gps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_flight_has_sensor_results_only() {
        let store = nav_store(vec![0.0; 3000]);
        let health = run_nav_analysis(&store, &NavConfig::default()).unwrap();

        assert!(health.compass().is_some());
        assert!(health.gps().is_some());
        assert!(health.baro().is_some());
        assert!(health.althold().is_none());
        assert!(health.poshold().is_none());

        let gps = health.gps().unwrap();
        assert_eq!(gps.position_jumps, 0);
        assert_eq!(gps.avg_sats, Some(14.0));

        let score = health.score.unwrap();
        assert!((0.0..=100.0).contains(&score));
    }

    #[test]
    fn test_althold_phase_is_scored() {
        let mut nav_state = vec![0.0; 500];
        nav_state.extend(vec![3.0; 2000]);
        nav_state.extend(vec![0.0; 500]);
        let store = nav_store(nav_state);
        let health = run_nav_analysis(&store, &NavConfig::default()).unwrap();

        assert_eq!(health.phases.len(), 3);
        assert_eq!(health.phases[1].nav_state_code, 3);
        let althold = health.althold().unwrap();
        assert_eq!(althold.phase_count, 1);
        assert!((althold.hold_duration_s - 20.0).abs() < 1e-9);
        assert!((althold.oscillation_amplitude_m - 0.2).abs() < 0.01);
        assert!(health.score_of("althold").is_some());
        assert!(health.poshold().is_none());
    }

    #[test]
    fn test_no_nav_channels() {
        let mut channels = BTreeMap::new();
        channels.insert("gyro_roll".to_string(), vec![0.0; 1000]);
        let store = SampleStore::new(SAMPLE_RATE, channels).unwrap();
        assert!(run_nav_analysis(&store, &NavConfig::default()).is_none());
    }
}
