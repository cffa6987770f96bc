// tests/end_to_end_test.rs

use blackbox_tune_analyzer::data_analysis::action_plan::Verdict;
use blackbox_tune_analyzer::data_analysis::log_quality::QualityGrade;
use blackbox_tune_analyzer::data_analysis::noise_fingerprint::NoiseSource;
use blackbox_tune_analyzer::data_input::log_parser::parse_sample_csv;
use blackbox_tune_analyzer::{analyze_log, AnalysisConfig};

const SAMPLE_RATE: f64 = 500.0;

/// Uniform noise in [-1, 1) from a fixed-seed LCG
fn noise(n: usize, seed: u64) -> Vec<f64> {
    let mut state = seed.wrapping_add(0x9E37_79B9_7F4A_7C15);
    (0..n)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            ((state >> 11) as f64 / (1u64 << 53) as f64) * 2.0 - 1.0
        })
        .collect()
}

fn sine(i: usize, freq_hz: f64, amplitude: f64) -> f64 {
    amplitude * (2.0 * std::f64::consts::PI * freq_hz * i as f64 / SAMPLE_RATE).sin()
}

/// Normalized CSV of a steady hover with two frame resonances on every gyro axis.
fn noisy_hover_csv(n: usize) -> String {
    let gyro: Vec<Vec<f64>> = (0..3)
        .map(|axis| {
            noise(n, axis as u64 + 1)
                .into_iter()
                .enumerate()
                .map(|(i, e)| sine(i, 85.0, 10.0) + sine(i, 160.0, 8.0) + 0.5 * e)
                .collect()
        })
        .collect();
    let motor_noise = noise(n, 42);

    let mut csv = String::from("Firmware revision,test\n");
    csv.push_str("time (us),gyro_roll,gyro_pitch,gyro_yaw,motor0,motor1,motor2,motor3,throttle\n");
    for i in 0..n {
        let motor = 1400.0 + 5.0 * motor_noise[i];
        csv.push_str(&format!(
            "{},{:.4},{:.4},{:.4},{:.1},{:.1},{:.1},{:.1},1450\n",
            i * 2000,
            gyro[0][i],
            gyro[1][i],
            gyro[2][i],
            motor,
            motor,
            motor,
            motor
        ));
    }
    csv
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noisy_hover_end_to_end() {
        let _ = env_logger::builder().is_test(true).try_init();

        let store = parse_sample_csv(noisy_hover_csv(4000).as_bytes(), None).unwrap();
        assert!((store.sample_rate() - SAMPLE_RATE).abs() < 1.0);

        let report = analyze_log(&store, &AnalysisConfig::default());
        assert!(report.quality.usable);
        assert_ne!(report.quality.grade, QualityGrade::Unusable);
        assert!(report.noise_profiles.iter().all(|p| p.is_some()));

        assert_ne!(report.fingerprint.dominant_source, NoiseSource::None);
        for axis in ["Roll", "Pitch", "Yaw"] {
            assert!(
                report.fingerprint.peaks.iter().any(|p| p.axis == axis),
                "no fingerprint peak on {}",
                axis
            );
        }
        assert!(report.fingerprint.peaks.iter().all(|p| !p.remedy.is_empty()));

        let scores = &report.plan.scores;
        for score in [scores.overall, scores.noise, scores.pid, scores.motor]
            .into_iter()
            .flatten()
        {
            assert!((0.0..=100.0).contains(&score), "score {} out of range", score);
        }
        assert_ne!(report.plan.verdict, Verdict::InsufficientData);
        for action in &report.plan.actions {
            println!("{:?}", action.cli_command());
        }

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"plan\""));
        assert!(json.contains("\"fingerprint\""));
    }

    #[test]
    fn test_short_log_yields_insufficient_data_plan() {
        let store = parse_sample_csv(noisy_hover_csv(300).as_bytes(), None).unwrap();
        let report = analyze_log(&store, &AnalysisConfig::default());
        assert_eq!(report.quality.grade, QualityGrade::Unusable);
        assert_eq!(report.plan.verdict, Verdict::InsufficientData);
        assert!(report.plan.actions.is_empty());
        assert!(report.fingerprint.peaks.is_empty());
        assert!(serde_json::to_value(&report).is_ok());
    }
}
