// src/constants.rs

// --- Spectral noise analysis ---
pub const MIN_SPECTRAL_SAMPLES: usize = 256; // One minimum Welch segment of finite data
pub const WELCH_MIN_SEGMENT: usize = 256;
pub const WELCH_SEGMENT_DIVISOR: usize = 8; // Aim for at least 8 averages
pub const WELCH_OVERLAP: f64 = 0.5;
pub const MIN_SIGNAL_VARIANCE: f64 = 1e-12;
pub const PSD_DB_FLOOR: f64 = 1e-20; // Added before log10 to keep empty bins finite

// Peak extraction.
pub const SPECTRUM_NOISE_FLOOR_HZ: f64 = 10.0; // Ignore peaks below this (flight dynamics, DC leakage)
pub const PEAK_DETECTION_WINDOW_RADIUS: usize = 3;
pub const NOISE_FLOOR_HALF_WIDTH_HZ: f64 = 25.0; // Running-median floor window half width
pub const PEAK_MIN_PROMINENCE_DB: f64 = 8.0;
pub const STRONG_PEAK_PROMINENCE_DB: f64 = 15.0;
pub const MIN_PEAK_SEPARATION_HZ: f64 = 10.0;
pub const MAX_PEAKS_PER_AXIS: usize = 5;

// Noise start scan.
pub const NOISE_START_MIN_HZ: f64 = 20.0;
pub const NOISE_START_MARGIN_DB: f64 = 6.0;
pub const NOISE_START_MIN_BINS: usize = 3;

// Band RMS edges in Hz.
pub const NOISE_BAND_LOW_HZ: (f64, f64) = (10.0, 50.0);
pub const NOISE_BAND_MID_HZ: (f64, f64) = (50.0, 150.0);
pub const NOISE_BAND_HIGH_START_HZ: f64 = 150.0;

// Noise score.
pub const NOISE_RMS_GOOD_DEG_S: f64 = 2.0;
pub const NOISE_RMS_BAD_DEG_S: f64 = 20.0;
pub const NOISE_PEAK_PENALTY: f64 = 5.0;
pub const NOISE_PEAK_PENALTY_MAX: f64 = 20.0;
pub const NOISE_SCORE_OK: f64 = 70.0; // Below this, gain increases wait for filtering

// --- Filter response ---
pub const DEFAULT_BIQUAD_Q: f64 = std::f64::consts::FRAC_1_SQRT_2;
pub const PHASE_LAG_REFERENCE_HZ: f64 = 50.0; // Signal frequency used for lag rationales

// --- Noise fingerprinting ---
pub const STRUCTURAL_FREQ_TOLERANCE_HZ: f64 = 5.0;
pub const STRUCTURAL_POWER_SPREAD_DB: f64 = 10.0;
pub const MOTOR_HARMONIC_TOLERANCE: f64 = 0.08; // Fractional tolerance around k x rotation
pub const MOTOR_HARMONICS_CHECKED: usize = 3;
pub const NOMINAL_CELL_VOLTAGE: f64 = 3.7;
pub const PROP_BAND_MARGIN: f64 = 0.1;
pub const DEFAULT_HOVER_THROTTLE_PCT: f64 = 40.0;

// --- Filter recommendation ---
pub const GYRO_CUTOFF_MARGIN: f64 = 0.9;
pub const DTERM_CUTOFF_MARGIN: f64 = 0.8;
pub const NO_RISE_NYQUIST_FRACTION: f64 = 0.95;
pub const CUTOFF_ROUNDING_HZ: f64 = 5.0;
pub const NOTCH_MIN_PROMINENCE_DB: f64 = 12.0;
pub const NOTCH_MIN_BANDWIDTH_HZ: f64 = 10.0;
pub const NOTCH_BANDWIDTH_FRACTION: f64 = 0.15;
pub const MAX_NOTCHES: usize = 2;
pub const BROAD_PEAK_CUTOFF_FRACTION: f64 = 0.8;
pub const DYN_NOTCH_MIN_FRACTION: f64 = 0.8;
pub const MIN_CUTOFF_CHANGE_HZ: f64 = 5.0; // Smaller differences are not worth an action

// --- Tracking response ---
pub const MOVEMENT_THRESHOLD_DEG_S: f64 = 20.0;
pub const MIN_SETPOINT_STD_DEG_S: f64 = 5.0;
pub const MAX_TRACKING_LAG_MS: f64 = 100.0;
pub const MIN_TRACKING_CORRELATION: f64 = 0.3;
pub const STEP_DETECT_WINDOW_MS: f64 = 10.0;
pub const STEP_MIN_DELTA_DEG_S: f64 = 50.0;
pub const STEP_HOLD_MS: f64 = 150.0;
pub const STEP_HOLD_TOLERANCE: f64 = 0.1; // Setpoint wobble allowed while held, fraction of step
pub const STEP_RESPONSE_WINDOW_MS: f64 = 200.0;
pub const DELAY_PENALTY_PER_MS: f64 = 2.0;
pub const OVERSHOOT_PENALTY_PER_PCT: f64 = 3.0;
pub const SLOW_RESPONSE_FACTOR: f64 = 1.3;
pub const P_INCREASE_FACTOR: f64 = 1.10;
pub const P_DECREASE_FACTOR: f64 = 0.90;
pub const D_INCREASE_FACTOR: f64 = 1.15;
pub const OSCILLATION_P_DECREASE_FACTOR: f64 = 0.85;

// --- Motors ---
pub const MOTOR_SATURATION_DUTY_PCT: f64 = 98.0;
pub const MOTOR_IMBALANCE_WARN_PCT: f64 = 10.0;
pub const MOTOR_SATURATION_WARN_PCT: f64 = 5.0;
pub const MOTOR_SPREAD_FREE_PCT: f64 = 5.0;
pub const MOTOR_SPREAD_PENALTY_PER_PCT: f64 = 3.0;
pub const MOTOR_SATURATION_PENALTY_PER_PCT: f64 = 2.0;

// --- Navigation ---
pub const NAV_MIN_PHASE_S: f64 = 2.0;
pub const COMPASS_SMOOTHING_S: f64 = 1.0;
pub const COMPASS_JITTER_GOOD_DEG_S: f64 = 2.0;
pub const COMPASS_JITTER_WARN_DEG_S: f64 = 5.0;
pub const COMPASS_JITTER_BAD_DEG_S: f64 = 15.0;
pub const GPS_MAX_PLAUSIBLE_SPEED_M_S: f64 = 50.0;
pub const GPS_SATS_GOOD: f64 = 12.0;
pub const GPS_SATS_BAD: f64 = 6.0;
pub const GPS_MIN_SATS_WARN: f64 = 6.0;
pub const GPS_EPH_GOOD_M: f64 = 1.5;
pub const GPS_EPH_BAD_M: f64 = 5.0;
pub const GPS_JUMP_PENALTY: f64 = 10.0;
pub const GPS_JUMP_PENALTY_MAX: f64 = 30.0;
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;
pub const BARO_HIGHPASS_S: f64 = 1.0;
pub const BARO_SPIKE_SIGMA: f64 = 4.0;
pub const BARO_NOISE_GOOD_M: f64 = 0.1;
pub const BARO_NOISE_BAD_M: f64 = 1.0;
pub const BARO_SPIKE_PENALTY: f64 = 5.0;
pub const BARO_SPIKE_PENALTY_MAX: f64 = 30.0;
pub const ESTIMATOR_CORRELATION_GOOD: f64 = 0.9;
pub const ESTIMATOR_CORRELATION_BAD: f64 = 0.5;
pub const ESTIMATOR_RESIDUAL_GROWTH_RATIO: f64 = 2.0;
pub const ESTIMATOR_RESIDUAL_GROWTH_MIN_M: f64 = 0.5;
pub const ESTIMATOR_DIVERGENCE_PENALTY: f64 = 25.0;
pub const ALTHOLD_AMPLITUDE_GOOD_M: f64 = 0.3;
pub const ALTHOLD_AMPLITUDE_BAD_M: f64 = 2.0;
pub const POSHOLD_CEP_GOOD_M: f64 = 1.0;
pub const POSHOLD_CEP_BAD_M: f64 = 5.0;
pub const TOILET_BOWL_MIN_REVOLUTIONS: f64 = 1.5;
pub const TOILET_BOWL_MIN_RADIUS_M: f64 = 1.0;
pub const TOILET_BOWL_PENALTY: f64 = 30.0;
pub const DEFAULT_ALTHOLD_STATES: [i32; 1] = [3];
pub const DEFAULT_POSHOLD_STATES: [i32; 1] = [10];

// --- Hover oscillation ---
pub const HOVER_WINDOW_S: f64 = 1.0;
pub const HOVER_THROTTLE_STD_MAX_PCT: f64 = 3.0;
pub const HOVER_THROTTLE_MIN_PCT: f64 = 15.0;
pub const HOVER_OSC_BAND_HZ: (f64, f64) = (2.0, 25.0);
pub const HOVER_PEAK_DOMINANCE_DB: f64 = 6.0;
pub const HOVER_PEAK_HALF_WIDTH_BINS: usize = 2;
pub const HOVER_OSC_MODERATE_DEG_S: f64 = 2.0;
pub const HOVER_OSC_SEVERE_DEG_S: f64 = 6.0;
pub const HOVER_SCORE_MODERATE: f64 = 60.0;
pub const HOVER_SCORE_SEVERE: f64 = 20.0;

// --- Log quality gate ---
pub const MIN_USABLE_SAMPLES: usize = 500;
pub const MIN_USABLE_DURATION_S: f64 = 2.0;
pub const CORRUPT_RATIO_FAIL: f64 = 0.10;
pub const CORRUPT_RATIO_WARN: f64 = 0.02;
pub const LOW_SAMPLE_RATE_HZ: f64 = 250.0;
pub const NO_STICK_INPUT_DEG_S: f64 = 5.0;
pub const GROUND_THROTTLE_PCT: f64 = 10.0;

// --- Action plan ---
pub const WEIGHT_NOISE: f64 = 0.30;
pub const WEIGHT_PID: f64 = 0.30;
pub const WEIGHT_MOTOR: f64 = 0.15;
pub const WEIGHT_OSCILLATION: f64 = 0.15;
pub const WEIGHT_NAV: f64 = 0.10;
pub const VERDICT_GOOD_MIN: f64 = 75.0;
pub const VERDICT_NEEDS_WORK_MIN: f64 = 50.0;

// src/constants.rs
