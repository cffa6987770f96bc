// src/data_analysis/frame_profile.rs

use serde::Serialize;

use crate::types::CutoffRange;

/// Expected tuning envelope for one nominal prop-diameter bucket.
///
/// Larger props carry more rotational inertia and make noise at lower frequencies, so
/// every cutoff range sits strictly below the one of the next smaller bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameProfile {
    pub inches: u32,
    pub name: &'static str,
    /// Safe gyro low-pass cutoff range in Hz.
    pub gyro_lpf_range: CutoffRange,
    /// Safe D-term low-pass cutoff range in Hz.
    pub dterm_lpf_range: CutoffRange,
    /// Typical P gain range (roll/pitch).
    pub p_range: (f64, f64),
    /// Typical D gain range (roll/pitch).
    pub d_range: (f64, f64),
    /// Step overshoot considered acceptable, percent.
    pub overshoot_tolerance_pct: f64,
    /// Setpoint-to-gyro tracking delay a good tune reaches, ms.
    pub target_delay_ms: f64,
    /// Lowest sensible dynamic-notch minimum frequency, Hz.
    pub dyn_notch_floor_hz: f64,
}

/// Supported buckets, smallest first.
pub const FRAME_PROFILES: [FrameProfile; 6] = [
    FrameProfile {
        inches: 3,
        name: "3-inch cinewhoop / micro",
        gyro_lpf_range: (100.0, 200.0),
        dterm_lpf_range: (100.0, 170.0),
        p_range: (35.0, 60.0),
        d_range: (20.0, 35.0),
        overshoot_tolerance_pct: 15.0,
        target_delay_ms: 12.0,
        dyn_notch_floor_hz: 100.0,
    },
    FrameProfile {
        inches: 5,
        name: "5-inch racer / freestyle",
        gyro_lpf_range: (90.0, 150.0),
        dterm_lpf_range: (90.0, 150.0),
        p_range: (35.0, 55.0),
        d_range: (20.0, 35.0),
        overshoot_tolerance_pct: 15.0,
        target_delay_ms: 15.0,
        dyn_notch_floor_hz: 80.0,
    },
    FrameProfile {
        inches: 7,
        name: "7-inch long-range",
        gyro_lpf_range: (70.0, 110.0),
        dterm_lpf_range: (70.0, 100.0),
        p_range: (32.0, 52.0),
        d_range: (18.0, 32.0),
        overshoot_tolerance_pct: 12.0,
        target_delay_ms: 20.0,
        dyn_notch_floor_hz: 60.0,
    },
    FrameProfile {
        inches: 10,
        name: "10-inch long-range / cruiser",
        gyro_lpf_range: (45.0, 80.0),
        dterm_lpf_range: (45.0, 75.0),
        p_range: (30.0, 48.0),
        d_range: (20.0, 36.0),
        overshoot_tolerance_pct: 10.0,
        target_delay_ms: 28.0,
        dyn_notch_floor_hz: 40.0,
    },
    FrameProfile {
        inches: 12,
        name: "12-inch heavy lifter",
        gyro_lpf_range: (35.0, 65.0),
        dterm_lpf_range: (35.0, 60.0),
        p_range: (25.0, 40.0),
        d_range: (18.0, 30.0),
        overshoot_tolerance_pct: 8.0,
        target_delay_ms: 34.0,
        dyn_notch_floor_hz: 30.0,
    },
    FrameProfile {
        inches: 15,
        name: "15-inch heavy lift / cine lifter",
        gyro_lpf_range: (25.0, 50.0),
        dterm_lpf_range: (25.0, 45.0),
        p_range: (20.0, 35.0),
        d_range: (15.0, 28.0),
        overshoot_tolerance_pct: 8.0,
        target_delay_ms: 42.0,
        dyn_notch_floor_hz: 20.0,
    },
];

/// Profile of the bucket nearest to `frame_inches` (ties go to the smaller frame).
/// Non-finite sizes fall back to 5-inch.
pub fn get_frame_profile(frame_inches: f64) -> &'static FrameProfile {
    if !frame_inches.is_finite() {
        return &FRAME_PROFILES[1];
    }
    FRAME_PROFILES
        .iter()
        .fold(&FRAME_PROFILES[0], |best, candidate| {
            let best_distance = (best.inches as f64 - frame_inches).abs();
            let distance = (candidate.inches as f64 - frame_inches).abs();
            if distance < best_distance {
                candidate
            } else {
                best
            }
        })
}
