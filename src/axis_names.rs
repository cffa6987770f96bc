// src/axis_names.rs

/// Centralized axis and channel naming utilities
///
/// Provides consistent axis names and the conventional sample-store channel names
/// shared by every analyzer.
/// Number of rotational axes analyzed (Roll, Pitch, Yaw).
pub const AXIS_COUNT: usize = 3;

/// Get all axis names as a static array
pub const AXIS_NAMES: [&str; AXIS_COUNT] = ["Roll", "Pitch", "Yaw"];

/// Gyro channel names, indexed like `AXIS_NAMES`.
pub const GYRO_CHANNELS: [&str; AXIS_COUNT] = ["gyro_roll", "gyro_pitch", "gyro_yaw"];

/// Setpoint channel names, indexed like `AXIS_NAMES`.
pub const SETPOINT_CHANNELS: [&str; AXIS_COUNT] =
    ["setpoint_roll", "setpoint_pitch", "setpoint_yaw"];

/// Short parameter suffix used in firmware setting names (`mc_p_roll`, ...).
pub const AXIS_PARAM_SUFFIX: [&str; AXIS_COUNT] = ["roll", "pitch", "yaw"];

pub const THROTTLE_CHANNEL: &str = "throttle";
pub const NAV_STATE_CHANNEL: &str = "nav_state";
pub const HEADING_CHANNEL: &str = "heading";
pub const BARO_ALT_CHANNEL: &str = "baro_alt";
pub const NAV_ALT_CHANNEL: &str = "nav_alt";
pub const NAV_POS_N_CHANNEL: &str = "nav_pos_n";
pub const NAV_POS_E_CHANNEL: &str = "nav_pos_e";
pub const NAV_TGT_N_CHANNEL: &str = "nav_tgt_n";
pub const NAV_TGT_E_CHANNEL: &str = "nav_tgt_e";
pub const NAV_TGT_ALT_CHANNEL: &str = "nav_tgt_alt";

/// Largest motor index probed when looking for `motorN` channels.
pub const MAX_MOTORS: usize = 8;

/// Get the standard axis name for a given index
///
/// # Arguments
/// * `index` - Axis index (0=Roll, 1=Pitch, 2=Yaw)
///
/// # Panics
/// Panics if index is greater than 2
pub fn axis_name(index: usize) -> &'static str {
    match index {
        0 => "Roll",
        1 => "Pitch",
        2 => "Yaw",
        _ => panic!(
            "Invalid axis index: {}. Expected 0 (Roll), 1 (Pitch), or 2 (Yaw)",
            index
        ),
    }
}

/// Channel name of motor `index` (`motor0`, `motor1`, ...).
pub fn motor_channel(index: usize) -> String {
    format!("motor{}", index)
}
