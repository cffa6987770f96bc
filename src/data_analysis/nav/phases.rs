// src/data_analysis/nav/phases.rs

use serde::Serialize;

/// Contiguous run of samples with the same navigation state code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavPhase {
    pub start_index: usize,
    /// Exclusive
    pub end_index: usize,
    pub nav_state_code: i32,
}

impl NavPhase {
    pub fn len(&self) -> usize {
        self.end_index - self.start_index
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn duration_s(&self, sample_rate: f64) -> f64 {
        self.len() as f64 / sample_rate
    }
}

/// Splits a nav state channel into phases lasting at least `min_duration_s`.
///
/// Codes are rounded to the nearest integer. Non-finite samples end the current run and
/// start no new one.
pub fn segment_nav_phases(states: &[f64], sample_rate: f64, min_duration_s: f64) -> Vec<NavPhase> {
    if sample_rate <= 0.0 || !sample_rate.is_finite() {
        return Vec::new();
    }
    let min_len = (min_duration_s.max(0.0) * sample_rate).ceil() as usize;
    let mut phases = Vec::new();
    let mut current: Option<(usize, i32)> = None;

    let close = |start: usize, end: usize, code: i32, phases: &mut Vec<NavPhase>| {
        let phase = NavPhase {
            start_index: start,
            end_index: end,
            nav_state_code: code,
        };
        if !phase.is_empty() && phase.len() >= min_len {
            phases.push(phase);
        }
    };

    for (i, &raw) in states.iter().enumerate() {
        let code = raw.is_finite().then(|| raw.round() as i32);
        match (current, code) {
            (Some((_, active)), Some(c)) if active == c => {}
            (Some((start, active)), next) => {
                close(start, i, active, &mut phases);
                current = next.map(|c| (i, c));
            }
            (None, next) => current = next.map(|c| (i, c)),
        }
    }
    if let Some((start, active)) = current {
        close(start, states.len(), active, &mut phases);
    }

    log::debug!("Nav phases: {} segments of at least {} samples", phases.len(), min_len);
    phases
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segments_by_state_code() {
        let mut states = vec![0.0; 300];
        states.extend(vec![3.0; 500]);
        states.extend(vec![10.0; 50]);
        states.extend(vec![10.0; 400]);
        let phases = segment_nav_phases(&states, 100.0, 2.0);
        assert_eq!(phases.len(), 3);
        assert_eq!(phases[1].nav_state_code, 3);
        assert_eq!(phases[1].start_index, 300);
        assert_eq!(phases[1].end_index, 800);
        assert_eq!(phases[2].len(), 450);
    }

    #[test]
    fn test_short_phases_and_gaps_dropped() {
        let mut states = vec![3.0; 150];
        states.push(f64::NAN);
        states.extend(vec![3.0; 250]);
        let phases = segment_nav_phases(&states, 100.0, 2.0);
        assert_eq!(phases.len(), 1);
        assert_eq!(phases[0].start_index, 151);
        assert!((phases[0].duration_s(100.0) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_empty_input() {
        assert!(segment_nav_phases(&[], 100.0, 2.0).is_empty());
        assert!(segment_nav_phases(&[1.0; 10], 0.0, 2.0).is_empty());
    }
}
