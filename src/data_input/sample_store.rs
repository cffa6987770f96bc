// src/data_input/sample_store.rs

use std::collections::BTreeMap;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::{AnalyzerError, Result};

/// An auxiliary telemetry frame (GPS or slow frame) attached to a main-loop sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventFrame {
    /// Index of the main-loop row this frame was logged alongside.
    pub index: usize,
    pub fields: BTreeMap<String, f64>,
}

impl EventFrame {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field insertion.
    pub fn with(mut self, name: &str, value: f64) -> Self {
        self.fields.insert(name.to_string(), value);
        self
    }

    /// Finite value of `name`, if logged.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.fields.get(name).copied().filter(|v| v.is_finite())
    }
}

/// Normalized in-memory representation of one recording.
///
/// Every channel has `n_rows` samples at `sample_rate`. The store is built once by the
/// ingestion step and only read afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct SampleStore {
    sample_rate: f64,
    n_rows: usize,
    channels: BTreeMap<String, Array1<f64>>,
    gps_frames: Vec<EventFrame>,
    slow_frames: Vec<EventFrame>,
    metadata: BTreeMap<String, String>,
}

impl SampleStore {
    /// Builds a store, validating the sample rate and that all channels share one length.
    pub fn new(sample_rate: f64, channels: BTreeMap<String, Vec<f64>>) -> Result<Self> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(AnalyzerError::InvalidInput(format!(
                "sample rate must be positive, got {}",
                sample_rate
            )));
        }

        let mut n_rows: Option<usize> = None;
        for (name, data) in &channels {
            match n_rows {
                None => n_rows = Some(data.len()),
                Some(expected) if expected != data.len() => {
                    return Err(AnalyzerError::InvalidInput(format!(
                        "channel '{}' has {} samples, expected {}",
                        name,
                        data.len(),
                        expected
                    )));
                }
                Some(_) => {}
            }
        }

        Ok(Self {
            sample_rate,
            n_rows: n_rows.unwrap_or(0),
            channels: channels
                .into_iter()
                .map(|(name, data)| (name, Array1::from(data)))
                .collect(),
            gps_frames: Vec::new(),
            slow_frames: Vec::new(),
            metadata: BTreeMap::new(),
        })
    }

    pub fn with_gps_frames(mut self, frames: Vec<EventFrame>) -> Self {
        self.gps_frames = frames;
        self
    }

    pub fn with_slow_frames(mut self, frames: Vec<EventFrame>) -> Self {
        self.slow_frames = frames;
        self
    }

    pub fn with_metadata(mut self, metadata: BTreeMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Recording length in seconds.
    pub fn duration_s(&self) -> f64 {
        self.n_rows as f64 / self.sample_rate
    }

    pub fn channel(&self, name: &str) -> Option<&Array1<f64>> {
        self.channels.get(name)
    }

    pub fn has_channel(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }

    pub fn channel_names(&self) -> impl Iterator<Item = &str> {
        self.channels.keys().map(|k| k.as_str())
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn gps_frames(&self) -> &[EventFrame] {
        &self.gps_frames
    }

    pub fn slow_frames(&self) -> &[EventFrame] {
        &self.slow_frames
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channels(pairs: &[(&str, Vec<f64>)]) -> BTreeMap<String, Vec<f64>> {
        pairs
            .iter()
            .map(|(name, data)| (name.to_string(), data.clone()))
            .collect()
    }

    #[test]
    fn test_store_reports_shape() {
        let store = SampleStore::new(
            500.0,
            channels(&[("gyro_roll", vec![0.0; 1000]), ("throttle", vec![1500.0; 1000])]),
        )
        .unwrap();
        assert_eq!(store.n_rows(), 1000);
        assert_eq!(store.channel_count(), 2);
        assert!((store.duration_s() - 2.0).abs() < 1e-12);
        assert!(store.has_channel("throttle"));
        assert!(store.channel("gyro_pitch").is_none());
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        let result = SampleStore::new(
            500.0,
            channels(&[("a", vec![0.0; 10]), ("b", vec![0.0; 11])]),
        );
        assert!(matches!(result, Err(AnalyzerError::InvalidInput(_))));
    }

    #[test]
    fn test_bad_sample_rate_rejected() {
        assert!(SampleStore::new(0.0, BTreeMap::new()).is_err());
        assert!(SampleStore::new(f64::NAN, BTreeMap::new()).is_err());
    }

    #[test]
    fn test_event_frame_ignores_non_finite_fields() {
        let frame = EventFrame::new(4).with("num_sat", 12.0).with("eph", f64::NAN);
        assert_eq!(frame.get("num_sat"), Some(12.0));
        assert_eq!(frame.get("eph"), None);
        assert_eq!(frame.get("lat"), None);
    }
}
