// src/data_input/log_parser.rs

use csv::ReaderBuilder;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use crate::data_input::sample_store::SampleStore;
use crate::error::{AnalyzerError, Result};

/// Time column names recognised in a normalized CSV, with their scale to seconds.
const TIME_COLUMNS: [(&str, f64); 4] = [
    ("time (us)", 1e-6),
    ("time_us", 1e-6),
    ("time", 1e-6),
    ("time_s", 1.0),
];

fn time_scale(header: &str) -> Option<f64> {
    TIME_COLUMNS
        .iter()
        .find(|(name, _)| *name == header)
        .map(|(_, scale)| *scale)
}

fn is_header_line(line: &str) -> bool {
    line.split(',').map(|h| h.trim().trim_matches('"')).any(|h| {
        time_scale(h).is_some() || h.starts_with("gyro_") || h.starts_with("motor")
    })
}

/// Parses a normalized channel CSV into a [`SampleStore`].
///
/// Lines before the header row are read as `key,value` metadata, the way flight
/// controller CSV exports carry their header block. Each non-time column becomes a
/// channel; unparseable cells become `NaN` so channels stay aligned.
///
/// The sample rate is `sample_rate` when given, otherwise the mean of positive time
/// deltas, otherwise a numeric `sample_rate` metadata entry.
pub fn parse_sample_csv<R: Read>(input: R, sample_rate: Option<f64>) -> Result<SampleStore> {
    let mut metadata: BTreeMap<String, String> = BTreeMap::new();
    let mut csv_lines: Vec<String> = Vec::new();
    let mut found_csv_headers = false;

    for line_result in BufReader::new(input).lines() {
        let line = line_result?;
        let trimmed_line = line.trim();
        if trimmed_line.is_empty() {
            continue;
        }

        if !found_csv_headers && is_header_line(trimmed_line) {
            found_csv_headers = true;
            csv_lines.push(line);
            continue;
        }

        if found_csv_headers {
            csv_lines.push(line);
        } else {
            let mut rdr = ReaderBuilder::new()
                .has_headers(false)
                .from_reader(trimmed_line.as_bytes());
            if let Some(Ok(record)) = rdr.records().next() {
                if record.len() >= 2 {
                    let key = record.get(0).unwrap_or("").trim().trim_matches('"');
                    let value = record.get(1).unwrap_or("").trim().trim_matches('"');
                    if !key.is_empty() {
                        metadata.insert(key.to_string(), value.to_string());
                    }
                }
            }
        }
    }

    if !found_csv_headers {
        return Err(AnalyzerError::InvalidInput(
            "could not find CSV headers".to_string(),
        ));
    }
    log::debug!("Extracted {} metadata entries", metadata.len());

    let csv_content = csv_lines.join("\n");
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(csv_content.as_bytes());
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim_matches('"').to_string())
        .collect();

    let time_column = headers
        .iter()
        .enumerate()
        .find_map(|(i, h)| time_scale(h).map(|scale| (i, scale)));

    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); headers.len()];
    for (row_index, result) in reader.records().enumerate() {
        match result {
            Ok(record) => {
                for (col, column) in columns.iter_mut().enumerate() {
                    let value = record
                        .get(col)
                        .and_then(|cell| cell.parse::<f64>().ok())
                        .unwrap_or(f64::NAN);
                    column.push(value);
                }
            }
            Err(e) => {
                log::warn!("Skipping row {} due to CSV read error: {}", row_index + 1, e);
            }
        }
    }
    log::info!(
        "Read {} rows across {} columns",
        columns.first().map_or(0, |c| c.len()),
        headers.len()
    );

    let estimated_rate = time_column.and_then(|(col, scale)| estimate_sample_rate(&columns[col], scale));
    let metadata_rate = metadata
        .get("sample_rate")
        .and_then(|v| v.parse::<f64>().ok());

    let rate = sample_rate
        .or(estimated_rate)
        .or(metadata_rate)
        .ok_or_else(|| {
            AnalyzerError::InsufficientData(
                "could not determine sample rate (no time column or sample_rate entry)".to_string(),
            )
        })?;
    log::info!("Sample rate: {:.2} Hz", rate);

    let channels: BTreeMap<String, Vec<f64>> = headers
        .into_iter()
        .zip(columns)
        .enumerate()
        .filter(|(i, _)| time_column.map_or(true, |(col, _)| col != *i))
        .map(|(_, pair)| pair)
        .collect();

    Ok(SampleStore::new(rate, channels)?.with_metadata(metadata))
}

/// Opens `path` and parses it with [`parse_sample_csv`].
pub fn parse_sample_csv_file(path: &Path, sample_rate: Option<f64>) -> Result<SampleStore> {
    let file = File::open(path)?;
    parse_sample_csv(file, sample_rate)
}

/// Mean sample rate from positive deltas of a time column (`scale` converts to seconds).
fn estimate_sample_rate(times: &[f64], scale: f64) -> Option<f64> {
    let mut total_delta = 0.0;
    let mut count = 0usize;
    let mut prev_time: Option<f64> = None;
    for &t in times.iter().filter(|t| t.is_finite()) {
        let current_time = t * scale;
        if let Some(pt) = prev_time {
            let delta = current_time - pt;
            if delta > 1e-9 {
                total_delta += delta;
                count += 1;
            }
        }
        prev_time = Some(current_time);
    }
    if count > 0 {
        Some(count as f64 / total_delta)
    } else {
        None
    }
}
