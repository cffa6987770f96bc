// src/data_analysis/signal_stats.rs

use std::collections::VecDeque;

use ndarray::{Array1, ArrayView1};

use crate::constants::MIN_SIGNAL_VARIANCE;

/// Finite samples of `data`, in order.
pub fn finite_values(data: &[f64]) -> Vec<f64> {
    data.iter().copied().filter(|v| v.is_finite()).collect()
}

pub fn mean(data: &[f64]) -> Option<f64> {
    ArrayView1::from(data).mean().filter(|m| m.is_finite())
}

/// Population standard deviation.
pub fn std_dev(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    let sd = ArrayView1::from(data).std(0.0);
    sd.is_finite().then_some(sd)
}

pub fn rms(data: &[f64]) -> Option<f64> {
    ArrayView1::from(data)
        .mapv(|v| v * v)
        .mean()
        .map(f64::sqrt)
        .filter(|r| r.is_finite())
}

pub fn median(data: &[f64]) -> Option<f64> {
    let mut sorted = finite_values(data);
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Linearly interpolated percentile (`q` in 0-100) of the finite values.
pub fn percentile(data: &[f64], q: f64) -> Option<f64> {
    let mut sorted = finite_values(data);
    if sorted.is_empty() || !q.is_finite() {
        return None;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));
    let pos = q.clamp(0.0, 100.0) / 100.0 * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

/// Pearson correlation of `x[i]` against `y[i]`.
///
/// `None` for mismatched or short inputs and for zero-variance signals.
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let mut sum_xy = 0.0;
    let mut sum_x2 = 0.0;
    let mut sum_y2 = 0.0;
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    for (&xv, &yv) in x.iter().zip(y) {
        sum_xy += xv * yv;
        sum_x2 += xv * xv;
        sum_y2 += yv * yv;
        sum_x += xv;
        sum_y += yv;
    }

    let n_f = x.len() as f64;
    let var_x = n_f * sum_x2 - sum_x * sum_x;
    let var_y = n_f * sum_y2 - sum_y * sum_y;
    // Relative guard: the sums scale with n^2 and the signal magnitude.
    let scale = n_f * n_f;
    if var_x <= MIN_SIGNAL_VARIANCE * scale || var_y <= MIN_SIGNAL_VARIANCE * scale {
        return None;
    }
    let correlation = (n_f * sum_xy - sum_x * sum_y) / (var_x * var_y).sqrt();
    correlation.is_finite().then(|| correlation.clamp(-1.0, 1.0))
}

/// Correlation of `leading[i]` against `lagging[i + lag]`.
pub fn lagged_correlation(leading: &[f64], lagging: &[f64], lag: usize) -> Option<f64> {
    let n = leading.len().min(lagging.len());
    if lag >= n {
        return None;
    }
    let len = n - lag;
    pearson_correlation(&leading[..len], &lagging[lag..lag + len])
}

/// Trailing moving average; the first samples average over what is available.
pub fn moving_average_smooth_f64(data: &Array1<f64>, window_size: usize) -> Array1<f64> {
    if window_size <= 1 || data.is_empty() {
        return data.to_owned();
    }
    let mut smoothed_data = Array1::<f64>::zeros(data.len());
    let mut current_sum: f64 = 0.0;
    let mut history: VecDeque<f64> = VecDeque::with_capacity(window_size);
    for i in 0..data.len() {
        let val = data[i];
        history.push_back(val);
        current_sum += val;
        if history.len() > window_size {
            if let Some(old_val) = history.pop_front() {
                current_sum -= old_val;
            }
        }
        smoothed_data[i] = current_sum / history.len() as f64;
    }
    smoothed_data
}

/// Centered moving average over `window_size` samples, truncated at the edges.
pub fn centered_moving_average(data: &Array1<f64>, window_size: usize) -> Array1<f64> {
    let n = data.len();
    if window_size <= 1 || n == 0 {
        return data.to_owned();
    }
    let half = window_size / 2;
    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0.0);
    for &v in data.iter() {
        let last = prefix[prefix.len() - 1];
        prefix.push(last + v);
    }
    Array1::from_iter((0..n).map(|i| {
        let lo = i.saturating_sub(half);
        let hi = (i + half + 1).min(n);
        (prefix[hi] - prefix[lo]) / (hi - lo) as f64
    }))
}

/// Trailing rolling standard deviation over `window_size` samples.
pub fn rolling_std(data: &Array1<f64>, window_size: usize) -> Array1<f64> {
    if window_size <= 1 || data.is_empty() {
        return Array1::zeros(data.len());
    }
    let mut out = Array1::<f64>::zeros(data.len());
    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    let mut history: VecDeque<f64> = VecDeque::with_capacity(window_size);
    for i in 0..data.len() {
        let val = data[i];
        history.push_back(val);
        sum += val;
        sum_sq += val * val;
        if history.len() > window_size {
            if let Some(old_val) = history.pop_front() {
                sum -= old_val;
                sum_sq -= old_val * old_val;
            }
        }
        let n = history.len() as f64;
        let var = (sum_sq / n - (sum / n).powi(2)).max(0.0);
        out[i] = var.sqrt();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_basic_stats() {
        let data = [1.0, 2.0, 3.0, 4.0];
        assert_relative_eq!(mean(&data).unwrap(), 2.5);
        assert_relative_eq!(std_dev(&data).unwrap(), 1.25f64.sqrt());
        assert_relative_eq!(rms(&[3.0, -3.0]).unwrap(), 3.0);
        assert_relative_eq!(median(&data).unwrap(), 2.5);
        assert_relative_eq!(median(&[5.0, f64::NAN, 1.0, 3.0]).unwrap(), 3.0);
        assert!(mean(&[]).is_none());
        assert!(std_dev(&[]).is_none());
        assert!(rms(&[]).is_none());
        assert!(mean(&[1.0, f64::NAN]).is_none());
        assert_relative_eq!(std_dev(&[7.0]).unwrap(), 0.0);
        assert_relative_eq!(percentile(&data, 50.0).unwrap(), 2.5);
        assert_relative_eq!(percentile(&data, 100.0).unwrap(), 4.0);
        assert_relative_eq!(percentile(&[0.0, 10.0], 10.0).unwrap(), 1.0);
    }

    #[test]
    fn test_pearson_correlation() {
        let x: Vec<f64> = (0..50).map(|i| (i as f64 * 0.3).sin()).collect();
        let y: Vec<f64> = x.iter().map(|v| 2.0 * v + 1.0).collect();
        let neg: Vec<f64> = x.iter().map(|v| -v).collect();
        assert_relative_eq!(pearson_correlation(&x, &y).unwrap(), 1.0, epsilon = 1e-9);
        assert_relative_eq!(pearson_correlation(&x, &neg).unwrap(), -1.0, epsilon = 1e-9);
        assert!(pearson_correlation(&x, &vec![1.0; 50]).is_none());
        assert!(pearson_correlation(&x, &y[..10]).is_none());
    }

    #[test]
    fn test_lagged_correlation_finds_shift() {
        let x: Vec<f64> = (0..200).map(|i| (i as f64 * 0.1).sin()).collect();
        let mut y = vec![0.0; 5];
        y.extend_from_slice(&x[..195]);
        assert_relative_eq!(lagged_correlation(&x, &y, 5).unwrap(), 1.0, epsilon = 1e-9);
        assert!(lagged_correlation(&x, &y, 200).is_none());
    }

    #[test]
    fn test_moving_average_and_rolling_std() {
        let data = Array1::from(vec![1.0, 1.0, 4.0, 4.0]);
        let smoothed = moving_average_smooth_f64(&data, 2);
        assert_eq!(smoothed.to_vec(), vec![1.0, 1.0, 2.5, 4.0]);
        let ramp = Array1::from_iter((0..9).map(|i| i as f64));
        let centered = centered_moving_average(&ramp, 3);
        assert_relative_eq!(centered[4], 4.0);
        assert_relative_eq!(centered[0], 0.5);
        let sd = rolling_std(&data, 2);
        assert_relative_eq!(sd[2], 1.5);
        assert_relative_eq!(sd[3], 0.0);
    }
}
