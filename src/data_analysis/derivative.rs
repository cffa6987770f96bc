// src/data_analysis/derivative.rs

use ndarray::{s, Array1, ArrayView1};

/// Rate of change of `data` in units per second.
///
/// Central differences inside, one-sided at both ends. Empty for fewer than two samples
/// or a non-positive sample rate.
pub fn calculate_derivative(data: &[f64], sample_rate: f64) -> Array1<f64> {
    let n = data.len();
    if n < 2 || !sample_rate.is_finite() || sample_rate <= 0.0 {
        return Array1::zeros(0);
    }
    let x = ArrayView1::from(data);
    let mut rate = Array1::zeros(n);

    rate[0] = (x[1] - x[0]) * sample_rate;
    rate[n - 1] = (x[n - 1] - x[n - 2]) * sample_rate;
    if n > 2 {
        let central = (&x.slice(s![2..]) - &x.slice(s![..n - 2])) * (0.5 * sample_rate);
        rate.slice_mut(s![1..n - 1]).assign(&central);
    }
    rate
}
