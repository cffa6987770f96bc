// src/data_analysis/fft_utils.rs

use ndarray::Array1;
use realfft::num_complex::Complex64;
use realfft::RealFftPlanner;

/// Computes the Fast Fourier Transform (FFT) of a real-valued signal.
/// Returns the complex one-sided spectrum (`n / 2 + 1` bins). Handles empty input.
pub fn fft_forward(data: &Array1<f64>) -> Array1<Complex64> {
    if data.is_empty() {
        return Array1::zeros(0);
    }
    let n = data.len();
    let mut input = data.to_vec();
    let planner = RealFftPlanner::<f64>::new().plan_fft_forward(n);
    let mut output = planner.make_output_vec();
    if planner.process(&mut input, &mut output).is_err() {
        log::warn!("FFT forward processing failed for length {}", n);
        return Array1::zeros(n / 2 + 1);
    }
    Array1::from(output)
}
