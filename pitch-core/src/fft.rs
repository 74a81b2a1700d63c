//! # Fast Fourier Transform (FFT) Module
//!
//! FFT-based autocorrelation for the pitch estimator. The direct sum in
//! [`crate::pitch`] is O(n²); this computes the same linear (unnormalized)
//! autocorrelation in O(n log n) via the Wiener-Khinchin theorem:
//! zero-pad to at least twice the length, take the power spectrum and
//! transform back.

use rustfft::{FftPlanner, num_complex::Complex};

/// Computes `c[i] = Σ_j buf[j] * buf[j + i]` for lags `0..buf.len()`.
///
/// The signal is zero-padded to the next power of two at or above
/// `2 * buf.len()` so the circular correlation of the padded buffer equals
/// the linear correlation of the unpadded signal.
///
/// # Arguments
/// * `buf` - Time-domain samples
///
/// # Returns
/// * `Vec<f32>` - One correlation value per lag, same length as `buf`
pub fn autocorrelate(buf: &[f32]) -> Vec<f32> {
    let len = buf.len();
    if len == 0 {
        return Vec::new();
    }
    let padded_len = (2 * len).next_power_of_two();

    let mut planner = FftPlanner::new();
    let forward = planner.plan_fft_forward(padded_len);
    let inverse = planner.plan_fft_inverse(padded_len);

    let mut spectrum: Vec<Complex<f32>> = buf
        .iter()
        .map(|&sample| Complex { re: sample, im: 0.0 })
        .chain(std::iter::repeat(Complex { re: 0.0, im: 0.0 }))
        .take(padded_len)
        .collect();

    forward.process(&mut spectrum);
    for bin in spectrum.iter_mut() {
        // |X|², the power spectrum
        *bin = Complex { re: bin.norm_sqr(), im: 0.0 };
    }
    inverse.process(&mut spectrum);

    // RustFFT does not normalise the inverse transform.
    let scale = 1.0 / padded_len as f32;
    spectrum
        .iter()
        .take(len)
        .map(|c| c.re * scale)
        .collect()
}
