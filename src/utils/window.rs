use std::f64::consts::PI;

use crate::float::{cast, Float};

/// Symmetric Hann window, `w[n] = 0.5 - 0.5 cos(2πn / (N - 1))`.
pub fn hann<T: Float>(size: usize) -> Vec<T> {
    match size {
        0 => Vec::new(),
        1 => vec![T::one()],
        _ => {
            let denominator = (size - 1) as f64;
            (0..size)
                .map(|n| cast(0.5 - 0.5 * (2.0 * PI * n as f64 / denominator).cos()))
                .collect()
        }
    }
}

/// Periodic Hann window, the variant used for overlap-add STFT analysis.
pub fn periodic_hann(size: usize) -> Vec<f64> {
    (0..size)
        .map(|n| 0.5 - 0.5 * (2.0 * PI * n as f64 / size as f64).cos())
        .collect()
}

/// Multiply `signal` by `window` in place. Samples past the window length are untouched.
pub fn apply<T: Float>(signal: &mut [T], window: &[T]) {
    signal
        .iter_mut()
        .zip(window.iter())
        .for_each(|(s, &w)| *s = *s * w);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hann_is_symmetric_with_zero_ends() {
        let w: Vec<f64> = hann(9);
        assert_eq!(w[0], 0.0);
        assert!((w[4] - 1.0).abs() < 1e-12);
        for i in 0..9 {
            assert!((w[i] - w[8 - i]).abs() < 1e-12);
        }
    }

    #[test]
    fn periodic_hann_overlaps_to_constant() {
        let n = 16;
        let w = periodic_hann(n);
        // At 75% overlap the squared window sums to a constant.
        for i in 0..n / 4 {
            let total: f64 = (0..4).map(|k| w[i + k * n / 4].powi(2)).sum();
            assert!((total - 1.5).abs() < 1e-12);
        }
    }
}
