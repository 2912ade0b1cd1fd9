use rustfft::num_complex::Complex;
use rustfft::num_traits::Zero;

use crate::float::{from_usize, Float};

pub enum ComplexComponent {
    Re,
    Im,
}

pub fn new_real_buffer<T: Float>(size: usize) -> Vec<T> {
    vec![T::zero(); size]
}

pub fn new_complex_buffer<T: Float>(size: usize) -> Vec<Complex<T>> {
    vec![Complex::zero(); size]
}

pub fn copy_real_to_complex<T: Float>(
    input: &[T],
    output: &mut [Complex<T>],
    component: ComplexComponent,
) {
    assert!(input.len() <= output.len());
    match component {
        ComplexComponent::Re => input.iter().zip(output.iter_mut()).for_each(|(i, o)| {
            o.re = *i;
            o.im = T::zero();
        }),
        ComplexComponent::Im => input.iter().zip(output.iter_mut()).for_each(|(i, o)| {
            o.im = *i;
            o.re = T::zero();
        }),
    }
    output[input.len()..]
        .iter_mut()
        .for_each(|o| *o = Complex::zero())
}

pub fn copy_complex_to_real<T: Float>(
    input: &[Complex<T>],
    output: &mut [T],
    component: ComplexComponent,
) {
    let n = input.len().min(output.len());
    match component {
        ComplexComponent::Re => input[..n]
            .iter()
            .map(|c| c.re)
            .zip(output.iter_mut())
            .for_each(|(i, o)| *o = i),
        ComplexComponent::Im => input[..n]
            .iter()
            .map(|c| c.im)
            .zip(output.iter_mut())
            .for_each(|(i, o)| *o = i),
    }

    output[n..].iter_mut().for_each(|o| *o = T::zero());
}

/// Computes |x|^2 for each complex value x in `arr`. This function
/// modifies `arr` in place and leaves the complex component zero.
pub fn modulus_squared<T: Float>(arr: &mut [Complex<T>]) {
    for s in arr {
        s.re = s.re * s.re + s.im * s.im;
        s.im = T::zero();
    }
}

/// Compute the sum of the square of each element of `arr`.
pub fn square_sum<T: Float>(arr: &[T]) -> T {
    arr.iter().map(|&s| s * s).sum::<T>()
}

/// Arithmetic mean; zero for an empty slice.
pub fn mean<T: Float>(arr: &[T]) -> T {
    if arr.is_empty() {
        return T::zero();
    }
    arr.iter().copied().sum::<T>() / from_usize(arr.len())
}

/// Mean of the squared samples; zero for an empty slice.
pub fn mean_square<T: Float>(arr: &[T]) -> T {
    if arr.is_empty() {
        return T::zero();
    }
    square_sum(arr) / from_usize(arr.len())
}

/// Population standard deviation.
pub fn std_dev<T: Float>(arr: &[T]) -> T {
    let mu = mean(arr);
    mean_square(&arr.iter().map(|&s| s - mu).collect::<Vec<T>>()).sqrt()
}

/// Number of positions where the sign bit differs between consecutive samples.
pub fn sign_changes<T: Float>(arr: &[T]) -> usize {
    arr.windows(2)
        .filter(|w| w[0].is_sign_negative() != w[1].is_sign_negative())
        .count()
}

/// Index and value of the first maximum. `None` for an empty slice.
pub fn argmax<T: Float>(arr: &[T]) -> Option<(usize, T)> {
    arr.iter()
        .copied()
        .enumerate()
        .fold(None, |best, (i, v)| match best {
            Some((_, b)) if !(v > b) => best,
            _ => Some((i, v)),
        })
}

/// Median of a set of values. The mean of the two middle values for an even count.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argmax_prefers_first_occurrence() {
        assert_eq!(argmax(&[1.0, 3.0, 3.0, 2.0]), Some((1, 3.0)));
        assert_eq!(argmax::<f64>(&[]), None);
    }

    #[test]
    fn sign_changes_counts_sign_bit() {
        let signal = [1.0f32, -1.0, -2.0, 3.0, 0.0, -0.5];
        assert_eq!(sign_changes(&signal), 3);
    }

    #[test]
    fn median_even_and_odd() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn std_dev_of_constant_is_zero() {
        assert_eq!(std_dev(&[0.5f64; 16]), 0.0);
        let alternating: Vec<f64> = (0..100).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        assert!((std_dev(&alternating) - 1.0).abs() < 1e-12);
    }
}
