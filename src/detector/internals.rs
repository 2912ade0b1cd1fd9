use rustfft::{Fft, FftPlanner};

use crate::float::{from_usize, Float};
use crate::utils::buffer::{
    copy_complex_to_real, copy_real_to_complex, modulus_squared, new_complex_buffer,
    new_real_buffer, square_sum, ComplexComponent,
};

/// Compute the autocorrelation of `signal` through its power spectrum.
///
/// The transform length is `fft.len()`; `signal` is zero-padded up to it. When the
/// length is shorter than `2 * signal.len() - 1` the result is circular, otherwise
/// the first `signal.len()` values are the ordinary (linear) autocorrelation.
pub fn autocorrelation<T: Float>(signal: &[T], fft: &dyn Fft<T>, inv_fft: &dyn Fft<T>) -> Vec<T> {
    let n = fft.len();
    let mut signal_complex = new_complex_buffer(n);
    let mut result = new_real_buffer(n);

    copy_real_to_complex(&signal[..signal.len().min(n)], &mut signal_complex, ComplexComponent::Re);
    fft.process(&mut signal_complex);
    modulus_squared(&mut signal_complex);
    inv_fft.process(&mut signal_complex);
    copy_complex_to_real(&signal_complex, &mut result, ComplexComponent::Re);

    // rustfft doesn't normalize; fft -> inverse fft scales by `n` once.
    let normalization_const = T::one() / from_usize(n);
    result.iter_mut().for_each(|r| *r = *r * normalization_const);
    result
}

/// Linear autocorrelation of the whole signal for lags `0..signal.len()`.
pub fn linear_autocorrelation<T: Float>(signal: &[T]) -> Vec<T> {
    if signal.is_empty() {
        return Vec::new();
    }
    let size = (2 * signal.len()).next_power_of_two();
    let mut planner = FftPlanner::<T>::new();
    let fft = planner.plan_fft_forward(size);
    let inv_fft = planner.plan_fft_inverse(size);

    let mut result = autocorrelation(signal, fft.as_ref(), inv_fft.as_ref());
    result.truncate(signal.len());
    result
}

/// Compute the windowed autocorrelation of `signal` and put the result in `result`.
/// For a signal _x=(x_0,x_1,...)_, the windowed autocorrelation with window size _w_ is
/// the function
///
/// > r(t) = sum_{i=0}^{w-1} x_i*x_{i+t}
///
/// The transforms must be planned for `signal.len()`, and `window_size` is assumed to
/// be at most half of the length of `signal`.
pub fn windowed_autocorrelation<T: Float>(
    signal: &[T],
    window_size: usize,
    fft: &dyn Fft<T>,
    inv_fft: &dyn Fft<T>,
    result: &mut [T],
) {
    assert_eq!(
        fft.len(),
        signal.len(),
        "Transforms must be planned for the length of `signal`."
    );

    let mut signal_complex = new_complex_buffer(signal.len());
    let mut truncated_signal_complex = new_complex_buffer(signal.len());

    // To achieve the windowed autocorrelation, we compute the cross correlation between
    // the original signal and the signal truncated to lie in `0..window_size`
    copy_real_to_complex(signal, &mut signal_complex, ComplexComponent::Re);
    copy_real_to_complex(
        &signal[..window_size],
        &mut truncated_signal_complex,
        ComplexComponent::Re,
    );
    fft.process(&mut signal_complex);
    fft.process(&mut truncated_signal_complex);
    // Since the fft is linear and we are doing fft -> inverse fft, we can just divide by
    // `signal.len()` once.
    let normalization_const = T::one() / from_usize(signal.len());
    signal_complex
        .iter_mut()
        .zip(truncated_signal_complex.iter())
        .for_each(|(a, b)| {
            *a = *a * normalization_const * b.conj();
        });
    inv_fft.process(&mut signal_complex);

    // The result is valid only for `0..window_size`
    copy_complex_to_real(&signal_complex[..window_size], result, ComplexComponent::Re);
}

/// Compute the windowed square error, _d(t)_, of `signal`. For a window size of _w_ and a signal
/// _x=(x_0,x_1,...)_, this is defined by
///
///  > d(t) = sum_{i=0}^{w-1} (x_i - x_{i+t})^2
///
/// This function is computed efficiently using an FFT. It is assumed that `window_size` is at most half
/// the length of `signal`.
pub fn windowed_square_error<T: Float>(
    signal: &[T],
    window_size: usize,
    fft: &dyn Fft<T>,
    inv_fft: &dyn Fft<T>,
    result: &mut [T],
) {
    assert!(
        2 * window_size <= signal.len(),
        "The window size cannot be more than half the signal length"
    );

    let two = T::one() + T::one();

    // The windowed square error function, d(t), can be computed
    // as d(t) = pow_0^w + pow_t^{t+w} - 2*windowed_autocorrelation(t)
    // where pow_a^b is the sum of the square of `signal` on the window `a..b`
    // We proceed accordingly.
    windowed_autocorrelation(signal, window_size, fft, inv_fft, result);
    let mut windowed_power = square_sum(&signal[..window_size]);
    let power = windowed_power;

    result
        .iter_mut()
        .take(window_size)
        .enumerate()
        .for_each(|(i, a)| {
            // use the formula pow_0^w + pow_t^{t+w} - 2*windowed_autocorrelation(t)
            *a = power + windowed_power - two * *a;
            // Since we're processing everything in order, we can computed pow_{t+1}^{t+1+w}
            // directly from pow_t^{t+w} by adding and subtracting the boundary terms.
            windowed_power = windowed_power - signal[i] * signal[i]
                + signal[i + window_size] * signal[i + window_size];
        })
}

/// Calculate the "cumulative mean normalized difference function" as
/// specified in the YIN paper. If _d(t)_ is the square error function,
/// compute _d'(0) = 1_ and for _t > 0_
///
///  > d'(t) = d(t) / [ (1/t) * sum_{i=0}^t d(i) ]
///
/// Lags where the running sum is still zero (a silent window) are set to one.
pub fn yin_normalize_square_error<T: Float>(square_error: &mut [T]) {
    let mut sum = T::zero();
    square_error[0] = T::one();
    // square_error[0] should always be zero, so we don't need to worry about
    // adding this to our sum.
    square_error
        .iter_mut()
        .enumerate()
        .skip(1)
        .for_each(|(i, a)| {
            sum = sum + *a;
            *a = if sum > T::zero() {
                *a * from_usize::<T>(i) / sum
            } else {
                T::one()
            };
        });
}
