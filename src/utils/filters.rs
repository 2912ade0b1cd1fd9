//! IIR filter design and zero-phase filtering.

use std::f64::consts::PI;

use rustfft::num_complex::Complex64;

use crate::error::{Error, Result};

/// Digital Butterworth high-pass filter in transfer-function form,
/// `H(z) = B(z) / A(z)` with `a[0] == 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct HighPassFilter {
    b: Vec<f64>,
    a: Vec<f64>,
    /// Direct-form II transposed state for a unit step at steady state.
    zi: Vec<f64>,
}

impl HighPassFilter {
    /// Design an `order`-pole Butterworth high-pass with the -3 dB point at `cutoff_hz`.
    ///
    /// The analog prototype is prewarped and mapped with the bilinear transform;
    /// the gain is normalised to one at Nyquist.
    pub fn butterworth(order: usize, cutoff_hz: f64, sample_rate: f64) -> Result<Self> {
        let nyquist = sample_rate / 2.0;
        if order == 0 || !(cutoff_hz > 0.0 && cutoff_hz < nyquist) {
            return Err(Error::configuration(format!(
                "cannot design an order {order} high-pass at {cutoff_hz} Hz for {sample_rate} Hz audio"
            )));
        }
        let wn = cutoff_hz / nyquist;
        // Bilinear transform with fs = 2, the normalised-frequency convention.
        let fs2 = 4.0;
        let warped = fs2 * (PI * wn / 2.0).tan();

        let poles: Vec<Complex64> = (0..order)
            .map(|k| {
                let theta = PI * (2 * k + order + 1) as f64 / (2 * order) as f64;
                let prototype = Complex64::from_polar(1.0, theta);
                let analog = Complex64::new(warped, 0.0) / prototype;
                (fs2 + analog) / (fs2 - analog)
            })
            .collect();

        let a: Vec<f64> = expand_roots(&poles).iter().map(|c| c.re).collect();
        // All zeros sit at z = 1.
        let ones = vec![Complex64::new(1.0, 0.0); order];
        let b_unit: Vec<f64> = expand_roots(&ones).iter().map(|c| c.re).collect();

        let at_nyquist = |coefficients: &[f64]| -> f64 {
            coefficients
                .iter()
                .enumerate()
                .map(|(i, &c)| if i % 2 == 0 { c } else { -c })
                .sum()
        };
        let gain = at_nyquist(&a) / at_nyquist(&b_unit);
        let b: Vec<f64> = b_unit.iter().map(|&c| c * gain).collect();

        let zi = steady_state(&b, &a)?;
        Ok(Self { b, a, zi })
    }

    pub fn numerator(&self) -> &[f64] {
        &self.b
    }

    pub fn denominator(&self) -> &[f64] {
        &self.a
    }

    /// Forward-backward filtering with odd extension at both ends, giving zero phase
    /// distortion and a squared magnitude response.
    pub fn filtfilt(&self, signal: &[f64]) -> Vec<f64> {
        if signal.len() < 2 {
            return signal.to_vec();
        }
        let n = signal.len();
        let padlen = (3 * self.a.len().max(self.b.len())).min(n - 1);

        let first = signal[0];
        let last = signal[n - 1];
        let mut extended = Vec::with_capacity(n + 2 * padlen);
        extended.extend((1..=padlen).rev().map(|i| 2.0 * first - signal[i]));
        extended.extend_from_slice(signal);
        extended.extend((1..=padlen).map(|i| 2.0 * last - signal[n - 1 - i]));

        let forward = self.lfilter(&extended, extended[0]);
        let mut reversed: Vec<f64> = forward.into_iter().rev().collect();
        let backward = self.lfilter(&reversed, reversed[0]);
        reversed.clear();
        reversed.extend(backward.into_iter().rev());

        reversed[padlen..padlen + n].to_vec()
    }

    /// Direct-form II transposed filtering, starting from the steady state of a
    /// constant input equal to `initial`.
    fn lfilter(&self, signal: &[f64], initial: f64) -> Vec<f64> {
        let mut state: Vec<f64> = self.zi.iter().map(|&z| z * initial).collect();
        let order = state.len();
        signal
            .iter()
            .map(|&x| {
                let y = self.b[0] * x + state.first().copied().unwrap_or(0.0);
                for i in 0..order {
                    let next = if i + 1 < order { state[i + 1] } else { 0.0 };
                    state[i] = self.b[i + 1] * x - self.a[i + 1] * y + next;
                }
                y
            })
            .collect()
    }
}

/// Coefficients of `prod(1 - r z^-1)` over `roots`, in ascending powers of `z^-1`.
fn expand_roots(roots: &[Complex64]) -> Vec<Complex64> {
    let mut coefficients = vec![Complex64::new(1.0, 0.0)];
    for &root in roots {
        let mut next = coefficients.clone();
        next.push(Complex64::new(0.0, 0.0));
        for i in 1..next.len() {
            next[i] -= root * coefficients[i - 1];
        }
        coefficients = next;
    }
    coefficients
}

/// Filter state reached after an infinitely long unit step.
fn steady_state(b: &[f64], a: &[f64]) -> Result<Vec<f64>> {
    let a_sum: f64 = a.iter().sum();
    if a_sum.abs() < f64::EPSILON {
        return Err(Error::numerical("filter has a pole at z = 1"));
    }
    let y = b.iter().sum::<f64>() / a_sum;
    let order = a.len() - 1;
    let mut zi = vec![0.0; order];
    let mut acc = 0.0;
    for i in (0..order).rev() {
        acc += b[i + 1] - a[i + 1] * y;
        zi[i] = acc;
    }
    Ok(zi)
}
