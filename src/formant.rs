//! Formant frequencies from an all-pole model of the utterance.
//!
//! The windowed utterance is fitted with a linear predictor by Burg's method. The
//! poles of the predictor approximate the resonances of the vocal tract; each pole
//! in the upper half plane gives a candidate frequency from its angle.

use std::f64::consts::PI;

use rustfft::num_complex::Complex64;
use tracing::{trace, warn};

use crate::config::FormantConfig;
use crate::error::{Error, Result};
use crate::utils::window::hann;

const ROOT_MAX_ITER: usize = 500;
const ROOT_TOLERANCE: f64 = 1e-12;
/// Imaginary parts smaller than this are treated as a real root.
const REAL_ROOT_SNAP: f64 = 1e-10;

#[derive(Debug, Clone)]
pub struct FormantExtractor {
    config: FormantConfig,
}

impl FormantExtractor {
    pub fn new(config: FormantConfig) -> Self {
        FormantExtractor { config }
    }

    /// Up to `count` ascending formants in `(min_hz, max_hz)`. Empty when the
    /// model cannot be fitted; the list is never padded.
    pub fn extract(&self, signal: &[f64], sample_rate: f64) -> Vec<f64> {
        match self.try_extract(signal, sample_rate) {
            Ok(formants) => formants,
            Err(err) => {
                warn!(%err, "formant extraction failed");
                Vec::new()
            }
        }
    }

    pub fn try_extract(&self, signal: &[f64], sample_rate: f64) -> Result<Vec<f64>> {
        let order = self.config.lpc_order(sample_rate);
        let window = hann::<f64>(signal.len());
        let windowed: Vec<f64> = signal.iter().zip(window.iter()).map(|(s, w)| s * w).collect();

        let coefficients = burg_lpc(&windowed, order)?;
        let roots = aberth_roots(&coefficients)?;

        let mut frequencies: Vec<f64> = roots
            .into_iter()
            .map(|root| {
                if root.im.abs() < REAL_ROOT_SNAP {
                    Complex64::new(root.re, 0.0)
                } else {
                    root
                }
            })
            .filter(|root| root.im >= 0.0)
            .map(|root| root.arg() * sample_rate / (2.0 * PI))
            .collect();
        frequencies.sort_by(|a, b| a.total_cmp(b));
        trace!(order, poles = frequencies.len(), "formant candidates");

        Ok(frequencies
            .into_iter()
            .filter(|&f| self.config.min_hz < f && f < self.config.max_hz)
            .take(self.config.count)
            .collect())
    }
}

/// Linear prediction coefficients `a[0..=order]`, `a[0] = 1`, fitted with Burg's method.
pub fn burg_lpc(samples: &[f64], order: usize) -> Result<Vec<f64>> {
    let n = samples.len();
    if order == 0 {
        return Err(Error::numerical("model order must be non-zero"));
    }
    if n <= order {
        return Err(Error::numerical(format!(
            "{n} samples are too few for a model of order {order}"
        )));
    }

    let mut a = vec![0.0; order + 1];
    a[0] = 1.0;

    // Forward and backward prediction errors.
    let mut forward: Vec<f64> = samples.to_vec();
    let mut backward: Vec<f64> = samples.to_vec();

    for k in 1..=order {
        let mut num = 0.0;
        let mut den = 0.0;
        for i in k..n {
            num += forward[i] * backward[i - 1];
            den += forward[i] * forward[i] + backward[i - 1] * backward[i - 1];
        }
        if den < 1e-30 {
            return Err(Error::numerical(format!(
                "prediction error vanished at order {k}"
            )));
        }
        let reflection = -2.0 * num / den;

        // Walk down so `backward[i - 1]` is still the previous order's value.
        for i in (k..n).rev() {
            let f = forward[i];
            forward[i] = f + reflection * backward[i - 1];
            backward[i] = backward[i - 1] + reflection * f;
        }

        let previous = a.clone();
        for i in 1..k {
            a[i] = previous[i] + reflection * previous[k - i];
        }
        a[k] = reflection;
    }

    if a.iter().any(|c| !c.is_finite()) {
        return Err(Error::numerical("prediction coefficients are not finite"));
    }
    Ok(a)
}

/// `p(z)` and `p'(z)` for `p(z) = a[0] z^n + a[1] z^(n-1) + ... + a[n]`, by Horner's method.
fn eval_polynomial(a: &[f64], z: Complex64) -> (Complex64, Complex64) {
    let mut value = Complex64::new(a[0], 0.0);
    let mut derivative = Complex64::new(0.0, 0.0);
    for &coef in &a[1..] {
        derivative = derivative * z + value;
        value = value * z + coef;
    }
    (value, derivative)
}

/// All roots of the polynomial with coefficients `a` (highest power first), found
/// together with the Aberth–Ehrlich iteration.
pub fn aberth_roots(a: &[f64]) -> Result<Vec<Complex64>> {
    let degree = a.len().saturating_sub(1);
    if degree == 0 {
        return Ok(Vec::new());
    }
    if a[0] == 0.0 {
        return Err(Error::numerical("leading coefficient is zero"));
    }

    // Predictor poles sit just inside the unit circle. Start there, rotated off the
    // real axis so no start point is its own conjugate.
    let radius = 0.9;
    let mut roots: Vec<Complex64> = (0..degree)
        .map(|k| Complex64::from_polar(radius, 2.0 * PI * k as f64 / degree as f64 + 0.4))
        .collect();

    for _ in 0..ROOT_MAX_ITER {
        let mut converged = true;
        for i in 0..degree {
            let z = roots[i];
            let (value, derivative) = eval_polynomial(a, z);
            if value.norm() == 0.0 {
                continue;
            }
            let newton = value / derivative;
            let repulsion: Complex64 = roots
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(_, &other)| (z - other).inv())
                .sum();
            let step = newton / (Complex64::new(1.0, 0.0) - newton * repulsion);
            if !step.is_finite() {
                return Err(Error::numerical("root iteration diverged"));
            }
            roots[i] = z - step;
            if step.norm() > ROOT_TOLERANCE * z.norm().max(1.0) {
                converged = false;
            }
        }
        if converged {
            return Ok(roots);
        }
    }
    Err(Error::numerical(format!(
        "root finding did not converge in {ROOT_MAX_ITER} iterations"
    )))
}
