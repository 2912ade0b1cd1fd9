//! Spectra of real frames and the short-time Fourier transform.
//!
//! Only the non-negative half of each spectrum is kept, as for a real FFT:
//! a frame of `n` samples gives `n / 2 + 1` bins spaced `sample_rate / n` Hz apart.

use std::ops::Range;
use std::sync::Arc;

use rustfft::num_complex::{Complex, Complex64};
use rustfft::{Fft, FftPlanner};

use crate::float::{from_usize, Float};
use crate::utils::buffer::{copy_real_to_complex, new_complex_buffer, ComplexComponent};
use crate::utils::window::periodic_hann;

/// The non-negative frequency bins of one real frame.
#[derive(Debug, Clone)]
pub struct SpectralFrame<T: Float> {
    pub bins: Vec<Complex<T>>,
    /// Width of one bin in Hz.
    pub bin_hz: T,
}

impl<T: Float> SpectralFrame<T> {
    /// Transform `frame` with a forward FFT planned for its length.
    pub fn from_frame(frame: &[T], sample_rate: T, fft: &dyn Fft<T>) -> Self {
        let n = fft.len();
        let mut buffer = new_complex_buffer(n);
        copy_real_to_complex(&frame[..frame.len().min(n)], &mut buffer, ComplexComponent::Re);
        fft.process(&mut buffer);
        buffer.truncate(n / 2 + 1);
        SpectralFrame {
            bins: buffer,
            bin_hz: sample_rate / from_usize(n),
        }
    }

    pub fn magnitudes(&self) -> Vec<T> {
        self.bins.iter().map(|c| c.norm()).collect()
    }

    pub fn frequency(&self, bin: usize) -> T {
        from_usize::<T>(bin) * self.bin_hz
    }

    /// Indices of the bins whose centre frequency lies in `[low, high]`.
    pub fn band(&self, low: T, high: T) -> Range<usize> {
        bin_range(self.bins.len(), self.bin_hz, low, high)
    }
}

/// Contiguous run of bins, out of `n_bins` spaced `bin_hz` apart, whose centre
/// frequency lies in `[low, high]`. Empty when no bin qualifies.
pub fn bin_range<T: Float>(n_bins: usize, bin_hz: T, low: T, high: T) -> Range<usize> {
    let inside = |k: &usize| {
        let f = from_usize::<T>(*k) * bin_hz;
        f >= low && f <= high
    };
    let start = (0..n_bins).find(inside).unwrap_or(n_bins);
    let end = (start..n_bins).find(|k| !inside(k)).unwrap_or(n_bins);
    start..end
}

/// Short-time Fourier transform with a periodic Hann window and centred frames.
///
/// Frame `t` covers samples `[t * hop - n_fft / 2, t * hop + n_fft / 2)` of the
/// input; samples outside the signal are zero.
pub struct Stft {
    n_fft: usize,
    hop: usize,
    window: Vec<f64>,
    fft: Arc<dyn Fft<f64>>,
    ifft: Arc<dyn Fft<f64>>,
}

impl Stft {
    pub fn new(n_fft: usize, hop: usize) -> Self {
        let mut planner = FftPlanner::new();
        Stft {
            n_fft,
            hop,
            window: periodic_hann(n_fft),
            fft: planner.plan_fft_forward(n_fft),
            ifft: planner.plan_fft_inverse(n_fft),
        }
    }

    pub fn n_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Number of centred frames covering `length` samples.
    pub fn n_frames(&self, length: usize) -> usize {
        1 + length / self.hop
    }

    /// Complex spectrogram, indexed `[frame][bin]`.
    pub fn forward(&self, signal: &[f64]) -> Vec<Vec<Complex64>> {
        let padded = center_pad(signal, self.n_fft / 2);
        let n_frames = self.n_frames(signal.len());
        let mut buffer = new_complex_buffer::<f64>(self.n_fft);

        (0..n_frames)
            .map(|t| {
                let start = t * self.hop;
                for (i, slot) in buffer.iter_mut().enumerate() {
                    let sample = padded.get(start + i).copied().unwrap_or(0.0);
                    *slot = Complex64::new(sample * self.window[i], 0.0);
                }
                self.fft.process(&mut buffer);
                buffer[..self.n_bins()].to_vec()
            })
            .collect()
    }

    /// Weighted overlap-add inverse of [`Stft::forward`], trimmed to `length` samples.
    pub fn inverse(&self, frames: &[Vec<Complex64>], length: usize) -> Vec<f64> {
        let n = self.n_fft;
        let total = n + self.hop * frames.len().saturating_sub(1);
        let mut output = vec![0.0; total];
        let mut window_sum = vec![0.0; total];
        let mut buffer = new_complex_buffer::<f64>(n);
        let scale = 1.0 / n as f64;

        for (t, bins) in frames.iter().enumerate() {
            hermitian_fill(bins, &mut buffer);
            self.ifft.process(&mut buffer);
            let start = t * self.hop;
            for i in 0..n {
                let w = self.window[i];
                output[start + i] += buffer[i].re * scale * w;
                window_sum[start + i] += w * w;
            }
        }

        for (y, &w) in output.iter_mut().zip(window_sum.iter()) {
            if w > f64::MIN_POSITIVE {
                *y /= w;
            }
        }

        let offset = n / 2;
        (0..length)
            .map(|i| output.get(offset + i).copied().unwrap_or(0.0))
            .collect()
    }
}

/// Rebuild a full spectrum from its non-negative half.
fn hermitian_fill(half: &[Complex64], full: &mut [Complex64]) {
    let n = full.len();
    for (k, slot) in full.iter_mut().enumerate() {
        *slot = if k < half.len() {
            half[k]
        } else {
            half.get(n - k).map(|c| c.conj()).unwrap_or_default()
        };
    }
    // The DC and Nyquist bins of a real signal carry no imaginary part.
    full[0].im = 0.0;
    if n % 2 == 0 && n / 2 < full.len() {
        full[n / 2].im = 0.0;
    }
}

/// Zero-pad `pad` samples on both sides.
pub fn center_pad(signal: &[f64], pad: usize) -> Vec<f64> {
    let mut padded = vec![0.0; signal.len() + 2 * pad];
    padded[pad..pad + signal.len()].copy_from_slice(signal);
    padded
}
