//! Harmonic-to-noise ratio through harmonic/percussive separation.
//!
//! Stable partials form horizontal ridges in a magnitude spectrogram, noise and
//! transients form vertical ones. Median filtering along each axis estimates the
//! two layers, soft masks split the spectrogram between them, and the ratio of
//! their RMS levels is the HNR.

use tracing::{trace, warn};

use crate::config::HnrConfig;
use crate::error::{Error, Result};
use crate::spectral::{center_pad, Stft};
use crate::utils::buffer::mean;

/// A signal split into its harmonic and percussive layers, each as long as the input.
#[derive(Debug, Clone)]
pub struct HarmonicPercussive {
    pub harmonic: Vec<f64>,
    pub percussive: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct HnrAnalyzer {
    config: HnrConfig,
}

impl HnrAnalyzer {
    pub fn new(config: HnrConfig) -> Self {
        HnrAnalyzer { config }
    }

    /// HNR in dB. `noiseless_db` when the percussive layer is silent, 0 when the
    /// harmonic layer is, or when the decomposition fails.
    pub fn analyze(&self, signal: &[f64]) -> f64 {
        let layers = match self.separate(signal) {
            Ok(layers) => layers,
            Err(err) => {
                warn!(%err, "harmonic/percussive separation failed");
                return 0.0;
            }
        };

        let harmonic = mean(&frame_rms(&layers.harmonic, self.config.n_fft, self.config.hop_length));
        let percussive = mean(&frame_rms(&layers.percussive, self.config.n_fft, self.config.hop_length));
        trace!(harmonic, percussive, "layer rms");

        if percussive == 0.0 {
            return self.config.noiseless_db;
        }
        if harmonic == 0.0 {
            return 0.0;
        }
        20.0 * (harmonic / percussive).log10()
    }

    /// Median-filtering harmonic/percussive source separation.
    pub fn separate(&self, signal: &[f64]) -> Result<HarmonicPercussive> {
        if signal.is_empty() {
            return Err(Error::numerical("cannot separate an empty signal"));
        }
        let stft = Stft::new(self.config.n_fft, self.config.hop_length);
        let spectrogram = stft.forward(signal);
        let magnitude: Vec<Vec<f64>> = spectrogram
            .iter()
            .map(|frame| frame.iter().map(|c| c.norm()).collect())
            .collect();

        let harmonic = median_filter_time(&magnitude, self.config.kernel_size);
        let percussive = median_filter_frequency(&magnitude, self.config.kernel_size);

        let mut harmonic_spec = spectrogram.clone();
        let mut percussive_spec = spectrogram;
        for t in 0..magnitude.len() {
            for k in 0..magnitude[t].len() {
                let (h, p) = (harmonic[t][k], percussive[t][k]);
                let mask_h = soft_mask(h, p * self.config.margin, self.config.mask_power);
                let mask_p = soft_mask(p, h * self.config.margin, self.config.mask_power);
                harmonic_spec[t][k] *= mask_h;
                percussive_spec[t][k] *= mask_p;
            }
        }

        let layers = HarmonicPercussive {
            harmonic: stft.inverse(&harmonic_spec, signal.len()),
            percussive: stft.inverse(&percussive_spec, signal.len()),
        };
        if layers
            .harmonic
            .iter()
            .chain(layers.percussive.iter())
            .any(|v| !v.is_finite())
        {
            return Err(Error::numerical("separated layers are not finite"));
        }
        Ok(layers)
    }
}

/// Wiener-style mask for `x` against `reference`. Bins where both are negligible
/// are split evenly.
fn soft_mask(x: f64, reference: f64, power: f64) -> f64 {
    let z = x.max(reference);
    if z < f64::MIN_POSITIVE {
        return 0.5;
    }
    let mask = (x / z).powf(power);
    let ref_mask = (reference / z).powf(power);
    mask / (mask + ref_mask)
}

/// Index into `0..len` of position `i`, mirrored about the edges (`d c b a | a b c d`).
fn reflect(i: isize, len: usize) -> usize {
    let period = 2 * len as isize;
    let j = i.rem_euclid(period);
    if j < len as isize {
        j as usize
    } else {
        (period - 1 - j) as usize
    }
}

fn median_of(window: &mut [f64]) -> f64 {
    let mid = window.len() / 2;
    let (_, median, _) = window.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
    *median
}

/// Running median of each frequency bin across frames.
fn median_filter_time(magnitude: &[Vec<f64>], kernel: usize) -> Vec<Vec<f64>> {
    let n_frames = magnitude.len();
    let half = (kernel / 2) as isize;
    let mut window = vec![0.0; kernel];
    (0..n_frames)
        .map(|t| {
            (0..magnitude[t].len())
                .map(|k| {
                    for (slot, offset) in window.iter_mut().zip(-half..) {
                        *slot = magnitude[reflect(t as isize + offset, n_frames)][k];
                    }
                    median_of(&mut window)
                })
                .collect()
        })
        .collect()
}

/// Running median across the bins of each frame.
fn median_filter_frequency(magnitude: &[Vec<f64>], kernel: usize) -> Vec<Vec<f64>> {
    let half = (kernel / 2) as isize;
    let mut window = vec![0.0; kernel];
    magnitude
        .iter()
        .map(|frame| {
            let n_bins = frame.len();
            (0..n_bins)
                .map(|k| {
                    for (slot, offset) in window.iter_mut().zip(-half..) {
                        *slot = frame[reflect(k as isize + offset, n_bins)];
                    }
                    median_of(&mut window)
                })
                .collect()
        })
        .collect()
}

/// RMS of centred, zero-padded frames of `frame_length` samples every `hop` samples.
pub fn frame_rms(signal: &[f64], frame_length: usize, hop: usize) -> Vec<f64> {
    let padded = center_pad(signal, frame_length / 2);
    let n_frames = 1 + signal.len() / hop;
    (0..n_frames)
        .map(|t| {
            let start = t * hop;
            let end = (start + frame_length).min(padded.len());
            let energy: f64 = padded[start..end].iter().map(|s| s * s).sum();
            (energy / frame_length as f64).sqrt()
        })
        .collect()
}
