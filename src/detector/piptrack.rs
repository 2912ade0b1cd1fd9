//! Parabolic-interpolated peak tracking over STFT magnitudes.
//!
//! In every frame the bins that are local maxima, stand above a fraction of the
//! frame's loudest bin and lie in `[fmin, fmax)` become pitch candidates. Each
//! candidate's frequency and height are refined with a parabola through its
//! neighbours; the tallest one is the frame's pitch.

use tracing::trace;

use crate::config::FusionConfig;
use crate::detector::PitchDetector;
use crate::spectral::Stft;
use crate::utils::peak::parabolic_shift;

/// An interpolated spectral peak.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralPeak {
    pub frequency: f64,
    pub magnitude: f64,
}

#[derive(Debug, Clone)]
pub struct PeakTracker {
    fmin: f64,
    fmax: f64,
    n_fft: usize,
    hop_length: usize,
    threshold: f64,
}

impl PeakTracker {
    pub fn new(config: &FusionConfig) -> Self {
        PeakTracker {
            fmin: config.fmin,
            fmax: config.fmax,
            n_fft: config.frame_length,
            hop_length: config.hop_length,
            threshold: config.piptrack_threshold,
        }
    }

    /// Strongest peak of every frame, `None` where no bin qualifies.
    pub fn track(&self, signal: &[f64], sample_rate: f64) -> Vec<Option<SpectralPeak>> {
        if signal.is_empty() {
            return Vec::new();
        }
        let stft = Stft::new(self.n_fft, self.hop_length);
        let bin_hz = sample_rate / self.n_fft as f64;

        stft.forward(signal)
            .iter()
            .map(|frame| {
                let magnitudes: Vec<f64> = frame.iter().map(|c| c.norm()).collect();
                self.strongest_peak(&magnitudes, bin_hz)
            })
            .collect()
    }

    fn strongest_peak(&self, magnitudes: &[f64], bin_hz: f64) -> Option<SpectralPeak> {
        let floor = self.threshold * magnitudes.iter().copied().fold(0.0, f64::max);
        let gated = |k: usize| {
            let m = magnitudes[k];
            if m > floor {
                m
            } else {
                0.0
            }
        };

        let n = magnitudes.len();
        (1..n.saturating_sub(1))
            .filter(|&k| {
                let f = k as f64 * bin_hz;
                self.fmin <= f && f < self.fmax
            })
            .filter(|&k| gated(k) > gated(k - 1) && gated(k) >= gated(k + 1))
            .map(|k| {
                let (left, center, right) = (magnitudes[k - 1], magnitudes[k], magnitudes[k + 1]);
                let shift = parabolic_shift(left, center, right);
                SpectralPeak {
                    frequency: (k as f64 + shift) * bin_hz,
                    magnitude: center + 0.25 * (right - left) * shift,
                }
            })
            .fold(None, |best: Option<SpectralPeak>, peak| match best {
                Some(b) if !(peak.magnitude > b.magnitude) => Some(b),
                _ => Some(peak),
            })
            .filter(|peak| peak.frequency > 0.0)
    }
}

impl PitchDetector for PeakTracker {
    fn utterance_pitch(&self, signal: &[f64], sample_rate: f64) -> Option<f64> {
        let pitches: Vec<f64> = self
            .track(signal, sample_rate)
            .into_iter()
            .flatten()
            .map(|peak| peak.frequency)
            .collect();
        trace!(frames = pitches.len(), "piptrack voiced frames");
        if pitches.is_empty() {
            return None;
        }
        Some(pitches.iter().sum::<f64>() / pitches.len() as f64)
    }
}
