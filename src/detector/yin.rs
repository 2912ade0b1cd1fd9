//! The YIN pitch tracker is based on the algorithm from the paper
//! *[YIN, a fundamental frequency estimator for speech and music](http://recherche.ircam.fr/equipes/pcm/cheveign/ps/2002_JASA_YIN_proof.pdf)*.
//!
//! Let $S=(s_0,s_1,\ldots,s_N)$ be a discrete signal. The *square difference function* at lag $t$
//! over an integration window of $W$ samples is
//! $$ d(t) = \sum_{i=0}^{W-1} (s_i-s_{i+t})^2. $$
//! Its value depends on volume, so YIN works with the *cumulative mean normalized difference function*,
//! $$ d\'(t) = \begin{cases}1&\text{if }t=0\\\\ d(t) / \left[ \tfrac{1}{t}\sum_{i=1}^t d(i) \right] & \text{otherwise}\end{cases}, $$
//! and takes the first trough of $d\'(t)$ below a threshold as the period.
//!
//! ## Implementation
//! The utterance is centre-padded with zeros and cut into overlapping frames. For every frame
//! $d(t)$ is computed with an [FFT](https://en.wikipedia.org/wiki/Fast_Fourier_transform),
//! normalized, and searched within the lag range of the configured frequency band. When no
//! trough dips below the threshold the global minimum of the range is used instead. The lag is
//! refined with quadratic interpolation.
//!
//! The utterance estimate is the mean over frames that produced a positive, finite pitch.

use rustfft::FftPlanner;
use tracing::trace;

use crate::config::FusionConfig;
use crate::detector::internals::{windowed_square_error, yin_normalize_square_error};
use crate::detector::PitchDetector;
use crate::spectral::center_pad;
use crate::utils::buffer::{new_real_buffer, square_sum};
use crate::utils::peak::{correct_peak, PeakCorrection};

#[derive(Debug, Clone)]
pub struct YinTracker {
    fmin: f64,
    fmax: f64,
    frame_length: usize,
    hop_length: usize,
    threshold: f64,
}

impl YinTracker {
    pub fn new(config: &FusionConfig) -> Self {
        YinTracker {
            fmin: config.fmin,
            fmax: config.fmax,
            frame_length: config.frame_length,
            hop_length: config.hop_length,
            threshold: config.trough_threshold,
        }
    }

    /// Integration window, half a frame.
    fn window_size(&self) -> usize {
        self.frame_length / 2
    }

    /// Lags searched for a period, both ends included.
    fn lag_bounds(&self, sample_rate: f64) -> (usize, usize) {
        let min_lag = ((sample_rate / self.fmax).floor() as usize).max(1);
        let max_lag = ((sample_rate / self.fmin).ceil() as usize)
            .min(self.frame_length - self.window_size() - 1);
        (min_lag, max_lag)
    }

    /// Pitch of every frame. `None` marks frames whose integration window is silent.
    pub fn track(&self, signal: &[f64], sample_rate: f64) -> Vec<Option<f64>> {
        let (min_lag, max_lag) = self.lag_bounds(sample_rate);
        if signal.is_empty() || min_lag + 2 > max_lag {
            return Vec::new();
        }

        let window_size = self.window_size();
        let padded = center_pad(signal, self.frame_length / 2);
        let n_frames = 1 + signal.len() / self.hop_length;

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(self.frame_length);
        let inv_fft = planner.plan_fft_inverse(self.frame_length);
        let mut difference = new_real_buffer::<f64>(window_size);

        (0..n_frames)
            .map(|t| {
                let start = t * self.hop_length;
                let frame = &padded[start..start + self.frame_length];
                // A silent integration window has nothing to compare against.
                if square_sum(&frame[..window_size]) <= 0.0 {
                    return None;
                }

                windowed_square_error(
                    frame,
                    window_size,
                    fft.as_ref(),
                    inv_fft.as_ref(),
                    &mut difference,
                );
                yin_normalize_square_error(&mut difference);

                let lag = self.best_lag(&difference, min_lag, max_lag)?;
                Some(sample_rate / lag)
            })
            .collect()
    }

    /// Fractional lag of the first trough under the threshold, or of the deepest
    /// point in `[min_lag, max_lag]` when no trough gets there.
    fn best_lag(&self, cmndf: &[f64], min_lag: usize, max_lag: usize) -> Option<f64> {
        let region = &cmndf[min_lag..=max_lag];

        let trough = (0..region.len())
            .find(|&i| region[i] < self.threshold && is_trough(region, i))
            .or_else(|| {
                region
                    .iter()
                    .enumerate()
                    .min_by(|a, b| a.1.total_cmp(b.1))
                    .map(|(i, _)| i)
            })?;

        let idx = trough + min_lag;
        let (lag, _) = correct_peak((idx, cmndf[idx]), cmndf, PeakCorrection::Quadratic);
        (lag > 0.0).then_some(lag)
    }
}

/// Local minimum test. The first lag counts when the function still rises after it,
/// so a dip that is already under way at `min_lag` is not skipped.
fn is_trough(region: &[f64], i: usize) -> bool {
    let value = region[i];
    match i {
        0 => region.get(1).map_or(false, |&next| value < next),
        _ => value < region[i - 1] && region.get(i + 1).map_or(true, |&next| value <= next),
    }
}

impl PitchDetector for YinTracker {
    fn utterance_pitch(&self, signal: &[f64], sample_rate: f64) -> Option<f64> {
        let voiced: Vec<f64> = self
            .track(signal, sample_rate)
            .into_iter()
            .flatten()
            .filter(|f| f.is_finite() && *f > 0.0)
            .collect();
        trace!(frames = voiced.len(), "yin voiced frames");
        if voiced.is_empty() {
            return None;
        }
        Some(voiced.iter().sum::<f64>() / voiced.len() as f64)
    }
}
