//! Signal conditioning shared by the streaming and utterance paths.
//!
//! Streaming frames only get their DC offset removed and a Hann window applied.
//! Whole utterances are pre-emphasised and high-passed with a zero-phase
//! Butterworth filter instead.

use crate::config::PreprocessConfig;
use crate::error::Result;
use crate::float::Float;
use crate::utils::buffer::mean;
use crate::utils::filters::HighPassFilter;
use crate::utils::window::{apply, hann};

/// Subtract the mean of `signal`.
pub fn remove_dc<T: Float>(signal: &[T]) -> Vec<T> {
    let mu = mean(signal);
    signal.iter().map(|&s| s - mu).collect()
}

/// First-order pre-emphasis, `y[0] = x[0]`, `y[i] = x[i] - coefficient * x[i - 1]`.
pub fn pre_emphasis(signal: &[f64], coefficient: f64) -> Vec<f64> {
    let mut emphasized = Vec::with_capacity(signal.len());
    if let Some(&first) = signal.first() {
        emphasized.push(first);
    }
    emphasized.extend(signal.windows(2).map(|w| w[1] - coefficient * w[0]));
    emphasized
}

/// Per-frame conditioning for the streaming path.
#[derive(Debug, Clone)]
pub struct FramePreprocessor<T: Float> {
    window: Vec<T>,
}

impl<T: Float> FramePreprocessor<T> {
    pub fn new(frame_size: usize) -> Self {
        FramePreprocessor {
            window: hann(frame_size),
        }
    }

    pub fn frame_size(&self) -> usize {
        self.window.len()
    }

    /// DC removal followed by the Hann window. `frame` must hold exactly one frame.
    pub fn prepare(&self, frame: &[T]) -> Vec<T> {
        let mut prepared = remove_dc(frame);
        apply(&mut prepared, &self.window);
        prepared
    }
}

/// Whole-utterance conditioning: pre-emphasis, then zero-phase high-pass.
#[derive(Debug, Clone)]
pub struct UtterancePreprocessor {
    pre_emphasis: f64,
    highpass: HighPassFilter,
}

impl UtterancePreprocessor {
    pub fn new(config: &PreprocessConfig, sample_rate: f64) -> Result<Self> {
        let highpass = HighPassFilter::butterworth(
            config.highpass_order,
            config.highpass_cutoff_hz,
            sample_rate,
        )?;
        Ok(UtterancePreprocessor {
            pre_emphasis: config.pre_emphasis,
            highpass,
        })
    }

    pub fn process(&self, samples: &[f64]) -> Vec<f64> {
        self.highpass
            .filtfilt(&pre_emphasis(samples, self.pre_emphasis))
    }
}
