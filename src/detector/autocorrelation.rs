//! Whole-signal autocorrelation pitch.
//!
//! The utterance is correlated with itself over its full length, and the lag of the
//! highest value inside the band's period range is taken as the period. Coarse on
//! its own, but immune to the framing artifacts of the frame-based trackers.

use tracing::trace;

use crate::config::FusionConfig;
use crate::detector::internals::linear_autocorrelation;
use crate::detector::PitchDetector;
use crate::utils::buffer::argmax;

#[derive(Debug, Clone)]
pub struct AutocorrelationEstimator {
    fmin: f64,
    fmax: f64,
}

impl AutocorrelationEstimator {
    pub fn new(config: &FusionConfig) -> Self {
        AutocorrelationEstimator {
            fmin: config.autocorrelation_fmin,
            fmax: config.autocorrelation_fmax,
        }
    }

    /// Lags `[sample_rate / fmax, sample_rate / fmin)`, truncated to whole samples.
    pub fn period_range(&self, sample_rate: f64) -> std::ops::Range<usize> {
        let min_period = ((sample_rate / self.fmax) as usize).max(1);
        let max_period = (sample_rate / self.fmin) as usize;
        min_period..max_period
    }
}

impl PitchDetector for AutocorrelationEstimator {
    fn utterance_pitch(&self, signal: &[f64], sample_rate: f64) -> Option<f64> {
        let range = self.period_range(sample_rate);
        if range.is_empty() || range.end >= signal.len() {
            return None;
        }

        let autocorr = linear_autocorrelation(signal);
        let (idx, peak) = argmax(&autocorr[range.clone()])?;
        if !(peak > 0.0) {
            return None;
        }
        let period = idx + range.start;
        trace!(period, "whole-signal autocorrelation peak");
        Some(sample_rate / period as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    const SAMPLE_RATE: f64 = 22050.0;

    #[test]
    fn period_range_truncates() {
        let estimator = AutocorrelationEstimator::new(&FusionConfig::default());
        assert_eq!(estimator.period_range(SAMPLE_RATE), 44..441);
    }

    #[test]
    fn finds_the_period_of_a_tone() {
        let estimator = AutocorrelationEstimator::new(&FusionConfig::default());
        // 22050 / 225 = 98 samples exactly.
        let signal: Vec<f64> = (0..11025)
            .map(|i| (2.0 * PI * 225.0 * i as f64 / SAMPLE_RATE).sin())
            .collect();
        let pitch = estimator.utterance_pitch(&signal, SAMPLE_RATE).unwrap();
        assert!((pitch - 225.0).abs() < 1e-9, "got {pitch}");
    }

    #[test]
    fn signal_shorter_than_the_longest_period() {
        let estimator = AutocorrelationEstimator::new(&FusionConfig::default());
        assert_eq!(estimator.utterance_pitch(&vec![0.5; 441], SAMPLE_RATE), None);
        assert_eq!(estimator.utterance_pitch(&vec![0.0; 4000], SAMPLE_RATE), None);
    }
}
