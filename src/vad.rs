//! Energy and zero-crossing voice activity gate.
//!
//! Cheap enough to run on every streaming frame before any FFT work.

use crate::config::VadConfig;
use crate::float::{cast, from_usize, Float};
use crate::utils::buffer::{mean_square, sign_changes};

/// `true` if `samples` plausibly contain voice, using the default gate with a
/// custom energy threshold.
pub fn detect_voice_activity<T: Float>(samples: &[T], energy_threshold: f64) -> bool {
    let config = VadConfig {
        energy_threshold,
        ..VadConfig::default()
    };
    VoiceActivityDetector::new(config).is_voiced(samples)
}

#[derive(Debug, Clone)]
pub struct VoiceActivityDetector {
    config: VadConfig,
}

impl VoiceActivityDetector {
    pub fn new(config: VadConfig) -> Self {
        VoiceActivityDetector { config }
    }

    /// Voice has enough energy and a moderate zero-crossing rate: silence crosses
    /// rarely, hiss crosses almost every sample.
    pub fn is_voiced<T: Float>(&self, samples: &[T]) -> bool {
        if samples.len() < self.config.min_samples || samples.is_empty() {
            return false;
        }
        if mean_square(samples) < cast(self.config.energy_threshold) {
            return false;
        }
        let zcr: T = from_usize::<T>(sign_changes(samples)) / from_usize(samples.len());
        cast::<T>(self.config.zcr_low) < zcr && zcr < cast(self.config.zcr_high)
    }
}
