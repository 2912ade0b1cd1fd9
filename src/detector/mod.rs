//! Pitch estimators.
//!
//! Two families live here. [fast] holds single-frame methods cheap enough for a
//! streaming loop. The whole-utterance trackers ([yin], [piptrack],
//! [autocorrelation]) each give one estimate per utterance; [fusion] corrects
//! their octave errors and takes the median.

use serde::{Deserialize, Serialize};

use crate::float::Float;

pub mod autocorrelation;
pub mod fast;
pub mod fusion;
pub mod internals;
pub mod piptrack;
pub mod yin;

/// Selects one of the single-frame streaming methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PitchMethod {
    Autocorrelation,
    HarmonicProductSpectrum,
    ZeroCrossing,
}

/// A single-frame pitch estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PitchEstimate<T> {
    /// Frequency in Hz, 0 when unvoiced.
    pub frequency: T,
    /// Clipped to `[0, 1]`.
    pub confidence: T,
    pub voiced: bool,
}

impl<T: Float> PitchEstimate<T> {
    pub fn unvoiced() -> Self {
        PitchEstimate {
            frequency: T::zero(),
            confidence: T::zero(),
            voiced: false,
        }
    }
}

/// A method that estimates one pitch for a whole utterance.
///
/// Implementations return `None` when they find no usable periodicity; they
/// never fail.
pub trait PitchDetector {
    fn utterance_pitch(&self, signal: &[f64], sample_rate: f64) -> Option<f64>;
}
