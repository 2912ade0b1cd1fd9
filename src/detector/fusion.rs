//! Whole-utterance pitch from several trackers.
//!
//! Each tracker tends to fail differently: YIN and autocorrelation lock onto
//! subharmonics, spectral peak picking onto the second harmonic. Every usable
//! estimate is moved by an octave when that lands it in a more plausible voice
//! range, and the median of the corrected values is the utterance pitch.

use tracing::debug;

use crate::config::{FusionConfig, OctaveBand};
use crate::detector::autocorrelation::AutocorrelationEstimator;
use crate::detector::piptrack::PeakTracker;
use crate::detector::yin::YinTracker;
use crate::detector::PitchDetector;
use crate::utils::buffer::median;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PitchSource {
    Yin,
    Piptrack,
    Autocorrelation,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchCandidate {
    pub source: PitchSource,
    pub frequency: f64,
}

/// Estimates gathered for one utterance, in tracker order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PitchCandidateSet {
    candidates: Vec<PitchCandidate>,
}

impl PitchCandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, source: PitchSource, frequency: f64) {
        self.candidates.push(PitchCandidate { source, frequency });
    }

    pub fn iter(&self) -> impl Iterator<Item = &PitchCandidate> {
        self.candidates.iter()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn frequencies(&self) -> Vec<f64> {
        self.candidates.iter().map(|c| c.frequency).collect()
    }
}

impl FromIterator<(PitchSource, f64)> for PitchCandidateSet {
    fn from_iter<I: IntoIterator<Item = (PitchSource, f64)>>(iter: I) -> Self {
        let mut set = PitchCandidateSet::new();
        for (source, frequency) in iter {
            set.push(source, frequency);
        }
        set
    }
}

/// Score of the first band containing `frequency`, 0 when none does.
pub fn octave_score(frequency: f64, bands: &[OctaveBand]) -> u32 {
    bands
        .iter()
        .find(|band| band.contains(frequency))
        .map_or(0, |band| band.score)
}

/// Best scoring of `frequency`, its lower octave and its upper octave. Ties keep
/// the earlier candidate, so an unscored estimate is left alone.
pub fn correct_octave(frequency: f64, bands: &[OctaveBand]) -> f64 {
    let candidates = [frequency, frequency / 2.0, frequency * 2.0];
    let mut best = candidates[0];
    let mut best_score = octave_score(best, bands);
    for &candidate in &candidates[1..] {
        let score = octave_score(candidate, bands);
        if score > best_score {
            best = candidate;
            best_score = score;
        }
    }
    best
}

pub struct PitchFusion {
    yin: YinTracker,
    piptrack: PeakTracker,
    autocorrelation: AutocorrelationEstimator,
    bands: Vec<OctaveBand>,
}

impl PitchFusion {
    pub fn new(config: &FusionConfig) -> Self {
        PitchFusion {
            yin: YinTracker::new(config),
            piptrack: PeakTracker::new(config),
            autocorrelation: AutocorrelationEstimator::new(config),
            bands: config.octave_bands.clone(),
        }
    }

    /// Usable estimate of every tracker.
    pub fn candidates(&self, signal: &[f64], sample_rate: f64) -> PitchCandidateSet {
        let detectors: [(PitchSource, &dyn PitchDetector); 3] = [
            (PitchSource::Yin, &self.yin),
            (PitchSource::Piptrack, &self.piptrack),
            (PitchSource::Autocorrelation, &self.autocorrelation),
        ];
        detectors
            .iter()
            .filter_map(|(source, detector)| {
                detector
                    .utterance_pitch(signal, sample_rate)
                    .filter(|f| f.is_finite() && *f > 0.0)
                    .map(|f| (*source, f))
            })
            .collect()
    }

    /// Median of the octave-corrected candidates; 0 when there are none.
    pub fn fuse(&self, candidates: &PitchCandidateSet) -> f64 {
        let corrected: Vec<f64> = candidates
            .iter()
            .map(|c| correct_octave(c.frequency, &self.bands))
            .collect();
        let pitch = median(&corrected).unwrap_or(0.0);
        debug!(
            estimates = ?candidates.frequencies(),
            corrected = ?corrected,
            pitch,
            "fused utterance pitch"
        );
        pitch
    }

    pub fn estimate(&self, signal: &[f64], sample_rate: f64) -> f64 {
        self.fuse(&self.candidates(signal, sample_rate))
    }
}
