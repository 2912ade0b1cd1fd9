//! Low-latency single-frame pitch estimators for streaming use.
//!
//! Every method looks at exactly one frame of `frame_size` samples (the zero-crossing
//! method at a shorter chunk) and answers `0` when it cannot find a pitch. Nothing
//! here returns an error once the estimator is built.
//!
//! # Example
//! ```
//! use voice_features::config::FastPitchConfig;
//! use voice_features::detector::fast::FastPitchEstimator;
//! use voice_features::detector::PitchMethod;
//!
//! const SAMPLE_RATE: f64 = 22050.0;
//! const SIZE: usize = 1024;
//!
//! let signal: Vec<f64> = (0..SIZE)
//!     .map(|i| (2.0 * std::f64::consts::PI * 440.0 * i as f64 / SAMPLE_RATE).sin())
//!     .collect();
//!
//! let estimator = FastPitchEstimator::new(SAMPLE_RATE, SIZE, FastPitchConfig::default()).unwrap();
//! let pitch = estimator.get_pitch(&signal, PitchMethod::Autocorrelation);
//! assert!((pitch - 440.0).abs() < 440.0 * 0.06);
//! ```

use std::ops::Range;
use std::sync::Arc;

use rustfft::{Fft, FftPlanner};
use tracing::trace;

use crate::config::{AnalyzerConfig, FastPitchConfig};
use crate::detector::internals::autocorrelation;
use crate::detector::{PitchEstimate, PitchMethod};
use crate::error::{Error, Result};
use crate::float::{cast, from_usize, Float};
use crate::preprocess::{remove_dc, FramePreprocessor};
use crate::spectral::{bin_range, SpectralFrame};
use crate::utils::buffer::{argmax, mean_square, sign_changes, std_dev};
use crate::utils::peak::detect_peaks;

/// Highest autocorrelation peak in the period range of one frame.
struct AutocorrelationPeak<T> {
    period: usize,
    peak: T,
    zero_lag: T,
}

/// Single-frame pitch estimation with state precomputed for one sample rate and
/// frame size. Immutable once built; share it freely between threads.
pub struct FastPitchEstimator<T: Float> {
    sample_rate: T,
    frame_size: usize,
    config: FastPitchConfig,
    min_period: usize,
    max_period: usize,
    preprocessor: FramePreprocessor<T>,
    fft: Arc<dyn Fft<T>>,
    inv_fft: Arc<dyn Fft<T>>,
    /// Spectrum bins inside `[min_freq, max_freq]`.
    band: Range<usize>,
}

impl<T: Float> FastPitchEstimator<T> {
    pub fn new(sample_rate: f64, frame_size: usize, config: FastPitchConfig) -> Result<Self> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(Error::configuration(format!(
                "sample rate must be positive, got {sample_rate}"
            )));
        }
        if frame_size == 0 {
            return Err(Error::configuration("frame size must be non-zero"));
        }
        config.validate()?;

        let min_period = ((sample_rate / config.max_freq).round() as usize).max(1);
        let max_period = ((sample_rate / config.min_freq).round() as usize).min(frame_size);

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(frame_size);
        let inv_fft = planner.plan_fft_inverse(frame_size);

        let sample_rate: T = cast(sample_rate);
        let bin_hz = sample_rate / from_usize(frame_size);
        let band = bin_range(
            frame_size / 2 + 1,
            bin_hz,
            cast(config.min_freq),
            cast(config.max_freq),
        );

        Ok(FastPitchEstimator {
            sample_rate,
            frame_size,
            config,
            min_period,
            max_period,
            preprocessor: FramePreprocessor::new(frame_size),
            fft,
            inv_fft,
            band,
        })
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn sample_rate(&self) -> T {
        self.sample_rate
    }

    /// Lag range searched by the autocorrelation method, `[min_period, max_period)`.
    pub fn period_range(&self) -> Range<usize> {
        self.min_period..self.max_period
    }

    /// Pitch of `frame` in Hz using `method`, or 0 when none is found.
    pub fn get_pitch(&self, frame: &[T], method: PitchMethod) -> T {
        match method {
            PitchMethod::Autocorrelation => self.autocorrelation_pitch(frame),
            PitchMethod::HarmonicProductSpectrum => self.hps_pitch(frame),
            PitchMethod::ZeroCrossing => self.zero_crossing_pitch(frame),
        }
    }

    /// Period of the strongest autocorrelation peak in the period range, not counting
    /// the lobe around lag 0. Rejected below `autocorrelation_threshold` times the
    /// zero-lag energy.
    pub fn autocorrelation_pitch(&self, frame: &[T]) -> T {
        let Some(frame) = self.full_frame(frame) else {
            return T::zero();
        };
        if self.is_silent(frame) {
            return T::zero();
        }
        let prepared = self.preprocessor.prepare(frame);
        match self.autocorrelation_peak(&prepared) {
            Some(found)
                if found.peak >= cast::<T>(self.config.autocorrelation_threshold) * found.zero_lag =>
            {
                self.sample_rate / from_usize(found.period)
            }
            _ => T::zero(),
        }
    }

    /// Harmonic product spectrum with the fundamental and a half-rate copy.
    pub fn hps_pitch(&self, frame: &[T]) -> T {
        let Some(frame) = self.full_frame(frame) else {
            return T::zero();
        };
        if self.is_silent(frame) {
            return T::zero();
        }
        let prepared = self.preprocessor.prepare(frame);
        let spectrum = SpectralFrame::from_frame(&prepared, self.sample_rate, self.fft.as_ref());
        let magnitudes = spectrum.magnitudes();
        let restricted = &magnitudes[self.band.clone()];

        let Some((_, max_magnitude)) = argmax(restricted) else {
            return T::zero();
        };
        if !(max_magnitude > T::zero()) {
            return T::zero();
        }

        let product: Vec<T> = if restricted.len() > 2 {
            restricted
                .iter()
                .enumerate()
                .map(|(i, &m)| m * half_rate_value(restricted, i))
                .collect()
        } else {
            restricted.to_vec()
        };

        match argmax(&product) {
            Some((idx, value)) if value >= cast::<T>(self.config.hps_threshold) * max_magnitude => {
                trace!(bin = self.band.start + idx, "harmonic product peak");
                spectrum.frequency(self.band.start + idx)
            }
            _ => T::zero(),
        }
    }

    /// Crossing count of the raw, DC-removed leading chunk. The coarsest method;
    /// works on frames shorter than `frame_size`.
    pub fn zero_crossing_pitch(&self, frame: &[T]) -> T {
        if frame.len() < self.config.zero_crossing_min_samples {
            return T::zero();
        }
        let chunk = remove_dc(&frame[..frame.len().min(self.config.zero_crossing_chunk)]);
        if std_dev(&chunk) < cast(self.config.silence_std) {
            return T::zero();
        }

        let crossings = sign_changes(&chunk);
        let frequency = from_usize::<T>(crossings) * self.sample_rate
            / from_usize(2 * chunk.len());
        trace!(crossings, samples = chunk.len(), "zero crossings");

        if frequency < cast(self.config.min_freq) || frequency > cast(self.config.max_freq) {
            T::zero()
        } else {
            frequency
        }
    }

    /// Autocorrelation pitch along with the normalized peak height as confidence.
    pub fn pitch_with_confidence(&self, frame: &[T]) -> PitchEstimate<T> {
        let Some(frame) = self.full_frame(frame) else {
            return PitchEstimate::unvoiced();
        };
        if self.is_silent(frame) {
            return PitchEstimate::unvoiced();
        }
        let prepared = self.preprocessor.prepare(frame);
        if mean_square(&prepared) < cast(self.config.energy_floor) {
            return PitchEstimate::unvoiced();
        }
        let Some(found) = self.autocorrelation_peak(&prepared) else {
            return PitchEstimate::unvoiced();
        };

        let confidence = (found.peak / found.zero_lag).max(T::zero()).min(T::one());
        let voiced = confidence > cast(self.config.voicing_threshold);
        PitchEstimate {
            frequency: if voiced {
                self.sample_rate / from_usize(found.period)
            } else {
                T::zero()
            },
            confidence,
            voiced,
        }
    }

    /// One autocorrelation pitch per frame, in input order.
    pub fn process_stream<F: AsRef<[T]>>(&self, frames: &[F]) -> Vec<T> {
        frames
            .iter()
            .map(|frame| self.autocorrelation_pitch(frame.as_ref()))
            .collect()
    }

    fn full_frame<'a>(&self, frame: &'a [T]) -> Option<&'a [T]> {
        frame.get(..self.frame_size)
    }

    fn is_silent(&self, frame: &[T]) -> bool {
        std_dev(frame) < cast(self.config.silence_std)
    }

    fn autocorrelation_peak(&self, prepared: &[T]) -> Option<AutocorrelationPeak<T>> {
        // A transform of exactly `frame_size` makes this the circular autocorrelation.
        let autocorr = autocorrelation(prepared, self.fft.as_ref(), self.inv_fft.as_ref());
        let zero_lag = autocorr[0];
        if !(zero_lag > T::zero()) {
            return None;
        }
        // Positive lobes only start after a negative crossing, which leaves out the
        // lobe around lag 0.
        let (period, peak) = detect_peaks(&autocorr)
            .filter(|(lag, _)| self.period_range().contains(lag))
            .fold(None, |best: Option<(usize, T)>, (lag, value)| match best {
                Some((_, top)) if top >= value => best,
                _ => Some((lag, value)),
            })?;
        Some(AutocorrelationPeak {
            period,
            peak,
            zero_lag,
        })
    }
}

/// Value at bin `i` of the spectrum linearly interpolated from its even-indexed bins,
/// held constant past the last one.
fn half_rate_value<T: Float>(magnitudes: &[T], i: usize) -> T {
    if i % 2 == 0 {
        magnitudes[i]
    } else if i + 1 < magnitudes.len() {
        (magnitudes[i - 1] + magnitudes[i + 1]) / cast(2.0)
    } else {
        magnitudes[i - 1]
    }
}

/// Autocorrelation pitch of each frame with a default estimator for `sample_rate`.
pub fn process_stream<T: Float, F: AsRef<[T]>>(frames: &[F], sample_rate: f64) -> Result<Vec<T>> {
    let defaults = AnalyzerConfig::with_sample_rate(sample_rate);
    let estimator = FastPitchEstimator::new(sample_rate, defaults.frame_size, defaults.fast)?;
    Ok(estimator.process_stream(frames))
}
