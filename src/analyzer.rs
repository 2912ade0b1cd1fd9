//! The caller-owned entry point.
//!
//! A [VoiceAnalyzer] is built once per sample rate and configuration. Building it
//! validates the configuration and plans everything that depends only on it
//! (filter coefficients, windows, FFT plans, period bounds); calls then only
//! allocate their own scratch buffers. It holds no mutable state, so one instance
//! can serve any number of threads.
//!
//! # Example
//! ```
//! use voice_features::analyzer::VoiceAnalyzer;
//! use voice_features::config::AnalyzerConfig;
//! use voice_features::detector::PitchMethod;
//!
//! let analyzer = VoiceAnalyzer::<f32>::new(AnalyzerConfig::with_sample_rate(16000.0)).unwrap();
//!
//! let frame: Vec<f32> = (0..1024)
//!     .map(|i| (2.0 * std::f32::consts::PI * 200.0 * i as f32 / 16000.0).sin())
//!     .collect();
//! let pitch = analyzer.fast_pitch(&frame, PitchMethod::Autocorrelation);
//! assert!((pitch - 200.0).abs() < 12.0);
//! ```

use tracing::{debug, warn};

use crate::audio::{samples_from_bytes, ByteOrder};
use crate::config::AnalyzerConfig;
use crate::debug_audio::DebugAudioSink;
use crate::detector::fast::FastPitchEstimator;
use crate::detector::fusion::PitchFusion;
use crate::detector::{PitchEstimate, PitchMethod};
use crate::error::{Error, Result};
use crate::float::{cast, widen, Float};
use crate::formant::FormantExtractor;
use crate::hnr::HnrAnalyzer;
use crate::preprocess::UtterancePreprocessor;
use crate::report::{AnalysisReport, AnalysisResult};
use crate::vad::VoiceActivityDetector;

pub struct VoiceAnalyzer<T: Float = f32> {
    config: AnalyzerConfig,
    preprocessor: UtterancePreprocessor,
    fast: FastPitchEstimator<T>,
    vad: VoiceActivityDetector,
    fusion: PitchFusion,
    formants: FormantExtractor,
    hnr: HnrAnalyzer,
}

impl<T: Float> VoiceAnalyzer<T> {
    pub fn new(config: AnalyzerConfig) -> Result<Self> {
        config.validate()?;
        let sample_rate = config.sample_rate;
        Ok(VoiceAnalyzer {
            preprocessor: UtterancePreprocessor::new(&config.preprocess, sample_rate)?,
            fast: FastPitchEstimator::new(sample_rate, config.frame_size, config.fast.clone())?,
            vad: VoiceActivityDetector::new(config.vad.clone()),
            fusion: PitchFusion::new(&config.fusion),
            formants: FormantExtractor::new(config.formant.clone()),
            hnr: HnrAnalyzer::new(config.hnr.clone()),
            config,
        })
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> f64 {
        self.config.sample_rate
    }

    /// Pitch, formants and HNR of a whole utterance.
    ///
    /// Fails only on input that cannot be analysed at all: an empty buffer or one
    /// with non-finite samples. An utterance without pitch yields `pitch_hz == 0`.
    pub fn analyze_utterance(&self, samples: &[T]) -> Result<AnalysisResult> {
        if samples.is_empty() {
            return Err(Error::invalid_input("empty sample buffer"));
        }
        if let Some(i) = samples.iter().position(|s| !s.is_finite()) {
            return Err(Error::invalid_input(format!("sample {i} is not finite")));
        }

        let raw: Vec<f64> = samples.iter().map(|&s| widen(s)).collect();
        let signal = self.preprocessor.process(&raw);
        let sample_rate = self.config.sample_rate;

        let (pitch_hz, (formants, hnr_db)) = rayon::join(
            || self.fusion.estimate(&signal, sample_rate),
            || {
                rayon::join(
                    || self.formants.extract(&signal, sample_rate),
                    || self.hnr.analyze(&signal),
                )
            },
        );
        debug!(pitch_hz, ?formants, hnr_db, samples = samples.len(), "utterance analysed");

        Ok(AnalysisResult {
            pitch_hz,
            formants,
            hnr_db,
        })
    }

    /// [`analyze_utterance`](Self::analyze_utterance) folded into its serializable report.
    pub fn analyze_report(&self, samples: &[T]) -> AnalysisReport {
        self.analyze_utterance(samples).into()
    }

    /// Decode a host byte buffer and analyse it. When a sink is given, the decoded
    /// samples are persisted first; a failing sink is logged and otherwise ignored.
    pub fn analyze_bytes(
        &self,
        bytes: &[u8],
        order: ByteOrder,
        sink: Option<&dyn DebugAudioSink>,
    ) -> AnalysisReport {
        let decoded = match samples_from_bytes(bytes, order) {
            Ok(decoded) => decoded,
            Err(err) => return err.into(),
        };
        if let Some(sink) = sink {
            if let Err(err) = sink.persist(&decoded, self.config.sample_rate.round() as u32) {
                warn!(%err, "could not save debug audio");
            }
        }
        let samples: Vec<T> = decoded.iter().map(|&s| cast(f64::from(s))).collect();
        self.analyze_report(&samples)
    }

    pub fn fast_pitch(&self, frame: &[T], method: PitchMethod) -> T {
        self.fast.get_pitch(frame, method)
    }

    pub fn pitch_with_confidence(&self, frame: &[T]) -> PitchEstimate<T> {
        self.fast.pitch_with_confidence(frame)
    }

    pub fn detect_voice_activity(&self, samples: &[T]) -> bool {
        self.vad.is_voiced(samples)
    }

    pub fn process_stream<F: AsRef<[T]>>(&self, frames: &[F]) -> Vec<T> {
        self.fast.process_stream(frames)
    }
}
