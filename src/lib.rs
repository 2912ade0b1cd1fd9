//! # Voice Features
//! *voice_features* estimates the pitch, formants and harmonic-to-noise ratio of
//! short voice recordings stored in a buffer.
//!
//! There are two ways in:
//!
//!   * **Streaming**: single frames go through one of the cheap
//!     [fast pitch methods][detector::fast], optionally behind the
//!     [voice activity gate][vad].
//!   * **Utterances**: a whole recording is pre-emphasised and high-passed, then
//!     analysed by [pitch fusion][detector::fusion], the [formant extractor][formant]
//!     and the [HNR analyzer][hnr]. The results come back as one
//!     [AnalysisResult][report::AnalysisResult].
//!
//! Both are reached through a [VoiceAnalyzer][analyzer::VoiceAnalyzer] built once
//! from an [AnalyzerConfig][config::AnalyzerConfig].
//!
//! # Examples
//! ```
//! use voice_features::analyzer::VoiceAnalyzer;
//! use voice_features::config::AnalyzerConfig;
//!
//! fn main() {
//!     const SAMPLE_RATE: f64 = 22050.0;
//!
//!     // Signal coming from some source (microphone, generated, etc...)
//!     let freq = 150.0;
//!     let signal: Vec<f64> = (0..22050)
//!         .map(|i| (2.0 * std::f64::consts::PI * freq * i as f64 / SAMPLE_RATE).sin())
//!         .collect();
//!
//!     let analyzer = VoiceAnalyzer::<f64>::new(AnalyzerConfig::with_sample_rate(SAMPLE_RATE)).unwrap();
//!     let result = analyzer.analyze_utterance(&signal).unwrap();
//!
//!     println!(
//!         "Pitch: {} Hz, Formants: {:?}, HNR: {} dB",
//!         result.pitch_hz, result.formants, result.hnr_db
//!     );
//! }
//! ```

pub use analyzer::VoiceAnalyzer;
pub use config::AnalyzerConfig;
pub use detector::fast::process_stream;
pub use detector::{PitchEstimate, PitchMethod};
pub use error::{Error, Result};
pub use report::{AnalysisReport, AnalysisResult};
pub use vad::detect_voice_activity;

pub mod analyzer;
pub mod audio;
pub mod config;
pub mod debug_audio;
pub mod detector;
pub mod error;
pub mod float;
pub mod formant;
pub mod hnr;
pub mod preprocess;
pub mod report;
pub mod spectral;
pub mod utils;
pub mod vad;
