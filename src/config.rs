//! Analyzer configuration.
//!
//! Every threshold the estimators use is a tunable here. The defaults are the
//! values the estimators were tuned with on speech recorded at 22.05 kHz; none
//! of them is derived, so hosts are free to override them from TOML:
//!
//! ```
//! use voice_features::config::AnalyzerConfig;
//!
//! let config = AnalyzerConfig::from_toml_str(
//!     r#"
//!     sample_rate = 16000
//!
//!     [fast]
//!     max_freq = 800.0
//!     "#,
//! )
//! .unwrap();
//! assert_eq!(config.sample_rate, 16000.0);
//! assert_eq!(config.fast.min_freq, 65.0);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Configuration for the whole analysis pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Sample rate of every buffer handed to the analyzer, in Hz.
    pub sample_rate: f64,
    /// Number of samples analysed per streaming frame.
    pub frame_size: usize,
    pub preprocess: PreprocessConfig,
    pub fast: FastPitchConfig,
    pub vad: VadConfig,
    pub fusion: FusionConfig,
    pub formant: FormantConfig,
    pub hnr: HnrConfig,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22050.0,
            frame_size: 1024,
            preprocess: PreprocessConfig::default(),
            fast: FastPitchConfig::default(),
            vad: VadConfig::default(),
            fusion: FusionConfig::default(),
            formant: FormantConfig::default(),
            hnr: HnrConfig::default(),
        }
    }
}

impl AnalyzerConfig {
    /// Default configuration for a given sample rate.
    pub fn with_sample_rate(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            ..Self::default()
        }
    }

    /// Parse a configuration from TOML. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Render the configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }

    /// Check the configuration for values no estimator can work with.
    pub fn validate(&self) -> Result<()> {
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(Error::configuration(format!(
                "sample rate must be positive, got {}",
                self.sample_rate
            )));
        }
        if self.frame_size == 0 {
            return Err(Error::configuration("frame size must be non-zero"));
        }
        let nyquist = self.sample_rate / 2.0;

        self.fast.validate()?;

        let pre = &self.preprocess;
        if pre.highpass_order == 0 {
            return Err(Error::configuration("high-pass order must be non-zero"));
        }
        if !(pre.highpass_cutoff_hz > 0.0 && pre.highpass_cutoff_hz < nyquist) {
            return Err(Error::configuration(format!(
                "high-pass cutoff {} Hz must lie in (0, {}) Hz",
                pre.highpass_cutoff_hz, nyquist
            )));
        }

        let fusion = &self.fusion;
        check_band("fusion", fusion.fmin, fusion.fmax)?;
        check_band(
            "fusion autocorrelation",
            fusion.autocorrelation_fmin,
            fusion.autocorrelation_fmax,
        )?;
        if fusion.hop_length == 0 || fusion.frame_length < 4 {
            return Err(Error::configuration(
                "fusion frame length must be at least 4 and hop non-zero",
            ));
        }

        let formant = &self.formant;
        check_band("formant", formant.min_hz, formant.max_hz)?;
        if formant.order_divisor_hz <= 0.0 {
            return Err(Error::configuration("formant order divisor must be positive"));
        }

        let hnr = &self.hnr;
        if hnr.n_fft < 2 || hnr.hop_length == 0 || hnr.kernel_size == 0 {
            return Err(Error::configuration(
                "HNR n_fft must be at least 2, hop and kernel non-zero",
            ));
        }

        if self.vad.zcr_low >= self.vad.zcr_high {
            return Err(Error::configuration("VAD zero-crossing band is empty"));
        }
        Ok(())
    }
}

fn check_band(name: &str, low: f64, high: f64) -> Result<()> {
    if low > 0.0 && low < high && high.is_finite() {
        Ok(())
    } else {
        Err(Error::configuration(format!(
            "{name} band [{low}, {high}] is not a valid frequency range"
        )))
    }
}

/// Utterance-path conditioning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    pub pre_emphasis: f64,
    pub highpass_cutoff_hz: f64,
    pub highpass_order: usize,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            pre_emphasis: 0.97,
            highpass_cutoff_hz: 80.0,
            highpass_order: 3,
        }
    }
}

/// Single-frame streaming estimators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FastPitchConfig {
    pub min_freq: f64,
    pub max_freq: f64,
    /// Autocorrelation peak must reach this fraction of the zero-lag value.
    pub autocorrelation_threshold: f64,
    /// Harmonic product peak must reach this fraction of the largest magnitude.
    pub hps_threshold: f64,
    pub zero_crossing_chunk: usize,
    pub zero_crossing_min_samples: usize,
    /// Frames whose standard deviation falls below this are silence.
    pub silence_std: f64,
    /// Mean-square energy below which the confidence variant reports unvoiced.
    pub energy_floor: f64,
    pub voicing_threshold: f64,
}

impl Default for FastPitchConfig {
    fn default() -> Self {
        Self {
            min_freq: 65.0,
            max_freq: 1000.0,
            autocorrelation_threshold: 0.3,
            hps_threshold: 0.1,
            zero_crossing_chunk: 512,
            zero_crossing_min_samples: 100,
            silence_std: 0.01,
            energy_floor: 1e-6,
            voicing_threshold: 0.3,
        }
    }
}

impl FastPitchConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        check_band("streaming pitch", self.min_freq, self.max_freq)?;
        if self.zero_crossing_chunk == 0 {
            return Err(Error::configuration("zero-crossing chunk must be non-zero"));
        }
        Ok(())
    }
}

/// Voice activity gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VadConfig {
    pub min_samples: usize,
    pub energy_threshold: f64,
    pub zcr_low: f64,
    pub zcr_high: f64,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            min_samples: 100,
            energy_threshold: 0.001,
            zcr_low: 0.01,
            zcr_high: 0.3,
        }
    }
}

/// A frequency band used to score octave candidates. Bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OctaveBand {
    pub low: f64,
    pub high: f64,
    pub score: u32,
}

impl OctaveBand {
    pub const fn new(low: f64, high: f64, score: u32) -> Self {
        Self { low, high, score }
    }

    pub fn contains(&self, frequency: f64) -> bool {
        self.low <= frequency && frequency <= self.high
    }
}

/// Whole-utterance multi-method pitch fusion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    pub fmin: f64,
    pub fmax: f64,
    pub frame_length: usize,
    pub hop_length: usize,
    pub trough_threshold: f64,
    pub piptrack_threshold: f64,
    pub autocorrelation_fmin: f64,
    pub autocorrelation_fmax: f64,
    /// Checked in order; the first band containing a candidate gives its score.
    pub octave_bands: Vec<OctaveBand>,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            fmin: 50.0,
            fmax: 500.0,
            frame_length: 2048,
            hop_length: 512,
            trough_threshold: 0.1,
            piptrack_threshold: 0.1,
            autocorrelation_fmin: 50.0,
            autocorrelation_fmax: 500.0,
            octave_bands: vec![
                OctaveBand::new(80.0, 180.0, 3),
                OctaveBand::new(150.0, 300.0, 2),
                OctaveBand::new(50.0, 400.0, 1),
            ],
        }
    }
}

/// Linear-predictive formant extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormantConfig {
    pub count: usize,
    pub min_hz: f64,
    pub max_hz: f64,
    /// Model order is `round(sample_rate / order_divisor_hz) + order_offset`.
    pub order_divisor_hz: f64,
    pub order_offset: usize,
}

impl Default for FormantConfig {
    fn default() -> Self {
        Self {
            count: 4,
            min_hz: 300.0,
            max_hz: 4000.0,
            order_divisor_hz: 1000.0,
            order_offset: 2,
        }
    }
}

impl FormantConfig {
    pub fn lpc_order(&self, sample_rate: f64) -> usize {
        (sample_rate / self.order_divisor_hz).round() as usize + self.order_offset
    }
}

/// Harmonic/percussive decomposition for HNR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HnrConfig {
    pub n_fft: usize,
    pub hop_length: usize,
    pub kernel_size: usize,
    pub mask_power: f64,
    pub margin: f64,
    /// Returned when the percussive component is exactly silent.
    pub noiseless_db: f64,
}

impl Default for HnrConfig {
    fn default() -> Self {
        Self {
            n_fft: 2048,
            hop_length: 512,
            kernel_size: 31,
            mask_power: 2.0,
            margin: 1.0,
            noiseless_db: 100.0,
        }
    }
}
