//! Error types for voice feature extraction.
//!
//! Only configuration problems, unusable input and collaborator failures
//! (files, serialization) surface as errors. Short or silent signals are not
//! errors: every estimator answers them with its "no result" sentinel.

use thiserror::Error;

/// Result type alias using the crate's [Error] type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while configuring or running an analysis.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid analyzer configuration.
    ///
    /// Raised when an analyzer is built, never while analysing a buffer.
    /// Examples: a zero sample rate, a zero frame size, a high-pass cutoff
    /// above Nyquist.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The input cannot be analysed at all (empty, non-finite, undecodable).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A model fit or decomposition broke down numerically.
    ///
    /// Components convert this into their sentinel result; it does not reach
    /// callers of [`VoiceAnalyzer`](crate::analyzer::VoiceAnalyzer).
    #[error("Numerical failure: {0}")]
    NumericalFailure(String),

    /// The configuration text could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// The configuration could not be rendered as TOML.
    #[error("Failed to render configuration: {0}")]
    ConfigRender(#[from] toml::ser::Error),

    /// Result (de)serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Writing debug audio failed.
    #[error("Failed to write audio file: {0}")]
    Wav(#[from] hound::Error),

    /// General file system error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration(message.into())
    }

    pub(crate) fn invalid_input<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput(message.into())
    }

    pub(crate) fn numerical<S: Into<String>>(message: S) -> Self {
        Self::NumericalFailure(message.into())
    }
}
