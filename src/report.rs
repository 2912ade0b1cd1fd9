//! Analysis results and their JSON form.
//!
//! A successful analysis serializes as `{"pitch_hz": .., "formants": [..], "hnr_db": ..}`
//! and a failed one as `{"error": ".."}`. A `pitch_hz` of 0 means no pitch was found,
//! which is a valid result and not an error.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Features of one utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Fused pitch in Hz, 0 when unvoiced.
    pub pitch_hz: f64,
    /// Ascending formant frequencies in Hz.
    pub formants: Vec<f64>,
    /// Harmonic-to-noise ratio in dB.
    pub hnr_db: f64,
}

/// The outcome of an utterance analysis as handed back to a host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnalysisReport {
    Success(AnalysisResult),
    Failure { error: String },
}

impl AnalysisReport {
    pub fn is_success(&self) -> bool {
        matches!(self, AnalysisReport::Success(_))
    }
}

impl From<Result<AnalysisResult>> for AnalysisReport {
    fn from(outcome: Result<AnalysisResult>) -> Self {
        match outcome {
            Ok(result) => AnalysisReport::Success(result),
            Err(err) => AnalysisReport::Failure {
                error: err.to_string(),
            },
        }
    }
}

impl From<Error> for AnalysisReport {
    fn from(err: Error) -> Self {
        AnalysisReport::Failure {
            error: err.to_string(),
        }
    }
}

pub fn to_json(report: &AnalysisReport) -> Result<String> {
    Ok(serde_json::to_string(report)?)
}

pub fn from_json(text: &str) -> Result<AnalysisReport> {
    Ok(serde_json::from_str(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_and_failure_shapes() {
        let success = AnalysisReport::Success(AnalysisResult {
            pitch_hz: 0.0,
            formants: vec![],
            hnr_db: 100.0,
        });
        let json = to_json(&success).unwrap();
        assert_eq!(json, r#"{"pitch_hz":0.0,"formants":[],"hnr_db":100.0}"#);
        assert!(from_json(&json).unwrap().is_success());

        let failure: AnalysisReport = Error::invalid_input("empty buffer").into();
        let json = to_json(&failure).unwrap();
        assert_eq!(json, r#"{"error":"Invalid input: empty buffer"}"#);
        assert_eq!(from_json(&json).unwrap(), failure);
    }

    #[test]
    fn numbers_survive_exactly() {
        let result = AnalysisResult {
            pitch_hz: 123.456789012345678,
            formants: vec![712.0000000000001, 1234.5678901234567, 2999.999999999999],
            hnr_db: -0.1 - 0.2,
        };
        let json = to_json(&AnalysisReport::Success(result.clone())).unwrap();
        match from_json(&json).unwrap() {
            AnalysisReport::Success(parsed) => {
                assert_eq!(parsed.pitch_hz.to_bits(), result.pitch_hz.to_bits());
                assert_eq!(parsed.hnr_db.to_bits(), result.hnr_db.to_bits());
                assert_eq!(parsed.formants, result.formants);
            }
            other => panic!("expected a result, got {other:?}"),
        }
    }
}
