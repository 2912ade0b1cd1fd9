//! Persisting analysed buffers for offline inspection.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use hound::{SampleFormat, WavSpec, WavWriter};
use tracing::info;

use crate::error::Result;

/// Somewhere to put a copy of the audio an analysis ran on.
pub trait DebugAudioSink {
    /// Store `samples` and return where they went.
    fn persist(&self, samples: &[f32], sample_rate: u32) -> Result<PathBuf>;
}

/// Writes mono 32-bit float WAV files named `<prefix><unix millis>.wav`.
#[derive(Debug, Clone)]
pub struct WavDebugSink {
    directory: PathBuf,
    prefix: String,
}

impl WavDebugSink {
    pub fn new<P: AsRef<Path>>(directory: P) -> Self {
        WavDebugSink {
            directory: directory.as_ref().to_path_buf(),
            prefix: String::from("debug_"),
        }
    }

    pub fn with_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.prefix = prefix.into();
        self
    }

    fn next_path(&self) -> PathBuf {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        self.directory.join(format!("{}{}.wav", self.prefix, millis))
    }
}

impl DebugAudioSink for WavDebugSink {
    fn persist(&self, samples: &[f32], sample_rate: u32) -> Result<PathBuf> {
        let spec = WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let path = self.next_path();

        let mut writer = WavWriter::create(&path, spec)?;
        for &sample in samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;

        info!(path = %path.display(), samples = samples.len(), "saved debug audio");
        Ok(path)
    }
}
