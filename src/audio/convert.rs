//! Voice file to WAV conversion via an external decode tool.

use crate::defaults;
use crate::error::{RelayError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;

/// Trait for converting a downloaded voice file into a WAV file.
///
/// This trait allows swapping implementations (real ffmpeg vs mock).
#[async_trait]
pub trait AudioConverter: Send + Sync {
    /// Convert `source` to a WAV file alongside it.
    ///
    /// Returns the path of the WAV that was written.
    async fn convert(&self, source: &Path) -> Result<PathBuf>;
}

/// Implement AudioConverter for Arc<T> to allow sharing across tasks.
#[async_trait]
impl<T: AudioConverter + ?Sized> AudioConverter for Arc<T> {
    async fn convert(&self, source: &Path) -> Result<PathBuf> {
        (**self).convert(source).await
    }
}

/// Converts audio by shelling out to ffmpeg.
///
/// The target path is the source path with its extension replaced by `wav`,
/// so `1234.oga` becomes `1234.wav` in the same directory.
#[derive(Debug, Clone)]
pub struct FfmpegConverter {
    binary: String,
}

impl FfmpegConverter {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for FfmpegConverter {
    fn default() -> Self {
        Self::new(defaults::FFMPEG_BIN)
    }
}

#[async_trait]
impl AudioConverter for FfmpegConverter {
    async fn convert(&self, source: &Path) -> Result<PathBuf> {
        let target = source.with_extension("wav");

        let output = Command::new(&self.binary)
            .arg("-y")
            .arg("-loglevel")
            .arg("error")
            .arg("-i")
            .arg(source)
            .arg(&target)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| RelayError::Conversion {
                path: source.display().to_string(),
                message: format!("Failed to launch {}: {}", self.binary, e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr.trim();
            return Err(RelayError::Conversion {
                path: source.display().to_string(),
                message: if detail.is_empty() {
                    format!("{} exited with {}", self.binary, output.status)
                } else {
                    detail.to_string()
                },
            });
        }

        // ffmpeg can exit 0 without writing anything for some inputs
        if tokio::fs::metadata(&target).await.is_err() {
            return Err(RelayError::Conversion {
                path: source.display().to_string(),
                message: format!("{} produced no output file", self.binary),
            });
        }

        Ok(target)
    }
}

/// Mock converter for testing.
///
/// Writes a real WAV file next to the source so downstream stages can decode
/// it without the external tool being installed.
#[derive(Debug, Clone)]
pub struct MockConverter {
    samples: Vec<i16>,
    sample_rate: u32,
    fail_stems: Vec<String>,
}

impl MockConverter {
    pub fn new() -> Self {
        Self {
            // One second of steady tone, which segments as a single chunk
            samples: vec![8000; 16000],
            sample_rate: 16000,
            fail_stems: Vec::new(),
        }
    }

    /// Configure the audio written for every successful conversion.
    pub fn with_audio(mut self, samples: Vec<i16>, sample_rate: u32) -> Self {
        self.samples = samples;
        self.sample_rate = sample_rate;
        self
    }

    /// Configure the mock to fail for sources whose file stem equals `stem`.
    pub fn with_failure(mut self, stem: &str) -> Self {
        self.fail_stems.push(stem.to_string());
        self
    }
}

impl Default for MockConverter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioConverter for MockConverter {
    async fn convert(&self, source: &Path) -> Result<PathBuf> {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        if self.fail_stems.contains(&stem) {
            return Err(RelayError::Conversion {
                path: source.display().to_string(),
                message: "mock conversion failure".to_string(),
            });
        }

        let target = source.with_extension("wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer =
            hound::WavWriter::create(&target, spec).map_err(|e| RelayError::Conversion {
                path: source.display().to_string(),
                message: format!("mock writer: {}", e),
            })?;
        for &sample in &self.samples {
            writer.write_sample(sample).map_err(|e| RelayError::Conversion {
                path: source.display().to_string(),
                message: format!("mock writer: {}", e),
            })?;
        }
        writer.finalize().map_err(|e| RelayError::Conversion {
            path: source.display().to_string(),
            message: format!("mock writer: {}", e),
        })?;

        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::wav::Waveform;

    #[tokio::test]
    async fn mock_converter_writes_decodable_wav() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("100.oga");
        std::fs::write(&source, b"opus bytes").unwrap();

        let converter = MockConverter::new().with_audio(vec![123i16; 800], 8000);
        let target = converter.convert(&source).await.unwrap();

        assert_eq!(target, dir.path().join("100.wav"));
        let waveform = Waveform::load(&target).unwrap();
        assert_eq!(waveform.samples, vec![123i16; 800]);
        assert_eq!(waveform.sample_rate, 8000);
    }

    #[tokio::test]
    async fn mock_converter_fails_for_configured_stem() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("7.oga");
        std::fs::write(&source, b"opus bytes").unwrap();

        let converter = MockConverter::new().with_failure("7");
        let result = converter.convert(&source).await;

        match result {
            Err(RelayError::Conversion { path, message }) => {
                assert!(path.ends_with("7.oga"));
                assert_eq!(message, "mock conversion failure");
            }
            other => panic!("Expected Conversion error, got {:?}", other),
        }
        assert!(!dir.path().join("7.wav").exists());
    }

    #[tokio::test]
    async fn mock_converter_only_fails_matching_stems() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("8.oga");
        std::fs::write(&good, b"opus bytes").unwrap();

        let converter = MockConverter::new().with_failure("7");
        assert!(converter.convert(&good).await.is_ok());
    }

    #[tokio::test]
    async fn ffmpeg_converter_missing_binary_is_conversion_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("1.oga");
        std::fs::write(&source, b"opus bytes").unwrap();

        let converter = FfmpegConverter::new("/nonexistent/voxrelay-ffmpeg");
        let result = converter.convert(&source).await;

        match result {
            Err(RelayError::Conversion { message, .. }) => {
                assert!(message.contains("Failed to launch"));
            }
            other => panic!("Expected Conversion error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn converter_trait_is_object_safe() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("2.oga");
        std::fs::write(&source, b"opus bytes").unwrap();

        let converter: Box<dyn AudioConverter> = Box::new(MockConverter::new());
        let target = converter.convert(&source).await.unwrap();

        assert!(target.exists());
    }

    #[tokio::test]
    async fn arc_wrapped_converter_is_usable() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("3.oga");
        std::fs::write(&source, b"opus bytes").unwrap();

        let converter = Arc::new(MockConverter::new());
        let target = converter.convert(&source).await.unwrap();

        assert_eq!(target, dir.path().join("3.wav"));
    }

    #[test]
    fn default_ffmpeg_converter_uses_configured_binary() {
        let converter = FfmpegConverter::default();
        assert_eq!(converter.binary, "ffmpeg");
    }
}
