//! WAV decoding and encoding for converted voice messages.

use crate::error::{RelayError, Result};
use std::io::{Cursor, Read};
use std::path::Path;

/// Decoded audio track, mono 16-bit PCM at its source sample rate.
///
/// Multi-channel input is downmixed on load; the sample rate is kept as-is
/// because the recognition engine accepts arbitrary rates.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

impl Waveform {
    /// Load a WAV file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let reader = hound::WavReader::open(path).map_err(|e| RelayError::Conversion {
            path: path.display().to_string(),
            message: format!("Failed to open WAV file: {}", e),
        })?;
        Self::decode(reader, path)
    }

    /// Parse WAV data from any reader. `label` names the source in errors.
    pub fn from_reader<R: Read>(reader: R, label: &Path) -> Result<Self> {
        let wav_reader = hound::WavReader::new(reader).map_err(|e| RelayError::Conversion {
            path: label.display().to_string(),
            message: format!("Failed to parse WAV file: {}", e),
        })?;
        Self::decode(wav_reader, label)
    }

    fn decode<R: Read>(mut wav_reader: hound::WavReader<R>, label: &Path) -> Result<Self> {
        let spec = wav_reader.spec();
        let sample_rate = spec.sample_rate;
        let channels = spec.channels;

        if sample_rate == 0 || channels == 0 {
            return Err(RelayError::Conversion {
                path: label.display().to_string(),
                message: format!(
                    "Invalid WAV header: {} channels at {} Hz",
                    channels, sample_rate
                ),
            });
        }

        let raw_samples: Vec<i16> = wav_reader
            .samples::<i16>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| RelayError::Conversion {
                path: label.display().to_string(),
                message: format!("Failed to read WAV samples: {}", e),
            })?;

        // Downmix to mono by averaging each frame
        let samples = if channels == 1 {
            raw_samples
        } else {
            raw_samples
                .chunks_exact(channels as usize)
                .map(|frame| {
                    let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                    (sum / channels as i32) as i16
                })
                .collect()
        };

        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Track duration in milliseconds.
    pub fn duration_ms(&self) -> u32 {
        (self.samples.len() as u64 * 1000 / self.sample_rate as u64) as u32
    }

    /// Encode as an in-memory mono 16-bit WAV file.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).map_err(|e| {
                RelayError::Other(format!("Failed to encode WAV segment: {}", e))
            })?;
            for &sample in &self.samples {
                writer.write_sample(sample).map_err(|e| {
                    RelayError::Other(format!("Failed to encode WAV segment: {}", e))
                })?;
            }
            writer
                .finalize()
                .map_err(|e| RelayError::Other(format!("Failed to encode WAV segment: {}", e)))?;
        }
        Ok(cursor.into_inner())
    }
}
