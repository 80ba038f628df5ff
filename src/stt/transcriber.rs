//! Per-item transcription: segment a converted track, recognize each
//! segment, assemble the transcript.

use crate::audio::segmenter::Segmenter;
use crate::audio::wav::Waveform;
use crate::chat::MessageId;
use crate::config::SegmenterSettings;
use crate::error::{RelayError, Result};
use crate::pipeline::artifacts::ArtifactStore;
use crate::stt::recognizer::{Recognition, SpeechRecognizer};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Trait for turning one converted waveform file into transcript text.
///
/// This trait allows swapping implementations (real segmentation vs mock).
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe the WAV at `wav` for item `id`.
    ///
    /// Segment files are written under the store's shared segment directory,
    /// namespaced by item id and ordinal. An empty string is a valid
    /// transcript: all-silent or all-unrecognized audio produces one.
    async fn transcribe(
        &self,
        id: MessageId,
        wav: &Path,
        artifacts: &ArtifactStore,
    ) -> Result<String>;
}

/// Implement Transcriber for Arc<T> to allow sharing across tasks.
#[async_trait]
impl<T: Transcriber + ?Sized> Transcriber for Arc<T> {
    async fn transcribe(
        &self,
        id: MessageId,
        wav: &Path,
        artifacts: &ArtifactStore,
    ) -> Result<String> {
        (**self).transcribe(id, wav, artifacts).await
    }
}

/// Transcriber that splits the track on silence gaps and feeds each segment
/// to the recognition engine, in ordinal order.
///
/// Segments are processed sequentially so the assembled text follows the
/// spoken order without any re-sorting.
pub struct SegmentTranscriber {
    segmenter: Segmenter,
    recognizer: Arc<dyn SpeechRecognizer>,
}

impl SegmentTranscriber {
    pub fn new(settings: &SegmenterSettings, recognizer: Arc<dyn SpeechRecognizer>) -> Self {
        Self {
            segmenter: Segmenter::new(settings),
            recognizer,
        }
    }
}

#[async_trait]
impl Transcriber for SegmentTranscriber {
    async fn transcribe(
        &self,
        id: MessageId,
        wav: &Path,
        artifacts: &ArtifactStore,
    ) -> Result<String> {
        let waveform = Waveform::load(wav)?;
        let segments = self.segmenter.split(&waveform);
        if segments.is_empty() {
            log::debug!("Message {}: no speech segments found", id);
            return Ok(String::new());
        }

        let segment_dir = artifacts.segment_dir()?;

        let mut transcript = String::new();
        for segment in &segments {
            let bytes = match segment.audio.encode() {
                Ok(bytes) => bytes,
                Err(e) => {
                    log::warn!(
                        "Abandoning remaining segments of message {} at segment {}: {}",
                        id,
                        segment.ordinal,
                        e
                    );
                    break;
                }
            };

            let segment_path = segment_dir.join(format!("{}-{:03}.wav", id, segment.ordinal));
            if let Err(e) = tokio::fs::write(&segment_path, &bytes).await {
                log::warn!(
                    "Abandoning remaining segments of message {} at segment {}: {}",
                    id,
                    segment.ordinal,
                    e
                );
                break;
            }

            match self.recognizer.recognize(&bytes).await {
                Ok(Recognition::Recognized(text)) => {
                    transcript.push_str(&capitalize(&text));
                    transcript.push_str(". ");
                }
                Ok(Recognition::Unrecognized) => {
                    log::debug!("Message {} segment {} not recognized", id, segment.ordinal);
                }
                Err(e) => {
                    // Best-effort partial result: keep what was recognized so far
                    log::warn!(
                        "Abandoning remaining segments of message {} at segment {}: {}",
                        id,
                        segment.ordinal,
                        e
                    );
                    break;
                }
            }
        }

        Ok(transcript)
    }
}

/// Uppercase the first character, leaving the rest untouched.
fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Mock transcriber for testing.
#[derive(Debug, Clone, Default)]
pub struct MockTranscriber {
    default_response: String,
    responses: HashMap<MessageId, String>,
    conversion_failures: Vec<MessageId>,
    artifact_failures: Vec<MessageId>,
}

impl MockTranscriber {
    pub fn new() -> Self {
        Self {
            default_response: "mock transcript. ".to_string(),
            ..Self::default()
        }
    }

    /// Configure the transcript returned for every item.
    pub fn with_response(mut self, text: &str) -> Self {
        self.default_response = text.to_string();
        self
    }

    /// Configure the transcript returned for one item.
    pub fn with_response_for(mut self, id: i64, text: &str) -> Self {
        self.responses.insert(MessageId(id), text.to_string());
        self
    }

    /// Configure item `id` to fail with a conversion error.
    pub fn with_conversion_failure(mut self, id: i64) -> Self {
        self.conversion_failures.push(MessageId(id));
        self
    }

    /// Configure item `id` to fail with a batch-fatal artifact error.
    pub fn with_artifact_failure(mut self, id: i64) -> Self {
        self.artifact_failures.push(MessageId(id));
        self
    }
}

#[async_trait]
impl Transcriber for MockTranscriber {
    async fn transcribe(
        &self,
        id: MessageId,
        wav: &Path,
        _artifacts: &ArtifactStore,
    ) -> Result<String> {
        if self.conversion_failures.contains(&id) {
            return Err(RelayError::Conversion {
                path: wav.display().to_string(),
                message: "mock conversion failure".to_string(),
            });
        }
        if self.artifact_failures.contains(&id) {
            return Err(RelayError::ArtifactDir {
                path: "mock-segments".to_string(),
                message: "mock artifact failure".to_string(),
            });
        }
        Ok(self
            .responses
            .get(&id)
            .cloned()
            .unwrap_or_else(|| self.default_response.clone()))
    }
}
