//! HTTP speech recognition client.

use crate::config::SttConfig;
use crate::error::{RelayError, Result};
use crate::stt::recognizer::{Recognition, SpeechRecognizer};
use async_trait::async_trait;

/// Recognizer backed by an HTTP transcription endpoint.
///
/// Each segment is posted as a multipart form with a `file` part carrying
/// the WAV data and a `language` text field, bearer-authenticated when an
/// API key is configured. The response body is the transcript text.
pub struct HttpRecognizer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    language: String,
}

impl HttpRecognizer {
    pub fn new(config: &SttConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            language: config.language.clone(),
        }
    }
}

#[async_trait]
impl SpeechRecognizer for HttpRecognizer {
    async fn recognize(&self, wav: &[u8]) -> Result<Recognition> {
        let part = reqwest::multipart::Part::bytes(wav.to_vec())
            .file_name("segment.wav")
            .mime_str("audio/wav")
            .map_err(|e| RelayError::RecognitionTransport {
                message: format!("Failed to build WAV part: {}", e),
            })?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("language", self.language.clone());

        let mut request = self.client.post(&self.endpoint).multipart(form);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RelayError::RecognitionTransport {
                message: format!("Request to {} failed: {}", self.endpoint, e),
            })?;

        let status = response.status();

        // 422 means the engine inspected the audio and found no speech
        if status.as_u16() == 422 {
            return Ok(Recognition::Unrecognized);
        }

        if !status.is_success() {
            return Err(RelayError::RecognitionTransport {
                message: format!("{} returned status {}", self.endpoint, status),
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| RelayError::RecognitionTransport {
                message: format!("Failed to read response body: {}", e),
            })?;

        let trimmed = text.trim();
        if trimmed.is_empty() {
            Ok(Recognition::Unrecognized)
        } else {
            Ok(Recognition::Recognized(trimmed.to_string()))
        }
    }
}
