//! Speech recognition engine abstraction.

use crate::error::{RelayError, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Outcome of recognizing one audio segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recognition {
    /// The engine produced text for the segment.
    Recognized(String),
    /// The engine could not interpret the segment.
    ///
    /// A normal outcome for mumbled or garbled audio, not an error. The
    /// segment contributes nothing to the transcript.
    Unrecognized,
}

/// Trait for speech recognition over encoded WAV data.
///
/// This trait allows swapping implementations (real HTTP engine vs mock).
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Recognize speech in one WAV-encoded segment.
    ///
    /// Transport and auth failures are errors; audio the engine cannot
    /// interpret is `Ok(Recognition::Unrecognized)`.
    async fn recognize(&self, wav: &[u8]) -> Result<Recognition>;
}

/// Implement SpeechRecognizer for Arc<T> to allow sharing across tasks.
#[async_trait]
impl<T: SpeechRecognizer + ?Sized> SpeechRecognizer for Arc<T> {
    async fn recognize(&self, wav: &[u8]) -> Result<Recognition> {
        (**self).recognize(wav).await
    }
}

#[derive(Debug, Clone)]
enum Scripted {
    Text(String),
    Unrecognized,
    TransportFailure(String),
}

/// Mock recognizer for testing.
///
/// Replays a scripted sequence of outcomes, one per call, in the order the
/// `with_*` builders were applied. Once the script is exhausted every further
/// call returns the fallback outcome (`Unrecognized` unless overridden with
/// [`MockRecognizer::with_fallback_text`]).
#[derive(Debug)]
pub struct MockRecognizer {
    script: Mutex<VecDeque<Scripted>>,
    fallback: Scripted,
}

impl MockRecognizer {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Scripted::Unrecognized,
        }
    }

    /// Script a recognized segment.
    pub fn with_text(self, text: &str) -> Self {
        self.push(Scripted::Text(text.to_string()));
        self
    }

    /// Script an unrecognized segment.
    pub fn with_unrecognized(self) -> Self {
        self.push(Scripted::Unrecognized);
        self
    }

    /// Script a transport-level failure.
    pub fn with_transport_failure(self, message: &str) -> Self {
        self.push(Scripted::TransportFailure(message.to_string()));
        self
    }

    /// Outcome returned once the script is exhausted.
    pub fn with_fallback_text(mut self, text: &str) -> Self {
        self.fallback = Scripted::Text(text.to_string());
        self
    }

    fn push(&self, outcome: Scripted) {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(outcome);
    }
}

impl Default for MockRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechRecognizer for MockRecognizer {
    async fn recognize(&self, _wav: &[u8]) -> Result<Recognition> {
        let outcome = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        match outcome {
            Scripted::Text(text) => Ok(Recognition::Recognized(text)),
            Scripted::Unrecognized => Ok(Recognition::Unrecognized),
            Scripted::TransportFailure(message) => {
                Err(RelayError::RecognitionTransport { message })
            }
        }
    }
}
