//! Speech-to-text: recognition engine client and per-item transcription.

pub mod http;
pub mod recognizer;
pub mod transcriber;

pub use http::HttpRecognizer;
pub use recognizer::{MockRecognizer, Recognition, SpeechRecognizer};
pub use transcriber::{MockTranscriber, SegmentTranscriber, Transcriber};
