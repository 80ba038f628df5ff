//! voxrelay - Voice message transcription relay
//!
//! Watches chats for voice messages, transcribes them through an external
//! recognition engine, and forwards the text to the operator.

// Error handling discipline
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
pub mod chat;
pub mod cli;
pub mod config;
pub mod daemon;
pub mod dedup;
pub mod defaults;
pub mod error;
pub mod ipc;
pub mod notify;
pub mod pipeline;
pub mod relay;
pub mod stt;

// Collaborator traits (list → convert → recognize → notify)
pub use audio::convert::AudioConverter;
pub use chat::ChatClient;
pub use notify::Notifier;
pub use stt::recognizer::SpeechRecognizer;
pub use stt::transcriber::Transcriber;

// Pipeline
pub use pipeline::{ArtifactStore, Pipeline, PipelineLimits};

// Relay
pub use dedup::DedupCache;
pub use relay::{RelayService, TickSummary};

// Error handling
pub use error::{RelayError, Result};

// Config
pub use config::Config;

/// Crate version, suffixed with the short git hash when one was embedded
/// at build time (`0.2.0+abc1234`). Tarball builds carry no hash.
pub fn version_string() -> String {
    let mut version = env!("CARGO_PKG_VERSION").to_string();
    if let Some(hash) = option_env!("GIT_HASH").filter(|h| !h.is_empty()) {
        version.push('+');
        version.push_str(hash);
    }
    version
}
