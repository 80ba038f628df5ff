//! Transcription pipeline for downloaded voice messages.
//!
//! One task per item flows through two semaphore-gated stages (convert,
//! then segment + recognize); results are aggregated per message id and
//! working files are tracked for cleanup in an [`ArtifactStore`].

pub mod artifacts;
pub mod orchestrator;

pub use artifacts::ArtifactStore;
pub use orchestrator::{Pipeline, PipelineLimits};
