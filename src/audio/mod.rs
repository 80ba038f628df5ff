//! Audio handling: WAV decoding, format conversion, and silence-based
//! segmentation.
//!
//! ```text
//! ┌──────────┐    ┌───────────┐    ┌────────────┐
//! │ .oga file│───▶│ Converter │───▶│  Waveform  │───▶ AudioSegments
//! │ (opus)   │    │ (ffmpeg)  │    │ (wav.rs)   │     (segmenter.rs)
//! └──────────┘    └───────────┘    └────────────┘
//! ```

pub mod convert;
pub mod segmenter;
pub mod wav;

pub use convert::{AudioConverter, FfmpegConverter, MockConverter};
pub use segmenter::{AudioSegment, Segmenter};
pub use wav::Waveform;
