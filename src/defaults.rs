//! Default configuration constants for voxrelay.
//!
//! This module provides shared constants used across different configuration types
//! to ensure consistency and eliminate duplication.

/// Minimum silence gap in milliseconds that splits a recording into segments.
///
/// A pause shorter than 500ms is treated as a breath inside one utterance;
/// anything longer ends the current segment.
pub const MIN_SILENCE_MS: u32 = 500;

/// Silence threshold offset in dB below the track's mean loudness.
///
/// The threshold adapts to each recording: a frame quieter than
/// (mean dBFS − 14) counts as silence. A relative offset handles quiet and
/// loud speakers alike where a fixed threshold would not.
pub const SILENCE_OFFSET_DB: f32 = 14.0;

/// Milliseconds of bounding silence kept on each side of a segment.
///
/// 500ms of padding keeps plosives and soft word endings from being clipped
/// at the cut points.
pub const KEEP_SILENCE_MS: u32 = 500;

/// Frame size in milliseconds for loudness analysis during segmentation.
pub const SEGMENT_FRAME_MS: u32 = 10;

/// Default ceiling on simultaneous recognition-engine calls per batch.
///
/// Recognition is network-bound; 100 in-flight requests saturates most
/// endpoints without tripping their rate limits.
pub const TRANSCRIBE_CONCURRENCY: usize = 100;

/// Default ceiling on simultaneous voice-message downloads.
pub const DOWNLOAD_CONCURRENCY: usize = 30;

/// High-water mark for the dedup cache.
///
/// Once 30 message ids are remembered, the next insert first evicts the
/// oldest batch.
pub const DEDUP_HIGH_WATER: usize = 30;

/// Number of oldest dedup entries evicted in one batch at the high-water mark.
pub const DEDUP_EVICT_BATCH: usize = 10;

/// Maximum number of chats scanned per tick.
pub const CHAT_LIMIT: usize = 20;

/// Maximum number of recent messages inspected per chat per tick.
pub const HISTORY_LIMIT: usize = 15;

/// Default scheduler interval between ticks.
pub const SCHEDULE_INTERVAL: &str = "30m";

/// Default external decode tool invoked for format conversion.
pub const FFMPEG_BIN: &str = "ffmpeg";

/// Default language code sent to the recognition engine.
pub const LANGUAGE: &str = "en";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eviction_batch_fits_under_high_water() {
        assert!(DEDUP_EVICT_BATCH < DEDUP_HIGH_WATER);
    }

    #[test]
    fn schedule_interval_parses() {
        assert!(humantime::parse_duration(SCHEDULE_INTERVAL).is_ok());
    }
}
