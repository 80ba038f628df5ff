//! Silence-based waveform segmentation.
//!
//! Splits a decoded track into speech segments bounded by silence gaps. The
//! silence threshold is computed relative to the track's own mean loudness,
//! so the heuristic adapts to quiet and loud recordings alike.

use crate::audio::wav::Waveform;
use crate::config::SegmenterSettings;
use crate::defaults;

/// One silence-bounded slice of a track.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSegment {
    /// 1-based position within the track's segment sequence.
    pub ordinal: u32,
    pub audio: Waveform,
}

/// Splits decoded audio on silence gaps.
pub struct Segmenter {
    min_silence_ms: u32,
    silence_offset_db: f32,
    keep_silence_ms: u32,
}

impl Segmenter {
    pub fn new(settings: &SegmenterSettings) -> Self {
        Self {
            min_silence_ms: settings.min_silence_ms,
            silence_offset_db: settings.silence_offset_db,
            keep_silence_ms: settings.keep_silence_ms,
        }
    }

    /// Split a waveform into segments with 1-based ordinals.
    ///
    /// Returns no segments for an empty or all-silent track. A track without
    /// any qualifying silence gap comes back as a single whole-track segment.
    /// Segment edges keep up to `keep_silence_ms` of the surrounding gap so
    /// speech is not clipped mid-word.
    pub fn split(&self, waveform: &Waveform) -> Vec<AudioSegment> {
        if waveform.samples.is_empty() {
            return Vec::new();
        }

        let track_rms = rms(&waveform.samples);
        if track_rms == 0.0 {
            // Digital silence throughout; nothing to transcribe.
            return Vec::new();
        }
        let threshold_db = dbfs(track_rms) - self.silence_offset_db;

        let frame_len = (waveform.sample_rate as usize * defaults::SEGMENT_FRAME_MS as usize
            / 1000)
            .max(1);

        let silent_frames: Vec<bool> = waveform
            .samples
            .chunks(frame_len)
            .map(|frame| dbfs(rms(frame)) < threshold_db)
            .collect();

        let voiced = self.voiced_frame_ranges(&silent_frames);
        if voiced.is_empty() {
            return Vec::new();
        }

        let ranges = self.pad_ranges(
            voiced,
            frame_len,
            waveform.samples.len(),
            waveform.sample_rate,
        );

        ranges
            .into_iter()
            .enumerate()
            .map(|(i, (start, end))| AudioSegment {
                ordinal: i as u32 + 1,
                audio: Waveform {
                    samples: waveform.samples[start..end].to_vec(),
                    sample_rate: waveform.sample_rate,
                },
            })
            .collect()
    }

    /// Frame intervals between qualifying silence gaps.
    ///
    /// A silent run shorter than `min_silence_ms` does not split speech; it
    /// stays inside the surrounding voiced interval.
    fn voiced_frame_ranges(&self, silent_frames: &[bool]) -> Vec<(usize, usize)> {
        let min_gap_frames = self
            .min_silence_ms
            .div_ceil(defaults::SEGMENT_FRAME_MS)
            .max(1) as usize;

        let total = silent_frames.len();
        let mut ranges = Vec::new();
        let mut cursor = 0;
        let mut i = 0;

        while i < total {
            if silent_frames[i] {
                let run_start = i;
                while i < total && silent_frames[i] {
                    i += 1;
                }
                if i - run_start >= min_gap_frames {
                    if run_start > cursor {
                        ranges.push((cursor, run_start));
                    }
                    cursor = i;
                }
            } else {
                i += 1;
            }
        }

        if cursor < total {
            ranges.push((cursor, total));
        }

        ranges
    }

    /// Convert frame intervals to sample intervals with silence padding.
    ///
    /// Each interval is widened by `keep_silence_ms` on both sides. When the
    /// padding of two neighbours overlaps, they meet at the midpoint of the
    /// gap so no sample is emitted twice.
    fn pad_ranges(
        &self,
        voiced: Vec<(usize, usize)>,
        frame_len: usize,
        total_samples: usize,
        sample_rate: u32,
    ) -> Vec<(usize, usize)> {
        let keep = (sample_rate as u64 * self.keep_silence_ms as u64 / 1000) as i64;

        let mut ranges: Vec<(i64, i64)> = voiced
            .into_iter()
            .map(|(frame_start, frame_end)| {
                let start = (frame_start * frame_len) as i64 - keep;
                let end = ((frame_end * frame_len).min(total_samples)) as i64 + keep;
                (start, end)
            })
            .collect();

        for i in 1..ranges.len() {
            let last_end = ranges[i - 1].1;
            let next_start = ranges[i].0;
            if next_start < last_end {
                let mid = (last_end + next_start) / 2;
                ranges[i - 1].1 = mid;
                ranges[i].0 = mid;
            }
        }

        ranges
            .into_iter()
            .map(|(start, end)| {
                (
                    start.max(0) as usize,
                    (end.max(0) as usize).min(total_samples),
                )
            })
            .filter(|(start, end)| end > start)
            .collect()
    }
}

/// Root-mean-square level of a sample buffer, normalized to 0.0..=1.0.
pub fn rms(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f64 = samples
        .iter()
        .map(|&sample| {
            let normalized = sample as f64 / i16::MAX as f64;
            normalized * normalized
        })
        .sum();

    let mean_square = sum_squares / samples.len() as f64;
    mean_square.sqrt() as f32
}

/// RMS level expressed in decibels relative to full scale.
pub fn dbfs(rms: f32) -> f32 {
    if rms <= 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * rms.log10()
    }
}
