//! Bounded-concurrency transcription pipeline.
//!
//! One task per item chains the two stages:
//!
//! ```text
//!          convert gate                 transcribe gate
//! item ──▶ [permit] convert ─release─▶ [permit] segment + recognize ──▶ text
//! ```
//!
//! Items pipeline freely past each other: while one item is being
//! transcribed, the next may already be converting. The only cross-item
//! coupling is the two semaphores, the result map, and the artifact store.

use crate::audio::convert::AudioConverter;
use crate::chat::MessageId;
use crate::defaults;
use crate::error::{RelayError, Result};
use crate::pipeline::artifacts::ArtifactStore;
use crate::stt::transcriber::Transcriber;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Concurrency ceilings for one pipeline run.
#[derive(Debug, Clone, Copy)]
pub struct PipelineLimits {
    /// Simultaneous conversion subprocesses (0 = one slot per batch item).
    pub convert: usize,
    /// Simultaneous recognition engine calls.
    pub transcribe: usize,
}

impl Default for PipelineLimits {
    fn default() -> Self {
        Self {
            convert: 0,
            transcribe: defaults::TRANSCRIBE_CONCURRENCY,
        }
    }
}

/// Drives Convert → Segment+Recognize → Aggregate for a batch of items.
pub struct Pipeline {
    converter: Arc<dyn AudioConverter>,
    transcriber: Arc<dyn Transcriber>,
    limits: PipelineLimits,
}

impl Pipeline {
    pub fn new(
        converter: Arc<dyn AudioConverter>,
        transcriber: Arc<dyn Transcriber>,
        limits: PipelineLimits,
    ) -> Self {
        Self {
            converter,
            transcriber,
            limits,
        }
    }

    /// Processes one batch of downloaded items, keyed by message id.
    ///
    /// Every input item either contributes exactly one transcript entry
    /// (possibly empty text) or is dropped with a logged warning, so result
    /// keys are always a subset of input keys. Artifacts are cleaned up
    /// before returning, on success and on failure alike. A batch-fatal
    /// error waits for the remaining items, cleans up, then surfaces.
    pub async fn run(
        &self,
        batch: BTreeMap<MessageId, PathBuf>,
        artifacts: Arc<ArtifactStore>,
    ) -> Result<BTreeMap<MessageId, String>> {
        let convert_slots = if self.limits.convert == 0 {
            batch.len().max(1)
        } else {
            self.limits.convert
        };
        let convert_gate = Arc::new(Semaphore::new(convert_slots));
        let transcribe_gate = Arc::new(Semaphore::new(self.limits.transcribe.max(1)));

        let mut handles = Vec::new();
        for (id, source) in batch {
            let converter = self.converter.clone();
            let transcriber = self.transcriber.clone();
            let convert_gate = convert_gate.clone();
            let transcribe_gate = transcribe_gate.clone();
            let artifacts = artifacts.clone();

            handles.push(tokio::spawn(async move {
                let outcome = process_item(
                    id,
                    source,
                    converter,
                    transcriber,
                    convert_gate,
                    transcribe_gate,
                    &artifacts,
                )
                .await;
                (id, outcome)
            }));
        }

        let mut results = BTreeMap::new();
        let mut fatal: Option<RelayError> = None;

        for handle in handles {
            match handle.await {
                Ok((id, Ok(Some(text)))) => {
                    results.insert(id, text);
                }
                Ok((_, Ok(None))) => {}
                Ok((id, Err(e))) => {
                    log::error!("Fatal pipeline error at message {}: {}", id, e);
                    if fatal.is_none() {
                        fatal = Some(e);
                    }
                }
                Err(e) => {
                    log::warn!("Pipeline task panicked: {}", e);
                }
            }
        }

        artifacts.cleanup();

        match fatal {
            Some(e) => Err(e),
            None => Ok(results),
        }
    }
}

/// Runs one item through both stages.
///
/// `Ok(Some(text))` is a finished transcript, `Ok(None)` drops the item
/// after a logged per-item failure, `Err` aborts the whole batch.
async fn process_item(
    id: MessageId,
    source: PathBuf,
    converter: Arc<dyn AudioConverter>,
    transcriber: Arc<dyn Transcriber>,
    convert_gate: Arc<Semaphore>,
    transcribe_gate: Arc<Semaphore>,
    artifacts: &ArtifactStore,
) -> Result<Option<String>> {
    let converted = {
        let _permit = convert_gate.acquire_owned().await; // Held for the whole stage

        // Registered before the subprocess starts, so a half-written file
        // is removed with everything else.
        artifacts.register_converted(&source.with_extension("wav"));
        converter.convert(&source).await
    };

    let wav = match converted {
        Ok(wav) => wav,
        Err(e) => {
            log::warn!("Dropping message {}: {}", id, e);
            return Ok(None);
        }
    };
    artifacts.register_converted(&wav);

    let _permit = transcribe_gate.acquire_owned().await; // Held for the whole stage
    match transcriber.transcribe(id, &wav, artifacts).await {
        Ok(text) => Ok(Some(text)),
        Err(e @ RelayError::ArtifactDir { .. }) => Err(e),
        Err(e) => {
            log::warn!("Dropping message {}: {}", id, e);
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::convert::MockConverter;
    use crate::stt::transcriber::MockTranscriber;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn batch_of(dir: &Path, ids: &[i64]) -> BTreeMap<MessageId, PathBuf> {
        let mut batch = BTreeMap::new();
        for &id in ids {
            let source = dir.join(format!("{}.oga", id));
            std::fs::write(&source, b"opus bytes").unwrap();
            batch.insert(MessageId(id), source);
        }
        batch
    }

    fn store(dir: &Path) -> Arc<ArtifactStore> {
        Arc::new(ArtifactStore::new(dir.join("segments")))
    }

    #[tokio::test]
    async fn every_item_yields_exactly_one_result() {
        let dir = tempfile::tempdir().unwrap();
        let batch = batch_of(dir.path(), &[1, 2, 3]);

        let pipeline = Pipeline::new(
            Arc::new(MockConverter::new()),
            Arc::new(
                MockTranscriber::new()
                    .with_response_for(1, "One. ")
                    .with_response_for(2, "Two. ")
                    .with_response_for(3, "Three. "),
            ),
            PipelineLimits::default(),
        );

        let results = pipeline.run(batch, store(dir.path())).await.unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[&MessageId(1)], "One. ");
        assert_eq!(results[&MessageId(2)], "Two. ");
        assert_eq!(results[&MessageId(3)], "Three. ");
    }

    #[tokio::test]
    async fn conversion_failure_drops_only_that_item() {
        let dir = tempfile::tempdir().unwrap();
        let batch = batch_of(dir.path(), &[1, 2, 3]);
        let input_keys: Vec<MessageId> = batch.keys().copied().collect();

        let pipeline = Pipeline::new(
            Arc::new(MockConverter::new().with_failure("2")),
            Arc::new(MockTranscriber::new().with_response("Text. ")),
            PipelineLimits::default(),
        );

        let results = pipeline.run(batch, store(dir.path())).await.unwrap();

        let keys: Vec<MessageId> = results.keys().copied().collect();
        assert_eq!(keys, vec![MessageId(1), MessageId(3)]);
        assert!(keys.iter().all(|k| input_keys.contains(k)));
    }

    #[tokio::test]
    async fn unreadable_converted_audio_drops_only_that_item() {
        let dir = tempfile::tempdir().unwrap();
        let batch = batch_of(dir.path(), &[5, 6]);

        let pipeline = Pipeline::new(
            Arc::new(MockConverter::new()),
            Arc::new(
                MockTranscriber::new()
                    .with_response("Ok. ")
                    .with_conversion_failure(6),
            ),
            PipelineLimits::default(),
        );

        let results = pipeline.run(batch, store(dir.path())).await.unwrap();

        assert_eq!(results.len(), 1);
        assert!(results.contains_key(&MessageId(5)));
    }

    #[tokio::test]
    async fn empty_transcripts_are_kept_in_the_results() {
        let dir = tempfile::tempdir().unwrap();
        let batch = batch_of(dir.path(), &[4]);

        let pipeline = Pipeline::new(
            Arc::new(MockConverter::new()),
            Arc::new(MockTranscriber::new().with_response("")),
            PipelineLimits::default(),
        );

        let results = pipeline.run(batch, store(dir.path())).await.unwrap();

        assert_eq!(results[&MessageId(4)], "");
    }

    #[tokio::test]
    async fn artifacts_are_removed_after_a_successful_run() {
        let dir = tempfile::tempdir().unwrap();
        let batch = batch_of(dir.path(), &[1, 2]);
        let sources: Vec<PathBuf> = batch.values().cloned().collect();
        let artifacts = store(dir.path());
        for source in &sources {
            artifacts.register_source(source);
        }

        let pipeline = Pipeline::new(
            Arc::new(MockConverter::new()),
            Arc::new(MockTranscriber::new()),
            PipelineLimits::default(),
        );
        pipeline.run(batch, artifacts).await.unwrap();

        for source in &sources {
            assert!(!source.exists(), "source should be removed");
            assert!(
                !source.with_extension("wav").exists(),
                "converted wav should be removed"
            );
        }
        assert!(!dir.path().join("segments").exists());
    }

    #[tokio::test]
    async fn fatal_error_still_cleans_up_and_surfaces() {
        let dir = tempfile::tempdir().unwrap();
        let batch = batch_of(dir.path(), &[1, 2, 3]);
        let sources: Vec<PathBuf> = batch.values().cloned().collect();
        let artifacts = store(dir.path());
        for source in &sources {
            artifacts.register_source(source);
        }

        let pipeline = Pipeline::new(
            Arc::new(MockConverter::new()),
            Arc::new(MockTranscriber::new().with_artifact_failure(2)),
            PipelineLimits::default(),
        );

        let result = pipeline.run(batch, artifacts).await;

        assert!(matches!(result, Err(RelayError::ArtifactDir { .. })));
        for source in &sources {
            assert!(!source.exists());
            assert!(!source.with_extension("wav").exists());
        }
    }

    #[tokio::test]
    async fn empty_batch_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();

        let pipeline = Pipeline::new(
            Arc::new(MockConverter::new()),
            Arc::new(MockTranscriber::new()),
            PipelineLimits::default(),
        );

        let results = pipeline
            .run(BTreeMap::new(), store(dir.path()))
            .await
            .unwrap();

        assert!(results.is_empty());
    }

    struct SlowConverter {
        concurrent: Arc<AtomicU32>,
        peak: Arc<AtomicU32>,
    }

    #[async_trait]
    impl AudioConverter for SlowConverter {
        async fn convert(&self, source: &Path) -> Result<PathBuf> {
            let current = self.concurrent.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(current, Ordering::SeqCst);

            tokio::time::sleep(Duration::from_millis(40)).await;

            self.concurrent.fetch_sub(1, Ordering::SeqCst);
            Ok(source.with_extension("wav"))
        }
    }

    struct SlowTranscriber {
        concurrent: Arc<AtomicU32>,
        peak: Arc<AtomicU32>,
    }

    #[async_trait]
    impl Transcriber for SlowTranscriber {
        async fn transcribe(
            &self,
            _id: MessageId,
            _wav: &Path,
            _artifacts: &ArtifactStore,
        ) -> Result<String> {
            let current = self.concurrent.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(current, Ordering::SeqCst);

            tokio::time::sleep(Duration::from_millis(40)).await;

            self.concurrent.fetch_sub(1, Ordering::SeqCst);
            Ok("slow. ".to_string())
        }
    }

    #[tokio::test]
    async fn convert_ceiling_bounds_simultaneous_conversions() {
        let dir = tempfile::tempdir().unwrap();
        let batch = batch_of(dir.path(), &[1, 2, 3, 4, 5, 6]);
        let peak = Arc::new(AtomicU32::new(0));

        let pipeline = Pipeline::new(
            Arc::new(SlowConverter {
                concurrent: Arc::new(AtomicU32::new(0)),
                peak: peak.clone(),
            }),
            Arc::new(MockTranscriber::new()),
            PipelineLimits {
                convert: 2,
                transcribe: 100,
            },
        );

        let results = pipeline.run(batch, store(dir.path())).await.unwrap();

        assert_eq!(results.len(), 6);
        assert!(
            peak.load(Ordering::SeqCst) <= 2,
            "Peak conversion concurrency was {} (should be <= 2)",
            peak.load(Ordering::SeqCst)
        );
    }

    #[tokio::test]
    async fn transcribe_ceiling_bounds_simultaneous_recognitions() {
        let dir = tempfile::tempdir().unwrap();
        let batch = batch_of(dir.path(), &[1, 2, 3, 4, 5, 6]);
        let peak = Arc::new(AtomicU32::new(0));

        let pipeline = Pipeline::new(
            Arc::new(MockConverter::new()),
            Arc::new(SlowTranscriber {
                concurrent: Arc::new(AtomicU32::new(0)),
                peak: peak.clone(),
            }),
            PipelineLimits {
                convert: 0,
                transcribe: 2,
            },
        );

        let results = pipeline.run(batch, store(dir.path())).await.unwrap();

        assert_eq!(results.len(), 6);
        assert!(
            peak.load(Ordering::SeqCst) <= 2,
            "Peak recognition concurrency was {} (should be <= 2)",
            peak.load(Ordering::SeqCst)
        );
    }

    #[tokio::test]
    async fn zero_convert_ceiling_admits_the_whole_batch() {
        let dir = tempfile::tempdir().unwrap();
        let batch = batch_of(dir.path(), &[1, 2, 3, 4, 5]);
        let peak = Arc::new(AtomicU32::new(0));

        let pipeline = Pipeline::new(
            Arc::new(SlowConverter {
                concurrent: Arc::new(AtomicU32::new(0)),
                peak: peak.clone(),
            }),
            Arc::new(MockTranscriber::new()),
            PipelineLimits {
                convert: 0,
                transcribe: 100,
            },
        );

        pipeline.run(batch, store(dir.path())).await.unwrap();

        assert_eq!(peak.load(Ordering::SeqCst), 5);
    }

    struct LoggingConverter {
        events: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl AudioConverter for LoggingConverter {
        async fn convert(&self, source: &Path) -> Result<PathBuf> {
            let stem = source.file_stem().unwrap().to_string_lossy().to_string();
            self.events
                .lock()
                .unwrap()
                .push(format!("convert-start {}", stem));
            tokio::time::sleep(Duration::from_millis(40)).await;
            self.events
                .lock()
                .unwrap()
                .push(format!("convert-end {}", stem));
            Ok(source.with_extension("wav"))
        }
    }

    struct LoggingTranscriber {
        events: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Transcriber for LoggingTranscriber {
        async fn transcribe(
            &self,
            id: MessageId,
            _wav: &Path,
            _artifacts: &ArtifactStore,
        ) -> Result<String> {
            self.events
                .lock()
                .unwrap()
                .push(format!("transcribe-start {}", id));
            tokio::time::sleep(Duration::from_millis(40)).await;
            self.events
                .lock()
                .unwrap()
                .push(format!("transcribe-end {}", id));
            Ok("t. ".to_string())
        }
    }

    #[tokio::test]
    async fn items_pipeline_without_a_batch_barrier() {
        let dir = tempfile::tempdir().unwrap();
        let batch = batch_of(dir.path(), &[1, 2]);
        let events = Arc::new(Mutex::new(Vec::new()));

        // One conversion slot: item 2 converts while item 1 transcribes
        let pipeline = Pipeline::new(
            Arc::new(LoggingConverter {
                events: events.clone(),
            }),
            Arc::new(LoggingTranscriber {
                events: events.clone(),
            }),
            PipelineLimits {
                convert: 1,
                transcribe: 100,
            },
        );

        pipeline.run(batch, store(dir.path())).await.unwrap();

        let log = events.lock().unwrap().clone();
        let first_transcribe_start = log
            .iter()
            .position(|e| e.starts_with("transcribe-start"))
            .expect("some item transcribed");
        let last_convert_end = log
            .iter()
            .rposition(|e| e.starts_with("convert-end"))
            .expect("some item converted");

        assert!(
            first_transcribe_start < last_convert_end,
            "transcription should overlap with conversion, got {:?}",
            log
        );
    }
}
