//! One scheduling tick of the relay: scan, filter, download, transcribe,
//! deliver.

use crate::audio::convert::AudioConverter;
use crate::chat::{ChatClient, download_batch};
use crate::config::Config;
use crate::dedup::DedupCache;
use crate::error::Result;
use crate::notify::Notifier;
use crate::pipeline::{ArtifactStore, Pipeline, PipelineLimits};
use crate::stt::Transcriber;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Counters from one completed tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickSummary {
    /// Chats scanned this tick.
    pub chats: usize,
    /// Voice messages not seen on an earlier tick.
    pub fresh: usize,
    /// Transcripts delivered to the operator.
    pub relayed: usize,
    /// Fresh messages that produced no delivery (download, pipeline or send
    /// failure).
    pub failed: usize,
}

impl fmt::Display for TickSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} chat(s) scanned, {} fresh, {} relayed, {} failed",
            self.chats, self.fresh, self.relayed, self.failed
        )
    }
}

/// Ties the collaborators together and runs scheduling ticks.
pub struct RelayService {
    chat: Arc<dyn ChatClient>,
    notifier: Arc<dyn Notifier>,
    pipeline: Pipeline,
    dedup: DedupCache,
    work_dir: PathBuf,
    chat_limit: usize,
    history_limit: usize,
    download_concurrency: usize,
    silent: bool,
}

impl RelayService {
    pub fn new(
        config: &Config,
        chat: Arc<dyn ChatClient>,
        converter: Arc<dyn AudioConverter>,
        transcriber: Arc<dyn Transcriber>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let limits = PipelineLimits {
            convert: config.pipeline.convert_concurrency,
            transcribe: config.pipeline.transcribe_concurrency,
        };

        Self {
            chat,
            notifier,
            pipeline: Pipeline::new(converter, transcriber, limits),
            dedup: DedupCache::new(),
            work_dir: config.work_dir(),
            chat_limit: config.chat.chat_limit,
            history_limit: config.chat.history_limit,
            download_concurrency: config.pipeline.download_concurrency,
            silent: config.notify.silent,
        }
    }

    /// Runs one tick over every watched chat.
    ///
    /// Fresh ids are recorded at filter time: a message whose download or
    /// transcription later fails is not retried on the next tick. Whole-chat
    /// failures are logged and the tick moves on to the remaining chats;
    /// only a failed chat scan aborts the tick.
    pub async fn process_once(&mut self) -> Result<TickSummary> {
        let chats = self
            .chat
            .list_recent(self.chat_limit, self.history_limit)
            .await?;
        tokio::fs::create_dir_all(&self.work_dir).await?;

        let mut summary = TickSummary {
            chats: chats.len(),
            ..Default::default()
        };

        for chat in chats {
            let mut fresh = Vec::new();
            for message in &chat.messages {
                if !self.dedup.seen(message.id) {
                    self.dedup.record(message.id);
                    fresh.push(message.clone());
                }
            }
            summary.fresh += fresh.len();

            if fresh.is_empty() {
                log::debug!("{}: nothing new", chat.label);
                continue;
            }
            log::info!("{}: {} fresh voice message(s)", chat.label, fresh.len());

            let artifacts = Arc::new(ArtifactStore::new(self.work_dir.join("segments")));
            let downloaded = download_batch(
                self.chat.clone(),
                fresh,
                &self.work_dir,
                self.download_concurrency,
                &artifacts,
            )
            .await;

            let results = match self.pipeline.run(downloaded, artifacts).await {
                Ok(results) => results,
                Err(e) => {
                    log::error!("Skipping chat {}: {}", chat.label, e);
                    continue;
                }
            };

            // BTreeMap iteration delivers in ascending id order
            for (id, text) in results {
                let body = format!("Audio from: {}\n{}", chat.label, text);
                match self.notifier.send_text(&body, self.silent).await {
                    Ok(()) => summary.relayed += 1,
                    Err(e) => log::warn!("Failed to relay message {}: {}", id, e),
                }
            }
        }

        summary.failed = summary.fresh - summary.relayed;
        Ok(summary)
    }
}
