//! Bounded download fan-out for a batch of voice messages.

use crate::chat::{ChatClient, MessageId, VoiceMessage};
use crate::pipeline::artifacts::ArtifactStore;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Download a batch of voice messages into the work directory, with at most
/// `ceiling` fetches in flight at once.
///
/// Each message lands at `{work_dir}/{id}.oga` and is registered with the
/// artifact store before its fetch starts, so a half-written file gets
/// removed with everything else. Per-file failures are logged and skipped;
/// the rest of the batch proceeds.
pub async fn download_batch(
    client: Arc<dyn ChatClient>,
    messages: Vec<VoiceMessage>,
    work_dir: &Path,
    ceiling: usize,
    artifacts: &Arc<ArtifactStore>,
) -> BTreeMap<MessageId, PathBuf> {
    let gate = Arc::new(Semaphore::new(ceiling.max(1)));
    let mut handles = Vec::new();

    for message in messages {
        let target = work_dir.join(format!("{}.oga", message.id));
        artifacts.register_source(&target);

        let gate = gate.clone();
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            let _permit = gate.acquire_owned().await; // Hold until the fetch is done

            match client.download_audio(&message, &target).await {
                Ok(()) => Some((message.id, target)),
                Err(e) => {
                    log::warn!("Skipping voice message {}: {}", message.id, e);
                    None
                }
            }
        }));
    }

    let mut downloaded = BTreeMap::new();
    for handle in handles {
        match handle.await {
            Ok(Some((id, path))) => {
                downloaded.insert(id, path);
            }
            Ok(None) => {}
            Err(e) => log::warn!("Download task panicked: {}", e),
        }
    }
    downloaded
}
