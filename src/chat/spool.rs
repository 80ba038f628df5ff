//! Spool-directory chat client.
//!
//! A platform bridge deposits voice messages under a spool directory, one
//! subdirectory per chat (the directory name is the chat label), with voice
//! files named `{message_id}.oga`. Anything else in there is ignored.

use crate::chat::{ChatClient, ChatHistory, MessageId, VoiceMessage};
use crate::error::{RelayError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Chat client backed by a local spool directory.
pub struct SpoolChatClient {
    spool_dir: PathBuf,
}

impl SpoolChatClient {
    pub fn new(spool_dir: impl Into<PathBuf>) -> Self {
        Self {
            spool_dir: spool_dir.into(),
        }
    }

    async fn scan_chat(&self, chat_dir: &Path, history_limit: usize) -> Result<Vec<VoiceMessage>> {
        let mut entries =
            tokio::fs::read_dir(chat_dir)
                .await
                .map_err(|e| RelayError::ChatClient {
                    message: format!("Failed to read chat {}: {}", chat_dir.display(), e),
                })?;

        let mut messages = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| RelayError::ChatClient {
                message: format!("Failed to read chat {}: {}", chat_dir.display(), e),
            })?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("oga") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let Ok(id) = stem.parse::<i64>() else {
                continue;
            };
            messages.push(VoiceMessage {
                id: MessageId(id),
                remote: path.display().to_string(),
            });
        }

        // Newest first, then cap at the per-chat history window
        messages.sort_by(|a, b| b.id.cmp(&a.id));
        messages.truncate(history_limit);
        Ok(messages)
    }
}

#[async_trait]
impl ChatClient for SpoolChatClient {
    async fn list_recent(
        &self,
        chat_limit: usize,
        history_limit: usize,
    ) -> Result<Vec<ChatHistory>> {
        let mut entries =
            tokio::fs::read_dir(&self.spool_dir)
                .await
                .map_err(|e| RelayError::ChatClient {
                    message: format!(
                        "Failed to read spool directory {}: {}",
                        self.spool_dir.display(),
                        e
                    ),
                })?;

        let mut chat_dirs = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| RelayError::ChatClient {
                message: format!(
                    "Failed to read spool directory {}: {}",
                    self.spool_dir.display(),
                    e
                ),
            })?
        {
            let file_type = entry.file_type().await.map_err(|e| RelayError::ChatClient {
                message: format!("Failed to stat {}: {}", entry.path().display(), e),
            })?;
            if file_type.is_dir() {
                chat_dirs.push(entry.path());
            }
        }

        // Directory iteration order is arbitrary; keep the scan deterministic
        chat_dirs.sort();

        let mut chats = Vec::new();
        for chat_dir in chat_dirs.into_iter().take(chat_limit) {
            let label = chat_dir
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let messages = self.scan_chat(&chat_dir, history_limit).await?;
            chats.push(ChatHistory { label, messages });
        }

        Ok(chats)
    }

    async fn download_audio(&self, message: &VoiceMessage, target: &Path) -> Result<()> {
        tokio::fs::copy(&message.remote, target)
            .await
            .map_err(|e| RelayError::ChatClient {
                message: format!("Failed to fetch {}: {}", message.remote, e),
            })?;
        Ok(())
    }
}
