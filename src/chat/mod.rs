//! Chat platform access: listing recent voice messages and fetching audio.

pub mod download;
pub mod spool;

pub use download::download_batch;
pub use spool::SpoolChatClient;

use crate::error::{RelayError, Result};
use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Identifier of one voice message within its chat.
///
/// Ids are assigned by the platform in ascending arrival order, so sorting
/// by id reproduces the order messages were sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId(pub i64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One voice message discovered in a chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceMessage {
    pub id: MessageId,
    /// Platform-side locator for the audio (spool path, remote file id, ...).
    pub remote: String,
}

/// A chat with its recently received voice messages, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatHistory {
    /// Human-readable chat label, used when relaying transcripts.
    pub label: String,
    pub messages: Vec<VoiceMessage>,
}

/// Trait for the chat platform the relay watches.
///
/// This trait allows swapping implementations (spool directory vs mock).
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// List recent voice messages, scanning at most `chat_limit` chats and
    /// the `history_limit` newest messages of each.
    async fn list_recent(&self, chat_limit: usize, history_limit: usize)
    -> Result<Vec<ChatHistory>>;

    /// Fetch one message's audio into `target`.
    async fn download_audio(&self, message: &VoiceMessage, target: &Path) -> Result<()>;
}

/// Implement ChatClient for Arc<T> to allow sharing across tasks.
#[async_trait]
impl<T: ChatClient + ?Sized> ChatClient for Arc<T> {
    async fn list_recent(
        &self,
        chat_limit: usize,
        history_limit: usize,
    ) -> Result<Vec<ChatHistory>> {
        (**self).list_recent(chat_limit, history_limit).await
    }

    async fn download_audio(&self, message: &VoiceMessage, target: &Path) -> Result<()> {
        (**self).download_audio(message, target).await
    }
}

/// Mock chat client for testing.
///
/// Serves a fixed set of chats and writes placeholder audio bytes on
/// download.
#[derive(Debug, Clone, Default)]
pub struct MockChatClient {
    chats: Vec<ChatHistory>,
    fail_downloads: Vec<MessageId>,
}

impl MockChatClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a chat with the given voice message ids, newest first.
    pub fn with_chat(mut self, label: &str, ids: &[i64]) -> Self {
        let messages = ids
            .iter()
            .map(|&id| VoiceMessage {
                id: MessageId(id),
                remote: format!("{}/{}.oga", label, id),
            })
            .collect();
        self.chats.push(ChatHistory {
            label: label.to_string(),
            messages,
        });
        self
    }

    /// Configure downloads of `id` to fail.
    pub fn with_download_failure(mut self, id: i64) -> Self {
        self.fail_downloads.push(MessageId(id));
        self
    }
}

#[async_trait]
impl ChatClient for MockChatClient {
    async fn list_recent(
        &self,
        chat_limit: usize,
        history_limit: usize,
    ) -> Result<Vec<ChatHistory>> {
        Ok(self
            .chats
            .iter()
            .take(chat_limit)
            .map(|chat| ChatHistory {
                label: chat.label.clone(),
                messages: chat.messages.iter().take(history_limit).cloned().collect(),
            })
            .collect())
    }

    async fn download_audio(&self, message: &VoiceMessage, target: &Path) -> Result<()> {
        if self.fail_downloads.contains(&message.id) {
            return Err(RelayError::ChatClient {
                message: format!("mock download failure for {}", message.id),
            });
        }
        tokio::fs::write(target, b"mock voice audio")
            .await
            .map_err(|e| RelayError::ChatClient {
                message: format!("Failed to write {}: {}", target.display(), e),
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_ids_order_by_value() {
        let mut ids = vec![MessageId(30), MessageId(2), MessageId(17)];
        ids.sort();
        assert_eq!(ids, vec![MessageId(2), MessageId(17), MessageId(30)]);
    }

    #[test]
    fn message_id_displays_as_plain_number() {
        assert_eq!(MessageId(1234).to_string(), "1234");
        assert_eq!(MessageId(-5).to_string(), "-5");
    }

    #[tokio::test]
    async fn mock_client_honors_chat_limit() {
        let client = MockChatClient::new()
            .with_chat("alice", &[3, 2, 1])
            .with_chat("bob", &[7])
            .with_chat("carol", &[9]);

        let chats = client.list_recent(2, 10).await.unwrap();

        assert_eq!(chats.len(), 2);
        assert_eq!(chats[0].label, "alice");
        assert_eq!(chats[1].label, "bob");
    }

    #[tokio::test]
    async fn mock_client_honors_history_limit() {
        let client = MockChatClient::new().with_chat("alice", &[5, 4, 3, 2, 1]);

        let chats = client.list_recent(10, 2).await.unwrap();

        let ids: Vec<i64> = chats[0].messages.iter().map(|m| m.id.0).collect();
        assert_eq!(ids, vec![5, 4]);
    }

    #[tokio::test]
    async fn mock_client_writes_audio_on_download() {
        let dir = tempfile::tempdir().unwrap();
        let client = MockChatClient::new().with_chat("alice", &[1]);
        let chats = client.list_recent(1, 1).await.unwrap();
        let message = &chats[0].messages[0];

        let target = dir.path().join("1.oga");
        client.download_audio(message, &target).await.unwrap();

        assert!(target.exists());
    }

    #[tokio::test]
    async fn mock_client_download_failure_is_chat_client_error() {
        let dir = tempfile::tempdir().unwrap();
        let client = MockChatClient::new()
            .with_chat("alice", &[1])
            .with_download_failure(1);
        let chats = client.list_recent(1, 1).await.unwrap();
        let message = &chats[0].messages[0];

        let result = client
            .download_audio(message, &dir.path().join("1.oga"))
            .await;

        match result {
            Err(RelayError::ChatClient { message }) => {
                assert!(message.contains("mock download failure"));
            }
            other => panic!("Expected ChatClient error, got {:?}", other),
        }
    }
}
