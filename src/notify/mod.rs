//! Delivery of finished transcripts to the operator.

pub mod http;

pub use http::HttpNotifier;

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::Mutex;

/// Outbound message transport.
///
/// This trait allows swapping implementations (HTTP endpoint vs mock).
/// `silent` delivers without an audible alert on the receiving side.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_text(&self, body: &str, silent: bool) -> Result<()>;
}

#[async_trait]
impl<T: Notifier + ?Sized> Notifier for Arc<T> {
    async fn send_text(&self, body: &str, silent: bool) -> Result<()> {
        (**self).send_text(body, silent).await
    }
}

/// Mock notifier that records every delivered body, for testing.
#[derive(Default)]
pub struct MockNotifier {
    sent: Mutex<Vec<(String, bool)>>,
    fail_containing: Option<String>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails any send whose body contains the marker.
    pub fn with_failure_on(mut self, marker: impl Into<String>) -> Self {
        self.fail_containing = Some(marker.into());
        self
    }

    /// Bodies delivered so far, in send order.
    pub fn sent_bodies(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(body, _)| body.clone())
            .collect()
    }

    /// Delivered (body, silent) pairs, in send order.
    pub fn sent(&self) -> Vec<(String, bool)> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send_text(&self, body: &str, silent: bool) -> Result<()> {
        if let Some(marker) = &self.fail_containing
            && body.contains(marker.as_str())
        {
            return Err(crate::error::RelayError::Notify {
                message: format!("mock delivery failure for {:?}", marker),
            });
        }
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((body.to_string(), silent));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RelayError;

    #[tokio::test]
    async fn mock_records_bodies_in_order() {
        let notifier = MockNotifier::new();

        notifier.send_text("first", false).await.unwrap();
        notifier.send_text("second", true).await.unwrap();

        assert_eq!(notifier.sent_bodies(), vec!["first", "second"]);
        assert_eq!(
            notifier.sent(),
            vec![("first".to_string(), false), ("second".to_string(), true)]
        );
    }

    #[tokio::test]
    async fn mock_failure_marker_rejects_matching_bodies() {
        let notifier = MockNotifier::new().with_failure_on("bad");

        notifier.send_text("good news", false).await.unwrap();
        let err = notifier.send_text("bad news", false).await.unwrap_err();

        assert!(matches!(err, RelayError::Notify { .. }));
        assert_eq!(notifier.sent_bodies(), vec!["good news"]);
    }

    #[test]
    fn notifier_trait_is_object_safe() {
        let _boxed: Box<dyn Notifier> = Box::new(MockNotifier::new());
    }

    #[tokio::test]
    async fn arc_wrapped_notifier_is_usable() {
        let notifier: Arc<dyn Notifier> = Arc::new(MockNotifier::new());
        notifier.send_text("via arc", true).await.unwrap();
    }
}
