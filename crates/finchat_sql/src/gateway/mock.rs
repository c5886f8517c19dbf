//! Mock gateway for deterministic testing
//!
//! Replies are queued and consumed in order. If nothing is queued the call
//! fails, so a test that forgets to queue a reply surfaces immediately, unless
//! a fallback reply was configured (`provider = "mock"` local runs).

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::{GatewayError, ModelGateway};
use crate::prompt::Conversation;

/// A single queued outcome for [`MockGateway::complete`]
#[derive(Debug)]
pub enum CannedReply {
    Text {
        text: String,
        /// Simulated model latency
        delay_ms: u64,
    },
    Failure(GatewayError),
}

impl CannedReply {
    /// Reply with text immediately
    pub fn text(content: impl Into<String>) -> Self {
        CannedReply::Text {
            text: content.into(),
            delay_ms: 0,
        }
    }

    /// Reply with text after a delay
    pub fn with_delay(content: impl Into<String>, delay_ms: u64) -> Self {
        CannedReply::Text {
            text: content.into(),
            delay_ms,
        }
    }

    /// Fail the call with the given error
    pub fn failure(error: GatewayError) -> Self {
        CannedReply::Failure(error)
    }
}

/// Gateway with canned replies and a record of what it was sent
#[derive(Clone, Default)]
pub struct MockGateway {
    replies: Arc<Mutex<VecDeque<CannedReply>>>,
    received: Arc<Mutex<Vec<Conversation>>>,
    fallback: Option<String>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer with `reply` whenever the queue is empty
    pub fn with_fallback(reply: impl Into<String>) -> Self {
        Self {
            fallback: Some(reply.into()),
            ..Self::default()
        }
    }

    /// Queue a reply for the next call
    pub fn queue_reply(&self, reply: CannedReply) {
        self.replies().push_back(reply);
    }

    /// Queue several replies in order
    pub fn queue_replies(&self, replies: impl IntoIterator<Item = CannedReply>) {
        self.replies().extend(replies);
    }

    /// Conversations received so far, oldest first
    pub fn received(&self) -> Vec<Conversation> {
        self.received_log().clone()
    }

    pub fn replies_remaining(&self) -> usize {
        self.replies().len()
    }

    // Poisoned locks are recovered; a single push or pop cannot be torn.
    fn replies(&self) -> MutexGuard<'_, VecDeque<CannedReply>> {
        self.replies.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn received_log(&self) -> MutexGuard<'_, Vec<Conversation>> {
        self.received.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ModelGateway for MockGateway {
    fn name(&self) -> &str {
        "Mock"
    }

    fn model(&self) -> &str {
        "mock-sql-model"
    }

    async fn complete(&self, conversation: &Conversation) -> Result<String, GatewayError> {
        self.received_log().push(conversation.clone());

        let reply = self
            .replies()
            .pop_front()
            .or_else(|| self.fallback.clone().map(CannedReply::text))
            .ok_or_else(|| {
                GatewayError::Internal(
                    "MockGateway: no replies queued; queue replies before calling complete"
                        .to_string(),
                )
            })?;

        match reply {
            CannedReply::Text { text, delay_ms } => {
                if delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
                Ok(text.trim().to_string())
            }
            CannedReply::Failure(error) => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt;

    #[tokio::test]
    async fn test_replies_in_order() {
        let mock = MockGateway::new();
        mock.queue_replies([CannedReply::text(" first \n"), CannedReply::text("second")]);

        let convo = prompt::build("u-1", "hello");
        assert_eq!(mock.complete(&convo).await.unwrap(), "first");
        assert_eq!(mock.complete(&convo).await.unwrap(), "second");
        assert_eq!(mock.replies_remaining(), 0);
    }

    #[tokio::test]
    async fn test_empty_queue_errors() {
        let mock = MockGateway::new();
        let result = mock.complete(&prompt::build("u-1", "hello")).await;
        assert!(matches!(result, Err(GatewayError::Internal(_))));
    }

    #[tokio::test]
    async fn test_fallback_when_queue_empty() {
        let mock = MockGateway::with_fallback("SELECT * FROM budgets WHERE user_id = 'x'");
        mock.queue_reply(CannedReply::text("queued"));

        let convo = prompt::build("u-1", "hello");
        assert_eq!(mock.complete(&convo).await.unwrap(), "queued");
        assert_eq!(
            mock.complete(&convo).await.unwrap(),
            "SELECT * FROM budgets WHERE user_id = 'x'"
        );
    }

    #[tokio::test]
    async fn test_records_conversations() {
        let mock = MockGateway::new();
        mock.queue_reply(CannedReply::text("SELECT 1"));

        let convo = prompt::build("u-7", "Show my budgets");
        mock.complete(&convo).await.unwrap();

        let received = mock.received();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0], convo);
    }

    #[tokio::test]
    async fn test_queued_failure() {
        let mock = MockGateway::new();
        mock.queue_reply(CannedReply::failure(GatewayError::Http(
            "connection refused".to_string(),
        )));

        let result = mock.complete(&prompt::build("u-1", "hello")).await;
        assert!(matches!(result, Err(GatewayError::Http(_))));
    }

    #[tokio::test]
    async fn test_poisoned_lock_is_recovered() {
        let mock = MockGateway::new();
        let handle = mock.clone();
        let panicked = std::thread::spawn(move || {
            let _guard = handle.replies.lock().unwrap();
            panic!("test thread dies holding the reply lock");
        })
        .join();
        assert!(panicked.is_err());
        assert!(mock.replies.is_poisoned());

        mock.queue_reply(CannedReply::text("SELECT 1"));
        assert_eq!(mock.replies_remaining(), 1);
        assert_eq!(
            mock.complete(&prompt::build("u-1", "hello")).await.unwrap(),
            "SELECT 1"
        );
        assert_eq!(mock.received().len(), 1);
    }

    #[tokio::test]
    async fn test_clones_share_queue() {
        let mock = MockGateway::new();
        let handle = mock.clone();
        handle.queue_reply(CannedReply::text("SELECT 1"));
        assert_eq!(mock.replies_remaining(), 1);
    }
}
