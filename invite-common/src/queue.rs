use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time;

use async_trait::async_trait;
use thiserror::Error;

/// Enumeration of errors raised by a `QueueSource`.
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("queue {queue_name} could not be resolved: {message}")]
    ResolveError { queue_name: String, message: String },
    #[error("failed to receive messages from {queue_url}: {message}")]
    ReceiveError { queue_url: String, message: String },
    #[error("failed to acknowledge message {message_id}: {message}")]
    AcknowledgeError { message_id: String, message: String },
}

/// A message as handed out by the queue, before its body is interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    /// Identifier assigned by the queue.
    pub message_id: String,
    /// Handle required to delete this particular delivery of the message.
    pub receipt_handle: String,
    pub body: String,
}

impl RawMessage {
    pub fn new(message_id: &str, body: &str) -> Self {
        Self {
            message_id: message_id.to_owned(),
            receipt_handle: format!("{message_id}-receipt"),
            body: body.to_owned(),
        }
    }
}

/// An at-least-once message source.
#[async_trait]
pub trait QueueSource: Send + Sync {
    /// Resolve a logical queue name into the url used by every other call.
    async fn resolve_queue_url(&self, queue_name: &str) -> Result<String, QueueError>;

    /// Block for up to `wait` until messages are available, returning at most `max_messages`.
    /// An empty batch means nothing arrived in time.
    async fn receive(
        &self,
        queue_url: &str,
        wait: time::Duration,
        max_messages: usize,
    ) -> Result<Vec<RawMessage>, QueueError>;

    /// Remove a fully processed message from the queue so it is not redelivered.
    async fn acknowledge(&self, queue_url: &str, message: &RawMessage) -> Result<(), QueueError>;
}

enum Scripted {
    Batch(Vec<RawMessage>),
    Failure(String),
}

/// An in-process `QueueSource` that replays scripted batches.
/// Once the script runs out, every receive waits for the full duration and returns nothing.
#[derive(Default)]
pub struct MemoryQueue {
    script: Mutex<VecDeque<Scripted>>,
    unresolvable: bool,
    unacknowledgeable: Vec<String>,
    acknowledged: Mutex<Vec<String>>,
    waits: Mutex<Vec<time::Duration>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `resolve_queue_url` fail, as if the queue did not exist.
    pub fn unresolvable(mut self) -> Self {
        self.unresolvable = true;
        self
    }

    pub fn push_batch(self, messages: Vec<RawMessage>) -> Self {
        lock(&self.script).push_back(Scripted::Batch(messages));
        self
    }

    pub fn push_failure(self, message: &str) -> Self {
        lock(&self.script).push_back(Scripted::Failure(message.to_owned()));
        self
    }

    /// Make `acknowledge` fail for the message with this id.
    pub fn push_ack_failure(mut self, message_id: &str) -> Self {
        self.unacknowledgeable.push(message_id.to_owned());
        self
    }

    /// Ids of acknowledged messages, in acknowledgement order.
    pub fn acknowledged(&self) -> Vec<String> {
        lock(&self.acknowledged).clone()
    }

    /// Wait durations requested by each receive call.
    pub fn waits(&self) -> Vec<time::Duration> {
        lock(&self.waits).clone()
    }
}

#[async_trait]
impl QueueSource for MemoryQueue {
    async fn resolve_queue_url(&self, queue_name: &str) -> Result<String, QueueError> {
        if self.unresolvable {
            return Err(QueueError::ResolveError {
                queue_name: queue_name.to_owned(),
                message: "queue does not exist".to_owned(),
            });
        }

        Ok(format!("memory://{queue_name}"))
    }

    async fn receive(
        &self,
        queue_url: &str,
        wait: time::Duration,
        max_messages: usize,
    ) -> Result<Vec<RawMessage>, QueueError> {
        lock(&self.waits).push(wait);

        let next = lock(&self.script).pop_front();

        match next {
            Some(Scripted::Batch(mut messages)) => {
                if messages.len() > max_messages {
                    let rest = messages.split_off(max_messages);
                    lock(&self.script).push_front(Scripted::Batch(rest));
                }
                Ok(messages)
            }
            Some(Scripted::Failure(message)) => Err(QueueError::ReceiveError {
                queue_url: queue_url.to_owned(),
                message,
            }),
            None => {
                tokio::time::sleep(wait).await;
                Ok(Vec::new())
            }
        }
    }

    async fn acknowledge(&self, _queue_url: &str, message: &RawMessage) -> Result<(), QueueError> {
        if self.unacknowledgeable.contains(&message.message_id) {
            return Err(QueueError::AcknowledgeError {
                message_id: message.message_id.to_owned(),
                message: "receipt handle is invalid".to_owned(),
            });
        }

        lock(&self.acknowledged).push(message.message_id.to_owned());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_queue_splits_batches_by_max_messages() {
        let queue = MemoryQueue::new().push_batch(vec![
            RawMessage::new("1", "{}"),
            RawMessage::new("2", "{}"),
            RawMessage::new("3", "{}"),
        ]);
        let wait = time::Duration::from_millis(1);

        let first = queue.receive("memory://q", wait, 2).await.unwrap();
        let second = queue.receive("memory://q", wait, 2).await.unwrap();
        let third = queue.receive("memory://q", wait, 2).await.unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(second, vec![RawMessage::new("3", "{}")]);
        assert!(third.is_empty());
        assert_eq!(queue.waits(), vec![wait; 3]);
    }

    #[tokio::test]
    async fn test_memory_queue_failures() {
        let queue = MemoryQueue::new()
            .unresolvable()
            .push_failure("connection reset")
            .push_ack_failure("1");

        assert!(matches!(
            queue.resolve_queue_url("invites").await,
            Err(QueueError::ResolveError { .. })
        ));

        let error = queue
            .receive("memory://invites", time::Duration::ZERO, 10)
            .await
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "failed to receive messages from memory://invites: connection reset"
        );

        assert!(matches!(
            queue
                .acknowledge("memory://invites", &RawMessage::new("1", "{}"))
                .await,
            Err(QueueError::AcknowledgeError { .. })
        ));
        queue
            .acknowledge("memory://invites", &RawMessage::new("2", "{}"))
            .await
            .unwrap();
        assert_eq!(queue.acknowledged(), vec!["2"]);
    }
}
