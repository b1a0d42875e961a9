use std::collections::VecDeque;
use std::time;

use invite_common::queue::{QueueError, QueueSource, RawMessage};
use tokio::time::Instant;
use tracing::debug;

/// Yields messages from a `QueueSource` one at a time until the queue has been quiet for
/// `idle_timeout`.
pub struct Poller<'s, S: ?Sized> {
    source: &'s S,
    queue_url: String,
    /// How long to keep waiting after the last received message (or since start) before giving up.
    idle_timeout: time::Duration,
    /// Upper bound for a single blocking receive.
    max_wait_time: time::Duration,
    max_messages: usize,
    buffer: VecDeque<RawMessage>,
    last_received: Instant,
    exhausted: bool,
}

impl<'s, S: QueueSource + ?Sized> Poller<'s, S> {
    pub fn new(
        source: &'s S,
        queue_url: &str,
        idle_timeout: time::Duration,
        max_wait_time: time::Duration,
        max_messages: usize,
    ) -> Self {
        Self {
            source,
            queue_url: queue_url.to_owned(),
            idle_timeout,
            max_wait_time,
            max_messages,
            buffer: VecDeque::new(),
            last_received: Instant::now(),
            exhausted: false,
        }
    }

    /// Wait for the next message. Returns `Ok(None)` once a receive comes back empty after the
    /// queue has been quiet for the idle timeout, and on every call after that.
    ///
    /// The queue is always asked at least once more when the buffer runs dry, however long the
    /// caller took to handle the previous message.
    pub async fn next_message(&mut self) -> Result<Option<RawMessage>, QueueError> {
        loop {
            if self.exhausted {
                return Ok(None);
            }

            if let Some(message) = self.buffer.pop_front() {
                return Ok(Some(message));
            }

            let wait = self
                .idle_timeout
                .saturating_sub(self.last_received.elapsed())
                .min(self.max_wait_time);
            let batch = self
                .source
                .receive(&self.queue_url, wait, self.max_messages)
                .await?;

            if !batch.is_empty() {
                self.last_received = Instant::now();
                self.buffer.extend(batch);
                continue;
            }

            let idle = self.last_received.elapsed();
            if idle >= self.idle_timeout {
                debug!(
                    queue_url = %self.queue_url,
                    idle_ms = idle.as_millis() as u64,
                    "idle timeout reached, stop polling"
                );
                self.exhausted = true;
                return Ok(None);
            }
        }
    }
}
