use std::fmt;
use std::process::ExitCode;
use std::time;

use invite_common::invitation::{DispatchRequest, InvitationEvent};
use invite_common::metrics::{
    MESSAGES_DUPLICATE, MESSAGES_RECEIVED, SMS_DISPATCHED, SMS_DISPATCH_DURATION, SMS_FAILED,
};
use invite_common::queue::QueueSource;
use tracing::{debug, info, warn};

use crate::dedupe::Deduplicator;
use crate::dispatch::Dispatcher;
use crate::error::WorkerError;
use crate::poller::Poller;

/// Polling parameters for a single run.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Logical name of the queue, resolved into a url when the run starts.
    pub queue_name: String,
    pub idle_timeout: time::Duration,
    pub max_wait_time: time::Duration,
    pub max_messages: usize,
}

/// Counters describing a completed run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub received: usize,
    pub duplicates: usize,
    pub dispatched: usize,
}

/// The one line reported when the process ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    Error(String),
}

impl RunStatus {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            RunStatus::Success => ExitCode::SUCCESS,
            RunStatus::Error(_) => ExitCode::FAILURE,
        }
    }
}

impl<T> From<&Result<T, WorkerError>> for RunStatus {
    fn from(result: &Result<T, WorkerError>) -> Self {
        match result {
            Ok(_) => RunStatus::Success,
            Err(error) => RunStatus::Error(error.to_string()),
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Success => write!(f, "STATUS: SUCCESS"),
            RunStatus::Error(cause) => write!(f, "STATUS: ERROR ({cause})"),
        }
    }
}

/// Drains the invitation queue, sending one SMS per distinct invitation.
///
/// Messages are handled strictly one after the other. The first error of any kind ends the run;
/// the message being handled at that point is not acknowledged and stays on the queue.
pub struct InviteWorker<S> {
    source: S,
    dispatcher: Dispatcher,
    settings: WorkerSettings,
}

impl<S: QueueSource> InviteWorker<S> {
    pub fn new(source: S, dispatcher: Dispatcher, settings: WorkerSettings) -> Self {
        Self {
            source,
            dispatcher,
            settings,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Poll until the queue has been idle for the configured timeout.
    pub async fn run(&self) -> Result<RunSummary, WorkerError> {
        let queue_url = self
            .source
            .resolve_queue_url(&self.settings.queue_name)
            .await
            .map_err(WorkerError::QueueResolutionError)?;

        info!(queue_url = %queue_url, "polling for sms invitations");

        let mut poller = Poller::new(
            &self.source,
            &queue_url,
            self.settings.idle_timeout,
            self.settings.max_wait_time,
            self.settings.max_messages,
        );
        let mut deduplicator = Deduplicator::new();
        let mut summary = RunSummary::default();

        while let Some(message) = poller.next_message().await? {
            summary.received += 1;
            metrics::counter!(MESSAGES_RECEIVED).increment(1);

            let event = InvitationEvent::from_message(&message)?;

            if deduplicator.check_and_mark(&event) {
                self.deliver(&event).await?;
                summary.dispatched += 1;
            } else {
                debug!(
                    message_id = %message.message_id,
                    "invitation already sent in this run, skipping"
                );
                metrics::counter!(MESSAGES_DUPLICATE).increment(1);
                summary.duplicates += 1;
            }

            self.source.acknowledge(&queue_url, &message).await?;
        }

        info!(
            received = summary.received,
            duplicates = summary.duplicates,
            dispatched = summary.dispatched,
            "queue idle, stopping"
        );

        Ok(summary)
    }

    async fn deliver(&self, event: &InvitationEvent) -> Result<(), WorkerError> {
        let request = DispatchRequest::from(event);
        let now = tokio::time::Instant::now();

        let result = self.dispatcher.dispatch(&request).await;

        metrics::histogram!(SMS_DISPATCH_DURATION).record(now.elapsed().as_secs_f64());
        match result {
            Ok(()) => {
                metrics::counter!(SMS_DISPATCHED).increment(1);
                Ok(())
            }
            Err(error) => {
                warn!(url = error.url(), to = %request.to, "sms delivery failed");
                metrics::counter!(SMS_FAILED).increment(1);
                Err(error.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use invite_common::queue::{MemoryQueue, QueueError};

    use super::*;
    use crate::error::DeliveryError;

    #[test]
    fn test_run_status_lines() {
        let success: Result<RunSummary, WorkerError> = Ok(RunSummary::default());
        assert_eq!(RunStatus::from(&success).to_string(), "STATUS: SUCCESS");

        let failure: Result<RunSummary, WorkerError> =
            Err(WorkerError::ConfigurationError("SMS_NOTI_QUEUE is missing".to_owned()));
        let status = RunStatus::from(&failure);
        assert_eq!(
            status.to_string(),
            "STATUS: ERROR (invalid configuration: SMS_NOTI_QUEUE is missing)"
        );
    }

    #[tokio::test]
    async fn test_unresolvable_queue_fails_before_polling() {
        let worker = InviteWorker::new(
            MemoryQueue::new().unresolvable(),
            Dispatcher::new(time::Duration::from_secs(1)).unwrap(),
            WorkerSettings {
                queue_name: "sms-invitations".to_owned(),
                idle_timeout: time::Duration::from_millis(50),
                max_wait_time: time::Duration::from_millis(50),
                max_messages: 10,
            },
        );

        let error = worker.run().await.unwrap_err();

        assert!(matches!(
            error,
            WorkerError::QueueResolutionError(QueueError::ResolveError { .. })
        ));
        assert!(worker.source().waits().is_empty());
    }

    #[test]
    fn test_delivery_error_status_names_url() {
        let error: WorkerError = DeliveryError::InvalidUrl {
            url: "nope".to_owned(),
            error: url::ParseError::RelativeUrlWithoutBase,
        }
        .into();

        assert!(RunStatus::from(&Err::<(), _>(error)).to_string().contains("nope"));
    }
}
