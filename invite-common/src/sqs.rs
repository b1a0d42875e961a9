//! `QueueSource` backed by AWS SQS.
use std::time;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_sqs::config::Credentials;
use aws_sdk_sqs::Client;
use tracing::{debug, warn};

use crate::queue::{QueueError, QueueSource, RawMessage};

/// SQS refuses long polls longer than this.
const MAX_WAIT_TIME_SECONDS: u64 = 20;
/// SQS refuses batches larger than this.
const MAX_NUMBER_OF_MESSAGES: usize = 10;

#[derive(Debug, Clone)]
pub struct StaticCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

/// Everything needed to reach SQS, supplied once at startup.
#[derive(Debug, Clone)]
pub struct SqsConfig {
    pub region: String,
    /// When absent, the default AWS credential chain is used.
    pub credentials: Option<StaticCredentials>,
    /// Override the service endpoint, e.g. for a local emulator.
    pub endpoint: Option<String>,
}

pub struct SqsQueue {
    client: Client,
}

impl SqsQueue {
    pub async fn new(config: SqsConfig) -> Self {
        let mut aws_config_builder = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region));

        if let Some(credentials) = config.credentials {
            aws_config_builder = aws_config_builder.credentials_provider(Credentials::new(
                credentials.access_key_id,
                credentials.secret_access_key,
                None,
                None,
                "invite-worker",
            ));
        }

        if let Some(endpoint) = &config.endpoint {
            aws_config_builder = aws_config_builder.endpoint_url(endpoint);
        }

        let aws_config = aws_config_builder.load().await;

        Self {
            client: Client::new(&aws_config),
        }
    }
}

/// Long polls are whole seconds. Round up so that a short remaining window
/// still blocks instead of spinning on empty receives.
fn wait_time_seconds(wait: time::Duration) -> i32 {
    let mut seconds = wait.as_secs();
    if wait.subsec_nanos() > 0 {
        seconds += 1;
    }
    seconds.min(MAX_WAIT_TIME_SECONDS) as i32
}

#[async_trait]
impl QueueSource for SqsQueue {
    async fn resolve_queue_url(&self, queue_name: &str) -> Result<String, QueueError> {
        let output = self
            .client
            .get_queue_url()
            .queue_name(queue_name)
            .send()
            .await
            .map_err(|error| QueueError::ResolveError {
                queue_name: queue_name.to_owned(),
                message: aws_sdk_sqs::Error::from(error).to_string(),
            })?;

        output
            .queue_url()
            .map(str::to_owned)
            .ok_or_else(|| QueueError::ResolveError {
                queue_name: queue_name.to_owned(),
                message: "no queue url returned".to_owned(),
            })
    }

    async fn receive(
        &self,
        queue_url: &str,
        wait: time::Duration,
        max_messages: usize,
    ) -> Result<Vec<RawMessage>, QueueError> {
        let output = self
            .client
            .receive_message()
            .queue_url(queue_url)
            .wait_time_seconds(wait_time_seconds(wait))
            .max_number_of_messages(max_messages.clamp(1, MAX_NUMBER_OF_MESSAGES) as i32)
            .send()
            .await
            .map_err(|error| QueueError::ReceiveError {
                queue_url: queue_url.to_owned(),
                message: aws_sdk_sqs::Error::from(error).to_string(),
            })?;

        let mut messages = Vec::new();
        for message in output.messages() {
            match (message.message_id(), message.receipt_handle()) {
                (Some(message_id), Some(receipt_handle)) => messages.push(RawMessage {
                    message_id: message_id.to_owned(),
                    receipt_handle: receipt_handle.to_owned(),
                    body: message.body().unwrap_or_default().to_owned(),
                }),
                _ => warn!("received a message without id or receipt handle, ignoring it"),
            }
        }

        debug!(queue_url, count = messages.len(), "received messages");

        Ok(messages)
    }

    async fn acknowledge(&self, queue_url: &str, message: &RawMessage) -> Result<(), QueueError> {
        self.client
            .delete_message()
            .queue_url(queue_url)
            .receipt_handle(&message.receipt_handle)
            .send()
            .await
            .map_err(|error| QueueError::AcknowledgeError {
                message_id: message.message_id.to_owned(),
                message: aws_sdk_sqs::Error::from(error).to_string(),
            })?;

        Ok(())
    }
}
