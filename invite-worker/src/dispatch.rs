use std::time;

use invite_common::invitation::DispatchRequest;
use tracing::{info, warn};

use crate::error::{DeliveryError, WorkerError};

/// Sends invitation SMS requests to the SMS API, one attempt per request.
pub struct Dispatcher {
    client: reqwest::Client,
}

impl Dispatcher {
    pub fn new(request_timeout: time::Duration) -> Result<Self, WorkerError> {
        let client = reqwest::Client::builder()
            .user_agent("Invite SMS Worker")
            .timeout(request_timeout)
            .build()
            .map_err(|error| {
                WorkerError::ConfigurationError(format!("failed to build http client: {error}"))
            })?;

        Ok(Self { client })
    }

    /// POST `request` as JSON to `request.url`. Any status of 400 or above is a failure.
    pub async fn dispatch(&self, request: &DispatchRequest) -> Result<(), DeliveryError> {
        let url: reqwest::Url = request
            .url
            .parse()
            .map_err(|error| DeliveryError::InvalidUrl {
                url: request.url.to_owned(),
                error,
            })?;

        info!(
            url = %request.url,
            to = %request.to,
            message = %request.message,
            "sending invitation sms"
        );

        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|error| DeliveryError::Transport {
                url: request.url.to_owned(),
                error,
            })?;

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(error) => {
                warn!(url = %request.url, %error, "failed to read sms api response body");
                String::new()
            }
        };

        info!(
            url = %request.url,
            status = status.as_u16(),
            response = %body,
            "sms api responded"
        );

        if status.as_u16() >= 400 {
            return Err(DeliveryError::Status {
                url: request.url.to_owned(),
                status,
                body,
            });
        }

        Ok(())
    }
}
