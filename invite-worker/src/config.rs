use std::str::FromStr;
use std::time;

use envconfig::Envconfig;
use invite_common::sqs::{SqsConfig, StaticCredentials};

use crate::error::WorkerError;
use crate::worker::WorkerSettings;

#[derive(Envconfig, Clone)]
pub struct Config {
    #[envconfig(from = "AWS_REGION")]
    pub aws_region: NonEmptyString,

    #[envconfig(from = "AWS_ACCESS_KEY_ID")]
    pub aws_access_key_id: Option<NonEmptyString>,

    #[envconfig(from = "AWS_SECRET_ACCESS_KEY")]
    pub aws_secret_access_key: Option<NonEmptyString>,

    #[envconfig(from = "SQS_ENDPOINT")]
    pub sqs_endpoint: Option<NonEmptyString>,

    #[envconfig(from = "SMS_NOTI_QUEUE")]
    pub queue_name: NonEmptyString,

    #[envconfig(from = "IDLE_TIMEOUT", default = "5000")]
    pub idle_timeout: EnvMsDuration,

    #[envconfig(from = "MAX_WAIT_TIME", default = "20000")]
    pub max_wait_time: EnvMsDuration,

    #[envconfig(from = "MAX_MESSAGES", default = "10")]
    pub max_messages: usize,

    #[envconfig(from = "REQUEST_TIMEOUT", default = "5000")]
    pub request_timeout: EnvMsDuration,

    #[envconfig(from = "METRICS_PORT")]
    pub metrics_port: Option<u16>,
}

impl Config {
    /// Everything the SQS client needs. Static credentials are only used when both halves are set.
    pub fn sqs_config(&self) -> Result<SqsConfig, WorkerError> {
        let credentials = match (&self.aws_access_key_id, &self.aws_secret_access_key) {
            (Some(access_key_id), Some(secret_access_key)) => Some(StaticCredentials {
                access_key_id: access_key_id.0.to_owned(),
                secret_access_key: secret_access_key.0.to_owned(),
            }),
            (None, None) => None,
            _ => {
                return Err(WorkerError::ConfigurationError(
                    "AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY must be set together".to_owned(),
                ))
            }
        };

        Ok(SqsConfig {
            region: self.aws_region.0.to_owned(),
            credentials,
            endpoint: self.sqs_endpoint.as_ref().map(|e| e.0.to_owned()),
        })
    }

    pub fn worker_settings(&self) -> Result<WorkerSettings, WorkerError> {
        if !(1..=10).contains(&self.max_messages) {
            return Err(WorkerError::ConfigurationError(format!(
                "MAX_MESSAGES must be between 1 and 10, got {}",
                self.max_messages
            )));
        }

        if self.max_wait_time.0 < time::Duration::from_secs(1) {
            return Err(WorkerError::ConfigurationError(format!(
                "MAX_WAIT_TIME must be at least 1000ms, got {}ms",
                self.max_wait_time.0.as_millis()
            )));
        }

        Ok(WorkerSettings {
            queue_name: self.queue_name.0.to_owned(),
            idle_timeout: self.idle_timeout.0,
            max_wait_time: self.max_wait_time.0,
            max_messages: self.max_messages,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EnvMsDuration(pub time::Duration);

#[derive(Debug, PartialEq, Eq)]
pub struct ParseEnvMsDurationError;

impl FromStr for EnvMsDuration {
    type Err = ParseEnvMsDurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ms = s.parse::<u64>().map_err(|_| ParseEnvMsDurationError)?;

        Ok(EnvMsDuration(time::Duration::from_millis(ms)))
    }
}

#[derive(Debug, Clone)]
pub struct NonEmptyString(pub String);

impl NonEmptyString {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct StringIsEmptyError;

impl FromStr for NonEmptyString {
    type Err = StringIsEmptyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            Err(StringIsEmptyError)
        } else {
            Ok(NonEmptyString(s.to_owned()))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::init_from_hashmap(&env(&[
            ("AWS_REGION", "us-east-1"),
            ("SMS_NOTI_QUEUE", "sms-invitations"),
        ]))
        .expect("failed to load config");

        let settings = config.worker_settings().unwrap();
        assert_eq!(settings.queue_name, "sms-invitations");
        assert_eq!(settings.idle_timeout, time::Duration::from_secs(5));
        assert_eq!(settings.max_wait_time, time::Duration::from_secs(20));
        assert_eq!(settings.max_messages, 10);
        assert_eq!(config.request_timeout.0, time::Duration::from_secs(5));
        assert!(config.metrics_port.is_none());

        let sqs = config.sqs_config().unwrap();
        assert_eq!(sqs.region, "us-east-1");
        assert!(sqs.credentials.is_none());
        assert!(sqs.endpoint.is_none());
    }

    #[test]
    fn test_missing_queue_name_is_an_error() {
        assert!(Config::init_from_hashmap(&env(&[("AWS_REGION", "us-east-1")])).is_err());
        assert!(Config::init_from_hashmap(&env(&[
            ("AWS_REGION", "us-east-1"),
            ("SMS_NOTI_QUEUE", ""),
        ]))
        .is_err());
    }

    #[test]
    fn test_static_credentials() {
        let config = Config::init_from_hashmap(&env(&[
            ("AWS_REGION", "eu-west-1"),
            ("AWS_ACCESS_KEY_ID", "AKIDEXAMPLE"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
            ("SMS_NOTI_QUEUE", "sms-invitations"),
            ("SQS_ENDPOINT", "http://localhost:4566"),
        ]))
        .unwrap();

        let sqs = config.sqs_config().unwrap();
        let credentials = sqs.credentials.expect("credentials should be set");
        assert_eq!(credentials.access_key_id, "AKIDEXAMPLE");
        assert_eq!(credentials.secret_access_key, "secret");
        assert_eq!(sqs.endpoint.as_deref(), Some("http://localhost:4566"));
    }

    #[test]
    fn test_half_a_credential_pair_is_an_error() {
        let config = Config::init_from_hashmap(&env(&[
            ("AWS_REGION", "eu-west-1"),
            ("AWS_ACCESS_KEY_ID", "AKIDEXAMPLE"),
            ("SMS_NOTI_QUEUE", "sms-invitations"),
        ]))
        .unwrap();

        assert!(matches!(
            config.sqs_config(),
            Err(WorkerError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_max_messages_bounds() {
        let config = Config::init_from_hashmap(&env(&[
            ("AWS_REGION", "eu-west-1"),
            ("SMS_NOTI_QUEUE", "sms-invitations"),
            ("MAX_MESSAGES", "11"),
        ]))
        .unwrap();

        assert!(config.worker_settings().is_err());
    }

    #[test]
    fn test_max_wait_time_below_one_second_is_an_error() {
        for max_wait_time in ["0", "999"] {
            let config = Config::init_from_hashmap(&env(&[
                ("AWS_REGION", "eu-west-1"),
                ("SMS_NOTI_QUEUE", "sms-invitations"),
                ("MAX_WAIT_TIME", max_wait_time),
            ]))
            .unwrap();

            assert!(matches!(
                config.worker_settings(),
                Err(WorkerError::ConfigurationError(_))
            ));
        }
    }

    #[test]
    fn test_parse_env_ms_duration() {
        assert_eq!(
            "1500".parse::<EnvMsDuration>().unwrap().0,
            time::Duration::from_millis(1500)
        );
        assert_eq!(
            "soon".parse::<EnvMsDuration>().unwrap_err(),
            ParseEnvMsDurationError
        );
    }
}
