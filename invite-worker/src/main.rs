//! Drain the SMS invitation queue and send each distinct invitation to the SMS API.
use std::process::ExitCode;

use envconfig::Envconfig;
use invite_common::metrics::setup_metrics_exporter;
use invite_common::sqs::SqsQueue;
use invite_worker::config::Config;
use invite_worker::dispatch::Dispatcher;
use invite_worker::error::WorkerError;
use invite_worker::worker::{InviteWorker, RunStatus, RunSummary};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

async fn run() -> Result<RunSummary, WorkerError> {
    let config = Config::init_from_env()?;

    info!(
        region = config.aws_region.as_str(),
        queue = config.queue_name.as_str(),
        "loaded configuration"
    );

    if let Some(port) = config.metrics_port {
        setup_metrics_exporter(port).map_err(|error| {
            WorkerError::ConfigurationError(format!("failed to start metrics exporter: {error}"))
        })?;
    }

    let settings = config.worker_settings()?;
    let queue = SqsQueue::new(config.sqs_config()?).await;
    let dispatcher = Dispatcher::new(config.request_timeout.0)?;

    InviteWorker::new(queue, dispatcher, settings).run().await
}

#[tokio::main]
async fn main() -> ExitCode {
    let log_layer = tracing_subscriber::fmt::layer().with_filter(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    );
    tracing_subscriber::registry().with(log_layer).init();

    let result = run().await;
    if let Err(error) = &result {
        error!("invite worker run failed: {}", error);
    }

    let status = RunStatus::from(&result);
    println!("{status}");
    status.exit_code()
}
