use std::net::{Ipv4Addr, SocketAddr};

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

pub const MESSAGES_RECEIVED: &str = "invite_messages_received_total";
pub const MESSAGES_DUPLICATE: &str = "invite_messages_duplicate_total";
pub const SMS_DISPATCHED: &str = "invite_sms_dispatched_total";
pub const SMS_FAILED: &str = "invite_sms_failed_total";
pub const SMS_DISPATCH_DURATION: &str = "invite_sms_dispatch_duration_seconds";

/// Install the global Prometheus recorder and serve it on `port` at `/metrics`.
/// Must be called from within a Tokio runtime.
pub fn setup_metrics_exporter(port: u16) -> Result<(), BuildError> {
    const EXPONENTIAL_SECONDS: &[f64] = &[
        0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ];

    PrometheusBuilder::new()
        .set_buckets(EXPONENTIAL_SECONDS)?
        .with_http_listener(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))
        .install()
}
