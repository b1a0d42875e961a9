pub mod config;
pub mod dedupe;
pub mod dispatch;
pub mod error;
pub mod poller;
pub mod worker;
