pub mod invitation;
pub mod metrics;
pub mod queue;
pub mod sqs;
