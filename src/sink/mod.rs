//! Sink fan-out for canonical readings.
//!
//! Each enabled sink receives every published reading independently; one
//! sink's failure never prevents the others from running. Sinks are trait
//! objects so tests can substitute capturing fakes for the process-wide
//! metrics registry and the network clients.

pub mod memcache;
pub mod metrics;
pub mod mqtt;

use crate::coordinator::StoreError;
use crate::reading::Reading;
use thiserror::Error;
use tracing::warn;

/// A single sink's publish failure. Logged and ignored by the fan-out.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("mqtt publish failed: {0}")]
    Mqtt(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("reading serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Startup connection failure for a sink backend. Fatal: the process must
/// exit rather than run silently non-publishing.
#[derive(Error, Debug)]
pub enum ConnectError {
    #[error("mqtt broker unreachable: {0}")]
    Mqtt(String),
    #[error("memcached unreachable: {0}")]
    Memcache(String),
    #[error("metrics endpoint failed to start: {0}")]
    Metrics(String),
}

/// A destination for published readings.
pub trait Sink: Send + Sync {
    /// Short identifier used in log lines.
    fn name(&self) -> &'static str;
    /// Publish one reading. Implementations must be idempotent or
    /// last-write-wins; duplicate delivery across the fleet is expected.
    fn publish(&self, reading: &Reading) -> Result<(), SinkError>;
}

/// Fan a reading out to every sink, logging failures and continuing.
pub fn publish_all(sinks: &[Box<dyn Sink>], reading: &Reading) {
    for sink in sinks {
        if let Err(error) = sink.publish(reading) {
            warn!(sink = sink.name(), %error, "sink publish failed");
        }
    }
}
