//! Point sinks.
//!
//! - [`Sink`]: destination for built points
//! - [`InfluxSink`]: InfluxDB v2 HTTP write API (line protocol)
//! - [`LogSink`]: logs points instead of storing them (dry runs)

mod influx;
mod log;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

use crate::point::Point;

pub use influx::InfluxSink;
pub use log::LogSink;

/// Errors that can occur while writing a point.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Transport-level failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The store rejected the write.
    #[error("write rejected with status {status}: {body}")]
    Status { status: u16, body: String },

    /// Sink misconfiguration.
    #[error("config error: {0}")]
    Config(String),
}

/// Where points are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkTarget {
    /// Destination bucket.
    pub bucket: String,
    /// Destination organisation.
    pub org: String,
}

impl SinkTarget {
    pub fn new(bucket: impl Into<String>, org: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            org: org.into(),
        }
    }
}

/// Sink implementation selector.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SinkKind {
    /// InfluxDB v2 HTTP API.
    #[default]
    Influx,
    /// Log points only.
    Log,
}

/// Destination for points.
///
/// Implementations must tolerate being called from the orchestrator's single
/// dispatch loop; a failed write affects only that point.
#[async_trait::async_trait]
pub trait Sink: Send + Sync + 'static {
    async fn write(&self, point: &Point, target: &SinkTarget) -> Result<(), SinkError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_sink_kind_from_str() {
        assert_eq!(SinkKind::from_str("influx").unwrap(), SinkKind::Influx);
        assert_eq!(SinkKind::from_str("LOG").unwrap(), SinkKind::Log);
        assert!(SinkKind::from_str("kafka").is_err());
    }

    #[test]
    fn test_sink_kind_as_str() {
        assert_eq!(SinkKind::Influx.as_ref(), "influx");
        assert_eq!(SinkKind::Log.to_string(), "log");
    }
}
