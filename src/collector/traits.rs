//! Core collector traits and types.

use std::collections::BTreeMap;
use std::time::Duration;

use thiserror::Error;

/// A single raw record produced by a collector.
///
/// Values are expected to be scalars; anything else is dropped when the
/// record is turned into a point.
pub type RawRecord = BTreeMap<String, serde_json::Value>;

/// Errors that can occur during collection.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// I/O error while reading a data source.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Data source returned content that could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// Runtime prerequisite went missing after startup.
    #[error("prerequisite missing: {0}")]
    Prerequisite(String),

    /// Collection did not finish within the allotted time.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Any other collector-specific failure.
    #[error("{0}")]
    Other(String),
}

/// Output of one collection cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Collected {
    /// Nothing to report this cycle. Not an error.
    #[default]
    Nothing,
    /// A single record.
    One(RawRecord),
    /// Several records, reported in order.
    Many(Vec<RawRecord>),
}

impl Collected {
    /// Number of records carried.
    pub fn len(&self) -> usize {
        match self {
            Self::Nothing => 0,
            Self::One(_) => 1,
            Self::Many(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Core collector trait.
///
/// A collector is an opaque unit that reports the state of some part of the
/// system each time it is invoked. The orchestrator never runs two
/// invocations of the same collector at once.
///
/// # Error Handling
///
/// Returning `Err` marks this cycle as failed. The orchestrator logs it and
/// moves on to the next due module; the collector is simply invoked again at
/// its next interval.
#[async_trait::async_trait]
pub trait Collector: Send + Sync + 'static {
    /// Module name, also used as the measurement name of its points.
    fn name(&self) -> &str;

    /// Probe the collector's runtime prerequisite.
    ///
    /// Must be free of side effects and safe to call repeatedly. Returns the
    /// reason the collector cannot run, if any.
    fn check_available(&self) -> Result<(), String> {
        Ok(())
    }

    /// Record keys that identify a series (e.g. `device`).
    ///
    /// These are emitted as point tags instead of fields, so records from
    /// one batch sharing a timestamp stay distinct series.
    fn tag_keys(&self) -> &'static [&'static str] {
        &[]
    }

    /// Perform one collection cycle.
    async fn collect(&self) -> Result<Collected, CollectorError>;
}
