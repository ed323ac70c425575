//! hostpulse - Periodic Host Telemetry Collector
//!
//! Runs a configured set of collector modules on a fixed interval, turns
//! their output into time-series points and forwards the points to a sink.
//! It can be used as a library, or run as the `hostpulse` binary.
//!
//! # Architecture
//!
//! - **Collectors**: modules resolved by name through a static registry
//! - **Points**: normalization of raw records into measurement/fields points
//! - **Scheduler**: fixed-interval tasks driven by an injectable clock
//! - **Orchestrator**: sequential dispatch with per-module failure isolation
//! - **Sinks**: InfluxDB line protocol over HTTP, or log-only
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use hostpulse::{CollectorRegistry, LogSink, OrchestratorBuilder, SinkTarget};
//! use hostpulse::collector::system::{SystemConfig, register_builtin};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut registry = CollectorRegistry::new();
//!     register_builtin(&mut registry, &SystemConfig::default())?;
//!
//!     let target = SinkTarget::new("metrics", "home");
//!     let mut orchestrator = OrchestratorBuilder::new(registry, Arc::new(LogSink::new()), target)
//!         .build(&["cpu_monitor".into(), "memory_monitor".into()]);
//!
//!     orchestrator.run(CancellationToken::new()).await;
//!     Ok(())
//! }
//! ```

pub mod collector;
pub mod config;
pub mod orchestrator;
pub mod point;
pub mod scheduler;
pub mod sink;

pub use collector::{
    Collected, Collector, CollectorError, CollectorRegistry, ModuleDescriptor, RawRecord,
    RegistryError, Resolution,
};
pub use config::{AppConfig, ConfigError, ModuleEntry};
pub use orchestrator::{Orchestrator, OrchestratorBuilder, TickReport};
pub use point::{FieldValue, Point, PointBuilder, StaticTags};
pub use scheduler::{Clock, ManualClock, ScheduledTask, Scheduler, SchedulerError, SystemClock};
pub use sink::{InfluxSink, LogSink, Sink, SinkError, SinkKind, SinkTarget};
