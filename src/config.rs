//! Configuration module for hostpulse.
//!
//! Provides YAML-based configuration loading and validation for:
//! - Module list (bare names or objects with `name`, `interval`, `enabled`)
//! - Collection timing (monitoring interval, per-collect timeout)
//! - Sink settings (kind, URL, token, bucket, org)
//! - Built-in collector settings and static point tags
//!
//! JSON is a subset of YAML, so `{"modules": ["cpu_monitor"]}` files load
//! unchanged.

mod app;
mod modules;
mod validation;

pub use app::{AppConfig, SinkConfig};
pub use modules::{ModuleEntry, ModuleSpec};
pub use validation::{ConfigError, expand_env_vars};

// Re-export constants
pub use app::{DEFAULT_COLLECT_TIMEOUT, DEFAULT_MONITORING_INTERVAL};
