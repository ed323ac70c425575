//! Collector Layer
//!
//! Pluggable collectors resolved by module name. The orchestrator invokes
//! each one on its schedule and turns whatever it returns into points.
//!
//! # Architecture
//!
//! - [`Collector`]: Core trait for implementing data collectors
//! - [`Collected`]: Output of one cycle (nothing, one record, many records)
//! - [`CollectorRegistry`]: Static name -> collector mapping with prerequisite probing
//! - [`system`]: Built-in procfs collectors
//!
//! # Example
//!
//! ```rust,no_run
//! use hostpulse::collector::{CollectorRegistry, Resolution};
//! use hostpulse::collector::system::{SystemConfig, register_builtin};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut registry = CollectorRegistry::new();
//! register_builtin(&mut registry, &SystemConfig::default())?;
//! if let Resolution::Unavailable { reason } = registry.resolve("kvm_monitor")? {
//!     println!("kvm_monitor disabled: {reason}");
//! }
//! # Ok(())
//! # }
//! ```

mod registry;
pub mod system;
mod traits;

pub use registry::{CollectorRegistry, ModuleDescriptor, RegistryError, Resolution};
pub use traits::{Collected, Collector, CollectorError, RawRecord};
