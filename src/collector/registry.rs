//! Collector registry mapping module names to collectors.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::collector::Collector;

/// Errors returned when resolving a module name.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No collector is registered under this name.
    #[error("module '{0}' not found")]
    NotFound(String),

    /// The collector exists but its runtime prerequisite is missing.
    #[error("module '{name}' unavailable: {reason}")]
    Unavailable { name: String, reason: String },

    /// A collector with this name is already registered.
    #[error("module '{0}' already registered")]
    Duplicate(String),
}

/// Result of resolving a module name.
pub enum Resolution {
    /// Collector is ready to run.
    Available(Arc<dyn Collector>),
    /// Collector exists but cannot run on this host.
    Unavailable { reason: String },
}

impl std::fmt::Debug for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Available(c) => f.debug_tuple("Available").field(&c.name()).finish(),
            Self::Unavailable { reason } => f
                .debug_struct("Unavailable")
                .field("reason", reason)
                .finish(),
        }
    }
}

/// Startup view of one configured module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDescriptor {
    /// Module name as configured.
    pub name: String,
    /// Whether a collector exists and its prerequisite is satisfied.
    pub available: bool,
    /// Why the module cannot run, when `available` is false.
    pub reason: Option<String>,
}

impl ModuleDescriptor {
    /// Descriptor for the outcome of resolving `name`.
    pub fn from_resolution(name: &str, resolved: &Result<Resolution, RegistryError>) -> Self {
        let reason = match resolved {
            Ok(Resolution::Available(_)) => None,
            Ok(Resolution::Unavailable { reason }) => Some(reason.clone()),
            Err(e) => Some(e.to_string()),
        };
        Self {
            name: name.to_string(),
            available: reason.is_none(),
            reason,
        }
    }

    /// Descriptor for a module switched off in configuration.
    pub fn disabled(name: &str) -> Self {
        Self {
            name: name.to_string(),
            available: false,
            reason: Some("disabled in configuration".to_string()),
        }
    }
}

/// Static name -> collector mapping, populated once at startup.
#[derive(Default)]
pub struct CollectorRegistry {
    collectors: HashMap<String, Arc<dyn Collector>>,
}

impl std::fmt::Debug for CollectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.collectors.keys().collect();
        names.sort();
        f.debug_struct("CollectorRegistry")
            .field("modules", &names)
            .finish()
    }
}

impl CollectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a collector under its own name.
    pub fn register<C: Collector>(&mut self, collector: C) -> Result<(), RegistryError> {
        self.register_arc(Arc::new(collector))
    }

    /// Register an already shared collector.
    pub fn register_arc(&mut self, collector: Arc<dyn Collector>) -> Result<(), RegistryError> {
        let name = collector.name().to_string();
        if self.collectors.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        tracing::debug!(module = %name, "Collector registered");
        self.collectors.insert(name, collector);
        Ok(())
    }

    /// Resolve a module name, probing its prerequisite.
    pub fn resolve(&self, name: &str) -> Result<Resolution, RegistryError> {
        let collector = self
            .collectors
            .get(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;

        Ok(match collector.check_available() {
            Ok(()) => Resolution::Available(Arc::clone(collector)),
            Err(reason) => Resolution::Unavailable { reason },
        })
    }

    /// Resolve a module name, treating an unavailable collector as an error.
    pub fn resolve_available(&self, name: &str) -> Result<Arc<dyn Collector>, RegistryError> {
        match self.resolve(name)? {
            Resolution::Available(collector) => Ok(collector),
            Resolution::Unavailable { reason } => Err(RegistryError::Unavailable {
                name: name.to_string(),
                reason,
            }),
        }
    }

    /// Resolve each name for startup reporting.
    pub fn describe<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Vec<ModuleDescriptor> {
        names
            .into_iter()
            .map(|name| ModuleDescriptor::from_resolution(name, &self.resolve(name)))
            .collect()
    }

    /// Registered module names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.collectors.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{Collected, CollectorError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// A mock collector for testing.
    struct MockCollector {
        name: String,
        missing: Option<String>,
        probes: AtomicUsize,
    }

    impl MockCollector {
        fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                missing: None,
                probes: AtomicUsize::new(0),
            }
        }

        fn gated(name: &str, reason: &str) -> Self {
            Self {
                missing: Some(reason.to_string()),
                ..Self::new(name)
            }
        }
    }

    #[async_trait::async_trait]
    impl Collector for MockCollector {
        fn name(&self) -> &str {
            &self.name
        }

        fn check_available(&self) -> Result<(), String> {
            self.probes.fetch_add(1, Ordering::Relaxed);
            match &self.missing {
                Some(reason) => Err(reason.clone()),
                None => Ok(()),
            }
        }

        async fn collect(&self) -> Result<Collected, CollectorError> {
            Ok(Collected::Nothing)
        }
    }

    #[test]
    fn test_resolve_available() {
        let mut registry = CollectorRegistry::new();
        registry.register(MockCollector::new("cpu_monitor")).unwrap();

        match registry.resolve("cpu_monitor").unwrap() {
            Resolution::Available(c) => assert_eq!(c.name(), "cpu_monitor"),
            other => panic!("expected Available, got {other:?}"),
        }
    }

    #[test]
    fn test_resolve_not_found() {
        let registry = CollectorRegistry::new();
        let err = registry.resolve("nope").unwrap_err();
        assert!(matches!(err, RegistryError::NotFound(ref n) if n == "nope"));
    }

    #[test]
    fn test_resolve_unavailable_is_repeatable() {
        let mut registry = CollectorRegistry::new();
        registry
            .register(MockCollector::gated("kvm_monitor", "libvirt not available"))
            .unwrap();

        for _ in 0..3 {
            match registry.resolve("kvm_monitor").unwrap() {
                Resolution::Unavailable { reason } => assert_eq!(reason, "libvirt not available"),
                other => panic!("expected Unavailable, got {other:?}"),
            }
        }

        let err = registry.resolve_available("kvm_monitor").err().unwrap();
        assert!(err.to_string().contains("unavailable"));
    }

    #[test]
    fn test_register_duplicate() {
        let mut registry = CollectorRegistry::new();
        registry.register(MockCollector::new("cpu_monitor")).unwrap();
        let err = registry.register(MockCollector::new("cpu_monitor")).unwrap_err();
        assert!(matches!(err, RegistryError::Duplicate(_)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_describe() {
        let mut registry = CollectorRegistry::new();
        registry.register(MockCollector::new("cpu_monitor")).unwrap();
        registry
            .register(MockCollector::gated("kvm_monitor", "no libvirt"))
            .unwrap();

        let descriptors = registry.describe(["cpu_monitor", "kvm_monitor", "ghost"]);
        assert_eq!(descriptors.len(), 3);
        assert!(descriptors[0].available);
        assert_eq!(descriptors[0].reason, None);
        assert!(!descriptors[1].available);
        assert_eq!(descriptors[1].reason.as_deref(), Some("no libvirt"));
        assert!(!descriptors[2].available);
        assert!(descriptors[2].reason.as_ref().unwrap().contains("not found"));
    }

    #[test]
    fn test_disabled_descriptor() {
        let descriptor = ModuleDescriptor::disabled("kvm_monitor");
        assert!(!descriptor.available);
        assert!(descriptor.reason.unwrap().contains("disabled"));
    }
}
