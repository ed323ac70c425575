//! Module list entries.

use std::time::Duration;

use serde::{Deserialize, Serialize};

fn default_enabled() -> bool {
    true
}

/// One configured module, either `"cpu_monitor"` or `{name: cpu_monitor, ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModuleEntry {
    /// Bare module name.
    Name(String),
    /// Module with options.
    Detailed(ModuleSpec),
}

/// Module options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSpec {
    /// Module name.
    pub name: String,

    /// Interval override (e.g., "30s", "5m"); defaults to the monitoring interval.
    #[serde(default, with = "humantime_serde")]
    pub interval: Option<Duration>,

    /// Enable this module (default: true).
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl ModuleEntry {
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) => name,
            Self::Detailed(spec) => &spec.name,
        }
    }

    /// Interval for this module, falling back to `default`.
    pub fn interval_or(&self, default: Duration) -> Duration {
        match self {
            Self::Name(_) => default,
            Self::Detailed(spec) => spec.interval.unwrap_or(default),
        }
    }

    pub fn enabled(&self) -> bool {
        match self {
            Self::Name(_) => true,
            Self::Detailed(spec) => spec.enabled,
        }
    }
}

impl From<&str> for ModuleEntry {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_shapes() {
        let yaml = r#"
- cpu_monitor
- name: disk_monitor
  interval: 5m
- name: kvm_monitor
  enabled: false
"#;
        let entries: Vec<ModuleEntry> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(entries.len(), 3);

        let default = Duration::from_secs(60);
        assert_eq!(entries[0], ModuleEntry::from("cpu_monitor"));
        assert_eq!(entries[0].interval_or(default), default);
        assert!(entries[0].enabled());

        assert_eq!(entries[1].name(), "disk_monitor");
        assert_eq!(entries[1].interval_or(default), Duration::from_secs(300));

        assert_eq!(entries[2].name(), "kvm_monitor");
        assert!(!entries[2].enabled());
        assert_eq!(entries[2].interval_or(default), default);
    }

    #[test]
    fn test_json_object_shape() {
        let entries: Vec<ModuleEntry> =
            serde_yaml::from_str(r#"[{"name": "cpu_monitor"}, {"name": "kvm_monitor"}]"#).unwrap();
        let names: Vec<_> = entries.iter().map(ModuleEntry::name).collect();
        assert_eq!(names, vec!["cpu_monitor", "kvm_monitor"]);
    }
}
