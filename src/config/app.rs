//! Application configuration structures.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::collector::system::SystemConfig;
use crate::point::StaticTags;
use crate::scheduler::MIN_INTERVAL;
use crate::sink::{SinkKind, SinkTarget};

use super::modules::ModuleEntry;
use super::validation::{ConfigError, expand_env_vars};

// =============================================================================
// Constants
// =============================================================================

/// Default interval between runs of each module (60 seconds).
pub const DEFAULT_MONITORING_INTERVAL: Duration = Duration::from_secs(60);

/// Default upper bound on one `collect()` call (30 seconds).
pub const DEFAULT_COLLECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default sink request timeout (10 seconds).
pub const DEFAULT_SINK_TIMEOUT: Duration = Duration::from_secs(10);

fn default_monitoring_interval() -> Duration {
    DEFAULT_MONITORING_INTERVAL
}

fn default_collect_timeout() -> Duration {
    DEFAULT_COLLECT_TIMEOUT
}

fn default_sink_timeout() -> Duration {
    DEFAULT_SINK_TIMEOUT
}

fn default_sink_url() -> String {
    "http://localhost:8086".to_string()
}

// =============================================================================
// Sink Configuration
// =============================================================================

/// Time-series sink configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink implementation (default: influx).
    #[serde(default)]
    pub kind: SinkKind,

    /// InfluxDB base URL (default: "http://localhost:8086").
    #[serde(default = "default_sink_url")]
    pub url: String,

    /// API token; supports `${VAR}` expansion.
    #[serde(default)]
    pub token: Option<String>,

    /// Destination organisation.
    #[serde(default)]
    pub org: String,

    /// Destination bucket.
    #[serde(default)]
    pub bucket: String,

    /// Per-request timeout (default: 10s).
    #[serde(default = "default_sink_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            kind: SinkKind::default(),
            url: default_sink_url(),
            token: None,
            org: String::new(),
            bucket: String::new(),
            timeout: DEFAULT_SINK_TIMEOUT,
        }
    }
}

impl SinkConfig {
    pub fn target(&self) -> SinkTarget {
        SinkTarget::new(&self.bucket, &self.org)
    }
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Modules to run, in registration order.
    #[serde(default)]
    pub modules: Vec<ModuleEntry>,

    /// Interval between runs of each module (default: 60s).
    #[serde(default = "default_monitoring_interval", with = "humantime_serde")]
    pub monitoring_interval: Duration,

    /// Upper bound on a single collection (default: 30s).
    #[serde(default = "default_collect_timeout", with = "humantime_serde")]
    pub collect_timeout: Duration,

    /// Tags attached to every point.
    #[serde(default)]
    pub tags: StaticTags,

    /// Sink configuration.
    #[serde(default)]
    pub sink: SinkConfig,

    /// Built-in collector settings.
    #[serde(default)]
    pub system: SystemConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            modules: Vec::new(),
            monitoring_interval: DEFAULT_MONITORING_INTERVAL,
            collect_timeout: DEFAULT_COLLECT_TIMEOUT,
            tags: StaticTags::new(),
            sink: SinkConfig::default(),
            system: SystemConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a YAML (or JSON) file.
    ///
    /// Environment references are expanded before parsing. The result is not
    /// validated so that CLI/env overrides can be applied first; call
    /// [`AppConfig::validate`] afterwards.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(&expand_env_vars(content))?)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.monitoring_interval < MIN_INTERVAL {
            return Err(ConfigError::ValidationError(format!(
                "monitoring_interval must be at least {:?}",
                MIN_INTERVAL
            )));
        }

        if self.collect_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "collect_timeout must be positive".to_string(),
            ));
        }

        let mut seen_names = HashSet::new();
        for entry in &self.modules {
            let name = entry.name();
            if name.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "module name cannot be empty".to_string(),
                ));
            }
            if !seen_names.insert(name) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate module name: '{}'",
                    name
                )));
            }
            if entry.interval_or(self.monitoring_interval) < MIN_INTERVAL {
                return Err(ConfigError::ValidationError(format!(
                    "module '{}': interval must be at least {:?}",
                    name, MIN_INTERVAL
                )));
            }
        }

        if self.sink.kind == SinkKind::Influx {
            url::Url::parse(&self.sink.url).map_err(|e| {
                ConfigError::ValidationError(format!(
                    "invalid sink url '{}': {}",
                    self.sink.url, e
                ))
            })?;
            if self.sink.bucket.is_empty() {
                return Err(ConfigError::ValidationError(
                    "sink bucket cannot be empty".to_string(),
                ));
            }
            if self.sink.org.is_empty() {
                return Err(ConfigError::ValidationError(
                    "sink org cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn valid() -> AppConfig {
        AppConfig {
            modules: vec!["cpu_monitor".into(), "kvm_monitor".into()],
            sink: SinkConfig {
                org: "home".to_string(),
                bucket: "metrics".to_string(),
                ..SinkConfig::default()
            },
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_yaml_str("{}").unwrap();
        assert!(config.modules.is_empty());
        assert_eq!(config.monitoring_interval, DEFAULT_MONITORING_INTERVAL);
        assert_eq!(config.collect_timeout, DEFAULT_COLLECT_TIMEOUT);
        assert_eq!(config.sink.kind, SinkKind::Influx);
        assert_eq!(config.sink.url, "http://localhost:8086");
        assert_eq!(config.sink.timeout, DEFAULT_SINK_TIMEOUT);
    }

    #[test]
    fn test_load_json_module_list() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"modules": ["cpu_monitor", "kvm_monitor"]}}"#).unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        let names: Vec<_> = config.modules.iter().map(ModuleEntry::name).collect();
        assert_eq!(names, vec!["cpu_monitor", "kvm_monitor"]);
    }

    #[test]
    fn test_load_full_yaml() {
        let yaml = r#"
monitoring_interval: 30s
collect_timeout: 5s
tags:
  host: node-1
sink:
  kind: influx
  url: http://influx:8086
  token: ${HOSTPULSE_TEST_MISSING_TOKEN:-dev-token}
  org: home
  bucket: metrics
system:
  proc_root: /host/proc
modules:
  - cpu_monitor
  - name: disk_monitor
    interval: 5m
"#;
        let config = AppConfig::from_yaml_str(yaml).unwrap();
        config.validate().unwrap();

        assert_eq!(config.monitoring_interval, Duration::from_secs(30));
        assert_eq!(config.collect_timeout, Duration::from_secs(5));
        assert_eq!(config.tags["host"], "node-1");
        assert_eq!(config.sink.token.as_deref(), Some("dev-token"));
        assert_eq!(config.sink.target(), SinkTarget::new("metrics", "home"));
        assert_eq!(config.system.proc_root, Path::new("/host/proc"));
        assert_eq!(
            config.modules[1].interval_or(config.monitoring_interval),
            Duration::from_secs(300)
        );
    }

    #[test]
    fn test_load_missing_file() {
        let err = AppConfig::load("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }

    #[test]
    fn test_load_malformed() {
        let err = AppConfig::from_yaml_str("modules: {oops").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_validation_valid() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_validation_duplicate_module() {
        let mut config = valid();
        config.modules.push("cpu_monitor".into());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate module name"));
    }

    #[test]
    fn test_validation_empty_module_name() {
        let mut config = valid();
        config.modules.push("".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_interval_too_short() {
        let mut config = valid();
        config.monitoring_interval = Duration::from_millis(100);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_influx_requires_destination() {
        let mut config = valid();
        config.sink.bucket.clear();
        assert!(config.validate().unwrap_err().to_string().contains("bucket"));

        let mut config = valid();
        config.sink.url = "not a url".to_string();
        assert!(config.validate().unwrap_err().to_string().contains("invalid sink url"));
    }

    #[test]
    fn test_validation_log_sink_needs_no_destination() {
        let mut config = valid();
        config.sink = SinkConfig {
            kind: SinkKind::Log,
            ..SinkConfig::default()
        };
        assert!(config.validate().is_ok());
    }
}
