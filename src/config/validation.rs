//! Configuration validation utilities.

use thiserror::Error;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse YAML configuration.
    #[error("failed to parse YAML config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Configuration validation failed.
    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Expand `${VAR}` and `${VAR:-default}` references from the environment.
///
/// Unset variables without a default expand to an empty string.
pub fn expand_env_vars(input: &str) -> String {
    static ENV_VAR_REGEX: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();

    let regex = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("failed to compile env var regex")
    });

    regex
        .replace_all(input, |caps: &regex::Captures| {
            let default_value = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            std::env::var(&caps[1]).unwrap_or_else(|_| default_value.to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_env_vars_default() {
        let result = expand_env_vars("token: ${HOSTPULSE_TEST_UNSET_TOKEN:-fallback}");
        assert_eq!(result, "token: fallback");
    }

    #[test]
    fn test_expand_env_vars_unset_without_default() {
        assert_eq!(expand_env_vars("org: ${HOSTPULSE_TEST_UNSET_ORG}"), "org: ");
    }

    #[test]
    fn test_expand_env_vars_from_env() {
        // SAFETY: the variable is unique to this test.
        unsafe {
            std::env::set_var("HOSTPULSE_TEST_BUCKET", "telemetry");
        }
        assert_eq!(
            expand_env_vars("bucket: ${HOSTPULSE_TEST_BUCKET:-other}"),
            "bucket: telemetry"
        );
        // SAFETY: cleanup of the variable set above.
        unsafe {
            std::env::remove_var("HOSTPULSE_TEST_BUCKET");
        }
    }

    #[test]
    fn test_expand_env_vars_plain_text() {
        assert_eq!(expand_env_vars("modules: [cpu_monitor]"), "modules: [cpu_monitor]");
    }
}
