//! Configuration for the rustible-oplog binary.
//!
//! Sources, lowest to highest precedence:
//! - Default values
//! - User configuration (~/.rustible/oplog.toml)
//! - Project configuration (./rustible-oplog.toml)
//! - File named by `RUSTIBLE_OPLOG_CONFIG`
//! - Environment variables (`RUSTIBLE_OPLOG_*`)
//!
//! An explicit `--config` path replaces the file lookup entirely. Files are
//! merged key by key, so a project file only needs the keys it changes.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};

use crate::callback::config::OperationLogConfig;
use crate::telemetry::config::LoggingConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Operation-log callback settings
    pub callback: OperationLogConfig,

    /// Diagnostics settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from files and environment.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut merged = serde_json::to_value(Config::default())?;

        for path in Self::get_config_paths(config_path) {
            if path.exists() {
                let layer = Self::read_file(&path)?;
                merge_values(&mut merged, layer);
            } else if config_path == Some(&path) {
                anyhow::bail!("Config file not found: {}", path.display());
            }
        }

        let mut config: Config =
            serde_json::from_value(merged).context("Invalid configuration")?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Get the list of configuration file paths to check, lowest precedence first
    fn get_config_paths(explicit_path: Option<&PathBuf>) -> Vec<PathBuf> {
        if let Some(path) = explicit_path {
            return vec![path.clone()];
        }

        let mut paths = Vec::new();

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".rustible/oplog.toml"));
        }

        paths.push(PathBuf::from("rustible-oplog.toml"));

        if let Ok(env_config) = std::env::var("RUSTIBLE_OPLOG_CONFIG") {
            paths.push(PathBuf::from(env_config));
        }

        paths
    }

    /// Parse one configuration file into a generic value
    fn read_file(path: &Path) -> Result<JsonValue> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let value = match extension {
            "yml" | "yaml" => serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?,
            "json" => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?,
            "toml" => toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display()))?,
            _ => toml::from_str(&content)
                .or_else(|_| serde_yaml::from_str(&content))
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
        };

        Ok(value)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.callback
            .apply_env_overrides()
            .context("Invalid RUSTIBLE_OPLOG_* environment override")
    }
}

/// Deep-merges `overlay` into `base`; tables merge, everything else replaces.
fn merge_values(base: &mut JsonValue, overlay: JsonValue) {
    match (base, overlay) {
        (JsonValue::Object(base), JsonValue::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::config::HttpMethod;
    use crate::telemetry::config::LogFormat;
    use serde_json::json;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.callback.method, HttpMethod::Post);
        assert_eq!(config.logging.format, LogFormat::Compact);
    }

    #[test]
    fn test_merge_values() {
        let mut base = json!({"callback": {"url": "a", "method": "post"}, "logging": {}});
        merge_values(&mut base, json!({"callback": {"method": "put"}}));
        assert_eq!(
            base,
            json!({"callback": {"url": "a", "method": "put"}, "logging": {}})
        );
    }

    #[test]
    #[serial]
    fn test_load_explicit_toml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("oplog.toml");
        std::fs::write(
            &path,
            r#"
[callback]
url = "http://collector:9000/cb"
method = "put"

[callback.headers]
"X-Trace" = "1"

[logging]
format = "json"
"#,
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.callback.url, "http://collector:9000/cb");
        assert_eq!(config.callback.method, HttpMethod::Put);
        assert_eq!(config.callback.run_id_var, "operation_log_uuid");
        assert_eq!(config.logging.format, LogFormat::Json);
        // Header tables replace key by key, so the default content type stays.
        assert_eq!(config.callback.headers.len(), 2);
    }

    #[test]
    #[serial]
    fn test_load_yaml_by_extension() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("oplog.yaml");
        std::fs::write(&path, "callback:\n  log_directory: /tmp/{{ ssh_user }}\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.callback.log_directory, "/tmp/{{ ssh_user }}");
    }

    #[test]
    #[serial]
    fn test_missing_explicit_path() {
        let path = PathBuf::from("/nonexistent/oplog.toml");
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    #[serial]
    fn test_env_override() {
        std::env::set_var("RUSTIBLE_OPLOG_URL", "https://collector.example.com/cb");
        std::env::set_var("RUSTIBLE_OPLOG_METHOD", "put");
        let mut config = Config::default();
        config.apply_env_overrides().unwrap();
        assert_eq!(config.callback.url, "https://collector.example.com/cb");
        assert_eq!(config.callback.method, HttpMethod::Put);
        std::env::remove_var("RUSTIBLE_OPLOG_URL");
        std::env::remove_var("RUSTIBLE_OPLOG_METHOD");
    }

    #[test]
    #[serial]
    fn test_env_override_rejects_bad_method() {
        std::env::set_var("RUSTIBLE_OPLOG_METHOD", "patch");
        let mut config = Config::default();
        assert!(config.apply_env_overrides().is_err());
        std::env::remove_var("RUSTIBLE_OPLOG_METHOD");
    }

    #[test]
    #[serial]
    fn test_env_override_rejects_bad_timeout() {
        std::env::set_var("RUSTIBLE_OPLOG_TIMEOUT", "soon");
        let mut config = Config::default();
        let err = config.apply_env_overrides().unwrap_err();
        assert!(format!("{:#}", err).contains("invalid RUSTIBLE_OPLOG_TIMEOUT 'soon'"));
        assert_eq!(config.callback.timeout_secs, None);
        std::env::remove_var("RUSTIBLE_OPLOG_TIMEOUT");
    }

    #[test]
    #[serial]
    fn test_load_keeps_header_order() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("oplog.toml");
        std::fs::write(
            &path,
            r#"
            [callback.headers]
            X-Zeta = "z"
            Authorization = "Bearer token"
            Accept = "application/json"
            "#,
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        let names: Vec<&str> = config.callback.headers.keys().map(String::as_str).collect();
        assert_eq!(
            names,
            vec!["Content-Type", "X-Zeta", "Authorization", "Accept"]
        );
    }
}
