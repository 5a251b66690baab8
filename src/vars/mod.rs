//! Host variables resolved from a YAML inventory.
//!
//! Supports the usual inventory layout:
//!
//! ```yaml
//! all:
//!   vars:
//!     log_path: /var/log/oplog
//!   hosts:
//!     web1:
//!       operation_log_uuid: "42"
//!   children:
//!     db:
//!       vars:
//!         ssh_user: postgres
//!       hosts:
//!         db1: {}
//! ```
//!
//! Precedence, lowest to highest: `all` vars, vars of enclosing groups
//! (outer to inner), host vars.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use serde_yaml::Value as YamlValue;
use tracing::debug;

use crate::error::{Error, Result};
use crate::traits::VariableSource;

type VarMap = IndexMap<String, JsonValue>;

#[derive(Debug, Clone, Default)]
struct HostLayers {
    group: VarMap,
    host: VarMap,
}

impl HostLayers {
    fn resolve(&self) -> VarMap {
        let mut vars = self.group.clone();
        vars.extend(self.host.iter().map(|(k, v)| (k.clone(), v.clone())));
        vars
    }
}

/// Resolved per-host variables.
#[derive(Debug, Clone, Default)]
pub struct HostVars {
    hosts: IndexMap<String, HostLayers>,
}

impl HostVars {
    /// Creates an empty variable set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads host variables from a YAML inventory file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let vars = Self::parse(&content, path)?;
        debug!(
            "Loaded variables for {} hosts from {}",
            vars.len(),
            path.display()
        );
        Ok(vars)
    }

    /// Parses host variables from YAML inventory text.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Self::parse(content, Path::new("<inline>"))
    }

    fn parse(content: &str, path: &Path) -> Result<Self> {
        let load_error = |message: String| Error::InventoryLoad {
            path: PathBuf::from(path),
            message,
        };

        let data: YamlValue =
            serde_yaml::from_str(content).map_err(|e| load_error(e.to_string()))?;

        let mut vars = Self::new();
        match data {
            YamlValue::Mapping(map) => {
                if let Some(all) = map.get("all") {
                    vars.parse_group(all, &VarMap::new())
                        .map_err(load_error)?;
                } else {
                    for (_, group) in map.iter() {
                        vars.parse_group(group, &VarMap::new())
                            .map_err(load_error)?;
                    }
                }
            }
            YamlValue::Null => {}
            _ => return Err(load_error("inventory root must be a mapping".to_string())),
        }
        Ok(vars)
    }

    fn parse_group(&mut self, group: &YamlValue, inherited: &VarMap) -> std::result::Result<(), String> {
        let YamlValue::Mapping(map) = group else {
            return Ok(());
        };

        let mut scope = inherited.clone();
        if let Some(group_vars) = map.get("vars") {
            scope.extend(to_var_map(group_vars)?);
        }

        if let Some(YamlValue::Mapping(hosts)) = map.get("hosts") {
            for (name, host_vars) in hosts {
                let Some(name) = name.as_str() else {
                    return Err(format!("host name {:?} is not a string", name));
                };
                let own = to_var_map(host_vars)?;
                let layers = self.hosts.entry(name.to_string()).or_default();
                layers.group.extend(scope.iter().map(|(k, v)| (k.clone(), v.clone())));
                layers.host.extend(own);
            }
        }

        if let Some(YamlValue::Mapping(children)) = map.get("children") {
            for (_, child) in children {
                self.parse_group(child, &scope)?;
            }
        }

        Ok(())
    }

    /// Sets a host-level variable, adding the host if needed.
    pub fn insert_host_var(&mut self, host: &str, name: impl Into<String>, value: JsonValue) {
        self.hosts
            .entry(host.to_string())
            .or_default()
            .host
            .insert(name.into(), value);
    }

    /// Known host names in inventory order.
    pub fn hosts(&self) -> impl Iterator<Item = &str> {
        self.hosts.keys().map(String::as_str)
    }

    /// Whether `host` is known.
    pub fn contains_host(&self, host: &str) -> bool {
        self.hosts.contains_key(host)
    }

    /// Number of known hosts.
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    /// Whether no host is known.
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

impl VariableSource for HostVars {
    fn host_vars(&self, host: &str) -> Option<IndexMap<String, JsonValue>> {
        self.hosts.get(host).map(HostLayers::resolve)
    }
}

fn to_var_map(value: &YamlValue) -> std::result::Result<VarMap, String> {
    match value {
        YamlValue::Null => Ok(VarMap::new()),
        YamlValue::Mapping(_) => serde_json::to_value(value)
            .and_then(serde_json::from_value)
            .map_err(|e| e.to_string()),
        other => Err(format!("expected a mapping of variables, found {:?}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const INVENTORY: &str = r#"
all:
  vars:
    log_path: /var/log/oplog
    ssh_user: root
  hosts:
    web1:
      operation_log_uuid: "42"
  children:
    db:
      vars:
        ssh_user: postgres
      hosts:
        db1:
          ssh_user: admin
        db2:
"#;

    #[test]
    fn test_precedence() {
        let vars = HostVars::from_yaml_str(INVENTORY).unwrap();
        assert_eq!(vars.hosts().collect::<Vec<_>>(), vec!["web1", "db1", "db2"]);

        assert_eq!(vars.host_var("web1", "ssh_user"), Some(json!("root")));
        assert_eq!(vars.host_var("web1", "operation_log_uuid"), Some(json!("42")));
        assert_eq!(vars.host_var("db1", "ssh_user"), Some(json!("admin")));
        assert_eq!(vars.host_var("db2", "ssh_user"), Some(json!("postgres")));
        assert_eq!(vars.host_var("db2", "log_path"), Some(json!("/var/log/oplog")));
    }

    #[test]
    fn test_unknown_host() {
        let vars = HostVars::from_yaml_str(INVENTORY).unwrap();
        assert!(vars.host_vars("cache1").is_none());
        assert!(vars.host_var("web1", "missing").is_none());
    }

    #[test]
    fn test_flat_groups() {
        let vars = HostVars::from_yaml_str(
            r#"
webservers:
  vars:
    log_path: /tmp/web
  hosts:
    web1: {}
"#,
        )
        .unwrap();
        assert_eq!(vars.host_var("web1", "log_path"), Some(json!("/tmp/web")));
    }

    #[test]
    fn test_insert_host_var() {
        let mut vars = HostVars::new();
        assert!(vars.is_empty());
        vars.insert_host_var("web1", "operation_log_uuid", json!(7));
        assert!(vars.contains_host("web1"));
        assert_eq!(vars.host_var("web1", "operation_log_uuid"), Some(json!(7)));
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(INVENTORY.as_bytes()).unwrap();

        let vars = HostVars::from_file(file.path()).unwrap();
        assert_eq!(vars.len(), 3);
    }

    #[test]
    fn test_invalid_inventory() {
        assert!(matches!(
            HostVars::from_yaml_str("- just\n- a list\n"),
            Err(Error::InventoryLoad { .. })
        ));
        assert!(matches!(
            HostVars::from_file("/nonexistent/inventory.yml"),
            Err(Error::Io { .. })
        ));
    }
}
