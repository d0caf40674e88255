// Configuration management for Laress applications
//
// `ConfigManager` holds the merged values from files, `.env` and the process
// environment; it is the config reader the runtime resolves under "config".

pub mod config_service;
pub mod env;
pub mod error;
pub mod loader;
pub mod provider;

pub use config_service::{ConfigService, ConfigServiceBuilder};
pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use provider::{CONFIG_SERVICE_BINDING, ConfigServiceProvider};

use laress_core::{ConfigReader, lookup_path};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Main configuration manager.
///
/// Values live in one nested tree: a dotted key such as `log.level` always
/// addresses `{"log": {"level": ..}}`, whichever source wrote it, so the
/// source loaded last wins.
#[derive(Clone, Default)]
pub struct ConfigManager {
    config: Arc<RwLock<HashMap<String, Value>>>,
    env_prefix: Option<String>,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with environment variable prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            config: Arc::default(),
            env_prefix: Some(prefix.into()),
        }
    }

    /// Load configuration from environment variables
    pub fn load_env(&self) -> Result<()> {
        let loader = EnvLoader::new(self.env_prefix.clone());
        let env_vars = loader.load()?;
        let count = env_vars.len();

        let mut config = self.config.write();
        for (key, value) in env_vars {
            merge_key(&mut config, &key, Value::String(value));
        }

        debug!(keys = count, prefix = ?self.env_prefix, "Loaded configuration from environment");
        Ok(())
    }

    /// Load a `.env` file into the process environment, then read the
    /// environment. Without a path a missing `.env` is not an error.
    pub fn load_dotenv(&self, path: Option<&str>) -> Result<()> {
        match path {
            Some(path) => {
                dotenvy::from_path(path).map_err(|e| ConfigError::LoadError(e.to_string()))?;
            }
            None => {
                dotenvy::dotenv().ok();
            }
        }
        self.load_env()
    }

    /// Deep-merge a configuration file over the current values
    pub fn load_file(&self, path: impl AsRef<Path>, format: FileFormat) -> Result<()> {
        let path = path.as_ref();
        let data = ConfigLoader::new(format).load_file(path)?;

        let Value::Object(map) = data else {
            return Err(ConfigError::ParseError(format!(
                "{} does not contain a table at the top level",
                path.display()
            )));
        };

        let count = map.len();
        let mut config = self.config.write();
        for (key, value) in map {
            merge_key(&mut config, &key, value);
        }

        debug!(path = %path.display(), keys = count, "Loaded configuration file");
        Ok(())
    }

    pub fn set<T: serde::Serialize>(&self, key: &str, value: T) -> Result<()> {
        let json_value =
            serde_json::to_value(value).map_err(|e| ConfigError::SerializationError(e.to_string()))?;

        let mut config = self.config.write();
        match key.split_once('.') {
            Some((head, rest)) => {
                insert_path(config.entry(head.to_string()).or_insert(Value::Null), rest, json_value)
            }
            None => {
                config.insert(key.to_string(), json_value);
            }
        }
        Ok(())
    }

    /// Raw value under `key`; dotted keys walk nested tables
    pub fn raw(&self, key: &str) -> Option<Value> {
        let config = self.config.read();
        if let Some(value) = config.get(key) {
            return Some(value.clone());
        }
        let (head, rest) = key.split_once('.')?;
        config
            .get(head)
            .and_then(|value| lookup_path(value, rest))
            .cloned()
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self
            .raw(key)
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))?;

        serde_json::from_value(value).map_err(|e| ConfigError::DeserializationError(e.to_string()))
    }

    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    pub fn get_string(&self, key: &str) -> Result<String> {
        self.get(key)
    }

    pub fn get_int(&self, key: &str) -> Result<i64> {
        self.get(key)
    }

    pub fn get_bool(&self, key: &str) -> Result<bool> {
        self.get(key)
    }

    pub fn get_float(&self, key: &str) -> Result<f64> {
        self.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.raw(key).is_some()
    }

    /// Top-level keys
    pub fn keys(&self) -> Vec<String> {
        self.config.read().keys().cloned().collect()
    }

    /// Copy every key of `other` over this manager's values
    pub fn merge(&self, other: &ConfigManager) {
        if Arc::ptr_eq(&self.config, &other.config) {
            return;
        }
        let other_config = other.config.read().clone();
        let mut config = self.config.write();
        for (key, value) in other_config {
            merge_key(&mut config, &key, value);
        }
    }
}

// Replace whatever sits at the dotted `path` under `node`
fn insert_path(node: &mut Value, path: &str, value: Value) {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        match path.split_once('.') {
            Some((head, rest)) => insert_path(map.entry(head).or_insert(Value::Null), rest, value),
            None => {
                map.insert(path.to_string(), value);
            }
        }
    }
}

// Deep-merge `value` at the dotted `key`; tables merge, anything else replaces
fn merge_key(config: &mut HashMap<String, Value>, key: &str, value: Value) {
    let (head, rest) = match key.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (key, None),
    };
    let slot = config.entry(head.to_string()).or_insert(Value::Null);
    match rest {
        Some(rest) => {
            let mut nested = Value::Null;
            insert_path(&mut nested, rest, value);
            merge_value(slot, nested);
        }
        None => merge_value(slot, value),
    }
}

fn merge_value(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                match target.get_mut(&key) {
                    Some(existing) => merge_value(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, source) => *target = source,
    }
}

impl ConfigReader for ConfigManager {
    fn value(&self, key: &str) -> Option<Value> {
        self.raw(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_and_get() {
        let manager = ConfigManager::new();
        manager.set("test_key", "test_value").unwrap();

        let value: String = manager.get("test_key").unwrap();
        assert_eq!(value, "test_value");
    }

    #[test]
    fn test_missing_key() {
        let manager = ConfigManager::new();

        assert!(matches!(manager.get_string("missing"), Err(ConfigError::KeyNotFound(_))));
        assert_eq!(manager.get_or("missing", "default".to_string()), "default");
        assert!(!manager.has("missing"));
    }

    #[test]
    fn test_dotted_keys_reach_nested_tables() {
        let manager = ConfigManager::new();
        manager.set("log", json!({ "level": "debug" })).unwrap();
        manager.set("log.format", "pretty").unwrap();

        assert_eq!(manager.get_string("log.level").unwrap(), "debug");
        assert_eq!(manager.get_string("log.format").unwrap(), "pretty");
        assert_eq!(manager.get_string_or("log.output", "stdout"), "stdout");
    }

    #[test]
    fn test_later_nested_value_overrides_dotted_default() {
        let manager = ConfigManager::new();
        manager.set("container.policy", "cache_all").unwrap();
        manager.set("container.size", 16).unwrap();

        let file = ConfigManager::new();
        file.set("container", json!({ "policy": "transient" })).unwrap();
        manager.merge(&file);

        assert_eq!(manager.get_string("container.policy").unwrap(), "transient");
        assert_eq!(manager.get_int("container.size").unwrap(), 16);
        assert_eq!(manager.keys(), ["container"]);
    }

    #[test]
    fn test_dotted_set_replaces_scalar_parent() {
        let manager = ConfigManager::new();
        manager.set("log", "off").unwrap();
        manager.set("log.level", "warn").unwrap();

        assert_eq!(manager.get_string("log.level").unwrap(), "warn");
        assert!(manager.get_string("log").is_err());
    }

    #[test]
    fn test_type_conversions() {
        let manager = ConfigManager::new();
        manager.set("int_key", 42i64).unwrap();
        manager.set("bool_key", true).unwrap();
        manager.set("float_key", 2.5).unwrap();

        assert_eq!(manager.get_int("int_key").unwrap(), 42);
        assert!(manager.get_bool("bool_key").unwrap());
        assert_eq!(manager.get_float("float_key").unwrap(), 2.5);
        assert!(matches!(
            manager.get_int("bool_key"),
            Err(ConfigError::DeserializationError(_))
        ));
    }

    #[test]
    fn test_merge_overrides() {
        let base = ConfigManager::new();
        base.set("name", "base").unwrap();
        base.set("port", 80).unwrap();
        let overrides = ConfigManager::new();
        overrides.set("port", 8080).unwrap();

        base.merge(&overrides);
        base.merge(&base.clone());

        assert_eq!(base.get_int("port").unwrap(), 8080);
        assert_eq!(base.get_string("name").unwrap(), "base");
    }
}
