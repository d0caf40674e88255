// Environment variable loading

use crate::{ConfigError, Result};
use std::collections::HashMap;
use std::env;

/// Environment variable loader.
///
/// Names are lowercased and a double underscore becomes a dot, so
/// `APP_LOG__LEVEL` with prefix `APP` is read as `log.level`.
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    /// Load all matching environment variables as config keys
    pub fn load(&self) -> Result<HashMap<String, String>> {
        Ok(self.collect(env::vars()))
    }

    fn collect(&self, vars: impl Iterator<Item = (String, String)>) -> HashMap<String, String> {
        vars.filter_map(|(name, value)| {
            let key = match &self.prefix {
                Some(prefix) => name
                    .strip_prefix(prefix.as_str())?
                    .trim_start_matches('_')
                    .to_string(),
                None => name,
            };
            Some((normalize_key(&key), value))
        })
        .collect()
    }

    /// Load a single variable by config key (`database_url`, `log.level`)
    pub fn load_var(&self, key: &str) -> Result<String> {
        env::var(self.var_name(key)).map_err(ConfigError::EnvError)
    }

    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }

    /// Environment variable name for a config key
    pub fn var_name(&self, key: &str) -> String {
        let name = key.replace('.', "__").to_uppercase();
        match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix, name),
            None => name,
        }
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(None)
    }
}

fn normalize_key(name: &str) -> String {
    name.to_lowercase().replace("__", ".")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Iterator<Item = (String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn test_prefix_filters_and_strips() {
        let loader = EnvLoader::new(Some("SHOP".to_string()));
        let loaded = loader.collect(vars(&[
            ("SHOP_DATABASE_URL", "postgres://localhost"),
            ("SHOP_LOG__LEVEL", "debug"),
            ("PATH", "/usr/bin"),
        ]));

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded["database_url"], "postgres://localhost");
        assert_eq!(loaded["log.level"], "debug");
    }

    #[test]
    fn test_without_prefix_keeps_everything() {
        let loader = EnvLoader::default();
        let loaded = loader.collect(vars(&[("HOME", "/root"), ("APP__NAME", "demo")]));

        assert_eq!(loaded["home"], "/root");
        assert_eq!(loaded["app.name"], "demo");
    }

    #[test]
    fn test_var_name() {
        let loader = EnvLoader::new(Some("SHOP".to_string()));
        assert_eq!(loader.var_name("log.level"), "SHOP_LOG__LEVEL");
        assert_eq!(EnvLoader::default().var_name("database_url"), "DATABASE_URL");
    }

    #[test]
    fn test_missing_var_falls_back() {
        let loader = EnvLoader::new(Some("LARESS_TEST".to_string()));
        assert!(loader.load_var("missing_var_67890").is_err());
        assert_eq!(loader.load_var_or("missing_var_67890", "default"), "default");
    }
}
