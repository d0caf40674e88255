// Config reader consumed by the runtime

use serde_json::Value as JsonValue;

/// Binding name under which the application's config reader is published
pub const CONFIG_BINDING: &str = "config";

/// Read-only access to configuration values.
///
/// Keys may be dotted (`log.level`) to reach into nested objects.
pub trait ConfigReader: Send + Sync + 'static {
    /// Raw value stored under `key`
    fn value(&self, key: &str) -> Option<JsonValue>;

    fn has(&self, key: &str) -> bool {
        self.value(key).is_some()
    }

    /// String value, or `default` when missing or not a string
    fn get_string_or(&self, key: &str, default: &str) -> String {
        match self.value(key) {
            Some(JsonValue::String(s)) => s,
            _ => default.to_string(),
        }
    }

    /// Boolean value; accepts `true`/`false` and the strings `1`/`0`/`true`/`false`
    fn get_bool_or(&self, key: &str, default: bool) -> bool {
        match self.value(key) {
            Some(JsonValue::Bool(b)) => b,
            Some(JsonValue::String(s)) => match s.to_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => default,
            },
            _ => default,
        }
    }

    fn get_i64_or(&self, key: &str, default: i64) -> i64 {
        match self.value(key) {
            Some(JsonValue::Number(n)) => n.as_i64().unwrap_or(default),
            Some(JsonValue::String(s)) => s.parse().unwrap_or(default),
            _ => default,
        }
    }
}

/// Look up a dotted key in a JSON tree.
///
/// A literal key containing dots wins over the nested path.
pub fn lookup_path<'a>(root: &'a JsonValue, key: &str) -> Option<&'a JsonValue> {
    if let Some(value) = root.get(key) {
        return Some(value);
    }
    key.split('.')
        .try_fold(root, |node, segment| node.get(segment))
}

impl ConfigReader for JsonValue {
    fn value(&self, key: &str) -> Option<JsonValue> {
        lookup_path(self, key).cloned()
    }
}
