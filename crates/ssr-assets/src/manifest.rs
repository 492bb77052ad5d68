//! SSR manifest.

use serde::Serialize;
use serde_json::{Map, Value};

/// Build-time mapping from module identifiers to the asset URLs they pull in.
///
/// The render function uses it to emit preload hints. Its value shape belongs
/// to the render function's contract, so entries are kept as raw JSON; the
/// only requirement enforced here is that the document is a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SsrManifest(Map<String, Value>);

impl SsrManifest {
    /// Parse a manifest document.
    pub fn parse(text: &str) -> Result<Self, String> {
        match serde_json::from_str::<Value>(text).map_err(|e| e.to_string())? {
            Value::Object(map) => Ok(Self(map)),
            other => Err(format!("expected a JSON object, found {}", json_kind(&other))),
        }
    }

    /// Build a manifest from a JSON map.
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Number of module entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the manifest has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Module identifiers in the manifest.
    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Asset URLs for a module. A string entry yields one URL, an array yields
    /// its string elements; anything else yields nothing.
    pub fn assets_for(&self, module: &str) -> Vec<&str> {
        match self.0.get(module) {
            Some(Value::String(url)) => vec![url.as_str()],
            Some(Value::Array(urls)) => urls.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// The raw JSON entries.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
