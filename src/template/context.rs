//! Data exposed to template evaluation.

use serde::Serialize;
use serde_json::{Map, Value};

/// Read-only data a template is evaluated against.
///
/// Built once per request with [`TemplateContext::with_field`] and never
/// mutated afterwards. The top-level field set is fixed at construction:
/// referencing a field that was not added is an execution error.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateContext {
    root: Value,
}

impl TemplateContext {
    pub fn new() -> Self {
        Self {
            root: Value::Object(Map::new()),
        }
    }

    /// Add a top-level field.
    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        if let Value::Object(map) = &mut self.root {
            map.insert(name.into(), value);
        }
        self
    }

    /// Add a top-level field from any serializable value.
    ///
    /// Values that fail to serialize are exposed as null.
    pub fn with_serialized<T: Serialize>(self, name: impl Into<String>, value: &T) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.with_field(name, value)
    }

    pub fn as_value(&self) -> &Value {
        &self.root
    }
}

impl Default for TemplateContext {
    fn default() -> Self {
        Self::new()
    }
}
