use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Whether an automation call only reads page state or changes it.
///
/// Only `Read` operations may be served from the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    #[default]
    Read,
    Mutating,
}

impl OperationKind {
    pub fn is_cacheable(&self) -> bool {
        matches!(self, Self::Read)
    }
}

/// A named automation call with its arguments, e.g. `webpilot_extract {}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationDescriptor {
    #[serde(alias = "tool")]
    pub name: String,
    #[serde(default = "empty_params")]
    pub params: Value,
    #[serde(default)]
    pub kind: OperationKind,
}

fn empty_params() -> Value {
    Value::Object(Map::new())
}

impl OperationDescriptor {
    pub fn new(name: impl Into<String>, kind: OperationKind) -> Self {
        Self {
            name: name.into(),
            params: empty_params(),
            kind,
        }
    }

    pub fn read(name: impl Into<String>) -> Self {
        Self::new(name, OperationKind::Read)
    }

    pub fn mutating(name: impl Into<String>) -> Self {
        Self::new(name, OperationKind::Mutating)
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }

    /// Sets one keyword argument. Non-object params are replaced by an object.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        if !self.params.is_object() {
            self.params = empty_params();
        }
        if let Value::Object(map) = &mut self.params {
            map.insert(key.into(), value.into());
        }
        self
    }

    pub fn is_cacheable(&self) -> bool {
        self.kind.is_cacheable()
    }
}
