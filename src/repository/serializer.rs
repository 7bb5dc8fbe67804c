//! Pluggable encoding of execution contexts for persistence.

use crate::error::RepositoryError;
use crate::models::ExecutionContext;
use serde_json::{Map, Value};

pub trait ExecutionContextSerializer: Send + Sync {
    fn serialize(&self, context: &ExecutionContext) -> Result<Vec<u8>, RepositoryError>;
    fn deserialize(&self, bytes: &[u8]) -> Result<ExecutionContext, RepositoryError>;
}

/// Encodes a context as a JSON object of its entries
#[derive(Debug, Clone, Default)]
pub struct JsonExecutionContextSerializer {
    pretty: bool,
}

impl JsonExecutionContextSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl ExecutionContextSerializer for JsonExecutionContextSerializer {
    fn serialize(&self, context: &ExecutionContext) -> Result<Vec<u8>, RepositoryError> {
        let encoded = if self.pretty {
            serde_json::to_vec_pretty(context.entries())?
        } else {
            serde_json::to_vec(context.entries())?
        };
        Ok(encoded)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<ExecutionContext, RepositoryError> {
        if bytes.is_empty() {
            return Ok(ExecutionContext::new());
        }
        match serde_json::from_slice::<Value>(bytes)? {
            Value::Object(map) => Ok(from_object(map)),
            other => Err(RepositoryError::Serialization(format!(
                "expected a JSON object for an execution context, found {}",
                json_kind(&other)
            ))),
        }
    }
}

fn from_object(map: Map<String, Value>) -> ExecutionContext {
    ExecutionContext::from_entries(map.into_iter().collect())
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
