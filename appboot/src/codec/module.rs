//! Custom type adapters.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{json, Value};

/// Name of the built-in [`DurationMillisAdapter`].
pub const DURATION_MILLIS: &str = "duration_ms";

/// Transforms a type's default JSON shape to and from a custom shape.
pub trait TypeAdapter: Send + Sync {
    /// Default shape -> custom shape.
    fn encode(&self, value: Value) -> Result<Value, String>;

    /// Custom shape -> default shape.
    fn decode(&self, value: Value) -> Result<Value, String>;
}

/// Named set of [`TypeAdapter`]s handed to the codec at build time.
#[derive(Clone, Default)]
pub struct CodecModule {
    adapters: BTreeMap<String, Arc<dyn TypeAdapter>>,
}

impl CodecModule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Module with the built-in adapters.
    pub fn standard() -> Self {
        Self::new().with_adapter(DURATION_MILLIS, DurationMillisAdapter)
    }

    /// Register `adapter` under `name`, replacing any previous one.
    pub fn with_adapter(
        mut self,
        name: impl Into<String>,
        adapter: impl TypeAdapter + 'static,
    ) -> Self {
        self.adapters.insert(name.into(), Arc::new(adapter));
        self
    }

    pub fn adapter(&self, name: &str) -> Option<&dyn TypeAdapter> {
        self.adapters.get(name).map(|a| a.as_ref())
    }

    pub fn names(&self) -> Vec<&str> {
        self.adapters.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl fmt::Debug for CodecModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecModule")
            .field("adapters", &self.names())
            .finish()
    }
}

/// Encodes `std::time::Duration` as integer milliseconds.
#[derive(Clone, Copy, Debug, Default)]
pub struct DurationMillisAdapter;

impl TypeAdapter for DurationMillisAdapter {
    fn encode(&self, value: Value) -> Result<Value, String> {
        let secs = value
            .get("secs")
            .and_then(Value::as_u64)
            .ok_or("missing 'secs'")?;
        let nanos = value
            .get("nanos")
            .and_then(Value::as_u64)
            .ok_or("missing 'nanos'")?;
        let millis = secs
            .checked_mul(1000)
            .and_then(|ms| ms.checked_add(nanos / 1_000_000))
            .ok_or("duration exceeds u64 milliseconds")?;
        Ok(json!(millis))
    }

    fn decode(&self, value: Value) -> Result<Value, String> {
        let millis = value
            .as_u64()
            .ok_or_else(|| format!("expected milliseconds, got {}", value))?;
        Ok(json!({
            "secs": millis / 1000,
            "nanos": (millis % 1000) * 1_000_000,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Upper;

    impl TypeAdapter for Upper {
        fn encode(&self, value: Value) -> Result<Value, String> {
            Ok(json!(value.as_str().ok_or("not a string")?.to_uppercase()))
        }

        fn decode(&self, value: Value) -> Result<Value, String> {
            Ok(json!(value.as_str().ok_or("not a string")?.to_lowercase()))
        }
    }

    #[test]
    fn test_standard_module_has_duration_adapter() {
        let module = CodecModule::standard();
        assert_eq!(module.names(), vec![DURATION_MILLIS]);
        assert!(module.adapter(DURATION_MILLIS).is_some());
    }

    #[test]
    fn test_with_adapter_replaces_by_name() {
        let module = CodecModule::new()
            .with_adapter("tag", Upper)
            .with_adapter("tag", Upper);
        assert_eq!(module.len(), 1);
        assert!(module.adapter("missing").is_none());
    }

    #[test]
    fn test_duration_adapter_rejects_overflow() {
        let max = serde_json::to_value(std::time::Duration::MAX).unwrap();
        assert_eq!(
            DurationMillisAdapter.encode(max).unwrap_err(),
            "duration exceeds u64 milliseconds"
        );

        let largest = json!({"secs": u64::MAX / 1000, "nanos": 615_000_000});
        assert_eq!(DurationMillisAdapter.encode(largest).unwrap(), json!(u64::MAX));
    }

    #[test]
    fn test_duration_adapter_rejects_non_numbers() {
        assert!(DurationMillisAdapter.decode(json!("soon")).is_err());
        assert!(DurationMillisAdapter.encode(json!({"secs": 1})).is_err());
    }
}
