//! Shared structured-data codec.
//!
//! Every subsystem that persists or exchanges structured data goes through
//! the single [`Codec`] built by [`SerializationRegistry::build`] during
//! startup. The default [`CodecConfig`]:
//!
//! - ignores unknown fields instead of failing
//! - accepts near-conforming input (comments, trailing commas)
//! - emits compact output
//! - always emits defaulted fields, `None` included as explicit `null`
//!
//! Custom representations are registered as named [`TypeAdapter`]s in a
//! [`CodecModule`] and selected with [`Codec::encode_as`] /
//! [`Codec::decode_as`].

mod lenient;
mod module;

use std::borrow::Cow;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::info;

pub use lenient::normalize;
pub use module::{CodecModule, DurationMillisAdapter, TypeAdapter, DURATION_MILLIS};

/// Errors raised while encoding or decoding.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Input was not valid JSON or did not match the target type.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No adapter is registered under the requested name.
    #[error("No type adapter registered for '{0}'")]
    UnknownAdapter(String),

    /// A type adapter rejected the value.
    #[error("Type adapter '{type_name}' rejected value: {reason}")]
    Adapter { type_name: String, reason: String },

    /// Strict mode found a field the target type does not know.
    #[error("Unknown field '{0}'")]
    UnknownField(String),
}

/// Codec behavior flags.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodecConfig {
    pub ignore_unknown_fields: bool,
    pub lenient: bool,
    pub pretty_print: bool,
    pub encode_defaults: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            ignore_unknown_fields: true,
            lenient: true,
            pretty_print: false,
            encode_defaults: true,
        }
    }
}

/// The process-wide structured-data codec.
#[derive(Debug)]
pub struct Codec {
    config: CodecConfig,
    module: CodecModule,
}

impl Codec {
    pub fn new(config: CodecConfig, module: CodecModule) -> Self {
        Self { config, module }
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    pub fn module(&self) -> &CodecModule {
        &self.module
    }

    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, CodecError> {
        self.render(serde_json::to_value(value)?)
    }

    pub fn decode<T>(&self, input: &str) -> Result<T, CodecError>
    where
        T: Serialize + DeserializeOwned,
    {
        let value = self.parse(input)?;
        self.from_value(value)
    }

    /// Encode through the adapter registered as `type_name`.
    pub fn encode_as<T: Serialize + ?Sized>(
        &self,
        type_name: &str,
        value: &T,
    ) -> Result<String, CodecError> {
        let adapter = self.adapter(type_name)?;
        let adapted = adapter
            .encode(serde_json::to_value(value)?)
            .map_err(|reason| CodecError::Adapter {
                type_name: type_name.to_string(),
                reason,
            })?;
        self.render(adapted)
    }

    /// Decode through the adapter registered as `type_name`.
    pub fn decode_as<T>(&self, type_name: &str, input: &str) -> Result<T, CodecError>
    where
        T: Serialize + DeserializeOwned,
    {
        let adapter = self.adapter(type_name)?;
        let value = adapter
            .decode(self.parse(input)?)
            .map_err(|reason| CodecError::Adapter {
                type_name: type_name.to_string(),
                reason,
            })?;
        self.from_value(value)
    }

    fn adapter(&self, type_name: &str) -> Result<&dyn TypeAdapter, CodecError> {
        self.module
            .adapter(type_name)
            .ok_or_else(|| CodecError::UnknownAdapter(type_name.to_string()))
    }

    fn parse(&self, input: &str) -> Result<Value, CodecError> {
        let text = if self.config.lenient {
            normalize(input)
        } else {
            Cow::Borrowed(input)
        };
        Ok(serde_json::from_str(&text)?)
    }

    fn from_value<T>(&self, value: Value) -> Result<T, CodecError>
    where
        T: Serialize + DeserializeOwned,
    {
        if self.config.ignore_unknown_fields {
            return Ok(serde_json::from_value(value)?);
        }

        let decoded: T = serde_json::from_value(value.clone())?;
        let known = serde_json::to_value(&decoded)?;
        if let Some(field) = find_unknown_field(&value, &known, "") {
            return Err(CodecError::UnknownField(field));
        }
        Ok(decoded)
    }

    fn render(&self, mut value: Value) -> Result<String, CodecError> {
        if !self.config.encode_defaults {
            strip_nulls(&mut value);
        }
        let text = if self.config.pretty_print {
            serde_json::to_string_pretty(&value)?
        } else {
            serde_json::to_string(&value)?
        };
        Ok(text)
    }
}

/// Builds the shared codec.
pub struct SerializationRegistry;

impl SerializationRegistry {
    /// Build the codec with the default flags and `module`'s adapters.
    pub fn build(module: CodecModule) -> Codec {
        let codec = Codec::new(CodecConfig::default(), module);
        info!(adapters = ?codec.module.names(), "Shared codec built");
        codec
    }
}

/// Path of the first field present in `input` but not in `known`.
fn find_unknown_field(input: &Value, known: &Value, path: &str) -> Option<String> {
    match (input, known) {
        (Value::Object(input), Value::Object(known)) => {
            for (key, value) in input {
                let field = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };
                match known.get(key) {
                    None => return Some(field),
                    Some(known_value) => {
                        if let Some(found) = find_unknown_field(value, known_value, &field) {
                            return Some(found);
                        }
                    }
                }
            }
            None
        }
        (Value::Array(input), Value::Array(known)) => input
            .iter()
            .zip(known)
            .enumerate()
            .find_map(|(i, (v, k))| find_unknown_field(v, k, &format!("{}[{}]", path, i))),
        _ => None,
    }
}

fn strip_nulls(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, v| !v.is_null());
            map.values_mut().for_each(strip_nulls);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_nulls),
        _ => {}
    }
}
