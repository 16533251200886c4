//! Lenient scalar types shared by the account model and the API layer.
//!
//! Backend documents are loosely typed: ids come wrapped in `$oid`, and any
//! field may be `null` or carry an unexpected JSON type. The helpers here
//! fold those cases into plain Rust values instead of failing the payload.

use serde::{Deserialize, Deserializer, Serialize, Serializer, de::DeserializeOwned};
use serde_json::Value;
use std::fmt;

/// Document id, sent either as a plain string or as `{ "$oid": "..." }`.
///
/// Any other shape decodes to an empty id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct MongoId(String);

impl MongoId {
    /// Wraps an id string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the payload carried no usable id.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for MongoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MongoId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl<'de> Deserialize<'de> for MongoId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let id = match Value::deserialize(deserializer)? {
            Value::String(id) => id,
            Value::Object(mut map) => match map.remove("$oid") {
                Some(Value::String(id)) => id,
                _ => String::new(),
            },
            _ => String::new(),
        };
        Ok(Self(id))
    }
}

impl Serialize for MongoId {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

/// `deserialize_with` helper: `null` or a value of the wrong type becomes
/// `T::default()`.
///
/// Pair it with `#[serde(default)]` so a missing field behaves the same.
pub fn or_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

/// `deserialize_with` helper for text fields: numbers and booleans are
/// stringified, anything else that is not a string becomes `""`.
pub fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => text,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}
