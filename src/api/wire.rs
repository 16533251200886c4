//! Normalization of backend payload shapes.
//!
//! The document store behind the backend leaks extended-JSON wrappers into
//! responses, and list endpoints disagree on where they put their rows. Every
//! such variant is folded into one canonical Rust type here, before any
//! caller sees the data.

use crate::{core::dates::DateValue, errors::Result};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::trace;

pub use crate::core::values::MongoId;

/// Keys under which list endpoints have been seen to return their rows.
pub const LIST_KEYS: [&str; 5] = [
    "departamentos",
    "proyectos",
    "usuarios",
    "request_list",
    "results",
];

/// One page of a list endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Rows on this page
    pub items: Vec<T>,
    /// Total rows reported by the backend, or the row count when absent
    pub total: u64,
}

/// Decodes a list response into a [`Page`].
///
/// Accepts a bare JSON array, or an object holding the array under the first
/// of `keys` that is present, with an optional `count` alongside.
///
/// # Errors
/// Returns [`crate::errors::Error::Decode`] when a row does not match `T`.
pub fn decode_list<T: DeserializeOwned>(value: Value, keys: &[&str]) -> Result<Page<T>> {
    let (rows, count) = match value {
        Value::Array(rows) => (rows, None),
        Value::Object(mut map) => {
            let count = map.get("count").and_then(Value::as_u64);
            let rows = keys
                .iter()
                .find_map(|key| match map.remove(*key) {
                    Some(Value::Array(rows)) => Some(rows),
                    _ => None,
                })
                .unwrap_or_default();
            (rows, count)
        }
        other => {
            trace!(payload = %other, "List payload carries no rows");
            (Vec::new(), None)
        }
    };

    let items = rows
        .into_iter()
        .map(serde_json::from_value)
        .collect::<std::result::Result<Vec<T>, _>>()?;
    let total = count.unwrap_or(items.len() as u64);
    Ok(Page { items, total })
}

/// Id/label pair used to populate scope pickers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopeOption {
    /// Department or project id
    pub id: String,
    /// Name shown to the user
    pub label: String,
}

fn scope_option(id: &MongoId, name: Option<&str>, description: Option<&str>) -> Option<ScopeOption> {
    if id.is_empty() {
        return None;
    }
    let label = [name, description]
        .into_iter()
        .flatten()
        .find(|text| !text.is_empty())
        .unwrap_or(id.as_str());
    Some(ScopeOption {
        id: id.to_string(),
        label: label.to_string(),
    })
}

/// A department as returned by the backend.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Department {
    /// Document id
    #[serde(default, rename = "_id")]
    pub id: MongoId,
    /// Department name
    #[serde(default, rename = "nombre")]
    pub name: Option<String>,
    /// Internal department code
    #[serde(default, rename = "codigo")]
    pub code: Option<String>,
    /// Free-text description
    #[serde(default, rename = "descripcion")]
    pub description: Option<String>,
    /// Creation timestamp
    #[serde(default)]
    pub created_at: Option<DateValue>,
}

impl Department {
    /// Picker entry for this department; `None` when it has no id.
    #[must_use]
    pub fn scope_option(&self) -> Option<ScopeOption> {
        scope_option(&self.id, self.name.as_deref(), self.description.as_deref())
    }
}

/// A project as returned by the backend.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Project {
    /// Document id
    #[serde(default, rename = "_id")]
    pub id: MongoId,
    /// Project name
    #[serde(default, rename = "nombre")]
    pub name: Option<String>,
    /// Free-text description
    #[serde(default, rename = "descripcion")]
    pub description: Option<String>,
    /// Owning department
    #[serde(default, rename = "departamento_id")]
    pub department_id: Option<MongoId>,
    /// Start date
    #[serde(default, rename = "fecha_inicio")]
    pub start_date: Option<DateValue>,
    /// End date
    #[serde(default, rename = "fecha_fin")]
    pub end_date: Option<DateValue>,
}

impl Project {
    /// Picker entry for this project; `None` when it has no id.
    #[must_use]
    pub fn scope_option(&self) -> Option<ScopeOption> {
        scope_option(&self.id, self.name.as_deref(), self.description.as_deref())
    }
}

/// Answer of the department-context endpoint.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct DepartmentContextStatus {
    /// Whether the backend applied a department context to the request
    #[serde(default, rename = "usando_contexto")]
    pub using_context: bool,
    /// Department the context points at
    #[serde(default, rename = "departamento_id")]
    pub department_id: Option<MongoId>,
    /// Department details
    #[serde(default, rename = "departamento")]
    pub department: Option<Department>,
}

impl DepartmentContextStatus {
    /// True when a context is in effect and the department was resolved.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.using_context && self.department.is_some()
    }
}
