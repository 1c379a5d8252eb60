//! Untyped Kubernetes object documents.
//!
//! Fixtures can describe any resource type, including custom resources, so
//! objects are kept as ordered JSON maps instead of typed structs. Accessors
//! check the shape of what they read and report mismatches as
//! [`ManifestError`] rather than coercing values.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// A JSON object with insertion order preserved.
pub type ObjectMap = Map<String, Value>;

/// The document does not have the shape of a Kubernetes object.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManifestError {
	#[error("manifest must be a map, found {0}")]
	NotAnObject(&'static str),

	#[error("manifest missing {0}")]
	MissingField(String),

	#[error("manifest field {field} must be {expected}, found {found}")]
	FieldType {
		field: String,
		expected: &'static str,
		found: &'static str,
	},

	#[error("apiVersion `{0}` must have the form <group>/<version>")]
	InvalidApiVersion(String),
}

/// Name of the variant held by a value, for error messages.
pub fn value_type(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "bool",
		Value::Number(_) => "number",
		Value::String(_) => "string",
		Value::Array(_) => "list",
		Value::Object(_) => "map",
	}
}

/// A Kubernetes object of any kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenericObject(ObjectMap);

impl GenericObject {
	/// Wrap a decoded document. The root must be a map.
	pub fn from_value(value: Value) -> Result<Self, ManifestError> {
		match value {
			Value::Object(map) => Ok(Self(map)),
			other => Err(ManifestError::NotAnObject(value_type(&other))),
		}
	}

	pub fn as_map(&self) -> &ObjectMap {
		&self.0
	}

	pub fn into_value(self) -> Value {
		Value::Object(self.0)
	}

	/// Look up a nested field. Every intermediate value must be a map.
	pub fn field(&self, path: &[&str]) -> Result<Option<&Value>, ManifestError> {
		let mut current = &self.0;
		for (depth, key) in path.iter().enumerate() {
			let Some(value) = current.get(*key) else {
				return Ok(None);
			};
			if depth + 1 == path.len() {
				return Ok(Some(value));
			}
			current = match value {
				Value::Object(map) => map,
				other => {
					return Err(ManifestError::FieldType {
						field: path[..=depth].join("."),
						expected: "a map",
						found: value_type(other),
					})
				}
			};
		}
		Ok(None)
	}

	/// Look up a nested map, failing if the field holds anything else.
	pub fn nested_map(&self, path: &[&str]) -> Result<Option<&ObjectMap>, ManifestError> {
		match self.field(path)? {
			None => Ok(None),
			Some(Value::Object(map)) => Ok(Some(map)),
			Some(other) => Err(ManifestError::FieldType {
				field: path.join("."),
				expected: "a map",
				found: value_type(other),
			}),
		}
	}

	fn string_field(&self, path: &[&str]) -> Result<Option<&str>, ManifestError> {
		match self.field(path)? {
			None | Some(Value::Null) => Ok(None),
			Some(Value::String(s)) => Ok(Some(s.as_str())),
			Some(other) => Err(ManifestError::FieldType {
				field: path.join("."),
				expected: "a string",
				found: value_type(other),
			}),
		}
	}

	fn required_string(&self, path: &[&str]) -> Result<&str, ManifestError> {
		match self.string_field(path)? {
			Some(s) if !s.is_empty() => Ok(s),
			_ => Err(ManifestError::MissingField(path.join("."))),
		}
	}

	pub fn api_version(&self) -> Result<&str, ManifestError> {
		self.required_string(&["apiVersion"])
	}

	pub fn kind(&self) -> Result<&str, ManifestError> {
		self.required_string(&["kind"])
	}

	pub fn name(&self) -> Result<&str, ManifestError> {
		self.required_string(&["metadata", "name"])
	}

	/// `metadata.namespace`, with an empty string treated as unset.
	pub fn namespace(&self) -> Result<Option<&str>, ManifestError> {
		Ok(self
			.string_field(&["metadata", "namespace"])?
			.filter(|ns| !ns.is_empty()))
	}

	pub fn status(&self) -> Result<Option<&ObjectMap>, ManifestError> {
		self.nested_map(&["status"])
	}

	pub fn status_mut(&mut self) -> Result<Option<&mut ObjectMap>, ManifestError> {
		match self.0.get_mut("status") {
			None => Ok(None),
			Some(Value::Object(map)) => Ok(Some(map)),
			Some(other) => Err(ManifestError::FieldType {
				field: "status".to_string(),
				expected: "a map",
				found: value_type(other),
			}),
		}
	}

	/// Replace the whole status map.
	pub fn set_status(&mut self, status: ObjectMap) {
		self.0.insert("status".to_string(), Value::Object(status));
	}

	/// `namespace/name` for log messages, tolerating malformed metadata.
	pub fn display_name(&self) -> String {
		let namespace = self.namespace().ok().flatten().unwrap_or("");
		let name = self.name().unwrap_or("");
		format!("{}/{}", namespace, name)
	}
}
