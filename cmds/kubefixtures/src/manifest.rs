//! Reading fixture files.

use std::{
	fs,
	path::{Path, PathBuf},
};

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::k8s::object::{GenericObject, ManifestError};

#[derive(Debug, Error)]
pub enum FixtureFileError {
	#[error("reading {}", path.display())]
	Read {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("parsing {}", path.display())]
	Parse {
		path: PathBuf,
		#[source]
		source: serde_yaml::Error,
	},

	#[error("{} contains no document", path.display())]
	Empty { path: PathBuf },

	#[error("{}", path.display())]
	Manifest {
		path: PathBuf,
		#[source]
		source: ManifestError,
	},
}

/// Read a fixture file. YAML and JSON are both accepted.
pub fn read_fixture(path: &Path) -> Result<GenericObject, FixtureFileError> {
	let content = fs::read_to_string(path).map_err(|source| FixtureFileError::Read {
		path: path.to_path_buf(),
		source,
	})?;
	parse_fixture(&content, path)
}

/// Decode the first non-empty document of `content`; `path` is only used in
/// errors and logs.
pub fn parse_fixture(content: &str, path: &Path) -> Result<GenericObject, FixtureFileError> {
	let mut documents = Vec::new();
	for doc in serde_yaml::Deserializer::from_str(content) {
		let value = Value::deserialize(doc).map_err(|source| FixtureFileError::Parse {
			path: path.to_path_buf(),
			source,
		})?;
		if !value.is_null() {
			documents.push(value);
		}
	}

	let mut documents = documents.into_iter();
	let Some(first) = documents.next() else {
		return Err(FixtureFileError::Empty {
			path: path.to_path_buf(),
		});
	};
	let ignored = documents.count();
	if ignored > 0 {
		tracing::warn!(
			path = %path.display(),
			ignored,
			"fixture file holds more than one document, only the first is loaded"
		);
	}

	GenericObject::from_value(first).map_err(|source| FixtureFileError::Manifest {
		path: path.to_path_buf(),
		source,
	})
}

#[cfg(test)]
mod tests {
	use assert_matches::assert_matches;
	use indoc::indoc;
	use serde_json::json;
	use tempfile::TempDir;

	use super::*;

	fn parse(content: &str) -> Result<GenericObject, FixtureFileError> {
		parse_fixture(content, Path::new("fixture.yaml"))
	}

	#[test]
	fn test_parse_yaml() {
		let obj = parse(indoc! {"
			apiVersion: apps/v1
			kind: Deployment
			metadata:
			  name: web
			  namespace: ns1
			status:
			  availableReplicas: 3
		"})
		.unwrap();

		assert_eq!(obj.name().unwrap(), "web");
		assert_eq!(obj.as_map()["status"], json!({ "availableReplicas": 3 }));
	}

	#[test]
	fn test_parse_json() {
		let obj = parse(r#"{"apiVersion": "example.com/v1", "kind": "Widget", "metadata": {"name": "w"}}"#)
			.unwrap();
		assert_eq!(obj.kind().unwrap(), "Widget");
	}

	#[test]
	fn test_first_document_wins() {
		let obj = parse(indoc! {"
			---
			---
			kind: First
			---
			kind: Second
		"})
		.unwrap();
		assert_eq!(obj.kind().unwrap(), "First");
	}

	#[test]
	fn test_empty_file() {
		assert_matches!(parse(""), Err(FixtureFileError::Empty { .. }));
		assert_matches!(parse("---\n# nothing\n"), Err(FixtureFileError::Empty { .. }));
	}

	#[test]
	fn test_root_must_be_map() {
		assert_matches!(
			parse("- kind: Deployment\n"),
			Err(FixtureFileError::Manifest {
				source: ManifestError::NotAnObject("list"),
				..
			})
		);
	}

	#[test]
	fn test_invalid_yaml() {
		assert_matches!(parse("kind: [unclosed\n"), Err(FixtureFileError::Parse { .. }));
	}

	#[test]
	fn test_read_missing_file() {
		let temp = TempDir::new().unwrap();
		assert_matches!(
			read_fixture(&temp.path().join("missing.yaml")),
			Err(FixtureFileError::Read { .. })
		);
	}

	#[test]
	fn test_read_from_disk() {
		let temp = TempDir::new().unwrap();
		let path = temp.path().join("widget.yaml");
		fs::write(&path, "kind: Widget\nstatus:\n  phase: Ready\n").unwrap();

		let obj = read_fixture(&path).unwrap();
		assert_eq!(obj.as_map()["status"]["phase"], json!("Ready"));
	}
}
