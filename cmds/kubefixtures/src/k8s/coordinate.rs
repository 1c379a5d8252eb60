//! Resolving manifests to API coordinates without discovery.

use std::fmt;

use kube::{core::GroupVersionKind, discovery::ApiResource};

use super::object::{GenericObject, ManifestError};

/// Namespace used when a manifest does not name one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Everything needed to address one namespaced object through the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceCoordinate {
	pub group: String,
	pub version: String,
	pub kind: String,
	/// Plural resource name used in API paths.
	pub plural: String,
	pub namespace: String,
	pub name: String,
}

impl ResourceCoordinate {
	/// Dynamic API resource description for kube's `Api<DynamicObject>`.
	pub fn api_resource(&self) -> ApiResource {
		let gvk = GroupVersionKind::gvk(&self.group, &self.version, &self.kind);
		ApiResource::from_gvk_with_plural(&gvk, &self.plural)
	}
}

impl fmt::Display for ResourceCoordinate {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{}.{}/{} {}/{}",
			self.plural, self.group, self.version, self.namespace, self.name
		)
	}
}

/// Plural resource name for a kind.
///
/// This is the naive `lowercase(kind) + "s"` rule: `Ingress` becomes
/// `ingresss` and `Policy` becomes `policys`. Fixtures for such kinds will
/// not resolve to the right path.
pub fn pluralize(kind: &str) -> String {
	format!("{}s", kind.to_lowercase())
}

/// Derive the coordinate of the object a manifest describes.
///
/// apiVersion must be exactly `<group>/<version>`; core-group objects
/// (`apiVersion: v1`) are rejected.
pub fn resolve(doc: &GenericObject) -> Result<ResourceCoordinate, ManifestError> {
	let api_version = doc.api_version()?;
	let (group, version) = split_api_version(api_version)?;
	let kind = doc.kind()?;
	let name = doc.name()?;
	let namespace = doc.namespace()?.unwrap_or(DEFAULT_NAMESPACE);

	Ok(ResourceCoordinate {
		group: group.to_string(),
		version: version.to_string(),
		kind: kind.to_string(),
		plural: pluralize(kind),
		namespace: namespace.to_string(),
		name: name.to_string(),
	})
}

fn split_api_version(api_version: &str) -> Result<(&str, &str), ManifestError> {
	let mut segments = api_version.split('/');
	match (segments.next(), segments.next(), segments.next()) {
		(Some(group), Some(version), None) if !group.is_empty() && !version.is_empty() => {
			Ok((group, version))
		}
		_ => Err(ManifestError::InvalidApiVersion(api_version.to_string())),
	}
}

#[cfg(test)]
mod tests {
	use assert_matches::assert_matches;
	use rstest::rstest;
	use serde_json::json;

	use super::*;

	fn manifest(api_version: &str, kind: &str, namespace: Option<&str>) -> GenericObject {
		let mut metadata = json!({ "name": "sample" });
		if let Some(ns) = namespace {
			metadata["namespace"] = json!(ns);
		}
		GenericObject::from_value(json!({
			"apiVersion": api_version,
			"kind": kind,
			"metadata": metadata,
		}))
		.unwrap()
	}

	#[test]
	fn test_resolve_defaults_namespace() {
		let coord = resolve(&manifest("g/v", "Widget", None)).unwrap();
		assert_eq!(
			coord,
			ResourceCoordinate {
				group: "g".to_string(),
				version: "v".to_string(),
				kind: "Widget".to_string(),
				plural: "widgets".to_string(),
				namespace: "default".to_string(),
				name: "sample".to_string(),
			}
		);
	}

	#[test]
	fn test_resolve_keeps_namespace() {
		let coord = resolve(&manifest("apps/v1", "Deployment", Some("ns1"))).unwrap();
		assert_eq!(coord.namespace, "ns1");
		assert_eq!(coord.plural, "deployments");
		assert_eq!(coord.to_string(), "deployments.apps/v1 ns1/sample");
	}

	#[rstest]
	#[case::core_group("v1")]
	#[case::too_many_segments("a/b/c")]
	#[case::empty_group("/v1")]
	#[case::empty_version("apps/")]
	#[case::only_slash("/")]
	fn test_resolve_rejects_malformed_api_version(#[case] api_version: &str) {
		assert_matches!(
			resolve(&manifest(api_version, "Widget", None)),
			Err(ManifestError::InvalidApiVersion(v)) if v == api_version
		);
	}

	#[test]
	fn test_resolve_requires_api_version() {
		let doc = GenericObject::from_value(json!({
			"kind": "Widget",
			"metadata": { "name": "sample" }
		}))
		.unwrap();
		assert_matches!(resolve(&doc), Err(ManifestError::MissingField(f)) if f == "apiVersion");
	}

	#[rstest]
	#[case::plain("Widget", "widgets")]
	#[case::ends_with_s("Ingress", "ingresss")]
	#[case::ends_with_y("NetworkPolicy", "networkpolicys")]
	#[case::ends_with_ch("Batch", "batchs")]
	fn test_pluralize_is_naive(#[case] kind: &str, #[case] plural: &str) {
		assert_eq!(pluralize(kind), plural);
	}

	#[test]
	fn test_api_resource() {
		let coord = resolve(&manifest("example.com/v1alpha1", "Widget", None)).unwrap();
		let ar = coord.api_resource();
		assert_eq!(ar.group, "example.com");
		assert_eq!(ar.version, "v1alpha1");
		assert_eq!(ar.api_version, "example.com/v1alpha1");
		assert_eq!(ar.kind, "Widget");
		assert_eq!(ar.plural, "widgets");
	}

	#[test]
	fn test_resolve_does_not_touch_document() {
		let doc = manifest("apps/v1", "Deployment", None);
		let before = doc.clone();
		resolve(&doc).unwrap();
		assert_eq!(doc, before);
	}
}
