//! Resource types known to the mock server.

use std::collections::HashMap;

/// Maps apiVersion/kind pairs to the plural resource names the server serves.
///
/// The catalog is only used to place preloaded manifests at the same path a
/// real API server would; requests are served for any path.
#[derive(Clone)]
pub struct ResourceCatalog {
	pub core_resources: Vec<MockApiResource>,
	pub group_resources: HashMap<String, Vec<MockApiResource>>,
}

impl Default for ResourceCatalog {
	fn default() -> Self {
		Self {
			core_resources: vec![
				MockApiResource::namespaced("configmaps", "ConfigMap"),
				MockApiResource::namespaced("secrets", "Secret"),
				MockApiResource::namespaced("services", "Service"),
				MockApiResource::namespaced("pods", "Pod"),
				MockApiResource::cluster_scoped("namespaces", "Namespace"),
			],
			group_resources: HashMap::from([(
				"apps/v1".to_string(),
				vec![
					MockApiResource::namespaced("deployments", "Deployment"),
					MockApiResource::namespaced("statefulsets", "StatefulSet"),
					MockApiResource::namespaced("daemonsets", "DaemonSet"),
				],
			)]),
		}
	}
}

impl ResourceCatalog {
	/// Register an extra resource under a group apiVersion such as `example.com/v1`.
	pub fn with_group_resource(mut self, api_version: &str, resource: MockApiResource) -> Self {
		self.group_resources
			.entry(api_version.to_string())
			.or_default()
			.push(resource);
		self
	}

	fn lookup(&self, api_version: &str, kind: &str) -> Option<&MockApiResource> {
		if api_version.contains('/') {
			self.group_resources
				.get(api_version)?
				.iter()
				.find(|r| r.kind == kind)
		} else {
			self.core_resources.iter().find(|r| r.kind == kind)
		}
	}

	/// Derive the collection path and object name for a manifest.
	///
	/// Returns `None` for manifests of unknown type or without a name.
	pub fn locate(&self, manifest: &serde_json::Value) -> Option<(String, String)> {
		let api_version = manifest.get("apiVersion")?.as_str()?;
		let kind = manifest.get("kind")?.as_str()?;
		let name = manifest.pointer("/metadata/name")?.as_str()?.to_string();
		let namespace = manifest
			.pointer("/metadata/namespace")
			.and_then(|n| n.as_str())
			.unwrap_or("default");

		let resource = self.lookup(api_version, kind)?;
		let prefix = if api_version.contains('/') {
			format!("/apis/{}", api_version)
		} else {
			format!("/api/{}", api_version)
		};

		let path = if resource.namespaced {
			format!("{}/namespaces/{}/{}", prefix, namespace, resource.plural)
		} else {
			format!("{}/{}", prefix, resource.plural)
		};

		Some((path, name))
	}
}

/// A mock API resource definition.
#[derive(Clone)]
pub struct MockApiResource {
	pub plural: String,
	pub kind: String,
	pub namespaced: bool,
}

impl MockApiResource {
	pub fn namespaced(plural: &str, kind: &str) -> Self {
		Self {
			plural: plural.to_string(),
			kind: kind.to_string(),
			namespaced: true,
		}
	}

	pub fn cluster_scoped(plural: &str, kind: &str) -> Self {
		Self {
			plural: plural.to_string(),
			kind: kind.to_string(),
			namespaced: false,
		}
	}
}
