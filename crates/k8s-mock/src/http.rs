//! HTTP-based mock Kubernetes server using wiremock.
//!
//! This provides a real HTTP server that can be used with actual kubeconfig-based
//! connections, so tests exercise the same client stack as production.

use std::{
	collections::HashMap,
	sync::{Arc, RwLock},
};

use bon::Builder;
use kube::config::{
	AuthInfo, Cluster, Context, Kubeconfig, NamedAuthInfo, NamedCluster, NamedContext,
};
use tracing::{debug, trace};
use wiremock::{
	matchers::{method, path, path_regex},
	Mock, MockServer, Request, ResponseTemplate,
};

use super::catalog::ResourceCatalog;

/// Type alias for the shared mutable resources map, keyed by (collection path, name).
pub type SharedResources = Arc<RwLock<HashMap<(String, String), serde_json::Value>>>;

/// A mock Kubernetes server exposed over HTTP.
#[derive(Builder)]
pub struct HttpMockK8sServer {
	/// Resource types used to place preloaded manifests.
	#[builder(default)]
	catalog: ResourceCatalog,
	/// Resources present in the cluster before the test starts.
	#[builder(default)]
	resources: Vec<serde_json::Value>,
	/// Reject every status update with 409 Conflict, as if the object changed
	/// between read and write.
	#[builder(default)]
	status_conflict: bool,
}

/// A running HTTP mock server instance.
pub struct RunningHttpMockK8sServer {
	server: MockServer,
	resources: SharedResources,
}

/// A request received on a resource path (`/api/...` or `/apis/...`).
#[derive(Debug, Clone)]
pub struct RecordedRequest {
	pub method: String,
	pub path: String,
	pub body: Option<serde_json::Value>,
}

impl HttpMockK8sServer {
	/// Start the mock server with all configured resources.
	pub async fn start(self) -> RunningHttpMockK8sServer {
		let server = MockServer::start().await;

		debug!(uri = %server.uri(), "Started mock K8s server");

		let mut resources: HashMap<(String, String), serde_json::Value> = HashMap::new();
		for manifest in self.resources {
			if let Some((api_path, name)) = self.catalog.locate(&manifest) {
				trace!(api_path = %api_path, name = %name, "Registered resource");
				resources.insert((api_path, name), manifest);
			}
		}

		let shared_resources = Arc::new(RwLock::new(resources));

		mount_version(&server).await;
		mount_resources(&server, &shared_resources, self.status_conflict).await;

		RunningHttpMockK8sServer {
			server,
			resources: shared_resources,
		}
	}
}

impl RunningHttpMockK8sServer {
	/// Get the server's URI (e.g., "http://127.0.0.1:12345").
	pub fn uri(&self) -> String {
		self.server.uri()
	}

	/// Current stored state of a resource, if present.
	pub fn resource(&self, api_path: &str, name: &str) -> Option<serde_json::Value> {
		self.resources
			.read()
			.unwrap()
			.get(&(api_path.to_string(), name.to_string()))
			.cloned()
	}

	/// Requests received on resource paths, in arrival order.
	pub async fn resource_requests(&self) -> Vec<RecordedRequest> {
		self.server
			.received_requests()
			.await
			.unwrap_or_default()
			.into_iter()
			.filter(|req| req.url.path().starts_with("/api"))
			.map(|req| RecordedRequest {
				method: req.method.to_string(),
				path: req.url.path().to_string(),
				body: serde_json::from_slice(&req.body).ok(),
			})
			.collect()
	}

	/// Create a Kubeconfig pointing to this mock server.
	pub fn kubeconfig(&self) -> Kubeconfig {
		self.kubeconfig_with_context("mock-context")
	}

	/// Create a Kubeconfig pointing to this mock server with a custom context name.
	pub fn kubeconfig_with_context(&self, context_name: &str) -> Kubeconfig {
		let cluster_name = "mock-cluster";
		let user_name = "mock-user";

		Kubeconfig {
			clusters: vec![NamedCluster {
				name: cluster_name.to_string(),
				cluster: Some(Cluster {
					server: Some(self.uri()),
					insecure_skip_tls_verify: Some(true),
					..Default::default()
				}),
			}],
			contexts: vec![NamedContext {
				name: context_name.to_string(),
				context: Some(Context {
					cluster: cluster_name.to_string(),
					user: Some(user_name.to_string()),
					namespace: Some("default".to_string()),
					..Default::default()
				}),
			}],
			auth_infos: vec![NamedAuthInfo {
				name: user_name.to_string(),
				auth_info: Some(AuthInfo::default()),
			}],
			current_context: Some(context_name.to_string()),
			..Default::default()
		}
	}
}

async fn mount_version(server: &MockServer) {
	Mock::given(method("GET"))
		.and(path("/version"))
		.respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
			"major": "1",
			"minor": "28",
			"gitVersion": "v1.28.0",
			"gitCommit": "fake",
			"gitTreeState": "clean",
			"buildDate": "2024-01-01T00:00:00Z",
			"goVersion": "go1.21.0",
			"compiler": "gc",
			"platform": "linux/amd64"
		})))
		.mount(server)
		.await;
}

async fn mount_resources(server: &MockServer, resources: &SharedResources, status_conflict: bool) {
	let status_resources = Arc::clone(resources);
	let post_resources = Arc::clone(resources);
	let get_resources = Arc::clone(resources);

	// PUT on the status subresource replaces only `.status` of the stored object
	Mock::given(method("PUT"))
		.and(path_regex(r"^/api(s)?/.*/status$"))
		.respond_with(move |req: &Request| {
			let object_path = req.url.path().trim_end_matches("/status");
			let (api_path, name) = parse_resource_path(object_path);

			if status_conflict {
				return status_response(
					409,
					"Conflict",
					&format!(
						"Operation cannot be fulfilled on {}: the object has been modified; \
						 please apply your changes to the latest version and try again",
						name
					),
				);
			}

			let body: serde_json::Value =
				serde_json::from_slice(&req.body).unwrap_or(serde_json::Value::Null);

			let mut resources = status_resources.write().unwrap();
			let Some(existing) = resources.get_mut(&(api_path, name.clone())) else {
				return status_response(404, "NotFound", &format!("\"{}\" not found", name));
			};

			if let Some(stored) = existing.as_object_mut() {
				match body.get("status") {
					Some(status) => {
						stored.insert("status".to_string(), status.clone());
					}
					None => {
						stored.remove("status");
					}
				}
			}

			ResponseTemplate::new(200).set_body_json(existing.clone())
		})
		.mount(server)
		.await;

	// POST creates the object, refusing to overwrite an existing one. Status is
	// dropped, it can only be set through the status subresource.
	Mock::given(method("POST"))
		.and(path_regex(r"^/api(s)?/.*"))
		.respond_with(move |req: &Request| {
			let mut body: serde_json::Value =
				serde_json::from_slice(&req.body).unwrap_or(serde_json::Value::Null);
			if let Some(object) = body.as_object_mut() {
				object.remove("status");
			}

			let name = body
				.pointer("/metadata/name")
				.and_then(|v| v.as_str())
				.unwrap_or("")
				.to_string();
			if name.is_empty() {
				return status_response(422, "Invalid", "metadata.name: Required value");
			}

			let key = (req.url.path().to_string(), name);
			let mut resources = post_resources.write().unwrap();
			if resources.contains_key(&key) {
				return status_response(
					409,
					"AlreadyExists",
					&format!("\"{}\" already exists", key.1),
				);
			}

			resources.insert(key, body.clone());
			ResponseTemplate::new(201).set_body_json(body)
		})
		.mount(server)
		.await;

	// GET of a single named object
	Mock::given(method("GET"))
		.and(path_regex(r"^/api(s)?/.*"))
		.respond_with(move |req: &Request| {
			let (api_path, name) = parse_resource_path(req.url.path());
			let resources = get_resources.read().unwrap();

			match resources.get(&(api_path, name.clone())) {
				Some(resource) => ResponseTemplate::new(200).set_body_json(resource.clone()),
				None => status_response(404, "NotFound", &format!("\"{}\" not found", name)),
			}
		})
		.mount(server)
		.await;
}

/// Build a `metav1.Status` failure response.
fn status_response(code: u16, reason: &str, message: &str) -> ResponseTemplate {
	ResponseTemplate::new(code).set_body_json(serde_json::json!({
		"kind": "Status",
		"apiVersion": "v1",
		"metadata": {},
		"status": "Failure",
		"message": message,
		"reason": reason,
		"code": code
	}))
}

/// Parse a Kubernetes API path into (api_path, resource_name).
///
/// Examples:
/// - `/api/v1/namespaces/default/configmaps/my-config` -> (`/api/v1/namespaces/default/configmaps`, `my-config`)
/// - `/apis/apps/v1/namespaces/default/deployments/my-deploy` -> (`/apis/apps/v1/namespaces/default/deployments`, `my-deploy`)
fn parse_resource_path(path: &str) -> (String, String) {
	let path = path.trim_end_matches('/');
	match path.rsplit_once('/') {
		Some((api_path, name)) => (api_path.to_string(), name.to_string()),
		None => (path.to_string(), String::new()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_resource_path() {
		assert_eq!(
			parse_resource_path("/apis/apps/v1/namespaces/ns1/deployments/web"),
			(
				"/apis/apps/v1/namespaces/ns1/deployments".to_string(),
				"web".to_string()
			)
		);
		assert_eq!(
			parse_resource_path("/api/v1/namespaces/default/configmaps/cm/"),
			(
				"/api/v1/namespaces/default/configmaps".to_string(),
				"cm".to_string()
			)
		);
	}

	#[tokio::test]
	async fn test_preloaded_resource_is_stored() {
		let server = HttpMockK8sServer::builder()
			.resources(vec![serde_json::json!({
				"apiVersion": "apps/v1",
				"kind": "Deployment",
				"metadata": { "name": "web", "namespace": "ns1" }
			})])
			.build()
			.start()
			.await;

		let stored = server
			.resource("/apis/apps/v1/namespaces/ns1/deployments", "web")
			.expect("preloaded resource should be stored");
		assert_eq!(stored["kind"], "Deployment");
		assert!(server.resource_requests().await.is_empty());
	}
}
