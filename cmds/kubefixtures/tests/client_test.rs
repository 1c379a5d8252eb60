//! Connection tests against the mock Kubernetes API server.

use std::path::PathBuf;

use assert_matches::assert_matches;
use k8s_mock::HttpMockK8sServer;
use kubefixtures::{
	config::FixtureConfig,
	k8s::client::{ClusterConnection, ConnectionError, KubeconfigSource},
};
use tempfile::TempDir;

#[tokio::test]
async fn test_connect_with_named_context() {
	let server = HttpMockK8sServer::builder().build().start().await;

	let connection =
		ClusterConnection::from_kubeconfig(server.kubeconfig_with_context("staging"), Some("staging"))
			.await
			.expect("failed to connect");

	assert_eq!(connection.cluster_identifier(), "context:staging");
	assert_eq!(connection.server_version().git_version, "v1.28.0");
}

#[tokio::test]
async fn test_connect_from_kubeconfig_file() {
	let server = HttpMockK8sServer::builder().build().start().await;
	let temp = TempDir::new().unwrap();
	let path = temp.path().join("kubeconfig");
	std::fs::write(&path, serde_yaml::to_string(&server.kubeconfig()).unwrap()).unwrap();

	let connection = ClusterConnection::connect(&KubeconfigSource::Path(path), None)
		.await
		.expect("failed to connect");

	assert_eq!(connection.cluster_identifier(), "context:mock-context");
}

#[tokio::test]
async fn test_connect_unknown_context() {
	let server = HttpMockK8sServer::builder().build().start().await;

	let result = ClusterConnection::from_kubeconfig(server.kubeconfig(), Some("production")).await;

	assert_matches!(result, Err(ConnectionError::ContextNotFound(name)) if name == "production");
}

#[test]
fn test_kubeconfig_env_overrides_flag() {
	let config = FixtureConfig::resolve(
		Some(PathBuf::from("/etc/kubefixtures/kubeconfig")),
		None,
		None,
		Some("/home/dev/.kube/config"),
	);
	assert_eq!(config.kubeconfig, KubeconfigSource::Default);
}
