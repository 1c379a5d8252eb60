//! Integration tests for the transition command using a mock Kubernetes API server.

use indoc::indoc;
use k8s_mock::HttpMockK8sServer;
use kubefixtures::{
	commands::{transition::transition_fixture, util::FixtureArgs},
	config::FixtureConfig,
	k8s::{api::ApiError, client::ClusterConnection},
	reconcile::ReconcileError,
};
use serde_json::json;
use tempfile::TempDir;

const DEPLOYMENTS: &str = "/apis/apps/v1/namespaces/ns1/deployments";

fn fixture_args(dir: &TempDir) -> FixtureArgs {
	let file_path = dir.path().join("web.yaml");
	std::fs::write(
		&file_path,
		indoc! {"
			apiVersion: apps/v1
			kind: Deployment
			metadata:
			  name: web
			  namespace: ns1
			spec:
			  replicas: 5
			status:
			  availableReplicas: 3
		"},
	)
	.unwrap();
	FixtureArgs {
		file_path,
		time: None,
		status: vec![],
	}
}

fn live_web() -> serde_json::Value {
	json!({
		"apiVersion": "apps/v1",
		"kind": "Deployment",
		"metadata": { "name": "web", "namespace": "ns1", "resourceVersion": "12" },
		"spec": { "replicas": 3 },
		"status": { "availableReplicas": 0, "conditions": [] }
	})
}

#[tokio::test]
async fn test_transition_writes_status_only() {
	let server = HttpMockK8sServer::builder()
		.resources(vec![live_web()])
		.build()
		.start()
		.await;
	let connection = ClusterConnection::from_kubeconfig(server.kubeconfig(), None)
		.await
		.unwrap();
	let temp = TempDir::new().unwrap();
	let mut out = Vec::new();

	transition_fixture(
		&fixture_args(&temp),
		&FixtureConfig::default(),
		Some(connection),
		&mut out,
	)
	.await
	.expect("transition should succeed");

	assert_eq!(
		String::from_utf8(out).unwrap(),
		"Successfully transitioned fixture(s)\n"
	);

	let requests: Vec<_> = server
		.resource_requests()
		.await
		.into_iter()
		.map(|r| (r.method, r.path))
		.collect();
	assert_eq!(
		requests,
		vec![
			("GET".to_string(), format!("{DEPLOYMENTS}/web")),
			("PUT".to_string(), format!("{DEPLOYMENTS}/web/status")),
		]
	);

	let stored = server.resource(DEPLOYMENTS, "web").unwrap();
	// Whole status replaced, spec untouched.
	assert_eq!(stored["status"], json!({ "availableReplicas": 3 }));
	assert_eq!(stored["spec"], json!({ "replicas": 3 }));
}

#[tokio::test]
async fn test_transition_missing_object() {
	let server = HttpMockK8sServer::builder().build().start().await;
	let connection = ClusterConnection::from_kubeconfig(server.kubeconfig(), None)
		.await
		.unwrap();
	let temp = TempDir::new().unwrap();

	let err = transition_fixture(
		&fixture_args(&temp),
		&FixtureConfig::default(),
		Some(connection),
		std::io::sink(),
	)
	.await
	.unwrap_err();

	assert!(matches!(
		err.downcast_ref::<ReconcileError>(),
		Some(ReconcileError::NotFound { .. })
	));
	let methods: Vec<_> = server
		.resource_requests()
		.await
		.into_iter()
		.map(|r| r.method)
		.collect();
	assert_eq!(methods, ["GET"]);
}

#[tokio::test]
async fn test_transition_conflict_is_not_retried() {
	let server = HttpMockK8sServer::builder()
		.resources(vec![live_web()])
		.status_conflict(true)
		.build()
		.start()
		.await;
	let connection = ClusterConnection::from_kubeconfig(server.kubeconfig(), None)
		.await
		.unwrap();
	let temp = TempDir::new().unwrap();

	let err = transition_fixture(
		&fixture_args(&temp),
		&FixtureConfig::default(),
		Some(connection),
		std::io::sink(),
	)
	.await
	.unwrap_err();

	assert!(matches!(
		err.downcast_ref::<ReconcileError>(),
		Some(ReconcileError::Remote {
			source: ApiError::Conflict,
			..
		})
	));
	let puts = server
		.resource_requests()
		.await
		.into_iter()
		.filter(|r| r.method == "PUT")
		.count();
	assert_eq!(puts, 1);
	assert_eq!(
		server.resource(DEPLOYMENTS, "web").unwrap()["status"],
		json!({ "availableReplicas": 0, "conditions": [] })
	);
}
