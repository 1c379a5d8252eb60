//! Kubernetes cluster connection management.

use std::{path::PathBuf, time::Duration};

use k8s_openapi::apimachinery::pkg::version::Info;
use kube::{
	config::{KubeConfigOptions, Kubeconfig, KubeconfigError},
	Client, Config,
};
use thiserror::Error;
use tracing::instrument;

use super::api::KubeClusterApi;

/// Default timeout for Kubernetes API requests.
const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable that overrides any kubeconfig path given on the command line.
pub const KUBECONFIG_ENV: &str = "KUBECONFIG";

/// Errors that can occur when connecting to a Kubernetes cluster.
#[derive(Debug, Error)]
pub enum ConnectionError {
	#[error("no context named `{0}` was found. Please check your kubeconfig")]
	ContextNotFound(String),

	#[error(transparent)]
	Kubeconfig(#[from] KubeconfigError),

	#[error(transparent)]
	Kube(#[from] kube::Error),
}

/// Where to read the kubeconfig from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum KubeconfigSource {
	/// `$KUBECONFIG`, falling back to `~/.kube/config`.
	#[default]
	Default,
	/// An explicit file.
	Path(PathBuf),
}

impl KubeconfigSource {
	/// Pick the kubeconfig to use. A non-empty `$KUBECONFIG` always wins over
	/// an explicitly given path.
	pub fn resolve(explicit: Option<PathBuf>, env_value: Option<&str>) -> Self {
		if env_value.is_some_and(|v| !v.is_empty()) {
			return Self::Default;
		}
		match explicit {
			Some(path) => Self::Path(path),
			None => Self::Default,
		}
	}

	/// Like [`KubeconfigSource::resolve`], reading `$KUBECONFIG` from the process environment.
	pub fn from_env(explicit: Option<PathBuf>) -> Self {
		Self::resolve(explicit, std::env::var(KUBECONFIG_ENV).ok().as_deref())
	}

	pub fn read(&self) -> Result<Kubeconfig, KubeconfigError> {
		match self {
			Self::Default => Kubeconfig::read(),
			Self::Path(path) => Kubeconfig::read_from(path),
		}
	}
}

/// Represents a connection to a Kubernetes cluster.
#[derive(Clone)]
pub struct ClusterConnection {
	client: Client,
	server_version: Info,
	/// Human-readable identifier for the cluster (context name or API server URL).
	cluster_identifier: String,
}

impl std::fmt::Debug for ClusterConnection {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ClusterConnection")
			.field("cluster_identifier", &self.cluster_identifier)
			.field("server_version", &self.server_version)
			.finish_non_exhaustive()
	}
}

impl ClusterConnection {
	/// Connect using the kubeconfig from `source` and an optional context.
	#[instrument(skip_all)]
	pub async fn connect(
		source: &KubeconfigSource,
		context: Option<&str>,
	) -> Result<Self, ConnectionError> {
		let kubeconfig = source.read()?;
		Self::from_kubeconfig(kubeconfig, context).await
	}

	/// Connect using a provided kubeconfig. Without a context, the
	/// kubeconfig's current context is used.
	#[instrument(skip_all)]
	pub async fn from_kubeconfig(
		kubeconfig: Kubeconfig,
		context: Option<&str>,
	) -> Result<Self, ConnectionError> {
		if let Some(name) = context {
			if !kubeconfig.contexts.iter().any(|c| c.name == name) {
				return Err(ConnectionError::ContextNotFound(name.to_string()));
			}
		}

		let cluster_identifier = context
			.map(str::to_string)
			.or_else(|| kubeconfig.current_context.clone())
			.map(|name| format!("context:{}", name))
			.unwrap_or_else(|| "context:<current>".to_string());

		let mut config = Config::from_custom_kubeconfig(
			kubeconfig,
			&KubeConfigOptions {
				context: context.map(str::to_string),
				..Default::default()
			},
		)
		.await?;

		tracing::debug!(cluster = %cluster_identifier, server = %config.cluster_url, "loaded kubeconfig");

		config.read_timeout = Some(DEFAULT_API_TIMEOUT);
		let client = Client::try_from(config)?;
		let server_version = client.apiserver_version().await?;

		tracing::debug!(
			cluster = %cluster_identifier,
			server_version = %format!("{}.{}", server_version.major, server_version.minor),
			"connected to cluster"
		);

		Ok(Self {
			client,
			server_version,
			cluster_identifier,
		})
	}

	/// Dynamic object access through this connection.
	pub fn cluster_api(&self) -> KubeClusterApi {
		KubeClusterApi::new(self.client.clone())
	}

	pub fn server_version(&self) -> &Info {
		&self.server_version
	}

	pub fn cluster_identifier(&self) -> &str {
		&self.cluster_identifier
	}
}
