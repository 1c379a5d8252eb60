//! Utilities shared by the fixture commands.

use std::{fmt, path::PathBuf, str::FromStr};

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;
use tracing::warn;

use crate::{
	config::FixtureConfig,
	k8s::{
		api::KubeClusterApi,
		client::ClusterConnection,
		coordinate::{resolve, ResourceCoordinate},
		object::GenericObject,
	},
	manifest::read_fixture,
	reconcile::{require_status, set_status_field},
};

/// Arguments common to `load` and `transition`.
#[derive(Args, Debug, Clone)]
pub struct FixtureArgs {
	/// Path to the fixture manifest (YAML or JSON)
	#[arg(short = 'f', long)]
	pub file_path: PathBuf,

	/// Seconds to wait for the fixture to settle. Accepted but currently has no effect
	#[arg(short = 't', long, value_name = "SECONDS")]
	pub time: Option<u64>,

	/// Set a top-level status field before loading (Format: key=value)
	#[arg(long = "status", value_name = "KEY=VALUE")]
	pub status: Vec<StatusOverride>,
}

impl FixtureArgs {
	/// Log warnings for accepted arguments that do nothing.
	pub fn warn_if_inert(&self) {
		if let Some(seconds) = self.time {
			warn!(seconds, "--time has no effect; fixtures are not waited on");
		}
	}
}

/// One `--status key=value` flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusOverride {
	pub field: String,
	pub value: String,
}

impl FromStr for StatusOverride {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let mut parts = s.split('=');
		match (parts.next(), parts.next(), parts.next()) {
			(Some(field), Some(value), None) if !field.is_empty() => Ok(Self {
				field: field.to_string(),
				value: value.to_string(),
			}),
			_ => Err(format!("expected key=value, got `{s}`")),
		}
	}
}

impl fmt::Display for StatusOverride {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}={}", self.field, self.value)
	}
}

/// Read the fixture, resolve where it lives and apply `--status` overrides.
pub fn desired_fixture(args: &FixtureArgs) -> Result<(GenericObject, ResourceCoordinate)> {
	let mut desired = read_fixture(&args.file_path).context("reading fixture")?;
	let coord = resolve(&desired)
		.with_context(|| format!("invalid fixture {}", args.file_path.display()))?;

	for status in &args.status {
		set_status_field(&mut desired, &status.field, Value::String(status.value.clone()))
			.with_context(|| format!("applying --status {status}"))?;
	}
	require_status(&desired)
		.with_context(|| format!("invalid fixture {}", args.file_path.display()))?;

	Ok((desired, coord))
}

/// Use the given connection, or connect as `config` says.
pub async fn cluster_api(
	config: &FixtureConfig,
	connection: Option<ClusterConnection>,
) -> Result<KubeClusterApi> {
	let connection = match connection {
		Some(connection) => connection,
		None => ClusterConnection::connect(&config.kubeconfig, config.context.as_deref())
			.await
			.context("connecting to cluster")?,
	};
	tracing::debug!(cluster = %connection.cluster_identifier(), "using cluster");
	Ok(connection.cluster_api())
}

/// Runtime for a single command invocation.
pub fn runtime() -> Result<tokio::runtime::Runtime> {
	tokio::runtime::Builder::new_current_thread()
		.enable_all()
		.build()
		.context("creating tokio runtime")
}
