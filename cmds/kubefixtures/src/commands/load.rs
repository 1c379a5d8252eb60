//! Load command handler.
//!
//! Creates the fixture's object in the cluster, then writes the fixture's
//! status onto it through the status subresource.

use std::io::Write;

use anyhow::{Context, Result};
use clap::Args;
use tracing::instrument;

use super::util::{cluster_api, desired_fixture, runtime, FixtureArgs};
use crate::{
	config::FixtureConfig,
	k8s::client::ClusterConnection,
	reconcile::{FixtureReconciler, ReconcileError},
};

#[derive(Args, Debug, Clone)]
pub struct LoadArgs {
	#[command(flatten)]
	pub fixture: FixtureArgs,
}

/// Run the load command.
pub fn run<W: Write>(args: LoadArgs, config: FixtureConfig, writer: W) -> Result<()> {
	args.fixture.warn_if_inert();
	runtime()?.block_on(load_fixture(&args.fixture, &config, None, writer))
}

/// Create the fixture object and load its status.
///
/// Uses `connection` when given instead of connecting as `config` says.
#[instrument(skip_all, fields(file = %args.file_path.display()))]
pub async fn load_fixture<W: Write>(
	args: &FixtureArgs,
	config: &FixtureConfig,
	connection: Option<ClusterConnection>,
	mut writer: W,
) -> Result<()> {
	let (desired, coord) = desired_fixture(args)?;
	let reconciler = FixtureReconciler::new(cluster_api(config, connection).await?);

	match reconciler.load(&coord, &desired).await {
		Ok(()) => {}
		Err(err @ ReconcileError::AlreadyExists { .. }) => {
			return Err(anyhow::Error::new(err).context(format!(
				"loading fixture {}; delete the existing object first (kubectl delete -f {})",
				args.file_path.display(),
				args.file_path.display()
			)));
		}
		Err(err) => {
			return Err(err)
				.with_context(|| format!("loading fixture {}", args.file_path.display()))
		}
	}

	writeln!(writer, "Successfully loaded fixture(s)")?;
	Ok(())
}
