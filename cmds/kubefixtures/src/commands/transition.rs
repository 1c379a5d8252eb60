//! Transition command handler.
//!
//! Writes the fixture's status onto an object that already exists.

use std::io::Write;

use anyhow::{Context, Result};
use clap::Args;
use tracing::instrument;

use super::util::{cluster_api, desired_fixture, runtime, FixtureArgs};
use crate::{config::FixtureConfig, k8s::client::ClusterConnection, reconcile::FixtureReconciler};

#[derive(Args, Debug, Clone)]
pub struct TransitionArgs {
	#[command(flatten)]
	pub fixture: FixtureArgs,
}

/// Run the transition command.
pub fn run<W: Write>(args: TransitionArgs, config: FixtureConfig, writer: W) -> Result<()> {
	args.fixture.warn_if_inert();
	runtime()?.block_on(transition_fixture(&args.fixture, &config, None, writer))
}

#[instrument(skip_all, fields(file = %args.file_path.display()))]
pub async fn transition_fixture<W: Write>(
	args: &FixtureArgs,
	config: &FixtureConfig,
	connection: Option<ClusterConnection>,
	mut writer: W,
) -> Result<()> {
	let (desired, coord) = desired_fixture(args)?;
	let reconciler = FixtureReconciler::new(cluster_api(config, connection).await?);

	reconciler
		.transition(&coord, &desired)
		.await
		.with_context(|| format!("transitioning fixture {}", args.file_path.display()))?;

	writeln!(writer, "Successfully transitioned fixture(s)")?;
	Ok(())
}
