use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use kubefixtures::{
	commands,
	config::{FileConfig, FixtureConfig},
	k8s::client::KUBECONFIG_ENV,
	telemetry::{self, LogOutput},
};

#[cfg(all(
	target_os = "linux",
	feature = "mimalloc",
	not(feature = "system-alloc")
))]
#[global_allocator]
static GLOBAL: mimallocator::Mimalloc = mimallocator::Mimalloc;

#[derive(Parser)]
#[command(name = "kubefixtures")]
#[command(about = "Load fixtures into a Kubernetes cluster, status included", long_about = None)]
#[command(version)]
struct Cli {
	#[command(flatten)]
	global: GlobalArgs,

	#[command(subcommand)]
	command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
	/// Path to the kubeconfig file. $KUBECONFIG takes precedence when set
	#[arg(short = 'k', long, global = true)]
	kubeconfig: Option<PathBuf>,

	/// Kubeconfig context to use instead of the current one
	#[arg(long, global = true)]
	context: Option<String>,

	/// Log filter, e.g. `debug` or `kubefixtures=debug,kube=warn`
	#[arg(long, global = true)]
	log_level: Option<String>,

	/// Where to write logs
	#[arg(long, global = true, value_enum, default_value_t = LogOutput::Stderr)]
	log_output: LogOutput,
}

#[derive(Subcommand)]
enum Commands {
	/// Create the fixture object and load its status
	#[command(alias = "create")]
	Load(commands::load::LoadArgs),

	/// Load the fixture status onto an existing object
	#[command(alias = "change")]
	Transition(commands::transition::TransitionArgs),
}

fn main() -> Result<()> {
	let cli = Cli::parse();

	let cwd = std::env::current_dir().context("getting current directory")?;
	let file_config = FileConfig::load_from_directory(&cwd)?;

	let log_level = cli
		.global
		.log_level
		.clone()
		.or_else(|| file_config.as_ref().and_then(|f| f.log_level.clone()));
	telemetry::init(log_level.as_deref(), cli.global.log_output)?;

	let config = FixtureConfig::resolve(
		cli.global.kubeconfig,
		cli.global.context,
		file_config.as_ref(),
		std::env::var(KUBECONFIG_ENV).ok().as_deref(),
	);
	tracing::debug!(?config, "resolved configuration");

	let stdout = std::io::stdout();
	match cli.command {
		Commands::Load(args) => commands::load::run(args, config, stdout.lock()),
		Commands::Transition(args) => commands::transition::run(args, config, stdout.lock()),
	}
}
