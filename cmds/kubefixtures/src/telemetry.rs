//! Telemetry setup for tracing and logging.

use std::io::IsTerminal;

use anyhow::{Context, Result};
use clap::ValueEnum;
use tracing::Level;
use tracing_subscriber::{
	fmt::writer::BoxMakeWriter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

/// Where log events are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogOutput {
	Stdout,
	#[default]
	Stderr,
}

impl LogOutput {
	fn is_terminal(self) -> bool {
		match self {
			LogOutput::Stdout => std::io::stdout().is_terminal(),
			LogOutput::Stderr => std::io::stderr().is_terminal(),
		}
	}

	fn make_writer(self) -> BoxMakeWriter {
		match self {
			LogOutput::Stdout => BoxMakeWriter::new(std::io::stdout),
			LogOutput::Stderr => BoxMakeWriter::new(std::io::stderr),
		}
	}
}

/// Build the event filter.
///
/// Priority:
/// 1. `log_level` (from `--log-level` or the config file), any `EnvFilter` directive
/// 2. `RUST_LOG` environment variable
/// 3. Default: info
fn filter(log_level: Option<&str>) -> Result<EnvFilter> {
	match log_level {
		Some(directive) => EnvFilter::try_new(directive)
			.with_context(|| format!("invalid log level `{directive}`")),
		None => Ok(EnvFilter::builder()
			.with_default_directive(Level::INFO.into())
			.from_env_lossy()),
	}
}

/// Initialize tracing.
///
/// Output is pretty-printed when the chosen sink is a terminal and JSON
/// otherwise.
pub fn init(log_level: Option<&str>, output: LogOutput) -> Result<()> {
	let filter_layer = filter(log_level)?;

	let fmt_layer = if output.is_terminal() {
		tracing_subscriber::fmt::layer()
			.with_writer(output.make_writer())
			.pretty()
			.boxed()
	} else {
		tracing_subscriber::fmt::layer()
			.with_writer(output.make_writer())
			.json()
			.boxed()
	};

	tracing_subscriber::registry()
		.with(filter_layer)
		.with(fmt_layer)
		.try_init()
		.context("installing tracing subscriber")
}
