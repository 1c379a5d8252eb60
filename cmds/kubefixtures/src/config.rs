//! Configuration for kubefixtures.
//!
//! Settings come from command-line flags and an optional `.kubefixtures.yaml`
//! found by searching from the working directory upward to the filesystem
//! root. Flags always win over the file.

use std::{
	fs,
	path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::k8s::client::KubeconfigSource;

/// The name of the config file kubefixtures looks for
pub const CONFIG_FILE_NAME: &str = ".kubefixtures.yaml";

/// Contents of `.kubefixtures.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FileConfig {
	/// Kubeconfig path, relative paths are resolved against the config file's directory
	#[serde(default)]
	pub kubeconfig: Option<PathBuf>,

	/// Kubeconfig context to use
	#[serde(default)]
	pub context: Option<String>,

	/// Log level directive, same syntax as `--log-level`
	#[serde(default)]
	pub log_level: Option<String>,
}

impl FileConfig {
	/// Load config by searching from the given directory upward
	pub fn load_from_directory(start_dir: &Path) -> Result<Option<Self>> {
		match find_config_file(start_dir) {
			Some(path) => Self::load_from_file(&path).map(Some),
			None => Ok(None),
		}
	}

	/// Load config from a specific file path
	pub fn load_from_file(path: &Path) -> Result<Self> {
		let content = fs::read_to_string(path)
			.with_context(|| format!("failed to read config file: {}", path.display()))?;
		let mut config: FileConfig = if content.trim().is_empty() {
			FileConfig::default()
		} else {
			serde_yaml::from_str(&content)
				.with_context(|| format!("failed to parse config file: {}", path.display()))?
		};

		if let (Some(kubeconfig), Some(dir)) = (&config.kubeconfig, path.parent()) {
			if kubeconfig.is_relative() {
				config.kubeconfig = Some(dir.join(kubeconfig));
			}
		}
		Ok(config)
	}
}

/// Search for a config file starting from `start_dir` and walking up to the filesystem root
pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
	let mut current = start_dir
		.canonicalize()
		.unwrap_or_else(|_| start_dir.to_path_buf());

	loop {
		let config_path = current.join(CONFIG_FILE_NAME);
		if config_path.is_file() {
			return Some(config_path);
		}
		if !current.pop() {
			return None;
		}
	}
}

/// Everything a fixture command needs besides its own arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixtureConfig {
	pub kubeconfig: KubeconfigSource,
	pub context: Option<String>,
}

impl FixtureConfig {
	/// Combine flags, the config file and the process environment.
	///
	/// `env_kubeconfig` is the value of `$KUBECONFIG`; when non-empty it
	/// overrides every explicit path.
	pub fn resolve(
		flag_kubeconfig: Option<PathBuf>,
		flag_context: Option<String>,
		file: Option<&FileConfig>,
		env_kubeconfig: Option<&str>,
	) -> Self {
		let explicit = flag_kubeconfig.or_else(|| file.and_then(|f| f.kubeconfig.clone()));
		let context = flag_context.or_else(|| file.and_then(|f| f.context.clone()));

		Self {
			kubeconfig: KubeconfigSource::resolve(explicit, env_kubeconfig),
			context,
		}
	}
}
