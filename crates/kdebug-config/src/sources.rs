// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: files, environment, CLI, defaults.

use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, trace};

use crate::layer::ConfigLayer;
use crate::paths::PathsConfig;
use crate::ConfigError;

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	SystemFile = 20,
	UserFile = 30,
	CustomFile = 40,
	Environment = 50,
	Cli = 60,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	/// Name for logging
	fn name(&self) -> &'static str;

	/// Precedence level
	fn precedence(&self) -> Precedence;

	/// Load configuration layer from this source
	fn load(&self) -> Result<ConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}
	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		debug!("loading defaults");
		// Defaults are applied when the runtime config is built.
		Ok(ConfigLayer::default())
	}
}

/// File-based configuration source (TOML).
pub struct FileSource {
	path: PathBuf,
	precedence: Precedence,
	name: &'static str,
	required: bool,
}

impl FileSource {
	/// System config: /etc/kdebug/config.toml
	pub fn system(paths: &PathsConfig) -> Self {
		Self {
			path: paths.system_config_file.clone(),
			precedence: Precedence::SystemFile,
			name: "system-config",
			required: false,
		}
	}

	/// User config: ~/.config/kdebug/config.toml
	pub fn user(paths: &PathsConfig) -> Self {
		Self {
			path: paths.user_config_file.clone(),
			precedence: Precedence::UserFile,
			name: "user-config",
			required: false,
		}
	}

	/// A file named on the command line. Unlike the standard locations it
	/// must exist.
	pub fn custom(path: PathBuf) -> Self {
		Self {
			path,
			precedence: Precedence::CustomFile,
			name: "custom-config",
			required: true,
		}
	}
}

impl ConfigSource for FileSource {
	fn name(&self) -> &'static str {
		self.name
	}
	fn precedence(&self) -> Precedence {
		self.precedence
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		if !self.required && !self.path.exists() {
			debug!(path = %self.path.display(), source = self.name, "config file not found, skipping");
			return Ok(ConfigLayer::default());
		}

		debug!(path = %self.path.display(), source = self.name, "loading config file");

		let content = std::fs::read_to_string(&self.path)?;
		let layer: ConfigLayer = toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
			path: self.path.clone(),
			source: e,
		})?;

		trace!(source = self.name, "parsed config layer");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Recognizes `KDEBUG_NAMESPACE`, `KDEBUG_POD_NAME`, `KDEBUG_IMAGE`,
/// `KDEBUG_READY_TIMEOUT_SECS`, `KDEBUG_ENTRY_TIMEOUT_SECS`,
/// `KDEBUG_LOG_LEVEL` and `KDEBUG_LOG_FORMAT`.
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}
	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		debug!("loading environment variables");
		layer_from_vars(std::env::vars())
	}
}

fn layer_from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Result<ConfigLayer, ConfigError> {
	let mut layer = ConfigLayer::default();

	for (key, value) in vars {
		if !key.starts_with("KDEBUG_") {
			continue;
		}

		let value = value.trim().to_string();
		if value.is_empty() {
			continue;
		}

		trace!(key = %key, "processing env var");

		match key.as_str() {
			"KDEBUG_NAMESPACE" => layer.session_mut().namespace = Some(value),
			"KDEBUG_POD_NAME" => layer.session_mut().pod_name = Some(value),
			"KDEBUG_IMAGE" => layer.session_mut().image = Some(value),
			"KDEBUG_READY_TIMEOUT_SECS" => {
				layer.session_mut().ready_timeout_secs = Some(parse_secs(&key, &value)?);
			}
			"KDEBUG_ENTRY_TIMEOUT_SECS" => {
				layer.session_mut().entry_timeout_secs = Some(parse_secs(&key, &value)?);
			}
			"KDEBUG_LOG_LEVEL" => layer.logging_mut().level = Some(value),
			"KDEBUG_LOG_FORMAT" => layer.logging_mut().format = Some(value),
			_ => {
				// Unknown KDEBUG_ variable, ignore
			}
		}
	}

	Ok(layer)
}

fn parse_secs(key: &str, value: &str) -> Result<u64, ConfigError> {
	value
		.parse()
		.map_err(|_| ConfigError::Env(format!("{key} must be a whole number of seconds, got '{value}'")))
}

/// CLI override source.
pub struct CliSource {
	overrides: CliOverrides,
}

/// CLI argument overrides.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
	pub namespace: Option<String>,
	pub pod_name: Option<String>,
	pub image: Option<String>,
	pub entrypoint: Option<Vec<String>>,
	pub shell: Option<Vec<String>>,
	pub entry_timeout: Option<Duration>,
	pub ready_timeout: Option<Duration>,
	pub log_level: Option<String>,
	pub log_format: Option<String>,
	pub config_file: Option<PathBuf>,
}

impl CliSource {
	pub fn new(overrides: CliOverrides) -> Self {
		Self { overrides }
	}
}

impl ConfigSource for CliSource {
	fn name(&self) -> &'static str {
		"cli"
	}
	fn precedence(&self) -> Precedence {
		Precedence::Cli
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		debug!("loading CLI overrides");
		let overrides = self.overrides.clone();
		let mut layer = ConfigLayer::default();

		if overrides.namespace.is_some() {
			layer.session_mut().namespace = overrides.namespace;
		}
		if overrides.pod_name.is_some() {
			layer.session_mut().pod_name = overrides.pod_name;
		}
		if overrides.image.is_some() {
			layer.session_mut().image = overrides.image;
		}
		if let Some(entrypoint) = overrides.entrypoint.filter(|e| !e.is_empty()) {
			layer.session_mut().entrypoint = Some(entrypoint);
		}
		if let Some(shell) = overrides.shell.filter(|s| !s.is_empty()) {
			layer.session_mut().shell = Some(shell);
		}
		if let Some(timeout) = overrides.entry_timeout {
			layer.session_mut().entry_timeout_secs = Some(whole_secs(timeout));
		}
		if let Some(timeout) = overrides.ready_timeout {
			layer.session_mut().ready_timeout_secs = Some(whole_secs(timeout));
		}
		if overrides.log_level.is_some() {
			layer.logging_mut().level = overrides.log_level;
		}
		if overrides.log_format.is_some() {
			layer.logging_mut().format = overrides.log_format;
		}

		Ok(layer)
	}
}

/// Round up to whole seconds so a non-zero duration never becomes zero.
fn whole_secs(duration: Duration) -> u64 {
	duration.as_secs() + u64::from(duration.subsec_nanos() > 0)
}
