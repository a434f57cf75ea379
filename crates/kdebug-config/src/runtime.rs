// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Runtime configuration types with resolved defaults.

use std::fmt;
use std::time::Duration;

use crate::layer::*;
use crate::paths::PathsConfig;
use crate::ConfigError;

pub const DEFAULT_NAMESPACE: &str = "default";
pub const DEFAULT_POD_NAME: &str = "kdebug-pod";
pub const DEFAULT_SHELL: &str = "/bin/sh";
pub const DEFAULT_ENTRY_TIMEOUT_SECS: u64 = 30 * 60;
pub const DEFAULT_READY_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_RESIZE_INTERVAL_SECS: u64 = 5;

/// The final, validated configuration for kdebug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KdebugConfig {
	pub session: SessionSettings,
	pub logging: LoggingConfig,
	pub paths: PathsConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
	pub namespace: String,
	pub pod_name: String,
	/// Replaces the target container's image when set.
	pub image: Option<String>,
	/// Command the debug container runs. Defaults to sleeping for the entry
	/// timeout so an abandoned pod exits on its own.
	pub entrypoint: Vec<String>,
	pub shell: Vec<String>,
	pub entry_timeout: Duration,
	/// `None` when configured as zero: wait for the pod indefinitely.
	pub ready_timeout: Option<Duration>,
	pub resize_interval: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
	pub level: LogLevel,
	pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
	Error,
	Warn,
	#[default]
	Info,
	Debug,
	Trace,
}

impl LogLevel {
	pub fn as_str(&self) -> &'static str {
		match self {
			LogLevel::Error => "error",
			LogLevel::Warn => "warn",
			LogLevel::Info => "info",
			LogLevel::Debug => "debug",
			LogLevel::Trace => "trace",
		}
	}
}

impl fmt::Display for LogLevel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
	#[default]
	Pretty,
	Json,
	Compact,
}

impl Default for LoggingConfig {
	fn default() -> Self {
		Self {
			level: LogLevel::Info,
			format: LogFormat::Pretty,
		}
	}
}

impl KdebugConfig {
	/// Build runtime config from a merged layer and paths.
	pub fn from_layer(layer: ConfigLayer, paths: PathsConfig) -> Result<Self, ConfigError> {
		Ok(Self {
			session: build_session_settings(layer.session),
			logging: build_logging_config(layer.logging)?,
			paths,
		})
	}
}

fn build_session_settings(layer: Option<SessionLayer>) -> SessionSettings {
	let layer = layer.unwrap_or_default();
	let entry_timeout_secs = layer
		.entry_timeout_secs
		.unwrap_or(DEFAULT_ENTRY_TIMEOUT_SECS);

	SessionSettings {
		namespace: layer
			.namespace
			.unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
		pod_name: layer
			.pod_name
			.unwrap_or_else(|| DEFAULT_POD_NAME.to_string()),
		image: layer.image.filter(|image| !image.is_empty()),
		entrypoint: layer
			.entrypoint
			.filter(|entry| !entry.is_empty())
			.unwrap_or_else(|| vec!["/bin/sleep".to_string(), entry_timeout_secs.to_string()]),
		shell: layer
			.shell
			.filter(|shell| !shell.is_empty())
			.unwrap_or_else(|| vec![DEFAULT_SHELL.to_string()]),
		entry_timeout: Duration::from_secs(entry_timeout_secs),
		ready_timeout: match layer.ready_timeout_secs.unwrap_or(DEFAULT_READY_TIMEOUT_SECS) {
			0 => None,
			secs => Some(Duration::from_secs(secs)),
		},
		resize_interval: Duration::from_secs(
			layer
				.resize_interval_secs
				.unwrap_or(DEFAULT_RESIZE_INTERVAL_SECS),
		),
	}
}

fn build_logging_config(layer: Option<LoggingLayer>) -> Result<LoggingConfig, ConfigError> {
	let layer = layer.unwrap_or_default();
	Ok(LoggingConfig {
		level: parse_log_level(layer.level.as_deref())?,
		format: parse_log_format(layer.format.as_deref())?,
	})
}

fn parse_log_level(s: Option<&str>) -> Result<LogLevel, ConfigError> {
	match s {
		None | Some("info") => Ok(LogLevel::Info),
		Some("error") => Ok(LogLevel::Error),
		Some("warn") => Ok(LogLevel::Warn),
		Some("debug") => Ok(LogLevel::Debug),
		Some("trace") => Ok(LogLevel::Trace),
		Some(other) => Err(ConfigError::invalid_value(
			"logging.level",
			format!("unknown level '{other}' (expected error, warn, info, debug or trace)"),
		)),
	}
}

fn parse_log_format(s: Option<&str>) -> Result<LogFormat, ConfigError> {
	match s {
		None | Some("pretty") => Ok(LogFormat::Pretty),
		Some("json") => Ok(LogFormat::Json),
		Some("compact") => Ok(LogFormat::Compact),
		Some(other) => Err(ConfigError::invalid_value(
			"logging.format",
			format!("unknown format '{other}' (expected pretty, compact or json)"),
		)),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_layer_resolves_defaults() {
		let config = KdebugConfig::from_layer(ConfigLayer::default(), PathsConfig::default()).unwrap();
		let session = &config.session;
		assert_eq!(session.namespace, "default");
		assert_eq!(session.pod_name, "kdebug-pod");
		assert_eq!(session.entrypoint, vec!["/bin/sleep", "1800"]);
		assert_eq!(session.shell, vec!["/bin/sh"]);
		assert_eq!(session.entry_timeout, Duration::from_secs(1800));
		assert_eq!(session.ready_timeout, Some(Duration::from_secs(300)));
		assert_eq!(session.resize_interval, Duration::from_secs(5));
		assert_eq!(session.image, None);
		assert_eq!(config.logging, LoggingConfig::default());
	}

	#[test]
	fn entry_timeout_drives_default_entrypoint() {
		let mut layer = ConfigLayer::default();
		layer.session_mut().entry_timeout_secs = Some(120);
		let config = KdebugConfig::from_layer(layer, PathsConfig::default()).unwrap();
		assert_eq!(config.session.entrypoint, vec!["/bin/sleep", "120"]);
	}

	#[test]
	fn explicit_entrypoint_wins_over_timeout() {
		let mut layer = ConfigLayer::default();
		layer.session_mut().entry_timeout_secs = Some(120);
		layer.session_mut().entrypoint = Some(vec!["/bin/tail".into(), "-f".into(), "/dev/null".into()]);
		let config = KdebugConfig::from_layer(layer, PathsConfig::default()).unwrap();
		assert_eq!(config.session.entrypoint, vec!["/bin/tail", "-f", "/dev/null"]);
	}

	#[test]
	fn zero_ready_timeout_disables_deadline() {
		let mut layer = ConfigLayer::default();
		layer.session_mut().ready_timeout_secs = Some(0);
		let config = KdebugConfig::from_layer(layer, PathsConfig::default()).unwrap();
		assert_eq!(config.session.ready_timeout, None);
	}

	#[test]
	fn unknown_log_level_is_rejected() {
		let mut layer = ConfigLayer::default();
		layer.logging_mut().level = Some("loud".into());
		let err = KdebugConfig::from_layer(layer, PathsConfig::default()).unwrap_err();
		assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "logging.level"));
	}
}
