// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration validation rules.

use std::time::Duration;

use crate::runtime::KdebugConfig;
use crate::ConfigError;

/// Validate the configuration.
///
/// Returns Ok(()) if valid, or the first ConfigError::InvalidValue found.
pub fn validate_config(config: &KdebugConfig) -> Result<(), ConfigError> {
	let session = &config.session;

	if session.namespace.trim().is_empty() {
		return Err(ConfigError::invalid_value(
			"session.namespace",
			"namespace cannot be empty",
		));
	}

	if session.pod_name.trim().is_empty() {
		return Err(ConfigError::invalid_value(
			"session.pod_name",
			"pod name cannot be empty",
		));
	}

	validate_command("session.entrypoint", &session.entrypoint)?;
	validate_command("session.shell", &session.shell)?;

	if session.entry_timeout < Duration::from_secs(1) {
		return Err(ConfigError::invalid_value(
			"session.entry_timeout_secs",
			"must be at least 1 second",
		));
	}

	if session.resize_interval.is_zero() {
		return Err(ConfigError::invalid_value(
			"session.resize_interval_secs",
			"must be at least 1 second",
		));
	}

	Ok(())
}

fn validate_command(field: &str, command: &[String]) -> Result<(), ConfigError> {
	if command.is_empty() {
		return Err(ConfigError::invalid_value(field, "command cannot be empty"));
	}
	if command.iter().any(|arg| arg.is_empty()) {
		return Err(ConfigError::invalid_value(
			field,
			"command elements cannot be empty",
		));
	}
	Ok(())
}
