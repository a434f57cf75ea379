// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration management for kdebug.
//!
//! This crate provides:
//! - XDG Base Directory compliant path resolution
//! - Layered configuration from multiple sources
//! - TOML configuration file parsing
//! - Environment variable overrides
//! - Configuration validation

pub mod error;
pub mod layer;
pub mod paths;
pub mod registry;
pub mod runtime;
pub mod sources;
pub mod validation;

pub use error::ConfigError;
pub use layer::ConfigLayer;
pub use paths::PathsConfig;
pub use registry::ConfigRegistry;
pub use runtime::{KdebugConfig, LogFormat, LogLevel, LoggingConfig, SessionSettings};
pub use sources::{CliOverrides, ConfigSource, Precedence};

/// Load configuration with CLI overrides from the standard locations.
pub fn load_config_with_cli(cli: CliOverrides) -> Result<KdebugConfig, ConfigError> {
	let paths = paths::resolve_xdg_paths()?;
	load_config_from(paths, cli)
}

/// Load configuration with CLI overrides, reading config files from `paths`.
pub fn load_config_from(paths: PathsConfig, cli: CliOverrides) -> Result<KdebugConfig, ConfigError> {
	let mut registry = ConfigRegistry::new();

	registry.register(Box::new(sources::DefaultsSource));
	registry.register(Box::new(sources::FileSource::system(&paths)));
	registry.register(Box::new(sources::FileSource::user(&paths)));
	if let Some(path) = cli.config_file.clone() {
		registry.register(Box::new(sources::FileSource::custom(path)));
	}
	registry.register(Box::new(sources::EnvSource));
	registry.register(Box::new(sources::CliSource::new(cli)));

	registry.load(paths)
}
