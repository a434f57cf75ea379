// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use kdebug_config::CliOverrides;
use kdebug_k8s::WorkloadKind;

/// kdebug - debug a workload from a throwaway copy of its pod
#[derive(Parser, Debug)]
#[command(name = "kdebug", version, about, long_about = None)]
pub struct Args {
	/// Namespace of the workload and the debug pod
	#[arg(short, long)]
	pub namespace: Option<String>,

	/// Name of the debug pod
	#[arg(long = "name", value_name = "POD")]
	pub pod_name: Option<String>,

	/// Kind of workload: deployment, job, cronjob or statefulset
	#[arg(long = "type", value_name = "KIND", default_value = "deployment")]
	pub kind: WorkloadKind,

	/// Name of the workload to copy
	#[arg(short, long, value_parser = non_empty)]
	pub source: String,

	/// Container to debug (defaults to the first one)
	#[arg(short = 'c', long = "container-name", value_name = "NAME")]
	pub container: Option<String>,

	/// Image to run instead of the container's own
	#[arg(long)]
	pub image: Option<String>,

	/// Command the debug container runs while you are attached (repeatable)
	#[arg(long = "entry", value_name = "ARG", allow_hyphen_values = true)]
	pub entrypoint: Vec<String>,

	/// Interactive command to exec (repeatable)
	#[arg(long, value_name = "ARG", allow_hyphen_values = true)]
	pub shell: Vec<String>,

	/// How long the default entrypoint keeps the pod alive
	#[arg(long, value_parser = humantime::parse_duration)]
	pub timeout: Option<Duration>,

	/// How long to wait for the pod to start (0s waits forever)
	#[arg(long, value_parser = humantime::parse_duration)]
	pub ready_timeout: Option<Duration>,

	/// Path to custom configuration file
	#[arg(long)]
	pub config: Option<PathBuf>,

	/// Log level (overrides config)
	#[arg(long)]
	pub log_level: Option<String>,

	/// Log format: pretty, compact or json (overrides config)
	#[arg(long)]
	pub log_format: Option<String>,
}

fn non_empty(value: &str) -> Result<String, String> {
	if value.trim().is_empty() {
		return Err("must not be empty".to_string());
	}
	Ok(value.to_string())
}

impl From<&Args> for CliOverrides {
	fn from(args: &Args) -> Self {
		CliOverrides {
			namespace: args.namespace.clone(),
			pod_name: args.pod_name.clone(),
			image: args.image.clone(),
			entrypoint: Some(args.entrypoint.clone()),
			shell: Some(args.shell.clone()),
			entry_timeout: args.timeout,
			ready_timeout: args.ready_timeout,
			log_level: args.log_level.clone(),
			log_format: args.log_format.clone(),
			config_file: args.config.clone(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use clap::error::ErrorKind;

	fn parse(args: &[&str]) -> Result<Args, clap::Error> {
		Args::try_parse_from(std::iter::once("kdebug").chain(args.iter().copied()))
	}

	#[test]
	fn defaults_to_deployment() {
		let args = parse(&["-s", "api"]).unwrap();
		assert_eq!(args.kind, WorkloadKind::Deployment);
		assert_eq!(args.source, "api");
		assert!(args.entrypoint.is_empty());
	}

	#[test]
	fn source_is_required() {
		let err = parse(&["--type", "job"]).unwrap_err();
		assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
	}

	#[test]
	fn empty_source_is_rejected() {
		let err = parse(&["--source", ""]).unwrap_err();
		assert_eq!(err.kind(), ErrorKind::ValueValidation);
	}

	#[test]
	fn unknown_kind_is_rejected() {
		let err = parse(&["-s", "api", "--type", "daemonset"]).unwrap_err();
		assert_eq!(err.kind(), ErrorKind::ValueValidation);
	}

	#[test]
	fn repeated_flags_accumulate() {
		let args = parse(&[
			"-s", "worker", "--type", "cronjob", "-c", "sidecar", "--entry", "/bin/sleep", "--entry",
			"60", "--shell", "/bin/bash", "--shell", "-l",
		])
		.unwrap();
		assert_eq!(args.kind, WorkloadKind::CronJob);
		assert_eq!(args.container.as_deref(), Some("sidecar"));
		assert_eq!(args.entrypoint, vec!["/bin/sleep", "60"]);
		assert_eq!(args.shell, vec!["/bin/bash", "-l"]);
	}

	#[test]
	fn durations_parse_with_units() {
		let args = parse(&["-s", "api", "--timeout", "1h", "--ready-timeout", "90s"]).unwrap();
		let overrides = CliOverrides::from(&args);
		assert_eq!(overrides.entry_timeout, Some(Duration::from_secs(3600)));
		assert_eq!(overrides.ready_timeout, Some(Duration::from_secs(90)));
	}

	#[test]
	fn bad_duration_is_rejected() {
		assert!(parse(&["-s", "api", "--timeout", "soon"]).is_err());
	}
}
