// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! kdebug - interactive debug pods for Kubernetes workloads
//!
//! Copies the pod template of a deployment, job, cronjob or statefulset into
//! a standalone pod, opens an interactive shell in it and removes the pod
//! when the shell exits.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use kdebug_config::{load_config_with_cli, CliOverrides, LogFormat, LogLevel, LoggingConfig};
use kdebug_k8s::{KubeClient, WorkloadReference};
use kdebug_session::{
	CrosstermTerminal, DebugSession, SessionConfig, SessionOutcome, SessionRequest, TerminalStreams,
};

mod args;
mod exit;

use args::Args;
use exit::{exit_code, EXIT_INVALID_INPUT, EXIT_SESSION_FAILED};

fn log_level_to_tracing(level: LogLevel) -> tracing::Level {
	match level {
		LogLevel::Trace => tracing::Level::TRACE,
		LogLevel::Debug => tracing::Level::DEBUG,
		LogLevel::Info => tracing::Level::INFO,
		LogLevel::Warn => tracing::Level::WARN,
		LogLevel::Error => tracing::Level::ERROR,
	}
}

/// Logs go to stderr so they never mix with the remote shell's output.
fn init_tracing(logging: &LoggingConfig) {
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(format!("kdebug={}", log_level_to_tracing(logging.level))));

	match logging.format {
		LogFormat::Json => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().json().with_writer(std::io::stderr))
				.init();
		}
		LogFormat::Compact => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().compact().with_writer(std::io::stderr))
				.init();
		}
		LogFormat::Pretty => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().with_writer(std::io::stderr))
				.init();
		}
	}
}

/// Resolves on ctrl-c or SIGTERM.
async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(e) = tokio::signal::ctrl_c().await {
			warn!(error = %e, "failed to listen for ctrl-c");
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
			Ok(mut signal) => {
				signal.recv().await;
			}
			Err(e) => {
				warn!(error = %e, "failed to listen for SIGTERM");
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}

	debug!("shutdown signal received");
}

fn report(outcome: &SessionOutcome) {
	if let Err(e) = &outcome.result {
		eprintln!("{}: {}", e.class(), e);
	}
	for warning in outcome.teardown.warnings() {
		eprintln!("warning: {warning}");
	}
}

async fn run(args: Args) -> Result<i32> {
	let config = match load_config_with_cli(CliOverrides::from(&args)) {
		Ok(config) => config,
		Err(e) => {
			eprintln!("ValidationError: {e}");
			return Ok(EXIT_INVALID_INPUT);
		}
	};

	init_tracing(&config.logging);

	let settings = config.session;
	let request = SessionRequest {
		workload: WorkloadReference::new(&settings.namespace, args.kind, &args.source),
		pod_name: settings.pod_name,
		container: args.container.filter(|name| !name.is_empty()),
		image: settings.image,
		entrypoint: settings.entrypoint,
		command: settings.shell,
	};

	let client = KubeClient::new()
		.await
		.context("failed to create Kubernetes client")?;
	let session = DebugSession::new(
		Arc::new(client),
		Arc::new(CrosstermTerminal),
		SessionConfig {
			ready_timeout: settings.ready_timeout,
			resize_interval: settings.resize_interval,
		},
	);

	let mut streams = TerminalStreams::stdio();
	let outcome = session
		.run(&request, &mut streams, shutdown_signal())
		.await;

	report(&outcome);
	Ok(exit_code(&outcome))
}

#[tokio::main]
async fn main() {
	let args = Args::parse();

	let code = match run(args).await {
		Ok(code) => code,
		Err(e) => {
			eprintln!("Error: {e:#}");
			EXIT_SESSION_FAILED
		}
	};

	// The stdin reader thread would otherwise hold runtime shutdown until the
	// next keypress.
	std::process::exit(code);
}
