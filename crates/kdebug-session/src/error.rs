// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session error types.

use std::fmt;
use std::io;
use std::time::Duration;

use kdebug_k8s::K8sError;

/// Errors raised while deriving a debug pod spec from a workload template.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
	/// No container in the template carries the requested name
	#[error("container not found: {selector}")]
	ContainerNotFound { selector: String },

	/// The template declares no containers at all
	#[error("pod template has no containers")]
	NoContainers,

	/// The entrypoint has no command to run
	#[error("entrypoint must not be empty")]
	EmptyEntrypoint,
}

/// Errors that end a debug session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
	/// The workload could not be resolved to a pod template
	#[error("could not resolve workload: {0}")]
	Resolution(#[source] K8sError),

	#[error(transparent)]
	Transform(#[from] TransformError),

	/// The cluster refused to create the debug pod
	#[error("could not create pod: {0}")]
	Scheduling(#[source] K8sError),

	/// The pod reached the Failed phase before running
	#[error("pod {pod_name} failed to start: {reason}")]
	PodStartFailed { pod_name: String, reason: String },

	/// The watch delivered an event other than a modification
	#[error("unexpected {event} event while waiting for pod {pod_name}")]
	UnexpectedEvent { pod_name: String, event: String },

	/// The watch ended before the pod reached a terminal phase
	#[error("watch closed before pod {pod_name} started")]
	WatchClosed { pod_name: String },

	#[error("watch failed for pod {pod_name}: {source}")]
	Watch {
		pod_name: String,
		#[source]
		source: K8sError,
	},

	/// The pod did not start within the ready deadline
	#[error("pod {pod_name} not running after {}s", timeout.as_secs())]
	ReadyTimeout { pod_name: String, timeout: Duration },

	/// The exec channel could not be opened or broke down
	#[error("stream error: {message}")]
	Stream { message: String },

	#[error("could not switch terminal to raw mode: {0}")]
	Terminal(#[source] io::Error),

	/// The remote shell exited with a non-zero code
	#[error("remote command exited with code {code}")]
	RemoteExit { code: i32 },

	#[error("session interrupted")]
	Interrupted,
}

/// Coarse grouping of [`SessionError`] for reporting and exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionErrorClass {
	Resolution,
	Transform,
	Scheduling,
	PodStart,
	Stream,
	Interrupted,
}

impl SessionErrorClass {
	pub fn as_str(&self) -> &'static str {
		match self {
			SessionErrorClass::Resolution => "ResolutionError",
			SessionErrorClass::Transform => "TransformError",
			SessionErrorClass::Scheduling => "SchedulingError",
			SessionErrorClass::PodStart => "PodStartFailed",
			SessionErrorClass::Stream => "StreamError",
			SessionErrorClass::Interrupted => "Interrupted",
		}
	}
}

impl fmt::Display for SessionErrorClass {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl SessionError {
	pub fn class(&self) -> SessionErrorClass {
		match self {
			SessionError::Resolution(_) => SessionErrorClass::Resolution,
			SessionError::Transform(_) => SessionErrorClass::Transform,
			SessionError::Scheduling(_) => SessionErrorClass::Scheduling,
			SessionError::PodStartFailed { .. }
			| SessionError::UnexpectedEvent { .. }
			| SessionError::WatchClosed { .. }
			| SessionError::Watch { .. }
			| SessionError::ReadyTimeout { .. } => SessionErrorClass::PodStart,
			SessionError::Stream { .. }
			| SessionError::Terminal(_)
			| SessionError::RemoteExit { .. } => SessionErrorClass::Stream,
			SessionError::Interrupted => SessionErrorClass::Interrupted,
		}
	}
}

/// A cleanup step that failed. Reported alongside the session outcome, never
/// in place of it.
#[derive(Debug, thiserror::Error)]
pub enum TeardownWarning {
	#[error("could not remove pod {pod_name}: {source}")]
	PodDelete {
		pod_name: String,
		#[source]
		source: K8sError,
	},

	#[error("could not restore terminal: {0}")]
	TerminalRestore(#[source] io::Error),
}

/// Warnings collected while tearing a session down.
#[derive(Debug, Default)]
pub struct TeardownReport {
	warnings: Vec<TeardownWarning>,
}

impl TeardownReport {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&mut self, warning: TeardownWarning) {
		self.warnings.push(warning);
	}

	pub fn is_empty(&self) -> bool {
		self.warnings.is_empty()
	}

	pub fn warnings(&self) -> &[TeardownWarning] {
		&self.warnings
	}
}
