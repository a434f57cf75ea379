// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::fmt;
use std::pin::Pin;
use std::str::FromStr;

use futures::future::BoxFuture;
use futures::Stream;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::K8sError;

pub use k8s_openapi::api::core::v1::{Container, Pod, PodSpec, PodStatus, Probe, Volume};
pub use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
pub use kube::api::{TerminalSize, WatchEvent};

/// Workload kinds whose pod template can seed a debug pod.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkloadKind {
	Deployment,
	Job,
	CronJob,
	StatefulSet,
}

impl WorkloadKind {
	pub const ALL: [WorkloadKind; 4] = [
		WorkloadKind::Deployment,
		WorkloadKind::Job,
		WorkloadKind::CronJob,
		WorkloadKind::StatefulSet,
	];

	/// Lowercase name as accepted on the command line.
	pub fn as_str(&self) -> &'static str {
		match self {
			WorkloadKind::Deployment => "deployment",
			WorkloadKind::Job => "job",
			WorkloadKind::CronJob => "cronjob",
			WorkloadKind::StatefulSet => "statefulset",
		}
	}
}

impl fmt::Display for WorkloadKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Error returned when parsing an unrecognized workload kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid resource type '{0}' (expected one of: deployment, job, cronjob, statefulset)")]
pub struct ParseWorkloadKindError(pub String);

impl FromStr for WorkloadKind {
	type Err = ParseWorkloadKindError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		WorkloadKind::ALL
			.into_iter()
			.find(|kind| kind.as_str() == s)
			.ok_or_else(|| ParseWorkloadKindError(s.to_string()))
	}
}

/// A named workload whose pod template is copied into the debug pod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadReference {
	pub namespace: String,
	pub kind: WorkloadKind,
	pub name: String,
}

impl WorkloadReference {
	pub fn new(namespace: impl Into<String>, kind: WorkloadKind, name: impl Into<String>) -> Self {
		Self {
			namespace: namespace.into(),
			kind,
			name: name.into(),
		}
	}
}

impl fmt::Display for WorkloadReference {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{}", self.kind, self.name)
	}
}

/// Watch events for a single pod.
pub type PodWatchStream = Pin<Box<dyn Stream<Item = Result<WatchEvent<Pod>, K8sError>> + Send>>;

/// How a remote exec'd command finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecStatus {
	/// The command exited with the given code.
	Exited(i32),
	/// The server reported a failure that carries no exit code.
	Failed { message: String },
	/// The channel closed before a status was delivered.
	Unknown,
}

/// Bidirectional stream for a command exec'd in a container with a TTY.
pub struct ExecProcess {
	pub stdin: Pin<Box<dyn AsyncWrite + Send>>,
	pub stdout: Pin<Box<dyn AsyncRead + Send>>,
	/// Absent when a TTY is requested: the remote pty merges stderr into stdout.
	pub stderr: Option<Pin<Box<dyn AsyncRead + Send>>>,
	/// Sink for remote pty resizes. Absent when the server offers no resize channel.
	pub resize: Option<futures::channel::mpsc::Sender<TerminalSize>>,
	/// Resolves once the remote command finishes.
	pub status: BoxFuture<'static, ExecStatus>,
}
