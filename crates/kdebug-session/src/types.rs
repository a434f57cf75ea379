// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt;

use kdebug_k8s::{TerminalSize, WorkloadReference};

/// Lifecycle phase of the debug pod as observed by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
	Pending,
	Running,
	Failed,
	/// Reached only through teardown, from any other phase.
	Terminated,
}

impl SessionPhase {
	/// Map a pod status phase onto a session phase. `Succeeded` and `Unknown`
	/// count as still pending: neither lets a shell attach, and neither is the
	/// failure the watch waits for.
	pub fn from_pod_phase(phase: Option<&str>) -> Self {
		match phase {
			Some("Running") => SessionPhase::Running,
			Some("Failed") => SessionPhase::Failed,
			_ => SessionPhase::Pending,
		}
	}
}

impl fmt::Display for SessionPhase {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SessionPhase::Pending => write!(f, "pending"),
			SessionPhase::Running => write!(f, "running"),
			SessionPhase::Failed => write!(f, "failed"),
			SessionPhase::Terminated => write!(f, "terminated"),
		}
	}
}

/// The cluster-side identity of a created debug pod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodHandle {
	pub name: String,
	pub namespace: String,
	/// Resource version returned by the create call; the readiness watch
	/// starts after it. A watch from no version would replay the pod's
	/// creation, so readiness cannot be awaited without one.
	pub resource_version: Option<String>,
	pub target_container: String,
}

/// Local terminal size in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalDimensions {
	pub columns: u16,
	pub rows: u16,
}

impl TerminalDimensions {
	pub fn new(columns: u16, rows: u16) -> Self {
		Self { columns, rows }
	}
}

impl From<TerminalDimensions> for TerminalSize {
	fn from(dims: TerminalDimensions) -> Self {
		TerminalSize {
			width: dims.columns,
			height: dims.rows,
		}
	}
}

/// Everything needed to run one debug session.
#[derive(Debug, Clone)]
pub struct SessionRequest {
	pub workload: WorkloadReference,
	/// Name given to the debug pod.
	pub pod_name: String,
	/// Container to debug; `None` selects the first container.
	pub container: Option<String>,
	/// Replaces the target container's image when set.
	pub image: Option<String>,
	/// Command the debug container runs in place of its own.
	pub entrypoint: Vec<String>,
	/// Interactive command exec'd once the pod is running.
	pub command: Vec<String>,
}
