// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use async_trait::async_trait;

use crate::error::K8sError;
use crate::types::{ExecProcess, Pod, PodSpec, PodWatchStream, WorkloadReference};

/// Trait for K8s client operations.
///
/// This abstraction allows for easy mocking in tests while providing
/// a clean interface for the K8s operations a debug session needs.
#[async_trait]
pub trait K8sClient: Send + Sync {
	/// Fetch a copy of the pod template of a deployment, job, cronjob or
	/// statefulset.
	async fn pod_template(&self, workload: &WorkloadReference) -> Result<PodSpec, K8sError>;

	/// Create a new pod in the specified namespace.
	async fn create_pod(&self, namespace: &str, pod: Pod) -> Result<Pod, K8sError>;

	/// Delete a pod by name from the specified namespace.
	async fn delete_pod(
		&self,
		name: &str,
		namespace: &str,
		grace_period_seconds: u32,
	) -> Result<(), K8sError>;

	/// Watch a single pod for changes after `resource_version`.
	///
	/// Dropping the returned stream closes the watch.
	async fn watch_pod(
		&self,
		name: &str,
		namespace: &str,
		resource_version: &str,
	) -> Result<PodWatchStream, K8sError>;

	/// Run a command in a container with stdin, stdout and a TTY attached.
	async fn exec(
		&self,
		name: &str,
		namespace: &str,
		container: &str,
		command: &[String],
	) -> Result<ExecProcess, K8sError>;
}
