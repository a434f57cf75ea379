// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Debug pod scheduling: create, wait for the pod to run, delete.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use kdebug_k8s::{K8sClient, K8sError, Pod, WatchEvent};

use crate::error::{SessionError, TeardownWarning};
use crate::types::{PodHandle, SessionPhase};

/// Grace period used when removing the debug pod.
const DELETE_GRACE_PERIOD_SECS: u32 = 0;

/// Owns the cluster lifetime of a single debug pod.
pub struct Scheduler {
	client: Arc<dyn K8sClient>,
}

impl Scheduler {
	pub fn new(client: Arc<dyn K8sClient>) -> Self {
		Self { client }
	}

	/// Submit the debug pod. Any refusal from the cluster is a scheduling error.
	pub async fn create(&self, pod: Pod, target_container: &str) -> Result<PodHandle, SessionError> {
		let name = pod.metadata.name.clone().unwrap_or_default();
		let namespace = pod.metadata.namespace.clone().unwrap_or_default();

		tracing::info!(pod_name = %name, namespace = %namespace, "Creating pod {name} in namespace {namespace}...");
		let created = self
			.client
			.create_pod(&namespace, pod)
			.await
			.map_err(SessionError::Scheduling)?;

		Ok(PodHandle {
			name: created.metadata.name.unwrap_or(name),
			namespace: created.metadata.namespace.unwrap_or(namespace),
			resource_version: created.metadata.resource_version,
			target_container: target_container.to_string(),
		})
	}

	/// Block until the pod is running.
	///
	/// Opens one watch on the pod, starting after the version returned by
	/// [`Scheduler::create`]. The watch is closed on every return path.
	pub async fn await_ready(
		&self,
		handle: &PodHandle,
		deadline: Option<Duration>,
	) -> Result<(), SessionError> {
		match deadline {
			Some(timeout) => tokio::time::timeout(timeout, self.watch_until_running(handle))
				.await
				.map_err(|_| SessionError::ReadyTimeout {
					pod_name: handle.name.clone(),
					timeout,
				})?,
			None => self.watch_until_running(handle).await,
		}
	}

	async fn watch_until_running(&self, handle: &PodHandle) -> Result<(), SessionError> {
		let watch_error = |source: K8sError| SessionError::Watch {
			pod_name: handle.name.clone(),
			source,
		};

		let Some(resource_version) = handle.resource_version.as_deref() else {
			return Err(watch_error(K8sError::WatchError {
				message: "created pod has no resource version".to_string(),
			}));
		};

		let mut events = self
			.client
			.watch_pod(&handle.name, &handle.namespace, resource_version)
			.await
			.map_err(watch_error)?;

		while let Some(event) = events.next().await {
			let pod = match event.map_err(watch_error)? {
				WatchEvent::Modified(pod) => pod,
				other => {
					return Err(SessionError::UnexpectedEvent {
						pod_name: handle.name.clone(),
						event: event_type(&other).to_string(),
					})
				}
			};

			let status = pod.status.unwrap_or_default();
			let phase = status.phase.as_deref().unwrap_or("Unknown");
			tracing::info!(pod_name = %handle.name, phase = %phase, "Pod status is now '{phase}'");

			match SessionPhase::from_pod_phase(status.phase.as_deref()) {
				SessionPhase::Running => return Ok(()),
				SessionPhase::Failed => {
					return Err(SessionError::PodStartFailed {
						pod_name: handle.name.clone(),
						reason: status
							.reason
							.or(status.message)
							.unwrap_or_else(|| "pod failed to start".to_string()),
					})
				}
				_ => {}
			}
		}

		Err(SessionError::WatchClosed {
			pod_name: handle.name.clone(),
		})
	}

	/// Delete the debug pod. A pod that is already gone counts as removed.
	pub async fn terminate(&self, handle: &PodHandle) -> Result<(), TeardownWarning> {
		tracing::info!(pod_name = %handle.name, "Removing pod {}...", handle.name);
		match self
			.client
			.delete_pod(&handle.name, &handle.namespace, DELETE_GRACE_PERIOD_SECS)
			.await
		{
			Ok(()) | Err(K8sError::PodNotFound { .. }) => {
				tracing::info!(pod_name = %handle.name, "Cleaned up successfully.");
				Ok(())
			}
			Err(source) => {
				tracing::error!(pod_name = %handle.name, error = %source, "Could not remove pod");
				Err(TeardownWarning::PodDelete {
					pod_name: handle.name.clone(),
					source,
				})
			}
		}
	}
}

fn event_type(event: &WatchEvent<Pod>) -> &'static str {
	match event {
		WatchEvent::Added(_) => "ADDED",
		WatchEvent::Modified(_) => "MODIFIED",
		WatchEvent::Deleted(_) => "DELETED",
		WatchEvent::Bookmark(_) => "BOOKMARK",
		WatchEvent::Error(_) => "ERROR",
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use kdebug_k8s::{pod_in_phase, MockK8sClient};

	fn handle() -> PodHandle {
		PodHandle {
			name: "kdebug-pod".into(),
			namespace: "default".into(),
			resource_version: Some("1".into()),
			target_container: "app".into(),
		}
	}

	fn scheduler(client: &MockK8sClient) -> Scheduler {
		Scheduler::new(Arc::new(client.clone()))
	}

	#[tokio::test]
	async fn pending_then_running_is_ready() {
		let client = MockK8sClient::new().with_watch_events(vec![
			MockK8sClient::modified("Pending"),
			MockK8sClient::modified("Running"),
		]);
		scheduler(&client).await_ready(&handle(), None).await.unwrap();
		assert_eq!(client.calls().watch_opened(), 1);
		assert_eq!(client.calls().watch_closed(), 1);
	}

	#[tokio::test]
	async fn failed_phase_stops_the_wait() {
		let client = MockK8sClient::new().with_watch_events(vec![
			MockK8sClient::modified("Pending"),
			MockK8sClient::modified("Pending"),
			MockK8sClient::modified("Failed"),
		]);
		let err = scheduler(&client)
			.await_ready(&handle(), None)
			.await
			.unwrap_err();
		assert!(matches!(err, SessionError::PodStartFailed { .. }));
		assert_eq!(client.calls().watch_opened(), 1);
		assert_eq!(client.calls().watch_closed(), 1);
	}

	#[tokio::test]
	async fn non_modified_event_is_unexpected() {
		let client = MockK8sClient::new()
			.with_watch_events(vec![WatchEvent::Deleted(pod_in_phase("Pending"))]);
		let err = scheduler(&client)
			.await_ready(&handle(), None)
			.await
			.unwrap_err();
		match err {
			SessionError::UnexpectedEvent { event, .. } => assert_eq!(event, "DELETED"),
			other => panic!("unexpected error: {other:?}"),
		}
		assert_eq!(client.calls().watch_closed(), 1);
	}

	#[tokio::test]
	async fn closed_watch_is_an_error() {
		let client = MockK8sClient::new()
			.with_watch_events(vec![MockK8sClient::modified("Pending")])
			.end_watch_after_events();
		let err = scheduler(&client)
			.await_ready(&handle(), None)
			.await
			.unwrap_err();
		assert!(matches!(err, SessionError::WatchClosed { .. }));
	}

	#[tokio::test(start_paused = true)]
	async fn deadline_bounds_the_wait() {
		let client = MockK8sClient::new().with_watch_events(vec![MockK8sClient::modified("Pending")]);
		let err = scheduler(&client)
			.await_ready(&handle(), Some(Duration::from_secs(30)))
			.await
			.unwrap_err();
		assert!(matches!(err, SessionError::ReadyTimeout { .. }));
		assert_eq!(client.calls().watch_closed(), 1);
	}

	#[tokio::test]
	async fn rejected_create_is_a_scheduling_error() {
		let client = MockK8sClient::new().reject_create("exceeded quota");
		let pod = pod_in_phase("Pending");
		let err = scheduler(&client).create(pod, "app").await.unwrap_err();
		assert!(matches!(err, SessionError::Scheduling(_)));
	}

	#[tokio::test]
	async fn create_returns_handle_with_resource_version() {
		let client = MockK8sClient::new();
		let mut pod = pod_in_phase("Pending");
		pod.metadata.name = Some("kdebug-pod".into());
		pod.metadata.namespace = Some("debug".into());
		let handle = scheduler(&client).create(pod, "app").await.unwrap();
		assert_eq!(handle.name, "kdebug-pod");
		assert_eq!(handle.namespace, "debug");
		assert_eq!(handle.resource_version.as_deref(), Some("1"));
		assert_eq!(handle.target_container, "app");
	}

	#[tokio::test]
	async fn missing_resource_version_fails_without_watching() {
		let client = MockK8sClient::new().omit_resource_version();
		let mut pod = pod_in_phase("Pending");
		pod.metadata.name = Some("kdebug-pod".into());
		pod.metadata.namespace = Some("debug".into());
		let scheduler = scheduler(&client);
		let handle = scheduler.create(pod, "app").await.unwrap();
		assert_eq!(handle.resource_version, None);

		let err = scheduler.await_ready(&handle, None).await.unwrap_err();
		assert!(matches!(err, SessionError::Watch { .. }));
		assert_eq!(err.class(), crate::error::SessionErrorClass::PodStart);
		assert_eq!(client.calls().watch_opened(), 0);
	}

	#[tokio::test]
	async fn terminate_uses_zero_grace_and_reports_failure() {
		let client = MockK8sClient::new();
		scheduler(&client).terminate(&handle()).await.unwrap();
		assert_eq!(
			client.deleted_pods(),
			vec![("kdebug-pod".to_string(), "default".to_string(), 0)]
		);

		let client = MockK8sClient::new().fail_delete("connection refused");
		let warning = scheduler(&client).terminate(&handle()).await.unwrap_err();
		assert!(matches!(warning, TeardownWarning::PodDelete { .. }));
	}
}
