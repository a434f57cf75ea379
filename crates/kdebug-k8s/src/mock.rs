// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Scripted in-memory K8s client for exercising debug sessions without a
//! cluster.

use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::channel::mpsc;
use futures::{Stream, StreamExt};
use tokio::io::DuplexStream;
use tokio::sync::oneshot;

use crate::client::K8sClient;
use crate::error::K8sError;
use crate::types::{
	ExecProcess, ExecStatus, ObjectMeta, Pod, PodSpec, PodStatus, PodWatchStream, TerminalSize,
	WatchEvent, WorkloadReference,
};

/// Call counters recorded by [`MockK8sClient`].
#[derive(Debug, Default)]
pub struct MockCalls {
	pod_template: AtomicUsize,
	create_pod: AtomicUsize,
	delete_pod: AtomicUsize,
	watch_opened: AtomicUsize,
	watch_closed: AtomicUsize,
	exec: AtomicUsize,
}

impl MockCalls {
	pub fn pod_template(&self) -> usize {
		self.pod_template.load(Ordering::SeqCst)
	}

	pub fn create_pod(&self) -> usize {
		self.create_pod.load(Ordering::SeqCst)
	}

	pub fn delete_pod(&self) -> usize {
		self.delete_pod.load(Ordering::SeqCst)
	}

	pub fn watch_opened(&self) -> usize {
		self.watch_opened.load(Ordering::SeqCst)
	}

	pub fn watch_closed(&self) -> usize {
		self.watch_closed.load(Ordering::SeqCst)
	}

	pub fn exec(&self) -> usize {
		self.exec.load(Ordering::SeqCst)
	}
}

#[derive(Default)]
struct MockState {
	template: Option<PodSpec>,
	template_forbidden: Option<String>,
	template_stalls: bool,
	create_rejection: Option<String>,
	omit_resource_version: bool,
	delete_failure: Option<String>,
	watch_events: Vec<WatchEvent<Pod>>,
	watch_ends: bool,
	exec: Option<ExecProcess>,
	created: Vec<Pod>,
	deleted: Vec<(String, String, u32)>,
}

/// A mock K8s client with scripted responses.
///
/// The watch stream replays the configured events in order and then either
/// stays open (the default, like a live watch with nothing left to report) or
/// ends, depending on [`MockK8sClient::end_watch_after_events`].
#[derive(Clone, Default)]
pub struct MockK8sClient {
	state: Arc<Mutex<MockState>>,
	calls: Arc<MockCalls>,
}

impl MockK8sClient {
	/// Create a new mock client with no template configured.
	pub fn new() -> Self {
		Self::default()
	}

	/// Return this spec from `pod_template`.
	pub fn with_template(self, template: PodSpec) -> Self {
		self.state.lock().unwrap().template = Some(template);
		self
	}

	/// Fail `pod_template` with a permission error.
	pub fn forbid_template(self, message: &str) -> Self {
		self.state.lock().unwrap().template_forbidden = Some(message.to_string());
		self
	}

	/// Never answer `pod_template`, like an API server that stopped responding.
	pub fn stall_template(self) -> Self {
		self.state.lock().unwrap().template_stalls = true;
		self
	}

	/// Return created pods without a resource version.
	pub fn omit_resource_version(self) -> Self {
		self.state.lock().unwrap().omit_resource_version = true;
		self
	}

	/// Reject `create_pod` as an admission controller would.
	pub fn reject_create(self, message: &str) -> Self {
		self.state.lock().unwrap().create_rejection = Some(message.to_string());
		self
	}

	/// Fail `delete_pod` with an API error.
	pub fn fail_delete(self, message: &str) -> Self {
		self.state.lock().unwrap().delete_failure = Some(message.to_string());
		self
	}

	/// Replay these events on the next watch.
	pub fn with_watch_events(self, events: Vec<WatchEvent<Pod>>) -> Self {
		self.state.lock().unwrap().watch_events = events;
		self
	}

	/// End the watch stream once the scripted events are exhausted.
	pub fn end_watch_after_events(self) -> Self {
		self.state.lock().unwrap().watch_ends = true;
		self
	}

	/// Hand out this process on the next `exec`.
	pub fn with_exec(self, process: ExecProcess) -> Self {
		self.state.lock().unwrap().exec = Some(process);
		self
	}

	pub fn calls(&self) -> &MockCalls {
		&self.calls
	}

	/// Pods passed to `create_pod`, in call order.
	pub fn created_pods(&self) -> Vec<Pod> {
		self.state.lock().unwrap().created.clone()
	}

	/// `(name, namespace, grace_period_seconds)` for each `delete_pod` call.
	pub fn deleted_pods(&self) -> Vec<(String, String, u32)> {
		self.state.lock().unwrap().deleted.clone()
	}

	/// A watch event carrying a pod in the given phase.
	pub fn modified(phase: &str) -> WatchEvent<Pod> {
		WatchEvent::Modified(pod_in_phase(phase))
	}
}

/// A pod whose status reports `phase`.
pub fn pod_in_phase(phase: &str) -> Pod {
	Pod {
		metadata: ObjectMeta::default(),
		spec: None,
		status: Some(PodStatus {
			phase: Some(phase.to_string()),
			..Default::default()
		}),
	}
}

#[async_trait]
impl K8sClient for MockK8sClient {
	async fn pod_template(&self, workload: &WorkloadReference) -> Result<PodSpec, K8sError> {
		self.calls.pod_template.fetch_add(1, Ordering::SeqCst);
		let stalls = self.state.lock().unwrap().template_stalls;
		if stalls {
			futures::future::pending::<()>().await;
		}
		let state = self.state.lock().unwrap();
		if let Some(message) = &state.template_forbidden {
			return Err(K8sError::Forbidden {
				message: message.clone(),
			});
		}
		state.template.clone().ok_or_else(|| K8sError::WorkloadNotFound {
			kind: workload.kind,
			namespace: workload.namespace.clone(),
			name: workload.name.clone(),
		})
	}

	async fn create_pod(&self, namespace: &str, mut pod: Pod) -> Result<Pod, K8sError> {
		self.calls.create_pod.fetch_add(1, Ordering::SeqCst);
		let mut state = self.state.lock().unwrap();
		if let Some(message) = &state.create_rejection {
			return Err(K8sError::Rejected {
				code: 403,
				message: message.clone(),
			});
		}
		pod.metadata.namespace = Some(namespace.to_string());
		if !state.omit_resource_version {
			pod.metadata.resource_version = Some("1".to_string());
		}
		pod.status = Some(PodStatus {
			phase: Some("Pending".to_string()),
			..Default::default()
		});
		state.created.push(pod.clone());
		Ok(pod)
	}

	async fn delete_pod(
		&self,
		name: &str,
		namespace: &str,
		grace_period_seconds: u32,
	) -> Result<(), K8sError> {
		self.calls.delete_pod.fetch_add(1, Ordering::SeqCst);
		let mut state = self.state.lock().unwrap();
		state
			.deleted
			.push((name.to_string(), namespace.to_string(), grace_period_seconds));
		match &state.delete_failure {
			Some(message) => Err(K8sError::ApiError {
				message: message.clone(),
			}),
			None => Ok(()),
		}
	}

	async fn watch_pod(
		&self,
		_name: &str,
		_namespace: &str,
		_resource_version: &str,
	) -> Result<PodWatchStream, K8sError> {
		self.calls.watch_opened.fetch_add(1, Ordering::SeqCst);
		let (events, ends) = {
			let mut state = self.state.lock().unwrap();
			(std::mem::take(&mut state.watch_events), state.watch_ends)
		};

		let replay = futures::stream::iter(events.into_iter().map(Ok::<_, K8sError>));
		let inner: PodWatchStream = if ends {
			Box::pin(replay)
		} else {
			Box::pin(replay.chain(futures::stream::pending()))
		};

		Ok(Box::pin(TrackedWatch {
			inner,
			calls: self.calls.clone(),
		}))
	}

	async fn exec(
		&self,
		_name: &str,
		_namespace: &str,
		_container: &str,
		_command: &[String],
	) -> Result<ExecProcess, K8sError> {
		self.calls.exec.fetch_add(1, Ordering::SeqCst);
		self
			.state
			.lock()
			.unwrap()
			.exec
			.take()
			.ok_or_else(|| K8sError::ExecError {
				message: "no exec process scripted".into(),
			})
	}
}

/// Counts the watch as closed when the stream is dropped.
struct TrackedWatch {
	inner: PodWatchStream,
	calls: Arc<MockCalls>,
}

impl Stream for TrackedWatch {
	type Item = Result<WatchEvent<Pod>, K8sError>;

	fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
		self.inner.as_mut().poll_next(cx)
	}
}

impl Drop for TrackedWatch {
	fn drop(&mut self) {
		self.calls.watch_closed.fetch_add(1, Ordering::SeqCst);
	}
}

/// Test-side ends of a scripted exec session.
pub struct RemoteEnd {
	/// Bytes the session wrote to the remote command's stdin.
	pub stdin: DuplexStream,
	/// Bytes written here appear on the session's stdout.
	pub stdout: DuplexStream,
	/// Resize requests forwarded by the session.
	pub resizes: mpsc::Receiver<TerminalSize>,
	status: Option<oneshot::Sender<ExecStatus>>,
}

impl RemoteEnd {
	/// Report the remote command as finished.
	pub fn finish(&mut self, status: ExecStatus) {
		if let Some(tx) = self.status.take() {
			let _ = tx.send(status);
		}
	}
}

/// Build an in-memory exec process and the handles a test drives it with.
pub fn scripted_exec() -> (ExecProcess, RemoteEnd) {
	let (session_stdin, remote_stdin) = tokio::io::duplex(4096);
	let (remote_stdout, session_stdout) = tokio::io::duplex(4096);
	let (resize_tx, resize_rx) = mpsc::channel(8);
	let (status_tx, status_rx) = oneshot::channel();

	let process = ExecProcess {
		stdin: Box::pin(session_stdin),
		stdout: Box::pin(session_stdout),
		stderr: None,
		resize: Some(resize_tx),
		status: Box::pin(async move { status_rx.await.unwrap_or(ExecStatus::Unknown) }),
	};
	let remote = RemoteEnd {
		stdin: remote_stdin,
		stdout: remote_stdout,
		resizes: resize_rx,
		status: Some(status_tx),
	};
	(process, remote)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::WorkloadKind;

	#[tokio::test]
	async fn watch_replays_events_and_counts_close() {
		let client = MockK8sClient::new()
			.with_watch_events(vec![
				MockK8sClient::modified("Pending"),
				MockK8sClient::modified("Running"),
			])
			.end_watch_after_events();

		let mut stream = client.watch_pod("dbg", "default", "1").await.unwrap();
		assert!(matches!(stream.next().await, Some(Ok(WatchEvent::Modified(_)))));
		assert!(matches!(stream.next().await, Some(Ok(WatchEvent::Modified(_)))));
		assert!(stream.next().await.is_none());
		assert_eq!(client.calls().watch_closed(), 0);

		drop(stream);
		assert_eq!(client.calls().watch_opened(), 1);
		assert_eq!(client.calls().watch_closed(), 1);
	}

	#[tokio::test]
	async fn missing_template_is_not_found() {
		let client = MockK8sClient::new();
		let workload = WorkloadReference::new("default", WorkloadKind::Job, "migrate");
		let err = client.pod_template(&workload).await.unwrap_err();
		assert!(err.is_not_found());
	}

	#[tokio::test]
	async fn create_assigns_resource_version() {
		let client = MockK8sClient::new();
		let created = client.create_pod("ns", pod_in_phase("Pending")).await.unwrap();
		assert_eq!(created.metadata.resource_version.as_deref(), Some("1"));
		assert_eq!(created.metadata.namespace.as_deref(), Some("ns"));
		assert_eq!(client.created_pods().len(), 1);
	}
}
