// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session orchestration: resolve, derive, schedule, attach, clean up.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;

use futures::FutureExt;
use kdebug_k8s::{K8sClient, Pod};

use crate::attach::ExecAttacher;
use crate::config::SessionConfig;
use crate::error::{SessionError, TeardownReport};
use crate::resize::ResizeMonitor;
use crate::scheduler::Scheduler;
use crate::terminal::{Terminal, TerminalStreams};
use crate::transform::transform;
use crate::types::{PodHandle, SessionPhase, SessionRequest};

/// How a session ended.
#[derive(Debug)]
pub struct SessionOutcome {
	/// The primary result. Teardown problems never replace it.
	pub result: Result<(), SessionError>,
	/// Cleanup steps that failed.
	pub teardown: TeardownReport,
	/// Last phase of the debug pod. `Terminated` once the pod was removed,
	/// `Pending` when no pod was ever created.
	pub phase: SessionPhase,
}

/// Runs one debug session against a cluster.
pub struct DebugSession {
	client: Arc<dyn K8sClient>,
	terminal: Arc<dyn Terminal>,
	config: SessionConfig,
}

impl DebugSession {
	pub fn new(client: Arc<dyn K8sClient>, terminal: Arc<dyn Terminal>, config: SessionConfig) -> Self {
		Self {
			client,
			terminal,
			config,
		}
	}

	/// Run the session to completion.
	///
	/// `interrupt` resolving aborts the session with
	/// [`SessionError::Interrupted`]. Once the pod has been created it is
	/// deleted exactly once, whatever the outcome, after the resize monitor
	/// has stopped and the terminal has been restored.
	pub async fn run<F>(
		&self,
		request: &SessionRequest,
		streams: &mut TerminalStreams,
		interrupt: F,
	) -> SessionOutcome
	where
		F: Future<Output = ()>,
	{
		tokio::pin!(interrupt);
		let mut teardown = TeardownReport::new();
		let scheduler = Scheduler::new(self.client.clone());

		let prepared = tokio::select! {
			prepared = self.prepare(request) => prepared,
			_ = &mut interrupt => Err(SessionError::Interrupted),
		};
		let (pod, target_container) = match prepared {
			Ok(prepared) => prepared,
			Err(e) => return not_started(e, teardown),
		};

		let handle = match scheduler.create(pod, &target_container).await {
			Ok(handle) => handle,
			Err(e) => return not_started(e, teardown),
		};

		let mut phase = SessionPhase::Pending;
		let driven = AssertUnwindSafe(self.drive(
			&scheduler,
			&handle,
			request,
			streams,
			interrupt.as_mut(),
			&mut phase,
			&mut teardown,
		))
		.catch_unwind()
		.await;

		tracing::debug!(pod_name = %handle.name, phase = %phase, "Session finished");
		if let Err(warning) = scheduler.terminate(&handle).await {
			teardown.push(warning);
		}
		phase = SessionPhase::Terminated;

		match driven {
			Ok(result) => SessionOutcome {
				result,
				teardown,
				phase,
			},
			Err(panic) => std::panic::resume_unwind(panic),
		}
	}

	/// Resolve the workload and derive the debug pod from its template.
	async fn prepare(&self, request: &SessionRequest) -> Result<(Pod, String), SessionError> {
		let workload = &request.workload;
		tracing::info!(
			kind = %workload.kind,
			name = %workload.name,
			namespace = %workload.namespace,
			"Fetching {} in namespace {}...",
			workload,
			workload.namespace
		);
		let template = self
			.client
			.pod_template(workload)
			.await
			.map_err(SessionError::Resolution)?;

		tracing::info!("Generating spec...");
		let mut debug = transform(&template, request.container.as_deref(), &request.entrypoint)?;
		if let Some(image) = &request.image {
			debug = debug.with_image(image);
		}
		let target = debug.target_container.clone();
		tracing::debug!(container = %target, "Selected target container");

		Ok((
			debug.into_pod(&request.pod_name, &workload.namespace, workload),
			target,
		))
	}

	#[allow(clippy::too_many_arguments)]
	async fn drive<F>(
		&self,
		scheduler: &Scheduler,
		handle: &PodHandle,
		request: &SessionRequest,
		streams: &mut TerminalStreams,
		mut interrupt: Pin<&mut F>,
		phase: &mut SessionPhase,
		teardown: &mut TeardownReport,
	) -> Result<(), SessionError>
	where
		F: Future<Output = ()>,
	{
		tracing::info!(pod_name = %handle.name, "Waiting for pod to start...");
		let ready = tokio::select! {
			ready = scheduler.await_ready(handle, self.config.ready_timeout) => ready,
			_ = &mut interrupt => Err(SessionError::Interrupted),
		};
		match ready {
			Ok(()) => *phase = SessionPhase::Running,
			Err(e @ SessionError::PodStartFailed { .. }) => {
				*phase = SessionPhase::Failed;
				return Err(e);
			}
			Err(e) => return Err(e),
		}

		let monitor = ResizeMonitor::start(self.terminal.clone(), self.config.resize_interval);
		let attacher = ExecAttacher::new(self.client.clone(), self.terminal.clone());

		tracing::info!(pod_name = %handle.name, container = %handle.target_container, "Spawning shell...");
		attacher
			.attach(
				handle,
				&handle.target_container,
				&request.command,
				streams,
				monitor,
				teardown,
				interrupt,
			)
			.await
	}
}

fn not_started(error: SessionError, teardown: TeardownReport) -> SessionOutcome {
	SessionOutcome {
		result: Err(error),
		teardown,
		phase: SessionPhase::Pending,
	}
}
