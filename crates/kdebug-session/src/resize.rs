// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Terminal size monitor feeding resize events to the exec stream.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::terminal::Terminal;
use crate::types::TerminalDimensions;

/// Room for the initial sample plus one update, so the first size is queued
/// before the stream starts consuming.
const QUEUE_CAPACITY: usize = 2;

/// Default interval between terminal size samples.
pub const DEFAULT_RESIZE_INTERVAL: Duration = Duration::from_secs(5);

/// Background task that samples the local terminal size.
///
/// The current size is queued on start, then re-sampled every interval until
/// cancelled. Cancellation is observed while waiting for the next sample and
/// while blocked on a full queue. Once the task exits the queue closes and
/// [`ResizeMonitor::next`] returns `None`.
pub struct ResizeMonitor {
	rx: mpsc::Receiver<TerminalDimensions>,
	cancel: CancellationToken,
	task: Option<JoinHandle<()>>,
}

impl ResizeMonitor {
	pub fn start(terminal: Arc<dyn Terminal>, interval: Duration) -> Self {
		let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
		let cancel = CancellationToken::new();

		match terminal.size() {
			Ok(dims) => {
				let _ = tx.try_send(dims);
			}
			Err(e) => tracing::warn!(error = %e, "Could not read terminal size"),
		}

		let token = cancel.clone();
		let task = tokio::spawn(async move {
			loop {
				tokio::select! {
					_ = token.cancelled() => break,
					_ = tokio::time::sleep(interval) => {}
				}

				let dims = match terminal.size() {
					Ok(dims) => dims,
					Err(e) => {
						tracing::warn!(error = %e, "Could not read terminal size");
						continue;
					}
				};

				tokio::select! {
					_ = token.cancelled() => break,
					sent = tx.send(dims) => {
						if sent.is_err() {
							break;
						}
					}
				}
			}
			tracing::debug!("Stopping resize monitor");
		});

		Self {
			rx,
			cancel,
			task: Some(task),
		}
	}

	/// Next sampled size, or `None` once the monitor has stopped.
	pub async fn next(&mut self) -> Option<TerminalDimensions> {
		self.rx.recv().await
	}

	/// Ask the monitor to stop without waiting for it.
	pub fn cancel(&self) {
		self.cancel.cancel();
	}

	/// Stop the monitor and wait for its task to exit.
	pub async fn stop(&mut self) {
		self.cancel.cancel();
		if let Some(task) = self.task.take() {
			if let Err(e) = task.await {
				tracing::warn!(error = %e, "Resize monitor task failed");
			}
		}
	}
}

impl Drop for ResizeMonitor {
	fn drop(&mut self) {
		self.cancel.cancel();
	}
}
