// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Interactive exec into the debug container.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::SinkExt;
use kdebug_k8s::{ExecProcess, ExecStatus, K8sClient};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{SessionError, TeardownReport, TeardownWarning};
use crate::resize::ResizeMonitor;
use crate::terminal::{RawModeGuard, Terminal, TerminalStreams};
use crate::types::PodHandle;

const BUFFER_SIZE: usize = 8192;
/// How long to keep copying output after the remote command has exited.
const DRAIN_TIMEOUT: Duration = Duration::from_millis(250);

enum StreamEnd {
	Exited(ExecStatus),
	InputClosed,
}

/// Runs an interactive command in a container with the local terminal
/// attached in raw mode.
pub struct ExecAttacher {
	client: Arc<dyn K8sClient>,
	terminal: Arc<dyn Terminal>,
}

impl ExecAttacher {
	pub fn new(client: Arc<dyn K8sClient>, terminal: Arc<dyn Terminal>) -> Self {
		Self { client, terminal }
	}

	/// Stream `command` in `container` until the remote command exits, the
	/// channel fails or local input ends.
	///
	/// `interrupt` resolving ends the stream with [`SessionError::Interrupted`].
	///
	/// The resize monitor is stopped and raw mode is restored before this
	/// returns, on every path including an interrupt. A failed restore is
	/// recorded in `teardown`.
	#[allow(clippy::too_many_arguments)]
	pub async fn attach<I>(
		&self,
		handle: &PodHandle,
		container: &str,
		command: &[String],
		streams: &mut TerminalStreams,
		resize: ResizeMonitor,
		teardown: &mut TeardownReport,
		interrupt: I,
	) -> Result<(), SessionError>
	where
		I: Future<Output = ()>,
	{
		tokio::pin!(interrupt);

		let process = tokio::select! {
			process = self.client.exec(&handle.name, &handle.namespace, container, command) => {
				process.map_err(|e| SessionError::Stream {
					message: e.to_string(),
				})?
			}
			_ = &mut interrupt => return Err(SessionError::Interrupted),
		};

		let guard = RawModeGuard::acquire(self.terminal.clone()).map_err(SessionError::Terminal)?;
		// Declared after the guard so a dropped attach stops the monitor first.
		let mut resize = resize;
		let result = pump(process, streams, &mut resize, interrupt.as_mut()).await;

		resize.stop().await;
		if let Err(e) = guard.release() {
			tracing::warn!(
				error = %e,
				"Failed to restore terminal settings. Use the reset command to fix."
			);
			teardown.push(TeardownWarning::TerminalRestore(e));
		}

		match result? {
			StreamEnd::Exited(ExecStatus::Exited(0)) | StreamEnd::InputClosed => Ok(()),
			StreamEnd::Exited(ExecStatus::Exited(code)) => Err(SessionError::RemoteExit { code }),
			StreamEnd::Exited(ExecStatus::Failed { message }) => Err(SessionError::Stream { message }),
			StreamEnd::Exited(ExecStatus::Unknown) => {
				tracing::debug!("exec channel closed without a status");
				Ok(())
			}
		}
	}
}

async fn pump<I>(
	mut process: ExecProcess,
	streams: &mut TerminalStreams,
	resize: &mut ResizeMonitor,
	mut interrupt: Pin<&mut I>,
) -> Result<StreamEnd, SessionError>
where
	I: Future<Output = ()>,
{
	let mut input = vec![0u8; BUFFER_SIZE];
	let mut output = vec![0u8; BUFFER_SIZE];
	let mut errors = vec![0u8; BUFFER_SIZE];
	let mut stderr_open = process.stderr.is_some();
	let mut resize_open = true;

	loop {
		tokio::select! {
			_ = &mut interrupt => return Err(SessionError::Interrupted),
			status = &mut process.status => {
				drain(&mut process.stdout, &mut streams.stdout, &mut output).await;
				return Ok(StreamEnd::Exited(status));
			}
			read = process.stdout.read(&mut output) => match read.map_err(stream_error)? {
				0 => return Ok(StreamEnd::Exited((&mut process.status).await)),
				n => copy_out(&mut streams.stdout, &output[..n]).await?,
			},
			read = read_optional(process.stderr.as_mut(), &mut errors), if stderr_open => {
				match read.map_err(stream_error)? {
					0 => stderr_open = false,
					n => copy_out(&mut streams.stderr, &errors[..n]).await?,
				}
			}
			read = streams.stdin.read(&mut input) => match read.map_err(stream_error)? {
				0 => {
					let _ = process.stdin.shutdown().await;
					return Ok(StreamEnd::InputClosed);
				}
				n => {
					process.stdin.write_all(&input[..n]).await.map_err(stream_error)?;
					process.stdin.flush().await.map_err(stream_error)?;
				}
			},
			size = resize.next(), if resize_open => match size {
				Some(dims) => {
					if let Some(sink) = process.resize.as_mut() {
						if let Err(e) = sink.send(dims.into()).await {
							tracing::debug!(error = %e, "resize channel closed");
							resize_open = false;
						}
					}
				}
				None => resize_open = false,
			},
		}
	}
}

async fn read_optional(
	reader: Option<&mut Pin<Box<dyn AsyncRead + Send>>>,
	buf: &mut [u8],
) -> io::Result<usize> {
	match reader {
		Some(reader) => reader.read(buf).await,
		None => std::future::pending().await,
	}
}

async fn copy_out(
	writer: &mut Pin<Box<dyn AsyncWrite + Send>>,
	bytes: &[u8],
) -> Result<(), SessionError> {
	writer.write_all(bytes).await.map_err(stream_error)?;
	writer.flush().await.map_err(stream_error)
}

/// Copy whatever output is still buffered after the command exited.
async fn drain(
	from: &mut Pin<Box<dyn AsyncRead + Send>>,
	to: &mut Pin<Box<dyn AsyncWrite + Send>>,
	buf: &mut [u8],
) {
	let copy = async {
		loop {
			match from.read(buf).await {
				Ok(0) | Err(_) => break,
				Ok(n) => {
					if to.write_all(&buf[..n]).await.is_err() {
						break;
					}
				}
			}
		}
		let _ = to.flush().await;
	};
	let _ = tokio::time::timeout(DRAIN_TIMEOUT, copy).await;
}

fn stream_error(e: io::Error) -> SessionError {
	SessionError::Stream {
		message: e.to_string(),
	}
}
