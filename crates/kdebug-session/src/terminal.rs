// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Local terminal access: size queries and raw mode.

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncRead, AsyncWrite};

use crate::types::TerminalDimensions;

/// The local terminal a session attaches to.
pub trait Terminal: Send + Sync {
	fn size(&self) -> io::Result<TerminalDimensions>;
	fn enable_raw_mode(&self) -> io::Result<()>;
	fn disable_raw_mode(&self) -> io::Result<()>;
}

/// The process's controlling terminal, driven through crossterm.
#[derive(Debug, Default, Clone, Copy)]
pub struct CrosstermTerminal;

impl Terminal for CrosstermTerminal {
	fn size(&self) -> io::Result<TerminalDimensions> {
		let (columns, rows) = crossterm::terminal::size()?;
		Ok(TerminalDimensions { columns, rows })
	}

	fn enable_raw_mode(&self) -> io::Result<()> {
		crossterm::terminal::enable_raw_mode()
	}

	fn disable_raw_mode(&self) -> io::Result<()> {
		crossterm::terminal::disable_raw_mode()
	}
}

/// Keeps the terminal in raw mode until released or dropped.
pub struct RawModeGuard {
	terminal: Arc<dyn Terminal>,
	active: bool,
}

impl RawModeGuard {
	pub fn acquire(terminal: Arc<dyn Terminal>) -> io::Result<Self> {
		terminal.enable_raw_mode()?;
		Ok(Self {
			terminal,
			active: true,
		})
	}

	/// Restore the terminal, returning the failure instead of logging it.
	pub fn release(mut self) -> io::Result<()> {
		self.active = false;
		self.terminal.disable_raw_mode()
	}
}

impl Drop for RawModeGuard {
	fn drop(&mut self) {
		if self.active {
			if let Err(e) = self.terminal.disable_raw_mode() {
				tracing::warn!(
					error = %e,
					"Failed to restore terminal settings. Use the reset command to fix."
				);
			}
		}
	}
}

/// Local byte streams the remote shell is wired to.
pub struct TerminalStreams {
	pub stdin: Pin<Box<dyn AsyncRead + Send>>,
	pub stdout: Pin<Box<dyn AsyncWrite + Send>>,
	pub stderr: Pin<Box<dyn AsyncWrite + Send>>,
}

impl TerminalStreams {
	/// The process's own stdin, stdout and stderr.
	pub fn stdio() -> Self {
		Self {
			stdin: Box::pin(tokio::io::stdin()),
			stdout: Box::pin(tokio::io::stdout()),
			stderr: Box::pin(tokio::io::stderr()),
		}
	}
}

/// An in-memory terminal for tests.
#[derive(Debug)]
pub struct FakeTerminal {
	size: Mutex<TerminalDimensions>,
	raw: AtomicBool,
	enabled: AtomicUsize,
	restored: AtomicUsize,
	fail_restore: AtomicBool,
}

impl FakeTerminal {
	pub fn new(columns: u16, rows: u16) -> Self {
		Self {
			size: Mutex::new(TerminalDimensions { columns, rows }),
			raw: AtomicBool::new(false),
			enabled: AtomicUsize::new(0),
			restored: AtomicUsize::new(0),
			fail_restore: AtomicBool::new(false),
		}
	}

	/// Make every later `disable_raw_mode` call fail.
	pub fn failing_restore(self) -> Self {
		self.fail_restore.store(true, Ordering::SeqCst);
		self
	}

	pub fn resize(&self, columns: u16, rows: u16) {
		if let Ok(mut size) = self.size.lock() {
			*size = TerminalDimensions { columns, rows };
		}
	}

	pub fn is_raw(&self) -> bool {
		self.raw.load(Ordering::SeqCst)
	}

	pub fn raw_mode_enabled(&self) -> usize {
		self.enabled.load(Ordering::SeqCst)
	}

	pub fn raw_mode_restored(&self) -> usize {
		self.restored.load(Ordering::SeqCst)
	}
}

impl Terminal for FakeTerminal {
	fn size(&self) -> io::Result<TerminalDimensions> {
		self.size
			.lock()
			.map(|size| *size)
			.map_err(|_| io::Error::other("terminal size lock poisoned"))
	}

	fn enable_raw_mode(&self) -> io::Result<()> {
		self.raw.store(true, Ordering::SeqCst);
		self.enabled.fetch_add(1, Ordering::SeqCst);
		Ok(())
	}

	fn disable_raw_mode(&self) -> io::Result<()> {
		self.restored.fetch_add(1, Ordering::SeqCst);
		if self.fail_restore.load(Ordering::SeqCst) {
			return Err(io::Error::other("terminal restore failed"));
		}
		self.raw.store(false, Ordering::SeqCst);
		Ok(())
	}
}
