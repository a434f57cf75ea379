// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Debug pod lifecycle for kdebug.
//!
//! A session copies a workload's pod template into a short-lived debug pod,
//! waits for it to run, attaches an interactive shell with the local
//! terminal in raw mode, and removes the pod when the shell ends.

mod attach;
mod config;
mod error;
mod resize;
mod scheduler;
mod session;
mod terminal;
mod transform;
mod types;

pub use attach::ExecAttacher;
pub use config::{SessionConfig, DEFAULT_READY_TIMEOUT};
pub use error::{SessionError, SessionErrorClass, TeardownReport, TeardownWarning, TransformError};
pub use resize::{ResizeMonitor, DEFAULT_RESIZE_INTERVAL};
pub use scheduler::Scheduler;
pub use session::{DebugSession, SessionOutcome};
pub use terminal::{CrosstermTerminal, FakeTerminal, RawModeGuard, Terminal, TerminalStreams};
pub use transform::{transform, DebugPodSpec, MANAGED_LABEL, SOURCE_LABEL};
pub use types::{PodHandle, SessionPhase, SessionRequest, TerminalDimensions};
