// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::time::Duration;

use crate::resize::DEFAULT_RESIZE_INTERVAL;

/// Default upper bound on how long the debug pod may take to start.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(300);

/// Tunables for a debug session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
	/// Deadline for the pod to reach Running. `None` waits indefinitely.
	pub ready_timeout: Option<Duration>,
	/// Interval between terminal size samples.
	pub resize_interval: Duration,
}

impl Default for SessionConfig {
	fn default() -> Self {
		Self {
			ready_timeout: Some(DEFAULT_READY_TIMEOUT),
			resize_interval: DEFAULT_RESIZE_INTERVAL,
		}
	}
}
