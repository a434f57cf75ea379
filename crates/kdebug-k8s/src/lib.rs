// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! K8s client abstraction for kdebug.
//!
//! This crate provides:
//! - A trait-based K8s client abstraction for testability
//! - Production implementation using the kube crate
//! - A scripted mock client for driving sessions in tests

mod client;
mod error;
mod kube_client;
mod mock;
mod types;

pub use client::K8sClient;
pub use error::{K8sError, K8sResult};
pub use kube_client::KubeClient;
pub use mock::{pod_in_phase, scripted_exec, MockCalls, MockK8sClient, RemoteEnd};
pub use types::{
	Container, ExecProcess, ExecStatus, ObjectMeta, ParseWorkloadKindError, Pod, PodSpec,
	PodStatus, PodWatchStream, Probe, TerminalSize, Volume, WatchEvent, WorkloadKind,
	WorkloadReference,
};
