// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use thiserror::Error;

use crate::types::WorkloadKind;

/// Result type alias for K8s operations.
pub type K8sResult<T> = Result<T, K8sError>;

/// Errors that can occur during K8s operations.
#[derive(Error, Debug)]
pub enum K8sError {
	#[error("K8s API error: {message}")]
	ApiError { message: String },

	#[error("{kind} not found: {namespace}/{name}")]
	WorkloadNotFound {
		kind: WorkloadKind,
		namespace: String,
		name: String,
	},

	#[error("{kind} {namespace}/{name} has no pod template")]
	MissingTemplate {
		kind: WorkloadKind,
		namespace: String,
		name: String,
	},

	#[error("Forbidden: {message}")]
	Forbidden { message: String },

	#[error("Pod not found: {name}")]
	PodNotFound { name: String },

	#[error("Request rejected ({code}): {message}")]
	Rejected { code: u16, message: String },

	#[error("Watch error: {message}")]
	WatchError { message: String },

	#[error("Exec error: {message}")]
	ExecError { message: String },
}

impl From<kube::Error> for K8sError {
	fn from(err: kube::Error) -> Self {
		match err {
			kube::Error::Api(resp) if resp.code == 403 => K8sError::Forbidden {
				message: resp.message,
			},
			err => K8sError::ApiError {
				message: err.to_string(),
			},
		}
	}
}

impl K8sError {
	/// Whether the error means the requested object does not exist.
	pub fn is_not_found(&self) -> bool {
		matches!(
			self,
			K8sError::WorkloadNotFound { .. } | K8sError::PodNotFound { .. }
		)
	}
}
