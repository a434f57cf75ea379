// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt::Debug;

use async_trait::async_trait;
use futures::StreamExt;
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{Pod, PodSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Status;
use k8s_openapi::NamespaceResourceScope;
use kube::{
	api::{Api, AttachParams, DeleteParams, PostParams, WatchParams},
	Client, Resource,
};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::client::K8sClient;
use crate::error::K8sError;
use crate::types::{ExecProcess, ExecStatus, PodWatchStream, WorkloadKind, WorkloadReference};

/// Production K8s client implementation using the kube crate.
pub struct KubeClient {
	client: Client,
}

impl KubeClient {
	/// Create a new KubeClient that auto-discovers cluster configuration.
	///
	/// This will attempt to load config from:
	/// 1. KUBECONFIG environment variable
	/// 2. ~/.kube/config
	/// 3. In-cluster service account (when running in K8s)
	pub async fn new() -> Result<Self, K8sError> {
		let client = Client::try_default().await?;
		debug!("K8s client initialized");
		Ok(Self { client })
	}

	/// Wrap an already configured kube client.
	pub fn from_client(client: Client) -> Self {
		Self { client }
	}

	async fn get_workload<K>(&self, workload: &WorkloadReference) -> Result<K, K8sError>
	where
		K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
		<K as Resource>::DynamicType: Default,
	{
		let api: Api<K> = Api::namespaced(self.client.clone(), &workload.namespace);
		match api.get(&workload.name).await {
			Ok(obj) => Ok(obj),
			Err(kube::Error::Api(err)) if err.code == 404 => Err(K8sError::WorkloadNotFound {
				kind: workload.kind,
				namespace: workload.namespace.clone(),
				name: workload.name.clone(),
			}),
			Err(e) => Err(e.into()),
		}
	}

	async fn deployment_template(&self, workload: &WorkloadReference) -> Result<Option<PodSpec>, K8sError> {
		let deployment: Deployment = self.get_workload(workload).await?;
		Ok(deployment.spec.and_then(|spec| spec.template.spec))
	}

	async fn job_template(&self, workload: &WorkloadReference) -> Result<Option<PodSpec>, K8sError> {
		let job: Job = self.get_workload(workload).await?;
		Ok(job.spec.and_then(|spec| spec.template.spec))
	}

	async fn cronjob_template(&self, workload: &WorkloadReference) -> Result<Option<PodSpec>, K8sError> {
		let cronjob: CronJob = self.get_workload(workload).await?;
		Ok(cronjob
			.spec
			.and_then(|spec| spec.job_template.spec)
			.and_then(|job| job.template.spec))
	}

	async fn statefulset_template(
		&self,
		workload: &WorkloadReference,
	) -> Result<Option<PodSpec>, K8sError> {
		let statefulset: StatefulSet = self.get_workload(workload).await?;
		Ok(statefulset.spec.and_then(|spec| spec.template.spec))
	}
}

#[async_trait]
impl K8sClient for KubeClient {
	#[instrument(skip(self), fields(workload = %workload, namespace = %workload.namespace))]
	async fn pod_template(&self, workload: &WorkloadReference) -> Result<PodSpec, K8sError> {
		let template = match workload.kind {
			WorkloadKind::Deployment => self.deployment_template(workload).await?,
			WorkloadKind::Job => self.job_template(workload).await?,
			WorkloadKind::CronJob => self.cronjob_template(workload).await?,
			WorkloadKind::StatefulSet => self.statefulset_template(workload).await?,
		};

		template.ok_or_else(|| K8sError::MissingTemplate {
			kind: workload.kind,
			namespace: workload.namespace.clone(),
			name: workload.name.clone(),
		})
	}

	async fn create_pod(&self, namespace: &str, pod: Pod) -> Result<Pod, K8sError> {
		let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
		match pods.create(&PostParams::default(), &pod).await {
			Ok(pod) => Ok(pod),
			Err(kube::Error::Api(err)) if (400..500).contains(&err.code) => Err(K8sError::Rejected {
				code: err.code,
				message: err.message,
			}),
			Err(e) => Err(e.into()),
		}
	}

	async fn delete_pod(
		&self,
		name: &str,
		namespace: &str,
		grace_period_seconds: u32,
	) -> Result<(), K8sError> {
		let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
		let dp = DeleteParams {
			grace_period_seconds: Some(grace_period_seconds),
			..Default::default()
		};
		match pods.delete(name, &dp).await {
			Ok(_) => Ok(()),
			Err(kube::Error::Api(err)) if err.code == 404 => {
				Err(K8sError::PodNotFound { name: name.into() })
			}
			Err(e) => Err(e.into()),
		}
	}

	async fn watch_pod(
		&self,
		name: &str,
		namespace: &str,
		resource_version: &str,
	) -> Result<PodWatchStream, K8sError> {
		let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
		let wp = WatchParams::default()
			.fields(&format!("metadata.name={name}"))
			.disable_bookmarks();

		let stream = pods
			.watch(&wp, resource_version)
			.await
			.map_err(|e| K8sError::WatchError {
				message: e.to_string(),
			})?;

		let mapped = stream.map(|event| {
			event.map_err(|e| K8sError::WatchError {
				message: e.to_string(),
			})
		});
		Ok(Box::pin(mapped))
	}

	async fn exec(
		&self,
		name: &str,
		namespace: &str,
		container: &str,
		command: &[String],
	) -> Result<ExecProcess, K8sError> {
		let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
		let ap = AttachParams::interactive_tty().container(container);

		let mut attached = pods
			.exec(name, command.to_vec(), &ap)
			.await
			.map_err(|e| match e {
				kube::Error::Api(ref err) if err.code == 404 => K8sError::PodNotFound { name: name.into() },
				_ => K8sError::ExecError {
					message: e.to_string(),
				},
			})?;

		let stdin = attached.stdin().ok_or_else(|| K8sError::ExecError {
			message: "stdin not available".into(),
		})?;
		let stdout = attached.stdout().ok_or_else(|| K8sError::ExecError {
			message: "stdout not available".into(),
		})?;
		let stderr = attached
			.stderr()
			.map(|s| Box::pin(s) as std::pin::Pin<Box<dyn tokio::io::AsyncRead + Send>>);
		let resize = attached.terminal_size();
		let status = attached.take_status().ok_or_else(|| K8sError::ExecError {
			message: "status channel not available".into(),
		})?;

		let status = Box::pin(async move {
			let status = status.await;
			// The process handle owns the websocket task; keep it until the
			// command has reported back.
			drop(attached);
			exec_status(status)
		});

		Ok(ExecProcess {
			stdin: Box::pin(stdin),
			stdout: Box::pin(stdout),
			stderr,
			resize,
			status,
		})
	}
}

/// Map the exec status object onto an exit code where the server provides one.
fn exec_status(status: Option<Status>) -> ExecStatus {
	let Some(status) = status else {
		return ExecStatus::Unknown;
	};

	if status.status.as_deref() == Some("Success") {
		return ExecStatus::Exited(0);
	}

	if status.reason.as_deref() == Some("NonZeroExitCode") {
		let code = status
			.details
			.as_ref()
			.and_then(|details| details.causes.as_ref())
			.and_then(|causes| {
				causes
					.iter()
					.find(|cause| cause.reason.as_deref() == Some("ExitCode"))
			})
			.and_then(|cause| cause.message.as_deref())
			.and_then(|message| message.parse::<i32>().ok());
		if let Some(code) = code {
			return ExecStatus::Exited(code);
		}
	}

	ExecStatus::Failed {
		message: status
			.message
			.unwrap_or_else(|| "remote command failed".to_string()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use k8s_openapi::apimachinery::pkg::apis::meta::v1::{StatusCause, StatusDetails};

	#[test]
	fn exec_status_success() {
		let status = Status {
			status: Some("Success".to_string()),
			..Default::default()
		};
		assert_eq!(exec_status(Some(status)), ExecStatus::Exited(0));
	}

	#[test]
	fn exec_status_extracts_exit_code() {
		let status = Status {
			status: Some("Failure".to_string()),
			reason: Some("NonZeroExitCode".to_string()),
			message: Some("command terminated with non-zero exit code".to_string()),
			details: Some(StatusDetails {
				causes: Some(vec![StatusCause {
					reason: Some("ExitCode".to_string()),
					message: Some("42".to_string()),
					field: None,
				}]),
				..Default::default()
			}),
			..Default::default()
		};
		assert_eq!(exec_status(Some(status)), ExecStatus::Exited(42));
	}

	#[test]
	fn exec_status_failure_without_code() {
		let status = Status {
			status: Some("Failure".to_string()),
			message: Some("container not found".to_string()),
			..Default::default()
		};
		assert_eq!(
			exec_status(Some(status)),
			ExecStatus::Failed {
				message: "container not found".to_string()
			}
		);
	}

	#[test]
	fn exec_status_missing() {
		assert_eq!(exec_status(None), ExecStatus::Unknown);
	}
}
