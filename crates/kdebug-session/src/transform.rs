// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Derivation of a debug pod spec from a workload's pod template.

use std::collections::BTreeMap;

use kdebug_k8s::{ObjectMeta, Pod, PodSpec, WorkloadReference};

use crate::error::TransformError;

pub const MANAGED_LABEL: &str = "kdebug.dev/managed";
pub const SOURCE_LABEL: &str = "kdebug.dev/source";
const RESTART_POLICY_NEVER: &str = "Never";
const MAX_LABEL_LENGTH: usize = 63;

/// A pod spec ready to be scheduled as a debug pod.
#[derive(Debug, Clone, PartialEq)]
pub struct DebugPodSpec {
	pub spec: PodSpec,
	/// Name of the container whose command was replaced.
	pub target_container: String,
}

/// Derive a debug pod spec from `template`.
///
/// The target is the container named by `selector`, or the first container
/// when no selector (or an empty one) is given. Only the target is changed:
/// its command becomes `entrypoint`, its args and probes are cleared. The
/// pod never restarts and terminates without a grace period.
pub fn transform(
	template: &PodSpec,
	selector: Option<&str>,
	entrypoint: &[String],
) -> Result<DebugPodSpec, TransformError> {
	if entrypoint.is_empty() {
		return Err(TransformError::EmptyEntrypoint);
	}

	let mut spec = template.clone();
	let index = match selector.filter(|s| !s.is_empty()) {
		Some(selector) => spec
			.containers
			.iter()
			.position(|c| c.name == selector)
			.ok_or_else(|| TransformError::ContainerNotFound {
				selector: selector.to_string(),
			})?,
		None if spec.containers.is_empty() => return Err(TransformError::NoContainers),
		None => 0,
	};

	spec.restart_policy = Some(RESTART_POLICY_NEVER.to_string());
	spec.termination_grace_period_seconds = Some(0);

	let target = &mut spec.containers[index];
	target.command = Some(entrypoint.to_vec());
	target.args = None;
	target.readiness_probe = None;
	target.liveness_probe = None;
	target.startup_probe = None;

	let target_container = target.name.clone();
	Ok(DebugPodSpec {
		spec,
		target_container,
	})
}

impl DebugPodSpec {
	/// Run the target container from a different image.
	pub fn with_image(mut self, image: &str) -> Self {
		if let Some(target) = self
			.spec
			.containers
			.iter_mut()
			.find(|c| c.name == self.target_container)
		{
			target.image = Some(image.to_string());
		}
		self
	}

	/// Wrap the spec into a pod labelled as a kdebug pod for `workload`.
	pub fn into_pod(self, name: &str, namespace: &str, workload: &WorkloadReference) -> Pod {
		let mut labels = BTreeMap::new();
		labels.insert(MANAGED_LABEL.to_string(), "true".to_string());
		labels.insert(
			SOURCE_LABEL.to_string(),
			sanitize_label_value(&format!("{}-{}", workload.kind, workload.name)),
		);

		Pod {
			metadata: ObjectMeta {
				name: Some(name.to_string()),
				namespace: Some(namespace.to_string()),
				labels: Some(labels),
				..Default::default()
			},
			spec: Some(self.spec),
			status: None,
		}
	}
}

/// Sanitize a string to be a valid Kubernetes label value: at most 63
/// characters of `[A-Za-z0-9._-]`, starting and ending alphanumeric.
fn sanitize_label_value(value: &str) -> String {
	let sanitized: String = value
		.chars()
		.map(|c| {
			if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
				c
			} else {
				'_'
			}
		})
		.collect();

	let trimmed = sanitized
		.trim_start_matches(|c: char| !c.is_ascii_alphanumeric())
		.trim_end_matches(|c: char| !c.is_ascii_alphanumeric());

	if trimmed.len() > MAX_LABEL_LENGTH {
		trimmed[..MAX_LABEL_LENGTH]
			.trim_end_matches(|c: char| !c.is_ascii_alphanumeric())
			.to_string()
	} else {
		trimmed.to_string()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use kdebug_k8s::{Container, Probe, Volume, WorkloadKind};
	use proptest::prelude::*;

	fn container(name: &str) -> Container {
		Container {
			name: name.to_string(),
			image: Some(format!("registry.local/{name}:1.0")),
			command: Some(vec![format!("/usr/bin/{name}")]),
			args: Some(vec!["--port".to_string(), "8080".to_string()]),
			readiness_probe: Some(Probe::default()),
			liveness_probe: Some(Probe::default()),
			startup_probe: Some(Probe::default()),
			..Default::default()
		}
	}

	fn template(names: &[&str]) -> PodSpec {
		PodSpec {
			containers: names.iter().map(|n| container(n)).collect(),
			restart_policy: Some("Always".to_string()),
			termination_grace_period_seconds: Some(30),
			volumes: Some(vec![Volume {
				name: "data".to_string(),
				..Default::default()
			}]),
			..Default::default()
		}
	}

	fn entry(args: &[&str]) -> Vec<String> {
		args.iter().map(|s| s.to_string()).collect()
	}

	fn is_valid_k8s_label_value(s: &str) -> bool {
		if s.is_empty() {
			return true;
		}
		s.len() <= MAX_LABEL_LENGTH
			&& s.starts_with(|c: char| c.is_ascii_alphanumeric())
			&& s.ends_with(|c: char| c.is_ascii_alphanumeric())
			&& s
				.chars()
				.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
	}

	#[test]
	fn selector_mutates_only_the_selected_container() {
		let input = template(&["app", "sidecar"]);
		let debug = transform(&input, Some("sidecar"), &entry(&["/bin/sh"])).unwrap();

		assert_eq!(debug.target_container, "sidecar");
		let app = &debug.spec.containers[0];
		assert_eq!(app, &input.containers[0]);

		let sidecar = &debug.spec.containers[1];
		assert_eq!(sidecar.command, Some(entry(&["/bin/sh"])));
		assert_eq!(sidecar.args, None);
		assert!(sidecar.readiness_probe.is_none());
		assert!(sidecar.liveness_probe.is_none());
		assert!(sidecar.startup_probe.is_none());
		assert_eq!(sidecar.image, input.containers[1].image);
	}

	#[test]
	fn no_selector_targets_first_container() {
		let input = template(&["app", "sidecar"]);
		let debug = transform(&input, None, &entry(&["/bin/sleep", "1800"])).unwrap();
		assert_eq!(debug.target_container, "app");
		assert_eq!(debug.spec.containers[1], input.containers[1]);

		let debug = transform(&input, Some(""), &entry(&["/bin/sleep", "1800"])).unwrap();
		assert_eq!(debug.target_container, "app");
	}

	#[test]
	fn pod_level_fields_are_forced() {
		let input = template(&["app"]);
		let debug = transform(&input, None, &entry(&["/bin/sh"])).unwrap();
		assert_eq!(debug.spec.restart_policy.as_deref(), Some("Never"));
		assert_eq!(debug.spec.termination_grace_period_seconds, Some(0));
		assert_eq!(debug.spec.volumes, input.volumes);
	}

	#[test]
	fn template_is_left_untouched() {
		let input = template(&["app"]);
		let before = input.clone();
		let _ = transform(&input, Some("app"), &entry(&["/bin/sh"])).unwrap();
		assert_eq!(input, before);
	}

	#[test]
	fn unknown_selector_fails() {
		let input = template(&["app", "sidecar"]);
		let err = transform(&input, Some("db"), &entry(&["/bin/sh"])).unwrap_err();
		assert_eq!(
			err,
			TransformError::ContainerNotFound {
				selector: "db".to_string()
			}
		);
	}

	#[test]
	fn empty_template_and_entrypoint_fail() {
		let err = transform(&PodSpec::default(), None, &entry(&["/bin/sh"])).unwrap_err();
		assert_eq!(err, TransformError::NoContainers);

		let err = transform(&template(&["app"]), None, &[]).unwrap_err();
		assert_eq!(err, TransformError::EmptyEntrypoint);
	}

	#[test]
	fn image_override_applies_to_target() {
		let input = template(&["app", "sidecar"]);
		let debug = transform(&input, Some("sidecar"), &entry(&["/bin/sh"]))
			.unwrap()
			.with_image("busybox:1.36");
		assert_eq!(debug.spec.containers[0].image, input.containers[0].image);
		assert_eq!(
			debug.spec.containers[1].image.as_deref(),
			Some("busybox:1.36")
		);
	}

	#[test]
	fn into_pod_sets_identity_and_labels() {
		let workload = WorkloadReference::new("prod", WorkloadKind::StatefulSet, "postgres");
		let pod = transform(&template(&["db"]), None, &entry(&["/bin/sh"]))
			.unwrap()
			.into_pod("kdebug-pod", "prod", &workload);

		assert_eq!(pod.metadata.name.as_deref(), Some("kdebug-pod"));
		assert_eq!(pod.metadata.namespace.as_deref(), Some("prod"));
		let labels = pod.metadata.labels.unwrap();
		assert_eq!(labels.get(MANAGED_LABEL).map(String::as_str), Some("true"));
		assert_eq!(
			labels.get(SOURCE_LABEL).map(String::as_str),
			Some("statefulset-postgres")
		);
		assert!(pod.spec.is_some());
	}

	#[test]
	fn sanitize_label_value_trims_and_replaces() {
		assert_eq!(sanitize_label_value("job-my/app:v1"), "job-my_app_v1");
		assert_eq!(sanitize_label_value("--x--"), "x");
		assert_eq!(sanitize_label_value(&"a".repeat(80)).len(), MAX_LABEL_LENGTH);
	}

	fn container_names() -> impl Strategy<Value = Vec<String>> {
		prop::collection::btree_set("[a-z][a-z0-9-]{0,10}", 1..5)
			.prop_map(|names| names.into_iter().collect())
	}

	proptest! {
		#[test]
		fn transform_forces_pod_fields_and_keeps_others(
			names in container_names(),
			pick in any::<prop::sample::Index>(),
			command in prop::collection::vec("[a-z/]{1,12}", 1..4)
		) {
			let refs: Vec<&str> = names.iter().map(String::as_str).collect();
			let input = template(&refs);
			let selected = pick.index(names.len());
			let debug = transform(&input, Some(&names[selected]), &command).unwrap();

			prop_assert_eq!(debug.spec.restart_policy.as_deref(), Some("Never"));
			prop_assert_eq!(debug.spec.termination_grace_period_seconds, Some(0));
			prop_assert_eq!(&debug.target_container, &names[selected]);
			for (i, (out, orig)) in debug.spec.containers.iter().zip(&input.containers).enumerate() {
				if i == selected {
					prop_assert_eq!(out.command.as_ref(), Some(&command));
					prop_assert!(out.args.is_none());
				} else {
					prop_assert_eq!(out, orig);
				}
			}
		}

		#[test]
		fn transform_is_idempotent(
			names in container_names(),
			pick in any::<prop::sample::Index>(),
			command in prop::collection::vec("[a-z/]{1,12}", 1..4)
		) {
			let refs: Vec<&str> = names.iter().map(String::as_str).collect();
			let input = template(&refs);
			let selector = names[pick.index(names.len())].as_str();
			let first = transform(&input, Some(selector), &command);
			let second = transform(&input, Some(selector), &command);
			prop_assert_eq!(&first, &second);

			let once = first.unwrap();
			let twice = transform(&once.spec, Some(selector), &command).unwrap();
			prop_assert_eq!(once, twice);
		}

		#[test]
		fn repeated_calls_on_one_template_agree(
			names in container_names(),
			selector in prop::option::of("[a-z][a-z0-9-]{0,10}"),
			command in prop::collection::vec("[a-z/]{1,12}", 1..4)
		) {
			let refs: Vec<&str> = names.iter().map(String::as_str).collect();
			let input = template(&refs);
			let before = input.clone();
			let first = transform(&input, selector.as_deref(), &command);
			let second = transform(&input, selector.as_deref(), &command);
			prop_assert_eq!(first, second);
			prop_assert_eq!(input, before);
		}

		#[test]
		fn unknown_selector_never_matches(names in container_names()) {
			let refs: Vec<&str> = names.iter().map(String::as_str).collect();
			let input = template(&refs);
			let result = transform(&input, Some("Not_A_Container"), &entry(&["/bin/sh"]));
			prop_assert!(
				matches!(result, Err(TransformError::ContainerNotFound { .. })),
				"expected ContainerNotFound"
			);
		}

		#[test]
		fn source_label_always_valid(name in ".{0,100}") {
			let result = sanitize_label_value(&format!("deployment-{name}"));
			prop_assert!(
				is_valid_k8s_label_value(&result),
				"Invalid label value: {:?}",
				result
			);
		}
	}
}
