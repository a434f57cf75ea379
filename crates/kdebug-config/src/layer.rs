// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Partial configuration layer for merging from multiple sources.

use serde::Deserialize;

/// Partial configuration layer - all fields are Option for merging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
	#[serde(default)]
	pub session: Option<SessionLayer>,
	#[serde(default)]
	pub logging: Option<LoggingLayer>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionLayer {
	#[serde(default)]
	pub namespace: Option<String>,
	#[serde(default)]
	pub pod_name: Option<String>,
	#[serde(default)]
	pub image: Option<String>,
	#[serde(default)]
	pub entrypoint: Option<Vec<String>>,
	#[serde(default)]
	pub shell: Option<Vec<String>>,
	#[serde(default)]
	pub entry_timeout_secs: Option<u64>,
	#[serde(default)]
	pub ready_timeout_secs: Option<u64>,
	#[serde(default)]
	pub resize_interval_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingLayer {
	#[serde(default)]
	pub level: Option<String>,
	#[serde(default)]
	pub format: Option<String>,
}

impl ConfigLayer {
	/// Merge another layer into this one. Other layer takes precedence.
	pub fn merge(&mut self, other: ConfigLayer) {
		merge_option(&mut self.session, other.session, SessionLayer::merge);
		merge_option(&mut self.logging, other.logging, LoggingLayer::merge);
	}

	pub(crate) fn session_mut(&mut self) -> &mut SessionLayer {
		self.session.get_or_insert_with(SessionLayer::default)
	}

	pub(crate) fn logging_mut(&mut self) -> &mut LoggingLayer {
		self.logging.get_or_insert_with(LoggingLayer::default)
	}
}

fn merge_option<T, F>(target: &mut Option<T>, source: Option<T>, merge_fn: F)
where
	F: FnOnce(&mut T, T),
{
	match (target.as_mut(), source) {
		(Some(t), Some(s)) => merge_fn(t, s),
		(None, Some(s)) => *target = Some(s),
		_ => {}
	}
}

fn overwrite<T>(target: &mut Option<T>, source: Option<T>) {
	if source.is_some() {
		*target = source;
	}
}

impl SessionLayer {
	fn merge(&mut self, other: SessionLayer) {
		overwrite(&mut self.namespace, other.namespace);
		overwrite(&mut self.pod_name, other.pod_name);
		overwrite(&mut self.image, other.image);
		overwrite(&mut self.entrypoint, other.entrypoint);
		overwrite(&mut self.shell, other.shell);
		overwrite(&mut self.entry_timeout_secs, other.entry_timeout_secs);
		overwrite(&mut self.ready_timeout_secs, other.ready_timeout_secs);
		overwrite(&mut self.resize_interval_secs, other.resize_interval_secs);
	}
}

impl LoggingLayer {
	fn merge(&mut self, other: LoggingLayer) {
		overwrite(&mut self.level, other.level);
		overwrite(&mut self.format, other.format);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn parses_full_file() {
		let layer: ConfigLayer = toml::from_str(
			r#"
			[session]
			namespace = "payments"
			pod_name = "dbg"
			entrypoint = ["/bin/sleep", "600"]
			shell = ["/bin/bash", "-l"]
			ready_timeout_secs = 60

			[logging]
			level = "debug"
			format = "json"
			"#,
		)
		.unwrap();

		let session = layer.session.unwrap();
		assert_eq!(session.namespace.as_deref(), Some("payments"));
		assert_eq!(
			session.shell,
			Some(vec!["/bin/bash".to_string(), "-l".to_string()])
		);
		assert_eq!(session.ready_timeout_secs, Some(60));
		assert_eq!(layer.logging.unwrap().format.as_deref(), Some("json"));
	}

	#[test]
	fn rejects_unknown_keys() {
		let result = toml::from_str::<ConfigLayer>("[session]\nnamepsace = \"x\"\n");
		assert!(result.is_err());
	}

	#[test]
	fn merge_keeps_unset_fields() {
		let mut base = ConfigLayer::default();
		base.session_mut().namespace = Some("base".into());
		base.session_mut().pod_name = Some("base-pod".into());

		let mut over = ConfigLayer::default();
		over.session_mut().namespace = Some("over".into());
		over.logging_mut().level = Some("warn".into());

		base.merge(over);
		let session = base.session.unwrap();
		assert_eq!(session.namespace.as_deref(), Some("over"));
		assert_eq!(session.pod_name.as_deref(), Some("base-pod"));
		assert_eq!(base.logging.unwrap().level.as_deref(), Some("warn"));
	}

	proptest! {
		#[test]
		fn later_layer_wins_when_set(
			first in proptest::option::of("[a-z]{1,8}"),
			second in proptest::option::of("[a-z]{1,8}")
		) {
			let mut merged = ConfigLayer::default();
			for value in [&first, &second] {
				let mut layer = ConfigLayer::default();
				layer.session_mut().namespace = value.clone();
				merged.merge(layer);
			}
			let expected = second.clone().or(first.clone());
			prop_assert_eq!(merged.session.and_then(|s| s.namespace), expected);
		}
	}
}
