// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Process exit codes.

use kdebug_session::{SessionErrorClass, SessionOutcome};

pub const EXIT_OK: i32 = 0;
pub const EXIT_SESSION_FAILED: i32 = 1;
/// Same code clap uses for usage errors.
pub const EXIT_INVALID_INPUT: i32 = 2;
pub const EXIT_INTERRUPTED: i32 = 130;

/// Map a finished session to an exit code. Teardown warnings never change it.
pub fn exit_code(outcome: &SessionOutcome) -> i32 {
	match &outcome.result {
		Ok(()) => EXIT_OK,
		Err(e) if e.class() == SessionErrorClass::Interrupted => EXIT_INTERRUPTED,
		Err(_) => EXIT_SESSION_FAILED,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use kdebug_k8s::K8sError;
	use kdebug_session::{SessionError, SessionPhase, TeardownReport, TeardownWarning};

	fn outcome(result: Result<(), SessionError>) -> SessionOutcome {
		SessionOutcome {
			result,
			teardown: TeardownReport::new(),
			phase: SessionPhase::Terminated,
		}
	}

	#[test]
	fn clean_session_exits_zero() {
		assert_eq!(exit_code(&outcome(Ok(()))), EXIT_OK);
	}

	#[test]
	fn teardown_warnings_do_not_change_the_code() {
		let mut outcome = outcome(Ok(()));
		outcome.teardown.push(TeardownWarning::PodDelete {
			pod_name: "kdebug-pod".into(),
			source: K8sError::ApiError {
				message: "connection reset".into(),
			},
		});
		assert_eq!(exit_code(&outcome), EXIT_OK);
	}

	#[test]
	fn session_errors_exit_one() {
		let err = SessionError::RemoteExit { code: 42 };
		assert_eq!(exit_code(&outcome(Err(err))), EXIT_SESSION_FAILED);
	}

	#[test]
	fn interrupt_exits_130() {
		assert_eq!(
			exit_code(&outcome(Err(SessionError::Interrupted))),
			EXIT_INTERRUPTED
		);
	}
}
