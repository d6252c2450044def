//! Session termination signalling.
//!
//! When credentials can no longer be renewed the coordinator clears the token store
//! and tells the embedding environment to send the user to the login entry point.
//! How that redirect happens (router push, window reload, CLI prompt) is the
//! observer's business.

// self
use crate::_prelude::*;

/// Why a session was terminated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
	/// A 401 arrived and no refresh token was stored.
	MissingRefreshToken,
	/// The refresh endpoint rejected the refresh token or could not be reached.
	RefreshFailed,
	/// The server rejected a request that had already been replayed with a fresh token.
	RejectedAfterRefresh,
}
impl TerminationReason {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::MissingRefreshToken => "missing_refresh_token",
			Self::RefreshFailed => "refresh_failed",
			Self::RejectedAfterRefresh => "rejected_after_refresh",
		}
	}
}
impl Display for TerminationReason {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Event delivered to a [`SessionObserver`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTermination {
	/// Trigger for the termination.
	pub reason: TerminationReason,
	/// Login entry point the environment should navigate to.
	pub redirect_to: String,
	/// Moment the session was terminated.
	#[serde(with = "time::serde::rfc3339")]
	pub at: OffsetDateTime,
}

/// Receives session terminations; implementations perform the redirect.
pub trait SessionObserver
where
	Self: Send + Sync,
{
	/// Called after credentials were cleared.
	fn session_terminated(&self, event: SessionTermination);
}

/// Default observer: logs the termination and parks the redirect target until the
/// embedding environment picks it up with [`LoginRedirect::take_pending`].
#[derive(Debug, Default)]
pub struct LoginRedirect {
	pending: Mutex<Option<SessionTermination>>,
}
impl LoginRedirect {
	/// Takes the pending redirect, if any.
	pub fn take_pending(&self) -> Option<SessionTermination> {
		self.pending.lock().take()
	}
}
impl SessionObserver for LoginRedirect {
	fn session_terminated(&self, event: SessionTermination) {
		trace_event!(
			info,
			reason = event.reason.as_str(),
			redirect_to = %event.redirect_to,
			"Session terminated; redirecting to login."
		);

		*self.pending.lock() = Some(event);
	}
}

/// Observer that keeps every termination, for tests and diagnostics.
#[derive(Debug, Default)]
pub struct RecordingSessionObserver {
	events: Mutex<Vec<SessionTermination>>,
}
impl RecordingSessionObserver {
	/// Terminations observed so far.
	pub fn events(&self) -> Vec<SessionTermination> {
		self.events.lock().clone()
	}
}
impl SessionObserver for RecordingSessionObserver {
	fn session_terminated(&self, event: SessionTermination) {
		self.events.lock().push(event);
	}
}
