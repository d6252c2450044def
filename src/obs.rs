//! Observability helpers for the request pipeline.
//!
//! # Feature Flags
//!
//! - `tracing` opens one `bearer_transport.request` span per call (`method`, `path`,
//!   `attempts`, `status`) and logs stage transitions and audit records as events.
//! - `metrics` feeds `bearer_transport_stage_total{stage, outcome}`,
//!   `bearer_transport_responses_total{class}` and the
//!   `bearer_transport_retry_delay_seconds` histogram.
//!
//! Audit records are always produced; [`AuditSink`] decides where they go.

mod audit;
mod metrics;
mod tracing;

pub use audit::*;
pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Pipeline stages observed by the transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
	/// Bearer credential injection.
	AttachAuth,
	/// A single network exchange.
	Dispatch,
	/// Transparent replay of a transient failure.
	Retry,
	/// Session renewal after a 401.
	Refresh,
	/// Final classification of a failed request.
	Classify,
}
impl Stage {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Stage::AttachAuth => "attach_auth",
			Stage::Dispatch => "dispatch",
			Stage::Retry => "retry",
			Stage::Refresh => "refresh",
			Stage::Classify => "classify",
		}
	}
}
impl Display for Stage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StageOutcome {
	/// Entry to a stage.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure handed to the next stage or back to the caller.
	Failure,
}
impl StageOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			StageOutcome::Attempt => "attempt",
			StageOutcome::Success => "success",
			StageOutcome::Failure => "failure",
		}
	}
}
impl Display for StageOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
