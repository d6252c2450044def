// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters kept by one [`RefreshCoordinator`](super::RefreshCoordinator).
///
/// `calls` counts network round-trips to the refresh endpoint, so with single-flight
/// working as intended `calls + queued` equals the number of 401s that asked for a refresh.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
	calls: AtomicU64,
	succeeded: AtomicU64,
	failed: AtomicU64,
	queued: AtomicU64,
}
impl RefreshMetrics {
	/// Refresh endpoint calls started.
	pub fn calls(&self) -> u64 {
		read(&self.calls)
	}

	/// Calls that produced a usable access token.
	pub fn successes(&self) -> u64 {
		read(&self.succeeded)
	}

	/// Calls that ended the session.
	pub fn failures(&self) -> u64 {
		read(&self.failed)
	}

	/// Requests that joined a refresh another request had already started.
	pub fn queued(&self) -> u64 {
		read(&self.queued)
	}

	pub(crate) fn record_call(&self) {
		bump(&self.calls);
	}

	pub(crate) fn record_success(&self) {
		bump(&self.succeeded);
	}

	pub(crate) fn record_failure(&self) {
		bump(&self.failed);
	}

	pub(crate) fn record_queued(&self) {
		bump(&self.queued);
	}
}

fn read(counter: &AtomicU64) -> u64 {
	counter.load(Ordering::Relaxed)
}

fn bump(counter: &AtomicU64) {
	counter.fetch_add(1, Ordering::Relaxed);
}
