//! Retry decisions for transient failures.
//!
//! [`RetryPolicy`] is a pure function of the failed attempt: it never sleeps or
//! dispatches on its own. The pipeline asks it for a [`RetryDecision`] after each
//! failed try and waits out the returned delay before replaying the request.

// crates.io
use rand::Rng;
// self
use crate::{
	_prelude::*,
	http::{HttpResponse, TransportFailure},
};

/// Why an attempt is considered for a retry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryCause {
	/// No response was received (network failure or timeout).
	NoResponse,
	/// The server answered with a 5xx status.
	ServerStatus(u16),
}
impl RetryCause {
	/// Classifies a dispatch outcome; `None` means the outcome is not retryable.
	pub fn of(outcome: &Result<HttpResponse, TransportFailure>) -> Option<Self> {
		match outcome {
			Err(_) => Some(Self::NoResponse),
			Ok(response) if response.status >= 500 => Some(Self::ServerStatus(response.status)),
			Ok(_) => None,
		}
	}
}

/// A failed attempt, numbered from 1 for the first retry candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryAttempt {
	/// 1-based number of the attempt that just failed.
	pub attempt_number: u32,
	/// Failure that triggered the evaluation.
	pub cause: RetryCause,
}

/// Outcome of [`RetryPolicy::decide`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryDecision {
	/// Replay the request after `delay`.
	Retry {
		/// Wait before the next attempt.
		delay: Duration,
	},
	/// Surface the failure.
	GiveUp,
}

/// Exponential backoff schedule.
///
/// Retry `n` (1-based) waits `base_delay × 2^(n-1)`, capped at `max_delay`. With
/// `jitter` enabled up to a quarter of the step is added, which keeps consecutive
/// delays strictly increasing as long as the cap is not reached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
	/// Retries after the first attempt; total tries are `max_retries + 1`.
	pub max_retries: u32,
	/// Delay before the first retry.
	pub base_delay: Duration,
	/// Upper bound for any single delay.
	pub max_delay: Duration,
	/// Adds random jitter to each delay.
	pub jitter: bool,
}
impl RetryPolicy {
	/// Default retry cap.
	pub const DEFAULT_MAX_RETRIES: u32 = 3;

	/// Policy that never retries.
	pub fn disabled() -> Self {
		Self { max_retries: 0, ..Self::default() }
	}

	/// Decides whether the failed `attempt` should be replayed.
	pub fn decide(&self, attempt: &RetryAttempt) -> RetryDecision {
		if attempt.attempt_number == 0 || attempt.attempt_number > self.max_retries {
			return RetryDecision::GiveUp;
		}

		let step = self.backoff(attempt.attempt_number);
		let delay = if self.jitter { step + Self::jitter_for(step) } else { step };

		RetryDecision::Retry { delay: delay.min(self.max_delay) }
	}

	/// Deterministic (jitter-free) delay for retry `attempt_number`.
	pub fn backoff(&self, attempt_number: u32) -> Duration {
		let exponent = attempt_number.saturating_sub(1).min(31);
		let factor = 1_u32 << exponent;

		self.base_delay.saturating_mul(factor).min(self.max_delay)
	}

	fn jitter_for(step: Duration) -> Duration {
		let ceiling = u64::try_from(step.as_millis() / 4).unwrap_or(u64::MAX);

		if ceiling == 0 {
			return Duration::ZERO;
		}

		Duration::from_millis(rand::rng().random_range(0..ceiling))
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_retries: Self::DEFAULT_MAX_RETRIES,
			base_delay: Duration::from_millis(300),
			max_delay: Duration::from_secs(10),
			jitter: true,
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn attempt(attempt_number: u32) -> RetryAttempt {
		RetryAttempt { attempt_number, cause: RetryCause::ServerStatus(503) }
	}

	fn delays(policy: &RetryPolicy) -> Vec<Duration> {
		(1..)
			.map(|n| policy.decide(&attempt(n)))
			.take_while(|decision| matches!(decision, RetryDecision::Retry { .. }))
			.map(|decision| match decision {
				RetryDecision::Retry { delay } => delay,
				RetryDecision::GiveUp => Duration::ZERO,
			})
			.collect()
	}

	#[test]
	fn caps_at_three_retries_with_doubling_delays() {
		let policy = RetryPolicy { jitter: false, ..RetryPolicy::default() };

		assert_eq!(
			delays(&policy),
			vec![Duration::from_millis(300), Duration::from_millis(600), Duration::from_millis(1200)]
		);
		assert_eq!(policy.decide(&attempt(4)), RetryDecision::GiveUp);
	}

	#[test]
	fn jittered_delays_stay_strictly_increasing() {
		let policy = RetryPolicy::default();

		for _ in 0..64 {
			let delays = delays(&policy);

			assert_eq!(delays.len(), 3);
			assert!(delays.windows(2).all(|pair| pair[0] < pair[1]), "Delays regressed: {delays:?}.");
		}
	}

	#[test]
	fn only_missing_responses_and_5xx_are_retryable() {
		assert_eq!(
			RetryCause::of(&Err(TransportFailure::Timeout { timeout: Duration::from_secs(1) })),
			Some(RetryCause::NoResponse)
		);
		assert_eq!(
			RetryCause::of(&Ok(HttpResponse::new(503, ""))),
			Some(RetryCause::ServerStatus(503))
		);

		for status in [400, 401, 403, 404, 422, 429] {
			assert_eq!(RetryCause::of(&Ok(HttpResponse::new(status, ""))), None);
		}
	}

	#[test]
	fn disabled_policy_never_retries() {
		assert_eq!(RetryPolicy::disabled().decide(&attempt(1)), RetryDecision::GiveUp);
	}
}
