// self
use crate::{
	_prelude::*,
	obs::{Stage, StageOutcome},
};

/// Bumps `bearer_transport_stage_total{stage, outcome}` when `metrics` is enabled.
pub fn record_stage(stage: Stage, outcome: StageOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"bearer_transport_stage_total",
			"stage" => stage.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}
	#[cfg(not(feature = "metrics"))]
	{
		let _ = (stage, outcome);
	}
}

/// Feeds the `bearer_transport_retry_delay_seconds` histogram with a scheduled backoff.
pub fn record_retry_delay(delay: Duration) {
	#[cfg(feature = "metrics")]
	{
		metrics::histogram!("bearer_transport_retry_delay_seconds").record(delay.as_secs_f64());
	}
	#[cfg(not(feature = "metrics"))]
	{
		let _ = delay;
	}
}

/// Counts final response statuses by class (`2xx`, `4xx`, ...).
pub fn record_response(status: u16) {
	#[cfg(feature = "metrics")]
	{
		let class = match status / 100 {
			1 => "1xx",
			2 => "2xx",
			3 => "3xx",
			4 => "4xx",
			_ => "5xx",
		};

		metrics::counter!("bearer_transport_responses_total", "class" => class).increment(1);
	}
	#[cfg(not(feature = "metrics"))]
	{
		let _ = status;
	}
}
