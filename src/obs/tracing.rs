// self
use crate::{_prelude::*, http::Method};

/// Future returned by [`RequestSpan::instrument`]; a plain passthrough without `tracing`.
#[cfg(feature = "tracing")]
pub type Traced<F> = tracing::instrument::Instrumented<F>;
/// Future returned by [`RequestSpan::instrument`]; a plain passthrough without `tracing`.
#[cfg(not(feature = "tracing"))]
pub type Traced<F> = F;

/// Per-request span carrying the method, path, attempt count, and final status.
///
/// `attempts` and `status` start empty and are filled in by the pipeline as the
/// request progresses, so a single span line summarises retries and the outcome.
#[derive(Clone, Debug)]
pub struct RequestSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl RequestSpan {
	/// Opens a `bearer_transport.request` span for `method` and `path`.
	pub fn new(method: Method, path: &str) -> Self {
		#[cfg(feature = "tracing")]
		{
			Self {
				span: tracing::info_span!(
					"bearer_transport.request",
					method = method.as_str(),
					path,
					attempts = tracing::field::Empty,
					status = tracing::field::Empty,
				),
			}
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (method, path);

			Self {}
		}
	}

	/// Records how many network exchanges the request has made so far.
	pub fn record_attempts(&self, attempts: u32) {
		#[cfg(feature = "tracing")]
		{
			self.span.record("attempts", attempts);
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = attempts;
		}
	}

	/// Records the HTTP status the request finished with.
	pub fn record_status(&self, status: u16) {
		#[cfg(feature = "tracing")]
		{
			self.span.record("status", status);
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = status;
		}
	}

	/// Runs `fut` inside the span; no guard is held across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> Traced<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			tracing::Instrument::instrument(fut, self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}
