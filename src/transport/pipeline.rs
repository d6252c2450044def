//! Ordered request pipeline: attach auth, dispatch, retry, refresh, classify.

// self
use crate::{
	_prelude::*,
	auth::{AttachOutcome, TokenSecret},
	classify::{FailedAttempt, FailureContext},
	http::{HttpRequest, HttpResponse, TransportFailure},
	obs::{self, RequestSpan, Stage, StageOutcome},
	retry::{RetryAttempt, RetryCause, RetryDecision},
	session::TerminationReason,
	transport::{ApiClient, ApiRequest},
};

impl ApiClient {
	/// Runs `request` through the pipeline and returns the raw success response.
	pub(crate) async fn execute(&self, request: ApiRequest) -> Result<HttpResponse> {
		let url = self.resolve(&request)?;
		let span = RequestSpan::new(request.method, url.path());
		let cancellation = request.cancellation.clone();
		let run = span.instrument(self.run(request, url, &span));

		match cancellation {
			Some(token) => tokio::select! {
				biased;
				_ = token.cancelled() => {
					trace_event!(debug, "Request cancelled by caller.");

					Err(Error::Cancelled)
				},
				result = run => result,
			},
			None => run.await,
		}
	}

	fn resolve(&self, request: &ApiRequest) -> Result<Url> {
		let mut url = self.config.resolve(&request.path)?;

		if !request.query.is_empty() {
			url.query_pairs_mut().extend_pairs(request.query.iter());
		}

		Ok(url)
	}

	async fn run(&self, request: ApiRequest, url: Url, span: &RequestSpan) -> Result<HttpResponse> {
		let retryable = request.is_retryable();
		let mut refreshed = None::<TokenSecret>;
		let mut failures = 0_u32;
		let mut attempts = 0_u32;

		loop {
			let mut http = request.to_http(url.clone());
			let fingerprint = self.attach(&mut http, refreshed.as_ref());
			let outcome = self.dispatch(http).await;

			attempts += 1;
			span.record_attempts(attempts);

			if let Ok(response) = &outcome {
				span.record_status(response.status);
			}

			if retryable && let Some(cause) = RetryCause::of(&outcome) {
				failures += 1;

				if let RetryDecision::Retry { delay } =
					self.config.retry.decide(&RetryAttempt { attempt_number: failures, cause })
				{
					obs::record_stage(Stage::Retry, StageOutcome::Attempt);
					obs::record_retry_delay(delay);
					trace_event!(
						debug,
						attempt = failures,
						delay_ms = delay.as_millis() as u64,
						"Retrying after transient failure."
					);
					tokio::time::sleep(delay).await;

					continue;
				}
			}

			let context = FailureContext {
				method: request.method,
				endpoint: url.path().to_owned(),
				session_fingerprint: fingerprint,
			};

			match outcome {
				Ok(response) if response.is_success() => {
					obs::record_stage(Stage::Dispatch, StageOutcome::Success);
					obs::record_response(response.status);

					return Ok(response);
				},
				Ok(response) if response.status == 401 => {
					if refreshed.is_some() {
						trace_event!(warn, path = url.path(), "Fresh token rejected; ending session.");
						self.coordinator.terminate(TerminationReason::RejectedAfterRefresh);

						return Err(Error::AuthExpired);
					}

					match self.coordinator.recover(request.method, &url).await {
						Ok(token) => refreshed = Some(token),
						Err(_failure) => {
							trace_event!(debug, "Session could not be renewed: {_failure}");

							return Err(Error::AuthExpired);
						},
					}
				},
				Ok(response) => {
					obs::record_response(response.status);

					return Err(self.classifier.classify(&context, FailedAttempt::Response(response)));
				},
				Err(failure) =>
					return Err(self.classifier.classify(&context, FailedAttempt::NoResponse(failure))),
			}
		}
	}

	/// Attaches the refreshed token when one was handed over, otherwise the stored one.
	fn attach(&self, request: &mut HttpRequest, refreshed: Option<&TokenSecret>) -> Option<String> {
		obs::record_stage(Stage::AttachAuth, StageOutcome::Attempt);

		let stored;
		let token = match refreshed {
			Some(token) => Some(token),
			None => {
				stored = self.store.access_token().unwrap_or_else(|_e| {
					trace_event!(warn, error = %_e, "Access token could not be read; sending anonymously.");

					None
				});

				stored.as_ref()
			},
		};

		match self.attacher.attach(request, token) {
			AttachOutcome::Malformed(_) => {
				obs::record_stage(Stage::AttachAuth, StageOutcome::Failure);

				None
			},
			outcome => {
				obs::record_stage(Stage::AttachAuth, StageOutcome::Success);

				outcome.fingerprint().map(str::to_owned)
			},
		}
	}

	async fn dispatch(&self, request: HttpRequest) -> Result<HttpResponse, TransportFailure> {
		obs::record_stage(Stage::Dispatch, StageOutcome::Attempt);

		let timeout = self.config.timeout;

		match tokio::time::timeout(timeout, self.transport.execute(request)).await {
			Ok(outcome) => outcome,
			Err(_) => Err(TransportFailure::Timeout { timeout }),
		}
	}
}
