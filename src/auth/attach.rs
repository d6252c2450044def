//! Bearer credential injection for outgoing requests.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, TokenSecret, TokenShapeError},
	http::HttpRequest,
};

/// Result of running the attacher over a request.
#[derive(Debug)]
pub enum AttachOutcome {
	/// A bearer header was set.
	Attached {
		/// Fingerprint of the attached token, for audit correlation.
		fingerprint: String,
	},
	/// No token was available; the request goes out unauthenticated.
	Anonymous,
	/// A token was stored but malformed; the request goes out unauthenticated.
	Malformed(Error),
}
impl AttachOutcome {
	/// Fingerprint of the attached token, if any.
	pub fn fingerprint(&self) -> Option<&str> {
		match self {
			Self::Attached { fingerprint } => Some(fingerprint),
			_ => None,
		}
	}
}

/// Validates stored tokens and decorates requests with `Authorization: Bearer …`.
///
/// Malformed tokens never fail the request: some endpoints are public, so the request
/// proceeds without credentials and the problem is reported as a diagnostic.
#[derive(Clone, Copy, Debug, Default)]
pub struct AuthAttacher;
impl AuthAttacher {
	/// Attaches `token` to `request` when it is structurally valid.
	pub fn attach(&self, request: &mut HttpRequest, token: Option<&TokenSecret>) -> AttachOutcome {
		let Some(token) = token else {
			return AttachOutcome::Anonymous;
		};

		match AccessToken::parse(token.clone()) {
			Ok(access) => {
				if access.is_expired_at(OffsetDateTime::now_utc()) {
					trace_event!(
						debug,
						path = request.url.path(),
						"Attaching an access token whose exp claim has already passed."
					);
				}

				request.set_header("authorization", access.bearer_header());

				AttachOutcome::Attached { fingerprint: access.secret().fingerprint() }
			},
			Err(TokenShapeError::Absent) => AttachOutcome::Anonymous,
			Err(shape) => {
				trace_event!(
					warn,
					path = request.url.path(),
					reason = %shape,
					"Stored access token is malformed; sending request without credentials."
				);

				AttachOutcome::Malformed(Error::client_validation(shape.to_string()))
			},
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::http::Method;

	fn request() -> HttpRequest {
		HttpRequest::new(
			Method::Get,
			Url::parse("https://api.example.com/api/v1/products").expect("Fixture URL should parse."),
		)
	}

	#[test]
	fn malformed_token_is_not_attached() {
		let mut request = request();
		let outcome = AuthAttacher.attach(&mut request, Some(&TokenSecret::new("abc.def")));

		assert!(request.header("authorization").is_none());
		assert!(matches!(outcome, AttachOutcome::Malformed(Error::ClientValidation { .. })));
	}

	#[test]
	fn valid_token_is_attached_as_bearer() {
		let mut request = request();
		let outcome = AuthAttacher.attach(&mut request, Some(&TokenSecret::new("h.p.s")));

		assert_eq!(request.header("authorization"), Some("Bearer h.p.s"));
		assert_eq!(outcome.fingerprint(), Some(TokenSecret::new("h.p.s").fingerprint().as_str()));
	}

	#[test]
	fn sentinel_and_missing_tokens_stay_anonymous() {
		let mut request = request();

		assert!(matches!(
			AuthAttacher.attach(&mut request, Some(&TokenSecret::new("undefined"))),
			AttachOutcome::Anonymous
		));
		assert!(matches!(AuthAttacher.attach(&mut request, None), AttachOutcome::Anonymous));
		assert!(request.header("authorization").is_none());
	}
}
