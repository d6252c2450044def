//! Refresh endpoint client.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, TokenSecret},
	http::{HttpRequest, HttpTransport, Method, RequestBody},
	refresh::RefreshFailure,
};

/// Boxed future returned by [`TokenRefresher::refresh`].
pub type RefreshFuture<'a> =
	Pin<Box<dyn Future<Output = Result<RefreshedTokens, RefreshFailure>> + 'a + Send>>;

/// Exchanges a refresh token for a new access token.
///
/// The coordinator calls this at most once per expiry episode. Implementations must
/// not consult the token store themselves; the coordinator persists the result.
pub trait TokenRefresher
where
	Self: 'static + Send + Sync,
{
	/// Performs one exchange.
	fn refresh(&self, refresh_token: TokenSecret) -> RefreshFuture<'_>;
}

/// Tokens returned by a successful refresh.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefreshedTokens {
	/// New access token (structurally validated).
	pub access_token: TokenSecret,
	/// Rotated refresh token, when the server issued one.
	pub refresh_token: Option<TokenSecret>,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
	refresh_token: &'a str,
}

#[derive(Deserialize)]
struct RefreshResponse {
	access_token: String,
	#[serde(default)]
	refresh_token: Option<String>,
}

/// [`TokenRefresher`] that calls `POST {base}/auth/refresh-token`.
///
/// The call goes straight to the transport, bypassing the request pipeline, so a 401
/// from the refresh endpoint can never trigger another refresh.
pub struct EndpointRefresher {
	transport: Arc<dyn HttpTransport>,
	url: Url,
	timeout: Duration,
}
impl EndpointRefresher {
	/// Creates a refresher posting to `url` through `transport`.
	pub fn new(transport: Arc<dyn HttpTransport>, url: Url, timeout: Duration) -> Self {
		Self { transport, url, timeout }
	}

	/// Refresh endpoint URL.
	pub fn url(&self) -> &Url {
		&self.url
	}

	async fn exchange(&self, refresh_token: TokenSecret) -> Result<RefreshedTokens, RefreshFailure> {
		let body = serde_json::to_vec(&RefreshRequest { refresh_token: refresh_token.expose() })
			.map_err(|e| RefreshFailure::MalformedRequest { message: e.to_string() })?;
		let mut request = HttpRequest::new(Method::Post, self.url.clone());

		request.set_header("content-type", "application/json");
		request.set_header("accept", "application/json");
		request.body = RequestBody::Json(body);

		let response = match tokio::time::timeout(self.timeout, self.transport.execute(request)).await
		{
			Ok(Ok(response)) => response,
			Ok(Err(failure)) => return Err(RefreshFailure::Unreachable { message: failure.to_string() }),
			Err(_) =>
				return Err(RefreshFailure::Unreachable {
					message: format!("no response within {:?}", self.timeout),
				}),
		};

		if !response.is_success() {
			return Err(RefreshFailure::Rejected { status: response.status });
		}

		let deserializer = &mut serde_json::Deserializer::from_slice(&response.body);
		let wire: RefreshResponse =
			serde_path_to_error::deserialize(deserializer).map_err(|e| {
				RefreshFailure::MalformedResponse {
					path: e.path().to_string(),
					message: e.inner().to_string(),
				}
			})?;
		let access = AccessToken::parse(TokenSecret::new(wire.access_token))
			.map_err(|shape| RefreshFailure::InvalidAccessToken { reason: shape.to_string() })?;

		Ok(RefreshedTokens {
			access_token: access.secret().clone(),
			refresh_token: wire
				.refresh_token
				.map(TokenSecret::new)
				.filter(|token| !token.is_absent()),
		})
	}
}
impl TokenRefresher for EndpointRefresher {
	fn refresh(&self, refresh_token: TokenSecret) -> RefreshFuture<'_> {
		Box::pin(self.exchange(refresh_token))
	}
}
impl Debug for EndpointRefresher {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("EndpointRefresher")
			.field("url", &self.url.as_str())
			.field("timeout", &self.timeout)
			.finish()
	}
}
