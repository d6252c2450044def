// crates.io
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
// self
use crate::{
	_prelude::*,
	http::{HttpRequest, HttpResponse, Method, MultipartFile, RequestBody},
};

/// Caller-side request descriptor.
///
/// `ApiRequest` is plain data: the pipeline clones it for every retry or replay after
/// a session refresh, so each attempt starts from the caller's original headers and
/// body.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// HTTP verb.
	pub method: Method,
	/// Path relative to the configured base URL.
	pub path: String,
	/// Query parameters appended in order.
	pub query: Vec<(String, String)>,
	/// Extra headers keyed by lowercase name.
	pub headers: BTreeMap<String, String>,
	/// Request payload.
	pub body: RequestBody,
	/// Allows transient-failure retries for a non-idempotent method.
	pub retry_safe: bool,
	/// Signal that aborts the request with [`Error::Cancelled`].
	pub cancellation: Option<CancellationToken>,
}
impl ApiRequest {
	/// Creates a request without query, headers, or body.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			query: Vec::new(),
			headers: BTreeMap::new(),
			body: RequestBody::Empty,
			retry_safe: false,
			cancellation: None,
		}
	}

	/// Appends a query parameter.
	pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.push((name.into(), value.into()));

		self
	}

	/// Sets a header.
	pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
		self.headers.insert(name.to_ascii_lowercase(), value.into());

		self
	}

	/// Serializes `body` as the JSON payload.
	pub fn json<B>(mut self, body: &B) -> Result<Self>
	where
		B: ?Sized + Serialize,
	{
		let bytes = serde_json::to_vec(body)
			.map_err(|e| Error::client_validation(format!("request body cannot be encoded: {e}")))?;

		self.body = RequestBody::Json(bytes);

		Ok(self)
	}

	/// Uses `file` as a `multipart/form-data` payload.
	pub fn multipart(mut self, file: MultipartFile) -> Self {
		self.body = RequestBody::Multipart(file);

		self
	}

	/// Opts a non-idempotent request into transient-failure retries.
	pub fn retry_safe(mut self, retry_safe: bool) -> Self {
		self.retry_safe = retry_safe;

		self
	}

	/// Attaches a cancellation signal.
	pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
		self.cancellation = Some(token);

		self
	}

	/// Whether transient failures may be replayed.
	///
	/// Safe methods always qualify, other methods only when the caller opted in.
	/// Multipart uploads never do.
	pub fn is_retryable(&self) -> bool {
		!matches!(self.body, RequestBody::Multipart(_)) && (self.method.is_safe() || self.retry_safe)
	}

	pub(crate) fn to_http(&self, url: Url) -> HttpRequest {
		let mut request = HttpRequest::new(self.method, url);

		request.headers = self.headers.clone();
		request.body = self.body.clone();

		if request.header("accept").is_none() {
			request.set_header("accept", "application/json");
		}
		if matches!(request.body, RequestBody::Json(_)) && request.header("content-type").is_none() {
			request.set_header("content-type", "application/json");
		}

		request
	}
}

/// Decoded success response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiResponse<T> {
	/// Deserialized body.
	pub data: T,
	/// HTTP status code.
	pub status: u16,
	/// Response headers keyed by lowercase name.
	pub headers: BTreeMap<String, String>,
}
impl<T> ApiResponse<T>
where
	T: DeserializeOwned,
{
	/// Decodes a success response; an empty body decodes as JSON `null`.
	pub fn decode(response: HttpResponse) -> Result<Self> {
		let body: &[u8] = if response.body.iter().all(u8::is_ascii_whitespace) {
			b"null"
		} else {
			&response.body
		};
		let deserializer = &mut serde_json::Deserializer::from_slice(body);
		let data = serde_path_to_error::deserialize(deserializer).map_err(|e| {
			Error::UnexpectedBody {
				status: response.status,
				path: e.path().to_string(),
				reason: e.inner().to_string(),
			}
		})?;

		Ok(Self { data, status: response.status, headers: response.headers })
	}
}
