//! Transport primitives shared by the facade and the refresh coordinator.
//!
//! The module exposes [`HttpTransport`], the crate's only dependency on an HTTP stack,
//! together with the owned request/response descriptors that flow through it.
//! Requests are plain data (`Clone`) so the pipeline can replay them after a retry
//! or a token refresh without borrowing from the caller.

// std
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
// self
use crate::{_prelude::*, error::BoxError};

/// Boxed future returned by [`HttpTransport::execute`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, TransportFailure>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of executing a single request.
///
/// Implementations perform exactly one network exchange per call. They never retry,
/// refresh credentials, or interpret status codes; those concerns belong to the
/// pipeline. Any response that arrives, including 4xx/5xx, is returned as `Ok`.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Dispatches `request` and resolves once a full response is available.
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_>;
}

/// HTTP verbs supported by the facade.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
	/// `GET`
	Get,
	/// `HEAD`
	Head,
	/// `OPTIONS`
	Options,
	/// `POST`
	Post,
	/// `PUT`
	Put,
	/// `PATCH`
	Patch,
	/// `DELETE`
	Delete,
}
impl Method {
	/// Returns the canonical verb string.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Get => "GET",
			Self::Head => "HEAD",
			Self::Options => "OPTIONS",
			Self::Post => "POST",
			Self::Put => "PUT",
			Self::Patch => "PATCH",
			Self::Delete => "DELETE",
		}
	}

	/// Methods that may be replayed without caller opt-in.
	pub const fn is_safe(self) -> bool {
		matches!(self, Self::Get | Self::Head | Self::Options)
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Owned request descriptor handed to an [`HttpTransport`].
#[derive(Clone, Debug)]
pub struct HttpRequest {
	/// HTTP verb.
	pub method: Method,
	/// Absolute URL.
	pub url: Url,
	/// Header map keyed by lowercase header name.
	pub headers: BTreeMap<String, String>,
	/// Request payload.
	pub body: RequestBody,
}
impl HttpRequest {
	/// Creates a request without headers or body.
	pub fn new(method: Method, url: Url) -> Self {
		Self { method, url, headers: BTreeMap::new(), body: RequestBody::Empty }
	}

	/// Sets a header, normalizing the name to lowercase.
	pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
		self.headers.insert(name.to_ascii_lowercase(), value.into());
	}

	/// Removes a header by (case-insensitive) name.
	pub fn remove_header(&mut self, name: &str) -> Option<String> {
		self.headers.remove(&name.to_ascii_lowercase())
	}

	/// Returns a header value by (case-insensitive) name.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
	}
}

/// Payload variants understood by transports.
#[derive(Clone, Debug, Default)]
pub enum RequestBody {
	/// No payload.
	#[default]
	Empty,
	/// Pre-serialized JSON document.
	Json(Vec<u8>),
	/// Single-file multipart upload.
	Multipart(MultipartFile),
}

/// File part sent as `multipart/form-data`, with byte-level progress reporting.
#[derive(Clone)]
pub struct MultipartFile {
	/// Form field name.
	pub field: String,
	/// File name announced in the part's content disposition.
	pub file_name: String,
	/// MIME type of the file, when known.
	pub content_type: Option<String>,
	bytes: Arc<[u8]>,
	progress: Option<Arc<UploadProgress>>,
}
impl MultipartFile {
	const CHUNK_SIZE: usize = 64 * 1024;

	/// Wraps file contents for upload under `field`.
	pub fn new(field: impl Into<String>, file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
		Self {
			field: field.into(),
			file_name: file_name.into(),
			content_type: None,
			bytes: bytes.into(),
			progress: None,
		}
	}

	/// Declares the MIME type of the part.
	pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
		self.content_type = Some(content_type.into());

		self
	}

	/// Attaches a progress reporter.
	pub fn with_progress(mut self, progress: Arc<UploadProgress>) -> Self {
		self.progress = Some(progress);

		self
	}

	/// Total payload length in bytes.
	pub fn len(&self) -> u64 {
		self.bytes.len() as u64
	}

	/// Returns `true` when the file is empty.
	pub fn is_empty(&self) -> bool {
		self.bytes.is_empty()
	}

	/// Yields the payload in fixed-size chunks, reporting progress as each chunk is
	/// handed to the transport.
	pub fn chunks(&self) -> UploadChunks {
		if let Some(progress) = &self.progress {
			progress.restart();
		}

		UploadChunks { bytes: self.bytes.clone(), offset: 0, progress: self.progress.clone() }
	}
}
impl Debug for MultipartFile {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("MultipartFile")
			.field("field", &self.field)
			.field("file_name", &self.file_name)
			.field("content_type", &self.content_type)
			.field("len", &self.bytes.len())
			.finish()
	}
}

/// Iterator over upload chunks; see [`MultipartFile::chunks`].
pub struct UploadChunks {
	bytes: Arc<[u8]>,
	offset: usize,
	progress: Option<Arc<UploadProgress>>,
}
impl Iterator for UploadChunks {
	type Item = Vec<u8>;

	fn next(&mut self) -> Option<Self::Item> {
		if self.offset >= self.bytes.len() {
			if self.bytes.is_empty()
				&& let Some(progress) = &self.progress
			{
				progress.advance(0);
			}

			return None;
		}

		let end = (self.offset + MultipartFile::CHUNK_SIZE).min(self.bytes.len());
		let chunk = self.bytes[self.offset..end].to_vec();

		self.offset = end;

		if let Some(progress) = &self.progress {
			progress.advance(chunk.len() as u64);
		}

		Some(chunk)
	}
}

/// Progress callback type receiving whole percentages in `0..=100`.
pub type ProgressCallback = dyn Fn(u8) + Send + Sync;

/// Converts bytes-sent/bytes-total into integer percentages and forwards changes.
///
/// Only strictly increasing percentages are forwarded, so callers never observe the
/// bar moving backwards.
pub struct UploadProgress {
	total: u64,
	sent: AtomicU64,
	last: AtomicU8,
	started: AtomicBool,
	callback: Box<ProgressCallback>,
}
impl UploadProgress {
	/// Creates a reporter for a payload of `total` bytes.
	pub fn new(total: u64, callback: impl Fn(u8) + Send + Sync + 'static) -> Self {
		Self {
			total,
			sent: AtomicU64::new(0),
			last: AtomicU8::new(0),
			started: AtomicBool::new(false),
			callback: Box::new(callback),
		}
	}

	/// Records `bytes` more bytes as sent.
	pub fn advance(&self, bytes: u64) {
		let sent = self.sent.fetch_add(bytes, Ordering::AcqRel) + bytes;
		let percent = Self::percent(sent, self.total);
		let first = !self.started.swap(true, Ordering::AcqRel);
		let previous = self.last.fetch_max(percent, Ordering::AcqRel);

		if first || percent > previous {
			(self.callback)(percent);
		}
	}

	/// Last percentage forwarded to the callback.
	pub fn percent_sent(&self) -> u8 {
		self.last.load(Ordering::Acquire)
	}

	fn restart(&self) {
		self.sent.store(0, Ordering::Release);
	}

	fn percent(sent: u64, total: u64) -> u8 {
		if total == 0 {
			return 100;
		}

		let scaled = sent.min(total).saturating_mul(100) / total;

		u8::try_from(scaled).unwrap_or(100)
	}
}
impl Debug for UploadProgress {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("UploadProgress")
			.field("total", &self.total)
			.field("sent", &self.sent.load(Ordering::Relaxed))
			.finish()
	}
}

/// Fully buffered response returned by a transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
	/// HTTP status code.
	pub status: u16,
	/// Header map keyed by lowercase header name.
	pub headers: BTreeMap<String, String>,
	/// Raw body bytes.
	pub body: Vec<u8>,
}
impl HttpResponse {
	/// Creates a response with the given status and body and no headers.
	pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
		Self { status, headers: BTreeMap::new(), body: body.into() }
	}

	/// Convenience constructor for JSON payloads.
	pub fn json(status: u16, value: &serde_json::Value) -> Self {
		let mut response = Self::new(status, value.to_string());

		response.headers.insert("content-type".into(), "application/json".into());

		response
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Returns a header value by (case-insensitive) name.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
	}
}

/// Failures where no HTTP response was received.
#[derive(Debug, ThisError)]
pub enum TransportFailure {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while contacting the server.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The call exceeded the configured timeout.
	#[error("The server did not respond within {timeout:?}.")]
	Timeout {
		/// Timeout that elapsed.
		timeout: Duration,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while contacting the server.")]
	Io(#[from] std::io::Error),
}
impl TransportFailure {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportFailure {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Redirects are passed through as responses; the pipeline resolves every URL against
/// the configured base and does not follow hops on its own.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client that does not follow redirects.
	pub fn without_redirects() -> Result<Self, crate::error::ConfigError> {
		let client = ReqwestClient::builder().redirect(reqwest::redirect::Policy::none()).build()?;

		Ok(Self(client))
	}

	fn build(&self, request: HttpRequest) -> Result<reqwest::RequestBuilder, TransportFailure> {
		let method = match request.method {
			Method::Get => reqwest::Method::GET,
			Method::Head => reqwest::Method::HEAD,
			Method::Options => reqwest::Method::OPTIONS,
			Method::Post => reqwest::Method::POST,
			Method::Put => reqwest::Method::PUT,
			Method::Patch => reqwest::Method::PATCH,
			Method::Delete => reqwest::Method::DELETE,
		};
		let mut builder = self.0.request(method, request.url);

		for (name, value) in &request.headers {
			builder = builder.header(name.as_str(), value.as_str());
		}

		builder = match request.body {
			RequestBody::Empty => builder,
			RequestBody::Json(bytes) => builder.body(bytes),
			RequestBody::Multipart(file) => {
				let len = file.len();
				let stream = futures_util::stream::iter(file.chunks().map(Ok::<_, std::io::Error>));
				let mut part =
					reqwest::multipart::Part::stream_with_length(reqwest::Body::wrap_stream(stream), len)
						.file_name(file.file_name.clone());

				if let Some(content_type) = file.content_type.as_deref() {
					part = part.mime_str(content_type)?;
				}

				builder.multipart(reqwest::multipart::Form::new().part(file.field.clone(), part))
			},
		};

		Ok(builder)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let response = self.build(request)?.send().await?;
			let status = response.status().as_u16();
			let headers = response
				.headers()
				.iter()
				.filter_map(|(name, value)| {
					value.to_str().ok().map(|value| (name.as_str().to_owned(), value.to_owned()))
				})
				.collect();
			let body = response.bytes().await?.to_vec();

			Ok(HttpResponse { status, headers, body })
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn recording_progress(total: u64) -> (Arc<UploadProgress>, Arc<Mutex<Vec<u8>>>) {
		let seen = Arc::new(Mutex::new(Vec::new()));
		let sink = seen.clone();
		let progress =
			Arc::new(UploadProgress::new(total, move |percent| sink.lock().push(percent)));

		(progress, seen)
	}

	#[test]
	fn upload_chunks_report_monotonic_progress() {
		let bytes = vec![7_u8; 200 * 1024];
		let (progress, seen) = recording_progress(bytes.len() as u64);
		let file = MultipartFile::new("file", "stock.csv", bytes.clone()).with_progress(progress);
		let collected: Vec<u8> = file.chunks().flatten().collect();

		assert_eq!(collected, bytes);

		let seen = seen.lock().clone();

		assert_eq!(seen.last(), Some(&100));
		assert!(
			seen.windows(2).all(|pair| pair[0] < pair[1]),
			"Progress must be strictly increasing: {seen:?}."
		);
	}

	#[test]
	fn empty_upload_reports_completion_once() {
		let (progress, seen) = recording_progress(0);
		let file = MultipartFile::new("file", "empty.txt", Vec::new()).with_progress(progress);

		assert_eq!(file.chunks().count(), 0);
		assert_eq!(*seen.lock(), vec![100]);
	}

	#[test]
	fn request_headers_are_case_insensitive() {
		let url = Url::parse("https://api.example.com/items").expect("Fixture URL should parse.");
		let mut request = HttpRequest::new(Method::Get, url);

		request.set_header("Authorization", "Bearer a.b.c");

		assert_eq!(request.header("authorization"), Some("Bearer a.b.c"));
		assert_eq!(request.remove_header("AUTHORIZATION").as_deref(), Some("Bearer a.b.c"));
		assert!(request.header("authorization").is_none());
	}

	#[test]
	fn only_read_methods_are_safe() {
		assert!(Method::Get.is_safe());
		assert!(Method::Head.is_safe());
		assert!(!Method::Post.is_safe());
		assert!(!Method::Delete.is_safe());
		assert_eq!(Method::Patch.to_string(), "PATCH");
	}
}
