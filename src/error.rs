//! Transport-level error taxonomy surfaced to every caller of the facade.
//!
//! [`Error`] is a closed set: callers match on a finite list of outcomes instead of
//! inspecting raw HTTP payloads. Each variant renders a ready-to-display message via
//! [`Display`]; raw server details stay in fields and never leak into that message.

// self
use crate::{_prelude::*, http::Method};

/// Transport-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Classified outcome of a failed request.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Session expired and could not be renewed; credentials were cleared.
	#[error("Your session has expired. Please sign in again.")]
	AuthExpired,
	/// Server refused the request for lack of a permission (HTTP 403).
	#[error("{}", permission_message(.required_permission.as_deref(), .module.as_deref()))]
	PermissionDenied {
		/// Permission the server reported as required, if any.
		required_permission: Option<String>,
		/// Module the permission belongs to, if reported.
		module: Option<String>,
		/// Request path that was denied.
		endpoint: String,
		/// Request method that was denied.
		method: Method,
		/// Raw server detail, kept for diagnostics.
		detail: Option<String>,
	},
	/// HTTP 404 whose detail reads like an access denial.
	#[error(
		"The requested resource was not found or you do not have access to it. Contact an administrator if you believe this is a mistake."
	)]
	NotFoundOrDenied {
		/// Request path that was rejected.
		endpoint: String,
		/// Request method that was rejected.
		method: Method,
		/// Raw server detail, kept for diagnostics.
		detail: Option<String>,
	},
	/// Plain HTTP 404.
	#[error("The requested resource was not found.")]
	NotFound {
		/// Request path that was not found.
		endpoint: String,
		/// Raw server detail, kept for diagnostics.
		detail: Option<String>,
	},
	/// No response was received (network failure or timeout).
	#[error("Unable to reach the server. Please check your connection and try again.")]
	Connectivity {
		/// Underlying transport failure.
		#[source]
		source: crate::http::TransportFailure,
	},
	/// Any other non-success status, including 5xx after retries were exhausted.
	#[error("The server could not complete the request (status {status}). Please try again later.")]
	Server {
		/// HTTP status code returned by the server.
		status: u16,
		/// Raw server detail, kept for diagnostics.
		detail: Option<String>,
	},
	/// Request could not be prepared locally (bad path, body, or token shape).
	#[error("The request could not be prepared: {reason}.")]
	ClientValidation {
		/// Local reason string; never contains server payloads.
		reason: String,
	},
	/// A success response arrived but its body does not match the expected shape.
	#[error("The server returned a response in an unexpected format.")]
	UnexpectedBody {
		/// HTTP status of the response.
		status: u16,
		/// JSON path of the offending field.
		path: String,
		/// Decoder error description.
		reason: String,
	},
	/// Caller fired the request's cancellation signal.
	#[error("The request was cancelled.")]
	Cancelled,
	/// Local I/O failure while saving a downloaded file.
	#[error("The downloaded file could not be saved.")]
	Io(#[from] std::io::Error),
}
impl Error {
	/// Returns the HTTP status associated with the failure, when one exists.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::AuthExpired => Some(401),
			Self::PermissionDenied { .. } => Some(403),
			Self::NotFoundOrDenied { .. } | Self::NotFound { .. } => Some(404),
			Self::Server { status, .. } | Self::UnexpectedBody { status, .. } => Some(*status),
			Self::Connectivity { .. } | Self::ClientValidation { .. } | Self::Cancelled | Self::Io(_) =>
				None,
		}
	}

	/// Returns the user-facing message for this error.
	pub fn message(&self) -> String {
		self.to_string()
	}

	/// Returns `true` for outcomes that callers should surface as access problems.
	pub fn is_access_denied(&self) -> bool {
		matches!(self, Self::PermissionDenied { .. } | Self::NotFoundOrDenied { .. })
	}

	/// Returns the permission the server reported as missing, if any.
	pub fn required_permission(&self) -> Option<&str> {
		match self {
			Self::PermissionDenied { required_permission, .. } => required_permission.as_deref(),
			_ => None,
		}
	}

	pub(crate) fn client_validation(reason: impl Into<String>) -> Self {
		Self::ClientValidation { reason: reason.into() }
	}
}

fn permission_message(permission: Option<&str>, module: Option<&str>) -> String {
	match (permission, module) {
		(Some(permission), Some(module)) => format!(
			"You do not have permission to perform this action. Required permission: {permission} (module: {module})."
		),
		(Some(permission), None) => format!(
			"You do not have permission to perform this action. Required permission: {permission}."
		),
		(None, Some(module)) => format!(
			"You do not have permission to perform this action in the {module} module."
		),
		(None, None) => "You do not have permission to perform this action.".into(),
	}
}

/// Configuration and validation failures raised while building the transport.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// No base URL was configured.
	#[error("Missing base URL.")]
	MissingBaseUrl,
	/// Base URL cannot be parsed.
	#[error("Base URL is invalid.")]
	InvalidBaseUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Base URL must use HTTPS unless insecure URLs are explicitly allowed.
	#[error("The base URL must use HTTPS: {url}.")]
	InsecureBaseUrl {
		/// URL that failed validation.
		url: String,
	},
	/// Base URL cannot carry a query or fragment.
	#[error("The base URL must not carry a query or fragment: {url}.")]
	BaseUrlHasQuery {
		/// URL that failed validation.
		url: String,
	},
	/// Request timeout must be positive.
	#[error("The request timeout must be greater than zero.")]
	ZeroTimeout,
	/// Refresh endpoint path must be relative to the base URL.
	#[error("The refresh path must be relative to the base URL: {path}.")]
	AbsoluteRefreshPath {
		/// Offending path.
		path: String,
	},
	/// Refresh endpoint path cannot be joined onto the base URL.
	#[error("The refresh path cannot be resolved against the base URL: {path}.")]
	InvalidRefreshPath {
		/// Offending path.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Environment variable holds an unusable value.
	#[error("Environment variable `{var}` has an invalid value: {value}.")]
	InvalidEnv {
		/// Variable name.
		var: &'static str,
		/// Raw value found in the environment.
		value: String,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}
