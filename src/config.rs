//! Environment-provided transport configuration.
//!
//! [`TransportConfig`] carries the base URL, the per-call timeout, and the retry
//! schedule. Values are validated once at build time so the pipeline never has to
//! second-guess them.

// self
use crate::{_prelude::*, error::ConfigError, retry::RetryPolicy};

/// Validated configuration consumed by [`ApiClient`](crate::transport::ApiClient).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportConfig {
	/// Base URL every relative path resolves against; always ends with `/`.
	pub base_url: Url,
	/// Upper bound applied to each network call, including the refresh call.
	pub timeout: Duration,
	/// Retry schedule for transient failures.
	pub retry: RetryPolicy,
	/// Refresh endpoint path, relative to [`base_url`](Self::base_url).
	pub refresh_path: String,
	/// Login entry point signalled when the session terminates.
	pub login_path: String,
}
impl TransportConfig {
	/// Environment variable holding the base URL.
	pub const ENV_BASE_URL: &'static str = "API_BASE_URL";
	/// Environment variable holding the request timeout in seconds.
	pub const ENV_TIMEOUT_SECS: &'static str = "API_TIMEOUT_SECS";
	/// Environment variable that allows plain-HTTP base URLs when set to `true`/`1`.
	pub const ENV_ALLOW_INSECURE: &'static str = "API_ALLOW_INSECURE";

	/// Creates a new builder.
	pub fn builder() -> TransportConfigBuilder {
		TransportConfigBuilder::default()
	}

	/// Builds a configuration from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|var| std::env::var(var).ok())
	}

	/// Builds a configuration from an arbitrary variable lookup.
	pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
		let raw_base = lookup(Self::ENV_BASE_URL).ok_or(ConfigError::MissingBaseUrl)?;
		let base_url =
			Url::parse(raw_base.trim()).map_err(|source| ConfigError::InvalidBaseUrl { source })?;
		let mut builder = Self::builder().base_url(base_url);

		if let Some(raw) = lookup(Self::ENV_TIMEOUT_SECS) {
			let secs = raw.trim().parse::<u64>().map_err(|_| ConfigError::InvalidEnv {
				var: Self::ENV_TIMEOUT_SECS,
				value: raw.clone(),
			})?;

			builder = builder.timeout(Duration::from_secs(secs));
		}
		if let Some(raw) = lookup(Self::ENV_ALLOW_INSECURE) {
			let allow = match raw.trim().to_ascii_lowercase().as_str() {
				"1" | "true" | "yes" => true,
				"0" | "false" | "no" | "" => false,
				_ => return Err(ConfigError::InvalidEnv { var: Self::ENV_ALLOW_INSECURE, value: raw }),
			};

			builder = builder.allow_insecure(allow);
		}

		builder.build()
	}

	/// Resolves `path` against the base URL.
	///
	/// Leading slashes are ignored so `"/products"` and `"products"` both land under
	/// the base path. Only `http`/`https` URLs count as absolute, and those are
	/// rejected unless they share the base origin. Anything else, including
	/// `"products:search"`, is a path segment under the base.
	pub fn resolve(&self, path: &str) -> Result<Url, Error> {
		let resolved = match Url::parse(path) {
			Ok(absolute) if matches!(absolute.scheme(), "http" | "https") => absolute,
			_ => self
				.base_url
				.join(&format!("./{}", path.trim_start_matches('/')))
				.map_err(|e| Error::client_validation(format!("path `{path}` cannot be resolved: {e}")))?,
		};

		if resolved.origin() != self.base_url.origin() {
			return Err(Error::client_validation(format!(
				"URL {resolved} does not share the configured origin"
			)));
		}

		Ok(resolved)
	}

	/// Absolute URL of the refresh endpoint.
	pub fn refresh_url(&self) -> Result<Url, ConfigError> {
		self.base_url.join(self.refresh_path.trim_start_matches('/')).map_err(|source| {
			ConfigError::InvalidRefreshPath { path: self.refresh_path.clone(), source }
		})
	}
}

/// Builder for [`TransportConfig`] values.
#[derive(Debug)]
pub struct TransportConfigBuilder {
	/// Base URL for the environment.
	pub base_url: Option<Url>,
	/// Per-call timeout.
	pub timeout: Duration,
	/// Retry schedule.
	pub retry: RetryPolicy,
	/// Refresh endpoint path.
	pub refresh_path: String,
	/// Login entry point.
	pub login_path: String,
	/// Accept plain-HTTP base URLs (development and tests only).
	pub allow_insecure: bool,
}
impl TransportConfigBuilder {
	/// Long enough for slow report generation, short enough to bound the refresh queue.
	pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
	/// Default refresh endpoint path.
	pub const DEFAULT_REFRESH_PATH: &'static str = "auth/refresh-token";
	/// Default login entry point.
	pub const DEFAULT_LOGIN_PATH: &'static str = "/login";

	/// Sets the base URL.
	pub fn base_url(mut self, url: Url) -> Self {
		self.base_url = Some(url);

		self
	}

	/// Overrides the per-call timeout.
	pub fn timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Replaces the retry policy.
	pub fn retry(mut self, retry: RetryPolicy) -> Self {
		self.retry = retry;

		self
	}

	/// Overrides the base delay of the retry policy.
	pub fn retry_base_delay(mut self, delay: Duration) -> Self {
		self.retry.base_delay = delay;

		self
	}

	/// Enables or disables backoff jitter.
	pub fn retry_jitter(mut self, jitter: bool) -> Self {
		self.retry.jitter = jitter;

		self
	}

	/// Overrides the refresh endpoint path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.refresh_path = path.into();

		self
	}

	/// Overrides the login entry point.
	pub fn login_path(mut self, path: impl Into<String>) -> Self {
		self.login_path = path.into();

		self
	}

	/// Allows plain-HTTP base URLs.
	pub fn allow_insecure(mut self, allow: bool) -> Self {
		self.allow_insecure = allow;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<TransportConfig, ConfigError> {
		let mut base_url = self.base_url.ok_or(ConfigError::MissingBaseUrl)?;

		if base_url.scheme() != "https" && !(self.allow_insecure && base_url.scheme() == "http") {
			return Err(ConfigError::InsecureBaseUrl { url: base_url.to_string() });
		}
		if base_url.query().is_some() || base_url.fragment().is_some() {
			return Err(ConfigError::BaseUrlHasQuery { url: base_url.to_string() });
		}
		if !base_url.path().ends_with('/') {
			let path = format!("{}/", base_url.path());

			base_url.set_path(&path);
		}
		if self.timeout.is_zero() {
			return Err(ConfigError::ZeroTimeout);
		}
		if Url::parse(&self.refresh_path).is_ok() {
			return Err(ConfigError::AbsoluteRefreshPath { path: self.refresh_path });
		}

		let config = TransportConfig {
			base_url,
			timeout: self.timeout,
			retry: self.retry,
			refresh_path: self.refresh_path,
			login_path: self.login_path,
		};

		config.refresh_url()?;

		Ok(config)
	}
}
impl Default for TransportConfigBuilder {
	fn default() -> Self {
		Self {
			base_url: None,
			timeout: Self::DEFAULT_TIMEOUT,
			retry: RetryPolicy::default(),
			refresh_path: Self::DEFAULT_REFRESH_PATH.into(),
			login_path: Self::DEFAULT_LOGIN_PATH.into(),
			allow_insecure: false,
		}
	}
}
