//! Transport facade consumed by feature code.
//!
//! [`ApiClient`] owns the collaborators and exposes verb helpers plus
//! [`ApiClient::send`] for full control. Each call runs the ordered pipeline in
//! `pipeline`: attach auth, dispatch with a timeout, retry transient failures,
//! recover from 401 through the shared [`RefreshCoordinator`], then classify.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use bearer_transport::{config::TransportConfig, http::ReqwestTransport, transport::ApiClient};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TransportConfig::from_env()?;
//! let client = ApiClient::builder(config, Arc::new(ReqwestTransport::without_redirects()?)).build()?;
//! let products: serde_json::Value = client.get("products").await?.data;
//! # let _ = products;
//! # Ok(())
//! # }
//! ```

mod download;
mod pipeline;
mod request;
mod upload;

pub use download::*;
pub use request::*;
pub use upload::*;

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::AuthAttacher,
	classify::ErrorClassifier,
	config::TransportConfig,
	error::ConfigError,
	http::{HttpTransport, Method},
	obs::{AuditSink, TracingAuditSink},
	refresh::{EndpointRefresher, RefreshCoordinator, RefreshMetrics, TokenRefresher},
	session::{LoginRedirect, SessionObserver},
	store::{MemoryTokenStore, TokenStore},
};

/// Shared HTTP client. Cheap to clone; clones share the refresh coordinator.
#[derive(Clone)]
pub struct ApiClient {
	config: Arc<TransportConfig>,
	transport: Arc<dyn HttpTransport>,
	store: Arc<dyn TokenStore>,
	attacher: AuthAttacher,
	coordinator: Arc<RefreshCoordinator>,
	classifier: ErrorClassifier,
}
impl ApiClient {
	/// Starts a builder over `config` and `transport`.
	pub fn builder(config: TransportConfig, transport: Arc<dyn HttpTransport>) -> ApiClientBuilder {
		ApiClientBuilder {
			config,
			transport,
			store: None,
			audit: None,
			session: None,
			refresher: None,
			coordinator: None,
		}
	}

	/// Active configuration.
	pub fn config(&self) -> &TransportConfig {
		&self.config
	}

	/// Token store the client reads credentials from.
	pub fn store(&self) -> &Arc<dyn TokenStore> {
		&self.store
	}

	/// Refresh coordinator shared by every clone of this client.
	pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
		&self.coordinator
	}

	/// Refresh counters.
	pub fn refresh_metrics(&self) -> &Arc<RefreshMetrics> {
		self.coordinator.metrics()
	}

	/// Sends a prepared request and decodes the JSON response.
	pub async fn send<T>(&self, request: ApiRequest) -> Result<ApiResponse<T>>
	where
		T: DeserializeOwned,
	{
		let response = self.execute(request).await?;

		ApiResponse::decode(response)
	}

	/// `GET path`.
	pub async fn get<T>(&self, path: &str) -> Result<ApiResponse<T>>
	where
		T: DeserializeOwned,
	{
		self.send(ApiRequest::new(Method::Get, path)).await
	}

	/// `POST path` with a JSON body.
	pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<ApiResponse<T>>
	where
		B: ?Sized + Serialize,
		T: DeserializeOwned,
	{
		self.send(ApiRequest::new(Method::Post, path).json(body)?).await
	}

	/// `PUT path` with a JSON body.
	pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<ApiResponse<T>>
	where
		B: ?Sized + Serialize,
		T: DeserializeOwned,
	{
		self.send(ApiRequest::new(Method::Put, path).json(body)?).await
	}

	/// `PATCH path` with a JSON body.
	pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<ApiResponse<T>>
	where
		B: ?Sized + Serialize,
		T: DeserializeOwned,
	{
		self.send(ApiRequest::new(Method::Patch, path).json(body)?).await
	}

	/// `DELETE path`.
	pub async fn delete<T>(&self, path: &str) -> Result<ApiResponse<T>>
	where
		T: DeserializeOwned,
	{
		self.send(ApiRequest::new(Method::Delete, path)).await
	}
}
impl Debug for ApiClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("base_url", &self.config.base_url.as_str())
			.field("coordinator", &self.coordinator)
			.finish()
	}
}

/// Builder for [`ApiClient`].
///
/// Unset collaborators default to [`MemoryTokenStore`], [`TracingAuditSink`],
/// [`LoginRedirect`], and an [`EndpointRefresher`] posting to the configured
/// refresh path.
pub struct ApiClientBuilder {
	config: TransportConfig,
	transport: Arc<dyn HttpTransport>,
	store: Option<Arc<dyn TokenStore>>,
	audit: Option<Arc<dyn AuditSink>>,
	session: Option<Arc<dyn SessionObserver>>,
	refresher: Option<Arc<dyn TokenRefresher>>,
	coordinator: Option<Arc<RefreshCoordinator>>,
}
impl ApiClientBuilder {
	/// Sets the token store.
	pub fn store(mut self, store: Arc<dyn TokenStore>) -> Self {
		self.store = Some(store);

		self
	}

	/// Sets the audit sink.
	pub fn audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
		self.audit = Some(audit);

		self
	}

	/// Sets the session observer notified on session termination.
	pub fn session_observer(mut self, session: Arc<dyn SessionObserver>) -> Self {
		self.session = Some(session);

		self
	}

	/// Replaces the refresh endpoint client.
	pub fn refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
		self.refresher = Some(refresher);

		self
	}

	/// Shares an existing coordinator, so several clients refresh as one session.
	///
	/// The coordinator brings its own store, refresher, and session observer; the
	/// client must be configured with the same store.
	pub fn coordinator(mut self, coordinator: Arc<RefreshCoordinator>) -> Self {
		self.coordinator = Some(coordinator);

		self
	}

	/// Wires the collaborators.
	pub fn build(self) -> Result<ApiClient, ConfigError> {
		let store = self.store.unwrap_or_else(|| Arc::new(MemoryTokenStore::default()));
		let coordinator = match self.coordinator {
			Some(coordinator) => coordinator,
			None => {
				let refresher = match self.refresher {
					Some(refresher) => refresher,
					None => Arc::new(EndpointRefresher::new(
						self.transport.clone(),
						self.config.refresh_url()?,
						self.config.timeout,
					)),
				};
				let session = self.session.unwrap_or_else(|| Arc::new(LoginRedirect::default()));

				Arc::new(
					RefreshCoordinator::new(
						store.clone(),
						refresher,
						session,
						self.config.login_path.clone(),
					)
					.with_timeout(self.config.timeout),
				)
			},
		};
		let audit = self.audit.unwrap_or_else(|| Arc::new(TracingAuditSink));

		Ok(ApiClient {
			config: Arc::new(self.config),
			transport: self.transport,
			store,
			attacher: AuthAttacher,
			coordinator,
			classifier: ErrorClassifier::new(audit),
		})
	}
}
impl Debug for ApiClientBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClientBuilder").field("config", &self.config).finish()
	}
}
