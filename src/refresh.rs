//! Single-flight session refresh with a queue of suspended requests.
//!
//! The first request to observe a 401 becomes the leader: it flips the coordinator
//! into [`RefreshStatus::Refreshing`] and starts exactly one call to the refresh
//! endpoint. Every other 401 that arrives while that call is in flight is parked in
//! the queue and resolved with the same outcome. The state check and the transition
//! happen under one synchronous lock, so two requests can never both become leader.
//!
//! The refresh call runs on its own task. Cancelling the request that triggered it
//! only removes that request from the queue; the remaining waiters still get an
//! answer.

mod endpoint;
mod metrics;

pub use endpoint::*;
pub use metrics::RefreshMetrics;

// std
use std::sync::atomic::{AtomicU64, Ordering};
// crates.io
use tokio::sync::oneshot;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	http::Method,
	obs::{self, Stage, StageOutcome},
	session::{SessionObserver, SessionTermination, TerminationReason},
	store::TokenStore,
};

type Outcome = std::result::Result<TokenSecret, RefreshFailure>;

/// Reasons a refresh episode can end without a usable access token.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum RefreshFailure {
	/// No refresh token was stored when the 401 arrived.
	#[error("No refresh token is stored.")]
	MissingRefreshToken,
	/// The refresh endpoint answered with a non-success status.
	#[error("Refresh endpoint rejected the refresh token with status {status}.")]
	Rejected {
		/// HTTP status returned by the refresh endpoint.
		status: u16,
	},
	/// The refresh endpoint could not be reached.
	#[error("Refresh endpoint could not be reached: {message}.")]
	Unreachable {
		/// Transport failure description.
		message: String,
	},
	/// The refresh request body could not be encoded.
	#[error("Refresh request could not be encoded: {message}.")]
	MalformedRequest {
		/// Encoder error description.
		message: String,
	},
	/// The refresh endpoint returned a body that does not match the expected shape.
	#[error("Refresh endpoint returned a malformed body at `{path}`: {message}.")]
	MalformedResponse {
		/// JSON path of the offending field.
		path: String,
		/// Decoder error description.
		message: String,
	},
	/// The refresh endpoint returned an access token that is not a three-part token.
	#[error("Refresh endpoint returned an invalid access token: {reason}.")]
	InvalidAccessToken {
		/// Shape violation.
		reason: String,
	},
	/// The token store could not be read.
	#[error("Token store failed: {message}.")]
	Store {
		/// Store error description.
		message: String,
	},
	/// The refresh task panicked or was aborted before producing an outcome.
	#[error("Refresh task stopped before producing an outcome.")]
	Interrupted,
	/// Coordination was reset before the episode settled.
	#[error("Refresh coordination was reset before the refresh settled.")]
	Reset,
}
impl RefreshFailure {
	fn termination_reason(&self) -> Option<TerminationReason> {
		match self {
			Self::MissingRefreshToken => Some(TerminationReason::MissingRefreshToken),
			Self::Reset => None,
			_ => Some(TerminationReason::RefreshFailed),
		}
	}
}

/// Snapshot of the coordinator state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshStatus {
	/// No refresh is in flight.
	Idle,
	/// A refresh is in flight.
	Refreshing {
		/// Requests waiting on the outcome, the leader included.
		queued: usize,
	},
}

/// Request parked while a refresh is in flight.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueuedRequest {
	/// Method of the suspended request.
	pub method: Method,
	/// URL of the suspended request.
	pub url: Url,
}

struct PendingRequest {
	id: u64,
	request: QueuedRequest,
	tx: oneshot::Sender<Outcome>,
}

enum RefreshState {
	Idle,
	Refreshing { episode: u64, waiters: Vec<PendingRequest> },
}

enum Admission {
	Queued { id: u64, rx: oneshot::Receiver<Outcome> },
	Leader { id: u64, rx: oneshot::Receiver<Outcome>, episode: u64, refresh_token: TokenSecret },
	Refused(RefreshFailure),
}

/// Coordinates access-token renewal across concurrent requests.
pub struct RefreshCoordinator {
	store: Arc<dyn TokenStore>,
	refresher: Arc<dyn TokenRefresher>,
	session: Arc<dyn SessionObserver>,
	login_path: String,
	timeout: Duration,
	state: Mutex<RefreshState>,
	next_waiter: AtomicU64,
	next_episode: AtomicU64,
	metrics: Arc<RefreshMetrics>,
}
impl RefreshCoordinator {
	/// Upper bound on a single refresh call unless [`with_timeout`](Self::with_timeout) overrides it.
	pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

	/// Creates an idle coordinator.
	pub fn new(
		store: Arc<dyn TokenStore>,
		refresher: Arc<dyn TokenRefresher>,
		session: Arc<dyn SessionObserver>,
		login_path: impl Into<String>,
	) -> Self {
		Self {
			store,
			refresher,
			session,
			login_path: login_path.into(),
			timeout: Self::DEFAULT_TIMEOUT,
			state: Mutex::new(RefreshState::Idle),
			next_waiter: AtomicU64::new(0),
			next_episode: AtomicU64::new(0),
			metrics: Default::default(),
		}
	}

	/// Bounds each refresh call; an elapsed call fails as [`RefreshFailure::Unreachable`].
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Refresh counters.
	pub fn metrics(&self) -> &Arc<RefreshMetrics> {
		&self.metrics
	}

	/// Current state.
	pub fn status(&self) -> RefreshStatus {
		match &*self.state.lock() {
			RefreshState::Idle => RefreshStatus::Idle,
			RefreshState::Refreshing { waiters, .. } =>
				RefreshStatus::Refreshing { queued: waiters.len() },
		}
	}

	/// Requests currently waiting on the in-flight refresh, in arrival order.
	pub fn queued_requests(&self) -> Vec<QueuedRequest> {
		match &*self.state.lock() {
			RefreshState::Idle => Vec::new(),
			RefreshState::Refreshing { waiters, .. } =>
				waiters.iter().map(|waiter| waiter.request.clone()).collect(),
		}
	}

	/// Waits for a fresh access token on behalf of a request that received a 401.
	///
	/// Starts a refresh when none is in flight, otherwise joins the in-flight one.
	/// On failure the store has already been cleared and the session observer
	/// notified by the time this returns.
	pub async fn recover(self: &Arc<Self>, method: Method, url: &Url) -> Outcome {
		obs::record_stage(Stage::Refresh, StageOutcome::Attempt);

		let request = QueuedRequest { method, url: url.clone() };
		let (id, rx) = match self.admit(request) {
			Admission::Queued { id, rx } => {
				self.metrics.record_queued();
				trace_event!(debug, method = method.as_str(), path = url.path(), "Queued behind refresh.");

				(id, rx)
			},
			Admission::Leader { id, rx, episode, refresh_token } => {
				let coordinator = Arc::clone(self);

				tokio::spawn(async move { coordinator.run(episode, refresh_token).await });

				(id, rx)
			},
			Admission::Refused(failure) => {
				self.terminate_on(&failure);
				obs::record_stage(Stage::Refresh, StageOutcome::Failure);

				return Err(failure);
			},
		};
		let mut guard = WaiterGuard { coordinator: self, id, armed: true };
		let outcome = rx.await.unwrap_or(Err(RefreshFailure::Reset));

		guard.armed = false;

		match &outcome {
			Ok(_) => obs::record_stage(Stage::Refresh, StageOutcome::Success),
			Err(_) => obs::record_stage(Stage::Refresh, StageOutcome::Failure),
		}

		outcome
	}

	/// Drops every waiter (they observe [`RefreshFailure::Reset`]) and returns to idle.
	///
	/// An in-flight refresh keeps running, but its outcome is discarded.
	pub fn reset(&self) {
		let previous = std::mem::replace(&mut *self.state.lock(), RefreshState::Idle);

		if let RefreshState::Refreshing { episode: _episode, waiters } = previous {
			trace_event!(info, episode = _episode, dropped = waiters.len(), "Refresh coordination reset.");

			drop(waiters);
		}
	}

	/// Clears stored credentials and signals the session observer.
	pub fn terminate(&self, reason: TerminationReason) {
		if let Err(_e) = self.store.clear_all() {
			trace_event!(warn, error = %_e, "Failed to clear credentials on session termination.");
		}

		self.session.session_terminated(SessionTermination {
			reason,
			redirect_to: self.login_path.clone(),
			at: OffsetDateTime::now_utc(),
		});
	}

	fn admit(&self, request: QueuedRequest) -> Admission {
		let mut state = self.state.lock();
		let id = self.next_waiter.fetch_add(1, Ordering::Relaxed);
		let (tx, rx) = oneshot::channel();
		let pending = PendingRequest { id, request, tx };

		match &mut *state {
			RefreshState::Refreshing { waiters, .. } => {
				waiters.push(pending);

				Admission::Queued { id, rx }
			},
			RefreshState::Idle => {
				let refresh_token = match self.store.refresh_token() {
					Ok(Some(token)) if !token.is_absent() => token,
					Ok(_) => return Admission::Refused(RefreshFailure::MissingRefreshToken),
					Err(e) => return Admission::Refused(RefreshFailure::Store { message: e.to_string() }),
				};
				let episode = self.next_episode.fetch_add(1, Ordering::Relaxed);

				*state = RefreshState::Refreshing { episode, waiters: vec![pending] };

				Admission::Leader { id, rx, episode, refresh_token }
			},
		}
	}

	async fn run(&self, episode: u64, refresh_token: TokenSecret) {
		self.metrics.record_call();
		trace_event!(info, episode, "Refreshing session.");

		let mut guard = EpisodeGuard { coordinator: self, episode, armed: true };
		let outcome =
			match tokio::time::timeout(self.timeout, self.refresher.refresh(refresh_token)).await {
				Ok(outcome) => outcome,
				Err(_) => Err(RefreshFailure::Unreachable {
					message: format!("no response within {:?}", self.timeout),
				}),
			};

		guard.armed = false;

		match &outcome {
			Ok(_) => self.metrics.record_success(),
			Err(_) => self.metrics.record_failure(),
		}

		self.settle(episode, outcome);
	}

	fn settle(&self, episode: u64, outcome: std::result::Result<RefreshedTokens, RefreshFailure>) {
		let waiters = {
			let mut state = self.state.lock();

			match &*state {
				RefreshState::Refreshing { episode: current, .. } if *current == episode => {},
				_ => {
					trace_event!(debug, episode, "Discarding outcome of a reset refresh.");

					return;
				},
			}

			// Credentials change before the state leaves `Refreshing`, so the next
			// leader always reads the rotated refresh token.
			if let Ok(tokens) = &outcome {
				self.persist(tokens);
			} else if let Err(_e) = self.store.clear_all() {
				trace_event!(warn, error = %_e, "Failed to clear credentials after refresh failure.");
			}

			match std::mem::replace(&mut *state, RefreshState::Idle) {
				RefreshState::Refreshing { waiters, .. } => waiters,
				RefreshState::Idle => Vec::new(),
			}
		};

		match outcome {
			Ok(tokens) => {
				trace_event!(info, episode, resumed = waiters.len(), "Session refreshed.");

				for waiter in waiters {
					let _ = waiter.tx.send(Ok(tokens.access_token.clone()));
				}
			},
			Err(failure) => {
				trace_event!(warn, episode, rejected = waiters.len(), "Session refresh failed: {failure}");

				if let Some(reason) = failure.termination_reason() {
					self.session.session_terminated(SessionTermination {
						reason,
						redirect_to: self.login_path.clone(),
						at: OffsetDateTime::now_utc(),
					});
				}

				for waiter in waiters {
					let _ = waiter.tx.send(Err(failure.clone()));
				}
			},
		}
	}

	fn persist(&self, tokens: &RefreshedTokens) {
		if let Err(_e) = self.store.set_access_token(tokens.access_token.clone()) {
			trace_event!(warn, error = %_e, "Refreshed access token could not be persisted.");
		}
		let Some(rotated) = &tokens.refresh_token else {
			return;
		};

		if let Err(_e) = self.store.set_refresh_token(rotated.clone()) {
			trace_event!(warn, error = %_e, "Rotated refresh token could not be persisted.");
		}
	}

	fn terminate_on(&self, failure: &RefreshFailure) {
		trace_event!(info, "Refresh refused: {failure}");

		if let Some(reason) = failure.termination_reason() {
			self.terminate(reason);
		}
	}

	fn abandon(&self, id: u64) {
		if let RefreshState::Refreshing { waiters, .. } = &mut *self.state.lock() {
			waiters.retain(|waiter| waiter.id != id);
		}
	}
}
impl Debug for RefreshCoordinator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshCoordinator")
			.field("status", &self.status())
			.field("login_path", &self.login_path)
			.field("timeout", &self.timeout)
			.finish()
	}
}

/// Settles the episode as [`RefreshFailure::Interrupted`] when the refresh task unwinds or is
/// dropped before producing an outcome.
struct EpisodeGuard<'a> {
	coordinator: &'a RefreshCoordinator,
	episode: u64,
	armed: bool,
}
impl Drop for EpisodeGuard<'_> {
	fn drop(&mut self) {
		if self.armed {
			self.coordinator.metrics.record_failure();
			self.coordinator.settle(self.episode, Err(RefreshFailure::Interrupted));
		}
	}
}

/// Removes a cancelled waiter from the queue.
struct WaiterGuard<'a> {
	coordinator: &'a RefreshCoordinator,
	id: u64,
	armed: bool,
}
impl Drop for WaiterGuard<'_> {
	fn drop(&mut self) {
		if self.armed {
			self.coordinator.abandon(self.id);
		}
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::AtomicUsize;
	// crates.io
	use tokio::sync::Semaphore;
	// self
	use super::*;
	use crate::{
		_preludet::{ACCESS_TOKEN, REFRESH_TOKEN, REFRESHED_TOKEN},
		auth::Credentials,
		session::RecordingSessionObserver,
		store::MemoryTokenStore,
	};

	struct GatedRefresher {
		calls: AtomicUsize,
		gate: Semaphore,
		outcome: std::result::Result<RefreshedTokens, RefreshFailure>,
	}
	impl GatedRefresher {
		fn new(outcome: std::result::Result<RefreshedTokens, RefreshFailure>) -> Arc<Self> {
			Arc::new(Self { calls: AtomicUsize::new(0), gate: Semaphore::new(0), outcome })
		}

		fn release(&self) {
			self.gate.add_permits(1);
		}

		fn calls(&self) -> usize {
			self.calls.load(Ordering::SeqCst)
		}
	}
	impl TokenRefresher for GatedRefresher {
		fn refresh(&self, refresh_token: TokenSecret) -> RefreshFuture<'_> {
			Box::pin(async move {
				assert_eq!(refresh_token.expose(), REFRESH_TOKEN);

				self.calls.fetch_add(1, Ordering::SeqCst);

				self.gate.acquire().await.expect("Gate should stay open.").forget();

				self.outcome.clone()
			})
		}
	}

	struct Fixture {
		coordinator: Arc<RefreshCoordinator>,
		store: Arc<MemoryTokenStore>,
		session: Arc<RecordingSessionObserver>,
	}

	/// Panics on its first call, then hands out fresh tokens.
	#[derive(Default)]
	struct PanickingRefresher {
		calls: AtomicUsize,
	}
	impl TokenRefresher for PanickingRefresher {
		fn refresh(&self, _: TokenSecret) -> RefreshFuture<'_> {
			Box::pin(async move {
				if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
					panic!("refresher blew up");
				}

				Ok(refreshed())
			})
		}
	}

	struct StalledRefresher;
	impl TokenRefresher for StalledRefresher {
		fn refresh(&self, _: TokenSecret) -> RefreshFuture<'_> {
			Box::pin(std::future::pending())
		}
	}

	fn fixture(refresher: Arc<dyn TokenRefresher>) -> Fixture {
		let store = Arc::new(MemoryTokenStore::default());

		store
			.set_credentials(Credentials::new(ACCESS_TOKEN, REFRESH_TOKEN))
			.expect("Memory store should accept credentials.");

		let session = Arc::new(RecordingSessionObserver::default());
		let coordinator = Arc::new(RefreshCoordinator::new(
			store.clone(),
			refresher,
			session.clone(),
			"/login",
		));

		Fixture { coordinator, store, session }
	}

	fn refreshed() -> RefreshedTokens {
		RefreshedTokens {
			access_token: TokenSecret::new(REFRESHED_TOKEN),
			refresh_token: Some(TokenSecret::new("refresh-opaque-2")),
		}
	}

	fn url(path: &str) -> Url {
		Url::parse("https://api.test/api/v1/").and_then(|base| base.join(path)).expect("Test URL should parse.")
	}

	async fn wait_for_queue(coordinator: &RefreshCoordinator, queued: usize) {
		while coordinator.status() != (RefreshStatus::Refreshing { queued }) {
			tokio::task::yield_now().await;
		}
	}

	#[tokio::test]
	async fn concurrent_recoveries_share_one_refresh_call() {
		let refresher = GatedRefresher::new(Ok(refreshed()));
		let Fixture { coordinator, store, session } = fixture(refresher.clone());
		let shared = coordinator.clone();
		let waits = tokio::spawn(async move {
			let (products, orders, users) = (url("products"), url("orders"), url("users"));

			tokio::join!(
				shared.recover(Method::Get, &products),
				shared.recover(Method::Get, &orders),
				shared.recover(Method::Get, &users),
			)
		});

		wait_for_queue(&coordinator, 3).await;

		let queued: Vec<_> =
			coordinator.queued_requests().into_iter().map(|request| request.url.path().to_owned()).collect();

		assert_eq!(queued, vec!["/api/v1/products", "/api/v1/orders", "/api/v1/users"]);

		refresher.release();

		let (first, second, third) = waits.await.expect("Waiters should join.");

		for outcome in [first, second, third] {
			assert_eq!(outcome.expect("Every waiter should get the token.").expose(), REFRESHED_TOKEN);
		}

		assert_eq!(refresher.calls(), 1);
		assert_eq!(coordinator.metrics().calls(), 1);
		assert_eq!(coordinator.metrics().queued(), 2);
		assert_eq!(coordinator.status(), RefreshStatus::Idle);
		assert_eq!(
			store.access_token().expect("Read should succeed."),
			Some(TokenSecret::new(REFRESHED_TOKEN))
		);
		assert_eq!(
			store.refresh_token().expect("Read should succeed."),
			Some(TokenSecret::new("refresh-opaque-2"))
		);
		assert!(session.events().is_empty());
	}

	#[tokio::test]
	async fn failed_refresh_rejects_every_waiter_and_terminates_once() {
		let refresher = GatedRefresher::new(Err(RefreshFailure::Rejected { status: 401 }));
		let Fixture { coordinator, store, session } = fixture(refresher.clone());
		let shared = coordinator.clone();
		let waits = tokio::spawn(async move {
			let (products, orders) = (url("products"), url("orders"));

			tokio::join!(
				shared.recover(Method::Get, &products),
				shared.recover(Method::Post, &orders),
			)
		});

		wait_for_queue(&coordinator, 2).await;
		refresher.release();

		let (first, second) = waits.await.expect("Waiters should join.");

		assert_eq!(first, Err(RefreshFailure::Rejected { status: 401 }));
		assert_eq!(second, Err(RefreshFailure::Rejected { status: 401 }));
		assert_eq!(store.access_token().expect("Read should succeed."), None);
		assert_eq!(store.refresh_token().expect("Read should succeed."), None);

		let events = session.events();

		assert_eq!(events.len(), 1);
		assert_eq!(events[0].reason, TerminationReason::RefreshFailed);
		assert_eq!(events[0].redirect_to, "/login");
		assert_eq!(coordinator.metrics().failures(), 1);
	}

	#[tokio::test]
	async fn missing_refresh_token_skips_the_network() {
		let refresher = GatedRefresher::new(Ok(refreshed()));
		let Fixture { coordinator, store, session } = fixture(refresher.clone());

		store.clear_all().expect("Clear should succeed.");
		store.set_access_token(TokenSecret::new(ACCESS_TOKEN)).expect("Write should succeed.");

		let outcome = coordinator.recover(Method::Get, &url("products")).await;

		assert_eq!(outcome, Err(RefreshFailure::MissingRefreshToken));
		assert_eq!(refresher.calls(), 0);
		assert_eq!(store.access_token().expect("Read should succeed."), None);
		assert_eq!(session.events()[0].reason, TerminationReason::MissingRefreshToken);
		assert_eq!(coordinator.status(), RefreshStatus::Idle);
	}

	#[tokio::test]
	async fn cancelled_waiter_leaves_the_queue() {
		let refresher = GatedRefresher::new(Ok(refreshed()));
		let Fixture { coordinator, .. } = fixture(refresher.clone());
		let shared = coordinator.clone();
		let leader = tokio::spawn(async move { shared.recover(Method::Get, &url("products")).await });

		wait_for_queue(&coordinator, 1).await;

		let cancelled =
			tokio::time::timeout(Duration::from_millis(5), coordinator.recover(Method::Get, &url("orders")))
				.await;

		assert!(cancelled.is_err());
		assert_eq!(coordinator.status(), RefreshStatus::Refreshing { queued: 1 });

		refresher.release();

		let outcome = leader.await.expect("Leader should join.");

		assert_eq!(outcome.expect("Leader should get the token.").expose(), REFRESHED_TOKEN);
	}

	#[tokio::test]
	async fn cancelled_leader_does_not_cancel_the_refresh() {
		let refresher = GatedRefresher::new(Ok(refreshed()));
		let Fixture { coordinator, store, .. } = fixture(refresher.clone());
		let shared = coordinator.clone();
		let leader = tokio::spawn(async move { shared.recover(Method::Get, &url("products")).await });

		wait_for_queue(&coordinator, 1).await;

		let shared = coordinator.clone();
		let follower = tokio::spawn(async move { shared.recover(Method::Get, &url("orders")).await });

		wait_for_queue(&coordinator, 2).await;
		leader.abort();

		let _ = leader.await;

		wait_for_queue(&coordinator, 1).await;
		refresher.release();

		let outcome = follower.await.expect("Follower should join.");

		assert_eq!(outcome.expect("Follower should get the token.").expose(), REFRESHED_TOKEN);
		assert_eq!(
			store.access_token().expect("Read should succeed."),
			Some(TokenSecret::new(REFRESHED_TOKEN))
		);
	}

	#[tokio::test]
	async fn reset_releases_waiters_and_discards_the_late_outcome() {
		let refresher = GatedRefresher::new(Ok(refreshed()));
		let Fixture { coordinator, store, session } = fixture(refresher.clone());
		let shared = coordinator.clone();
		let waiter = tokio::spawn(async move { shared.recover(Method::Get, &url("products")).await });

		wait_for_queue(&coordinator, 1).await;
		coordinator.reset();

		assert_eq!(waiter.await.expect("Waiter should join."), Err(RefreshFailure::Reset));
		assert_eq!(coordinator.status(), RefreshStatus::Idle);

		refresher.release();

		while refresher.calls() == 0 || coordinator.metrics().successes() == 0 {
			tokio::task::yield_now().await;
		}

		assert_eq!(
			store.access_token().expect("Read should succeed."),
			Some(TokenSecret::new(ACCESS_TOKEN))
		);
		assert!(session.events().is_empty());
	}

	#[tokio::test]
	async fn panicking_refresher_settles_the_episode() {
		let refresher = Arc::new(PanickingRefresher::default());
		let Fixture { coordinator, store, session } = fixture(refresher.clone());
		let outcome = tokio::time::timeout(
			Duration::from_secs(5),
			coordinator.recover(Method::Get, &url("products")),
		)
		.await
		.expect("Recovery should settle after the refresh task panics.");

		assert_eq!(outcome, Err(RefreshFailure::Interrupted));
		assert_eq!(coordinator.status(), RefreshStatus::Idle);
		assert_eq!(coordinator.metrics().failures(), 1);
		assert_eq!(store.refresh_token().expect("Read should succeed."), None);
		assert_eq!(session.events()[0].reason, TerminationReason::RefreshFailed);

		store
			.set_credentials(Credentials::new(ACCESS_TOKEN, REFRESH_TOKEN))
			.expect("Memory store should accept credentials.");

		let outcome = coordinator.recover(Method::Get, &url("products")).await;

		assert_eq!(outcome.expect("A new episode should start.").expose(), REFRESHED_TOKEN);
		assert_eq!(refresher.calls.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn stalled_refresher_times_out() {
		let store = Arc::new(MemoryTokenStore::default());

		store
			.set_credentials(Credentials::new(ACCESS_TOKEN, REFRESH_TOKEN))
			.expect("Memory store should accept credentials.");

		let session = Arc::new(RecordingSessionObserver::default());
		let coordinator = Arc::new(
			RefreshCoordinator::new(store.clone(), Arc::new(StalledRefresher), session.clone(), "/login")
				.with_timeout(Duration::from_millis(20)),
		);
		let outcome = coordinator.recover(Method::Get, &url("products")).await;

		assert!(matches!(outcome, Err(RefreshFailure::Unreachable { .. })));
		assert_eq!(coordinator.status(), RefreshStatus::Idle);
		assert_eq!(store.access_token().expect("Read should succeed."), None);
		assert_eq!(session.events()[0].reason, TerminationReason::RefreshFailed);
	}
}
