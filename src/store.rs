//! Token Store Adapter contract and built-in implementations.
//!
//! The store is the only component allowed to read or write persisted credentials;
//! everything else receives tokens by value. Calls are synchronous because the
//! backing key-value persistence is local, which keeps the refresh coordinator's
//! check-then-act free of suspension points.

pub mod file;
pub mod memory;

pub use file::FileTokenStore;
pub use memory::MemoryTokenStore;

// self
use crate::{
	_prelude::*,
	auth::{Credentials, TokenSecret},
};

/// Storage backend contract implemented by token stores.
pub trait TokenStore
where
	Self: Send + Sync,
{
	/// Returns the stored access token, if any.
	fn access_token(&self) -> Result<Option<TokenSecret>, StoreError>;

	/// Returns the stored refresh token, if any.
	fn refresh_token(&self) -> Result<Option<TokenSecret>, StoreError>;

	/// Replaces the stored access token.
	fn set_access_token(&self, token: TokenSecret) -> Result<(), StoreError>;

	/// Replaces the stored refresh token (rotation).
	fn set_refresh_token(&self, token: TokenSecret) -> Result<(), StoreError>;

	/// Removes both tokens.
	fn clear_all(&self) -> Result<(), StoreError>;

	/// Stores a freshly issued credential pair (login handoff).
	fn set_credentials(&self, credentials: Credentials) -> Result<(), StoreError> {
		self.set_access_token(credentials.access_token)?;
		self.set_refresh_token(credentials.refresh_token)
	}
}

/// Error type produced by [`TokenStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Snapshot persisted by stores; both slots are optional.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct StoredTokens {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub(crate) access_token: Option<TokenSecret>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub(crate) refresh_token: Option<TokenSecret>,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn set_credentials_writes_both_slots() {
		let store = MemoryTokenStore::default();

		store
			.set_credentials(Credentials::new("a.b.c", "refresh-1"))
			.expect("Memory store should accept credentials.");

		assert_eq!(
			store.access_token().expect("Read should succeed."),
			Some(TokenSecret::new("a.b.c"))
		);
		assert_eq!(
			store.refresh_token().expect("Read should succeed."),
			Some(TokenSecret::new("refresh-1"))
		);
	}

	#[test]
	fn stored_tokens_skip_empty_slots() {
		let payload = serde_json::to_string(&StoredTokens {
			access_token: Some(TokenSecret::new("a.b.c")),
			refresh_token: None,
		})
		.expect("Snapshot should serialize.");

		assert_eq!(payload, r#"{"access_token":"a.b.c"}"#);
	}
}
