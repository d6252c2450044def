//! Process-local [`TokenStore`]; the default when no store is configured.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	store::{StoreError, StoredTokens, TokenStore},
};

/// Token pair behind a shared lock. Clones see the same pair.
#[derive(Clone, Debug, Default)]
pub struct MemoryTokenStore(Arc<RwLock<StoredTokens>>);
impl TokenStore for MemoryTokenStore {
	fn access_token(&self) -> Result<Option<TokenSecret>, StoreError> {
		Ok(self.0.read().access_token.clone())
	}

	fn refresh_token(&self) -> Result<Option<TokenSecret>, StoreError> {
		Ok(self.0.read().refresh_token.clone())
	}

	fn set_access_token(&self, token: TokenSecret) -> Result<(), StoreError> {
		self.0.write().access_token = Some(token);

		Ok(())
	}

	fn set_refresh_token(&self, token: TokenSecret) -> Result<(), StoreError> {
		self.0.write().refresh_token = Some(token);

		Ok(())
	}

	fn clear_all(&self) -> Result<(), StoreError> {
		*self.0.write() = StoredTokens::default();

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn clear_all_drops_both_tokens() {
		let store = MemoryTokenStore::default();

		store.set_access_token(TokenSecret::new("a.b.c")).expect("Write should succeed.");
		store.set_refresh_token(TokenSecret::new("r")).expect("Write should succeed.");
		store.clear_all().expect("Clear should succeed.");

		assert!(store.access_token().expect("Read should succeed.").is_none());
		assert!(store.refresh_token().expect("Read should succeed.").is_none());
	}

	#[test]
	fn clones_share_state() {
		let store = MemoryTokenStore::default();
		let view = store.clone();

		store.set_access_token(TokenSecret::new("x.y.z")).expect("Write should succeed.");

		assert_eq!(view.access_token().expect("Read should succeed."), Some(TokenSecret::new("x.y.z")));
	}
}
