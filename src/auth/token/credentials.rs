//! Credential pair exchanged between the login flow and token stores.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Access + refresh token pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
	/// Short-lived bearer credential.
	pub access_token: TokenSecret,
	/// Longer-lived, typically single-use renewal credential.
	pub refresh_token: TokenSecret,
}
impl Credentials {
	/// Creates a credential pair.
	pub fn new(access_token: impl Into<TokenSecret>, refresh_token: impl Into<TokenSecret>) -> Self {
		Self { access_token: access_token.into(), refresh_token: refresh_token.into() }
	}
}
