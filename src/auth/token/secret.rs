//! Opaque credential string that never prints its contents.

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

/// Literal values that browser-style key-value stores hand back for "nothing stored".
const ABSENT_SENTINELS: [&str; 2] = ["null", "undefined"];

/// Access or refresh token value; `Debug` and `Display` both print a placeholder.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a raw token string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Raw token value, for building headers and request bodies only.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Returns `true` when the value is empty or one of the "absent" sentinels.
	pub fn is_absent(&self) -> bool {
		let trimmed = self.0.trim();

		trimmed.is_empty() || ABSENT_SENTINELS.contains(&trimmed)
	}

	/// Short, non-reversible identifier for correlating log lines with a session.
	pub fn fingerprint(&self) -> String {
		let digest = Sha256::digest(self.0.as_bytes());

		URL_SAFE_NO_PAD.encode(&digest[..9])
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl From<&str> for TokenSecret {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}
impl From<String> for TokenSecret {
	fn from(value: String) -> Self {
		Self::new(value)
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("TokenSecret(<hidden>)")
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<hidden>")
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn formatting_never_leaks_the_value() {
		let token = TokenSecret::new("eyJ.payload.sig");

		assert_eq!(format!("{token:?}"), "TokenSecret(<hidden>)");
		assert_eq!(format!("{token}"), "<hidden>");
		assert!(!format!("{:?}", Some(&token)).contains("payload"));
	}

	#[test]
	fn sentinels_count_as_absent() {
		assert!(TokenSecret::new("").is_absent());
		assert!(TokenSecret::new("  ").is_absent());
		assert!(TokenSecret::new("null").is_absent());
		assert!(TokenSecret::new("undefined").is_absent());
		assert!(!TokenSecret::new("refresh-1").is_absent());
	}

	#[test]
	fn fingerprint_is_stable_and_hides_the_secret() {
		let secret = TokenSecret::new("a.b.c");
		let fingerprint = secret.fingerprint();

		assert_eq!(fingerprint, secret.fingerprint());
		assert_eq!(fingerprint.len(), 12);
		assert!(!fingerprint.contains("a.b.c"));
		assert_ne!(fingerprint, TokenSecret::new("a.b.d").fingerprint());
	}
}
