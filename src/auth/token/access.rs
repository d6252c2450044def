//! Structural validation for bearer access tokens.
//!
//! Only the compact JWS shape is checked here (three non-empty, dot-delimited
//! segments). Signatures and claims are the server's business; the optional `exp`
//! lookup exists purely for diagnostics.

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
// self
use crate::{_prelude::*, auth::TokenSecret};

/// Reasons an access token fails the structural check.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum TokenShapeError {
	/// Nothing usable was stored.
	#[error("access token is empty or a placeholder")]
	Absent,
	/// The token does not split into exactly three segments.
	#[error("access token has {found} segment(s), expected 3")]
	SegmentCount {
		/// Number of dot-delimited segments found.
		found: usize,
	},
	/// One of the three segments is empty.
	#[error("access token segment {index} is empty")]
	EmptySegment {
		/// Zero-based index of the empty segment.
		index: usize,
	},
}

/// Access token that passed the structural check and may be sent as a bearer credential.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(TokenSecret);
impl AccessToken {
	/// Validates `secret` and wraps it.
	pub fn parse(secret: TokenSecret) -> Result<Self, TokenShapeError> {
		if secret.is_absent() {
			return Err(TokenShapeError::Absent);
		}

		let segments: Vec<&str> = secret.expose().split('.').collect();

		if segments.len() != 3 {
			return Err(TokenShapeError::SegmentCount { found: segments.len() });
		}
		if let Some(index) = segments.iter().position(|segment| segment.is_empty()) {
			return Err(TokenShapeError::EmptySegment { index });
		}

		Ok(Self(secret))
	}

	/// Returns the wrapped secret.
	pub fn secret(&self) -> &TokenSecret {
		&self.0
	}

	/// Renders the `Authorization` header value.
	pub fn bearer_header(&self) -> String {
		format!("Bearer {}", self.0.expose())
	}

	/// Reads the `exp` claim, if the payload segment is decodable JSON carrying one.
	pub fn expires_at(&self) -> Option<OffsetDateTime> {
		#[derive(Deserialize)]
		struct Claims {
			exp: Option<i64>,
		}

		let payload = self.0.expose().split('.').nth(1)?;
		let decoded = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
		let claims: Claims = serde_json::from_slice(&decoded).ok()?;

		OffsetDateTime::from_unix_timestamp(claims.exp?).ok()
	}

	/// Returns `true` when the `exp` claim is known and not after `now`.
	pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
		self.expires_at().is_some_and(|exp| exp <= now)
	}
}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("AccessToken(<hidden>)")
	}
}
