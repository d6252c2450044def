//! Maps failed attempts into the closed [`Error`] taxonomy.
//!
//! The classifier runs last, after retries and session refresh had their chance. It
//! never fails: every input produces an [`Error`]. Denials (403, and 404s that read
//! like denials) are written to the [`AuditSink`] before the error is returned.

// self
use crate::{
	_prelude::*,
	http::{HttpResponse, Method, TransportFailure},
	obs::{self, AuditKind, AuditRecord, AuditSink, Stage, StageOutcome},
};

/// Markers that, next to "not found", suggest the server is hiding a denial.
const DENIAL_MARKERS: [&str; 4] = ["denied", "forbidden", "permission", "organization"];
const DETAIL_PREVIEW_LIMIT: usize = 512;

/// Returns `true` when a 404 detail reads like an access denial.
///
/// Case-insensitive substring heuristic: any mention of "access", or "not found"
/// next to one of the denial markers. Messages such as "Access log not found" match
/// too; callers relying on an exact answer should wait for an explicit error code.
pub fn looks_like_access_denial(detail: &str) -> bool {
	let detail = detail.to_lowercase();

	detail.contains("access")
		|| (detail.contains("not found") && DENIAL_MARKERS.iter().any(|marker| detail.contains(marker)))
}

/// Error payload shape returned by the API.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ErrorBody {
	/// Human-readable detail (stringified when the server sent structured JSON).
	pub detail: Option<String>,
	/// Permission the server reported as required.
	pub required_permission: Option<String>,
	/// Module the permission belongs to.
	pub module: Option<String>,
}
impl ErrorBody {
	/// Parses a response body, falling back to a raw text preview for non-JSON payloads.
	pub fn parse(body: &[u8]) -> Self {
		#[derive(Deserialize)]
		struct Wire {
			#[serde(default)]
			detail: Option<serde_json::Value>,
			#[serde(default)]
			required_permission: Option<String>,
			#[serde(default)]
			module: Option<String>,
		}

		if body.is_empty() {
			return Self::default();
		}

		match serde_json::from_slice::<Wire>(body) {
			Ok(wire) => Self {
				detail: wire.detail.and_then(|value| match value {
					serde_json::Value::Null => None,
					serde_json::Value::String(text) => Some(text),
					other => Some(other.to_string()),
				}),
				required_permission: wire.required_permission,
				module: wire.module,
			},
			Err(_) => {
				let text = String::from_utf8_lossy(body);
				let trimmed = text.trim();

				Self {
					detail: (!trimmed.is_empty())
						.then(|| trimmed.chars().take(DETAIL_PREVIEW_LIMIT).collect()),
					..Self::default()
				}
			},
		}
	}
}

/// Failed attempt handed to the classifier.
#[derive(Debug)]
pub enum FailedAttempt {
	/// No response arrived.
	NoResponse(TransportFailure),
	/// A non-success response arrived.
	Response(HttpResponse),
}

/// Request metadata the classifier needs for messages and audit records.
#[derive(Clone, Debug)]
pub struct FailureContext {
	/// Request method.
	pub method: Method,
	/// Request path (no query string).
	pub endpoint: String,
	/// Fingerprint of the attached access token.
	pub session_fingerprint: Option<String>,
}

/// Final pipeline stage producing [`Error`] values.
#[derive(Clone)]
pub struct ErrorClassifier {
	audit: Arc<dyn AuditSink>,
}
impl ErrorClassifier {
	/// Creates a classifier writing denials to `audit`.
	pub fn new(audit: Arc<dyn AuditSink>) -> Self {
		Self { audit }
	}

	/// Classifies `attempt`; always returns a value.
	pub fn classify(&self, context: &FailureContext, attempt: FailedAttempt) -> Error {
		let error = match attempt {
			FailedAttempt::NoResponse(source) => Error::Connectivity { source },
			FailedAttempt::Response(response) => self.classify_response(context, &response),
		};

		obs::record_stage(Stage::Classify, StageOutcome::Failure);
		trace_event!(
			debug,
			method = context.method.as_str(),
			endpoint = %context.endpoint,
			status = error.status(),
			"Request failed: {error}"
		);

		error
	}

	fn classify_response(&self, context: &FailureContext, response: &HttpResponse) -> Error {
		let body = ErrorBody::parse(&response.body);

		match response.status {
			401 => Error::AuthExpired,
			403 => {
				self.audit(context, AuditKind::PermissionDenied, response.status, &body);

				Error::PermissionDenied {
					required_permission: body.required_permission,
					module: body.module,
					endpoint: context.endpoint.clone(),
					method: context.method,
					detail: body.detail,
				}
			},
			404 if body.detail.as_deref().is_some_and(looks_like_access_denial) => {
				self.audit(context, AuditKind::NotFoundOrDenied, response.status, &body);

				Error::NotFoundOrDenied {
					endpoint: context.endpoint.clone(),
					method: context.method,
					detail: body.detail,
				}
			},
			404 => Error::NotFound { endpoint: context.endpoint.clone(), detail: body.detail },
			status => Error::Server { status, detail: body.detail },
		}
	}

	fn audit(&self, context: &FailureContext, kind: AuditKind, status: u16, body: &ErrorBody) {
		self.audit.record(&AuditRecord {
			kind,
			method: context.method,
			endpoint: context.endpoint.clone(),
			status,
			required_permission: body.required_permission.clone(),
			module: body.module.clone(),
			detail: body.detail.clone(),
			session_fingerprint: context.session_fingerprint.clone(),
			timestamp: OffsetDateTime::now_utc(),
		});
	}
}
impl Debug for ErrorClassifier {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("ErrorClassifier(..)")
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;
	use crate::obs::MemoryAuditSink;

	fn classifier() -> (ErrorClassifier, Arc<MemoryAuditSink>) {
		let sink = Arc::new(MemoryAuditSink::default());

		(ErrorClassifier::new(sink.clone()), sink)
	}

	fn context(method: Method, endpoint: &str) -> FailureContext {
		FailureContext { method, endpoint: endpoint.into(), session_fingerprint: None }
	}

	fn response(status: u16, body: serde_json::Value) -> FailedAttempt {
		FailedAttempt::Response(HttpResponse::json(status, &body))
	}

	#[test]
	fn forbidden_is_enriched_and_audited() {
		let (classifier, sink) = classifier();
		let err = classifier.classify(
			&context(Method::Post, "/api/v1/inventory/adjustments"),
			response(
				403,
				json!({
					"detail": "Forbidden",
					"required_permission": "inventory.write",
					"module": "inventory"
				}),
			),
		);

		assert!(err.to_string().contains("inventory.write"));
		assert!(matches!(
			&err,
			Error::PermissionDenied { module: Some(module), .. } if module == "inventory"
		));

		let records = sink.records();

		assert_eq!(records.len(), 1);
		assert_eq!(records[0].method, Method::Post);
		assert_eq!(records[0].endpoint, "/api/v1/inventory/adjustments");
		assert_eq!(records[0].required_permission.as_deref(), Some("inventory.write"));
	}

	#[test]
	fn not_found_with_denial_wording_is_reclassified() {
		let (classifier, sink) = classifier();
		let err = classifier.classify(
			&context(Method::Get, "/api/v1/organizations/42"),
			response(404, json!({ "detail": "Organization not found or access denied" })),
		);

		assert!(matches!(err, Error::NotFoundOrDenied { .. }));
		assert_eq!(sink.records()[0].kind, AuditKind::NotFoundOrDenied);
	}

	#[test]
	fn plain_not_found_is_not_audited() {
		let (classifier, sink) = classifier();
		let err = classifier.classify(
			&context(Method::Get, "/api/v1/products/7"),
			response(404, json!({ "detail": "Product not found" })),
		);

		assert!(matches!(err, Error::NotFound { .. }));
		assert!(sink.records().is_empty());
	}

	#[test]
	fn access_wording_wins_even_for_genuine_not_found() {
		// Known-fuzzy: the substring heuristic cannot tell this apart from a denial.
		assert!(looks_like_access_denial("Access log not found"));
		assert!(looks_like_access_denial("Not Found: permission scope mismatch"));
		assert!(!looks_like_access_denial("Ticket not found"));
		assert!(!looks_like_access_denial("Forbidden"));
	}

	#[test]
	fn missing_response_is_connectivity() {
		let (classifier, _) = classifier();
		let err = classifier.classify(
			&context(Method::Get, "/api/v1/reports"),
			FailedAttempt::NoResponse(TransportFailure::Timeout { timeout: Duration::from_secs(120) }),
		);

		assert!(matches!(err, Error::Connectivity { .. }));
		assert!(err.to_string().contains("check your connection"));
	}

	#[test]
	fn other_statuses_keep_raw_detail_out_of_the_message() {
		let (classifier, _) = classifier();
		let err = classifier.classify(
			&context(Method::Put, "/api/v1/tickets/9"),
			response(422, json!({ "detail": [{ "loc": ["body", "priority"], "msg": "invalid" }] })),
		);

		match err {
			Error::Server { status, detail: Some(detail) } => {
				assert_eq!(status, 422);
				assert!(detail.contains("priority"));
			},
			other => panic!("Unexpected classification: {other:?}."),
		}
	}

	#[test]
	fn non_json_bodies_become_a_preview() {
		let body = ErrorBody::parse(b"<html>Bad Gateway</html>");

		assert_eq!(body.detail.as_deref(), Some("<html>Bad Gateway</html>"));
		assert_eq!(ErrorBody::parse(b""), ErrorBody::default());
	}
}
