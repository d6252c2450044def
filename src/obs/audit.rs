// self
use crate::{_prelude::*, http::Method};

/// Kind of security-relevant denial captured in an [`AuditRecord`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
	/// HTTP 403.
	PermissionDenied,
	/// HTTP 404 whose detail reads like an access denial.
	NotFoundOrDenied,
}
impl AuditKind {
	/// Returns a stable label suitable for log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::PermissionDenied => "permission_denied",
			Self::NotFoundOrDenied => "not_found_or_denied",
		}
	}
}

/// Structured who/what/when entry for a denied request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
	/// Denial kind.
	pub kind: AuditKind,
	/// Request method.
	pub method: Method,
	/// Request path (no query string).
	pub endpoint: String,
	/// HTTP status returned by the server.
	pub status: u16,
	/// Permission the server reported as required.
	pub required_permission: Option<String>,
	/// Module the permission belongs to.
	pub module: Option<String>,
	/// Raw server detail.
	pub detail: Option<String>,
	/// Fingerprint of the access token that was denied, when one was attached.
	pub session_fingerprint: Option<String>,
	/// Moment the denial was observed.
	#[serde(with = "time::serde::rfc3339")]
	pub timestamp: OffsetDateTime,
}

/// Destination for audit records.
pub trait AuditSink
where
	Self: Send + Sync,
{
	/// Persists or forwards `record`. Must not block on network I/O.
	fn record(&self, record: &AuditRecord);
}

/// Emits audit records as `tracing` events under the `bearer_transport::audit` target.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAuditSink;
impl AuditSink for TracingAuditSink {
	fn record(&self, record: &AuditRecord) {
		trace_event!(
			warn,
			target: "bearer_transport::audit",
			kind = record.kind.as_str(),
			method = record.method.as_str(),
			endpoint = %record.endpoint,
			status = record.status,
			required_permission = record.required_permission.as_deref(),
			module = record.module.as_deref(),
			session = record.session_fingerprint.as_deref(),
			timestamp = %record.timestamp,
			"Access denied."
		);

		#[cfg(not(feature = "tracing"))]
		let _ = record;
	}
}

/// Keeps audit records in memory for inspection.
#[derive(Debug, Default)]
pub struct MemoryAuditSink(Mutex<Vec<AuditRecord>>);
impl MemoryAuditSink {
	/// Records captured so far.
	pub fn records(&self) -> Vec<AuditRecord> {
		self.0.lock().clone()
	}
}
impl AuditSink for MemoryAuditSink {
	fn record(&self, record: &AuditRecord) {
		self.0.lock().push(record.clone());
	}
}
