//! Binary downloads saved through a [`DownloadSink`].

// std
use std::{
	fs,
	io,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	http::Method,
	transport::{ApiClient, ApiRequest},
};

/// Destination for downloaded payloads.
pub trait DownloadSink
where
	Self: Send + Sync,
{
	/// Persists `bytes` under `file_name` and returns where they ended up.
	fn save(&self, file_name: &str, bytes: &[u8]) -> io::Result<PathBuf>;
}

/// Saves downloads into a directory.
///
/// Bytes are written to a hidden `.part` file first and renamed into place, so a
/// half-written download never appears under its final name. The partial file is
/// removed on every exit path.
#[derive(Clone, Debug)]
pub struct DirectorySink {
	dir: PathBuf,
}
impl DirectorySink {
	/// Saves into `dir`, creating it on demand.
	pub fn new(dir: impl Into<PathBuf>) -> Self {
		Self { dir: dir.into() }
	}

	/// Target directory.
	pub fn dir(&self) -> &Path {
		&self.dir
	}
}
impl DownloadSink for DirectorySink {
	fn save(&self, file_name: &str, bytes: &[u8]) -> io::Result<PathBuf> {
		let name = Path::new(file_name).file_name().ok_or_else(|| {
			io::Error::new(io::ErrorKind::InvalidInput, format!("`{file_name}` is not a file name"))
		})?;

		fs::create_dir_all(&self.dir)?;

		let target = self.dir.join(name);
		let mut partial = name.to_os_string();

		partial.push(".part");

		let partial = PartialFile(self.dir.join(format!(".{}", partial.to_string_lossy())));

		fs::write(&partial.0, bytes)?;
		fs::rename(&partial.0, &target)?;

		Ok(target)
	}
}

struct PartialFile(PathBuf);
impl Drop for PartialFile {
	fn drop(&mut self) {
		if self.0.exists() {
			let _ = fs::remove_file(&self.0);
		}
	}
}

/// Result of [`ApiClient::download_file`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadedFile {
	/// Name the payload was saved under.
	pub file_name: String,
	/// Location reported by the sink.
	pub path: PathBuf,
	/// Payload length in bytes.
	pub bytes: u64,
}

impl ApiClient {
	/// Downloads `path` and saves the body through `sink`.
	///
	/// An empty `file_name` falls back to the response's `Content-Disposition` header
	/// and then to the last segment of the request path.
	pub async fn download_file(
		&self,
		path: &str,
		file_name: &str,
		sink: &dyn DownloadSink,
	) -> Result<DownloadedFile> {
		let request = ApiRequest::new(Method::Get, path).header("accept", "*/*");
		let response = self.execute(request).await?;
		let file_name = match file_name.trim() {
			"" => response
				.header("content-disposition")
				.and_then(content_disposition_file_name)
				.or_else(|| last_segment(path))
				.ok_or_else(|| {
					Error::client_validation(format!("no file name could be derived for `{path}`"))
				})?,
			name => name.to_owned(),
		};
		let saved = sink.save(&file_name, &response.body)?;

		trace_event!(debug, file = %file_name, bytes = response.body.len(), "Download saved.");

		Ok(DownloadedFile { file_name, path: saved, bytes: response.body.len() as u64 })
	}
}

/// Extracts the file name from a `Content-Disposition` header value.
///
/// `filename*` (RFC 5987, percent-encoded) wins over a plain `filename`.
pub fn content_disposition_file_name(header: &str) -> Option<String> {
	let mut plain = None;

	for param in header.split(';').map(str::trim) {
		let Some((key, value)) = param.split_once('=') else {
			continue;
		};

		match key.trim().to_ascii_lowercase().as_str() {
			"filename*" => {
				let encoded = value.trim().trim_matches('"');
				let encoded = encoded.split_once("''").map_or(encoded, |(_, rest)| rest);

				if let Some(name) = percent_decode(encoded).filter(|name| !name.is_empty()) {
					return Some(name);
				}
			},
			"filename" => {
				let name = value.trim().trim_matches('"');

				if !name.is_empty() {
					plain = Some(name.to_owned());
				}
			},
			_ => {},
		}
	}

	plain
}

fn last_segment(path: &str) -> Option<String> {
	let path = path.split(['?', '#']).next().unwrap_or_default();

	path.rsplit('/').find(|segment| !segment.is_empty()).map(str::to_owned)
}

fn percent_decode(value: &str) -> Option<String> {
	let bytes = value.as_bytes();
	let mut out = Vec::with_capacity(bytes.len());
	let mut i = 0;

	while i < bytes.len() {
		if bytes[i] == b'%' {
			let hex = value
				.get(i + 1..i + 3)
				.filter(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit()))?;

			out.push(u8::from_str_radix(hex, 16).ok()?);
			i += 3;
		} else {
			out.push(bytes[i]);
			i += 1;
		}
	}

	String::from_utf8(out).ok()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn content_disposition_prefers_extended_name() {
		assert_eq!(
			content_disposition_file_name(
				"attachment; filename=\"report.csv\"; filename*=UTF-8''Q3%20report.csv"
			),
			Some("Q3 report.csv".into())
		);
		assert_eq!(
			content_disposition_file_name("attachment; filename=\"report.csv\""),
			Some("report.csv".into())
		);
		assert_eq!(content_disposition_file_name("inline"), None);
	}

	#[test]
	fn malformed_percent_escapes_fall_back_to_the_plain_name() {
		assert_eq!(percent_decode("%+1"), None);
		assert_eq!(percent_decode("%-f"), None);
		assert_eq!(percent_decode("a%2"), None);
		assert_eq!(percent_decode("%41%62c"), Some("Abc".into()));
		assert_eq!(
			content_disposition_file_name("attachment; filename=\"report.csv\"; filename*=UTF-8''%+1.csv"),
			Some("report.csv".into())
		);
	}

	#[test]
	fn last_segment_ignores_query_and_trailing_slash() {
		assert_eq!(last_segment("reports/export/summary.pdf?format=a4"), Some("summary.pdf".into()));
		assert_eq!(last_segment("reports/export/"), Some("export".into()));
		assert_eq!(last_segment("/"), None);
	}

	#[test]
	fn directory_sink_renames_into_place_and_leaves_no_partial_file() {
		let dir = std::env::temp_dir().join(format!(
			"bearer-transport-sink-{}",
			OffsetDateTime::now_utc().unix_timestamp_nanos()
		));
		let sink = DirectorySink::new(&dir);
		let saved = sink.save("../escape.csv", b"a,b\n1,2\n").expect("Save should succeed.");

		assert_eq!(saved, dir.join("escape.csv"));
		assert_eq!(fs::read(&saved).expect("Saved file should exist."), b"a,b\n1,2\n");

		let leftovers: Vec<_> = fs::read_dir(&dir)
			.expect("Directory should be readable.")
			.filter_map(|entry| entry.ok())
			.filter(|entry| entry.file_name().to_string_lossy().ends_with(".part"))
			.collect();

		assert!(leftovers.is_empty());

		fs::remove_dir_all(&dir).expect("Test directory should be removable.");
	}

	#[test]
	fn directory_sink_rejects_names_without_a_file_component() {
		let sink = DirectorySink::new(std::env::temp_dir());
		let err = sink.save("..", b"").expect_err("`..` is not a file name.");

		assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
	}
}
