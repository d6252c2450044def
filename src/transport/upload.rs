// std
use std::path::Path;
// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	http::{Method, MultipartFile, UploadProgress},
	transport::{ApiClient, ApiRequest, ApiResponse},
};

/// File handed to [`ApiClient::upload_file`].
#[derive(Clone, Debug)]
pub struct FileUpload {
	/// Form field name; defaults to `file`.
	pub field: String,
	/// File name announced to the server.
	pub file_name: String,
	/// MIME type, when known.
	pub content_type: Option<String>,
	/// File contents.
	pub bytes: Vec<u8>,
}
impl FileUpload {
	/// Default form field name.
	pub const DEFAULT_FIELD: &'static str = "file";

	/// Wraps in-memory contents.
	pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
		Self {
			field: Self::DEFAULT_FIELD.into(),
			file_name: file_name.into(),
			content_type: None,
			bytes,
		}
	}

	/// Reads a file from disk, naming the upload after the file.
	pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let file_name = path
			.file_name()
			.and_then(|name| name.to_str())
			.ok_or_else(|| {
				Error::client_validation(format!("`{}` does not name a file", path.display()))
			})?
			.to_owned();
		let bytes = std::fs::read(path)?;

		Ok(Self::new(file_name, bytes))
	}

	/// Overrides the form field name.
	pub fn with_field(mut self, field: impl Into<String>) -> Self {
		self.field = field.into();

		self
	}

	/// Declares the MIME type.
	pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
		self.content_type = Some(content_type.into());

		self
	}

	fn into_multipart(self, progress: Arc<UploadProgress>) -> MultipartFile {
		let file = MultipartFile::new(self.field, self.file_name, self.bytes);
		let file = match self.content_type {
			Some(content_type) => file.with_content_type(content_type),
			None => file,
		};

		file.with_progress(progress)
	}
}

impl ApiClient {
	/// Uploads `upload` as `multipart/form-data` to `path`.
	///
	/// `on_progress` receives whole percentages in `0..=100`, strictly increasing,
	/// computed from bytes handed to the transport. Uploads are never replayed after a
	/// transient failure; a 401 still goes through session refresh.
	pub async fn upload_file<T>(
		&self,
		path: &str,
		upload: FileUpload,
		on_progress: impl Fn(u8) + Send + Sync + 'static,
	) -> Result<ApiResponse<T>>
	where
		T: DeserializeOwned,
	{
		let progress = Arc::new(UploadProgress::new(upload.bytes.len() as u64, on_progress));
		let request = ApiRequest::new(Method::Post, path).multipart(upload.into_multipart(progress));

		self.send(request).await
	}
}
