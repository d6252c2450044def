//! JSON-file [`TokenStore`] for desktop shells and CLI tools that outlive one process.

// std
use std::{
	fs::{self, File},
	io::{self, ErrorKind, Write},
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	store::{StoreError, StoredTokens, TokenStore},
};

/// Keeps the token pair in memory and rewrites a JSON snapshot on every change.
///
/// Writes go to a sibling `*.tmp` file which is synced and then renamed over the
/// snapshot, so a crash mid-write leaves the previous pair intact.
#[derive(Clone, Debug)]
pub struct FileTokenStore {
	path: PathBuf,
	inner: Arc<RwLock<StoredTokens>>,
}
impl FileTokenStore {
	/// Loads the snapshot at `path`, starting empty when the file is missing or blank.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		create_parent(&path)?;

		let tokens = read_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(tokens)) })
	}

	/// Location of the backing file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn write_snapshot(&self, tokens: &StoredTokens) -> Result<(), StoreError> {
		create_parent(&self.path)?;

		let json = serde_json::to_vec_pretty(tokens).map_err(|e| StoreError::Serialization {
			message: format!("Token snapshot could not be encoded: {e}"),
		})?;
		let staging = self.path.with_extension("tmp");

		File::create(&staging)
			.and_then(|mut file| {
				file.write_all(&json)?;
				file.sync_all()
			})
			.map_err(|e| backend("write", &staging, e))?;
		fs::rename(&staging, &self.path).map_err(|e| backend("replace", &self.path, e))
	}

	/// Applies `change` to a copy and only publishes it once the snapshot is on disk.
	fn update(&self, change: impl FnOnce(&mut StoredTokens)) -> Result<(), StoreError> {
		let mut current = self.inner.write();
		let mut next = current.clone();

		change(&mut next);
		self.write_snapshot(&next)?;

		*current = next;

		Ok(())
	}
}
impl TokenStore for FileTokenStore {
	fn access_token(&self) -> Result<Option<TokenSecret>, StoreError> {
		Ok(self.inner.read().access_token.clone())
	}

	fn refresh_token(&self) -> Result<Option<TokenSecret>, StoreError> {
		Ok(self.inner.read().refresh_token.clone())
	}

	fn set_access_token(&self, token: TokenSecret) -> Result<(), StoreError> {
		self.update(|tokens| tokens.access_token = Some(token))
	}

	fn set_refresh_token(&self, token: TokenSecret) -> Result<(), StoreError> {
		self.update(|tokens| tokens.refresh_token = Some(token))
	}

	fn clear_all(&self) -> Result<(), StoreError> {
		self.update(|tokens| *tokens = StoredTokens::default())
	}
}

fn read_snapshot(path: &Path) -> Result<StoredTokens, StoreError> {
	let bytes = match fs::read(path) {
		Ok(bytes) => bytes,
		Err(e) if e.kind() == ErrorKind::NotFound => return Ok(StoredTokens::default()),
		Err(e) => return Err(backend("read", path, e)),
	};

	if bytes.iter().all(u8::is_ascii_whitespace) {
		return Ok(StoredTokens::default());
	}

	serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
		message: format!("Token snapshot {} is not valid JSON: {e}", path.display()),
	})
}

fn create_parent(path: &Path) -> Result<(), StoreError> {
	match path.parent() {
		Some(dir) if !dir.as_os_str().is_empty() =>
			fs::create_dir_all(dir).map_err(|e| backend("create directory", dir, e)),
		_ => Ok(()),
	}
}

fn backend(action: &str, path: &Path, e: io::Error) -> StoreError {
	StoreError::Backend { message: format!("Could not {action} {}: {e}", path.display()) }
}
