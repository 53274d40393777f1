//! Simple file-backed [`CredentialStore`] for sessions that outlive one process.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	error::StorageError,
	store::{CredentialField, CredentialStore},
};

/// Persists credential fields to a JSON snapshot after each mutation.
///
/// Field operations stay infallible per the store contract: a snapshot that cannot be written is
/// reported through the optional `tracing` hook while the in-memory state remains authoritative.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<HashMap<CredentialField, String>>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = if path.exists() { Self::load_snapshot(&path)? } else { HashMap::new() };

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	fn load_snapshot(path: &Path) -> Result<HashMap<CredentialField, String>, StorageError> {
		let metadata = path.metadata().map_err(|e| StorageError::Backend {
			message: format!("Failed to inspect {}: {e}", path.display()),
		})?;

		if metadata.len() == 0 {
			return Ok(HashMap::new());
		}

		let bytes = fs::read(path).map_err(|e| StorageError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;
		let entries: Vec<(CredentialField, String)> =
			serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization {
				message: format!("Failed to parse {}: {e}", path.display()),
			})?;

		Ok(entries.into_iter().collect())
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StorageError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StorageError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist_locked(&self, contents: &HashMap<CredentialField, String>) {
		if let Err(e) = self.try_persist(contents) {
			crate::obs::record_store_persist_failure(&self.path, &e);
		}
	}

	fn try_persist(
		&self,
		contents: &HashMap<CredentialField, String>,
	) -> Result<(), StorageError> {
		Self::ensure_parent_exists(&self.path)?;

		let snapshot: Vec<_> = contents.iter().collect();
		let serialized =
			serde_json::to_vec_pretty(&snapshot).map_err(|e| StorageError::Serialization {
				message: format!("Failed to serialize store snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StorageError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StorageError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StorageError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StorageError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl CredentialStore for FileStore {
	fn get(&self, field: CredentialField) -> String {
		self.inner.read().get(&field).cloned().unwrap_or_default()
	}

	fn set(&self, field: CredentialField, value: &str) {
		let mut guard = self.inner.write();

		guard.insert(field, value.to_owned());
		self.persist_locked(&guard);
	}

	fn clear(&self) {
		let mut guard = self.inner.write();

		guard.clear();
		self.persist_locked(&guard);
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process, time::SystemTime};
	// self
	use super::*;

	fn temp_path() -> PathBuf {
		let stamp = SystemTime::now()
			.duration_since(SystemTime::UNIX_EPOCH)
			.expect("System clock should be past the epoch.")
			.as_nanos();
		let unique = format!("safeguard_rs_file_store_{}_{stamp}.json", process::id());

		env::temp_dir().join(unique)
	}

	#[test]
	fn set_and_reload_round_trip() {
		let path = temp_path();
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");

		store.set_host_name("vault.example.com");
		store.set_user_token("user-token");
		drop(store);

		let reopened = FileStore::open(&path).expect("Failed to reopen file store snapshot.");

		assert_eq!(reopened.host_name(), "vault.example.com");
		assert_eq!(reopened.user_token(), "user-token");

		reopened.clear();

		let cleared = FileStore::open(&path).expect("Failed to reopen cleared snapshot.");

		assert_eq!(cleared.host_name(), "");
		assert_eq!(cleared.user_token(), "");

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary store snapshot {}: {e}", path.display())
		});
	}
}
