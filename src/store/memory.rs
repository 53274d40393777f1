//! Thread-safe in-memory [`CredentialStore`] for single-process sessions and tests.

// self
use crate::{
	_prelude::*,
	store::{CredentialField, CredentialStore},
};

type FieldMap = Arc<RwLock<HashMap<CredentialField, String>>>;

/// Keeps credential fields in process memory; the default store for short-lived sessions.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(FieldMap);
impl CredentialStore for MemoryStore {
	fn get(&self, field: CredentialField) -> String {
		self.0.read().get(&field).cloned().unwrap_or_default()
	}

	fn set(&self, field: CredentialField, value: &str) {
		self.0.write().insert(field, value.to_owned());
	}

	fn clear(&self) {
		self.0.write().clear();
	}
}
