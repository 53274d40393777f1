// std
use std::{env, fs, path::PathBuf, process, time::SystemTime};
// self
use safeguard_rs::store::{CredentialField, CredentialStore, FileStore, MemoryStore};

fn temp_path() -> PathBuf {
	let stamp = SystemTime::now()
		.duration_since(SystemTime::UNIX_EPOCH)
		.expect("System clock should be past the epoch.")
		.as_nanos();
	let unique = format!("safeguard_rs_store_backends_{}_{stamp}.json", process::id());

	env::temp_dir().join(unique)
}

fn assert_store_contract(store: &dyn CredentialStore) {
	for field in CredentialField::ALL {
		assert_eq!(store.get(field), "", "Field {field} should start empty.");
	}

	// Each field round-trips independently of its neighbors.
	store.set_host_name("vault.example.com");

	assert_eq!(store.host_name(), "vault.example.com");
	assert_eq!(store.access_token(), "");
	assert_eq!(store.user_token(), "");

	store.set_access_token("sts-access");

	assert_eq!(store.access_token(), "sts-access");
	assert_eq!(store.user_token(), "");

	store.set_user_token("user-token");

	assert_eq!(store.user_token(), "user-token");

	// Overwriting a populated field is always permitted.
	store.set_user_token("user-token-2");

	assert_eq!(store.user_token(), "user-token-2");

	store.clear();

	for field in CredentialField::ALL {
		assert_eq!(store.get(field), "", "Field {field} should be empty after clear.");
	}
}

#[test]
fn memory_store_honors_the_contract() {
	assert_store_contract(&MemoryStore::default());
}

#[test]
fn file_store_honors_the_contract() {
	let path = temp_path();
	let store = FileStore::open(&path).expect("Failed to open file store snapshot.");

	assert_store_contract(&store);

	fs::remove_file(&path).unwrap_or_else(|e| {
		panic!("Failed to remove temporary store snapshot {}: {e}", path.display())
	});
}

#[test]
fn file_store_survives_a_reopen() {
	let path = temp_path();

	{
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");

		store.set_host_name("vault.example.com");
		store.set_user_token("user-token");
	}

	let reopened = FileStore::open(&path).expect("Failed to reopen file store snapshot.");

	assert_eq!(reopened.host_name(), "vault.example.com");
	assert_eq!(reopened.user_token(), "user-token");

	fs::remove_file(&path).unwrap_or_else(|e| {
		panic!("Failed to remove temporary store snapshot {}: {e}", path.display())
	});
}
