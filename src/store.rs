//! Storage contracts and built-in credential store implementations.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::_prelude::*;

/// Marker value persisted for the boolean new-login flag.
const NEW_LOGIN_MARKER: &str = "true";

/// Named credential fields persisted by a [`CredentialStore`].
///
/// `Code`, `State`, `CodeVerifier`, `RandomState`, and `NewLogin` only exist to correlate an
/// outbound redirect-login request with its inbound callback and are cleared together once the
/// callback is consumed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CredentialField {
	/// Appliance identity the session is bound to.
	HostName,
	/// Short-lived federation token awaiting its trade for a user token.
	AccessToken,
	/// Durable bearer credential accepted by the appliance services.
	UserToken,
	/// Authorization code captured from a login callback.
	Code,
	/// State value captured from a login callback.
	State,
	/// PKCE verifier generated when the login redirect was issued.
	CodeVerifier,
	/// State value generated when the login redirect was issued.
	RandomState,
	/// Set when the callback indicated a brand-new login.
	NewLogin,
}
impl CredentialField {
	/// Every persisted field, in declaration order.
	pub const ALL: [CredentialField; 8] = [
		CredentialField::HostName,
		CredentialField::AccessToken,
		CredentialField::UserToken,
		CredentialField::Code,
		CredentialField::State,
		CredentialField::CodeVerifier,
		CredentialField::RandomState,
		CredentialField::NewLogin,
	];
	/// The redirect-flow transient group, cleared together once consumed.
	pub const TRANSIENT: [CredentialField; 5] = [
		CredentialField::Code,
		CredentialField::State,
		CredentialField::CodeVerifier,
		CredentialField::RandomState,
		CredentialField::NewLogin,
	];

	/// Returns the stable storage key for the field.
	pub const fn as_str(self) -> &'static str {
		match self {
			CredentialField::HostName => "HostName",
			CredentialField::AccessToken => "AccessToken",
			CredentialField::UserToken => "UserToken",
			CredentialField::Code => "Code",
			CredentialField::State => "State",
			CredentialField::CodeVerifier => "CodeVerifier",
			CredentialField::RandomState => "RandomState",
			CredentialField::NewLogin => "NewLogin",
		}
	}
}
impl Display for CredentialField {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Capability contract implemented by credential stores.
///
/// Every field is independently addressable; reading an absent field yields an empty string and
/// never fails, and overwriting a populated field is always permitted. Implementations must not
/// perform network I/O. One store instance backs one logical session; callers needing concurrent
/// sessions supply distinct instances.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Returns the stored value for `field`, or an empty string when absent.
	fn get(&self, field: CredentialField) -> String;

	/// Stores `value` under `field`, replacing any prior value.
	fn set(&self, field: CredentialField, value: &str);

	/// Resets every field, including the redirect-flow transients, to empty.
	fn clear(&self);

	/// Appliance host name recorded for the session.
	fn host_name(&self) -> String {
		self.get(CredentialField::HostName)
	}

	/// Records the appliance host name.
	fn set_host_name(&self, value: &str) {
		self.set(CredentialField::HostName, value);
	}

	/// Short-lived federation token, when a trade is pending.
	fn access_token(&self) -> String {
		self.get(CredentialField::AccessToken)
	}

	/// Records the federation access token.
	fn set_access_token(&self, value: &str) {
		self.set(CredentialField::AccessToken, value);
	}

	/// Durable bearer token; non-empty iff the session is authenticated.
	fn user_token(&self) -> String {
		self.get(CredentialField::UserToken)
	}

	/// Records the durable bearer token.
	fn set_user_token(&self, value: &str) {
		self.set(CredentialField::UserToken, value);
	}

	/// Whether the last callback reported a brand-new login.
	fn new_login(&self) -> bool {
		!self.get(CredentialField::NewLogin).is_empty()
	}

	/// Records or clears the new-login flag.
	fn set_new_login(&self, value: bool) {
		self.set(CredentialField::NewLogin, if value { NEW_LOGIN_MARKER } else { "" });
	}

	/// Clears the redirect-flow transient group in one step.
	fn clear_login_state(&self) {
		for field in CredentialField::TRANSIENT {
			self.set(field, "");
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn fields_round_trip_independently() {
		let store = MemoryStore::default();

		for field in CredentialField::ALL {
			assert_eq!(store.get(field), "", "Field {field} should start empty.");
		}

		store.set(CredentialField::HostName, "vault.example.com");
		store.set(CredentialField::AccessToken, "sts-token");

		assert_eq!(store.host_name(), "vault.example.com");
		assert_eq!(store.access_token(), "sts-token");
		assert_eq!(store.user_token(), "");

		store.set(CredentialField::AccessToken, "sts-token-2");

		assert_eq!(store.access_token(), "sts-token-2");
	}

	#[test]
	fn clear_resets_every_field() {
		let store = MemoryStore::default();

		for field in CredentialField::ALL {
			store.set(field, "populated");
		}

		store.clear();

		for field in CredentialField::ALL {
			assert_eq!(store.get(field), "", "Field {field} should be empty after clear.");
		}
	}

	#[test]
	fn transient_group_clears_together() {
		let store = MemoryStore::default();

		store.set_host_name("vault.example.com");
		store.set_user_token("user-token");

		for field in CredentialField::TRANSIENT {
			store.set(field, "pending");
		}

		store.clear_login_state();

		for field in CredentialField::TRANSIENT {
			assert_eq!(store.get(field), "", "Transient field {field} should be cleared.");
		}
		assert_eq!(store.host_name(), "vault.example.com");
		assert_eq!(store.user_token(), "user-token");
	}

	#[test]
	fn new_login_flag_round_trips() {
		let store = MemoryStore::default();

		assert!(!store.new_login());

		store.set_new_login(true);

		assert!(store.new_login());

		store.set_new_login(false);

		assert!(!store.new_login());
	}
}
