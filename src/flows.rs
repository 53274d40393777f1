//! Authentication flows driven by the [`Safeguard`] session object.

pub mod a2a;
pub mod common;
pub mod rsts;

mod certificate;
mod password;

pub use a2a::{A2aCredentialType, SshKeyFormat};
pub use rsts::{CallbackCapture, RstsOutcome, apply_callback_url, strip_callback_markers};

// self
use crate::{
	_prelude::*,
	connection::SafeguardConnection,
	error::ValidationError,
	http::Invoker,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	store::CredentialStore,
};

/// Session object coordinating authentication flows against one appliance at a time.
///
/// A session owns exactly one [`CredentialStore`] reference and one [`Invoker`]; connections
/// produced by its flows borrow the same store, so token state written by one is visible to the
/// other. Callers needing concurrent sessions construct one `Safeguard` per store instance.
#[derive(Clone)]
pub struct Safeguard {
	pub(crate) store: Arc<dyn CredentialStore>,
	pub(crate) invoker: Invoker,
}
impl Safeguard {
	/// Creates a session around `store` with the default transport.
	pub fn new(store: Arc<dyn CredentialStore>) -> Self {
		Self::with_invoker(store, Invoker::new())
	}

	/// Creates a session that reuses the caller-provided transport.
	pub fn with_invoker(store: Arc<dyn CredentialStore>, invoker: Invoker) -> Self {
		Self { store, invoker }
	}

	/// The credential store backing this session.
	pub fn store(&self) -> &Arc<dyn CredentialStore> {
		&self.store
	}

	/// Opens an anonymous connection: no tokens, only the host is recorded.
	///
	/// Calls made on the returned connection omit the authorization header entirely; endpoints
	/// requiring authentication will reject them.
	pub fn connect_anonymous(&self, host_name: &str) -> Result<SafeguardConnection> {
		const KIND: FlowKind = FlowKind::Anonymous;

		let _guard = FlowSpan::new(KIND, "connect_anonymous").entered();

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = self.connect_anonymous_inner(host_name);

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	fn connect_anonymous_inner(&self, host_name: &str) -> Result<SafeguardConnection> {
		if host_name.is_empty() {
			return Err(ValidationError::MissingHostName.into());
		}

		self.store.clear();
		self.store.set_host_name(host_name);

		self.connection(host_name)
	}

	/// Clears the store when it already holds a different appliance's credentials.
	pub(crate) fn guard_host_change(&self, host_name: &str) {
		let stored = self.store.host_name();

		if !stored.is_empty() && stored != host_name {
			self.store.clear();
		}
	}

	pub(crate) fn connection(&self, host_name: &str) -> Result<SafeguardConnection> {
		SafeguardConnection::new(host_name, self.store.clone(), self.invoker.clone())
	}
}
impl Debug for Safeguard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Safeguard").field("host_name", &self.store.host_name()).finish()
	}
}
