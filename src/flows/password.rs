//! Username/password authentication against a resolved identity provider.

// self
use crate::{
	_prelude::*,
	connection::SafeguardConnection,
	error::ValidationError,
	flows::{Safeguard, common},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	provider::{self, LOCAL_PROVIDER_ID},
	store::CredentialStore,
};

impl Safeguard {
	/// Opens a connection using a password grant.
	///
	/// `provider` selects the identity provider by name or id; `None` (and the built-in names)
	/// resolve to the appliance-local directory without a discovery call. The flow clears the
	/// store, records the host, requests an access token, and trades it for a user token before
	/// yielding the connection. A failure after the access token was written leaves that token
	/// in the store.
	pub async fn connect_password(
		&self,
		host_name: &str,
		user_name: &str,
		password: &str,
		provider: Option<&str>,
	) -> Result<SafeguardConnection> {
		const KIND: FlowKind = FlowKind::Password;

		let span = FlowSpan::new(KIND, "connect_password");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				if host_name.is_empty() {
					return Err(ValidationError::MissingHostName.into());
				}
				if user_name.is_empty() {
					return Err(ValidationError::MissingUserName.into());
				}
				if password.is_empty() {
					return Err(ValidationError::MissingPassword.into());
				}

				let provider_id = provider::resolve_provider_id(
					&self.invoker,
					host_name,
					LOCAL_PROVIDER_ID,
					provider.unwrap_or_default(),
				)
				.await?;

				self.store.clear();
				self.store.set_host_name(host_name);

				let grant = serde_json::json!({
					"grant_type": "password",
					"username": user_name,
					"password": password,
					"scope": common::sts_scope(&provider_id),
				});
				let access_token =
					common::request_access_token(&self.invoker, host_name, grant, None).await?;

				self.store.set_access_token(&access_token);
				common::trade_for_user_token(&self.invoker, self.store.as_ref(), host_name)
					.await?;

				self.connection(host_name)
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}
}
