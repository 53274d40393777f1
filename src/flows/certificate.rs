//! Mutual-TLS certificate authentication via the client-credentials grant.

// std
use std::path::Path;
// self
use crate::{
	_prelude::*,
	connection::SafeguardConnection,
	error::ValidationError,
	flows::{Safeguard, common},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	provider::{self, CERTIFICATE_PROVIDER_ID},
	store::CredentialStore,
	tls::{ClientIdentity, TransportContext},
};

impl Safeguard {
	/// Opens a connection by authenticating with client certificate material.
	///
	/// The grant runs over a transport pinned to the supplied identity plus the accumulated
	/// trust anchors; the default transport is untouched. `provider` defaults to the built-in
	/// certificate directory.
	pub async fn connect_certificate(
		&self,
		host_name: &str,
		identity: ClientIdentity,
		passphrase: &str,
		provider: Option<&str>,
	) -> Result<SafeguardConnection> {
		const KIND: FlowKind = FlowKind::Certificate;

		let span = FlowSpan::new(KIND, "connect_certificate");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				if host_name.is_empty() {
					return Err(ValidationError::MissingHostName.into());
				}
				if passphrase.is_empty() {
					return Err(ValidationError::MissingPassphrase.into());
				}

				identity.validate()?;

				let provider_id = provider::resolve_provider_id(
					&self.invoker,
					host_name,
					CERTIFICATE_PROVIDER_ID,
					provider.unwrap_or_default(),
				)
				.await?;

				self.store.clear();
				self.store.set_host_name(host_name);

				let grant = serde_json::json!({
					"grant_type": "client_credentials",
					"scope": common::sts_scope(&provider_id),
				});
				let context = TransportContext::new(identity, passphrase);
				let access_token =
					common::request_access_token(&self.invoker, host_name, grant, Some(context))
						.await?;

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

	/// Variant of [`Safeguard::connect_certificate`] that reads certificate material from disk.
	///
	/// Supply either `certificate_path` + `key_path` (PEM pair) or `pfx_path` (PKCS#12 archive);
	/// the PEM pair wins when both are present.
	pub async fn connect_certificate_from_files(
		&self,
		host_name: &str,
		certificate_path: Option<&Path>,
		key_path: Option<&Path>,
		pfx_path: Option<&Path>,
		passphrase: &str,
		provider: Option<&str>,
	) -> Result<SafeguardConnection> {
		let identity = identity_from_files(certificate_path, key_path, pfx_path)?;

		self.connect_certificate(host_name, identity, passphrase, provider).await
	}
}

pub(crate) fn identity_from_files(
	certificate_path: Option<&Path>,
	key_path: Option<&Path>,
	pfx_path: Option<&Path>,
) -> Result<ClientIdentity> {
	match (certificate_path, key_path, pfx_path) {
		(Some(certificate), Some(key), _) => ClientIdentity::from_pem_files(certificate, key),
		(_, _, Some(pfx)) => ClientIdentity::from_pkcs12_file(pfx),
		_ => Err(ValidationError::MissingCertificate.into()),
	}
}
