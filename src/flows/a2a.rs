//! Application-to-application credential retrieval.
//!
//! A2A is a one-shot secret fetch authenticated by API key plus client certificate; it is
//! independent of session login and never touches the credential store.

// std
use std::path::Path;
// crates.io
use reqwest::{
	Method,
	header::{AUTHORIZATION, HeaderMap, HeaderValue},
};
// self
use crate::{
	_prelude::*,
	error::{TransportError, ValidationError},
	flows::{Safeguard, certificate::identity_from_files, common},
	http::ApplianceRequest,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	tls::{ClientIdentity, TransportContext},
};

/// Kinds of secrets retrievable over the A2A service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum A2aCredentialType {
	/// Account password.
	Password,
	/// Account SSH private key.
	PrivateKey,
}
impl A2aCredentialType {
	/// Returns the query-parameter value for the credential type.
	pub const fn as_str(self) -> &'static str {
		match self {
			A2aCredentialType::Password => "Password",
			A2aCredentialType::PrivateKey => "PrivateKey",
		}
	}
}
impl Display for A2aCredentialType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Key encodings accepted for private-key retrieval.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SshKeyFormat {
	/// OpenSSH encoding.
	OpenSsh,
	/// SSH2 encoding.
	Ssh2,
	/// PuTTY encoding.
	Putty,
}
impl SshKeyFormat {
	/// Returns the query-parameter value for the key format.
	pub const fn as_str(self) -> &'static str {
		match self {
			SshKeyFormat::OpenSsh => "OpenSsh",
			SshKeyFormat::Ssh2 => "Ssh2",
			SshKeyFormat::Putty => "Putty",
		}
	}
}
impl Display for SshKeyFormat {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

impl Safeguard {
	/// Retrieves a single secret over the A2A service.
	///
	/// Returns the secret with the appliance's surrounding quote characters removed. No token is
	/// issued and the credential store is not consulted or modified.
	pub async fn a2a_get_credential(
		&self,
		host_name: &str,
		api_key: &str,
		credential_type: A2aCredentialType,
		key_format: Option<SshKeyFormat>,
		identity: ClientIdentity,
		passphrase: &str,
	) -> Result<String> {
		const KIND: FlowKind = FlowKind::A2a;

		let span = FlowSpan::new(KIND, "a2a_get_credential");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				if host_name.is_empty() {
					return Err(ValidationError::MissingHostName.into());
				}
				if api_key.is_empty() {
					return Err(ValidationError::MissingApiKey.into());
				}

				identity.validate()?;

				if passphrase.is_empty() {
					return Err(ValidationError::MissingPassphrase.into());
				}

				let mut url =
					common::parse_url(format!("https://{host_name}/service/a2a/v2/Credentials"))?;

				{
					let mut pairs = url.query_pairs_mut();

					pairs.append_pair("type", credential_type.as_str());

					if let Some(format) = key_format {
						pairs.append_pair("keyFormat", format.as_str());
					}
				}

				let mut headers = HeaderMap::new();
				let authorization = HeaderValue::from_str(&format!("A2A {api_key}"))
					.map_err(|e| TransportError::Header { source: e })?;

				headers.insert(AUTHORIZATION, authorization);

				let request = ApplianceRequest::new(Method::GET, url)
					.headers(headers)
					.context(TransportContext::new(identity, passphrase));
				let response = self.invoker.execute(request).await?;

				Ok(strip_wrapping_quotes(&response.body).to_owned())
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	/// Variant of [`Safeguard::a2a_get_credential`] that reads certificate material from disk.
	pub async fn a2a_get_credential_from_files(
		&self,
		host_name: &str,
		api_key: &str,
		credential_type: A2aCredentialType,
		key_format: Option<SshKeyFormat>,
		certificate_path: Option<&Path>,
		key_path: Option<&Path>,
		passphrase: &str,
	) -> Result<String> {
		let identity = identity_from_files(certificate_path, key_path, None)?;

		self.a2a_get_credential(
			host_name,
			api_key,
			credential_type,
			key_format,
			identity,
			passphrase,
		)
		.await
	}
}

/// Removes one leading and one trailing quote; the appliance wraps scalar secrets in quotes.
fn strip_wrapping_quotes(body: &str) -> &str {
	let body = body.strip_prefix('"').unwrap_or(body);

	body.strip_suffix('"').unwrap_or(body)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn quote_stripping_removes_exactly_one_pair() {
		assert_eq!(strip_wrapping_quotes("\"secret\""), "secret");
		assert_eq!(strip_wrapping_quotes("\"\"secret\"\""), "\"secret\"");
		assert_eq!(strip_wrapping_quotes("secret"), "secret");
		assert_eq!(strip_wrapping_quotes("\"\""), "");
		assert_eq!(strip_wrapping_quotes(""), "");
		assert_eq!(strip_wrapping_quotes("se\"cret"), "se\"cret");
	}
}
