//! Shared helpers for flow implementations (STS grants, the user-token trade, JSON parsing).

// crates.io
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	error::{ProtocolError, ValidationError},
	http::{ApplianceRequest, Invoker},
	store::CredentialStore,
	tls::TransportContext,
};

/// Access-token response from the appliance STS.
#[derive(Clone, Debug, Deserialize)]
struct StsTokenResponse {
	access_token: String,
}

/// Outcome of trading an access token at the login-response endpoint.
#[derive(Clone, Debug, Deserialize)]
struct LoginResponse {
	#[serde(rename = "Status")]
	status: String,
	#[serde(default, rename = "UserToken")]
	user_token: String,
}

/// Builds the STS scope string pinning a grant to one provider.
pub(crate) fn sts_scope(provider_id: &str) -> String {
	format!("rsts:sts:primaryproviderid:{provider_id}")
}

/// Requests an access token from the appliance STS with the supplied grant body.
///
/// Certificate-based grants pass a [`TransportContext`] so the client certificate and trust
/// anchors are pinned into this call's transport only.
pub(crate) async fn request_access_token(
	invoker: &Invoker,
	host_name: &str,
	grant: Value,
	context: Option<TransportContext>,
) -> Result<String> {
	let url = sts_token_url(host_name)?;
	let mut request = ApplianceRequest::new(Method::POST, url).json(grant);

	if let Some(context) = context {
		request = request.context(context);
	}

	let response = invoker.execute(request).await?;
	let token: StsTokenResponse = parse_json(&response.body)?;

	Ok(token.access_token)
}

/// Trades the stored access token for a user token and persists it.
///
/// The access token written ahead of this step is left in place when the trade fails; a later
/// redirect-flow connect on the same store picks it up and retries the exchange.
pub(crate) async fn trade_for_user_token(
	invoker: &Invoker,
	store: &dyn CredentialStore,
	host_name: &str,
) -> Result<()> {
	let access_token = store.access_token();
	let url = login_response_url(host_name)?;
	let request = ApplianceRequest::new(Method::POST, url)
		.json(serde_json::json!({ "StsAccessToken": access_token }));
	let response = invoker.execute(request).await?;
	let login: LoginResponse = parse_json(&response.body)?;

	if login.status != "Success" {
		return Err(ProtocolError::TokenExchangeRejected { status: login.status }.into());
	}

	store.set_user_token(&login.user_token);

	Ok(())
}

/// Deserializes an appliance payload, reporting the failing path on mismatch.
pub(crate) fn parse_json<T>(body: &str) -> Result<T>
where
	T: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_str(body);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|e| ProtocolError::MalformedResponse { source: e }.into())
}

pub(crate) fn sts_token_url(host_name: &str) -> Result<Url> {
	parse_url(format!("https://{host_name}/RSTS/oauth2/token"))
}

fn login_response_url(host_name: &str) -> Result<Url> {
	parse_url(format!("https://{host_name}/service/core/v3/Token/LoginResponse"))
}

pub(crate) fn parse_url(raw: String) -> Result<Url> {
	Url::parse(&raw).map_err(|e| ValidationError::InvalidUrl { source: e }.into())
}
