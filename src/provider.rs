//! Identity-provider discovery and fuzzy resolution.
//!
//! Appliance logins are scoped to a provider id. Built-in providers (`local`, `certificate`)
//! need no lookup; anything else is resolved by probing the appliance's login-discovery endpoint
//! and matching the caller-supplied name against the advertised provider list.

// crates.io
use reqwest::Method;
// self
use crate::{
	_prelude::*,
	error::ResolutionError,
	flows::common::parse_json,
	http::{ApplianceRequest, Invoker},
};

/// Provider id for the appliance-local username/password directory.
pub const LOCAL_PROVIDER_ID: &str = "local";
/// Provider id for the appliance's built-in certificate directory.
pub const CERTIFICATE_PROVIDER_ID: &str = "certificate";

/// First step of the appliance's hosted login sequence, listing available providers.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct LoginSequence {
	#[serde(default, rename = "Providers")]
	pub providers: Vec<ProviderEntry>,
}

/// One advertised identity provider.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct ProviderEntry {
	#[serde(default, rename = "DisplayName")]
	pub display_name: String,
	#[serde(default, rename = "Id")]
	pub id: String,
}
impl ProviderEntry {
	/// Case-insensitive match: display name exact, id exact, then id substring.
	fn matches(&self, requested_lower: &str) -> bool {
		self.display_name.to_lowercase() == requested_lower
			|| self.id.to_lowercase() == requested_lower
			|| self.id.to_lowercase().contains(requested_lower)
	}
}

/// Resolves the appliance provider id for a human-supplied provider name or id.
///
/// Empty input and the built-in `local`/`certificate` names short-circuit to `default_id`
/// without touching the network. Discovery POSTs the login-sequence endpoint and retries once
/// with GET on any failure; entries are scanned in response order with the documented
/// display-name/id/substring priority, first match wins.
pub async fn resolve_provider_id(
	invoker: &Invoker,
	host_name: &str,
	default_id: &str,
	requested: &str,
) -> Result<String> {
	if requested.is_empty()
		|| requested.eq_ignore_ascii_case(LOCAL_PROVIDER_ID)
		|| requested.eq_ignore_ascii_case(CERTIFICATE_PROVIDER_ID)
	{
		return Ok(default_id.to_owned());
	}

	let sequence = discover_login_sequence(invoker, host_name, requested).await?;
	let requested_lower = requested.to_lowercase();

	sequence
		.providers
		.iter()
		.find(|entry| entry.matches(&requested_lower))
		.map(|entry| entry.id.clone())
		.ok_or_else(|| ResolutionError::UnknownProvider { provider: requested.to_owned() }.into())
}

async fn discover_login_sequence(
	invoker: &Invoker,
	host_name: &str,
	requested: &str,
) -> Result<LoginSequence> {
	let url = discovery_url(host_name)?;
	let post = ApplianceRequest::new(Method::POST, url.clone())
		.json(serde_json::json!({ "RelayState": "" }));
	let response = match invoker.execute(post).await {
		Ok(response) => response,
		Err(_) => {
			// The appliance may disallow POST on older firmware; the same endpoint answers GET.
			invoker.execute(ApplianceRequest::new(Method::GET, url)).await.map_err(|e| {
				ResolutionError::DiscoveryFailed {
					provider: requested.to_owned(),
					source: Box::new(e),
				}
			})?
		},
	};

	parse_json(&response.body)
}

fn discovery_url(host_name: &str) -> Result<Url> {
	let raw = format!(
		"https://{host_name}/RSTS/UserLogin/LoginController?response_type=token&redirect_uri=urn:InstalledApplication&loginRequestStep=1"
	);

	Url::parse(&raw).map_err(|e| crate::error::ValidationError::InvalidUrl { source: e }.into())
}
