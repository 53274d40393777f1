//! Redirect-based federation login against the appliance's hosted RSTS page.
//!
//! The flow spans a full navigation round-trip instead of a single call: the acquire step hands
//! back a login URL for the embedding application to open, the appliance redirects to the
//! configured callback with an access token (or a PKCE code + state pair) attached, and
//! [`apply_callback_url`] persists whatever came back so the next [`Safeguard::connect_rsts`]
//! call can finish the token exchange.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	connection::SafeguardConnection,
	error::{ProtocolError, ValidationError},
	flows::{Safeguard, common},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	store::{CredentialField, CredentialStore},
};

const STATE_LEN: usize = 32;
const PKCE_VERIFIER_LEN: usize = 64;
const ACCESS_TOKEN_PARAM: &str = "access_token";
const CODE_PARAM: &str = "code";
const STATE_PARAM: &str = "state";
const NEW_LOGIN_PARAM: &str = "newlogin";

/// Result of a redirect-flow connect attempt.
#[derive(Debug)]
pub enum RstsOutcome {
	/// A user token is in place; the session is authenticated.
	Connected(SafeguardConnection),
	/// No credentials were found; the caller must navigate to the login URL and re-enter the
	/// flow once the callback has been applied to the store.
	RedirectRequired(Url),
}

/// What [`apply_callback_url`] found and persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallbackCapture {
	/// An access token was captured; the next connect call trades it.
	AccessToken,
	/// A PKCE code + state pair was captured; the next connect call exchanges it.
	AuthorizationCode,
	/// Only the new-login marker was present.
	NewLoginOnly,
	/// The URL carried no login markers.
	None,
}

impl Safeguard {
	/// Drives the redirect-flow state machine for `host_name`.
	///
	/// Returns [`RstsOutcome::Connected`] when the store already holds (or the pending callback
	/// data yields) a user token, and [`RstsOutcome::RedirectRequired`] with the hosted login
	/// URL otherwise. The login URL carries the state and PKCE challenge whose counterparts are
	/// persisted in the store for callback correlation.
	pub async fn connect_rsts(&self, host_name: &str, redirect_uri: &str) -> Result<RstsOutcome> {
		const KIND: FlowKind = FlowKind::Rsts;

		let span = FlowSpan::new(KIND, "connect_rsts");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.connect_rsts_inner(host_name, redirect_uri)).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn connect_rsts_inner(
		&self,
		host_name: &str,
		redirect_uri: &str,
	) -> Result<RstsOutcome> {
		if host_name.is_empty() {
			return Err(ValidationError::MissingHostName.into());
		}
		if redirect_uri.is_empty() {
			return Err(ValidationError::MissingRedirectUri.into());
		}

		self.guard_host_change(host_name);
		self.store.set_host_name(host_name);

		if !self.store.user_token().is_empty() {
			return Ok(RstsOutcome::Connected(self.connection(host_name)?));
		}
		if !self.store.access_token().is_empty() {
			common::trade_for_user_token(&self.invoker, self.store.as_ref(), host_name).await?;

			return Ok(RstsOutcome::Connected(self.connection(host_name)?));
		}

		let code = self.store.get(CredentialField::Code);
		let state = self.store.get(CredentialField::State);

		if !code.is_empty() && !state.is_empty() {
			let access_token =
				self.exchange_callback_code(host_name, redirect_uri, &code, &state).await?;

			self.store.set_access_token(&access_token);
			common::trade_for_user_token(&self.invoker, self.store.as_ref(), host_name).await?;

			return Ok(RstsOutcome::Connected(self.connection(host_name)?));
		}

		let login = LoginState::generate();

		self.store.set(CredentialField::RandomState, &login.state);
		self.store.set(CredentialField::CodeVerifier, &login.verifier);

		Ok(RstsOutcome::RedirectRequired(login.login_url(host_name, redirect_uri)?))
	}

	async fn exchange_callback_code(
		&self,
		host_name: &str,
		redirect_uri: &str,
		code: &str,
		state: &str,
	) -> Result<String> {
		let expected = self.store.get(CredentialField::RandomState);

		if expected.is_empty() || state != expected {
			// A poisoned callback must not be replayable on the next attempt.
			self.store.clear_login_state();

			return Err(ProtocolError::StateMismatch.into());
		}

		let verifier = self.store.get(CredentialField::CodeVerifier);
		let grant = serde_json::json!({
			"grant_type": "authorization_code",
			"code": code,
			"code_verifier": verifier,
			"redirect_uri": redirect_uri,
		});
		let access_token =
			common::request_access_token(&self.invoker, host_name, grant, None).await?;

		self.store.clear_login_state();

		Ok(access_token)
	}
}

/// Builds the hosted login page URL in its bare form.
pub fn login_url(host_name: &str, redirect_uri: &str) -> Result<Url> {
	let mut url = common::parse_url(format!("https://{host_name}/RSTS/Login"))?;

	url.query_pairs_mut()
		.append_pair("response_type", "token")
		.append_pair("redirect_uri", redirect_uri);

	Ok(url)
}

/// Scans a post-redirect URL for login markers and persists what it finds.
///
/// This is the companion checker the embedding application runs when its callback page loads:
/// an `access_token` or a `code`+`state` pair is written to the store, the `newlogin` marker
/// sets the new-login flag, and the return value tells the application whether a reentrant
/// [`Safeguard::connect_rsts`] call will make progress. Use [`strip_callback_markers`] to
/// compute the bare URL to redirect back to.
pub fn apply_callback_url(store: &dyn CredentialStore, url: &Url) -> CallbackCapture {
	let pairs = callback_pairs(url);

	if pairs.iter().any(|(key, _)| key.eq_ignore_ascii_case(NEW_LOGIN_PARAM)) {
		store.set_new_login(true);
	}
	if let Some((_, token)) = pairs.iter().find(|(key, _)| key == ACCESS_TOKEN_PARAM) {
		store.set_access_token(token);

		return CallbackCapture::AccessToken;
	}

	let code = pairs.iter().find(|(key, _)| key == CODE_PARAM);
	let state = pairs.iter().find(|(key, _)| key == STATE_PARAM);

	if let (Some((_, code)), Some((_, state))) = (code, state) {
		store.set(CredentialField::Code, code);
		store.set(CredentialField::State, state);

		return CallbackCapture::AuthorizationCode;
	}
	if store.new_login() {
		return CallbackCapture::NewLoginOnly;
	}

	CallbackCapture::None
}

/// Returns the callback URL with every login marker removed (bare origin + path).
pub fn strip_callback_markers(url: &Url) -> Url {
	let mut stripped = url.clone();

	stripped.set_query(None);
	stripped.set_fragment(None);

	stripped
}

/// Login markers arrive in the query or, for the token response type, in the fragment.
fn callback_pairs(url: &Url) -> Vec<(String, String)> {
	let mut pairs: Vec<(String, String)> =
		url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect();

	if let Some(fragment) = url.fragment() {
		pairs.extend(
			url::form_urlencoded::parse(fragment.as_bytes())
				.map(|(k, v)| (k.into_owned(), v.into_owned())),
		);
	}

	pairs
}

struct LoginState {
	state: String,
	verifier: String,
	challenge: String,
}
impl LoginState {
	fn generate() -> Self {
		let state = random_string(STATE_LEN);
		let verifier = random_string(PKCE_VERIFIER_LEN);
		let challenge = compute_pkce_challenge(&verifier);

		Self { state, verifier, challenge }
	}

	fn login_url(&self, host_name: &str, redirect_uri: &str) -> Result<Url> {
		let mut url = login_url(host_name, redirect_uri)?;

		url.query_pairs_mut()
			.append_pair(STATE_PARAM, &self.state)
			.append_pair("code_challenge", &self.challenge)
			.append_pair("code_challenge_method", "S256");

		Ok(url)
	}
}

fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}

fn compute_pkce_challenge(verifier: &str) -> String {
	let mut hasher = Sha256::new();

	hasher.update(verifier.as_bytes());

	URL_SAFE_NO_PAD.encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::store::MemoryStore;

	#[test]
	fn login_url_pins_the_hosted_page_form() {
		let url = login_url("vault.example.com", "https://app.example.com/cb")
			.expect("Login URL should assemble for a plain host.");

		assert_eq!(url.host_str(), Some("vault.example.com"));
		assert_eq!(url.path(), "/RSTS/Login");

		let query = url.query().unwrap_or_default();

		assert!(query.contains("response_type=token"));
		assert!(query.contains("redirect_uri=https%3A%2F%2Fapp.example.com%2Fcb"));
	}

	#[test]
	fn generated_login_state_carries_a_s256_challenge() {
		let login = LoginState::generate();

		assert_eq!(login.state.len(), STATE_LEN);
		assert_eq!(login.verifier.len(), PKCE_VERIFIER_LEN);
		assert_eq!(login.challenge, compute_pkce_challenge(&login.verifier));
		// SHA-256 digests are 32 bytes; unpadded URL-safe base64 renders them as 43 characters.
		assert_eq!(login.challenge.len(), 43);
	}

	#[test]
	fn callback_checker_captures_access_token_from_fragment() {
		let store = MemoryStore::default();
		let url = Url::parse("https://app.example.com/cb#access_token=sts-token&junk=1")
			.expect("Callback URL fixture should parse.");

		assert_eq!(apply_callback_url(&store, &url), CallbackCapture::AccessToken);
		assert_eq!(store.access_token(), "sts-token");
	}

	#[test]
	fn callback_checker_captures_code_and_state_from_query() {
		let store = MemoryStore::default();
		let url = Url::parse("https://app.example.com/cb?code=abc&state=xyz")
			.expect("Callback URL fixture should parse.");

		assert_eq!(apply_callback_url(&store, &url), CallbackCapture::AuthorizationCode);
		assert_eq!(store.get(CredentialField::Code), "abc");
		assert_eq!(store.get(CredentialField::State), "xyz");
		assert_eq!(store.access_token(), "");
	}

	#[test]
	fn callback_checker_flags_new_logins() {
		let store = MemoryStore::default();
		let url = Url::parse("https://app.example.com/cb?newlogin")
			.expect("Callback URL fixture should parse.");

		assert_eq!(apply_callback_url(&store, &url), CallbackCapture::NewLoginOnly);
		assert!(store.new_login());
	}

	#[test]
	fn callback_checker_ignores_unrelated_urls() {
		let store = MemoryStore::default();
		let url = Url::parse("https://app.example.com/cb?theme=dark")
			.expect("Callback URL fixture should parse.");

		assert_eq!(apply_callback_url(&store, &url), CallbackCapture::None);
		assert_eq!(store.access_token(), "");
		assert!(!store.new_login());
	}

	#[test]
	fn stripping_removes_query_and_fragment() {
		let url = Url::parse("https://app.example.com/cb?code=abc#access_token=x")
			.expect("Callback URL fixture should parse.");
		let stripped = strip_callback_markers(&url);

		assert_eq!(stripped.as_str(), "https://app.example.com/cb");
	}
}
