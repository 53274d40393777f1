//! Per-session connection handle for authenticated appliance calls.

// std
use std::{
	str::FromStr,
	sync::atomic::{AtomicBool, Ordering},
};
// crates.io
use reqwest::{
	Method,
	header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue},
};
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	error::{ProtocolError, TransportError, ValidationError},
	http::{ApplianceRequest, ApplianceResponse, Invoker},
	signalr::{self, ApplianceEvent},
	store::CredentialStore,
};

const LIFETIME_HEADER: HeaderName = HeaderName::from_static("x-tokenlifetimeremaining");

/// The appliance's closed set of invokable services.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Service {
	/// Core appliance API.
	Core,
	/// Appliance management API.
	Appliance,
	/// Unauthenticated notification API.
	Notification,
	/// Application-to-application API.
	A2a,
}
impl Service {
	/// Returns the path segment for the service.
	pub const fn as_str(self) -> &'static str {
		match self {
			Service::Core => "core",
			Service::Appliance => "appliance",
			Service::Notification => "notification",
			Service::A2a => "a2a",
		}
	}
}
impl Display for Service {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for Service {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		match s.to_lowercase().as_str() {
			"core" => Ok(Service::Core),
			"appliance" => Ok(Service::Appliance),
			"notification" => Ok(Service::Notification),
			"a2a" => Ok(Service::A2a),
			_ => Err(ValidationError::UnsupportedService { service: s.to_owned() }.into()),
		}
	}
}

/// Handle for one authenticated (or anonymous) appliance session.
///
/// The connection binds a host name and borrows token state from the session's credential store
/// on every call; it holds no tokens itself. After [`SafeguardConnection::logout`] the handle
/// stays alive but every authenticated call fails because the user token is gone.
pub struct SafeguardConnection {
	host_name: String,
	store: Arc<dyn CredentialStore>,
	invoker: Invoker,
	stream_active: Arc<AtomicBool>,
}
impl SafeguardConnection {
	pub(crate) fn new(
		host_name: &str,
		store: Arc<dyn CredentialStore>,
		invoker: Invoker,
	) -> Result<Self> {
		if host_name.is_empty() {
			return Err(ValidationError::MissingHostName.into());
		}

		Ok(Self {
			host_name: host_name.to_owned(),
			store,
			invoker,
			stream_active: Arc::new(AtomicBool::new(false)),
		})
	}

	/// Appliance host this connection is bound to.
	pub fn host_name(&self) -> &str {
		&self.host_name
	}

	/// Invokes an appliance endpoint and returns the raw response body.
	///
	/// The target URL is `https://{host}/service/{service}/{relative_url}` with `parameters`
	/// appended URL-encoded in caller order. When the store holds a user token the bearer
	/// authorization header is injected, overwriting any caller-supplied value; anonymous
	/// sessions send no authorization header at all.
	pub async fn invoke(
		&self,
		service: Service,
		method: Method,
		relative_url: &str,
		body: Option<Value>,
		parameters: Option<&[(&str, &str)]>,
		additional_headers: Option<HeaderMap>,
	) -> Result<String> {
		let url = self.service_url(service, relative_url, parameters)?;
		let mut headers = additional_headers.unwrap_or_default();
		let user_token = self.store.user_token();

		if !user_token.is_empty() {
			headers.insert(AUTHORIZATION, bearer_value(&user_token)?);
		}

		let mut request = ApplianceRequest::new(method, url).headers(headers);

		if let Some(body) = body {
			request = request.json(body);
		}

		Ok(self.invoker.execute(request).await?.body)
	}

	/// Queries the remaining lifetime of the current user token.
	///
	/// The appliance answers the sentinel request header with the remaining seconds in the
	/// `x-tokenlifetimeremaining` response header rather than in a body.
	pub async fn access_token_lifetime_remaining(&self) -> Result<Duration> {
		let mut headers = HeaderMap::new();

		headers.insert(AUTHORIZATION, self.bearer_from_store()?);
		headers.insert(LIFETIME_HEADER, HeaderValue::from_static(""));

		let response = self.execute_core(Method::GET, "v3/LoginMessage", headers).await?;
		let value = response
			.headers
			.get(LIFETIME_HEADER)
			.ok_or(ProtocolError::MissingLifetimeHeader)?
			.to_str()
			.map_err(|_| ProtocolError::MissingLifetimeHeader)?
			.to_owned();
		let seconds = value
			.trim()
			.parse::<i64>()
			.map_err(|_| ProtocolError::MalformedLifetimeHeader { value })?;

		Ok(Duration::seconds(seconds))
	}

	/// Logs the session out, clearing the store before the network call is attempted.
	///
	/// Store state is therefore consistent even when the logout request itself fails; the
	/// request carries the locally-already-invalidated bearer token.
	pub async fn logout(&self) -> Result<String> {
		let bearer = self.bearer_from_store()?;

		self.store.clear();

		let mut headers = HeaderMap::new();

		headers.insert(AUTHORIZATION, bearer);

		Ok(self.execute_core(Method::POST, "v3/Token/Logout", headers).await?.body)
	}

	/// Subscribes to the appliance's event stream.
	///
	/// The polling task authenticates every (re)connect attempt by re-reading the current user
	/// token from the store, so token rotation needs no re-registration. Registration returns
	/// once the task is spawned; handshake or poll failures are logged and retried in the
	/// background, never raised. Only one subscription may be active per connection; the
	/// returned [`EventSubscription`] is the teardown handle.
	///
	/// Must be called within a Tokio runtime.
	pub fn register_signalr<F>(&self, callback: F) -> Result<EventSubscription>
	where
		F: Fn(ApplianceEvent) + Send + Sync + 'static,
	{
		if self.store.user_token().is_empty() {
			return Err(ValidationError::MissingUserToken.into());
		}
		if self.stream_active.swap(true, Ordering::SeqCst) {
			return Err(ValidationError::EventStreamActive.into());
		}

		let handle = tokio::spawn(signalr::run_event_stream(
			self.host_name.clone(),
			self.store.clone(),
			self.invoker.clone(),
			Arc::new(callback),
		));

		Ok(EventSubscription { handle, active: self.stream_active.clone() })
	}

	fn service_url(
		&self,
		service: Service,
		relative_url: &str,
		parameters: Option<&[(&str, &str)]>,
	) -> Result<Url> {
		if relative_url.is_empty() {
			return Err(ValidationError::MissingRelativeUrl.into());
		}

		let raw =
			format!("https://{}/service/{}/{relative_url}", self.host_name, service.as_str());
		let mut url =
			Url::parse(&raw).map_err(|e| ValidationError::InvalidUrl { source: e })?;

		if let Some(parameters) = parameters.filter(|p| !p.is_empty()) {
			url.query_pairs_mut().extend_pairs(parameters);
		}

		Ok(url)
	}

	async fn execute_core(
		&self,
		method: Method,
		relative_url: &str,
		headers: HeaderMap,
	) -> Result<ApplianceResponse> {
		let url = self.service_url(Service::Core, relative_url, None)?;

		self.invoker.execute(ApplianceRequest::new(method, url).headers(headers)).await
	}

	fn bearer_from_store(&self) -> Result<HeaderValue> {
		let user_token = self.store.user_token();

		if user_token.is_empty() {
			return Err(ValidationError::MissingUserToken.into());
		}

		bearer_value(&user_token)
	}
}
impl Debug for SafeguardConnection {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SafeguardConnection")
			.field("host_name", &self.host_name)
			.field("stream_active", &self.stream_active.load(Ordering::SeqCst))
			.finish()
	}
}

/// Teardown handle for an active event-stream subscription.
///
/// Dropping (or [`close`](EventSubscription::close)-ing) the handle aborts the background
/// polling task and frees the connection's single subscription slot.
pub struct EventSubscription {
	handle: tokio::task::JoinHandle<()>,
	active: Arc<AtomicBool>,
}
impl EventSubscription {
	/// Tears the subscription down.
	pub fn close(self) {}
}
impl Drop for EventSubscription {
	fn drop(&mut self) {
		self.handle.abort();
		self.active.store(false, Ordering::SeqCst);
	}
}
impl Debug for EventSubscription {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("EventSubscription(..)")
	}
}

fn bearer_value(user_token: &str) -> Result<HeaderValue> {
	HeaderValue::from_str(&format!("Bearer {user_token}"))
		.map_err(|e| TransportError::Header { source: e }.into())
}
