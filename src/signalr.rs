//! Long-polling SignalR client for the appliance's event service.
//!
//! The appliance publishes events through a SignalR hub at `service/event/signalr`. The
//! subscription task negotiates a connection, completes the JSON-protocol handshake, and then
//! long-polls for record-separated frames, surfacing every `NotifyEventAsync` invocation to the
//! registered callback. Any failure tears the session down, is logged through the optional
//! `tracing` hook, and leads to a renegotiation with a freshly read user token after a short
//! delay.

// std
use std::time::Duration as StdDuration;
// crates.io
use reqwest::{
	Method,
	header::{AUTHORIZATION, HeaderMap, HeaderValue},
};
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	error::{TransportError, ValidationError},
	flows::common::{parse_json, parse_url},
	http::{ApplianceRequest, Invoker},
	obs,
	store::CredentialStore,
};

/// SignalR JSON-protocol record separator.
const RECORD_SEPARATOR: char = '\u{1e}';
/// Hub method name the appliance invokes for event notifications.
const NOTIFY_METHOD: &str = "NotifyEventAsync";
/// Delay between reconnect attempts after a failed or closed session.
const RECONNECT_DELAY: StdDuration = StdDuration::from_secs(5);

/// One inbound appliance event.
#[derive(Clone, Debug)]
pub struct ApplianceEvent {
	/// Human-readable event message, when the payload carries one.
	pub message: String,
	/// Full event payload as received.
	pub body: Value,
}

/// Callback invoked once per inbound event.
pub type EventCallback = Arc<dyn Fn(ApplianceEvent) + Send + Sync>;

#[derive(Clone, Debug, Deserialize)]
struct NegotiateResponse {
	#[serde(default, rename = "connectionToken")]
	connection_token: String,
	#[serde(default, rename = "connectionId")]
	connection_id: String,
}

#[derive(Clone, Debug, Deserialize)]
struct HubFrame {
	#[serde(default, rename = "type")]
	kind: u8,
	#[serde(default)]
	target: String,
	#[serde(default)]
	arguments: Vec<Value>,
}

/// Runs the subscription loop until the owning task is aborted.
pub(crate) async fn run_event_stream(
	host_name: String,
	store: Arc<dyn CredentialStore>,
	invoker: Invoker,
	callback: EventCallback,
) {
	loop {
		if let Err(e) = poll_session(&host_name, store.as_ref(), &invoker, &callback).await {
			obs::record_stream_retry(&host_name, &e);
		}

		tokio::time::sleep(RECONNECT_DELAY).await;
	}
}

/// Negotiates one SignalR session and polls it until the server closes or a request fails.
async fn poll_session(
	host_name: &str,
	store: &dyn CredentialStore,
	invoker: &Invoker,
	callback: &EventCallback,
) -> Result<()> {
	let base = format!("https://{host_name}/service/event/signalr");
	let negotiate_url = parse_url(format!("{base}/negotiate?negotiateVersion=1"))?;
	let negotiate = invoker
		.execute(
			ApplianceRequest::new(Method::POST, negotiate_url)
				.headers(bearer_headers(store)?),
		)
		.await?;
	let negotiated: NegotiateResponse = parse_json(&negotiate.body)?;
	let connection_id = if negotiated.connection_token.is_empty() {
		negotiated.connection_id
	} else {
		negotiated.connection_token
	};
	let session_url = parse_url(format!("{base}?id={connection_id}"))?;

	// The handshake selects the JSON protocol; the trailing record separator is mandatory.
	invoker
		.execute(
			ApplianceRequest::new(Method::POST, session_url.clone())
				.headers(bearer_headers(store)?)
				.text(format!("{{\"protocol\":\"json\",\"version\":1}}{RECORD_SEPARATOR}")),
		)
		.await?;

	loop {
		let poll = invoker
			.execute(
				ApplianceRequest::new(Method::GET, session_url.clone())
					.headers(bearer_headers(store)?),
			)
			.await?;

		if dispatch_frames(&poll.body, callback)? {
			// Server-initiated close; leave the session and renegotiate.
			return Ok(());
		}
	}
}

/// Dispatches every frame in a poll body; returns `true` when the server closed the session.
fn dispatch_frames(body: &str, callback: &EventCallback) -> Result<bool> {
	for raw in body.split(RECORD_SEPARATOR).filter(|raw| !raw.trim().is_empty()) {
		// The handshake acknowledgement is an empty object without a type tag.
		if raw.trim() == "{}" {
			continue;
		}

		let frame: HubFrame = parse_json(raw)?;

		match frame.kind {
			1 if frame.target == NOTIFY_METHOD =>
				for argument in frame.arguments {
					callback(event_from(argument));
				},
			7 => return Ok(true),
			_ => {},
		}
	}

	Ok(false)
}

fn event_from(argument: Value) -> ApplianceEvent {
	let message = argument
		.get("Message")
		.and_then(Value::as_str)
		.unwrap_or_default()
		.to_owned();

	ApplianceEvent { message, body: argument }
}

fn bearer_headers(store: &dyn CredentialStore) -> Result<HeaderMap> {
	let user_token = store.user_token();

	if user_token.is_empty() {
		return Err(ValidationError::MissingUserToken.into());
	}

	let mut headers = HeaderMap::new();
	let bearer = HeaderValue::from_str(&format!("Bearer {user_token}"))
		.map_err(|e| TransportError::Header { source: e })?;

	headers.insert(AUTHORIZATION, bearer);

	Ok(headers)
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::Mutex as StdMutex;
	// self
	use super::*;

	fn collecting_callback() -> (EventCallback, Arc<StdMutex<Vec<ApplianceEvent>>>) {
		let seen = Arc::new(StdMutex::new(Vec::new()));
		let sink = seen.clone();
		let callback: EventCallback = Arc::new(move |event| {
			sink.lock().expect("Event sink lock should not be poisoned.").push(event);
		});

		(callback, seen)
	}

	#[test]
	fn dispatch_surfaces_notify_invocations() {
		let (callback, seen) = collecting_callback();
		let body = format!(
			"{{\"type\":1,\"target\":\"NotifyEventAsync\",\"arguments\":[{{\"Message\":\"AccessRequestCreated\",\"Data\":7}}]}}{RECORD_SEPARATOR}{{\"type\":6}}{RECORD_SEPARATOR}"
		);
		let closed = dispatch_frames(&body, &callback)
			.expect("A well-formed poll body should dispatch.");

		assert!(!closed);

		let seen = seen.lock().expect("Event sink lock should not be poisoned.");

		assert_eq!(seen.len(), 1);
		assert_eq!(seen[0].message, "AccessRequestCreated");
		assert_eq!(seen[0].body["Data"], 7);
	}

	#[test]
	fn dispatch_ignores_foreign_targets_and_pings() {
		let (callback, seen) = collecting_callback();
		let body = format!(
			"{{\"type\":1,\"target\":\"SomethingElse\",\"arguments\":[{{}}]}}{RECORD_SEPARATOR}{{\"type\":6}}{RECORD_SEPARATOR}{{}}{RECORD_SEPARATOR}"
		);
		let closed = dispatch_frames(&body, &callback)
			.expect("A well-formed poll body should dispatch.");

		assert!(!closed);
		assert!(
			seen.lock().expect("Event sink lock should not be poisoned.").is_empty(),
			"Foreign targets must not reach the callback."
		);
	}

	#[test]
	fn dispatch_reports_server_close() {
		let (callback, _) = collecting_callback();
		let body = format!("{{\"type\":7}}{RECORD_SEPARATOR}");
		let closed = dispatch_frames(&body, &callback)
			.expect("A close frame should dispatch cleanly.");

		assert!(closed);
	}
}
