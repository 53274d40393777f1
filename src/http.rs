//! Transport primitives for appliance HTTP exchanges.
//!
//! [`Invoker`] is the SDK's only dependency on an HTTP stack: a thin wrapper over
//! [`ReqwestClient`] that assembles a client per call from the accumulated trust anchors plus an
//! optional pinned [`TransportContext`], attaches the appliance's JSON headers, and normalizes
//! every outcome into a uniform (status, headers, body) result. Redirects are never followed;
//! the appliance's endpoints return results directly.

// crates.io
use reqwest::{
	Certificate, Identity, Method,
	header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue},
	redirect::Policy,
};
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	error::TransportError,
	tls::{self, ClientIdentity, TransportContext},
};

/// Executes single outbound appliance requests over a reqwest transport.
///
/// By default each call builds its client from the current certificate-authority snapshot so
/// trust anchors added between calls take effect immediately. [`Invoker::with_client`] pins a
/// caller-provided client instead, bypassing both the trust set and any per-call identity; tests
/// use this seam for mock servers with self-signed certificates.
#[derive(Clone, Debug, Default)]
pub struct Invoker {
	custom: Option<ReqwestClient>,
}
impl Invoker {
	/// Creates an invoker that derives its transport from the process trust set per call.
	pub fn new() -> Self {
		Self::default()
	}

	/// Wraps an existing reqwest [`ReqwestClient`], used verbatim for every call.
	pub fn with_client(client: ReqwestClient) -> Self {
		Self { custom: Some(client) }
	}

	/// Executes `request`, normalizing transport and HTTP-level failures.
	pub(crate) async fn execute(&self, request: ApplianceRequest) -> Result<ApplianceResponse> {
		let client = self.client_for(request.context.as_ref())?;
		let mut builder =
			client.request(request.method, request.url).headers(default_headers());

		if let Some(body) = &request.body {
			builder = builder.json(body);
		}
		if let Some(text) = request.text_body {
			builder = builder.body(text);
		}

		builder = builder.headers(request.headers);

		let response =
			builder.send().await.map_err(|e| TransportError::Network { source: e })?;
		let status = response.status();
		let headers = response.headers().clone();
		let body =
			response.text().await.map_err(|e| TransportError::Network { source: e })?;

		if status.is_success() {
			Ok(ApplianceResponse { status: status.as_u16(), headers, body })
		} else {
			Err(TransportError::Status { status: status.as_u16(), body }.into())
		}
	}

	fn client_for(&self, context: Option<&TransportContext>) -> Result<ReqwestClient> {
		if let Some(client) = &self.custom {
			return Ok(client.clone());
		}

		let mut builder = ReqwestClient::builder().redirect(Policy::none());

		builder = match context {
			None => builder.use_rustls_tls(),
			Some(context) => match context.identity() {
				ClientIdentity::Pem { certificate, key } => {
					let mut bundle = certificate.clone();

					bundle.push(b'\n');
					bundle.extend_from_slice(key);

					let identity = Identity::from_pem(&bundle)
						.map_err(|e| TransportError::ClientBuild { source: e })?;

					builder.use_rustls_tls().identity(identity)
				},
				ClientIdentity::Pkcs12 { archive } => {
					let identity = Identity::from_pkcs12_der(archive, context.passphrase())
						.map_err(|e| TransportError::ClientBuild { source: e })?;

					builder.use_native_tls().identity(identity)
				},
			},
		};

		for pem in tls::ca_pems() {
			let anchor = Certificate::from_pem(&pem)
				.map_err(|e| TransportError::ClientBuild { source: e })?;

			builder = builder.add_root_certificate(anchor);
		}

		Ok(builder.build().map_err(|e| TransportError::ClientBuild { source: e })?)
	}
}

/// One outbound appliance request, fully assembled by the calling flow.
#[derive(Debug)]
pub(crate) struct ApplianceRequest {
	pub method: Method,
	pub url: Url,
	pub body: Option<Value>,
	pub text_body: Option<String>,
	pub headers: HeaderMap,
	pub context: Option<TransportContext>,
}
impl ApplianceRequest {
	pub fn new(method: Method, url: Url) -> Self {
		Self { method, url, body: None, text_body: None, headers: HeaderMap::new(), context: None }
	}

	pub fn json(mut self, body: Value) -> Self {
		self.body = Some(body);

		self
	}

	pub fn text(mut self, body: impl Into<String>) -> Self {
		self.text_body = Some(body.into());

		self
	}

	pub fn headers(mut self, headers: HeaderMap) -> Self {
		self.headers = headers;

		self
	}

	pub fn context(mut self, context: TransportContext) -> Self {
		self.context = Some(context);

		self
	}
}

/// Normalized appliance response: 2xx status, response headers, and the raw body.
#[derive(Clone, Debug)]
pub(crate) struct ApplianceResponse {
	#[allow(dead_code)]
	pub status: u16,
	pub headers: HeaderMap,
	pub body: String,
}

fn default_headers() -> HeaderMap {
	let mut headers = HeaderMap::new();

	headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
	headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

	headers
}
