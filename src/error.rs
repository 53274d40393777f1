//! SDK-level error types shared across flows, the provider resolver, and stores.

// self
use crate::_prelude::*;

/// SDK-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Canonical SDK error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// A required input was missing or empty; raised before any I/O.
	#[error(transparent)]
	Validation(#[from] ValidationError),
	/// Identity-provider discovery or matching failed.
	#[error(transparent)]
	Resolution(#[from] ResolutionError),
	/// Transport failure (network, TLS, non-2xx response).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Well-formed response with semantically invalid content.
	#[error(transparent)]
	Protocol(#[from] ProtocolError),
	/// Persistence-layer failure.
	#[error(transparent)]
	Storage(#[from] StorageError),
}

/// Input-validation failures, one distinct variant per required field.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ValidationError {
	/// Host name argument was empty.
	#[error("Host name may not be empty.")]
	MissingHostName,
	/// User name argument was empty.
	#[error("User name may not be empty.")]
	MissingUserName,
	/// Password argument was empty.
	#[error("Password may not be empty.")]
	MissingPassword,
	/// Certificate passphrase argument was empty.
	#[error("Certificate passphrase may not be empty.")]
	MissingPassphrase,
	/// No client certificate material was supplied.
	#[error("Client certificate material may not be empty.")]
	MissingCertificate,
	/// The private key paired with a PEM certificate was empty.
	#[error("Client certificate key may not be empty.")]
	MissingCertificateKey,
	/// A2A API key argument was empty.
	#[error("A2A API key may not be empty.")]
	MissingApiKey,
	/// Redirect URI argument was empty.
	#[error("Redirect URI may not be empty.")]
	MissingRedirectUri,
	/// Relative URL argument was empty.
	#[error("Relative URL may not be empty.")]
	MissingRelativeUrl,
	/// No user token is present in the credential store.
	#[error("User token is missing. Please log in again.")]
	MissingUserToken,
	/// The requested service is outside the appliance's closed service set.
	#[error("Unsupported service requested: `{service}`.")]
	UnsupportedService {
		/// Service name as supplied by the caller.
		service: String,
	},
	/// An event-stream subscription is already active on this connection.
	#[error("An event stream is already registered on this connection.")]
	EventStreamActive,
	/// A request URL could not be assembled from the supplied parts.
	#[error("Request URL is invalid.")]
	InvalidUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
}

/// Identity-provider resolution failures.
#[derive(Debug, ThisError)]
pub enum ResolutionError {
	/// Both the POST and the GET discovery attempts failed.
	#[error("Provider discovery failed while resolving `{provider}`.")]
	DiscoveryFailed {
		/// Provider name or id as requested by the caller.
		provider: String,
		/// Error from the final (GET) discovery attempt.
		#[source]
		source: Box<Error>,
	},
	/// The discovery response listed no matching provider.
	#[error("No identity provider matched `{provider}`.")]
	UnknownProvider {
		/// Provider name or id as requested by the caller.
		provider: String,
	},
}

/// Transport-level failures (network, TLS, HTTP status).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Appliance answered with a non-2xx status; the body is carried verbatim.
	#[error("Appliance returned HTTP {status}: {body}")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Response body, stringified.
		body: String,
	},
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the appliance.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: reqwest::Error,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	ClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: reqwest::Error,
	},
	/// A header value could not be encoded.
	#[error("Header value could not be encoded.")]
	Header {
		/// Underlying encoding failure.
		#[source]
		source: reqwest::header::InvalidHeaderValue,
	},
}

/// Semantically invalid responses from the appliance.
#[derive(Debug, ThisError)]
pub enum ProtocolError {
	/// The token exchange endpoint answered with a non-success status field.
	#[error("Appliance rejected the token exchange with status `{status}`.")]
	TokenExchangeRejected {
		/// Status field reported by the appliance.
		status: String,
	},
	/// A response body could not be deserialized into its expected shape.
	#[error("Appliance returned a malformed response.")]
	MalformedResponse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// The lifetime-remaining response omitted its sentinel header.
	#[error("Appliance response is missing the token lifetime header.")]
	MissingLifetimeHeader,
	/// The lifetime-remaining header did not parse as a number of seconds.
	#[error("Token lifetime header value `{value}` is not a number of seconds.")]
	MalformedLifetimeHeader {
		/// Header value as received.
		value: String,
	},
	/// The state returned by the login redirect does not match the stored value.
	#[error("Login callback state does not match the pending request.")]
	StateMismatch,
}

/// Error type produced by persistent credential stores and file loaders.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StorageError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

#[cfg(test)]
mod tests {
	// std
	use std::error::Error as StdError;
	// self
	use super::*;

	#[test]
	fn storage_error_converts_into_sdk_error_with_source() {
		let storage_error = StorageError::Backend { message: "snapshot unreadable".into() };
		let sdk_error: Error = storage_error.clone().into();

		assert!(matches!(sdk_error, Error::Storage(_)));
		assert!(sdk_error.to_string().contains("snapshot unreadable"));
	}

	#[test]
	fn validation_errors_are_distinct_per_field() {
		let host = Error::from(ValidationError::MissingHostName).to_string();
		let user = Error::from(ValidationError::MissingUserName).to_string();
		let pass = Error::from(ValidationError::MissingPassword).to_string();

		assert_ne!(host, user);
		assert_ne!(user, pass);
		assert_ne!(host, pass);
	}

	#[test]
	fn resolution_error_exposes_discovery_source() {
		let inner = Error::from(TransportError::Status { status: 503, body: "busy".into() });
		let outer = Error::from(ResolutionError::DiscoveryFailed {
			provider: "corp-ad".into(),
			source: Box::new(inner),
		});

		assert!(outer.to_string().contains("corp-ad"));

		let source = StdError::source(&outer)
			.expect("Resolution error should expose the discovery failure as its source.");

		assert!(source.to_string().contains("503"));
	}
}
