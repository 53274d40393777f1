//! Optional observability helpers for authentication flows.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `safeguard.flow` with the `flow` and
//!   `stage` (call site) fields, plus warnings for background event-stream retries and
//!   credential-snapshot persistence failures.
//! - Enable `metrics` to increment the `safeguard_flow_total` counter for every
//!   attempt/success/failure, labeled by `flow` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// std
use std::path::Path;
// self
use crate::{_prelude::*, error::StorageError};

/// Authentication flow kinds observed by the SDK.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Anonymous connection without credentials.
	Anonymous,
	/// Redirect-based federation login.
	Rsts,
	/// Username/password grant.
	Password,
	/// Client-certificate grant.
	Certificate,
	/// Application-to-application secret retrieval.
	A2a,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Anonymous => "anonymous",
			FlowKind::Rsts => "rsts",
			FlowKind::Password => "password",
			FlowKind::Certificate => "certificate",
			FlowKind::A2a => "a2a",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to an SDK flow.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Logs a failed event-stream attempt that will be retried in the background.
pub(crate) fn record_stream_retry(host_name: &str, error: &Error) {
	#[cfg(feature = "tracing")]
	::tracing::warn!(host_name, error = %error, "Event stream attempt failed; reconnecting.");

	#[cfg(not(feature = "tracing"))]
	let _ = (host_name, error);
}

/// Logs a credential-snapshot write failure; the in-memory store stays authoritative.
pub(crate) fn record_store_persist_failure(path: &Path, error: &StorageError) {
	#[cfg(feature = "tracing")]
	::tracing::warn!(path = %path.display(), error = %error, "Credential snapshot persistence failed.");

	#[cfg(not(feature = "tracing"))]
	let _ = (path, error);
}
