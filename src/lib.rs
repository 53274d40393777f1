//! Client SDK for One Identity Safeguard appliances—credential flows, token exchange, event
//! streams, and A2A secret retrieval with pluggable credential storage.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod connection;
pub mod error;
pub mod flows;
pub mod http;
pub mod obs;
pub mod provider;
pub mod signalr;
pub mod store;
pub mod tls;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience helpers for integration tests; enabled via `cfg(test)` or the `test` crate
	//! feature.

	pub use crate::_prelude::*;

	// self
	use crate::{flows::Safeguard, http::Invoker, store::MemoryStore};

	/// Builds an [`Invoker`] that accepts the self-signed certificates produced by `httpmock`
	/// during tests.
	pub fn insecure_invoker() -> Invoker {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		Invoker::with_client(client)
	}

	/// Constructs a [`Safeguard`] session backed by a fresh in-memory store and the insecure
	/// test transport, returning the concrete store alongside for assertions.
	pub fn memory_session() -> (Safeguard, Arc<MemoryStore>) {
		let store_backend = Arc::new(MemoryStore::default());
		let session = Safeguard::with_invoker(store_backend.clone(), insecure_invoker());

		(session, store_backend)
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		sync::Arc,
	};

	pub use parking_lot::RwLock;
	pub use reqwest::Client as ReqwestClient;
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::Duration;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(test)] use httpmock as _;
