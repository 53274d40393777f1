// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use safeguard_rs::{
	error::{Error, ProtocolError, TransportError, ValidationError},
	flows::Safeguard,
	http::Invoker,
	reqwest,
	store::{CredentialStore, MemoryStore},
};

const TOKEN_PATH: &str = "/RSTS/oauth2/token";
const TRADE_PATH: &str = "/service/core/v3/Token/LoginResponse";

fn insecure_invoker() -> Invoker {
	let client = reqwest::Client::builder()
		.danger_accept_invalid_certs(true)
		.build()
		.expect("Failed to build insecure reqwest client for tests.");

	Invoker::with_client(client)
}

fn memory_session() -> (Safeguard, Arc<MemoryStore>) {
	let store = Arc::new(MemoryStore::default());

	(Safeguard::with_invoker(store.clone(), insecure_invoker()), store)
}

#[tokio::test]
async fn password_connect_populates_both_tokens() {
	let server = MockServer::start_async().await;
	let host = server.address().to_string();
	let (session, store) = memory_session();
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH).json_body(json!({
				"grant_type": "password",
				"username": "admin",
				"password": "secret",
				"scope": "rsts:sts:primaryproviderid:local",
			}));
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"sts-access\"}");
		})
		.await;
	let trade_mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TRADE_PATH).json_body(json!({ "StsAccessToken": "sts-access" }));
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"Status\":\"Success\",\"UserToken\":\"user-1\"}");
		})
		.await;
	let connection = session
		.connect_password(&host, "admin", "secret", None)
		.await
		.expect("Password connect should succeed against the mock appliance.");

	assert_eq!(connection.host_name(), host);
	assert_eq!(store.host_name(), host);
	assert_eq!(store.access_token(), "sts-access");
	assert_eq!(store.user_token(), "user-1");

	token_mock.assert_async().await;
	trade_mock.assert_async().await;
}

#[tokio::test]
async fn password_connect_fails_fast_per_missing_field() {
	let server = MockServer::start_async().await;
	let host = server.address().to_string();
	let (session, _store) = memory_session();
	let mock = server
		.mock_async(|when, then| {
			when.path(TOKEN_PATH);
			then.status(200).body("{\"access_token\":\"never\"}");
		})
		.await;
	let cases: [(&str, &str, &str, ValidationError); 3] = [
		("", "admin", "secret", ValidationError::MissingHostName),
		(&host, "", "secret", ValidationError::MissingUserName),
		(&host, "admin", "", ValidationError::MissingPassword),
	];

	for (host_name, user_name, password, expected) in cases {
		let err = session
			.connect_password(host_name, user_name, password, None)
			.await
			.expect_err("A missing required field should be rejected.");

		assert!(
			matches!(&err, Error::Validation(actual) if *actual == expected),
			"Expected {expected:?}, got {err:?}.",
		);
	}

	mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn password_connect_surfaces_the_sts_error_body() {
	let server = MockServer::start_async().await;
	let host = server.address().to_string();
	let (session, store) = memory_session();
	let _token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(400).body("invalid credentials");
		})
		.await;
	let err = session
		.connect_password(&host, "admin", "wrong", None)
		.await
		.expect_err("A rejected grant should fail the flow.");

	assert!(matches!(
		err,
		Error::Transport(TransportError::Status { status: 400, ref body }) if body == "invalid credentials"
	));
	assert_eq!(store.user_token(), "");
}

#[tokio::test]
async fn rejected_trade_keeps_the_access_token_dangling() {
	let server = MockServer::start_async().await;
	let host = server.address().to_string();
	let (session, store) = memory_session();
	let _token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"sts-access\"}");
		})
		.await;
	let trade_mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TRADE_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"Status\":\"Failure\",\"UserToken\":\"\"}");
		})
		.await;
	let err = session
		.connect_password(&host, "admin", "secret", None)
		.await
		.expect_err("A rejected trade should fail the flow.");

	assert!(matches!(
		err,
		Error::Protocol(ProtocolError::TokenExchangeRejected { ref status }) if status == "Failure"
	));
	// The pre-trade write is preserved; a later redirect-flow connect can retry the trade.
	assert_eq!(store.access_token(), "sts-access");
	assert_eq!(store.user_token(), "");

	trade_mock.assert_async().await;
}
