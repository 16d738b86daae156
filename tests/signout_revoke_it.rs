#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use oidc_client::{
	_preludet::*,
	client::CreateSignoutRequestArgs,
	error::{ConfigError, Error, TransportError},
	settings::OidcClientSettings,
};

const CLIENT_ID: &str = "client-it";

fn build_settings(server: &MockServer) -> OidcClientSettings {
	let authority: Url =
		server.base_url().parse().expect("Mock server base URL should parse successfully.");
	let metadata = json!({
		"issuer": server.base_url(),
		"end_session_endpoint": server.url("/end-session"),
		"revocation_endpoint": server.url("/revoke"),
	})
	.as_object()
	.cloned()
	.expect("Metadata fixture should be a JSON object.");

	OidcClientSettings::builder(authority, CLIENT_ID, "https://app.example.com/callback")
		.client_secret("secret-it")
		.post_logout_redirect_uri("https://app.example.com/signed-out")
		.metadata(metadata)
		.build()
		.expect("Settings should build successfully.")
}

#[tokio::test]
async fn signout_with_caller_data_round_trips_through_the_store() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(build_settings(&server));
	let request = client
		.create_signout_request(CreateSignoutRequestArgs {
			id_token_hint: Some("header.payload.".into()),
			state_data: Some(json!({"landing": "/bye"})),
			..<_>::default()
		})
		.await
		.expect("Signout request should build successfully.");
	let state = request.state.clone().expect("Caller data should create correlation state.");

	assert_eq!(store.len(), 1);

	let pairs: HashMap<_, _> = request.url.query_pairs().into_owned().collect();

	assert_eq!(pairs.get("id_token_hint"), Some(&"header.payload.".into()));
	assert_eq!(
		pairs.get("post_logout_redirect_uri"),
		Some(&"https://app.example.com/signed-out".into())
	);
	assert_eq!(pairs.get("client_id"), Some(&CLIENT_ID.into()));
	assert_eq!(pairs.get("state"), Some(&state.id.clone()));

	let callback: Url = format!("https://app.example.com/signed-out?state={}", state.id)
		.parse()
		.expect("Callback URL should parse successfully.");
	let response = client
		.process_signout_response(&callback)
		.await
		.expect("Signout response should validate successfully.");

	assert_eq!(response.user_state, Some(json!({"landing": "/bye"})));
	assert!(store.is_empty());
}

#[tokio::test]
async fn bare_signout_persists_nothing() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(build_settings(&server));
	let request = client
		.create_signout_request(<_>::default())
		.await
		.expect("Signout request should build successfully.");

	assert_eq!(request.state, None);
	assert!(store.is_empty());

	let callback: Url = "https://app.example.com/signed-out"
		.parse()
		.expect("Callback URL should parse successfully.");
	let response = client
		.process_signout_response(&callback)
		.await
		.expect("A stateless signout response should validate successfully.");

	assert_eq!(response.user_state, None);
}

#[tokio::test]
async fn signout_error_callback_maps_to_protocol_error() {
	let server = MockServer::start_async().await;
	let (client, _) = build_reqwest_test_client(build_settings(&server));
	let request = client
		.create_signout_request(CreateSignoutRequestArgs {
			state_data: Some(json!({"landing": "/bye"})),
			..<_>::default()
		})
		.await
		.expect("Signout request should build successfully.");
	let state = request.state.expect("Caller data should create correlation state.");
	let callback: Url =
		format!("https://app.example.com/signed-out?error=server_error&state={}", state.id)
			.parse()
			.expect("Callback URL should parse successfully.");
	let error = client
		.process_signout_response(&callback)
		.await
		.expect_err("A provider error callback should be fatal.");
	let Error::Protocol(response) = error else {
		panic!("Provider error callbacks should map to protocol errors.");
	};

	assert_eq!(response.error, "server_error");
	assert_eq!(response.state, Some(json!({"landing": "/bye"})));
}

#[tokio::test]
async fn revoke_sends_the_client_credentials() {
	let server = MockServer::start_async().await;
	let (client, _) = build_reqwest_test_client(build_settings(&server));
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/revoke")
				.body_includes("token=refresh-doomed")
				.body_includes("token_type_hint=refresh_token")
				.body_includes(format!("client_id={CLIENT_ID}"))
				.body_includes("client_secret=secret-it");
			then.status(200);
		})
		.await;

	client
		.revoke_token("refresh-doomed", Some("refresh_token"))
		.await
		.expect("Revocation should succeed.");

	mock.assert_async().await;
}

#[tokio::test]
async fn revoke_failure_is_fatal() {
	let server = MockServer::start_async().await;
	let (client, _) = build_reqwest_test_client(build_settings(&server));
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/revoke");
			then.status(503);
		})
		.await;
	let error = client
		.revoke_token("refresh-doomed", None)
		.await
		.expect_err("A failed revocation should be fatal.");

	assert!(matches!(
		error,
		Error::Transport(TransportError::Status { endpoint: "revocation", status: 503 })
	));
}

#[tokio::test]
async fn revoke_without_an_advertised_endpoint_is_a_config_error() {
	let server = MockServer::start_async().await;
	let mut settings = build_settings(&server);

	settings.metadata = json!({"issuer": server.base_url()})
		.as_object()
		.cloned();

	let (client, _) = build_reqwest_test_client(settings);
	let error = client
		.revoke_token("refresh-doomed", None)
		.await
		.expect_err("Revocation without an endpoint should fail.");

	assert!(matches!(
		error,
		Error::Config(ConfigError::MissingEndpoint { name: "revocation_endpoint" })
	));
}
