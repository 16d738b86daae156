#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use oidc_client::{
	_preludet::*,
	settings::OidcClientSettings,
	state::{RequestType, State, StateArgs},
	store::StateStore,
};

const CLIENT_ID: &str = "client-it";

fn build_settings(server: &MockServer) -> OidcClientSettings {
	let authority: Url =
		server.base_url().parse().expect("Mock server base URL should parse successfully.");
	let metadata = json!({
		"issuer": server.base_url(),
		"authorization_endpoint": server.url("/authorize"),
	})
	.as_object()
	.cloned()
	.expect("Metadata fixture should be a JSON object.");

	OidcClientSettings::builder(authority, CLIENT_ID, "https://app.example.com/callback")
		.metadata(metadata)
		.build()
		.expect("Settings should build successfully.")
}

fn aged_record(age_seconds: i64) -> String {
	let mut state = State::new(StateArgs {
		id: None,
		request_type: RequestType::SigninRedirect,
		data: None,
		url_state: None,
	});

	state.created = OffsetDateTime::now_utc() - Duration::seconds(age_seconds);

	state.to_storage_string().expect("State should serialize for storage.")
}

#[tokio::test]
async fn stale_sweep_removes_only_expired_prefixed_records() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(build_settings(&server));

	// Default staleness cutoff is 900 seconds.
	store.set("oidc.fresh", aged_record(10)).await.expect("Store set should succeed.");
	store.set("oidc.expired", aged_record(1_000)).await.expect("Store set should succeed.");
	store.set("oidc.garbage", "not json".into()).await.expect("Store set should succeed.");
	store.set("oidc.empty", String::new()).await.expect("Store set should succeed.");
	store
		.set("unrelated.expired", aged_record(1_000))
		.await
		.expect("Store set should succeed.");

	client.clear_stale_state().await.expect("Stale-state sweep should succeed.");

	let mut keys = store.all_keys().await.expect("Key enumeration should succeed.");

	keys.sort();

	assert_eq!(keys, ["oidc.fresh", "unrelated.expired"]);
}

#[tokio::test]
async fn sweep_treats_the_cutoff_as_inclusive() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(build_settings(&server));

	store.set("oidc.at-cutoff", aged_record(900)).await.expect("Store set should succeed.");

	client.clear_stale_state().await.expect("Stale-state sweep should succeed.");

	assert!(store.is_empty());
}

#[tokio::test]
async fn read_signin_response_leaves_the_record_in_place() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(build_settings(&server));
	let request = client
		.create_signin_request(<_>::default())
		.await
		.expect("Signin request should build successfully.");
	let callback: Url =
		format!("https://app.example.com/callback?code=c&state={}", request.state.state.id)
			.parse()
			.expect("Callback URL should parse successfully.");
	let (response, state) = client
		.read_signin_response(&callback)
		.await
		.expect("Reading a signin response should succeed.");

	assert_eq!(response.code.as_deref(), Some("c"));
	assert_eq!(state, request.state);
	assert_eq!(store.len(), 1);

	// A second read still finds the record.
	client
		.read_signin_response(&callback)
		.await
		.expect("A repeated read should still find the record.");
}
