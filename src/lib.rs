//! Client-side OpenID Connect engine—Authorization Code + PKCE flows, identity-continuity
//! validation, and pluggable state storage in one crate built for production.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod claims;
pub mod client;
pub mod error;
pub mod http;
pub mod jwt;
pub mod metadata;
pub mod obs;
pub mod request;
pub mod response;
pub mod settings;
pub mod state;
pub mod store;
pub mod token;
pub mod validator;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		client::OidcClient,
		http::ReqwestHttpFetcher,
		settings::OidcClientSettings,
		store::{MemoryStateStore, StateStore},
	};

	/// Client type alias used by reqwest-backed integration tests.
	pub type ReqwestTestClient = OidcClient<ReqwestHttpFetcher>;

	/// Builds a reqwest HTTP fetcher that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_fetcher() -> ReqwestHttpFetcher {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpFetcher::with_client(client)
	}

	/// Constructs an [`OidcClient`] backed by an in-memory store and the reqwest transport
	/// used across integration tests.
	pub fn build_reqwest_test_client(
		settings: OidcClientSettings,
	) -> (ReqwestTestClient, Arc<MemoryStateStore>) {
		let store_backend = Arc::new(MemoryStateStore::default());
		let store: Arc<dyn StateStore> = store_backend.clone();
		let client =
			OidcClient::with_http_fetcher(settings, store, Arc::new(test_reqwest_http_fetcher()));

		(client, store_backend)
	}

	/// Builds an unsigned JWT carrying `claims` as its payload, shaped like the tokens a
	/// provider would issue.
	pub fn test_jwt(claims: &serde_json::Value) -> String {
		// crates.io
		use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};

		let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
		let payload = URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes());

		format!("{header}.{payload}.")
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use parking_lot::RwLock;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
#[cfg(test)] use oidc_client as _;
