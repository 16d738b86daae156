//! Callback-URL parsing for signin and signout responses.

// std
use std::borrow::Cow;
// crates.io
use serde_json::Value;
use url::form_urlencoded;
// self
use crate::{_prelude::*, claims::Claims, state::State, token::TokenEndpointResponse};

/// Where the OP is asked to deliver authorization response parameters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
	/// Parameters arrive in the callback URL's query string.
	#[default]
	Query,
	/// Parameters arrive in the callback URL's fragment.
	Fragment,
}

/// Parsed authorization response, progressively enriched by validation.
///
/// Starts as the raw callback parameters; code exchange then fills the token fields
/// and claims processing fills `profile`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SigninResponse {
	/// Correlation id portion of the returned `state` parameter.
	pub state: Option<String>,
	/// Caller suffix portion of the returned `state` parameter.
	pub url_state: Option<String>,
	/// Authorization code, present on success.
	pub code: Option<String>,
	/// OAuth error code, present on failure.
	pub error: Option<String>,
	/// Human-readable error detail.
	pub error_description: Option<String>,
	/// URI with further error information.
	pub error_uri: Option<String>,
	/// OP session-state value for session monitoring.
	pub session_state: Option<String>,
	/// Access token obtained from the code exchange.
	pub access_token: Option<String>,
	/// Token type reported by the token endpoint.
	pub token_type: Option<String>,
	/// ID token obtained from the code exchange.
	pub id_token: Option<String>,
	/// Refresh token obtained from the code exchange.
	pub refresh_token: Option<String>,
	/// Granted scope.
	pub scope: Option<String>,
	/// Absolute access-token expiry derived from `expires_in`.
	pub expires_at: Option<OffsetDateTime>,
	/// Filtered profile claims established during validation.
	pub profile: Claims,
	/// Opaque caller payload restored from the matched state record.
	pub user_state: Option<Value>,
}
impl SigninResponse {
	/// Parses the raw response parameters from a callback URL.
	pub fn from_url(url: &Url, mode: ResponseMode) -> Self {
		let mut this = Self::default();

		for (name, value) in response_params(url, mode) {
			match &*name {
				"state" => {
					let (id, url_state) = State::split_wire_state(&value);

					this.state = Some(id.to_owned());
					this.url_state = url_state.map(ToOwned::to_owned);
				},
				"code" => this.code = Some(value.into_owned()),
				"error" => this.error = Some(value.into_owned()),
				"error_description" => this.error_description = Some(value.into_owned()),
				"error_uri" => this.error_uri = Some(value.into_owned()),
				"session_state" => this.session_state = Some(value.into_owned()),
				_ => {},
			}
		}

		this
	}

	/// Remaining access-token lifetime in whole seconds, negative once expired.
	pub fn expires_in(&self) -> Option<i64> {
		self.expires_at.map(|at| (at - OffsetDateTime::now_utc()).whole_seconds())
	}

	/// Records an absolute expiry `seconds` from now.
	pub fn set_expires_in(&mut self, seconds: i64) {
		self.expires_at = Some(OffsetDateTime::now_utc() + Duration::seconds(seconds));
	}

	/// Whether this response belongs to an OpenID Connect flow rather than plain OAuth.
	pub fn is_open_id(&self) -> bool {
		self.scope.as_deref().map(|s| s.split_whitespace().any(|part| part == "openid")).unwrap_or(false)
			|| self.id_token.is_some()
	}

	/// Folds a token-endpoint response into this record.
	pub(crate) fn apply_token_response(&mut self, token_response: &TokenEndpointResponse) {
		if let Some(access_token) = &token_response.access_token {
			self.access_token = Some(access_token.clone());
		}
		if let Some(token_type) = &token_response.token_type {
			self.token_type = Some(token_type.clone());
		}
		if let Some(id_token) = &token_response.id_token {
			self.id_token = Some(id_token.clone());
		}
		if let Some(refresh_token) = &token_response.refresh_token {
			self.refresh_token = Some(refresh_token.clone());
		}
		if let Some(scope) = &token_response.scope {
			self.scope = Some(scope.clone());
		}
		if let Some(session_state) = &token_response.session_state {
			self.session_state = Some(session_state.clone());
		}
		if let Some(expires_in) = token_response.expires_in {
			self.set_expires_in(expires_in);
		}
	}
}

/// Parsed end-session response.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SignoutResponse {
	/// Correlation id portion of the returned `state` parameter.
	pub state: Option<String>,
	/// OAuth error code, present on failure.
	pub error: Option<String>,
	/// Human-readable error detail.
	pub error_description: Option<String>,
	/// URI with further error information.
	pub error_uri: Option<String>,
	/// Opaque caller payload restored from the matched state record.
	pub user_state: Option<Value>,
}
impl SignoutResponse {
	/// Parses the raw response parameters from a post-logout callback URL.
	pub fn from_url(url: &Url, mode: ResponseMode) -> Self {
		let mut this = Self::default();

		for (name, value) in response_params(url, mode) {
			match &*name {
				"state" => this.state = Some(State::split_wire_state(&value).0.to_owned()),
				"error" => this.error = Some(value.into_owned()),
				"error_description" => this.error_description = Some(value.into_owned()),
				"error_uri" => this.error_uri = Some(value.into_owned()),
				_ => {},
			}
		}

		this
	}
}

fn response_params(url: &Url, mode: ResponseMode) -> Vec<(Cow<'_, str>, Cow<'_, str>)> {
	match mode {
		ResponseMode::Query => url.query_pairs().collect(),
		ResponseMode::Fragment => url
			.fragment()
			.map(|fragment| form_urlencoded::parse(fragment.as_bytes()).collect())
			.unwrap_or_default(),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn url(raw: &str) -> Url {
		raw.parse().expect("Test URL should parse.")
	}

	#[test]
	fn query_mode_reads_the_query_string() {
		let response = SigninResponse::from_url(
			&url("https://app/cb?code=c&state=abc;tab%3D2&session_state=ss"),
			ResponseMode::Query,
		);

		assert_eq!(response.code.as_deref(), Some("c"));
		assert_eq!(response.state.as_deref(), Some("abc"));
		assert_eq!(response.url_state.as_deref(), Some("tab=2"));
		assert_eq!(response.session_state.as_deref(), Some("ss"));
	}

	#[test]
	fn fragment_mode_reads_the_fragment() {
		let response = SigninResponse::from_url(
			&url("https://app/cb#code=c&state=abc"),
			ResponseMode::Fragment,
		);

		assert_eq!(response.code.as_deref(), Some("c"));
		assert_eq!(response.state.as_deref(), Some("abc"));

		let empty = SigninResponse::from_url(&url("https://app/cb?code=c"), ResponseMode::Fragment);

		assert_eq!(empty.code, None);
	}

	#[test]
	fn error_parameters_are_captured() {
		let response = SigninResponse::from_url(
			&url("https://app/cb?error=access_denied&error_description=nope&state=abc"),
			ResponseMode::Query,
		);

		assert_eq!(response.error.as_deref(), Some("access_denied"));
		assert_eq!(response.error_description.as_deref(), Some("nope"));
	}

	#[test]
	fn expires_in_derives_from_the_absolute_stamp() {
		let mut response = SigninResponse::default();

		response.set_expires_in(3_600);

		let remaining = response.expires_in().expect("Expiry should be recorded.");

		assert!((3_598..=3_600).contains(&remaining));
	}

	#[test]
	fn open_id_detection_checks_scope_words_and_id_token() {
		let mut response = SigninResponse { scope: Some("profile openid email".into()), ..<_>::default() };

		assert!(response.is_open_id());

		response.scope = Some("openiddict".into());

		assert!(!response.is_open_id());

		response.id_token = Some("header.payload.sig".into());

		assert!(response.is_open_id());
	}

	#[test]
	fn signout_response_parses_state_and_error() {
		let response = SignoutResponse::from_url(
			&url("https://app/signed-out?state=xyz&error=server_error"),
			ResponseMode::Query,
		);

		assert_eq!(response.state.as_deref(), Some("xyz"));
		assert_eq!(response.error.as_deref(), Some("server_error"));
	}
}
