//! Authorization-request builder (RFC 6749 §4.1 with PKCE).

// crates.io
use serde_json::{Map, Value};
// self
use crate::{
	_prelude::*,
	error::ConfigError,
	http::push_form_value,
	response::ResponseMode,
	state::{RequestType, SigninState, SigninStateArgs, StateArgs},
};

/// Arguments for building a [`SigninRequest`].
#[derive(Clone, Debug)]
pub struct SigninRequestArgs {
	/// Authorization endpoint to address.
	pub url: Url,
	/// Authority recorded into the correlation state.
	pub authority: String,
	/// OAuth `client_id`.
	pub client_id: String,
	/// OAuth `redirect_uri`.
	pub redirect_uri: String,
	/// OAuth `response_type`; only `code` is supported.
	pub response_type: String,
	/// OAuth `scope`.
	pub scope: String,
	/// UI flow initiating the request.
	pub request_type: RequestType,
	/// Opaque caller payload round-tripped through storage.
	pub state_data: Option<Value>,
	/// Caller suffix appended to the wire `state` value.
	pub url_state: Option<String>,
	/// OIDC `prompt`.
	pub prompt: Option<String>,
	/// OIDC `display`.
	pub display: Option<String>,
	/// OIDC `max_age` in seconds.
	pub max_age: Option<u64>,
	/// OIDC `ui_locales`.
	pub ui_locales: Option<String>,
	/// OIDC `acr_values`.
	pub acr_values: Option<String>,
	/// OIDC `login_hint`.
	pub login_hint: Option<String>,
	/// OIDC `nonce`.
	pub nonce: Option<String>,
	/// RFC 8707 `resource` indicators, repeated once per value.
	pub resource: Vec<String>,
	/// OIDC request object (`request`).
	pub request: Option<String>,
	/// OIDC request object reference (`request_uri`).
	pub request_uri: Option<String>,
	/// Requested `response_mode`.
	pub response_mode: Option<ResponseMode>,
	/// Additional authorization-request query parameters.
	pub extra_query_params: Map<String, Value>,
	/// Extra parameters replayed later on the token request.
	pub extra_token_params: Option<Map<String, Value>>,
	/// Client secret snapshot for the later code exchange.
	pub client_secret: Option<String>,
	/// Suppresses the userinfo fetch during response validation.
	pub skip_user_info: bool,
	/// Disables PKCE for providers that cannot handle it.
	pub disable_pkce: bool,
	/// Caller-supplied PKCE verifier.
	pub code_verifier: Option<String>,
	/// Caller-supplied correlation id; generated when omitted.
	pub state_id: Option<String>,
}

/// A ready-to-navigate authorization request plus its correlation state.
#[derive(Clone, Debug)]
pub struct SigninRequest {
	/// Fully parameterized authorization URL.
	pub url: Url,
	/// Correlation state to persist before navigating.
	pub state: SigninState,
}
impl SigninRequest {
	/// Validates the arguments, creates the correlation state, and assembles the URL.
	pub fn new(args: SigninRequestArgs) -> Result<Self> {
		for (field, value) in [
			("authority", &args.authority),
			("client_id", &args.client_id),
			("redirect_uri", &args.redirect_uri),
			("response_type", &args.response_type),
			("scope", &args.scope),
		] {
			if value.is_empty() {
				return Err(ConfigError::MissingSetting { field }.into());
			}
		}
		if args.response_type != "code" {
			return Err(ConfigError::UnsupportedResponseType {
				response_type: args.response_type,
			}
			.into());
		}

		let state = SigninState::new(SigninStateArgs {
			state: StateArgs {
				id: args.state_id,
				request_type: args.request_type,
				data: args.state_data,
				url_state: args.url_state,
			},
			authority: args.authority,
			client_id: args.client_id,
			redirect_uri: args.redirect_uri,
			scope: args.scope,
			client_secret: args.client_secret,
			extra_token_params: args.extra_token_params,
			response_mode: args.response_mode,
			skip_user_info: args.skip_user_info,
			disable_pkce: args.disable_pkce,
			code_verifier: args.code_verifier,
		});
		let mut url = args.url;

		{
			let mut pairs = url.query_pairs_mut();

			pairs
				.append_pair("client_id", &state.client_id)
				.append_pair("redirect_uri", &state.redirect_uri)
				.append_pair("response_type", &args.response_type)
				.append_pair("scope", &state.scope)
				.append_pair("state", &state.state.wire_state());

			if let Some(challenge) = &state.code_challenge {
				pairs
					.append_pair("code_challenge", challenge)
					.append_pair("code_challenge_method", "S256");
			}
			if let Some(response_mode) = args.response_mode {
				pairs.append_pair("response_mode", match response_mode {
					ResponseMode::Query => "query",
					ResponseMode::Fragment => "fragment",
				});
			}
			if let Some(prompt) = &args.prompt {
				pairs.append_pair("prompt", prompt);
			}
			if let Some(display) = &args.display {
				pairs.append_pair("display", display);
			}
			if let Some(max_age) = args.max_age {
				pairs.append_pair("max_age", &max_age.to_string());
			}
			if let Some(ui_locales) = &args.ui_locales {
				pairs.append_pair("ui_locales", ui_locales);
			}
			if let Some(acr_values) = &args.acr_values {
				pairs.append_pair("acr_values", acr_values);
			}
			if let Some(login_hint) = &args.login_hint {
				pairs.append_pair("login_hint", login_hint);
			}
			if let Some(nonce) = &args.nonce {
				pairs.append_pair("nonce", nonce);
			}
			if let Some(request) = &args.request {
				pairs.append_pair("request", request);
			}
			if let Some(request_uri) = &args.request_uri {
				pairs.append_pair("request_uri", request_uri);
			}

			for resource in &args.resource {
				pairs.append_pair("resource", resource);
			}

			let mut extra = Vec::new();

			for (name, value) in &args.extra_query_params {
				push_form_value(&mut extra, name, value);
			}

			pairs.extend_pairs(extra);
		}

		Ok(Self { url, state })
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::collections::HashMap;
	// crates.io
	use serde_json::json;
	// self
	use super::*;
	use crate::error::Error;

	fn args() -> SigninRequestArgs {
		SigninRequestArgs {
			url: "https://op.example/authorize".parse().expect("Endpoint URL should parse."),
			authority: "https://op.example".into(),
			client_id: "c1".into(),
			redirect_uri: "https://app/cb".into(),
			response_type: "code".into(),
			scope: "openid profile".into(),
			request_type: RequestType::SigninRedirect,
			state_data: None,
			url_state: None,
			prompt: None,
			display: None,
			max_age: None,
			ui_locales: None,
			acr_values: None,
			login_hint: None,
			nonce: None,
			resource: Vec::new(),
			request: None,
			request_uri: None,
			response_mode: None,
			extra_query_params: Map::new(),
			extra_token_params: None,
			client_secret: None,
			skip_user_info: false,
			disable_pkce: false,
			code_verifier: None,
			state_id: None,
		}
	}

	fn query_map(url: &Url) -> HashMap<String, Vec<String>> {
		let mut map = HashMap::<String, Vec<String>>::new();

		for (name, value) in url.query_pairs() {
			map.entry(name.into_owned()).or_default().push(value.into_owned());
		}

		map
	}

	#[test]
	fn builds_the_mandatory_authorization_parameters() {
		let request = SigninRequest::new(args()).expect("Request should build.");
		let query = query_map(&request.url);

		assert_eq!(query["client_id"], ["c1"]);
		assert_eq!(query["redirect_uri"], ["https://app/cb"]);
		assert_eq!(query["response_type"], ["code"]);
		assert_eq!(query["scope"], ["openid profile"]);
		assert_eq!(query["state"], [request.state.state.id.clone()]);
		assert_eq!(query["code_challenge_method"], ["S256"]);
		assert_eq!(
			query["code_challenge"],
			[request.state.code_challenge.clone().expect("Challenge should be generated.")]
		);
	}

	#[test]
	fn rejects_non_code_response_types() {
		let error = SigninRequest::new(SigninRequestArgs {
			response_type: "id_token token".into(),
			..args()
		})
		.expect_err("Implicit-flow response types should be rejected.");

		assert!(matches!(
			error,
			Error::Config(ConfigError::UnsupportedResponseType { .. })
		));
	}

	#[test]
	fn rejects_empty_required_fields() {
		let error = SigninRequest::new(SigninRequestArgs { scope: String::new(), ..args() })
			.expect_err("Empty scope should be rejected.");

		assert!(matches!(
			error,
			Error::Config(ConfigError::MissingSetting { field: "scope" })
		));
	}

	#[test]
	fn wire_state_carries_the_url_state_suffix() {
		let request = SigninRequest::new(SigninRequestArgs {
			state_id: Some("abc".into()),
			url_state: Some("tab=2".into()),
			..args()
		})
		.expect("Request should build.");

		assert_eq!(query_map(&request.url)["state"], ["abc;tab=2"]);
	}

	#[test]
	fn optional_and_repeated_parameters_are_appended() {
		let request = SigninRequest::new(SigninRequestArgs {
			prompt: Some("login".into()),
			max_age: Some(300),
			resource: vec!["https://api.a".into(), "https://api.b".into()],
			extra_query_params: json!({"audience": "https://api", "tags": ["a", "b"]})
				.as_object()
				.cloned()
				.unwrap_or_default(),
			..args()
		})
		.expect("Request should build.");
		let query = query_map(&request.url);

		assert_eq!(query["prompt"], ["login"]);
		assert_eq!(query["max_age"], ["300"]);
		assert_eq!(query["resource"], ["https://api.a", "https://api.b"]);
		assert_eq!(query["audience"], ["https://api"]);
		assert_eq!(query["tags"], ["a", "b"]);
	}

	#[test]
	fn disabling_pkce_omits_the_challenge_parameters() {
		let request = SigninRequest::new(SigninRequestArgs { disable_pkce: true, ..args() })
			.expect("Request should build.");
		let query = query_map(&request.url);

		assert!(!query.contains_key("code_challenge"));
		assert!(!query.contains_key("code_challenge_method"));
	}
}
