//! Client configuration and its builder.

// crates.io
use serde_json::{Map, Value};
// self
use crate::{
	_prelude::*,
	claims::ClaimsFilter,
	error::ConfigError,
	response::ResponseMode,
	token::ClientAuthMethod,
};

const DEFAULT_RESPONSE_TYPE: &str = "code";
const DEFAULT_SCOPE: &str = "openid";
const DEFAULT_STALE_STATE_AGE: Duration = Duration::seconds(900);
const DEFAULT_STORE_PREFIX: &str = "oidc.";

/// Validated, immutable client configuration.
///
/// Build with [`OidcClientSettings::builder`]; every flow operation reads from the
/// same shared instance.
#[derive(Clone)]
pub struct OidcClientSettings {
	/// OP authority; discovery resolves relative to it.
	pub authority: Url,
	/// OAuth `client_id`.
	pub client_id: String,
	/// OAuth client secret for confidential clients.
	pub client_secret: Option<String>,
	/// OAuth `redirect_uri`.
	pub redirect_uri: String,
	/// Return URL after logout.
	pub post_logout_redirect_uri: Option<String>,
	/// OAuth `response_type`; only `code` is supported.
	pub response_type: String,
	/// Default `scope` for signin requests.
	pub scope: String,
	/// Where response parameters are expected to arrive.
	pub response_mode: ResponseMode,
	/// How client credentials are presented to the token endpoint.
	pub client_authentication: ClientAuthMethod,
	/// Disables PKCE for providers that cannot handle it.
	pub disable_pkce: bool,
	/// Protocol-claim filtering mode for ID-token and userinfo claims.
	pub filter_protocol_claims: ClaimsFilter,
	/// Recursively merges nested objects when combining claim sources.
	pub merge_claims_deep: bool,
	/// Fetches userinfo after OIDC code exchange.
	pub load_user_info: bool,
	/// Age past which stored correlation state is swept.
	pub stale_state_age: Duration,
	/// Prefix namespacing this client's keys inside the state store.
	pub state_store_prefix: String,
	/// Per-request timeout for OP calls.
	pub request_timeout: Option<Duration>,
	/// Extra authorization-request query parameters.
	pub extra_query_params: Map<String, Value>,
	/// Extra token-request parameters.
	pub extra_token_params: Map<String, Value>,
	/// Explicit discovery-document URL overriding the authority-derived one.
	pub metadata_url: Option<Url>,
	/// Fallback values merged beneath the fetched discovery document.
	pub metadata_seed: Option<Map<String, Value>>,
	/// Static discovery document; set to skip network discovery entirely.
	pub metadata: Option<Map<String, Value>>,
	/// Static signing keys; set to skip the JWKS fetch entirely.
	pub signing_keys: Option<Vec<Value>>,
}
impl OidcClientSettings {
	/// Starts a builder from the three settings every client needs.
	pub fn builder(
		authority: Url,
		client_id: impl Into<String>,
		redirect_uri: impl Into<String>,
	) -> OidcClientSettingsBuilder {
		OidcClientSettingsBuilder {
			settings: Self {
				authority,
				client_id: client_id.into(),
				client_secret: None,
				redirect_uri: redirect_uri.into(),
				post_logout_redirect_uri: None,
				response_type: DEFAULT_RESPONSE_TYPE.into(),
				scope: DEFAULT_SCOPE.into(),
				response_mode: ResponseMode::default(),
				client_authentication: ClientAuthMethod::default(),
				disable_pkce: false,
				filter_protocol_claims: ClaimsFilter::default(),
				merge_claims_deep: false,
				load_user_info: false,
				stale_state_age: DEFAULT_STALE_STATE_AGE,
				state_store_prefix: DEFAULT_STORE_PREFIX.into(),
				request_timeout: None,
				extra_query_params: Map::new(),
				extra_token_params: Map::new(),
				metadata_url: None,
				metadata_seed: None,
				metadata: None,
				signing_keys: None,
			},
		}
	}
}
impl Debug for OidcClientSettings {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OidcClientSettings")
			.field("authority", &self.authority.as_str())
			.field("client_id", &self.client_id)
			.field("client_secret_set", &self.client_secret.is_some())
			.field("redirect_uri", &self.redirect_uri)
			.field("post_logout_redirect_uri", &self.post_logout_redirect_uri)
			.field("response_type", &self.response_type)
			.field("scope", &self.scope)
			.field("response_mode", &self.response_mode)
			.field("client_authentication", &self.client_authentication)
			.field("disable_pkce", &self.disable_pkce)
			.field("filter_protocol_claims", &self.filter_protocol_claims)
			.field("merge_claims_deep", &self.merge_claims_deep)
			.field("load_user_info", &self.load_user_info)
			.field("stale_state_age", &self.stale_state_age)
			.field("state_store_prefix", &self.state_store_prefix)
			.field("request_timeout", &self.request_timeout)
			.field("metadata_url", &self.metadata_url)
			.finish()
	}
}

/// Builder for [`OidcClientSettings`].
#[derive(Clone, Debug)]
pub struct OidcClientSettingsBuilder {
	settings: OidcClientSettings,
}
impl OidcClientSettingsBuilder {
	/// Sets the client secret for confidential clients.
	pub fn client_secret(mut self, client_secret: impl Into<String>) -> Self {
		self.settings.client_secret = Some(client_secret.into());

		self
	}

	/// Sets the post-logout return URL.
	pub fn post_logout_redirect_uri(mut self, uri: impl Into<String>) -> Self {
		self.settings.post_logout_redirect_uri = Some(uri.into());

		self
	}

	/// Sets the default signin scope.
	pub fn scope(mut self, scope: impl Into<String>) -> Self {
		self.settings.scope = scope.into();

		self
	}

	/// Sets where response parameters are expected to arrive.
	pub fn response_mode(mut self, mode: ResponseMode) -> Self {
		self.settings.response_mode = mode;

		self
	}

	/// Sets how client credentials are presented to the token endpoint.
	pub fn client_authentication(mut self, method: ClientAuthMethod) -> Self {
		self.settings.client_authentication = method;

		self
	}

	/// Disables PKCE.
	pub fn disable_pkce(mut self) -> Self {
		self.settings.disable_pkce = true;

		self
	}

	/// Sets the protocol-claim filtering mode.
	pub fn filter_protocol_claims(mut self, filter: ClaimsFilter) -> Self {
		self.settings.filter_protocol_claims = filter;

		self
	}

	/// Enables deep merging of nested claim objects.
	pub fn merge_claims_deep(mut self) -> Self {
		self.settings.merge_claims_deep = true;

		self
	}

	/// Enables the userinfo fetch after OIDC code exchange.
	pub fn load_user_info(mut self) -> Self {
		self.settings.load_user_info = true;

		self
	}

	/// Sets the staleness cutoff for stored correlation state.
	pub fn stale_state_age(mut self, age: Duration) -> Self {
		self.settings.stale_state_age = age;

		self
	}

	/// Sets the state-store key prefix.
	pub fn state_store_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.settings.state_store_prefix = prefix.into();

		self
	}

	/// Sets the per-request timeout for OP calls.
	pub fn request_timeout(mut self, timeout: Duration) -> Self {
		self.settings.request_timeout = Some(timeout);

		self
	}

	/// Sets extra authorization-request query parameters.
	pub fn extra_query_params(mut self, params: Map<String, Value>) -> Self {
		self.settings.extra_query_params = params;

		self
	}

	/// Sets extra token-request parameters.
	pub fn extra_token_params(mut self, params: Map<String, Value>) -> Self {
		self.settings.extra_token_params = params;

		self
	}

	/// Overrides the discovery-document URL derived from the authority.
	pub fn metadata_url(mut self, url: Url) -> Self {
		self.settings.metadata_url = Some(url);

		self
	}

	/// Sets fallback values merged beneath the fetched discovery document.
	pub fn metadata_seed(mut self, seed: Map<String, Value>) -> Self {
		self.settings.metadata_seed = Some(seed);

		self
	}

	/// Sets a static discovery document, skipping network discovery.
	pub fn metadata(mut self, metadata: Map<String, Value>) -> Self {
		self.settings.metadata = Some(metadata);

		self
	}

	/// Sets static signing keys, skipping the JWKS fetch.
	pub fn signing_keys(mut self, keys: Vec<Value>) -> Self {
		self.settings.signing_keys = Some(keys);

		self
	}

	/// Validates and finalizes the settings.
	pub fn build(self) -> Result<OidcClientSettings> {
		if self.settings.client_id.is_empty() {
			return Err(ConfigError::MissingSetting { field: "client_id" }.into());
		}
		if self.settings.redirect_uri.is_empty() {
			return Err(ConfigError::MissingSetting { field: "redirect_uri" }.into());
		}

		Ok(self.settings)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::error::Error;

	fn authority() -> Url {
		"https://op.example".parse().expect("Authority should parse.")
	}

	#[test]
	fn defaults_cover_the_code_flow() {
		let settings = OidcClientSettings::builder(authority(), "c1", "https://app/cb")
			.build()
			.expect("Settings should build.");

		assert_eq!(settings.response_type, "code");
		assert_eq!(settings.scope, "openid");
		assert_eq!(settings.response_mode, ResponseMode::Query);
		assert_eq!(settings.stale_state_age, Duration::seconds(900));
		assert_eq!(settings.state_store_prefix, "oidc.");
		assert!(!settings.disable_pkce);
		assert!(!settings.load_user_info);
	}

	#[test]
	fn empty_identifiers_are_rejected() {
		let error = OidcClientSettings::builder(authority(), "", "https://app/cb")
			.build()
			.expect_err("Empty client_id should be rejected.");

		assert!(matches!(error, Error::Config(ConfigError::MissingSetting { field: "client_id" })));

		let error = OidcClientSettings::builder(authority(), "c1", "")
			.build()
			.expect_err("Empty redirect_uri should be rejected.");

		assert!(matches!(
			error,
			Error::Config(ConfigError::MissingSetting { field: "redirect_uri" })
		));
	}

	#[test]
	fn debug_redacts_the_client_secret() {
		let settings = OidcClientSettings::builder(authority(), "c1", "https://app/cb")
			.client_secret("hunter2")
			.build()
			.expect("Settings should build.");
		let rendered = format!("{settings:?}");

		assert!(!rendered.contains("hunter2"));
		assert!(rendered.contains("client_secret_set: true"));
	}
}
