//! Token-endpoint client: code exchange, password grant, refresh, and revocation.

// crates.io
use serde_json::{Map, Value};
// self
use crate::{
	_prelude::*,
	error::ConfigError,
	http::{HttpFetcher, RequestOptions, map_fetch_error, push_form_value},
	metadata::MetadataService,
	settings::OidcClientSettings,
};

/// How client credentials are presented to the token endpoint (RFC 6749 §2.3.1).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	/// Credentials in an HTTP Basic `Authorization` header.
	ClientSecretBasic,
	/// Credentials as form body parameters.
	#[default]
	ClientSecretPost,
}

/// Raw token-endpoint response body (RFC 6749 §5.1).
#[derive(Clone, Default, PartialEq, Deserialize)]
pub struct TokenEndpointResponse {
	/// Issued access token.
	pub access_token: Option<String>,
	/// Token type, typically `Bearer`.
	pub token_type: Option<String>,
	/// Issued ID token.
	pub id_token: Option<String>,
	/// Issued refresh token.
	pub refresh_token: Option<String>,
	/// Granted scope, when it differs from the requested one.
	pub scope: Option<String>,
	/// Access-token lifetime in seconds.
	pub expires_in: Option<i64>,
	/// OP session-state value for session monitoring.
	pub session_state: Option<String>,
	/// Any additional response members.
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}
impl Debug for TokenEndpointResponse {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenEndpointResponse")
			.field("access_token_set", &self.access_token.is_some())
			.field("token_type", &self.token_type)
			.field("id_token_set", &self.id_token.is_some())
			.field("refresh_token_set", &self.refresh_token.is_some())
			.field("scope", &self.scope)
			.field("expires_in", &self.expires_in)
			.field("session_state", &self.session_state)
			.finish()
	}
}

/// Arguments for an authorization-code exchange.
#[derive(Clone, Debug)]
pub struct ExchangeCodeArgs {
	/// Authorization code returned on the callback.
	pub code: String,
	/// Redirect URI the code was issued against.
	pub redirect_uri: String,
	/// PKCE verifier matching the request's challenge.
	pub code_verifier: Option<String>,
	/// Client id recorded at request time.
	pub client_id: String,
	/// Client secret recorded at request time.
	pub client_secret: Option<String>,
	/// Extra token-request parameters.
	pub extra_params: Option<Map<String, Value>>,
	/// Per-call timeout override.
	pub timeout: Option<Duration>,
}

/// Arguments for a resource-owner password grant.
#[derive(Clone, Debug)]
pub struct ExchangeCredentialsArgs {
	/// Resource-owner username.
	pub username: String,
	/// Resource-owner password.
	pub password: String,
	/// Scope to request.
	pub scope: Option<String>,
	/// Extra token-request parameters.
	pub extra_params: Option<Map<String, Value>>,
	/// Per-call timeout override.
	pub timeout: Option<Duration>,
}

/// Arguments for a refresh-token grant.
#[derive(Clone, Debug)]
pub struct ExchangeRefreshTokenArgs {
	/// Refresh token to present.
	pub refresh_token: String,
	/// Scope to request.
	pub scope: Option<String>,
	/// RFC 8707 `resource` indicators, repeated once per value.
	pub resource: Vec<String>,
	/// Extra token-request parameters.
	pub extra_params: Option<Map<String, Value>>,
	/// Per-call timeout override.
	pub timeout: Option<Duration>,
}

/// Arguments for a token revocation (RFC 7009).
#[derive(Clone, Debug)]
pub struct RevokeArgs {
	/// Token to revoke.
	pub token: String,
	/// RFC 7009 `token_type_hint`.
	pub token_type_hint: Option<&'static str>,
	/// Per-call timeout override.
	pub timeout: Option<Duration>,
}

/// Client for the OP token and revocation endpoints.
pub struct TokenClient<F>
where
	F: ?Sized + HttpFetcher,
{
	settings: Arc<OidcClientSettings>,
	metadata: Arc<MetadataService<F>>,
	fetcher: Arc<F>,
}
impl<F> TokenClient<F>
where
	F: ?Sized + HttpFetcher,
{
	/// Creates a token client over shared settings, metadata, and transport.
	pub fn new(
		settings: Arc<OidcClientSettings>,
		metadata: Arc<MetadataService<F>>,
		fetcher: Arc<F>,
	) -> Self {
		Self { settings, metadata, fetcher }
	}

	/// Exchanges an authorization code for tokens (`grant_type=authorization_code`).
	pub async fn exchange_code(&self, args: ExchangeCodeArgs) -> Result<TokenEndpointResponse> {
		if args.code.is_empty() {
			return Err(ConfigError::MissingSetting { field: "code" }.into());
		}
		if args.redirect_uri.is_empty() {
			return Err(ConfigError::MissingSetting { field: "redirect_uri" }.into());
		}
		if args.client_id.is_empty() {
			return Err(ConfigError::MissingSetting { field: "client_id" }.into());
		}

		let mut form = vec![
			("grant_type".to_owned(), "authorization_code".to_owned()),
			("code".to_owned(), args.code),
			("redirect_uri".to_owned(), args.redirect_uri),
		];

		if let Some(code_verifier) = args.code_verifier {
			form.push(("code_verifier".to_owned(), code_verifier));
		}

		push_extra_params(&mut form, args.extra_params.as_ref());

		self.request_token(form, &args.client_id, args.client_secret.as_deref(), args.timeout)
			.await
	}

	/// Exchanges resource-owner credentials for tokens (`grant_type=password`).
	pub async fn exchange_credentials(
		&self,
		args: ExchangeCredentialsArgs,
	) -> Result<TokenEndpointResponse> {
		if args.username.is_empty() {
			return Err(ConfigError::MissingSetting { field: "username" }.into());
		}

		let mut form = vec![
			("grant_type".to_owned(), "password".to_owned()),
			("username".to_owned(), args.username),
			("password".to_owned(), args.password),
		];

		if let Some(scope) = args.scope {
			form.push(("scope".to_owned(), scope));
		}

		push_extra_params(&mut form, args.extra_params.as_ref());

		let client_id = self.settings.client_id.clone();

		self.request_token(form, &client_id, self.settings.client_secret.as_deref(), args.timeout)
			.await
	}

	/// Exchanges a refresh token for fresh tokens (`grant_type=refresh_token`).
	pub async fn exchange_refresh_token(
		&self,
		args: ExchangeRefreshTokenArgs,
	) -> Result<TokenEndpointResponse> {
		if args.refresh_token.is_empty() {
			return Err(ConfigError::MissingSetting { field: "refresh_token" }.into());
		}

		let mut form = vec![
			("grant_type".to_owned(), "refresh_token".to_owned()),
			("refresh_token".to_owned(), args.refresh_token),
		];

		if let Some(scope) = args.scope {
			form.push(("scope".to_owned(), scope));
		}

		for resource in &args.resource {
			form.push(("resource".to_owned(), resource.clone()));
		}

		push_extra_params(&mut form, args.extra_params.as_ref());

		let client_id = self.settings.client_id.clone();

		self.request_token(form, &client_id, self.settings.client_secret.as_deref(), args.timeout)
			.await
	}

	/// Revokes a token at the revocation endpoint (RFC 7009).
	///
	/// Any non-2xx response is fatal; the endpoint's success body, if any, is
	/// discarded.
	pub async fn revoke(&self, args: RevokeArgs) -> Result<()> {
		if args.token.is_empty() {
			return Err(ConfigError::MissingSetting { field: "token" }.into());
		}

		let url = self
			.metadata
			.revocation_endpoint()
			.await?
			.ok_or(ConfigError::MissingEndpoint { name: "revocation_endpoint" })?;
		let mut form = vec![("token".to_owned(), args.token)];

		if let Some(hint) = args.token_type_hint {
			form.push(("token_type_hint".to_owned(), hint.to_owned()));
		}

		form.push(("client_id".to_owned(), self.settings.client_id.clone()));

		if let Some(client_secret) = &self.settings.client_secret {
			form.push(("client_secret".to_owned(), client_secret.clone()));
		}

		let options = RequestOptions {
			timeout: args.timeout.or(self.settings.request_timeout),
			..<_>::default()
		};

		self.fetcher
			.post_form(&url, &form, &options)
			.await
			.map_err(|e| map_fetch_error("revocation", e))?;

		Ok(())
	}

	async fn request_token(
		&self,
		mut form: Vec<(String, String)>,
		client_id: &str,
		client_secret: Option<&str>,
		timeout: Option<Duration>,
	) -> Result<TokenEndpointResponse> {
		let url = self
			.metadata
			.token_endpoint()
			.await?
			.ok_or(ConfigError::MissingEndpoint { name: "token_endpoint" })?;
		let mut options =
			RequestOptions { timeout: timeout.or(self.settings.request_timeout), ..<_>::default() };

		match self.settings.client_authentication {
			ClientAuthMethod::ClientSecretBasic => {
				let client_secret = client_secret.ok_or(ConfigError::MissingClientSecret)?;

				options.basic = Some((client_id.to_owned(), client_secret.to_owned()));
			},
			ClientAuthMethod::ClientSecretPost => {
				form.push(("client_id".to_owned(), client_id.to_owned()));

				if let Some(client_secret) = client_secret {
					form.push(("client_secret".to_owned(), client_secret.to_owned()));
				}
			},
		}

		let body = self
			.fetcher
			.post_form(&url, &form, &options)
			.await
			.map_err(|e| map_fetch_error("token", e))?;

		serde_path_to_error::deserialize(body).map_err(|source| {
			crate::error::TransportError::ResponseParse { endpoint: "token", source }.into()
		})
	}
}
impl<F> Clone for TokenClient<F>
where
	F: ?Sized + HttpFetcher,
{
	fn clone(&self) -> Self {
		Self {
			settings: self.settings.clone(),
			metadata: self.metadata.clone(),
			fetcher: self.fetcher.clone(),
		}
	}
}
impl<F> Debug for TokenClient<F>
where
	F: ?Sized + HttpFetcher,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenClient").field("settings", &self.settings).finish()
	}
}

fn push_extra_params(form: &mut Vec<(String, String)>, extra: Option<&Map<String, Value>>) {
	if let Some(extra) = extra {
		for (name, value) in extra {
			push_form_value(form, name, value);
		}
	}
}
