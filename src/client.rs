//! High-level client orchestrating storage, discovery, token exchange, and validation.

// crates.io
use serde_json::{Map, Value};
// self
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpFetcher;
use crate::{
	_prelude::*,
	error::{ConfigError, ProtocolErrorResponse, ValidationError},
	http::HttpFetcher,
	metadata::MetadataService,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	request::{SigninRequest, SigninRequestArgs, SignoutRequest, SignoutRequestArgs},
	response::{ResponseMode, SigninResponse, SignoutResponse},
	settings::OidcClientSettings,
	state::{self, RefreshState, RequestType, SigninState, State},
	store::StateStore,
	token::{
		ExchangeCredentialsArgs, ExchangeRefreshTokenArgs, RevokeArgs, TokenClient,
	},
	validator::ResponseValidator,
};

/// Arguments for [`OidcClient::create_signin_request`].
///
/// Everything defaults to the settings-level value; per-call fields override.
#[derive(Clone, Debug)]
pub struct CreateSigninRequestArgs {
	/// UI flow initiating the request.
	pub request_type: RequestType,
	/// Per-call redirect URI override.
	pub redirect_uri: Option<String>,
	/// Per-call scope override.
	pub scope: Option<String>,
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
	/// RFC 8707 `resource` indicators.
	pub resource: Vec<String>,
	/// OIDC request object (`request`).
	pub request: Option<String>,
	/// OIDC request object reference (`request_uri`).
	pub request_uri: Option<String>,
	/// Per-call response-mode override.
	pub response_mode: Option<ResponseMode>,
	/// Per-call extra query parameters, layered over the settings-level ones.
	pub extra_query_params: Map<String, Value>,
	/// Per-call extra token parameters, layered over the settings-level ones.
	pub extra_token_params: Map<String, Value>,
	/// Suppresses the userinfo fetch during response validation.
	pub skip_user_info: bool,
	/// Caller-supplied correlation id; generated when omitted.
	pub state_id: Option<String>,
}
impl Default for CreateSigninRequestArgs {
	fn default() -> Self {
		Self {
			request_type: RequestType::SigninRedirect,
			redirect_uri: None,
			scope: None,
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
			extra_token_params: Map::new(),
			skip_user_info: false,
			state_id: None,
		}
	}
}

/// Arguments for [`OidcClient::create_signout_request`].
#[derive(Clone, Debug)]
pub struct CreateSignoutRequestArgs {
	/// UI flow initiating the request.
	pub request_type: RequestType,
	/// ID token presented as `id_token_hint`.
	pub id_token_hint: Option<String>,
	/// Per-call post-logout return URL override.
	pub post_logout_redirect_uri: Option<String>,
	/// Opaque caller payload round-tripped through storage.
	pub state_data: Option<Value>,
	/// Caller suffix appended to the wire `state` value.
	pub url_state: Option<String>,
	/// Caller-supplied correlation id; generated when omitted.
	pub state_id: Option<String>,
	/// Additional end-session query parameters.
	pub extra_query_params: Map<String, Value>,
}
impl Default for CreateSignoutRequestArgs {
	fn default() -> Self {
		Self {
			request_type: RequestType::SignoutRedirect,
			id_token_hint: None,
			post_logout_redirect_uri: None,
			state_data: None,
			url_state: None,
			state_id: None,
			extra_query_params: Map::new(),
		}
	}
}

/// Arguments for [`OidcClient::process_resource_owner_credentials`].
#[derive(Clone, Debug)]
pub struct ResourceOwnerCredentialsArgs {
	/// Resource-owner username.
	pub username: String,
	/// Resource-owner password.
	pub password: String,
	/// Scope to request; the settings-level scope when omitted.
	pub scope: Option<String>,
	/// Suppresses the userinfo fetch during claims processing.
	pub skip_user_info: bool,
}

/// Arguments for [`OidcClient::use_refresh_token`].
#[derive(Clone, Debug)]
pub struct UseRefreshTokenArgs {
	/// Prior-session snapshot holding the refresh token.
	pub state: RefreshState,
	/// Per-call scope override; the snapshot's scope when omitted.
	pub scope: Option<String>,
	/// RFC 8707 `resource` indicators.
	pub resource: Vec<String>,
	/// Per-call timeout override.
	pub timeout: Option<Duration>,
}

/// Protocol engine for the OAuth2 Authorization Code + PKCE flow with OIDC
/// extensions.
///
/// Owns no UI: callers navigate to the URLs it produces and hand back the callback
/// URLs they observe. All token-endpoint and discovery traffic flows through the
/// injected [`HttpFetcher`]; pending correlation state lives in the injected
/// [`StateStore`].
pub struct OidcClient<F>
where
	F: ?Sized + HttpFetcher,
{
	settings: Arc<OidcClientSettings>,
	store: Arc<dyn StateStore>,
	metadata_service: Arc<MetadataService<F>>,
	token_client: TokenClient<F>,
	validator: ResponseValidator<F>,
}
impl<F> OidcClient<F>
where
	F: ?Sized + HttpFetcher,
{
	/// Creates a client over an explicit HTTP transport.
	pub fn with_http_fetcher(
		settings: OidcClientSettings,
		store: Arc<dyn StateStore>,
		fetcher: Arc<F>,
	) -> Self {
		let settings = Arc::new(settings);
		let metadata_service = Arc::new(MetadataService::new(settings.clone(), fetcher.clone()));
		let token_client =
			TokenClient::new(settings.clone(), metadata_service.clone(), fetcher.clone());
		let validator = ResponseValidator::new(
			settings.clone(),
			metadata_service.clone(),
			token_client.clone(),
			fetcher,
		);

		Self { settings, store, metadata_service, token_client, validator }
	}

	/// Shared client settings.
	pub fn settings(&self) -> &OidcClientSettings {
		&self.settings
	}

	/// Discovery and signing-key resolution service.
	pub fn metadata_service(&self) -> &MetadataService<F> {
		&self.metadata_service
	}

	/// Builds a signin request, persisting its correlation state.
	///
	/// Unsupported response types fail before any storage or network activity. A
	/// staleness sweep runs before each new request so abandoned state does not
	/// accumulate.
	pub async fn create_signin_request(
		&self,
		args: CreateSigninRequestArgs,
	) -> Result<SigninRequest> {
		const KIND: FlowKind = FlowKind::Signin;

		let span = FlowSpan::new(KIND, "create_signin_request");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				if self.settings.response_type != "code" {
					return Err(ConfigError::UnsupportedResponseType {
						response_type: self.settings.response_type.clone(),
					}
					.into());
				}

				self.clear_stale_state().await?;

				let url = self.metadata_service.authorization_endpoint().await?;
				let mut extra_query_params = self.settings.extra_query_params.clone();

				extra_query_params.extend(args.extra_query_params);

				let mut extra_token_params = self.settings.extra_token_params.clone();

				extra_token_params.extend(args.extra_token_params);

				let request = SigninRequest::new(SigninRequestArgs {
					url,
					authority: self.settings.authority.to_string(),
					client_id: self.settings.client_id.clone(),
					redirect_uri: args
						.redirect_uri
						.unwrap_or_else(|| self.settings.redirect_uri.clone()),
					response_type: self.settings.response_type.clone(),
					scope: args.scope.unwrap_or_else(|| self.settings.scope.clone()),
					request_type: args.request_type,
					state_data: args.state_data,
					url_state: args.url_state,
					prompt: args.prompt,
					display: args.display,
					max_age: args.max_age,
					ui_locales: args.ui_locales,
					acr_values: args.acr_values,
					login_hint: args.login_hint,
					nonce: args.nonce,
					resource: args.resource,
					request: args.request,
					request_uri: args.request_uri,
					response_mode: args.response_mode,
					extra_query_params,
					extra_token_params: (!extra_token_params.is_empty())
						.then_some(extra_token_params),
					client_secret: self.settings.client_secret.clone(),
					skip_user_info: args.skip_user_info,
					disable_pkce: self.settings.disable_pkce,
					code_verifier: None,
					state_id: args.state_id,
				})?;

				self.store
					.set(&self.storage_key(&request.state.state.id), request.state.to_storage_string()?)
					.await?;

				Ok(request)
			})
			.await;

		obs::record_flow_outcome(KIND, outcome_of(&result));

		result
	}

	/// Parses a callback URL and looks up its correlation state without consuming it.
	pub async fn read_signin_response(&self, url: &Url) -> Result<(SigninResponse, SigninState)> {
		let response = SigninResponse::from_url(url, self.settings.response_mode);
		let id = response.state.as_deref().ok_or(ValidationError::MissingResponseState)?;
		let raw = self
			.store
			.get(&self.storage_key(id))
			.await?
			.ok_or(ValidationError::NoMatchingState)?;
		let state = SigninState::from_storage_string(&raw)?;

		Ok((response, state))
	}

	/// Processes a signin callback URL: consumes the correlation state, exchanges the
	/// code, and validates the result.
	pub async fn process_signin_response(&self, url: &Url) -> Result<SigninResponse> {
		const KIND: FlowKind = FlowKind::Signin;

		let span = FlowSpan::new(KIND, "process_signin_response");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let mut response = SigninResponse::from_url(url, self.settings.response_mode);
				let id =
					response.state.as_deref().ok_or(ValidationError::MissingResponseState)?;
				let raw = self
					.store
					.remove(&self.storage_key(id))
					.await?
					.ok_or(ValidationError::NoMatchingState)?;
				let state = SigninState::from_storage_string(&raw)?;

				self.validator.validate_signin_response(&mut response, &state).await?;

				Ok(response)
			})
			.await;

		obs::record_flow_outcome(KIND, outcome_of(&result));

		result
	}

	/// Signs in directly with resource-owner credentials (`grant_type=password`).
	///
	/// No correlation state is involved; the token response is validated through
	/// claims processing only.
	pub async fn process_resource_owner_credentials(
		&self,
		args: ResourceOwnerCredentialsArgs,
	) -> Result<SigninResponse> {
		const KIND: FlowKind = FlowKind::Credentials;

		let span = FlowSpan::new(KIND, "process_resource_owner_credentials");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let token_response = self
					.token_client
					.exchange_credentials(ExchangeCredentialsArgs {
						username: args.username,
						password: args.password,
						scope: args.scope.or_else(|| Some(self.settings.scope.clone())),
						extra_params: (!self.settings.extra_token_params.is_empty())
							.then(|| self.settings.extra_token_params.clone()),
						timeout: None,
					})
					.await?;
				let mut response = SigninResponse::default();

				response.apply_token_response(&token_response);

				self.validator
					.validate_credentials_response(&mut response, args.skip_user_info)
					.await?;

				Ok(response)
			})
			.await;

		obs::record_flow_outcome(KIND, outcome_of(&result));

		result
	}

	/// Builds an end-session request, persisting correlation state only when the
	/// caller supplied something to correlate.
	pub async fn create_signout_request(
		&self,
		args: CreateSignoutRequestArgs,
	) -> Result<SignoutRequest> {
		const KIND: FlowKind = FlowKind::Signout;

		let span = FlowSpan::new(KIND, "create_signout_request");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				self.clear_stale_state().await?;

				let url = self
					.metadata_service
					.end_session_endpoint()
					.await?
					.ok_or(ConfigError::MissingEndpoint { name: "end_session_endpoint" })?;
				let request = SignoutRequest::new(SignoutRequestArgs {
					url,
					request_type: args.request_type,
					id_token_hint: args.id_token_hint,
					post_logout_redirect_uri: args
						.post_logout_redirect_uri
						.or_else(|| self.settings.post_logout_redirect_uri.clone()),
					client_id: Some(self.settings.client_id.clone()),
					state_data: args.state_data,
					url_state: args.url_state,
					state_id: args.state_id,
					extra_query_params: args.extra_query_params,
				})?;

				if let Some(state) = &request.state {
					self.store
						.set(&self.storage_key(&state.id), state.to_storage_string()?)
						.await?;
				}

				Ok(request)
			})
			.await;

		obs::record_flow_outcome(KIND, outcome_of(&result));

		result
	}

	/// Processes a post-logout callback URL, consuming correlation state when the
	/// request created any.
	pub async fn process_signout_response(&self, url: &Url) -> Result<SignoutResponse> {
		const KIND: FlowKind = FlowKind::Signout;

		let span = FlowSpan::new(KIND, "process_signout_response");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				// End-session responses always arrive in the query string.
				let mut response = SignoutResponse::from_url(url, ResponseMode::Query);

				match response.state.clone() {
					Some(id) => {
						let raw = self
							.store
							.remove(&self.storage_key(&id))
							.await?
							.ok_or(ValidationError::NoMatchingState)?;
						let state = State::from_storage_string(&raw)?;

						self.validator.validate_signout_response(&mut response, &state)?;
					},
					None =>
						if let Some(error) = &response.error {
							return Err(ProtocolErrorResponse {
								error: error.clone(),
								error_description: response.error_description.clone(),
								error_uri: response.error_uri.clone(),
								session_state: None,
								state: None,
							}
							.into());
						},
				}

				Ok(response)
			})
			.await;

		obs::record_flow_outcome(KIND, outcome_of(&result));

		result
	}

	/// Renews a session with a refresh token, enforcing identity continuity.
	pub async fn use_refresh_token(&self, args: UseRefreshTokenArgs) -> Result<SigninResponse> {
		const KIND: FlowKind = FlowKind::Refresh;

		let span = FlowSpan::new(KIND, "use_refresh_token");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let token_response = self
					.token_client
					.exchange_refresh_token(ExchangeRefreshTokenArgs {
						refresh_token: args.state.refresh_token.clone(),
						scope: args.scope.or_else(|| args.state.scope.clone()),
						resource: args.resource,
						extra_params: (!self.settings.extra_token_params.is_empty())
							.then(|| self.settings.extra_token_params.clone()),
						timeout: args.timeout,
					})
					.await?;
				let mut response = SigninResponse::default();

				response.apply_token_response(&token_response);

				self.validator.validate_refresh_response(&mut response, &args.state).await?;

				Ok(response)
			})
			.await;

		obs::record_flow_outcome(KIND, outcome_of(&result));

		result
	}

	/// Revokes a token at the OP revocation endpoint (RFC 7009).
	pub async fn revoke_token(
		&self,
		token: impl Into<String>,
		token_type_hint: Option<&'static str>,
	) -> Result<()> {
		const KIND: FlowKind = FlowKind::Revoke;

		let span = FlowSpan::new(KIND, "revoke_token");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let token = token.into();
		let result = span
			.instrument(async move {
				self.token_client.revoke(RevokeArgs { token, token_type_hint, timeout: None }).await
			})
			.await;

		obs::record_flow_outcome(KIND, outcome_of(&result));

		result
	}

	/// Sweeps expired correlation state from the store.
	pub async fn clear_stale_state(&self) -> Result<()> {
		state::clear_stale_state(
			self.store.as_ref(),
			&self.settings.state_store_prefix,
			self.settings.stale_state_age,
		)
		.await
	}

	fn storage_key(&self, id: &str) -> String {
		format!("{}{id}", self.settings.state_store_prefix)
	}
}
#[cfg(feature = "reqwest")]
impl OidcClient<ReqwestHttpFetcher> {
	/// Creates a client over the default reqwest transport.
	pub fn new(settings: OidcClientSettings, store: Arc<dyn StateStore>) -> Self {
		Self::with_http_fetcher(settings, store, Arc::new(ReqwestHttpFetcher::default()))
	}
}
impl<F> Debug for OidcClient<F>
where
	F: ?Sized + HttpFetcher,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OidcClient").field("settings", &self.settings).finish()
	}
}

fn outcome_of<T>(result: &Result<T>) -> FlowOutcome {
	if result.is_ok() { FlowOutcome::Success } else { FlowOutcome::Failure }
}
