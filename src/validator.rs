//! Response validation: correlation checks, code exchange, claims processing, and
//! identity-continuity enforcement.

// crates.io
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	claims::{Claims, ClaimsService},
	error::{ProtocolErrorResponse, TransportError, ValidationError},
	http::{HttpFetcher, RequestOptions, map_fetch_error},
	jwt,
	metadata::MetadataService,
	response::{SigninResponse, SignoutResponse},
	settings::OidcClientSettings,
	state::{RefreshState, SigninState, State},
	token::{ExchangeCodeArgs, TokenClient},
};

/// Validates raw responses against their correlation state and enriches them into
/// usable session material.
///
/// Every check here is a trust boundary: a failure is always an error, never a
/// warning.
pub struct ResponseValidator<F>
where
	F: ?Sized + HttpFetcher,
{
	settings: Arc<OidcClientSettings>,
	metadata: Arc<MetadataService<F>>,
	token_client: TokenClient<F>,
	claims_service: ClaimsService,
	fetcher: Arc<F>,
}
impl<F> ResponseValidator<F>
where
	F: ?Sized + HttpFetcher,
{
	/// Creates a validator over shared settings, metadata, and transport.
	pub fn new(
		settings: Arc<OidcClientSettings>,
		metadata: Arc<MetadataService<F>>,
		token_client: TokenClient<F>,
		fetcher: Arc<F>,
	) -> Self {
		let claims_service = ClaimsService::new(
			settings.filter_protocol_claims.clone(),
			settings.merge_claims_deep,
		);

		Self { settings, metadata, token_client, claims_service, fetcher }
	}

	/// Validates an authorization response end to end: correlation, OP error
	/// surfacing, code exchange, and claims processing.
	pub async fn validate_signin_response(
		&self,
		response: &mut SigninResponse,
		state: &SigninState,
	) -> Result<()> {
		self.process_signin_state(response, state)?;
		self.process_code(response, state).await?;
		self.process_claims(response, None, state.skip_user_info).await?;

		Ok(())
	}

	/// Processes claims for a response produced without a stored correlation record
	/// (resource-owner password grant).
	pub async fn validate_credentials_response(
		&self,
		response: &mut SigninResponse,
		skip_user_info: bool,
	) -> Result<()> {
		self.process_claims(response, None, skip_user_info).await
	}

	/// Validates a refreshed token response against the prior session snapshot,
	/// enforcing identity continuity when a new ID token was issued.
	pub async fn validate_refresh_response(
		&self,
		response: &mut SigninResponse,
		state: &RefreshState,
	) -> Result<()> {
		if response.session_state.is_none() {
			response.session_state = state.session_state.clone();
		}
		if response.scope.is_none() {
			response.scope = state.scope.clone();
		}

		response.user_state = state.data.clone();

		let current_sub = state.profile.get("sub").and_then(Value::as_str).map(str::to_owned);

		match &response.id_token {
			Some(next_token) => {
				let next = decode_id_token(next_token)?;

				if let Some(prior_token) = &state.id_token {
					let prior = decode_id_token(prior_token)?;

					validate_id_token_continuity(&prior, &next)?;
				}

				self.process_claims(response, current_sub.as_deref(), false).await?;
			},
			None => {
				// No new ID token; the prior session's identity carries over untouched.
				response.id_token = state.id_token.clone();
				response.profile = state.profile.clone();

				self.process_user_info(response, current_sub.as_deref(), false).await?;
			},
		}

		Ok(())
	}

	/// Validates an end-session response against its correlation record.
	pub fn validate_signout_response(
		&self,
		response: &mut SignoutResponse,
		state: &State,
	) -> Result<()> {
		if response.state.as_deref() != Some(&state.id) {
			return Err(ValidationError::StateMismatch.into());
		}

		response.user_state = state.data.clone();

		if let Some(error) = &response.error {
			return Err(ProtocolErrorResponse {
				error: error.clone(),
				error_description: response.error_description.clone(),
				error_uri: response.error_uri.clone(),
				session_state: None,
				state: state.data.clone(),
			}
			.into());
		}

		Ok(())
	}

	fn process_signin_state(&self, response: &mut SigninResponse, state: &SigninState) -> Result<()> {
		if response.state.as_deref() != Some(&state.state.id) {
			return Err(ValidationError::StateMismatch.into());
		}
		if state.authority.is_empty() {
			return Err(ValidationError::MissingAuthority.into());
		}
		if state.client_id.is_empty() {
			return Err(ValidationError::MissingClientId.into());
		}

		let configured = self.settings.authority.to_string();

		if state.authority != configured {
			return Err(ValidationError::AuthorityMismatch {
				stored: state.authority.clone(),
				configured,
			}
			.into());
		}
		if state.client_id != self.settings.client_id {
			return Err(ValidationError::ClientIdMismatch {
				stored: state.client_id.clone(),
				configured: self.settings.client_id.clone(),
			}
			.into());
		}

		response.user_state = state.state.data.clone();

		if let Some(error) = &response.error {
			return Err(ProtocolErrorResponse {
				error: error.clone(),
				error_description: response.error_description.clone(),
				error_uri: response.error_uri.clone(),
				session_state: response.session_state.clone(),
				state: state.state.data.clone(),
			}
			.into());
		}

		Ok(())
	}

	async fn process_code(&self, response: &mut SigninResponse, state: &SigninState) -> Result<()> {
		let Some(code) = response.code.clone() else {
			return Ok(());
		};
		let token_response = self
			.token_client
			.exchange_code(ExchangeCodeArgs {
				code,
				redirect_uri: state.redirect_uri.clone(),
				code_verifier: state.code_verifier.clone(),
				client_id: state.client_id.clone(),
				client_secret: state.client_secret.clone(),
				extra_params: state.extra_token_params.clone(),
				timeout: None,
			})
			.await?;

		response.apply_token_response(&token_response);

		Ok(())
	}

	async fn process_claims(
		&self,
		response: &mut SigninResponse,
		current_sub: Option<&str>,
		skip_user_info: bool,
	) -> Result<()> {
		if response.is_open_id()
			&& let Some(id_token) = &response.id_token
		{
			let claims = decode_id_token(id_token)?;

			if !claims.get("sub").map(Value::is_string).unwrap_or(false) {
				return Err(ValidationError::MissingSubject.into());
			}

			response.profile = self.claims_service.filter_protocol_claims(&claims);
		}

		self.process_user_info(response, current_sub, skip_user_info).await
	}

	async fn process_user_info(
		&self,
		response: &mut SigninResponse,
		current_sub: Option<&str>,
		skip_user_info: bool,
	) -> Result<()> {
		if skip_user_info
			|| !self.settings.load_user_info
			|| response.access_token.is_none()
			|| !response.is_open_id()
		{
			return Ok(());
		}

		let expected_sub = response
			.profile
			.get("sub")
			.and_then(Value::as_str)
			.map(str::to_owned)
			.or_else(|| current_sub.map(str::to_owned));
		let userinfo = self.fetch_user_info(response).await?;

		if let Some(expected) = expected_sub {
			let userinfo_sub =
				userinfo.get("sub").and_then(Value::as_str).unwrap_or_default();

			if userinfo_sub != expected {
				return Err(ValidationError::UserInfoSubjectMismatch {
					userinfo: userinfo_sub.to_owned(),
					expected,
				}
				.into());
			}
		}

		let filtered = self.claims_service.filter_protocol_claims(&userinfo);

		response.profile = self.claims_service.merge_claims(&response.profile, &filtered);

		Ok(())
	}

	async fn fetch_user_info(&self, response: &SigninResponse) -> Result<Claims> {
		let url = self.metadata.userinfo_endpoint().await?;
		let options = RequestOptions {
			timeout: self.settings.request_timeout,
			bearer: response.access_token.clone(),
			..<_>::default()
		};
		let body = self
			.fetcher
			.get_json(&url, &options)
			.await
			.map_err(|e| map_fetch_error("userinfo", e))?;

		serde_path_to_error::deserialize(body)
			.map_err(|source| TransportError::ResponseParse { endpoint: "userinfo", source }.into())
	}
}
impl<F> Debug for ResponseValidator<F>
where
	F: ?Sized + HttpFetcher,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ResponseValidator").field("settings", &self.settings).finish()
	}
}

fn decode_id_token(id_token: &str) -> Result<Claims> {
	jwt::decode_claims(id_token).map_err(|source| ValidationError::IdTokenDecode { source }.into())
}

/// Enforces that a renewed ID token still describes the same authentication context
/// as its predecessor.
pub(crate) fn validate_id_token_continuity(
	prior: &Claims,
	next: &Claims,
) -> Result<(), ValidationError> {
	let prior_sub = prior.get("sub").and_then(Value::as_str).unwrap_or_default();
	let next_sub = next.get("sub").and_then(Value::as_str).unwrap_or_default();

	if prior_sub != next_sub {
		return Err(ValidationError::SubjectChanged {
			prior: prior_sub.to_owned(),
			current: next_sub.to_owned(),
		});
	}

	if let (Some(prior_at), Some(next_at)) = (prior.get("auth_time"), next.get("auth_time"))
		&& prior_at != next_at
	{
		return Err(ValidationError::AuthTimeChanged);
	}

	match (prior.get("azp"), next.get("azp")) {
		(Some(prior_azp), Some(next_azp)) if prior_azp != next_azp =>
			Err(ValidationError::AuthorizedPartyChanged),
		(Some(_), None) => Err(ValidationError::AuthorizedPartyDropped),
		_ => Ok(()),
	}
}
