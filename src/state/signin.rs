//! Signin-specific correlation state carrying the PKCE pair and request-time snapshot.

// crates.io
use serde_json::{Map, Value};
// self
use crate::{
	_prelude::*,
	response::ResponseMode,
	state::{PkcePair, State, StateArgs, decode_stored, encode_stored},
};

/// Arguments for constructing a [`SigninState`].
#[derive(Clone, Debug)]
pub struct SigninStateArgs {
	/// Base correlation record arguments.
	pub state: StateArgs,
	/// Authority the request was built against.
	pub authority: String,
	/// Client identifier the request was built for.
	pub client_id: String,
	/// Redirect URI sent on the authorization request.
	pub redirect_uri: String,
	/// Scope sent on the authorization request.
	pub scope: String,
	/// Client secret snapshot for the later code exchange.
	pub client_secret: Option<String>,
	/// Extra parameters replayed on the token request.
	pub extra_token_params: Option<Map<String, Value>>,
	/// Response mode requested from the OP.
	pub response_mode: Option<ResponseMode>,
	/// Suppresses the userinfo fetch during response validation.
	pub skip_user_info: bool,
	/// Disables PKCE for providers that cannot handle it.
	pub disable_pkce: bool,
	/// Caller-supplied PKCE verifier; generated when omitted (unless disabled).
	pub code_verifier: Option<String>,
}

/// Correlation state for a pending signin attempt.
///
/// Captures the settings snapshot needed to exchange the authorization code and to
/// detect authority/client tampering between request and response time.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct SigninState {
	/// Base correlation record.
	#[serde(flatten)]
	pub state: State,
	/// PKCE verifier, present unless PKCE was disabled.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub code_verifier: Option<String>,
	/// PKCE challenge derived from the verifier.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub code_challenge: Option<String>,
	/// Authority recorded at request time.
	pub authority: String,
	/// Client identifier recorded at request time.
	pub client_id: String,
	/// Redirect URI recorded at request time.
	pub redirect_uri: String,
	/// Scope recorded at request time.
	pub scope: String,
	/// Client secret snapshot for the code exchange.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub client_secret: Option<String>,
	/// Extra parameters replayed on the token request.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub extra_token_params: Option<Map<String, Value>>,
	/// Response mode requested from the OP.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub response_mode: Option<ResponseMode>,
	/// Suppresses the userinfo fetch during response validation.
	#[serde(default)]
	pub skip_user_info: bool,
}
impl SigninState {
	/// Creates signin state, generating the PKCE pair unless disabled.
	pub fn new(args: SigninStateArgs) -> Self {
		let pkce = if args.disable_pkce {
			None
		} else {
			Some(match args.code_verifier {
				Some(verifier) => PkcePair::from_verifier(verifier),
				None => PkcePair::generate(),
			})
		};

		Self {
			state: State::new(args.state),
			code_verifier: pkce.as_ref().map(|pair| pair.verifier().to_owned()),
			code_challenge: pkce.as_ref().map(|pair| pair.challenge().to_owned()),
			authority: args.authority,
			client_id: args.client_id,
			redirect_uri: args.redirect_uri,
			scope: args.scope,
			client_secret: args.client_secret,
			extra_token_params: args.extra_token_params,
			response_mode: args.response_mode,
			skip_user_info: args.skip_user_info,
		}
	}

	/// Serializes the record to its canonical storage shape.
	pub fn to_storage_string(&self) -> Result<String> {
		encode_stored(self)
	}

	/// Restores a record from its storage shape; round-trips are lossless.
	pub fn from_storage_string(raw: &str) -> Result<Self> {
		decode_stored(raw)
	}
}
impl Debug for SigninState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SigninState")
			.field("state", &self.state)
			.field("code_verifier", &self.code_verifier.as_ref().map(|_| "<redacted>"))
			.field("code_challenge", &self.code_challenge)
			.field("authority", &self.authority)
			.field("client_id", &self.client_id)
			.field("redirect_uri", &self.redirect_uri)
			.field("scope", &self.scope)
			.field("client_secret_set", &self.client_secret.is_some())
			.field("extra_token_params", &self.extra_token_params)
			.field("response_mode", &self.response_mode)
			.field("skip_user_info", &self.skip_user_info)
			.finish()
	}
}
