//! Engine-level error types shared across requests, validation, exchanges, and stores.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;
type JsonPathError = serde_path_to_error::Error<serde_json::Error>;

/// Canonical engine error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem; fails before any I/O.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Correlation or integrity failure; a trust-boundary check did not hold.
	#[error(transparent)]
	Validation(#[from] ValidationError),
	/// Structured error returned by the OpenID Provider.
	#[error(transparent)]
	Protocol(#[from] Box<ProtocolErrorResponse>),
	/// Transport failure (DNS, TCP, TLS, malformed body).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// The provider did not answer within the configured per-call timeout.
	///
	/// Kept distinct from [`TransportError`] so retry layers can tell "unreachable in
	/// time" apart from "rejected the request".
	#[error("Request to the {endpoint} endpoint timed out.")]
	Timeout {
		/// Endpoint label (`token`, `metadata`, `userinfo`, `revocation`).
		endpoint: &'static str,
	},
}
impl From<ProtocolErrorResponse> for Error {
	fn from(response: ProtocolErrorResponse) -> Self {
		Self::Protocol(Box::new(response))
	}
}

/// Configuration and validation failures raised before any network round trip.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// A required settings or request field is absent or empty.
	#[error("Missing required setting: {field}.")]
	MissingSetting {
		/// Name of the missing field.
		field: &'static str,
	},
	/// Only the Authorization Code flow is supported.
	#[error("Only the Authorization Code flow is supported; rejecting response_type `{response_type}`.")]
	UnsupportedResponseType {
		/// The rejected response type.
		response_type: String,
	},
	/// Provider metadata does not declare an endpoint required by the operation.
	#[error("Provider metadata does not declare a {name}.")]
	MissingEndpoint {
		/// Metadata property name of the missing endpoint.
		name: &'static str,
	},
	/// Provider metadata is missing a mandatory property.
	#[error("Provider metadata is missing the mandatory `{name}` property.")]
	MissingMetadataProperty {
		/// Name of the missing property.
		name: &'static str,
	},
	/// The fetched key set did not carry a `keys` array.
	#[error("Key set response is missing the `keys` array.")]
	MissingSigningKeys,
	/// `client_secret_basic` authentication requires a secret.
	#[error("client_secret_basic authentication requires a client secret.")]
	MissingClientSecret,
	/// A configured or fetched URL failed to parse.
	#[error("Configured URL is invalid.")]
	InvalidUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A correlation record could not be serialized for storage.
	#[error("State could not be encoded for storage.")]
	StateEncode {
		/// Underlying serialization failure.
		#[source]
		source: serde_json::Error,
	},
	/// A stored correlation record failed to decode.
	#[error("Stored state failed to decode.")]
	StateDecode {
		/// Structured parsing failure with the failing path.
		#[source]
		source: JsonPathError,
	},
}

/// Correlation and integrity failures; never downgraded to warnings.
#[derive(Debug, ThisError)]
pub enum ValidationError {
	/// The `state` in the response does not match the pending request.
	#[error("State in the response does not match the pending request.")]
	StateMismatch,
	/// The response carried no `state` parameter at all.
	#[error("Response is missing the state parameter.")]
	MissingResponseState,
	/// No stored correlation record matches the response `state`.
	#[error("No stored state matches the response state.")]
	NoMatchingState,
	/// The stored record did not capture an authority.
	#[error("Stored state is missing its authority.")]
	MissingAuthority,
	/// The stored record did not capture a client_id.
	#[error("Stored state is missing its client_id.")]
	MissingClientId,
	/// The authority recorded at request time no longer matches the settings.
	#[error("Authority recorded at request time ({stored}) does not match the configured authority ({configured}).")]
	AuthorityMismatch {
		/// Authority captured when the request was built.
		stored: String,
		/// Authority configured at response time.
		configured: String,
	},
	/// The client_id recorded at request time no longer matches the settings.
	#[error("client_id recorded at request time ({stored}) does not match the configured client_id ({configured}).")]
	ClientIdMismatch {
		/// client_id captured when the request was built.
		stored: String,
		/// client_id configured at response time.
		configured: String,
	},
	/// The ID Token could not be decoded.
	#[error("ID Token could not be decoded.")]
	IdTokenDecode {
		/// Underlying decode failure.
		#[source]
		source: crate::jwt::JwtDecodeError,
	},
	/// The ID Token carries no `sub` claim.
	#[error("ID Token is missing the `sub` claim.")]
	MissingSubject,
	/// The subject changed across a renewal.
	#[error("ID Token `sub` changed from {prior} to {current} during renewal.")]
	SubjectChanged {
		/// Subject of the previous token.
		prior: String,
		/// Subject of the renewed token.
		current: String,
	},
	/// `auth_time` changed across a renewal although both tokens carry it.
	#[error("ID Token `auth_time` changed during renewal.")]
	AuthTimeChanged,
	/// `azp` changed across a renewal although both tokens carry it.
	#[error("ID Token `azp` changed during renewal.")]
	AuthorizedPartyChanged,
	/// The renewed token silently dropped its `azp` claim.
	#[error("ID Token dropped its `azp` claim during renewal.")]
	AuthorizedPartyDropped,
	/// The userinfo endpoint asserted a different subject.
	#[error("UserInfo `sub` ({userinfo}) does not match the established subject ({expected}).")]
	UserInfoSubjectMismatch {
		/// Subject asserted by the userinfo endpoint (empty when absent).
		userinfo: String,
		/// Subject already established by the ID Token or prior session.
		expected: String,
	},
}

/// Structured error response returned by the OpenID Provider, either as callback
/// parameters or as a non-2xx token/revocation endpoint body.
#[derive(Clone, Debug, ThisError)]
#[error("Provider returned an error response: {error}.")]
pub struct ProtocolErrorResponse {
	/// OAuth error code (`access_denied`, `invalid_grant`, ...).
	pub error: String,
	/// Human-readable description supplied by the provider.
	pub error_description: Option<String>,
	/// Documentation URI supplied by the provider.
	pub error_uri: Option<String>,
	/// Session state echoed by the provider, when present.
	pub session_state: Option<String>,
	/// Caller payload recorded on the correlated state, round-tripped unchanged.
	pub state: Option<serde_json::Value>,
}

/// Transport-level failures (network, IO, malformed bodies).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the {endpoint} endpoint.")]
	Network {
		/// Endpoint label.
		endpoint: &'static str,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The endpoint returned a non-2xx status without an OAuth error body.
	#[error("The {endpoint} endpoint returned HTTP status {status}.")]
	Status {
		/// Endpoint label.
		endpoint: &'static str,
		/// HTTP status code.
		status: u16,
	},
	/// The endpoint responded with JSON that could not be parsed.
	#[error("The {endpoint} endpoint returned malformed JSON.")]
	ResponseParse {
		/// Endpoint label.
		endpoint: &'static str,
		/// Structured parsing failure with the failing path.
		#[source]
		source: JsonPathError,
	},
}
