//! Transport primitives for discovery, token, userinfo, and revocation requests.
//!
//! The module exposes [`HttpFetcher`] as the engine's only dependency on an HTTP
//! stack. Callers provide an implementation (typically behind `Arc<T>` where
//! `T: HttpFetcher`) and the engine issues JSON GETs and form-encoded POSTs through
//! it. The reqwest-backed default lives behind the `reqwest` feature and maps client
//! timeouts to [`FetchError::Timeout`] so the engine can surface its distinct
//! timeout error kind.

// crates.io
#[cfg(feature = "reqwest")] use reqwest::header::ACCEPT;
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	error::{ProtocolErrorResponse, TransportError},
};
#[cfg(feature = "reqwest")] use std::ops::Deref;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Future type returned by [`HttpFetcher`] implementations.
pub type FetchFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, FetchError>> + 'a + Send>>;

/// Transport-layer failure emitted by an [`HttpFetcher`].
#[derive(Debug, ThisError)]
pub enum FetchError {
	/// The request did not complete within the configured timeout.
	#[error("Request timed out.")]
	Timeout,
	/// The underlying transport reported a network failure.
	#[error("Network error occurred during the request.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The endpoint returned a non-2xx status.
	#[error("Request failed with HTTP status {status}.")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Parsed error body, when the endpoint supplied one.
		body: Option<Value>,
	},
	/// The response body could not be parsed as JSON.
	#[error("Response body is not valid JSON.")]
	Parse {
		/// Structured parsing failure with the failing path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}

/// Per-request options threaded through every fetch.
#[derive(Clone, Debug, Default)]
pub struct RequestOptions {
	/// Per-call timeout; omitted means the transport default applies.
	pub timeout: Option<Duration>,
	/// Bearer token attached as an `Authorization` header.
	pub bearer: Option<String>,
	/// HTTP Basic credentials attached as an `Authorization` header.
	pub basic: Option<(String, String)>,
}

/// Abstraction over HTTP transports capable of executing the engine's requests.
///
/// Implementations must be `Send + Sync + 'static` so they can be shared across
/// client instances, and the futures they return must be `Send` so flow bodies can
/// be boxed without worrying about borrowed transports. An empty 2xx body resolves
/// to [`Value::Null`] rather than a parse failure (revocation endpoints commonly
/// return no content).
pub trait HttpFetcher
where
	Self: 'static + Send + Sync,
{
	/// Performs a GET and parses the response body as JSON.
	fn get_json<'a>(&'a self, url: &'a Url, options: &'a RequestOptions) -> FetchFuture<'a, Value>;

	/// Performs a form-encoded POST and parses the response body as JSON.
	fn post_form<'a>(
		&'a self,
		url: &'a Url,
		form: &'a [(String, String)],
		options: &'a RequestOptions,
	) -> FetchFuture<'a, Value>;
}

/// Maps a [`FetchError`] into the engine error taxonomy for a named endpoint.
///
/// Non-2xx responses that carry an OAuth `error` body surface as structured
/// [`ProtocolErrorResponse`] values; anything else stays a transport failure.
pub(crate) fn map_fetch_error(endpoint: &'static str, error: FetchError) -> Error {
	match error {
		FetchError::Timeout => Error::Timeout { endpoint },
		FetchError::Network { source } => TransportError::Network { endpoint, source }.into(),
		FetchError::Status { status, body } => match protocol_error_from_body(body.as_ref()) {
			Some(response) => response.into(),
			None => TransportError::Status { endpoint, status }.into(),
		},
		FetchError::Parse { source } => TransportError::ResponseParse { endpoint, source }.into(),
	}
}

fn protocol_error_from_body(body: Option<&Value>) -> Option<ProtocolErrorResponse> {
	let map = body?.as_object()?;
	let error = map.get("error")?.as_str()?.to_owned();
	let error_description =
		map.get("error_description").and_then(Value::as_str).map(str::to_owned);
	let error_uri = map.get("error_uri").and_then(Value::as_str).map(str::to_owned);

	Some(ProtocolErrorResponse {
		error,
		error_description,
		error_uri,
		session_state: None,
		state: None,
	})
}

/// Appends a JSON-typed parameter to a flat form/query parameter list.
///
/// Arrays fan out into repeated fields, strings are passed through verbatim, other
/// scalars use their canonical JSON rendering, and nulls are omitted entirely.
pub(crate) fn push_form_value(form: &mut Vec<(String, String)>, name: &str, value: &Value) {
	match value {
		Value::Null => {},
		Value::Array(items) =>
			for item in items {
				push_form_value(form, name, item);
			},
		Value::String(text) => form.push((name.to_owned(), text.clone())),
		other => form.push((name.to_owned(), other.to_string())),
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
/// The engine's requests never follow redirects on token-style endpoints; configure
/// any custom [`ReqwestClient`] accordingly.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestHttpFetcher(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpFetcher {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	async fn execute(request: reqwest::RequestBuilder) -> Result<Value, FetchError> {
		let response = request.send().await.map_err(map_reqwest_error)?;
		let status = response.status();
		let text = response.text().await.map_err(map_reqwest_error)?;
		let body = parse_body(&text);

		if !status.is_success() {
			return Err(FetchError::Status { status: status.as_u16(), body: body.ok() });
		}

		body
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpFetcher {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpFetcher {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpFetcher for ReqwestHttpFetcher {
	fn get_json<'a>(&'a self, url: &'a Url, options: &'a RequestOptions) -> FetchFuture<'a, Value> {
		Box::pin(async move {
			let request = apply_options(self.0.get(url.clone()), options)
				.header(ACCEPT, "application/json");

			Self::execute(request).await
		})
	}

	fn post_form<'a>(
		&'a self,
		url: &'a Url,
		form: &'a [(String, String)],
		options: &'a RequestOptions,
	) -> FetchFuture<'a, Value> {
		Box::pin(async move {
			let request = apply_options(self.0.post(url.clone()), options).form(form);

			Self::execute(request).await
		})
	}
}

#[cfg(feature = "reqwest")]
fn apply_options(
	mut request: reqwest::RequestBuilder,
	options: &RequestOptions,
) -> reqwest::RequestBuilder {
	if let Some(timeout) = options.timeout
		&& let Ok(timeout) = std::time::Duration::try_from(timeout)
	{
		request = request.timeout(timeout);
	}
	if let Some(bearer) = &options.bearer {
		request = request.bearer_auth(bearer);
	}
	if let Some((username, password)) = &options.basic {
		request = request.basic_auth(username, Some(password));
	}

	request
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(error: ReqwestError) -> FetchError {
	if error.is_timeout() {
		FetchError::Timeout
	} else {
		FetchError::Network { source: Box::new(error) }
	}
}

fn parse_body(text: &str) -> Result<Value, FetchError> {
	if text.trim().is_empty() {
		return Ok(Value::Null);
	}

	let mut deserializer = serde_json::Deserializer::from_str(text);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| FetchError::Parse { source })
}
