//! End-session-request builder (OIDC RP-initiated logout).

// crates.io
use serde_json::{Map, Value};
// self
use crate::{
	_prelude::*,
	http::push_form_value,
	state::{RequestType, State, StateArgs},
};

/// Arguments for building a [`SignoutRequest`].
#[derive(Clone, Debug)]
pub struct SignoutRequestArgs {
	/// End-session endpoint to address.
	pub url: Url,
	/// UI flow initiating the request.
	pub request_type: RequestType,
	/// ID token presented as `id_token_hint`.
	pub id_token_hint: Option<String>,
	/// Return URL after logout (`post_logout_redirect_uri`).
	pub post_logout_redirect_uri: Option<String>,
	/// OAuth `client_id`, sent when the OP requires it alongside the hint.
	pub client_id: Option<String>,
	/// Opaque caller payload round-tripped through storage.
	pub state_data: Option<Value>,
	/// Caller suffix appended to the wire `state` value.
	pub url_state: Option<String>,
	/// Caller-supplied correlation id; generated when omitted.
	pub state_id: Option<String>,
	/// Additional end-session query parameters.
	pub extra_query_params: Map<String, Value>,
}

/// A ready-to-navigate end-session request plus its optional correlation state.
///
/// State is only created when there is something to correlate: caller `data` or a
/// `url_state` suffix. A bare signout needs no storage round trip.
#[derive(Clone, Debug)]
pub struct SignoutRequest {
	/// Fully parameterized end-session URL.
	pub url: Url,
	/// Correlation state to persist before navigating, when one was created.
	pub state: Option<State>,
}
impl SignoutRequest {
	/// Assembles the end-session URL, creating correlation state only when needed.
	pub fn new(args: SignoutRequestArgs) -> Result<Self> {
		let state = (args.state_data.is_some() || args.url_state.is_some()).then(|| {
			State::new(StateArgs {
				id: args.state_id,
				request_type: args.request_type,
				data: args.state_data,
				url_state: args.url_state,
			})
		});
		let mut url = args.url;

		{
			let mut pairs = url.query_pairs_mut();

			if let Some(id_token_hint) = &args.id_token_hint {
				pairs.append_pair("id_token_hint", id_token_hint);
			}
			if let Some(post_logout_redirect_uri) = &args.post_logout_redirect_uri {
				pairs.append_pair("post_logout_redirect_uri", post_logout_redirect_uri);
			}
			if let Some(client_id) = &args.client_id {
				pairs.append_pair("client_id", client_id);
			}
			if let Some(state) = &state {
				pairs.append_pair("state", &state.wire_state());
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
