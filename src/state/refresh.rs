//! Session snapshot backing a refresh-token grant.

// crates.io
use serde_json::Value;
// self
use crate::{_prelude::*, claims::Claims};

/// Prior-session snapshot a caller passes into a refresh operation.
///
/// Unlike [`SigninState`](crate::state::SigninState) this is never persisted; the
/// caller holds it between refreshes. The `id_token` and `profile` are the prior
/// session's values and anchor the identity-continuity checks.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshState {
	/// Refresh token to present to the token endpoint.
	pub refresh_token: String,
	/// Prior session's ID token, reused when the OP returns none.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id_token: Option<String>,
	/// Prior session-state value, reused when the OP returns none.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub session_state: Option<String>,
	/// Scope to request; the prior grant's scope when omitted from the call.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub scope: Option<String>,
	/// Prior session's filtered profile claims.
	#[serde(default)]
	pub profile: Claims,
	/// Opaque caller payload surfaced back on the refreshed response.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data: Option<Value>,
}
impl Debug for RefreshState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshState")
			.field("refresh_token", &"<redacted>")
			.field("id_token_set", &self.id_token.is_some())
			.field("session_state", &self.session_state)
			.field("scope", &self.scope)
			.field("profile", &self.profile)
			.field("data", &self.data)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn debug_redacts_the_refresh_token() {
		let state = RefreshState {
			refresh_token: "rt-secret".into(),
			id_token: Some("header.payload.sig".into()),
			session_state: None,
			scope: Some("openid".into()),
			profile: Claims::default(),
			data: None,
		};
		let rendered = format!("{state:?}");

		assert!(!rendered.contains("rt-secret"));
		assert!(rendered.contains("<redacted>"));
	}
}
