//! Correlation records for pending OP round trips and the staleness sweep.

pub mod pkce;
pub mod refresh;
pub mod signin;

pub use pkce::*;
pub use refresh::*;
pub use signin::*;

// crates.io
use serde::de::DeserializeOwned;
use serde_json::Value;
// self
use crate::{_prelude::*, error::ConfigError, store::StateStore};

/// Delimiter between the correlation id and a caller-supplied `url_state` suffix in
/// the wire `state` parameter.
pub const URL_STATE_DELIMITER: char = ';';

/// UI flow that initiated a round trip; round-tripped through storage so the
/// response side can dispatch back to the right handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
	/// Interactive signin via full-page redirect.
	SigninRedirect,
	/// Interactive signin via popup window.
	SigninPopup,
	/// Non-interactive signin via hidden iframe.
	SigninSilent,
	/// Signout via full-page redirect.
	SignoutRedirect,
	/// Signout via popup window.
	SignoutPopup,
}

/// Arguments for constructing a [`State`].
#[derive(Clone, Debug)]
pub struct StateArgs {
	/// Correlation id; generated when omitted.
	pub id: Option<String>,
	/// UI flow tag.
	pub request_type: RequestType,
	/// Opaque caller payload round-tripped unchanged.
	pub data: Option<Value>,
	/// Caller-supplied suffix appended to the wire `state` value.
	pub url_state: Option<String>,
}

/// Immutable correlation record for any OP round trip.
///
/// The `id` is the sole correlation key between an emitted request and its returned
/// response; it doubles as the OAuth `state` parameter (optionally suffixed with
/// `url_state`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct State {
	/// Unguessable opaque correlation token.
	pub id: String,
	/// Issuance timestamp, stored as epoch seconds.
	#[serde(with = "time::serde::timestamp")]
	pub created: OffsetDateTime,
	/// UI flow that initiated the round trip.
	pub request_type: RequestType,
	/// Opaque caller payload round-tripped unchanged.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data: Option<Value>,
	/// Caller-supplied suffix passed through the OP untouched.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub url_state: Option<String>,
}
impl State {
	/// Creates a record, generating a random id when the caller supplied none.
	pub fn new(args: StateArgs) -> Self {
		Self {
			id: args.id.unwrap_or_else(|| random_string(STATE_ID_LEN)),
			created: now_seconds(),
			request_type: args.request_type,
			data: args.data,
			url_state: args.url_state,
		}
	}

	/// Wire `state` value: the id, suffixed with the delimited `url_state` when set.
	pub fn wire_state(&self) -> String {
		match &self.url_state {
			Some(url_state) => format!("{}{URL_STATE_DELIMITER}{url_state}", self.id),
			None => self.id.clone(),
		}
	}

	/// Splits a wire `state` value into its correlation id and optional suffix.
	///
	/// Only the first delimiter splits; the suffix is returned verbatim.
	pub fn split_wire_state(value: &str) -> (&str, Option<&str>) {
		match value.split_once(URL_STATE_DELIMITER) {
			Some((id, url_state)) => (id, Some(url_state)),
			None => (value, None),
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

// Storage keeps second precision; truncate so in-memory records compare equal to
// their restored counterparts.
fn now_seconds() -> OffsetDateTime {
	let now = OffsetDateTime::now_utc();

	now.replace_nanosecond(0).unwrap_or(now)
}

pub(crate) fn encode_stored<T>(value: &T) -> Result<String>
where
	T: Serialize,
{
	serde_json::to_string(value).map_err(|source| ConfigError::StateEncode { source }.into())
}

pub(crate) fn decode_stored<T>(raw: &str) -> Result<T>
where
	T: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_str(raw);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| ConfigError::StateDecode { source }.into())
}

/// Removes every stored state record under `prefix` whose `created` stamp is at or
/// past the staleness cutoff.
///
/// Records that are empty or fail to parse are removed as well; the sweep fails open
/// toward deletion, never toward silent retention of unparseable state. Keys outside
/// `prefix` are never touched.
pub async fn clear_stale_state(
	store: &dyn StateStore,
	prefix: &str,
	max_age: Duration,
) -> Result<()> {
	let cutoff = OffsetDateTime::now_utc() - max_age;

	for key in store.all_keys().await? {
		if !key.starts_with(prefix) {
			continue;
		}

		let stale = match store.get(&key).await? {
			None => true,
			Some(raw) if raw.is_empty() => true,
			Some(raw) => match State::from_storage_string(&raw) {
				Ok(state) => state.created <= cutoff,
				Err(_) => true,
			},
		};

		if stale {
			store.remove(&key).await?;
		}
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	#[test]
	fn generates_unguessable_ids_when_omitted() {
		let args = StateArgs {
			id: None,
			request_type: RequestType::SigninRedirect,
			data: None,
			url_state: None,
		};
		let state_a = State::new(args.clone());
		let state_b = State::new(args);

		assert_eq!(state_a.id.len(), 32);
		assert_ne!(state_a.id, state_b.id);
	}

	#[test]
	fn storage_round_trip_is_lossless() {
		let state = State::new(StateArgs {
			id: Some("fixed-id".into()),
			request_type: RequestType::SigninPopup,
			data: Some(json!({"return_to": "/inbox", "attempt": 2})),
			url_state: Some("tab=2".into()),
		});
		let restored = State::from_storage_string(
			&state.to_storage_string().expect("State should serialize for storage."),
		)
		.expect("Stored state should restore.");

		assert_eq!(restored, state);
	}

	#[test]
	fn wire_state_appends_and_splits_on_first_delimiter() {
		let state = State::new(StateArgs {
			id: Some("abc".into()),
			request_type: RequestType::SigninRedirect,
			data: None,
			url_state: Some("x;y".into()),
		});

		assert_eq!(state.wire_state(), "abc;x;y");
		assert_eq!(State::split_wire_state("abc;x;y"), ("abc", Some("x;y")));
		assert_eq!(State::split_wire_state("abc"), ("abc", None));
	}

	#[test]
	fn unparseable_storage_strings_fail_to_decode() {
		assert!(State::from_storage_string("not json").is_err());
		assert!(State::from_storage_string("{}").is_err());
	}
}
