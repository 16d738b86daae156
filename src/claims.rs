//! Claim filtering and merging rules applied to ID Token and userinfo payloads.

// crates.io
use serde_json::{Map, Value};
// self
use crate::_prelude::*;

/// String-keyed map of JWT claims.
pub type Claims = Map<String, Value>;

/// Claims that survive filtering no matter how the filter is configured.
pub const ALWAYS_PRESERVED_CLAIMS: [&str; 5] = ["sub", "iss", "aud", "exp", "iat"];
/// Protocol-reserved claims removed by the default filter.
pub const DEFAULT_PROTOCOL_CLAIMS: [&str; 8] =
	["nbf", "jti", "auth_time", "nonce", "acr", "amr", "azp", "at_hash"];

/// Filter configuration for protocol-reserved claims.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimsFilter {
	/// Remove the [`DEFAULT_PROTOCOL_CLAIMS`] set.
	#[default]
	Default,
	/// Remove exactly the listed claim names.
	Custom(Vec<String>),
	/// Pass claims through unfiltered.
	Disabled,
}

/// Filters protocol claims from profiles and merges claim sets with deterministic
/// conflict rules.
#[derive(Clone, Debug, Default)]
pub struct ClaimsService {
	filter: ClaimsFilter,
	deep_merge: bool,
}
impl ClaimsService {
	/// Creates a service with the provided filter configuration and merge mode.
	pub fn new(filter: ClaimsFilter, deep_merge: bool) -> Self {
		Self { filter, deep_merge }
	}

	/// Returns a copy of `claims` with protocol-reserved claims removed.
	///
	/// The [`ALWAYS_PRESERVED_CLAIMS`] set survives regardless of configuration, even
	/// when a custom list names one of them explicitly.
	pub fn filter_protocol_claims(&self, claims: &Claims) -> Claims {
		if matches!(self.filter, ClaimsFilter::Disabled) {
			return claims.clone();
		}

		let mut filtered = claims.clone();

		filtered.retain(|name, _| {
			ALWAYS_PRESERVED_CLAIMS.contains(&name.as_str()) || !self.is_filtered(name)
		});

		filtered
	}

	/// Merges every claim of `incoming` into a copy of `base`.
	///
	/// Scalars that conflict collapse into `[existing, incoming]`; arrays gain only
	/// values not already present (insertion order preserved); object-vs-object
	/// conflicts merge recursively when deep merging is enabled.
	pub fn merge_claims(&self, base: &Claims, incoming: &Claims) -> Claims {
		merge_maps(base, incoming, self.deep_merge)
	}

	fn is_filtered(&self, name: &str) -> bool {
		match &self.filter {
			ClaimsFilter::Default => DEFAULT_PROTOCOL_CLAIMS.contains(&name),
			ClaimsFilter::Custom(names) => names.iter().any(|candidate| candidate == name),
			ClaimsFilter::Disabled => false,
		}
	}
}

fn merge_maps(base: &Claims, incoming: &Claims, deep: bool) -> Claims {
	let mut merged = base.clone();

	for (name, value) in incoming {
		match value {
			Value::Array(items) =>
				for item in items {
					merge_value(&mut merged, name, item, deep);
				},
			other => merge_value(&mut merged, name, other, deep),
		}
	}

	merged
}

fn merge_value(target: &mut Claims, name: &str, value: &Value, deep: bool) {
	match target.get_mut(name) {
		None => {
			target.insert(name.to_owned(), value.clone());
		},
		Some(existing) if *existing == *value => {},
		Some(Value::Array(existing)) =>
			if !existing.contains(value) {
				existing.push(value.clone());
			},
		Some(existing) =>
			if deep && let (Value::Object(prior), Value::Object(incoming)) = (&*existing, value) {
				*existing = Value::Object(merge_maps(prior, incoming, deep));
			} else {
				let prior = existing.take();

				*existing = Value::Array(vec![prior, value.clone()]);
			},
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	fn claims(value: Value) -> Claims {
		value.as_object().expect("Claims fixture should be a JSON object.").clone()
	}

	#[test]
	fn merge_collapses_conflicting_scalars_into_arrays() {
		let service = ClaimsService::default();
		let merged = service.merge_claims(&claims(json!({"role": "a"})), &claims(json!({"role": "b"})));

		assert_eq!(merged.get("role"), Some(&json!(["a", "b"])));
	}

	#[test]
	fn merge_deduplicates_against_existing_arrays() {
		let service = ClaimsService::default();
		let merged =
			service.merge_claims(&claims(json!({"role": ["a"]})), &claims(json!({"role": "a"})));

		assert_eq!(merged.get("role"), Some(&json!(["a"])));

		let merged =
			service.merge_claims(&claims(json!({"role": ["a"]})), &claims(json!({"role": ["a", "b"]})));

		assert_eq!(merged.get("role"), Some(&json!(["a", "b"])));
	}

	#[test]
	fn merge_sets_missing_claims_directly() {
		let service = ClaimsService::default();
		let merged = service.merge_claims(&claims(json!({"sub": "u1"})), &claims(json!({"email": "e"})));

		assert_eq!(merged.get("sub"), Some(&json!("u1")));
		assert_eq!(merged.get("email"), Some(&json!("e")));
	}

	#[test]
	fn merge_respects_deep_merge_toggle_for_objects() {
		let shallow = ClaimsService::new(ClaimsFilter::Default, false);
		let merged =
			shallow.merge_claims(&claims(json!({"x": {"p": 1}})), &claims(json!({"x": {"q": 2}})));

		assert_eq!(merged.get("x"), Some(&json!([{ "p": 1 }, { "q": 2 }])));

		let deep = ClaimsService::new(ClaimsFilter::Default, true);
		let merged =
			deep.merge_claims(&claims(json!({"x": {"p": 1}})), &claims(json!({"x": {"q": 2}})));

		assert_eq!(merged.get("x"), Some(&json!({ "p": 1, "q": 2 })));
	}

	#[test]
	fn merge_skips_equal_values() {
		let service = ClaimsService::default();
		let merged = service.merge_claims(&claims(json!({"sub": "u1"})), &claims(json!({"sub": "u1"})));

		assert_eq!(merged.get("sub"), Some(&json!("u1")));
	}

	#[test]
	fn default_filter_removes_protocol_claims() {
		let service = ClaimsService::default();
		let filtered = service.filter_protocol_claims(&claims(json!({
			"sub": "u1",
			"nonce": "n",
			"at_hash": "h",
			"auth_time": 12,
			"name": "Ada",
		})));

		assert_eq!(filtered.get("sub"), Some(&json!("u1")));
		assert_eq!(filtered.get("name"), Some(&json!("Ada")));
		assert!(!filtered.contains_key("nonce"));
		assert!(!filtered.contains_key("at_hash"));
		assert!(!filtered.contains_key("auth_time"));
	}

	#[test]
	fn filter_never_removes_always_preserved_claims() {
		let service = ClaimsService::new(
			ClaimsFilter::Custom(vec!["sub".into(), "iss".into(), "email".into()]),
			false,
		);
		let filtered = service.filter_protocol_claims(&claims(json!({
			"sub": "u1",
			"iss": "https://op.example",
			"email": "e",
		})));

		assert_eq!(filtered.get("sub"), Some(&json!("u1")));
		assert_eq!(filtered.get("iss"), Some(&json!("https://op.example")));
		assert!(!filtered.contains_key("email"));
	}

	#[test]
	fn disabled_filter_passes_claims_through() {
		let service = ClaimsService::new(ClaimsFilter::Disabled, false);
		let source = claims(json!({"sub": "u1", "nonce": "n"}));

		assert_eq!(service.filter_protocol_claims(&source), source);
	}
}
