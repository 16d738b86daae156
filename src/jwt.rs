//! Compact JWT payload decoding.
//!
//! Only the claims payload is decoded; signature verification against JWKS is the
//! responsibility of a platform crypto layer, not this engine.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde_json::Value;
// self
use crate::{_prelude::*, claims::Claims};

/// Errors raised while decoding a compact JWT payload.
#[derive(Debug, ThisError)]
pub enum JwtDecodeError {
	/// The token is not a three-segment compact serialization.
	#[error("Token is not a three-segment compact JWT.")]
	MalformedToken,
	/// The payload segment is not valid base64url.
	#[error("Token payload is not valid base64url.")]
	PayloadEncoding {
		/// Underlying decoding failure.
		#[source]
		source: base64::DecodeError,
	},
	/// The payload decodes but is not valid JSON.
	#[error("Token payload is not valid JSON.")]
	PayloadJson {
		/// Underlying parsing failure.
		#[source]
		source: serde_json::Error,
	},
	/// The payload parses but is not a JSON object.
	#[error("Token payload is not a JSON object.")]
	PayloadShape,
}

/// Decodes the claims payload of a compact JWT without verifying its signature.
pub fn decode_claims(token: &str) -> Result<Claims, JwtDecodeError> {
	let mut segments = token.split('.');
	let (Some(_header), Some(payload), Some(_signature), None) =
		(segments.next(), segments.next(), segments.next(), segments.next())
	else {
		return Err(JwtDecodeError::MalformedToken);
	};
	let bytes =
		URL_SAFE_NO_PAD.decode(payload).map_err(|source| JwtDecodeError::PayloadEncoding { source })?;
	let value: Value =
		serde_json::from_slice(&bytes).map_err(|source| JwtDecodeError::PayloadJson { source })?;

	match value {
		Value::Object(claims) => Ok(claims),
		_ => Err(JwtDecodeError::PayloadShape),
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	fn encode_segment(value: &Value) -> String {
		URL_SAFE_NO_PAD.encode(serde_json::to_vec(value).expect("Segment should serialize."))
	}

	#[test]
	fn decodes_claims_from_compact_serialization() {
		let token = format!(
			"{}.{}.signature",
			encode_segment(&json!({"alg": "RS256"})),
			encode_segment(&json!({"sub": "u1", "aud": "c1"})),
		);
		let claims = decode_claims(&token).expect("Well-formed token should decode.");

		assert_eq!(claims.get("sub"), Some(&json!("u1")));
		assert_eq!(claims.get("aud"), Some(&json!("c1")));
	}

	#[test]
	fn rejects_tokens_without_three_segments() {
		assert!(matches!(decode_claims("only.two"), Err(JwtDecodeError::MalformedToken)));
		assert!(matches!(decode_claims("a.b.c.d"), Err(JwtDecodeError::MalformedToken)));
	}

	#[test]
	fn rejects_non_object_payloads() {
		let token = format!(
			"{}.{}.signature",
			encode_segment(&json!({"alg": "none"})),
			encode_segment(&json!(["not", "an", "object"])),
		);

		assert!(matches!(decode_claims(&token), Err(JwtDecodeError::PayloadShape)));
	}

	#[test]
	fn rejects_invalid_base64_payloads() {
		let token = format!("{}.%%%.signature", encode_segment(&json!({"alg": "none"})));

		assert!(matches!(decode_claims(&token), Err(JwtDecodeError::PayloadEncoding { .. })));
	}
}
