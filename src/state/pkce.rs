//! PKCE verifier/challenge generation (RFC 7636, `S256` only).

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};

pub(crate) const STATE_ID_LEN: usize = 32;
const PKCE_VERIFIER_LEN: usize = 64;

/// Supported PKCE challenge methods.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CodeChallengeMethod {
	/// SHA-256 based PKCE (RFC 7636 S256).
	S256,
}
impl CodeChallengeMethod {
	/// Returns the RFC 7636 identifier for the challenge method.
	pub fn as_str(self) -> &'static str {
		match self {
			CodeChallengeMethod::S256 => "S256",
		}
	}
}

/// PKCE verifier plus its derived challenge.
#[derive(Clone, Debug)]
pub struct PkcePair {
	verifier: String,
	challenge: String,
	method: CodeChallengeMethod,
}
impl PkcePair {
	/// Generates a fresh random verifier and derives its challenge.
	pub fn generate() -> Self {
		Self::from_verifier(random_string(PKCE_VERIFIER_LEN))
	}

	/// Derives the challenge for a caller-supplied verifier.
	pub fn from_verifier(verifier: impl Into<String>) -> Self {
		let verifier = verifier.into();
		let challenge = compute_code_challenge(&verifier);

		Self { verifier, challenge, method: CodeChallengeMethod::S256 }
	}

	/// Secret verifier sent to the token endpoint during code exchange.
	pub fn verifier(&self) -> &str {
		&self.verifier
	}

	/// Public challenge attached to the authorization request.
	pub fn challenge(&self) -> &str {
		&self.challenge
	}

	/// Challenge method (currently always `S256`).
	pub fn method(&self) -> CodeChallengeMethod {
		self.method
	}
}

/// Computes the base64url, padding-stripped SHA-256 challenge for a verifier.
pub fn compute_code_challenge(verifier: &str) -> String {
	let mut hasher = Sha256::new();

	hasher.update(verifier.as_bytes());

	URL_SAFE_NO_PAD.encode(hasher.finalize())
}

pub(crate) fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn challenge_matches_rfc_7636_test_vector() {
		assert_eq!(
			compute_code_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
			"E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM",
		);
	}

	#[test]
	fn challenge_is_deterministic_and_urlsafe() {
		let pair_a = PkcePair::from_verifier("fixed-verifier-value");
		let pair_b = PkcePair::from_verifier("fixed-verifier-value");

		assert_eq!(pair_a.challenge(), pair_b.challenge());
		assert!(!pair_a.challenge().contains(['+', '/', '=']));
		assert_eq!(pair_a.method(), CodeChallengeMethod::S256);
	}

	#[test]
	fn generated_verifiers_are_unique_and_sized() {
		let pair_a = PkcePair::generate();
		let pair_b = PkcePair::generate();

		assert_eq!(pair_a.verifier().len(), PKCE_VERIFIER_LEN);
		assert_ne!(pair_a.verifier(), pair_b.verifier());
	}
}
