//! PKCE (RFC 7636) verifier/challenge generation.
//!
//! The verifier is 32 cryptographically random bytes, URL-safe-base64 encoded without
//! padding; the challenge is the base64url SHA-256 digest of the encoded verifier's
//! ASCII bytes, which is exactly the `S256` transform the RFC specifies (the code
//! verifier *is* that ASCII string).

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

const VERIFIER_BYTES: usize = 32;

/// Encodes bytes as URL-safe base64 without padding (`+`→`-`, `/`→`_`, no `=`).
pub fn base64_url(bytes: impl AsRef<[u8]>) -> String {
	URL_SAFE_NO_PAD.encode(bytes)
}

/// Computes the `S256` code challenge for a verifier string.
pub fn derive_challenge(verifier: &str) -> String {
	let mut hasher = Sha256::new();

	hasher.update(verifier.as_bytes());

	base64_url(hasher.finalize())
}

/// Supported PKCE challenge methods surfaced via [`PkcePair`].
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

/// PKCE verifier/challenge pair held for the lifetime of one authorization attempt.
///
/// The verifier stays inside the crate until the token exchange POST; only the
/// challenge is ever placed on the authorize URL.
#[derive(Clone)]
pub struct PkcePair {
	verifier: String,
	challenge: String,
	method: CodeChallengeMethod,
}
impl PkcePair {
	/// Generates a fresh pair from the process CSPRNG.
	pub fn generate() -> Self {
		let mut bytes = [0_u8; VERIFIER_BYTES];

		rand::rng().fill_bytes(&mut bytes);

		let verifier = base64_url(bytes);
		let challenge = derive_challenge(&verifier);

		Self { verifier, challenge, method: CodeChallengeMethod::S256 }
	}

	/// PKCE code challenge derived from the secret verifier.
	pub fn challenge(&self) -> &str {
		&self.challenge
	}

	/// PKCE challenge method (currently always `S256`).
	pub fn method(&self) -> CodeChallengeMethod {
		self.method
	}

	pub(crate) fn verifier(&self) -> &str {
		&self.verifier
	}
}
impl Debug for PkcePair {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PkcePair")
			.field("verifier", &"<redacted>")
			.field("challenge", &self.challenge)
			.field("method", &self.method)
			.finish()
	}
}
