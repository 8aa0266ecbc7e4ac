//! Per-attempt authorization state: anti-forgery token, PKCE pair, authorize URL.
//!
//! A [`PendingAuthAttempt`] is an explicit value created when the handshake starts and
//! handed back to the exchange together with the provider's redirect query. It replaces
//! process-wide singletons on purpose: the attempt is read-only after creation, so it
//! can be shared across concurrent handlers, and a second attempt simply carries its
//! own state token instead of colliding with the first.

// crates.io
use rand::RngCore;
use subtle::ConstantTimeEq;
// self
use crate::{
	_prelude::*,
	config::{ClientConfig, ProviderEndpoints},
	pkce::{self, CodeChallengeMethod, PkcePair},
};

const STATE_BYTES: usize = 32;

/// Generates the anti-forgery `state` token for one authorization attempt.
///
/// Sourced from the process CSPRNG; the value must resist guessing within the
/// callback window.
pub fn generate_state() -> String {
	let mut bytes = [0_u8; STATE_BYTES];

	rand::rng().fill_bytes(&mut bytes);

	pkce::base64_url(bytes)
}

/// Query parameters the provider appends when redirecting back to the client.
#[derive(Clone, Debug, Deserialize)]
pub struct CallbackQuery {
	/// Short-lived authorization code to exchange for tokens.
	pub code: String,
	/// Round-tripped anti-forgery token.
	pub state: String,
}

/// One pending Authorization Code + PKCE attempt.
#[derive(Clone)]
pub struct PendingAuthAttempt {
	/// Opaque state value that must round-trip via the redirect handler.
	pub state: String,
	/// Redirect URI the authorize URL was built with.
	pub redirect_uri: Url,
	/// Fully-formed authorize URL the end-user should be sent to.
	pub authorize_url: Url,
	pkce: PkcePair,
}
impl PendingAuthAttempt {
	pub(crate) fn new(endpoints: &ProviderEndpoints, config: &ClientConfig) -> Self {
		let state = generate_state();
		let pkce = PkcePair::generate();
		let authorize_url = build_authorize_url(endpoints, config, &pkce, &state);

		Self { state, redirect_uri: config.redirect_uri.clone(), authorize_url, pkce }
	}

	/// PKCE code challenge derived from the secret verifier.
	pub fn code_challenge(&self) -> &str {
		self.pkce.challenge()
	}

	/// PKCE challenge method (currently always `S256`).
	pub fn code_challenge_method(&self) -> CodeChallengeMethod {
		self.pkce.method()
	}

	/// Validates the returned `state` parameter after the authorization redirect.
	///
	/// A mismatch is a fatal integrity violation for this attempt and must halt the
	/// flow before any token exchange is issued. The comparison is constant-time so
	/// the check leaks nothing about the expected value.
	pub fn validate_state(&self, returned_state: &str) -> Result<()> {
		if bool::from(returned_state.as_bytes().ct_eq(self.state.as_bytes())) {
			Ok(())
		} else {
			Err(Error::StateMismatch)
		}
	}

	pub(crate) fn verifier(&self) -> &str {
		self.pkce.verifier()
	}
}
impl Debug for PendingAuthAttempt {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PendingAuthAttempt")
			.field("state", &self.state)
			.field("redirect_uri", &self.redirect_uri)
			.field("authorize_url", &self.authorize_url)
			.field("code_challenge", &self.code_challenge())
			.field("code_challenge_method", &self.code_challenge_method())
			.finish()
	}
}

fn build_authorize_url(
	endpoints: &ProviderEndpoints,
	config: &ClientConfig,
	pkce: &PkcePair,
	state: &str,
) -> Url {
	let mut url = endpoints.authorize.clone();
	let mut pairs = url.query_pairs_mut();

	pairs.append_pair("response_type", "code");
	pairs.append_pair("redirect_uri", config.redirect_uri.as_str());

	if !config.scopes.is_empty() {
		pairs.append_pair("scope", &config.scopes.normalized());
	}

	pairs.append_pair("client_id", &config.client_id);
	pairs.append_pair("state", state);
	pairs.append_pair("code_challenge", pkce.challenge());
	pairs.append_pair("code_challenge_method", pkce.method().as_str());

	drop(pairs);

	url
}
