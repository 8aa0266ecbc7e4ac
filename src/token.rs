//! Token secrets and the pair returned by a successful exchange.

// self
use crate::_prelude::*;

/// Redacted token secret wrapper keeping sensitive material out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Access/refresh pair returned once per successful code exchange.
///
/// Nothing here is persisted; ownership passes to the caller by value and never
/// transits a URL query string between handlers.
#[derive(Clone, Debug, Deserialize)]
pub struct TokenPair {
	/// Bearer credential for API calls.
	pub access_token: TokenSecret,
	/// Credential to mint new access tokens (unused here; refresh is a non-goal).
	pub refresh_token: TokenSecret,
}
impl TokenPair {
	/// Extracts the numeric user id the provider encodes as the access token's prefix
	/// before the first `.` delimiter.
	///
	/// This is a documented quirk of the marketplace's token shape, not a generic
	/// OAuth property; a token without the delimiter is malformed for this provider.
	pub fn user_id(&self) -> Result<&str> {
		let token = self.access_token.expose();
		let prefix = token.split('.').next().unwrap_or_default();

		if prefix.is_empty() || prefix.len() == token.len() {
			return Err(Error::MalformedAccessToken);
		}

		Ok(prefix)
	}
}
