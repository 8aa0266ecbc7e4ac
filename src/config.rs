//! Client configuration and provider endpoint definitions.
//!
//! [`ClientConfig`] is loaded once at startup (the client id comes from the `API_KEY`
//! environment variable) and is immutable thereafter. [`ProviderEndpoints`] defaults to
//! the marketplace's production hosts and is fully overridable, which is how the
//! integration tests point the handshake at a mock server.

// std
use std::{collections::BTreeSet, env};
// self
use crate::{_prelude::*, error::ConfigError};

/// Environment variable holding the OAuth client id (the provider calls it an API key).
pub const CLIENT_ID_ENV: &str = "API_KEY";

const DEFAULT_REDIRECT_URI: &str = "http://localhost:3003/oauth/redirect";
const DEFAULT_SCOPES: [&str; 4] = ["listings_r", "listings_w", "shops_r", "email_r"];

const AUTHORIZE_ENDPOINT: &str = "https://www.etsy.com/oauth/connect";
const TOKEN_ENDPOINT: &str = "https://api.etsy.com/v3/public/oauth/token";
const API_BASE: &str = "https://api.etsy.com/v3/application";
const OPEN_API_BASE: &str = "https://openapi.etsy.com/v3/application";

/// Errors emitted when validating scopes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ScopeValidationError {
	/// Empty scope entries are not allowed.
	#[error("Scope entries cannot be empty.")]
	Empty,
	/// Scopes cannot contain embedded whitespace characters.
	#[error("Scope contains whitespace: {scope}.")]
	ContainsWhitespace {
		/// The offending scope string.
		scope: String,
	},
}

/// Normalized set of OAuth scopes.
///
/// Scopes are deduplicated and sorted so equality stays stable regardless of the
/// order callers list them in; the authorize URL carries the space-joined form.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeSet(Vec<String>);
impl ScopeSet {
	/// Creates a normalized scope set from any iterator.
	pub fn new<I, S>(scopes: I) -> Result<Self, ScopeValidationError>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let mut normalized = BTreeSet::new();

		for scope in scopes {
			let scope = scope.into();

			if scope.is_empty() {
				return Err(ScopeValidationError::Empty);
			}
			if scope.chars().any(char::is_whitespace) {
				return Err(ScopeValidationError::ContainsWhitespace { scope });
			}

			normalized.insert(scope);
		}

		Ok(Self(normalized.into_iter().collect()))
	}

	/// Returns true if no scopes are defined.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Iterator over normalized scopes.
	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.0.iter().map(|s| s.as_str())
	}

	/// Returns the normalized string representation (space-delimited).
	pub fn normalized(&self) -> String {
		self.0.join(" ")
	}
}

/// Immutable OAuth client configuration consumed by the handshake.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
	/// OAuth 2.0 client identifier; doubles as the provider's `x-api-key` header value.
	pub client_id: String,
	/// Redirect URI registered with the provider for this client.
	pub redirect_uri: Url,
	/// Scopes requested during authorization.
	pub scopes: ScopeSet,
}
impl ClientConfig {
	/// Creates a validated configuration.
	pub fn new(
		client_id: impl Into<String>,
		redirect_uri: Url,
		scopes: ScopeSet,
	) -> Result<Self, ConfigError> {
		let client_id = client_id.into();

		if client_id.trim().is_empty() {
			return Err(ConfigError::EmptyClientId);
		}

		Ok(Self { client_id, redirect_uri, scopes })
	}

	/// Loads the configuration from the environment at startup.
	///
	/// Reads the client id from [`CLIENT_ID_ENV`]; absence is a startup-fatal
	/// [`ConfigError::MissingClientId`], never a runtime error. The redirect URI and
	/// scope set default to the demo registration and can be replaced afterwards.
	pub fn from_env() -> Result<Self, ConfigError> {
		let client_id = env::var(CLIENT_ID_ENV)
			.map_err(|_| ConfigError::MissingClientId(CLIENT_ID_ENV))?;
		let redirect_uri = Url::parse(DEFAULT_REDIRECT_URI)
			.map_err(|source| ConfigError::InvalidRedirect { source })?;
		let scopes = ScopeSet::new(DEFAULT_SCOPES)?;

		Self::new(client_id, redirect_uri, scopes)
	}

	/// Replaces the redirect URI.
	pub fn with_redirect_uri(mut self, redirect_uri: Url) -> Self {
		self.redirect_uri = redirect_uri;

		self
	}

	/// Replaces the requested scope set.
	pub fn with_scopes(mut self, scopes: ScopeSet) -> Self {
		self.scopes = scopes;

		self
	}
}

/// Endpoint set for one provider deployment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderEndpoints {
	/// Authorization endpoint the end-user's browser is sent to.
	pub authorize: Url,
	/// Token endpoint used for the code exchange.
	pub token: Url,
	/// Base URL for keyed application API calls (`users/{user_id}` lives here).
	pub api_base: Url,
	/// Base URL for the open-API host (`users/me` lives here).
	pub open_api_base: Url,
}
impl ProviderEndpoints {
	/// Production endpoints for the marketplace's v3 API.
	pub fn marketplace() -> Result<Self, ConfigError> {
		Ok(Self {
			authorize: parse_endpoint("authorize", AUTHORIZE_ENDPOINT)?,
			token: parse_endpoint("token", TOKEN_ENDPOINT)?,
			api_base: parse_endpoint("api base", API_BASE)?,
			open_api_base: parse_endpoint("open-API base", OPEN_API_BASE)?,
		})
	}

	/// Resolves a path relative to [`api_base`](Self::api_base).
	pub(crate) fn api_path(&self, path: &str) -> Result<Url, ConfigError> {
		join_endpoint("api base", &self.api_base, path)
	}

	/// Resolves a path relative to [`open_api_base`](Self::open_api_base).
	pub(crate) fn open_api_path(&self, path: &str) -> Result<Url, ConfigError> {
		join_endpoint("open-API base", &self.open_api_base, path)
	}
}

fn parse_endpoint(endpoint: &'static str, raw: &str) -> Result<Url, ConfigError> {
	Url::parse(raw).map_err(|source| ConfigError::InvalidEndpoint { endpoint, source })
}

fn join_endpoint(endpoint: &'static str, base: &Url, path: &str) -> Result<Url, ConfigError> {
	// `Url::join` treats a base without a trailing slash as a file and would drop its
	// last segment, so the path is appended segment-wise instead.
	let mut url = base.clone();

	{
		let mut segments = url
			.path_segments_mut()
			.map_err(|()| ConfigError::InvalidEndpoint {
				endpoint,
				source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
			})?;

		segments.pop_if_empty();

		for segment in path.split('/') {
			segments.push(segment);
		}
	}

	Ok(url)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn scope_set_normalizes_and_validates() {
		let scopes = ScopeSet::new(["listings_w", "listings_r", "listings_r"])
			.expect("Scope fixture should be valid.");

		assert_eq!(scopes.normalized(), "listings_r listings_w");
		assert!(ScopeSet::new([""]).is_err());
		assert!(matches!(
			ScopeSet::new(["a b"]),
			Err(ScopeValidationError::ContainsWhitespace { .. })
		));
	}

	#[test]
	fn client_config_rejects_empty_client_id() {
		let redirect =
			Url::parse(DEFAULT_REDIRECT_URI).expect("Default redirect URI should parse.");
		let err = ClientConfig::new("  ", redirect, ScopeSet::default())
			.expect_err("Empty client id must be rejected.");

		assert!(matches!(err, ConfigError::EmptyClientId));
	}

	#[test]
	fn from_env_requires_the_client_id_variable() {
		// Serialize access to the process environment across tests in this module.
		temp_env_var(None, || {
			let err = ClientConfig::from_env().expect_err("Missing API_KEY must be fatal.");

			assert!(matches!(err, ConfigError::MissingClientId(CLIENT_ID_ENV)));
		});
		temp_env_var(Some("abc"), || {
			let config = ClientConfig::from_env().expect("Config should load once API_KEY is set.");

			assert_eq!(config.client_id, "abc");
			assert_eq!(config.redirect_uri.as_str(), DEFAULT_REDIRECT_URI);
			assert!(config.scopes.iter().any(|s| s == "listings_r"));
		});
	}

	#[test]
	fn endpoint_paths_preserve_base_segments() {
		let endpoints = ProviderEndpoints::marketplace()
			.expect("Built-in marketplace endpoints should parse.");
		let user = endpoints.api_path("users/42").expect("User path should resolve.");
		let me = endpoints.open_api_path("users/me").expect("Me path should resolve.");

		assert_eq!(user.as_str(), "https://api.etsy.com/v3/application/users/42");
		assert_eq!(me.as_str(), "https://openapi.etsy.com/v3/application/users/me");
	}

	fn temp_env_var(value: Option<&str>, f: impl FnOnce()) {
		use std::sync::{Mutex, MutexGuard, OnceLock};

		static LOCK: OnceLock<Mutex<()>> = OnceLock::new();

		let _guard: MutexGuard<()> =
			LOCK.get_or_init(Mutex::default).lock().unwrap_or_else(|poison| poison.into_inner());
		let previous = env::var(CLIENT_ID_ENV).ok();

		match value {
			Some(v) => unsafe { env::set_var(CLIENT_ID_ENV, v) },
			None => unsafe { env::remove_var(CLIENT_ID_ENV) },
		}

		f();

		match previous {
			Some(v) => unsafe { env::set_var(CLIENT_ID_ENV, v) },
			None => unsafe { env::remove_var(CLIENT_ID_ENV) },
		}
	}
}
