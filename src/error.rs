//! Handshake-level error types shared across configuration, flows, and transport.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical handshake error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem; fatal at startup.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// The redirect's `state` parameter does not match the pending attempt.
	///
	/// Raised before any outbound request is made; the authorization attempt must be
	/// treated as forged and abandoned.
	#[error("Authorization state mismatch on the provider redirect.")]
	StateMismatch,
	/// Provider rejected the code/verifier pair at the token endpoint.
	#[error("Token exchange was rejected with HTTP {status}: {body}.")]
	TokenExchangeFailed {
		/// HTTP status returned by the token endpoint.
		status: u16,
		/// Raw response body for diagnostics.
		body: String,
	},
	/// The `users/{user_id}` lookup failed after a valid token was obtained.
	#[error("User lookup failed with HTTP {status}: {body}.")]
	UserLookupFailed {
		/// HTTP status returned by the users endpoint.
		status: u16,
		/// Raw response body for diagnostics.
		body: String,
	},
	/// The `users/me` shop lookup failed after a valid token was obtained.
	#[error("Shop lookup failed with HTTP {status}: {body}.")]
	ShopLookupFailed {
		/// HTTP status returned by the open-API endpoint.
		status: u16,
		/// Raw response body for diagnostics.
		body: String,
	},
	/// Access token does not carry the provider's `<user_id>.<secret>` prefix shape.
	#[error("Access token is missing the provider's numeric user-id prefix.")]
	MalformedAccessToken,
	/// A provider endpoint returned a 2xx response whose JSON body could not be parsed.
	#[error("The {endpoint} endpoint returned malformed JSON.")]
	ResponseParse {
		/// Which endpoint produced the body.
		endpoint: &'static str,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}

/// Configuration and validation failures raised at startup.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// The `API_KEY` environment variable (the OAuth client id) is not set.
	#[error("Missing client id; set the {0} environment variable.")]
	MissingClientId(&'static str),
	/// Client id was supplied but is empty or whitespace.
	#[error("Client id cannot be empty.")]
	EmptyClientId,
	/// Redirect URI cannot be parsed.
	#[error("Redirect URI is invalid.")]
	InvalidRedirect {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A provider endpoint URL cannot be parsed.
	#[error("The {endpoint} endpoint URL is invalid.")]
	InvalidEndpoint {
		/// Which endpoint failed to parse.
		endpoint: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Requested scopes cannot be normalized.
	#[error("Requested scopes are invalid.")]
	InvalidScope(#[from] crate::config::ScopeValidationError),
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the provider.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the provider.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
impl From<reqwest::Error> for TransportError {
	fn from(e: reqwest::Error) -> Self {
		Self::network(e)
	}
}
