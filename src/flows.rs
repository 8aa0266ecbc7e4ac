//! Handshake orchestration: authorize-URL issuance, code exchange, profile fetch.

// crates.io
use futures::future;
use serde_json::json;
// self
use crate::{
	_prelude::*,
	config::{ClientConfig, ProviderEndpoints},
	error::ConfigError,
	http::{ApiRequest, ApiTransport, ReqwestTransport},
	session::{CallbackQuery, PendingAuthAttempt},
	token::TokenPair,
};

/// Profile data derived from the two downstream lookups.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProfileResult {
	/// Seller's first name from `users/{user_id}`.
	pub first_name: String,
	/// Seller's shop id from `users/me`.
	pub shop_id: u64,
}

/// Everything the presentation layer needs after a successful callback.
///
/// Handed to the caller by value; tokens never transit a URL query string between
/// handlers.
#[derive(Clone, Debug)]
pub struct SessionOutcome {
	/// Enriched profile data.
	pub profile: ProfileResult,
	/// Access/refresh pair from the exchange.
	pub tokens: TokenPair,
}

#[derive(Deserialize)]
struct UserBody {
	first_name: String,
}

#[derive(Deserialize)]
struct MeBody {
	shop_id: u64,
}

/// Coordinates one Authorization Code + PKCE handshake against a provider deployment.
///
/// The handshake owns the transport, client configuration, and endpoint set so the
/// per-attempt values ([`PendingAuthAttempt`]) stay free of provider wiring. It is
/// cheap to clone and safe to share: nothing in it mutates after construction.
#[derive(Clone)]
pub struct Handshake<T = ReqwestTransport>
where
	T: ?Sized + ApiTransport,
{
	/// HTTP transport used for every outbound provider request.
	pub transport: Arc<T>,
	/// Immutable client configuration.
	pub config: ClientConfig,
	/// Provider endpoint set.
	pub endpoints: ProviderEndpoints,
}
impl Handshake<ReqwestTransport> {
	/// Creates a handshake against the marketplace's production endpoints with a
	/// default reqwest transport.
	pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
		Ok(Self::with_transport(config, ProviderEndpoints::marketplace()?, ReqwestTransport::default()))
	}
}
impl<T> Handshake<T>
where
	T: ?Sized + ApiTransport,
{
	/// Creates a handshake that reuses the caller-provided transport and endpoints.
	pub fn with_transport(
		config: ClientConfig,
		endpoints: ProviderEndpoints,
		transport: impl Into<Arc<T>>,
	) -> Self {
		Self { transport: transport.into(), config, endpoints }
	}

	/// Starts a new authorization attempt.
	///
	/// Generates the state token and PKCE pair and composes the authorize URL; no
	/// network call is made. Keep the returned attempt server-side and pass it back
	/// to [`exchange`](Self::exchange) when the provider redirects.
	pub fn start_authorization(&self) -> PendingAuthAttempt {
		let attempt = PendingAuthAttempt::new(&self.endpoints, &self.config);

		tracing::debug!(state = %attempt.state, "Started authorization attempt.");

		attempt
	}

	/// Exchanges the redirect's authorization code for a token pair.
	///
	/// Validates the round-tripped `state` first and fails with
	/// [`Error::StateMismatch`] before any network call when it differs. The exchange
	/// consumes the attempt: an authorization code is single-use, and so is the
	/// verifier bound to it. No retries are attempted.
	pub async fn exchange(
		&self,
		attempt: PendingAuthAttempt,
		callback: &CallbackQuery,
	) -> Result<TokenPair> {
		if let Err(e) = attempt.validate_state(&callback.state) {
			tracing::warn!("Rejected callback with mismatched state.");

			return Err(e);
		}

		let body = json!({
			"grant_type": "authorization_code",
			"client_id": self.config.client_id,
			"redirect_uri": attempt.redirect_uri.as_str(),
			"code": callback.code,
			"code_verifier": attempt.verifier(),
		})
		.to_string()
		.into_bytes();
		let request = ApiRequest::post(self.endpoints.token.clone(), body)
			.header("content-type", "application/json");
		let response = self.transport.execute(request).await?;

		if !response.is_success() {
			tracing::warn!(status = response.status, "Token exchange was rejected.");

			return Err(Error::TokenExchangeFailed {
				status: response.status,
				body: response.body_text(),
			});
		}

		let pair = parse_body::<TokenPair>("token", &response.body)?;

		tracing::info!("Token exchange succeeded.");

		Ok(pair)
	}

	/// Fetches the seller profile backing the post-authorization landing page.
	///
	/// The user id comes from the access token's provider-specific prefix; the two
	/// lookups are independent and run concurrently. Either failure short-circuits
	/// the result—no partial profile is ever produced—with the user lookup taking
	/// precedence when both fail.
	pub async fn fetch_profile(&self, tokens: &TokenPair) -> Result<ProfileResult> {
		let user_id = tokens.user_id()?;
		let user_url = self.endpoints.api_path(&format!("users/{user_id}"))?;
		let me_url = self.endpoints.open_api_path("users/me")?;
		let (user_response, me_response) = future::join(
			self.transport.execute(self.authed(ApiRequest::get(user_url), tokens)),
			self.transport.execute(self.authed(ApiRequest::get(me_url), tokens)),
		)
		.await;
		let user_response = user_response?;

		if !user_response.is_success() {
			tracing::warn!(status = user_response.status, "User lookup failed.");

			return Err(Error::UserLookupFailed {
				status: user_response.status,
				body: user_response.body_text(),
			});
		}

		let me_response = me_response?;

		if !me_response.is_success() {
			tracing::warn!(status = me_response.status, "Shop lookup failed.");

			return Err(Error::ShopLookupFailed {
				status: me_response.status,
				body: me_response.body_text(),
			});
		}

		let user = parse_body::<UserBody>("users", &user_response.body)?;
		let me = parse_body::<MeBody>("open-API users/me", &me_response.body)?;

		Ok(ProfileResult { first_name: user.first_name, shop_id: me.shop_id })
	}

	/// Runs the full callback pipeline: exchange, then profile fetch.
	///
	/// Returns the [`SessionOutcome`] the presentation layer renders. Any stage
	/// failure aborts the pipeline; nothing is rendered from a partial result.
	pub async fn run_callback(
		&self,
		attempt: PendingAuthAttempt,
		callback: &CallbackQuery,
	) -> Result<SessionOutcome> {
		let tokens = self.exchange(attempt, callback).await?;
		let profile = self.fetch_profile(&tokens).await?;

		Ok(SessionOutcome { profile, tokens })
	}

	fn authed(&self, request: ApiRequest, tokens: &TokenPair) -> ApiRequest {
		request
			.header("x-api-key", self.config.client_id.clone())
			.header("authorization", format!("Bearer {}", tokens.access_token.expose()))
			.header("accept", "application/json")
	}
}
impl<T> Debug for Handshake<T>
where
	T: ?Sized + ApiTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Handshake")
			.field("config", &self.config)
			.field("endpoints", &self.endpoints)
			.finish()
	}
}

fn parse_body<'a, D>(endpoint: &'static str, body: &'a [u8]) -> Result<D>
where
	D: Deserialize<'a>,
{
	let mut deserializer = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| Error::ResponseParse { endpoint, source })
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::Mutex;
	// crates.io
	use futures::future::BoxFuture;
	// self
	use super::*;
	use crate::{
		config::ScopeSet,
		error::TransportError,
		http::{ApiResponse, Method},
		token::TokenSecret,
	};

	/// Call-counting transport that replies per URL path.
	#[derive(Default)]
	struct StubTransport {
		requests: Mutex<Vec<ApiRequest>>,
		responses: Vec<(&'static str, ApiResponse)>,
	}
	impl StubTransport {
		fn respond(mut self, path_fragment: &'static str, status: u16, body: &str) -> Self {
			self.responses.push((path_fragment, ApiResponse {
				status,
				body: body.as_bytes().to_vec(),
			}));

			self
		}

		fn calls(&self) -> usize {
			self.requests.lock().expect("Stub lock should not be poisoned.").len()
		}

		fn recorded(&self) -> Vec<ApiRequest> {
			self.requests.lock().expect("Stub lock should not be poisoned.").clone()
		}
	}
	impl ApiTransport for StubTransport {
		fn execute(
			&self,
			request: ApiRequest,
		) -> BoxFuture<'_, Result<ApiResponse, TransportError>> {
			let response = self
				.responses
				.iter()
				.find(|(fragment, _)| request.url.path().contains(fragment))
				.map(|(_, response)| response.clone())
				.unwrap_or_else(|| ApiResponse { status: 500, body: b"unexpected request".to_vec() });

			self.requests.lock().expect("Stub lock should not be poisoned.").push(request);

			Box::pin(async move { Ok(response) })
		}
	}

	fn handshake(stub: StubTransport) -> Handshake<StubTransport> {
		let config = ClientConfig::new(
			"abc",
			Url::parse("http://localhost:3003/oauth/redirect")
				.expect("Redirect fixture should parse."),
			ScopeSet::new(["listings_r"]).expect("Scope fixture should be valid."),
		)
		.expect("Config fixture should be valid.");
		let endpoints = ProviderEndpoints::marketplace()
			.expect("Built-in marketplace endpoints should parse.");

		Handshake::with_transport(config, endpoints, stub)
	}

	fn tokens(access: &str) -> TokenPair {
		TokenPair {
			access_token: TokenSecret::new(access),
			refresh_token: TokenSecret::new("R.456"),
		}
	}

	#[tokio::test]
	async fn forged_state_fails_without_any_network_call() {
		let handshake = handshake(StubTransport::default());
		let attempt = handshake.start_authorization();
		let callback = CallbackQuery { code: "code-1".into(), state: "forged".into() };
		let err = handshake
			.exchange(attempt, &callback)
			.await
			.expect_err("Forged state must be rejected.");

		assert!(matches!(err, Error::StateMismatch));
		assert_eq!(handshake.transport.calls(), 0, "State mismatch must precede any request.");
	}

	#[tokio::test]
	async fn exchange_posts_the_verifier_and_returns_the_pair() {
		let stub = StubTransport::default().respond(
			"/oauth/token",
			200,
			"{\"access_token\":\"U.123.abc\",\"refresh_token\":\"R.456\"}",
		);
		let handshake = handshake(stub);
		let attempt = handshake.start_authorization();
		let callback = CallbackQuery { code: "code-1".into(), state: attempt.state.clone() };
		let pair = handshake.exchange(attempt, &callback).await.expect("Exchange should succeed.");

		assert_eq!(pair.access_token.expose(), "U.123.abc");
		assert_eq!(pair.refresh_token.expose(), "R.456");

		let recorded = handshake.transport.recorded();

		assert_eq!(recorded.len(), 1);
		assert_eq!(recorded[0].method, Method::Post);

		let body: serde_json::Value = serde_json::from_slice(
			recorded[0].body.as_deref().expect("Exchange must carry a JSON body."),
		)
		.expect("Exchange body should be valid JSON.");

		assert_eq!(body["grant_type"], "authorization_code");
		assert_eq!(body["client_id"], "abc");
		assert_eq!(body["code"], "code-1");
		assert_eq!(body["redirect_uri"], "http://localhost:3003/oauth/redirect");
		assert!(
			body["code_verifier"].as_str().map(|v| v.len() == 43).unwrap_or(false),
			"Verifier must be the 43-character base64url form."
		);
	}

	#[tokio::test]
	async fn exchange_surfaces_provider_rejections() {
		let stub = StubTransport::default().respond("/oauth/token", 400, "bad code");
		let handshake = handshake(stub);
		let attempt = handshake.start_authorization();
		let callback = CallbackQuery { code: "stale".into(), state: attempt.state.clone() };
		let err = handshake
			.exchange(attempt, &callback)
			.await
			.expect_err("Provider rejection must surface.");

		assert!(matches!(
			err,
			Error::TokenExchangeFailed { status: 400, ref body } if body == "bad code"
		));
	}

	#[tokio::test]
	async fn profile_fetch_targets_the_token_prefix_user() {
		let stub = StubTransport::default()
			.respond("/users/42", 200, "{\"first_name\":\"Ada\"}")
			.respond("/users/me", 200, "{\"shop_id\":77}");
		let handshake = handshake(stub);
		let profile = handshake
			.fetch_profile(&tokens("42.abcdef"))
			.await
			.expect("Profile fetch should succeed.");

		assert_eq!(profile, ProfileResult { first_name: "Ada".into(), shop_id: 77 });

		let recorded = handshake.transport.recorded();

		assert_eq!(recorded.len(), 2);
		assert!(recorded.iter().any(|r| r.url.path().ends_with("/users/42")));
		assert!(recorded.iter().any(|r| r.url.path().ends_with("/users/me")));

		for request in &recorded {
			assert_eq!(request.method, Method::Get);
			assert!(request.headers.contains(&("x-api-key", "abc".into())));
			assert!(request.headers.contains(&("authorization", "Bearer 42.abcdef".into())));
			assert!(request.headers.contains(&("accept", "application/json".into())));
		}
	}

	#[tokio::test]
	async fn user_lookup_failure_short_circuits() {
		let stub = StubTransport::default()
			.respond("/users/42", 404, "{\"error\":\"not found\"}")
			.respond("/users/me", 200, "{\"shop_id\":77}");
		let handshake = handshake(stub);
		let err = handshake
			.fetch_profile(&tokens("42.abcdef"))
			.await
			.expect_err("User lookup failure must short-circuit.");

		assert!(matches!(err, Error::UserLookupFailed { status: 404, .. }));
	}

	#[tokio::test]
	async fn user_lookup_failure_takes_precedence_over_shop_failure() {
		let stub = StubTransport::default()
			.respond("/users/42", 500, "user down")
			.respond("/users/me", 503, "me down");
		let handshake = handshake(stub);
		let err = handshake
			.fetch_profile(&tokens("42.abcdef"))
			.await
			.expect_err("Both lookups failing must surface the user lookup error.");

		assert!(matches!(err, Error::UserLookupFailed { status: 500, .. }));
	}

	#[tokio::test]
	async fn malformed_token_fails_before_any_lookup() {
		let handshake = handshake(StubTransport::default());
		let err = handshake
			.fetch_profile(&tokens("no-prefix"))
			.await
			.expect_err("Token without the provider prefix must be rejected.");

		assert!(matches!(err, Error::MalformedAccessToken));
		assert_eq!(handshake.transport.calls(), 0);
	}
}
