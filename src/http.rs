//! Transport primitives for the provider's token and application endpoints.
//!
//! [`ApiTransport`] is the crate's only seam onto an HTTP stack: the handshake builds
//! [`ApiRequest`] values and interprets [`ApiResponse`] values, while connection and
//! request timeouts remain the responsibility of whatever client the caller injects.
//! Tests substitute the trait with call-counting stubs; production callers use
//! [`ReqwestTransport`].

// std
use std::ops::Deref;
// crates.io
use futures::future::BoxFuture;
use reqwest::Client as ReqwestClient;
// self
use crate::{_prelude::*, error::TransportError};

/// HTTP methods the handshake issues.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
	/// `GET` request.
	Get,
	/// `POST` request.
	Post,
}

/// Outbound request handed to an [`ApiTransport`].
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Fully-resolved request URL.
	pub url: Url,
	/// Header name/value pairs; names are lowercase static strings.
	pub headers: Vec<(&'static str, String)>,
	/// Optional request body (already serialized).
	pub body: Option<Vec<u8>>,
}
impl ApiRequest {
	/// Creates a body-less `GET` request.
	pub fn get(url: Url) -> Self {
		Self { method: Method::Get, url, headers: Vec::new(), body: None }
	}

	/// Creates a `POST` request carrying the provided body.
	pub fn post(url: Url, body: Vec<u8>) -> Self {
		Self { method: Method::Post, url, headers: Vec::new(), body: Some(body) }
	}

	/// Appends a header pair.
	pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
		self.headers.push((name, value.into()));

		self
	}
}

/// Response surfaced back to the handshake.
#[derive(Clone, Debug)]
pub struct ApiResponse {
	/// HTTP status code.
	pub status: u16,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl ApiResponse {
	/// Returns true for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Lossy UTF-8 view of the body for diagnostics.
	pub fn body_text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}
}

/// Abstraction over HTTP transports capable of executing provider calls.
///
/// Implementations must be `Send + Sync + 'static` so they can sit behind `Arc<T>`
/// and be shared across concurrent callback handlers, and the returned futures must
/// be `Send` so callers can box or spawn them freely.
pub trait ApiTransport
where
	Self: 'static + Send + Sync,
{
	/// Executes one request and resolves with the raw response.
	fn execute(&self, request: ApiRequest) -> BoxFuture<'_, Result<ApiResponse, TransportError>>;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Token requests should not follow redirects, matching OAuth 2.0 guidance that token
/// endpoints return results directly; configure any custom [`ReqwestClient`]
/// accordingly before wrapping it.
#[derive(Clone, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
impl ReqwestTransport {
	/// Wraps an existing [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl ApiTransport for ReqwestTransport {
	fn execute(&self, request: ApiRequest) -> BoxFuture<'_, Result<ApiResponse, TransportError>> {
		let client = self.0.clone();

		Box::pin(async move {
			let ApiRequest { method, url, headers, body } = request;
			let mut builder = match method {
				Method::Get => client.get(url),
				Method::Post => client.post(url),
			};

			for (name, value) in headers {
				builder = builder.header(name, value);
			}
			if let Some(body) = body {
				builder = builder.body(body);
			}

			let response = builder.send().await.map_err(TransportError::from)?;
			let status = response.status().as_u16();
			let body = response.bytes().await.map_err(TransportError::from)?.to_vec();

			Ok(ApiResponse { status, body })
		})
	}
}
