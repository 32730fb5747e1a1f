//! Transport primitives for provider API calls.
//!
//! The module exposes [`ProviderHttpClient`] so downstream crates can integrate custom
//! HTTP clients. Implementations return the raw status and body for every completed
//! HTTP round trip; only failures below the HTTP layer (DNS, TCP, TLS, IO) surface as
//! [`TransportError`](crate::error::TransportError). Classifying non-2xx provider
//! responses is the flow layer's job, so rejection payloads reach callers verbatim.

// std
use std::ops::Deref;
// self
use crate::{_prelude::*, error::TransportError};

/// Boxed future returned by [`ProviderHttpClient`] methods.
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<ProviderResponse, TransportError>> + 'a + Send>>;

/// Raw provider response surfaced to the flow layer.
#[derive(Clone, Debug)]
pub struct ProviderResponse {
	/// HTTP status code.
	pub status: u16,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl ProviderResponse {
	/// Returns true for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// Abstraction over HTTP transports capable of executing provider API calls.
///
/// The trait is the broker's only dependency on an HTTP stack. Implementations must be
/// `Send + Sync + 'static` so they can be shared behind `Arc` across broker instances,
/// and the returned futures must be `Send` so flow futures stay `Send` end to end.
pub trait ProviderHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Executes a JSON POST against the provided endpoint.
	fn post_json<'a>(&'a self, url: &'a Url, body: &'a serde_json::Value) -> TransportFuture<'a>;

	/// Executes a form-encoded POST against the provided endpoint.
	fn post_form<'a>(&'a self, url: &'a Url, form: &'a [(String, String)]) -> TransportFuture<'a>;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
/// Provider calls never follow redirects; the exchange and token endpoints return their
/// results directly. Configure any custom [`ReqwestClient`] accordingly.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	async fn execute(request: reqwest::RequestBuilder) -> Result<ProviderResponse, TransportError> {
		let response = request.send().await?;
		let status = response.status().as_u16();
		let body = response.bytes().await?.to_vec();

		Ok(ProviderResponse { status, body })
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl ProviderHttpClient for ReqwestHttpClient {
	fn post_json<'a>(&'a self, url: &'a Url, body: &'a serde_json::Value) -> TransportFuture<'a> {
		let request = self.0.post(url.clone()).json(body);

		Box::pin(Self::execute(request))
	}

	fn post_form<'a>(&'a self, url: &'a Url, form: &'a [(String, String)]) -> TransportFuture<'a> {
		let request = self.0.post(url.clone()).form(form);

		Box::pin(Self::execute(request))
	}
}
