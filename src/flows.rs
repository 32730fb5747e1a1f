//! High-level link flow orchestrators powered by the broker.

pub mod coordinator;
pub mod issue;

mod common;
mod exchange;

pub use coordinator::*;
pub use issue::*;

// self
use crate::{
	_prelude::*,
	http::ProviderHttpClient,
	link::OwnerId,
	provider::ProviderDescriptor,
	store::LinkStore,
};
#[cfg(feature = "reqwest")]
use crate::http::ReqwestHttpClient;

#[cfg(feature = "reqwest")]
/// Broker specialized for the crate's default reqwest transport stack.
pub type ReqwestLinkBroker = LinkBroker<ReqwestHttpClient>;

/// Coordinates link flows against a single provider descriptor.
///
/// The broker owns the HTTP client, record store, and provider descriptor so
/// individual flow implementations can focus on flow-specific logic (mode-aware
/// token issuance, public-token exchange, persistence). API credentials live
/// alongside the descriptor so they are injected consistently into every
/// provider request.
#[derive(Clone)]
pub struct LinkBroker<C>
where
	C: ?Sized + ProviderHttpClient,
{
	/// HTTP client used for every outbound provider request.
	pub http_client: Arc<C>,
	/// Record store implementation that persists exchanged links.
	pub store: Arc<dyn LinkStore>,
	/// Provider descriptor that defines endpoints and the active environment.
	pub descriptor: ProviderDescriptor,
	/// Provider API client identifier attached to every request.
	pub client_id: String,
	/// Optional provider API secret attached to every request.
	pub client_secret: Option<String>,
	/// Owner that exchanged records are attributed to.
	pub owner: OwnerId,
}
impl<C> LinkBroker<C>
where
	C: ?Sized + ProviderHttpClient,
{
	/// Creates a broker that reuses the caller-provided transport.
	pub fn with_http_client(
		store: Arc<dyn LinkStore>,
		descriptor: ProviderDescriptor,
		client_id: impl Into<String>,
		http_client: impl Into<Arc<C>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			store,
			descriptor,
			client_id: client_id.into(),
			client_secret: None,
			owner: OwnerId::default(),
		}
	}

	/// Sets or replaces the provider API secret.
	pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
		self.client_secret = Some(secret.into());

		self
	}

	/// Overrides the owner that exchanged records are attributed to.
	pub fn with_owner(mut self, owner: OwnerId) -> Self {
		self.owner = owner;

		self
	}
}
#[cfg(feature = "reqwest")]
impl LinkBroker<ReqwestHttpClient> {
	/// Creates a new broker for the provided descriptor and client identifier.
	///
	/// The broker provisions its own reqwest-backed transport so callers do not need
	/// to pass HTTP handles explicitly. Use [`LinkBroker::with_client_secret`] to
	/// attach the provider API secret when the environment requires one.
	pub fn new(
		store: Arc<dyn LinkStore>,
		descriptor: ProviderDescriptor,
		client_id: impl Into<String>,
	) -> Self {
		Self::with_http_client(store, descriptor, client_id, ReqwestHttpClient::default())
	}
}
impl<C> Debug for LinkBroker<C>
where
	C: ?Sized + ProviderHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LinkBroker")
			.field("descriptor", &self.descriptor)
			.field("client_id", &self.client_id)
			.field("client_secret_set", &self.client_secret.is_some())
			.field("owner", &self.owner)
			.finish()
	}
}
