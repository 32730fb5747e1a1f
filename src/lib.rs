//! Account-link lifecycle broker—issue short-lived link tokens, drive the widget handshake with
//! OAuth-redirect resumption, exchange public tokens for durable credentials, and persist the
//! resulting link records behind pluggable stores.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

#[cfg(test)] use link_broker as _;

pub mod error;
pub mod flows;
pub mod http;
pub mod link;
pub mod obs;
pub mod provider;
pub mod store;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		flows::{
			LinkBroker,
			coordinator::{LinkCoordinator, MemoryTokenCache, TokenCache},
		},
		http::ReqwestHttpClient,
		provider::ProviderDescriptor,
		store::{LinkStore, MemoryStore},
	};

	/// Broker type alias used by reqwest-backed integration tests.
	pub type ReqwestTestBroker = LinkBroker<ReqwestHttpClient>;

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Constructs a [`LinkBroker`] backed by an in-memory store and the reqwest transport used
	/// across integration tests.
	pub fn build_reqwest_test_broker(
		descriptor: ProviderDescriptor,
		client_id: &str,
		client_secret: &str,
	) -> (ReqwestTestBroker, Arc<MemoryStore>) {
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn LinkStore> = store_backend.clone();
		let http_client = test_reqwest_http_client();
		let broker = LinkBroker::with_http_client(store, descriptor, client_id, http_client)
			.with_client_secret(client_secret);

		(broker, store_backend)
	}

	/// Constructs a coordinator over a test broker together with its shared token cache.
	pub fn build_test_coordinator(
		broker: ReqwestTestBroker,
	) -> (LinkCoordinator<ReqwestHttpClient>, Arc<MemoryTokenCache>) {
		let cache_backend = Arc::new(MemoryTokenCache::default());
		let cache: Arc<dyn TokenCache> = cache_backend.clone();

		(LinkCoordinator::new(broker, cache), cache_backend)
	}
}

mod _prelude {
	pub use std::{
		collections::BTreeMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		hash::{Hash, Hasher},
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::OffsetDateTime;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use httpmock as _;
