//! Client-side session state, navigation context, and the token cache boundary.

// self
use crate::{
	_prelude::*,
	flows::issue::{LinkMode, LinkToken},
	link::ProductSet,
};

/// Storage key under which cache implementations persist the active link token.
///
/// Keyed backends (browser local storage, a session table) must use this exact key so a
/// session survives full page reloads across coordinator instances.
pub const TOKEN_CACHE_KEY: &str = "link_token";

/// Query parameter that marks a navigation as an OAuth redirect return.
pub const REDIRECT_MARKER_PARAM: &str = "oauth_state_id";

/// Client-side cache that keeps the active link token across page reloads.
///
/// Implementations are synchronous; the cache models browser local storage, not a
/// network hop. Failures are modeled as absent values rather than errors.
pub trait TokenCache
where
	Self: Send + Sync,
{
	/// Stores the active link token, replacing any previous value.
	fn store(&self, token: &LinkToken);

	/// Loads the cached link token, if any.
	fn load(&self) -> Option<LinkToken>;

	/// Removes the cached link token.
	fn clear(&self);
}

/// In-process [`TokenCache`] for tests and non-browser hosts.
#[derive(Debug, Default)]
pub struct MemoryTokenCache(Mutex<Option<LinkToken>>);
impl TokenCache for MemoryTokenCache {
	fn store(&self, token: &LinkToken) {
		*self.0.lock() = Some(token.clone());
	}

	fn load(&self) -> Option<LinkToken> {
		self.0.lock().clone()
	}

	fn clear(&self) {
		*self.0.lock() = None;
	}
}

/// Snapshot of the navigation that (re)entered the host application.
///
/// Built from the current location so the coordinator can decide whether the navigation
/// is an OAuth redirect return without touching any global state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavigationContext(Url);
impl NavigationContext {
	/// Wraps the current location URL.
	pub fn new(location: Url) -> Self {
		Self(location)
	}

	/// Returns the full location URL, handed to the widget as the received redirect URI.
	pub fn location(&self) -> &Url {
		&self.0
	}

	/// Returns true when the location carries the OAuth redirect marker.
	pub fn has_redirect_marker(&self) -> bool {
		self.0.query_pairs().any(|(key, _)| key == REDIRECT_MARKER_PARAM)
	}

	/// Returns the provider-assigned OAuth state identifier, when present.
	pub fn oauth_state_id(&self) -> Option<String> {
		self.0
			.query_pairs()
			.find(|(key, _)| key == REDIRECT_MARKER_PARAM)
			.map(|(_, value)| value.into_owned())
	}
}

/// Active widget session tracked between token issuance and the handshake outcome.
#[derive(Clone, Debug)]
pub struct LinkSession {
	/// Confirmed product selection; `None` for resumed sessions, where the original
	/// selection did not survive the page reload.
	pub products: Option<ProductSet>,
	/// Issuance mode governing how the handshake completes.
	pub mode: LinkMode,
	/// Token initializing the widget.
	pub token: LinkToken,
	/// Instant the session became ready for the widget.
	pub issued_at: OffsetDateTime,
	/// True when the session was rebuilt from the cache after an OAuth redirect.
	pub is_oauth_resumption: bool,
	/// True until the host opens the widget; cleared through
	/// [`LinkCoordinator::mark_widget_opened`](crate::flows::LinkCoordinator::mark_widget_opened).
	pub pending_auto_open: bool,
}
impl LinkSession {
	/// Builds a fresh session from a confirmed product selection.
	pub(crate) fn fresh(products: ProductSet, mode: LinkMode, token: LinkToken) -> Self {
		Self {
			products: Some(products),
			mode,
			token,
			issued_at: OffsetDateTime::now_utc(),
			is_oauth_resumption: false,
			pending_auto_open: true,
		}
	}

	/// Rebuilds a session from the cached token after an OAuth redirect return.
	pub(crate) fn resumed(token: LinkToken) -> Self {
		Self {
			products: None,
			mode: LinkMode::Standard,
			token,
			issued_at: OffsetDateTime::now_utc(),
			is_oauth_resumption: true,
			pending_auto_open: true,
		}
	}
}
