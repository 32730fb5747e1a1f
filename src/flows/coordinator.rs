//! Client-side lifecycle coordination for the account-link widget handshake.
//!
//! [`LinkCoordinator`] drives one linking attempt as an explicit state machine: confirm
//! a product selection, issue the widget token through the broker, hand the token to the
//! widget, and finish with a public-token exchange when the mode requires one. The
//! coordinator owns no timers and no global state; OAuth-redirect returns are resumed
//! from an injected [`NavigationContext`] plus the injected [`TokenCache`], so a full
//! page reload can rebuild the session without a second token issuance.

pub mod session;

pub use session::*;

// self
use crate::{
	_prelude::*,
	error::SessionError,
	flows::{LinkBroker, issue::LinkMode},
	http::ProviderHttpClient,
	link::{LinkRecord, ProductSet},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Phases of one linking attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LinkPhase {
	/// No attempt in progress.
	Idle,
	/// Waiting for the user to confirm a product selection.
	ProductSelection,
	/// Token issuance is in flight.
	TokenPending,
	/// A session holds a token and the widget may open.
	WidgetReady,
	/// Public-token exchange is in flight.
	Exchanging,
	/// The attempt completed; see [`LinkCoordinator::linked_record`].
	Linked,
}
impl LinkPhase {
	/// Returns a stable label suitable for errors, spans, and metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Idle => "idle",
			Self::ProductSelection => "product_selection",
			Self::TokenPending => "token_pending",
			Self::WidgetReady => "widget_ready",
			Self::Exchanging => "exchanging",
			Self::Linked => "linked",
		}
	}
}
impl Display for LinkPhase {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// State machine driving one linking attempt against a [`LinkBroker`].
pub struct LinkCoordinator<C>
where
	C: ?Sized + ProviderHttpClient,
{
	broker: LinkBroker<C>,
	cache: Arc<dyn TokenCache>,
	phase: LinkPhase,
	session: Option<LinkSession>,
	linked: Option<LinkRecord>,
}
impl<C> LinkCoordinator<C>
where
	C: ?Sized + ProviderHttpClient,
{
	/// Creates an idle coordinator over the provided broker and token cache.
	pub fn new(broker: LinkBroker<C>, cache: Arc<dyn TokenCache>) -> Self {
		Self { broker, cache, phase: LinkPhase::Idle, session: None, linked: None }
	}

	/// Returns the current phase.
	pub fn phase(&self) -> LinkPhase {
		self.phase
	}

	/// Returns the active session, when a token has been issued or resumed.
	pub fn session(&self) -> Option<&LinkSession> {
		self.session.as_ref()
	}

	/// Returns the record persisted by a completed standard-mode attempt.
	pub fn linked_record(&self) -> Option<&LinkRecord> {
		self.linked.as_ref()
	}

	/// Returns the broker the coordinator drives.
	pub fn broker(&self) -> &LinkBroker<C> {
		&self.broker
	}

	/// Starts a new attempt, moving to product selection.
	///
	/// Always re-enters product selection, discarding any in-flight session or completed
	/// attempt; the cached token is retained for redirects already in flight.
	pub fn launch(&mut self) {
		self.session = None;
		self.linked = None;
		self.phase = LinkPhase::ProductSelection;
	}

	/// Confirms the product selection and issues the widget token.
	///
	/// The issued token is written to the cache before the phase advances, so an OAuth
	/// redirect leaving the page right after the widget opens can still resume. Returns
	/// the inferred mode so hosts know whether an exchange will follow.
	pub async fn confirm_products(&mut self, products: ProductSet) -> Result<LinkMode> {
		const KIND: FlowKind = FlowKind::Coordinator;

		let span = FlowSpan::new(KIND, "confirm_products");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				self.ensure_phase(LinkPhase::ProductSelection)?;

				if products.is_empty() {
					self.reset_session();

					return Err(SessionError::EmptyProductSelection.into());
				}

				self.phase = LinkPhase::TokenPending;

				let mode = LinkMode::infer(&products);

				match self.broker.issue_link_token(&products, mode).await {
					Ok(token) => {
						self.cache.store(&token);

						self.session = Some(LinkSession::fresh(products, mode, token));
						self.phase = LinkPhase::WidgetReady;

						Ok(mode)
					},
					Err(e) => {
						self.reset_session();
						self.cache.clear();

						Err(e)
					},
				}
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	/// Resumes a session from an OAuth redirect return.
	///
	/// Returns `Ok(false)` when the navigation carries no redirect marker, leaving the
	/// coordinator untouched. With a marker present, the cached token rebuilds the
	/// session without a second issuance; a marker without a cached token fails with
	/// [`SessionError::MissingCachedToken`].
	pub fn resume(&mut self, navigation: &NavigationContext) -> Result<bool> {
		if !navigation.has_redirect_marker() {
			return Ok(false);
		}

		let Some(token) = self.cache.load() else {
			self.reset_session();

			return Err(SessionError::MissingCachedToken.into());
		};

		self.session = Some(LinkSession::resumed(token));
		self.linked = None;
		self.phase = LinkPhase::WidgetReady;

		Ok(true)
	}

	/// Completes the handshake after the widget reports success.
	///
	/// Standard-mode sessions require the widget's public token and finish with an
	/// exchange; the attempt reaches `Linked` only after the store acknowledges the
	/// persisted record, which is returned. Payment-initiation and user-token sessions
	/// finish immediately and return `None`.
	pub async fn widget_success(
		&mut self,
		public_token: Option<&str>,
	) -> Result<Option<LinkRecord>> {
		const KIND: FlowKind = FlowKind::Coordinator;

		let span = FlowSpan::new(KIND, "widget_success");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				self.ensure_phase(LinkPhase::WidgetReady)?;

				let Some(session) = self.session.take() else {
					return Err(self.unexpected_phase(LinkPhase::WidgetReady).into());
				};

				if !session.mode.requires_exchange() {
					self.phase = LinkPhase::Linked;

					return Ok(None);
				}

				let Some(public_token) = public_token else {
					self.reset_session();

					return Err(SessionError::MissingPublicToken.into());
				};

				self.phase = LinkPhase::Exchanging;

				match self
					.broker
					.exchange_public_token(public_token, session.products.as_ref())
					.await
				{
					Ok(record) => {
						self.linked = Some(record.clone());
						self.phase = LinkPhase::Linked;

						Ok(Some(record))
					},
					Err(e) => {
						self.reset_session();
						self.cache.clear();

						Err(e)
					},
				}
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	/// Acknowledges that the host opened the widget, clearing the auto-open flag.
	pub fn mark_widget_opened(&mut self) -> Result<()> {
		self.ensure_phase(LinkPhase::WidgetReady)?;

		if let Some(session) = self.session.as_mut() {
			session.pending_auto_open = false;
		}

		Ok(())
	}

	/// Abandons the attempt after the widget reports an exit.
	///
	/// The cached token is retained so an OAuth redirect already in flight can still
	/// resume the session.
	pub fn widget_exit(&mut self) -> Result<()> {
		self.ensure_phase(LinkPhase::WidgetReady)?;
		self.reset_session();

		Ok(())
	}

	fn ensure_phase(&mut self, expected: LinkPhase) -> Result<(), SessionError> {
		if self.phase == expected {
			Ok(())
		} else {
			Err(self.unexpected_phase(expected))
		}
	}

	fn unexpected_phase(&mut self, expected: LinkPhase) -> SessionError {
		let actual = self.phase.as_str();

		self.reset_session();

		SessionError::UnexpectedPhase { expected: expected.as_str(), actual }
	}

	fn reset_session(&mut self) {
		self.phase = LinkPhase::Idle;
		self.session = None;
	}
}
impl<C> Debug for LinkCoordinator<C>
where
	C: ?Sized + ProviderHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LinkCoordinator")
			.field("broker", &self.broker)
			.field("phase", &self.phase)
			.field("session", &self.session)
			.field("linked", &self.linked)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		error::TransportError,
		flows::issue::LinkToken,
		http::TransportFuture,
		link::Environment,
		provider::ProviderDescriptor,
		store::{LinkStore, MemoryStore},
	};

	// A transport that fails every call; phase-machine tests never reach the network.
	struct UnreachableHttpClient;
	impl ProviderHttpClient for UnreachableHttpClient {
		fn post_json<'a>(
			&'a self,
			_: &'a Url,
			_: &'a serde_json::Value,
		) -> TransportFuture<'a> {
			Box::pin(async {
				Err(TransportError::Io(std::io::Error::other("unreachable test transport")))
			})
		}

		fn post_form<'a>(
			&'a self,
			_: &'a Url,
			_: &'a [(String, String)],
		) -> TransportFuture<'a> {
			Box::pin(async {
				Err(TransportError::Io(std::io::Error::other("unreachable test transport")))
			})
		}
	}

	fn coordinator() -> (LinkCoordinator<UnreachableHttpClient>, Arc<MemoryTokenCache>) {
		let descriptor = ProviderDescriptor::builder(Environment::Sandbox)
			.link_token_endpoint(
				Url::parse("https://example.com/link-token")
					.expect("Endpoint fixture should parse."),
			)
			.exchange_endpoint(
				Url::parse("https://example.com/exchange")
					.expect("Endpoint fixture should parse."),
			)
			.build()
			.expect("Descriptor fixture should build.");
		let store: Arc<dyn LinkStore> = Arc::new(MemoryStore::default());
		let broker =
			LinkBroker::with_http_client(store, descriptor, "client-id", UnreachableHttpClient);
		let cache = Arc::new(MemoryTokenCache::default());

		(LinkCoordinator::new(broker, cache.clone()), cache)
	}

	fn navigation(value: &str) -> NavigationContext {
		NavigationContext::new(
			Url::parse(value).expect("Navigation URL fixture should parse successfully."),
		)
	}

	#[test]
	fn launch_moves_to_product_selection() {
		let (mut coordinator, _) = coordinator();

		assert_eq!(coordinator.phase(), LinkPhase::Idle);

		coordinator.launch();

		assert_eq!(coordinator.phase(), LinkPhase::ProductSelection);
	}

	#[test]
	fn relaunch_discards_in_flight_state_but_keeps_the_cache() {
		let (mut coordinator, cache) = coordinator();

		cache.store(&LinkToken::new("cached-token"));
		coordinator
			.resume(&navigation("https://app.example.com/?oauth_state_id=state-1"))
			.expect("Marked navigation with a cached token should resume.");
		coordinator.launch();

		assert_eq!(coordinator.phase(), LinkPhase::ProductSelection);
		assert!(coordinator.session().is_none());
		assert!(cache.load().is_some(), "Relaunch must retain the cached token.");
	}

	#[tokio::test]
	async fn empty_product_selection_is_rejected() {
		let (mut coordinator, _) = coordinator();

		coordinator.launch();

		let err = coordinator
			.confirm_products(ProductSet::default())
			.await
			.expect_err("Empty selections must be rejected.");

		assert!(matches!(err, Error::Session(SessionError::EmptyProductSelection)));
		assert_eq!(coordinator.phase(), LinkPhase::Idle);
	}

	#[tokio::test]
	async fn issuance_failure_resets_and_clears_the_cache() {
		let (mut coordinator, cache) = coordinator();

		cache.store(&LinkToken::new("stale-token"));
		coordinator.launch();

		let products =
			ProductSet::new(["transactions"]).expect("Product fixture should be valid.");
		let err = coordinator
			.confirm_products(products)
			.await
			.expect_err("Unreachable transport must fail issuance.");

		assert!(matches!(err, Error::Transport(_)));
		assert_eq!(coordinator.phase(), LinkPhase::Idle);
		assert!(cache.load().is_none(), "Failed issuance must clear the cache.");
	}

	#[test]
	fn resume_ignores_navigations_without_the_marker() {
		let (mut coordinator, cache) = coordinator();

		cache.store(&LinkToken::new("cached-token"));

		let resumed = coordinator
			.resume(&navigation("https://app.example.com/"))
			.expect("Plain navigation should be a no-op.");

		assert!(!resumed);
		assert_eq!(coordinator.phase(), LinkPhase::Idle);
	}

	#[test]
	fn resume_rebuilds_the_session_from_the_cache() {
		let (mut coordinator, cache) = coordinator();

		cache.store(&LinkToken::new("cached-token"));

		let resumed = coordinator
			.resume(&navigation("https://app.example.com/?oauth_state_id=state-1"))
			.expect("Marked navigation with a cached token should resume.");

		assert!(resumed);
		assert_eq!(coordinator.phase(), LinkPhase::WidgetReady);

		let session = coordinator.session().expect("Resumed coordinator should hold a session.");

		assert!(session.is_oauth_resumption);
		assert!(session.products.is_none());
		assert_eq!(session.token.as_str(), "cached-token");
	}

	#[test]
	fn resume_without_a_cached_token_fails() {
		let (mut coordinator, _) = coordinator();
		let err = coordinator
			.resume(&navigation("https://app.example.com/?oauth_state_id=state-1"))
			.expect_err("Marked navigation without a cached token must fail.");

		assert!(matches!(err, Error::Session(SessionError::MissingCachedToken)));
		assert_eq!(coordinator.phase(), LinkPhase::Idle);
	}

	#[test]
	fn widget_exit_keeps_the_cached_token() {
		let (mut coordinator, cache) = coordinator();

		cache.store(&LinkToken::new("cached-token"));
		coordinator
			.resume(&navigation("https://app.example.com/?oauth_state_id=state-1"))
			.expect("Marked navigation with a cached token should resume.");
		coordinator.widget_exit().expect("Exit from widget-ready should succeed.");

		assert_eq!(coordinator.phase(), LinkPhase::Idle);
		assert!(cache.load().is_some(), "Exit must retain the cached token.");
	}

	#[tokio::test]
	async fn standard_mode_success_requires_a_public_token() {
		let (mut coordinator, cache) = coordinator();

		cache.store(&LinkToken::new("cached-token"));
		coordinator
			.resume(&navigation("https://app.example.com/?oauth_state_id=state-1"))
			.expect("Marked navigation with a cached token should resume.");

		let err = coordinator
			.widget_success(None)
			.await
			.expect_err("Standard-mode success without a public token must fail.");

		assert!(matches!(err, Error::Session(SessionError::MissingPublicToken)));
		assert_eq!(coordinator.phase(), LinkPhase::Idle);
	}

	#[tokio::test]
	async fn widget_success_is_rejected_outside_widget_ready() {
		let (mut coordinator, _) = coordinator();
		let err = coordinator
			.widget_success(Some("public-token"))
			.await
			.expect_err("Success from idle must fail.");

		assert!(matches!(
			err,
			Error::Session(SessionError::UnexpectedPhase {
				expected: "widget_ready",
				actual: "idle",
			}),
		));
	}

	// Non-exchange modes complete without touching the transport at all.
	#[tokio::test]
	async fn payment_mode_success_skips_the_exchange() {
		let (mut coordinator, cache) = coordinator();

		coordinator.launch();

		// Fabricate the post-issuance state directly; issuance itself is covered by the
		// broker tests.
		coordinator.session = Some(LinkSession::fresh(
			ProductSet::new(["payment_initiation"]).expect("Product fixture should be valid."),
			LinkMode::PaymentInitiation,
			LinkToken::new("payment-token"),
		));
		coordinator.phase = LinkPhase::WidgetReady;
		cache.store(&LinkToken::new("payment-token"));

		let record = coordinator
			.widget_success(None)
			.await
			.expect("Payment-mode success should complete without an exchange.");

		assert!(record.is_none());
		assert_eq!(coordinator.phase(), LinkPhase::Linked);
		assert!(coordinator.linked_record().is_none());
		assert!(cache.load().is_some(), "Completion must retain the cached token.");
	}

	#[tokio::test]
	async fn stub_transport_fails_every_call() {
		let client = UnreachableHttpClient;
		let url = Url::parse("https://example.com/").expect("URL fixture should parse.");

		assert!(client.post_json(&url, &serde_json::Value::Null).await.is_err());
	}
}
