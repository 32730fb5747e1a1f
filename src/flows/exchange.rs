//! Public-token exchange flow.
//!
//! The broker exposes [`LinkBroker::exchange_public_token`] to convert the widget's
//! one-time public token into a durable access credential and persist the resulting
//! link record. Re-exchanging a link that already has a live record for the same
//! `(external_id, environment)` pair replaces the stored credential in place instead of
//! growing a second row, so retried handshakes stay idempotent.

// self
use crate::{
	_prelude::*,
	error::ConfigError,
	flows::{LinkBroker, common},
	http::ProviderHttpClient,
	link::{LinkDraft, LinkId, LinkRecord, LinkUpdate, ProductSet},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	store::StoreError,
};

#[derive(Deserialize)]
struct ExchangeResponse {
	item_id: String,
	access_token: String,
}

impl<C> LinkBroker<C>
where
	C: ?Sized + ProviderHttpClient,
{
	/// Exchanges a one-time public token for a durable credential and persists the record.
	///
	/// The returned record has been acknowledged by the store. Provider rejections
	/// surface verbatim as [`Error::Exchange`](crate::error::Error::Exchange) and leave
	/// the store untouched.
	pub async fn exchange_public_token(
		&self,
		public_token: &str,
		products: Option<&ProductSet>,
	) -> Result<LinkRecord> {
		const KIND: FlowKind = FlowKind::Exchange;

		let span = FlowSpan::new(KIND, "exchange_public_token");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let form = self.exchange_form(public_token, products);
				let response = self
					.http_client
					.post_form(&self.descriptor.endpoints.exchange, &form)
					.await
					.map_err(Error::from)?;

				if !response.is_success() {
					return Err(Error::Exchange(common::decode_rejection(&response)?));
				}

				let exchanged = common::decode_success::<ExchangeResponse>(&response)?;
				let external_id =
					LinkId::new(exchanged.item_id).map_err(ConfigError::from)?;
				let draft = self.build_draft(&external_id, exchanged.access_token, products)?;

				self.persist_exchanged(external_id, draft, products).await
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	fn exchange_form(
		&self,
		public_token: &str,
		products: Option<&ProductSet>,
	) -> Vec<(String, String)> {
		let mut form = vec![
			("client_id".to_owned(), self.client_id.clone()),
			("public_token".to_owned(), public_token.to_owned()),
		];

		if let Some(secret) = self.client_secret.as_deref() {
			form.push(("secret".to_owned(), secret.to_owned()));
		}
		if let Some(products) = products {
			form.push(("products".to_owned(), products.joined()));
		}

		form
	}

	fn build_draft(
		&self,
		external_id: &LinkId,
		credential: String,
		products: Option<&ProductSet>,
	) -> Result<LinkDraft> {
		let mut builder = LinkRecord::draft(external_id.clone(), self.descriptor.environment)
			.owner(self.owner.clone())
			.credential(credential)
			.country_codes(self.descriptor.default_country_codes.iter().cloned());

		if let Some(products) = products {
			builder = builder.products(products.clone());
		}

		builder.build().map_err(|e| ConfigError::from(e).into())
	}

	async fn persist_exchanged(
		&self,
		external_id: LinkId,
		draft: LinkDraft,
		products: Option<&ProductSet>,
	) -> Result<LinkRecord> {
		let retry_draft = draft.clone();

		match self.store.create(draft).await {
			Ok(record) => Ok(record),
			Err(StoreError::Conflict { .. }) => {
				let mut update =
					LinkUpdate::default().with_credential(retry_draft.credential.clone());

				if let Some(products) = products {
					update = update.with_products(products.clone());
				}

				update =
					update.with_country_codes(self.descriptor.default_country_codes.iter().cloned());

				match self.store.update(&external_id, update).await? {
					Some(record) => Ok(record),
					// The conflicting record was deleted mid-flight; take the insert path again.
					None => Ok(self.store.create(retry_draft).await?),
				}
			},
			Err(e) => Err(e.into()),
		}
	}
}
