//! Link-token issuance flow.
//!
//! The broker exposes [`LinkBroker::issue_link_token`] so callers can obtain the
//! short-lived token that initializes the provider's account-link widget. The product
//! selection decides which issuance mode applies: a selection containing
//! `payment_initiation` routes to the payment endpoint, a selection made up entirely of
//! `cra_`-prefixed products routes to the user-token endpoint, and everything else uses
//! the standard link-token endpoint.

// self
use crate::{
	_prelude::*,
	error::ConfigError,
	flows::{LinkBroker, common},
	http::ProviderHttpClient,
	link::ProductSet,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Issuance mode derived from the requested product selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LinkMode {
	/// Standard link-token issuance followed by a public-token exchange.
	Standard,
	/// Payment-initiation issuance; no exchange follows the widget handshake.
	PaymentInitiation,
	/// User-token issuance for CRA-exclusive selections; no exchange follows.
	UserTokenOnly,
}
impl LinkMode {
	/// Derives the mode from a product selection.
	pub fn infer(products: &ProductSet) -> Self {
		if products.has_payment_initiation() {
			Self::PaymentInitiation
		} else if products.is_cra_exclusive() {
			Self::UserTokenOnly
		} else {
			Self::Standard
		}
	}

	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Standard => "standard",
			Self::PaymentInitiation => "payment_initiation",
			Self::UserTokenOnly => "user_token_only",
		}
	}

	/// Returns true when the widget handshake must end with a public-token exchange.
	pub const fn requires_exchange(self) -> bool {
		matches!(self, Self::Standard)
	}
}
impl Display for LinkMode {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Short-lived widget-initialization token issued by the provider.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkToken(String);
impl LinkToken {
	/// Wraps a raw token value.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Exposes the raw token value for widget initialization.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl Debug for LinkToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("LinkToken(\"<redacted>\")")
	}
}

#[derive(Deserialize)]
struct LinkTokenResponse {
	link_token: String,
}
#[derive(Deserialize)]
struct UserTokenResponse {
	user_token: String,
}

impl<C> LinkBroker<C>
where
	C: ?Sized + ProviderHttpClient,
{
	/// Issues a widget-initialization token for the provided product selection.
	///
	/// Fails with [`ConfigError::UnsupportedMode`] when the descriptor does not declare
	/// the endpoint required by `mode`; provider rejections surface verbatim as
	/// [`Error::Issuer`](crate::error::Error::Issuer).
	pub async fn issue_link_token(
		&self,
		products: &ProductSet,
		mode: LinkMode,
	) -> Result<LinkToken> {
		const KIND: FlowKind = FlowKind::IssueToken;

		let span = FlowSpan::new(KIND, mode.as_str());

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let endpoint = self.issuance_endpoint(mode)?;
				let body = self.issuance_body(products);
				let response =
					self.http_client.post_json(endpoint, &body).await.map_err(Error::from)?;

				if !response.is_success() {
					return Err(Error::Issuer(common::decode_rejection(&response)?));
				}

				let token = match mode {
					LinkMode::UserTokenOnly =>
						common::decode_success::<UserTokenResponse>(&response)?.user_token,
					_ => common::decode_success::<LinkTokenResponse>(&response)?.link_token,
				};

				Ok(LinkToken::new(token))
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	fn issuance_endpoint(&self, mode: LinkMode) -> Result<&Url> {
		let endpoints = &self.descriptor.endpoints;

		match mode {
			LinkMode::Standard => Ok(&endpoints.link_token),
			LinkMode::PaymentInitiation =>
				endpoints.payment_link_token.as_ref().ok_or_else(|| {
					ConfigError::UnsupportedMode {
						environment: self.descriptor.environment,
						endpoint: "payment-link-token",
					}
					.into()
				}),
			LinkMode::UserTokenOnly => endpoints.user_token.as_ref().ok_or_else(|| {
				ConfigError::UnsupportedMode {
					environment: self.descriptor.environment,
					endpoint: "user-token",
				}
				.into()
			}),
		}
	}

	fn issuance_body(&self, products: &ProductSet) -> serde_json::Value {
		let mut body = serde_json::json!({
			"client_id": self.client_id,
			"user": { "client_user_id": &*self.owner },
			"products": products,
			"country_codes": self.descriptor.default_country_codes,
			"language": "en",
		});

		if let Some(secret) = self.client_secret.as_deref() {
			body["secret"] = serde_json::Value::String(secret.to_owned());
		}

		body
	}
}
