// self
use crate::{_prelude::*, link::Environment};

/// Errors raised while constructing or validating descriptors.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ProviderDescriptorError {
	/// Link-token endpoint is mandatory for every descriptor.
	#[error("Missing link-token endpoint.")]
	MissingLinkTokenEndpoint,
	/// Exchange endpoint is mandatory for every descriptor.
	#[error("Missing exchange endpoint.")]
	MissingExchangeEndpoint,
	/// Endpoints must use HTTPS.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Default country codes cannot be empty.
	#[error("Descriptor must declare at least one default country code.")]
	NoCountryCodes,
}

/// Endpoint set declared by a provider descriptor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderEndpoints {
	/// Standard link-token creation endpoint.
	pub link_token: Url,
	/// Payment-initiation link-token endpoint, when the provider supports that flow.
	pub payment_link_token: Option<Url>,
	/// User-token endpoint for CRA-exclusive product sets, when supported.
	pub user_token: Option<Url>,
	/// Public-token exchange endpoint.
	pub exchange: Url,
}

/// Immutable provider descriptor consumed by flows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderDescriptor {
	/// Environment every issued token and persisted record belongs to.
	pub environment: Environment,
	/// Endpoint definitions exposed by the provider.
	pub endpoints: ProviderEndpoints,
	/// Country codes attached to link-token requests.
	pub default_country_codes: Vec<String>,
}
impl ProviderDescriptor {
	/// Creates a new builder for the provided environment.
	pub fn builder(environment: Environment) -> ProviderDescriptorBuilder {
		ProviderDescriptorBuilder::new(environment)
	}

	/// Validates invariants for the descriptor.
	fn validate(&self) -> Result<(), ProviderDescriptorError> {
		validate_endpoint("link-token", &self.endpoints.link_token)?;
		validate_endpoint("exchange", &self.endpoints.exchange)?;

		if let Some(payment) = self.endpoints.payment_link_token.as_ref() {
			validate_endpoint("payment-link-token", payment)?;
		}
		if let Some(user_token) = self.endpoints.user_token.as_ref() {
			validate_endpoint("user-token", user_token)?;
		}
		if self.default_country_codes.is_empty() {
			return Err(ProviderDescriptorError::NoCountryCodes);
		}

		Ok(())
	}
}

/// Builder for [`ProviderDescriptor`] values.
#[derive(Debug)]
pub struct ProviderDescriptorBuilder {
	/// Environment for the descriptor being constructed.
	pub environment: Environment,
	/// Standard link-token endpoint.
	pub link_token_endpoint: Option<Url>,
	/// Optional payment-initiation link-token endpoint.
	pub payment_link_token_endpoint: Option<Url>,
	/// Optional user-token endpoint.
	pub user_token_endpoint: Option<Url>,
	/// Public-token exchange endpoint.
	pub exchange_endpoint: Option<Url>,
	/// Country codes attached to link-token requests.
	pub default_country_codes: Vec<String>,
}
impl ProviderDescriptorBuilder {
	/// Creates a new builder seeded with the provided environment.
	pub fn new(environment: Environment) -> Self {
		Self {
			environment,
			link_token_endpoint: None,
			payment_link_token_endpoint: None,
			user_token_endpoint: None,
			exchange_endpoint: None,
			default_country_codes: vec!["US".into()],
		}
	}

	/// Sets the standard link-token endpoint.
	pub fn link_token_endpoint(mut self, url: Url) -> Self {
		self.link_token_endpoint = Some(url);

		self
	}

	/// Sets the payment-initiation link-token endpoint.
	pub fn payment_link_token_endpoint(mut self, url: Url) -> Self {
		self.payment_link_token_endpoint = Some(url);

		self
	}

	/// Sets the user-token endpoint.
	pub fn user_token_endpoint(mut self, url: Url) -> Self {
		self.user_token_endpoint = Some(url);

		self
	}

	/// Sets the public-token exchange endpoint.
	pub fn exchange_endpoint(mut self, url: Url) -> Self {
		self.exchange_endpoint = Some(url);

		self
	}

	/// Overrides the default country codes (defaults to `["US"]`).
	pub fn default_country_codes<I, S>(mut self, codes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.default_country_codes = codes.into_iter().map(Into::into).collect();

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<ProviderDescriptor, ProviderDescriptorError> {
		let link_token =
			self.link_token_endpoint.ok_or(ProviderDescriptorError::MissingLinkTokenEndpoint)?;
		let exchange =
			self.exchange_endpoint.ok_or(ProviderDescriptorError::MissingExchangeEndpoint)?;
		let endpoints = ProviderEndpoints {
			link_token,
			payment_link_token: self.payment_link_token_endpoint,
			user_token: self.user_token_endpoint,
			exchange,
		};
		let descriptor = ProviderDescriptor {
			environment: self.environment,
			endpoints,
			default_country_codes: self.default_country_codes,
		};

		descriptor.validate()?;

		Ok(descriptor)
	}
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ProviderDescriptorError> {
	if url.scheme() != "https" {
		Err(ProviderDescriptorError::InsecureEndpoint { endpoint: name, url: url.to_string() })
	} else {
		Ok(())
	}
}
