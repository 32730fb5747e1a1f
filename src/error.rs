//! Broker-level error types shared across flows, the provider boundary, and stores.

// self
use crate::_prelude::*;

/// Broker-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical broker error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS); the user may re-initiate the attempt.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Provider returned a response body that could not be decoded.
	#[error(transparent)]
	Response(#[from] ResponseError),
	/// Coordinator was driven out of order or with an incomplete session.
	#[error(transparent)]
	Session(#[from] SessionError),

	/// Provider rejected the link-token request; terminal for the attempt.
	#[error("Provider rejected the link-token request: {0}.")]
	Issuer(ProviderRejection),
	/// Provider rejected the public-token exchange; terminal for the attempt.
	#[error("Provider rejected the public-token exchange: {0}.")]
	Exchange(ProviderRejection),
}

/// Configuration and validation failures raised by the broker.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Provider descriptor validation failed.
	#[error(transparent)]
	InvalidDescriptor(#[from] crate::provider::ProviderDescriptorError),
	/// Descriptor does not declare the endpoint needed by the requested mode.
	#[error("Descriptor for {environment} does not declare a {endpoint} endpoint.")]
	UnsupportedMode {
		/// Environment label of the descriptor.
		environment: crate::link::Environment,
		/// Missing endpoint label.
		endpoint: &'static str,
	},
	/// Link record draft validation failed.
	#[error("Unable to build link record draft.")]
	Draft(#[from] crate::link::LinkDraftError),
	/// Requested products cannot be normalized.
	#[error("Requested products are invalid.")]
	InvalidProducts(#[from] crate::link::ProductValidationError),
	/// Exchange response carried an unusable external link identifier.
	#[error("Exchange response carried an invalid external link identifier.")]
	InvalidExternalId(#[from] crate::link::IdentifierError),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<reqwest::Error> for ConfigError {
	fn from(e: reqwest::Error) -> Self {
		Self::http_client_build(e)
	}
}

/// Decoding failures for provider responses.
#[derive(Debug, ThisError)]
pub enum ResponseError {
	/// Provider responded with malformed JSON that could not be parsed.
	#[error("Provider returned malformed JSON.")]
	Parse {
		/// Structured parsing failure, including the path that failed.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code of the response.
		status: u16,
	},
	/// Provider response body was not valid UTF-8.
	#[error("Provider returned a non-UTF-8 body.")]
	Encoding {
		/// HTTP status code of the response.
		status: u16,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the provider.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the provider.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Coordinator misuse failures; every variant resets the attempt to `Idle`.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum SessionError {
	/// A transition was requested from the wrong phase.
	#[error("Expected the {expected} phase but the coordinator is in {actual}.")]
	UnexpectedPhase {
		/// Phase the transition requires.
		expected: &'static str,
		/// Phase the coordinator was actually in.
		actual: &'static str,
	},
	/// Product confirmation requires a non-empty selection.
	#[error("Product selection cannot be empty.")]
	EmptyProductSelection,
	/// Redirect resumption found no token in the client-side cache.
	#[error("No cached link token is available for redirect resumption.")]
	MissingCachedToken,
	/// Widget success in standard mode must carry a public token.
	#[error("Widget success payload is missing the public token.")]
	MissingPublicToken,
}

/// Provider rejection details preserved verbatim for debugging.
///
/// The structured fields follow the provider's error envelope; `body` retains the raw
/// response text so nothing upstream is lost even when the envelope changes shape.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRejection {
	/// HTTP status code of the rejecting response.
	pub status: u16,
	/// Parsed provider error envelope.
	pub payload: ProviderErrorPayload,
	/// Raw response body, verbatim.
	pub body: String,
}
impl Display for ProviderRejection {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match (&self.payload.error_code, &self.payload.error_message) {
			(Some(code), Some(message)) => write!(f, "{code} ({}): {message}", self.status),
			(Some(code), None) => write!(f, "{code} ({})", self.status),
			_ => write!(f, "status {}: {}", self.status, self.body),
		}
	}
}

/// Error envelope returned by the provider alongside non-2xx statuses.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderErrorPayload {
	/// Provider-assigned error class.
	#[serde(default)]
	pub error_type: Option<String>,
	/// Provider-assigned error code.
	#[serde(default)]
	pub error_code: Option<String>,
	/// Technical error description.
	#[serde(default)]
	pub error_message: Option<String>,
	/// End-user-facing description, when the provider supplies one.
	#[serde(default)]
	pub display_message: Option<String>,
	/// Provider request identifier for support escalation.
	#[serde(default)]
	pub request_id: Option<String>,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn provider_rejection_prefers_structured_fields() {
		let rejection = ProviderRejection {
			status: 400,
			payload: ProviderErrorPayload {
				error_code: Some("INVALID_PUBLIC_TOKEN".into()),
				error_message: Some("the public token has already been exchanged".into()),
				..Default::default()
			},
			body: "{\"error_code\":\"INVALID_PUBLIC_TOKEN\"}".into(),
		};

		assert_eq!(
			rejection.to_string(),
			"INVALID_PUBLIC_TOKEN (400): the public token has already been exchanged",
		);
	}

	#[test]
	fn provider_rejection_falls_back_to_raw_body() {
		let rejection = ProviderRejection {
			status: 502,
			payload: ProviderErrorPayload::default(),
			body: "upstream gateway timeout".into(),
		};

		assert_eq!(rejection.to_string(), "status 502: upstream gateway timeout");
	}

	#[test]
	fn store_error_converts_into_broker_error_with_source() {
		let store_error =
			crate::store::StoreError::Backend { message: "database unreachable".into() };
		let broker_error: Error = store_error.clone().into();

		assert!(matches!(broker_error, Error::Storage(_)));
		assert!(broker_error.to_string().contains("database unreachable"));

		let source = StdError::source(&broker_error)
			.expect("Broker error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}
}
