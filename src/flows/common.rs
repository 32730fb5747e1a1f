//! Shared response-decoding helpers for flow implementations.

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	error::{ProviderErrorPayload, ProviderRejection, ResponseError},
	http::ProviderResponse,
};

/// Decodes a 2xx provider response body, reporting the JSON path on failure.
pub(crate) fn decode_success<T>(response: &ProviderResponse) -> Result<T, ResponseError>
where
	T: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_slice(&response.body);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| ResponseError::Parse { source, status: response.status })
}

/// Captures a non-2xx provider response as a verbatim rejection.
///
/// The error envelope is parsed best-effort; an unparsable body still produces a
/// rejection carrying the raw text.
pub(crate) fn decode_rejection(
	response: &ProviderResponse,
) -> Result<ProviderRejection, ResponseError> {
	let body = String::from_utf8(response.body.clone())
		.map_err(|_| ResponseError::Encoding { status: response.status })?;
	let payload = serde_json::from_str::<ProviderErrorPayload>(&body).unwrap_or_default();

	Ok(ProviderRejection { status: response.status, payload, body })
}
