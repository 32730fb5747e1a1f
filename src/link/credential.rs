//! Access credential wrapper that redacts sensitive material.

// self
use crate::_prelude::*;

/// Redacted access credential keeping the durable provider secret out of logs.
///
/// The credential enables ongoing API access for a linked connection. It is set at most
/// once per record by the exchange flow and only the detail view ever serializes it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessCredential(String);
impl AccessCredential {
	/// Wraps a new credential string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner credential value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for AccessCredential {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for AccessCredential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("AccessCredential").field(&"<redacted>").finish()
	}
}
impl Display for AccessCredential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}
