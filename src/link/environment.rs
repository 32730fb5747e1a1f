//! Provider environment classification used in store lookup keys.

// self
use crate::_prelude::*;

/// Provider environments a link record can belong to.
///
/// The environment is part of the store lookup key alongside the external link identifier
/// so sandbox and production connections with the same identifier never collide.
#[derive(
	Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
	/// Sandbox environment with simulated institutions.
	#[default]
	Sandbox,
	/// Development environment with live institutions and test billing.
	Development,
	/// Production environment; all operations are billable.
	Production,
}
impl Environment {
	/// Returns the stable lowercase label for the environment.
	pub const fn as_str(self) -> &'static str {
		match self {
			Environment::Sandbox => "sandbox",
			Environment::Development => "development",
			Environment::Production => "production",
		}
	}
}
impl Display for Environment {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for Environment {
	type Err = EnvironmentParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"sandbox" => Ok(Environment::Sandbox),
			"development" => Ok(Environment::Development),
			"production" => Ok(Environment::Production),
			_ => Err(EnvironmentParseError { value: s.to_owned() }),
		}
	}
}

/// Error returned when parsing an unknown environment label.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Unknown environment label: {value}.")]
pub struct EnvironmentParseError {
	/// The unrecognized label.
	pub value: String,
}
