//! Product (capability) set modeling used across the broker.

// std
use std::{
	cmp::Ordering,
	collections::BTreeSet,
	hash::{Hash, Hasher},
	sync::OnceLock,
};
// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD_NO_PAD};
use serde::{Deserializer, Serializer, de::Error as DeError, ser::SerializeSeq};
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

/// Product name that routes token issuance through the payment-initiation endpoint.
pub const PAYMENT_INITIATION: &str = "payment_initiation";
/// Prefix marking consumer-report ("CRA") products, which use the user-token flow.
pub const CRA_PREFIX: &str = "cra_";

/// Errors emitted when validating products.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ProductValidationError {
	/// Empty product entries are not allowed.
	#[error("Product entries cannot be empty.")]
	Empty,
	/// Products cannot contain embedded whitespace characters.
	#[error("Product contains whitespace: {product}.")]
	ContainsWhitespace {
		/// The offending product string.
		product: String,
	},
}

/// Normalized set of enabled products with a stable fingerprint cache.
///
/// Products are deduplicated and sorted so equality, ordering, and hashing remain
/// consistent regardless of insertion order. The [`fingerprint`](Self::fingerprint)
/// helper lazily caches a base64 (no padding) SHA-256 digest of the normalized string.
#[derive(Default)]
pub struct ProductSet {
	/// The normalized products.
	pub products: Arc<[String]>,
	/// The fingerprint of the normalized products.
	pub fingerprint_cache: OnceLock<String>,
}
impl ProductSet {
	/// Creates a normalized product set from any iterator.
	pub fn new<I, S>(products: I) -> Result<Self, ProductValidationError>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Ok(Self { products: normalize(products)?, fingerprint_cache: OnceLock::new() })
	}

	/// Number of distinct products.
	pub fn len(&self) -> usize {
		self.products.len()
	}

	/// Returns true if no products are enabled.
	pub fn is_empty(&self) -> bool {
		self.products.is_empty()
	}

	/// Returns true if the normalized set contains the provided product.
	pub fn contains(&self, product: &str) -> bool {
		self.products.binary_search_by(|candidate| candidate.as_str().cmp(product)).is_ok()
	}

	/// Returns true if the set enables payment initiation.
	pub fn has_payment_initiation(&self) -> bool {
		self.contains(PAYMENT_INITIATION)
	}

	/// Returns true if the set consists exclusively of CRA-class products.
	pub fn is_cra_exclusive(&self) -> bool {
		!self.is_empty() && self.products.iter().all(|product| product.starts_with(CRA_PREFIX))
	}

	/// Iterator over normalized products.
	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.products.iter().map(|p| p.as_str())
	}

	/// Returns the comma-joined representation used on the exchange wire.
	pub fn joined(&self) -> String {
		self.products.join(",")
	}

	/// Stable fingerprint derived from the normalized product list.
	pub fn fingerprint(&self) -> String {
		self.fingerprint_cache.get_or_init(|| compute_fingerprint(&self.products)).clone()
	}

	/// Returns the underlying slice of product strings.
	pub fn as_slice(&self) -> &[String] {
		&self.products
	}
}
impl Clone for ProductSet {
	fn clone(&self) -> Self {
		Self { products: self.products.clone(), fingerprint_cache: OnceLock::new() }
	}
}
impl PartialEq for ProductSet {
	fn eq(&self, other: &Self) -> bool {
		self.products == other.products
	}
}
impl Eq for ProductSet {}
impl PartialOrd for ProductSet {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}
impl Ord for ProductSet {
	fn cmp(&self, other: &Self) -> Ordering {
		self.products.cmp(&other.products)
	}
}
impl Hash for ProductSet {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.fingerprint_cache.get_or_init(|| compute_fingerprint(&self.products)).hash(state);
	}
}
impl Debug for ProductSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("ProductSet").field(&self.products).finish()
	}
}
impl Display for ProductSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.joined())
	}
}
impl TryFrom<Vec<String>> for ProductSet {
	type Error = ProductValidationError;

	fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}
impl TryFrom<&[String]> for ProductSet {
	type Error = ProductValidationError;

	fn try_from(value: &[String]) -> Result<Self, Self::Error> {
		Self::new(value.to_vec())
	}
}
impl FromStr for ProductSet {
	type Err = ProductValidationError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if s.is_empty() {
			return Ok(Self::default());
		}

		Self::new(s.split(',').map(str::trim).filter(|part| !part.is_empty()))
	}
}
impl Serialize for ProductSet {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let mut seq = serializer.serialize_seq(Some(self.products.len()))?;

		for product in self.products.iter() {
			seq.serialize_element(product)?;
		}

		seq.end()
	}
}
impl<'de> Deserialize<'de> for ProductSet {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let values = <Vec<String>>::deserialize(deserializer)?;

		ProductSet::new(values).map_err(DeError::custom)
	}
}

fn normalize<I, S>(products: I) -> Result<Arc<[String]>, ProductValidationError>
where
	I: IntoIterator<Item = S>,
	S: Into<String>,
{
	let mut set = BTreeSet::new();

	for product in products {
		let owned: String = product.into();

		if owned.is_empty() {
			return Err(ProductValidationError::Empty);
		}
		if owned.chars().any(char::is_whitespace) {
			return Err(ProductValidationError::ContainsWhitespace { product: owned });
		}

		set.insert(owned);
	}

	Ok(Arc::from(set.into_iter().collect::<Vec<_>>()))
}

fn compute_fingerprint(products: &[String]) -> String {
	let normalized = products.join(",");
	let mut hasher = Sha256::new();

	hasher.update(normalized.as_bytes());

	let digest = hasher.finalize();

	STANDARD_NO_PAD.encode(digest)
}
