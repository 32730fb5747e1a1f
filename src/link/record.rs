//! Durable link record structs, draft builder, and the closed partial-update type.

// self
use crate::{
	_prelude::*,
	link::{
		AccessCredential, Environment, InstitutionId, LinkId, OwnerId, ProductSet,
	},
};

/// Errors produced by [`LinkDraftBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum LinkDraftError {
	/// Issued when no access credential was provided.
	#[error("Access credential is required.")]
	MissingCredential,
}

/// Durable record describing one linked connection.
///
/// Created by the exchange flow, mutated only through [`LinkUpdate`], soft-deleted by an
/// explicit delete request, and never physically removed by this crate.
#[derive(Clone, Serialize, Deserialize)]
pub struct LinkRecord {
	/// Surrogate identity assigned by the store on create.
	pub id: u64,
	/// Owning user/tenant identifier.
	pub owner: OwnerId,
	/// Provider-issued link identifier; immutable once set.
	pub external_id: LinkId,
	/// Durable access credential; callers must avoid logging it.
	pub credential: AccessCredential,
	/// Provider environment the connection belongs to.
	pub environment: Environment,
	/// Provider-assigned institution identifier, when known.
	pub institution_id: Option<InstitutionId>,
	/// Human-readable institution name, when known.
	pub institution_name: Option<String>,
	/// Products enabled for the connection.
	pub products: ProductSet,
	/// ISO country codes associated with the connection.
	pub country_codes: Vec<String>,
	/// Instant of the last successful background refresh.
	pub last_successful_sync: Option<OffsetDateTime>,
	/// Provider error code from the most recent failed refresh.
	pub error_code: Option<String>,
	/// Provider error message from the most recent failed refresh.
	pub error_message: Option<String>,
	/// Creation instant stamped by the store.
	pub created_at: OffsetDateTime,
	/// Last mutation instant stamped by the store.
	pub updated_at: OffsetDateTime,
	/// Logical-deletion marker; a non-`None` value excludes the record from all reads.
	pub deleted_at: Option<OffsetDateTime>,
}
impl LinkRecord {
	/// Returns a draft builder for the provided external identifier and environment.
	pub fn draft(external_id: LinkId, environment: Environment) -> LinkDraftBuilder {
		LinkDraftBuilder::new(external_id, environment)
	}

	/// Returns true once the record has been soft-deleted.
	pub fn is_deleted(&self) -> bool {
		self.deleted_at.is_some()
	}

	/// Marks the record as deleted at the provided instant.
	pub(crate) fn soft_delete(&mut self, instant: OffsetDateTime) {
		self.deleted_at = Some(instant);
	}

	/// Live-row predicate shared by store lookups.
	pub(crate) fn matches_live(
		&self,
		external_id: &LinkId,
		environment: Option<Environment>,
	) -> bool {
		!self.is_deleted()
			&& self.external_id == *external_id
			&& environment.is_none_or(|wanted| self.environment == wanted)
	}

	/// Credential-free projection for list views.
	pub fn summary(&self) -> LinkSummary {
		LinkSummary {
			id: self.id,
			owner: self.owner.clone(),
			external_id: self.external_id.clone(),
			environment: self.environment,
			institution_id: self.institution_id.clone(),
			institution_name: self.institution_name.clone(),
			products: self.products.clone(),
			country_codes: self.country_codes.clone(),
			last_successful_sync: self.last_successful_sync,
			error_code: self.error_code.clone(),
			error_message: self.error_message.clone(),
			created_at: self.created_at,
			updated_at: self.updated_at,
		}
	}
}
impl Debug for LinkRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LinkRecord")
			.field("id", &self.id)
			.field("owner", &self.owner)
			.field("external_id", &self.external_id)
			.field("credential", &"<redacted>")
			.field("environment", &self.environment)
			.field("institution_id", &self.institution_id)
			.field("institution_name", &self.institution_name)
			.field("products", &self.products)
			.field("country_codes", &self.country_codes)
			.field("last_successful_sync", &self.last_successful_sync)
			.field("error_code", &self.error_code)
			.field("error_message", &self.error_message)
			.field("created_at", &self.created_at)
			.field("updated_at", &self.updated_at)
			.field("deleted_at", &self.deleted_at)
			.finish()
	}
}

/// List-view projection of a [`LinkRecord`] with the credential omitted.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LinkSummary {
	/// Surrogate identity assigned by the store.
	pub id: u64,
	/// Owning user/tenant identifier.
	pub owner: OwnerId,
	/// Provider-issued link identifier.
	pub external_id: LinkId,
	/// Provider environment the connection belongs to.
	pub environment: Environment,
	/// Provider-assigned institution identifier, when known.
	pub institution_id: Option<InstitutionId>,
	/// Human-readable institution name, when known.
	pub institution_name: Option<String>,
	/// Products enabled for the connection.
	pub products: ProductSet,
	/// ISO country codes associated with the connection.
	pub country_codes: Vec<String>,
	/// Instant of the last successful background refresh.
	pub last_successful_sync: Option<OffsetDateTime>,
	/// Provider error code from the most recent failed refresh.
	pub error_code: Option<String>,
	/// Provider error message from the most recent failed refresh.
	pub error_message: Option<String>,
	/// Creation instant stamped by the store.
	pub created_at: OffsetDateTime,
	/// Last mutation instant stamped by the store.
	pub updated_at: OffsetDateTime,
}

/// Validated input for [`LinkStore::create`](crate::store::LinkStore::create).
///
/// The store assigns the surrogate id and lifecycle timestamps; everything else is fixed
/// by the draft.
#[derive(Clone, Debug)]
pub struct LinkDraft {
	/// Owning user/tenant identifier.
	pub owner: OwnerId,
	/// Provider-issued link identifier.
	pub external_id: LinkId,
	/// Durable access credential obtained from the exchange.
	pub credential: AccessCredential,
	/// Provider environment the connection belongs to.
	pub environment: Environment,
	/// Provider-assigned institution identifier, when known.
	pub institution_id: Option<InstitutionId>,
	/// Human-readable institution name, when known.
	pub institution_name: Option<String>,
	/// Products enabled for the connection.
	pub products: ProductSet,
	/// ISO country codes associated with the connection.
	pub country_codes: Vec<String>,
}

/// Builder for [`LinkDraft`].
#[derive(Clone, Debug)]
pub struct LinkDraftBuilder {
	external_id: LinkId,
	environment: Environment,
	owner: Option<OwnerId>,
	credential: Option<AccessCredential>,
	institution_id: Option<InstitutionId>,
	institution_name: Option<String>,
	products: ProductSet,
	country_codes: Vec<String>,
}
impl LinkDraftBuilder {
	fn new(external_id: LinkId, environment: Environment) -> Self {
		Self {
			external_id,
			environment,
			owner: None,
			credential: None,
			institution_id: None,
			institution_name: None,
			products: ProductSet::default(),
			country_codes: Vec::new(),
		}
	}

	/// Sets the owning user/tenant; defaults to the single-tenant placeholder.
	pub fn owner(mut self, owner: OwnerId) -> Self {
		self.owner = Some(owner);

		self
	}

	/// Provides the access credential value.
	pub fn credential(mut self, credential: impl Into<String>) -> Self {
		self.credential = Some(AccessCredential::new(credential));

		self
	}

	/// Sets the institution metadata.
	pub fn institution(mut self, id: InstitutionId, name: impl Into<String>) -> Self {
		self.institution_id = Some(id);
		self.institution_name = Some(name.into());

		self
	}

	/// Sets the enabled products.
	pub fn products(mut self, products: ProductSet) -> Self {
		self.products = products;

		self
	}

	/// Sets the associated ISO country codes.
	pub fn country_codes<I, S>(mut self, codes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.country_codes = codes.into_iter().map(Into::into).collect();

		self
	}

	/// Consumes the builder and produces a [`LinkDraft`].
	pub fn build(self) -> Result<LinkDraft, LinkDraftError> {
		let credential = self.credential.ok_or(LinkDraftError::MissingCredential)?;

		Ok(LinkDraft {
			owner: self.owner.unwrap_or_default(),
			external_id: self.external_id,
			credential,
			environment: self.environment,
			institution_id: self.institution_id,
			institution_name: self.institution_name,
			products: self.products,
			country_codes: self.country_codes,
		})
	}
}

/// Closed partial update for a [`LinkRecord`].
///
/// Only the fields representable here can ever be mutated post-creation; anything else
/// is rejected by construction rather than by a runtime allow-list. Deserializing a
/// payload with unknown keys silently ignores them, matching the update call contract.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkUpdate {
	/// Replaces the access credential (idempotent re-link).
	pub credential: Option<AccessCredential>,
	/// Replaces the institution identifier.
	pub institution_id: Option<InstitutionId>,
	/// Replaces the institution name.
	pub institution_name: Option<String>,
	/// Replaces the enabled product set.
	pub products: Option<ProductSet>,
	/// Replaces the associated country codes.
	pub country_codes: Option<Vec<String>>,
	/// Records a successful background refresh.
	pub last_successful_sync: Option<OffsetDateTime>,
	/// Records a provider error code from a failed refresh.
	pub error_code: Option<String>,
	/// Records a provider error message from a failed refresh.
	pub error_message: Option<String>,
	/// Clears both error fields; applied after any error field replacement.
	pub clear_errors: bool,
}
impl LinkUpdate {
	/// Returns true when no field would change.
	pub fn is_empty(&self) -> bool {
		self.credential.is_none()
			&& self.institution_id.is_none()
			&& self.institution_name.is_none()
			&& self.products.is_none()
			&& self.country_codes.is_none()
			&& self.last_successful_sync.is_none()
			&& self.error_code.is_none()
			&& self.error_message.is_none()
			&& !self.clear_errors
	}

	/// Sets the replacement credential.
	pub fn with_credential(mut self, credential: AccessCredential) -> Self {
		self.credential = Some(credential);

		self
	}

	/// Sets the replacement product set.
	pub fn with_products(mut self, products: ProductSet) -> Self {
		self.products = Some(products);

		self
	}

	/// Sets the replacement country codes.
	pub fn with_country_codes<I, S>(mut self, codes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.country_codes = Some(codes.into_iter().map(Into::into).collect());

		self
	}

	/// Records a successful refresh instant and clears stale error fields.
	pub fn with_successful_sync(mut self, instant: OffsetDateTime) -> Self {
		self.last_successful_sync = Some(instant);
		self.clear_errors = true;

		self
	}

	/// Records a failed refresh outcome.
	pub fn with_error(mut self, code: impl Into<String>, message: impl Into<String>) -> Self {
		self.error_code = Some(code.into());
		self.error_message = Some(message.into());

		self
	}

	/// Applies the update to a record in place; the caller stamps `updated_at`.
	pub(crate) fn apply(self, record: &mut LinkRecord) {
		if let Some(credential) = self.credential {
			record.credential = credential;
		}
		if let Some(institution_id) = self.institution_id {
			record.institution_id = Some(institution_id);
		}
		if let Some(institution_name) = self.institution_name {
			record.institution_name = Some(institution_name);
		}
		if let Some(products) = self.products {
			record.products = products;
		}
		if let Some(country_codes) = self.country_codes {
			record.country_codes = country_codes;
		}
		if let Some(instant) = self.last_successful_sync {
			record.last_successful_sync = Some(instant);
		}
		if let Some(code) = self.error_code {
			record.error_code = Some(code);
		}
		if let Some(message) = self.error_message {
			record.error_message = Some(message);
		}
		if self.clear_errors {
			record.error_code = None;
			record.error_message = None;
		}
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn build_record() -> LinkRecord {
		let external_id = LinkId::new("link-fixture").expect("Link fixture should be valid.");
		let draft = LinkRecord::draft(external_id, Environment::Sandbox)
			.credential("access-fixture")
			.products(
				ProductSet::new(["transactions"]).expect("Product fixture should be valid."),
			)
			.country_codes(["US"])
			.build()
			.expect("Draft fixture should build successfully.");
		let now = macros::datetime!(2025-06-01 00:00 UTC);

		LinkRecord {
			id: 1,
			owner: draft.owner,
			external_id: draft.external_id,
			credential: draft.credential,
			environment: draft.environment,
			institution_id: draft.institution_id,
			institution_name: draft.institution_name,
			products: draft.products,
			country_codes: draft.country_codes,
			last_successful_sync: None,
			error_code: None,
			error_message: None,
			created_at: now,
			updated_at: now,
			deleted_at: None,
		}
	}

	#[test]
	fn draft_requires_credential() {
		let external_id = LinkId::new("link-1").expect("Link fixture should be valid.");
		let err = LinkRecord::draft(external_id, Environment::Sandbox)
			.build()
			.expect_err("Draft without a credential must be rejected.");

		assert_eq!(err, LinkDraftError::MissingCredential);
	}

	#[test]
	fn update_applies_only_provided_fields() {
		let mut record = build_record();
		let update = LinkUpdate::default()
			.with_credential(AccessCredential::new("access-rotated"))
			.with_error("ITEM_LOGIN_REQUIRED", "the credentials are no longer valid");

		update.apply(&mut record);

		assert_eq!(record.credential.expose(), "access-rotated");
		assert_eq!(record.error_code.as_deref(), Some("ITEM_LOGIN_REQUIRED"));
		assert_eq!(record.products.joined(), "transactions", "Untouched fields must survive.");
	}

	#[test]
	fn successful_sync_clears_error_fields() {
		let mut record = build_record();

		LinkUpdate::default().with_error("ERR", "boom").apply(&mut record);
		LinkUpdate::default()
			.with_successful_sync(macros::datetime!(2025-06-02 00:00 UTC))
			.apply(&mut record);

		assert!(record.error_code.is_none());
		assert!(record.error_message.is_none());
		assert!(record.last_successful_sync.is_some());
	}

	#[test]
	fn empty_update_detection() {
		assert!(LinkUpdate::default().is_empty());
		assert!(
			!LinkUpdate::default()
				.with_credential(AccessCredential::new("access"))
				.is_empty()
		);
	}

	#[test]
	fn unknown_json_keys_are_ignored() {
		let update: LinkUpdate = serde_json::from_str(
			"{\"credential\":\"access-x\",\"not_a_field\":\"y\"}",
		)
		.expect("Unknown keys must be ignored rather than rejected.");

		assert_eq!(update.credential.as_ref().map(AccessCredential::expose), Some("access-x"));
		assert!(update.institution_id.is_none());
	}

	#[test]
	fn summary_omits_credential() {
		let record = build_record();
		let json = serde_json::to_string(&record.summary())
			.expect("Summary should serialize to JSON.");

		assert!(!json.contains("credential"));
		assert!(!json.contains("access-fixture"));
		assert!(json.contains("link-fixture"));
	}

	#[test]
	fn debug_redacts_credential() {
		let record = build_record();
		let rendered = format!("{record:?}");

		assert!(rendered.contains("<redacted>"));
		assert!(!rendered.contains("access-fixture"));
	}
}
