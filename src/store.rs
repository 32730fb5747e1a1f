//! Storage contracts and built-in store implementations for link records.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	link::{Environment, LinkDraft, LinkId, LinkRecord, LinkUpdate, OwnerId},
};

/// Boxed future returned by [`LinkStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend contract implemented by link record stores.
///
/// Every write is atomic at single-record granularity and the
/// `(external_id, environment)` uniqueness constraint among non-deleted records is
/// enforced here on write, never pre-checked by callers.
pub trait LinkStore
where
	Self: Send + Sync,
{
	/// Inserts a new record; fails with [`StoreError::Conflict`] when the draft's
	/// `(external_id, environment)` pair collides with a non-deleted record.
	fn create(&self, draft: LinkDraft) -> StoreFuture<'_, LinkRecord>;

	/// Fetches the non-deleted record for the external identifier, optionally requiring
	/// an exact environment match.
	fn find_by_external_id<'a>(
		&'a self,
		external_id: &'a LinkId,
		environment: Option<Environment>,
	) -> StoreFuture<'a, Option<LinkRecord>>;

	/// Lists an owner's non-deleted records, newest first by creation instant.
	fn find_by_owner<'a>(
		&'a self,
		owner: &'a OwnerId,
		environment: Option<Environment>,
	) -> StoreFuture<'a, Vec<LinkRecord>>;

	/// Lists every non-deleted record, newest first by creation instant.
	fn list_all(&self) -> StoreFuture<'_, Vec<LinkRecord>>;

	/// Applies a closed partial update to the non-deleted record for the identifier.
	///
	/// Returns `None` when the update is empty or no matching non-deleted record
	/// exists; stamps `updated_at` on success.
	fn update<'a>(
		&'a self,
		external_id: &'a LinkId,
		update: LinkUpdate,
	) -> StoreFuture<'a, Option<LinkRecord>>;

	/// Marks the matching non-deleted record as deleted; `None` when the record is
	/// absent or already deleted, so repeated deletes are no-ops.
	fn soft_delete<'a>(
		&'a self,
		external_id: &'a LinkId,
		environment: Option<Environment>,
	) -> StoreFuture<'a, Option<LinkRecord>>;
}

/// Error type produced by [`LinkStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// The `(external_id, environment)` pair already maps to a non-deleted record.
	#[error("A non-deleted record already exists for {external_id} in {environment}.")]
	Conflict {
		/// External link identifier that collided.
		external_id: String,
		/// Environment component of the colliding key.
		environment: Environment,
	},
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Unique key identifying a live link record.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoreKey {
	/// External link identifier component.
	pub external_id: LinkId,
	/// Environment component preventing cross-environment collisions.
	pub environment: Environment,
}
impl StoreKey {
	/// Builds a key for the provided identifier and environment.
	pub fn new(external_id: &LinkId, environment: Environment) -> Self {
		Self { external_id: external_id.clone(), environment }
	}
}

/// Orders records newest first by creation instant, surrogate id breaking ties.
pub(crate) fn sort_newest_first(records: &mut [LinkRecord]) {
	records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}
