//! Thread-safe in-memory [`LinkStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	link::{Environment, LinkDraft, LinkId, LinkRecord, LinkUpdate, OwnerId},
	store::{self, LinkStore, StoreError, StoreFuture},
};

#[derive(Debug, Default)]
struct MemoryInner {
	next_id: u64,
	rows: BTreeMap<u64, LinkRecord>,
}
impl MemoryInner {
	fn live(
		&self,
		external_id: &LinkId,
		environment: Option<Environment>,
	) -> Option<&LinkRecord> {
		self.rows.values().find(|record| record.matches_live(external_id, environment))
	}

	fn live_mut(
		&mut self,
		external_id: &LinkId,
		environment: Option<Environment>,
	) -> Option<&mut LinkRecord> {
		self.rows.values_mut().find(|record| record.matches_live(external_id, environment))
	}

	fn insert(&mut self, draft: LinkDraft, now: OffsetDateTime) -> Result<LinkRecord, StoreError> {
		if self.live(&draft.external_id, Some(draft.environment)).is_some() {
			return Err(StoreError::Conflict {
				external_id: draft.external_id.to_string(),
				environment: draft.environment,
			});
		}

		self.next_id += 1;

		let record = LinkRecord {
			id: self.next_id,
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
		};

		self.rows.insert(record.id, record.clone());

		Ok(record)
	}

	fn collect<F>(&self, mut keep: F) -> Vec<LinkRecord>
	where
		F: FnMut(&LinkRecord) -> bool,
	{
		let mut records: Vec<_> = self
			.rows
			.values()
			.filter(|record| !record.is_deleted() && keep(record))
			.cloned()
			.collect();

		store::sort_newest_first(&mut records);

		records
	}
}

/// Thread-safe storage backend that keeps records in-process for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Arc<RwLock<MemoryInner>>);
impl LinkStore for MemoryStore {
	fn create(&self, draft: LinkDraft) -> StoreFuture<'_, LinkRecord> {
		let inner = self.0.clone();

		Box::pin(async move { inner.write().insert(draft, OffsetDateTime::now_utc()) })
	}

	fn find_by_external_id<'a>(
		&'a self,
		external_id: &'a LinkId,
		environment: Option<Environment>,
	) -> StoreFuture<'a, Option<LinkRecord>> {
		Box::pin(async move { Ok(self.0.read().live(external_id, environment).cloned()) })
	}

	fn find_by_owner<'a>(
		&'a self,
		owner: &'a OwnerId,
		environment: Option<Environment>,
	) -> StoreFuture<'a, Vec<LinkRecord>> {
		Box::pin(async move {
			Ok(self.0.read().collect(|record| {
				record.owner == *owner
					&& environment.is_none_or(|wanted| record.environment == wanted)
			}))
		})
	}

	fn list_all(&self) -> StoreFuture<'_, Vec<LinkRecord>> {
		Box::pin(async move { Ok(self.0.read().collect(|_| true)) })
	}

	fn update<'a>(
		&'a self,
		external_id: &'a LinkId,
		update: LinkUpdate,
	) -> StoreFuture<'a, Option<LinkRecord>> {
		Box::pin(async move {
			if update.is_empty() {
				return Ok(None);
			}

			let mut guard = self.0.write();
			let Some(record) = guard.live_mut(external_id, None) else {
				return Ok(None);
			};

			update.apply(record);

			record.updated_at = OffsetDateTime::now_utc();

			Ok(Some(record.clone()))
		})
	}

	fn soft_delete<'a>(
		&'a self,
		external_id: &'a LinkId,
		environment: Option<Environment>,
	) -> StoreFuture<'a, Option<LinkRecord>> {
		Box::pin(async move {
			let mut guard = self.0.write();
			let Some(record) = guard.live_mut(external_id, environment) else {
				return Ok(None);
			};

			record.soft_delete(OffsetDateTime::now_utc());

			Ok(Some(record.clone()))
		})
	}
}
