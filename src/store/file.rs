//! Simple file-backed [`LinkStore`] for lightweight single-process deployments.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	link::{Environment, LinkDraft, LinkId, LinkRecord, LinkUpdate, OwnerId},
	store::{self, LinkStore, StoreError, StoreFuture},
};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
	next_id: u64,
	records: Vec<LinkRecord>,
}
impl Snapshot {
	fn live(
		&self,
		external_id: &LinkId,
		environment: Option<Environment>,
	) -> Option<&LinkRecord> {
		self.records.iter().find(|record| record.matches_live(external_id, environment))
	}

	fn live_mut(
		&mut self,
		external_id: &LinkId,
		environment: Option<Environment>,
	) -> Option<&mut LinkRecord> {
		self.records.iter_mut().find(|record| record.matches_live(external_id, environment))
	}
}

/// Persists link records to a JSON file after each mutation.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<Snapshot>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = if path.exists() { Self::load_snapshot(&path)? } else { Snapshot::default() };

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	fn load_snapshot(path: &Path) -> Result<Snapshot, StoreError> {
		let metadata = path.metadata().map_err(|e| StoreError::Backend {
			message: format!("Failed to inspect {}: {e}", path.display()),
		})?;

		if metadata.len() == 0 {
			return Ok(Snapshot::default());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}
		Ok(())
	}

	fn persist_locked(&self, contents: &Snapshot) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized =
			serde_json::to_vec_pretty(contents).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize store snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl LinkStore for FileStore {
	fn create(&self, draft: LinkDraft) -> StoreFuture<'_, LinkRecord> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			if guard.live(&draft.external_id, Some(draft.environment)).is_some() {
				return Err(StoreError::Conflict {
					external_id: draft.external_id.to_string(),
					environment: draft.environment,
				});
			}

			guard.next_id += 1;

			let now = OffsetDateTime::now_utc();
			let record = LinkRecord {
				id: guard.next_id,
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

			guard.records.push(record.clone());
			self.persist_locked(&guard)?;

			Ok(record)
		})
	}

	fn find_by_external_id<'a>(
		&'a self,
		external_id: &'a LinkId,
		environment: Option<Environment>,
	) -> StoreFuture<'a, Option<LinkRecord>> {
		Box::pin(async move { Ok(self.inner.read().live(external_id, environment).cloned()) })
	}

	fn find_by_owner<'a>(
		&'a self,
		owner: &'a OwnerId,
		environment: Option<Environment>,
	) -> StoreFuture<'a, Vec<LinkRecord>> {
		Box::pin(async move {
			let guard = self.inner.read();
			let mut records: Vec<_> = guard
				.records
				.iter()
				.filter(|record| {
					!record.is_deleted()
						&& record.owner == *owner
						&& environment.is_none_or(|wanted| record.environment == wanted)
				})
				.cloned()
				.collect();

			store::sort_newest_first(&mut records);

			Ok(records)
		})
	}

	fn list_all(&self) -> StoreFuture<'_, Vec<LinkRecord>> {
		Box::pin(async move {
			let guard = self.inner.read();
			let mut records: Vec<_> =
				guard.records.iter().filter(|record| !record.is_deleted()).cloned().collect();

			store::sort_newest_first(&mut records);

			Ok(records)
		})
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

			let mut guard = self.inner.write();
			let Some(record) = guard.live_mut(external_id, None) else {
				return Ok(None);
			};

			update.apply(record);

			record.updated_at = OffsetDateTime::now_utc();

			let updated = record.clone();

			self.persist_locked(&guard)?;

			Ok(Some(updated))
		})
	}

	fn soft_delete<'a>(
		&'a self,
		external_id: &'a LinkId,
		environment: Option<Environment>,
	) -> StoreFuture<'a, Option<LinkRecord>> {
		Box::pin(async move {
			let mut guard = self.inner.write();
			let Some(record) = guard.live_mut(external_id, environment) else {
				return Ok(None);
			};

			record.soft_delete(OffsetDateTime::now_utc());

			let deleted = record.clone();

			self.persist_locked(&guard)?;

			Ok(Some(deleted))
		})
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// crates.io
	use tokio::runtime::Runtime;
	// self
	use super::*;
	use crate::link::{AccessCredential, ProductSet};

	fn temp_path() -> PathBuf {
		let unique = format!(
			"link_broker_file_store_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	fn build_draft(external_id: &str) -> LinkDraft {
		let external_id = LinkId::new(external_id).expect("Failed to build link fixture.");

		LinkRecord::draft(external_id, Environment::Sandbox)
			.credential("access-token")
			.products(ProductSet::new(["transactions"]).expect("Failed to build product fixture."))
			.country_codes(["US"])
			.build()
			.expect("Failed to build file-store test draft.")
	}

	#[test]
	fn create_and_reload_round_trip() {
		let path = temp_path();
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");
		let created = rt
			.block_on(store.create(build_draft("link-file-1")))
			.expect("Failed to create fixture record in file store.");

		drop(store);

		let reopened = FileStore::open(&path).expect("Failed to reopen file store snapshot.");
		let fetched = rt
			.block_on(reopened.find_by_external_id(&created.external_id, None))
			.expect("Failed to fetch fixture record from file store.")
			.expect("File store lost record after reopen.");

		assert_eq!(fetched.credential.expose(), "access-token");
		assert_eq!(fetched.id, created.id);

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}

	#[test]
	fn updates_and_deletes_survive_reload() {
		let path = temp_path();
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");

		{
			let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
			let created = rt
				.block_on(store.create(build_draft("link-file-2")))
				.expect("Failed to create fixture record in file store.");
			let update =
				LinkUpdate::default().with_credential(AccessCredential::new("access-rotated"));

			rt.block_on(store.update(&created.external_id, update))
				.expect("Failed to update fixture record in file store.")
				.expect("File store lost record before update.");
			rt.block_on(store.create(build_draft("link-file-3")))
				.expect("Failed to create second fixture record in file store.");
			rt.block_on(
				store.soft_delete(
					&LinkId::new("link-file-3").expect("Failed to build link fixture."),
					Some(Environment::Sandbox),
				),
			)
			.expect("Failed to soft-delete fixture record in file store.")
			.expect("File store lost record before delete.");
		}

		let reopened = FileStore::open(&path).expect("Failed to reopen file store snapshot.");
		let live = rt
			.block_on(reopened.list_all())
			.expect("Failed to list records from reopened file store.");

		assert_eq!(live.len(), 1, "Soft-deleted records must stay hidden after reload.");
		assert_eq!(live[0].credential.expose(), "access-rotated");

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}
}
