//! Transaction record repository implementations.
//!
//! Records are keyed by transaction hash and written once. The file-backed store keeps
//! one JSON document per hash. Documents are hard linked into place from a synced
//! temporary file, so concurrent writers of the same hash produce exactly one complete
//! record.

use std::{
	collections::HashMap,
	io::{ErrorKind, Write},
	path::{Path, PathBuf},
	sync::Arc,
};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
	models::{Page, Pagination, TransactionQuery, TransactionRecord},
	repositories::error::RepositoryError,
	utils::constants::DEFAULT_DATA_DIR,
};

/// Interface for transaction record storage
#[async_trait]
pub trait TransactionRepositoryTrait: Send + Sync {
	/// Looks up a record by transaction hash (case-insensitive)
	async fn find_by_hash(&self, hash: &str) -> Result<Option<TransactionRecord>, RepositoryError>;

	/// Stores a new record
	///
	/// Fails with [`RepositoryError::Duplicate`] when the hash is already stored.
	async fn insert(&self, record: TransactionRecord) -> Result<TransactionRecord, RepositoryError>;

	/// Lists records matching `query`, newest block first
	async fn list(
		&self,
		query: &TransactionQuery,
		pagination: Pagination,
	) -> Result<Page<TransactionRecord>, RepositoryError>;
}

fn normalize_hash(hash: &str) -> String {
	hash.trim().to_lowercase()
}

fn duplicate_error(hash: &str) -> RepositoryError {
	RepositoryError::duplicate(
		"Transaction already recorded",
		Some(HashMap::from([("hash".to_string(), hash.to_string())])),
	)
}

/// Orders records by block number descending, then by hash for a stable order
fn sort_newest_first(records: &mut [TransactionRecord]) {
	records.sort_by(|a, b| {
		b.block_number
			.cmp(&a.block_number)
			.then_with(|| a.transaction_hash.cmp(&b.transaction_hash))
	});
}

/// File-backed transaction repository
#[derive(Debug, Clone)]
pub struct FileTransactionRepository {
	path: PathBuf,
}

impl FileTransactionRepository {
	/// Creates the repository, creating the data directory if needed
	pub fn new(path: Option<&Path>) -> Result<Self, RepositoryError> {
		let path = path.unwrap_or(Path::new(DEFAULT_DATA_DIR)).to_path_buf();
		std::fs::create_dir_all(&path).map_err(|e| {
			RepositoryError::internal_error(
				"Failed to create data directory",
				Some(Box::new(e)),
				Some(HashMap::from([(
					"path".to_string(),
					path.display().to_string(),
				)])),
			)
		})?;
		Ok(Self { path })
	}

	fn record_path(&self, hash: &str) -> Result<PathBuf, RepositoryError> {
		let hash = normalize_hash(hash);
		let stem = hash.strip_prefix("0x").unwrap_or(&hash);
		if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_hexdigit()) {
			return Err(RepositoryError::validation_error(
				"Transaction hash must be hex",
				None,
				Some(HashMap::from([("hash".to_string(), hash.clone())])),
			));
		}
		Ok(self.path.join(format!("0x{}.json", stem)))
	}

	fn read_record(path: &Path) -> Result<Option<TransactionRecord>, RepositoryError> {
		let contents = match std::fs::read(path) {
			Ok(contents) => contents,
			Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
			Err(e) => return Err(e.into()),
		};
		serde_json::from_slice(&contents).map(Some).map_err(|e| {
			RepositoryError::load_error(
				"Failed to parse transaction record",
				Some(Box::new(e)),
				Some(HashMap::from([(
					"path".to_string(),
					path.display().to_string(),
				)])),
			)
		})
	}

	/// Publishes `record` at `path` only if nothing is there yet
	///
	/// The body is written and synced to a temporary file first, then hard linked into
	/// place. Linking fails when the target exists, and readers never see a partial
	/// record.
	fn write_new(path: &Path, record: &TransactionRecord) -> Result<(), RepositoryError> {
		let body = serde_json::to_vec_pretty(record).map_err(|e| {
			RepositoryError::internal_error("Failed to serialize record", Some(Box::new(e)), None)
		})?;

		let file_name = path
			.file_name()
			.map(|name| name.to_string_lossy().into_owned())
			.unwrap_or_default();
		let temp_path = path.with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4()));

		let result = Self::write_temp(&temp_path, &body).and_then(|_| {
			std::fs::hard_link(&temp_path, path).map_err(|e| {
				if e.kind() == ErrorKind::AlreadyExists {
					duplicate_error(&record.transaction_hash)
				} else {
					RepositoryError::internal_error(
						"Failed to publish transaction record",
						Some(Box::new(e)),
						Some(HashMap::from([(
							"path".to_string(),
							path.display().to_string(),
						)])),
					)
				}
			})
		});

		if let Err(e) = std::fs::remove_file(&temp_path) {
			if e.kind() != ErrorKind::NotFound {
				tracing::warn!(path = %temp_path.display(), error = %e, "Failed to remove temporary record");
			}
		}
		result
	}

	fn write_temp(path: &Path, body: &[u8]) -> Result<(), RepositoryError> {
		let mut file = std::fs::OpenOptions::new()
			.write(true)
			.create_new(true)
			.open(path)?;
		file.write_all(body).and_then(|_| file.sync_all()).map_err(|e| {
			RepositoryError::internal_error(
				"Failed to write transaction record",
				Some(Box::new(e)),
				None,
			)
		})
	}

	fn read_all(&self) -> Result<Vec<TransactionRecord>, RepositoryError> {
		let mut records = Vec::new();
		for entry in std::fs::read_dir(&self.path)? {
			let path = entry?.path();
			if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
				continue;
			}
			match Self::read_record(&path) {
				Ok(Some(record)) => records.push(record),
				Ok(None) => {}
				Err(e) => tracing::warn!(path = %path.display(), error = %e, "Skipping record"),
			}
		}
		Ok(records)
	}
}

#[async_trait]
impl TransactionRepositoryTrait for FileTransactionRepository {
	async fn find_by_hash(&self, hash: &str) -> Result<Option<TransactionRecord>, RepositoryError> {
		let path = self.record_path(hash)?;
		tokio::task::spawn_blocking(move || Self::read_record(&path))
			.await
			.map_err(|e| {
				RepositoryError::internal_error("Record read task failed", Some(Box::new(e)), None)
			})?
	}

	async fn insert(
		&self,
		mut record: TransactionRecord,
	) -> Result<TransactionRecord, RepositoryError> {
		record.transaction_hash = normalize_hash(&record.transaction_hash);
		let path = self.record_path(&record.transaction_hash)?;

		tokio::task::spawn_blocking(move || -> Result<TransactionRecord, RepositoryError> {
			Self::write_new(&path, &record)?;
			Ok(record)
		})
		.await
		.map_err(|e| {
			RepositoryError::internal_error("Record write task failed", Some(Box::new(e)), None)
		})?
	}

	async fn list(
		&self,
		query: &TransactionQuery,
		pagination: Pagination,
	) -> Result<Page<TransactionRecord>, RepositoryError> {
		let repository = self.clone();
		let mut records = tokio::task::spawn_blocking(move || repository.read_all())
			.await
			.map_err(|e| {
				RepositoryError::internal_error("Record scan task failed", Some(Box::new(e)), None)
			})??;

		records.retain(|record| query.matches(record));
		sort_newest_first(&mut records);
		Ok(Page::from_sorted(records, pagination))
	}
}

/// In-memory transaction repository
#[derive(Debug, Clone, Default)]
pub struct InMemoryTransactionRepository {
	records: Arc<RwLock<HashMap<String, TransactionRecord>>>,
}

impl InMemoryTransactionRepository {
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of stored records
	pub async fn len(&self) -> usize {
		self.records.read().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.records.read().await.is_empty()
	}
}

#[async_trait]
impl TransactionRepositoryTrait for InMemoryTransactionRepository {
	async fn find_by_hash(&self, hash: &str) -> Result<Option<TransactionRecord>, RepositoryError> {
		Ok(self.records.read().await.get(&normalize_hash(hash)).cloned())
	}

	async fn insert(
		&self,
		mut record: TransactionRecord,
	) -> Result<TransactionRecord, RepositoryError> {
		record.transaction_hash = normalize_hash(&record.transaction_hash);
		let mut records = self.records.write().await;
		if records.contains_key(&record.transaction_hash) {
			return Err(duplicate_error(&record.transaction_hash));
		}
		records.insert(record.transaction_hash.clone(), record.clone());
		Ok(record)
	}

	async fn list(
		&self,
		query: &TransactionQuery,
		pagination: Pagination,
	) -> Result<Page<TransactionRecord>, RepositoryError> {
		let mut records: Vec<TransactionRecord> = self
			.records
			.read()
			.await
			.values()
			.filter(|record| query.matches(record))
			.cloned()
			.collect();
		sort_newest_first(&mut records);
		Ok(Page::from_sorted(records, pagination))
	}
}

/// Service layer for read-side transaction queries
///
/// Provides a higher-level interface over a transaction repository.
#[derive(Clone)]
pub struct TransactionService<T: TransactionRepositoryTrait> {
	repository: Arc<T>,
}

impl TransactionService<FileTransactionRepository> {
	/// Create a new transaction service over the file store at `path`
	pub fn new_with_path(path: Option<&Path>) -> Result<Self, RepositoryError> {
		let repository = FileTransactionRepository::new(path)?;
		Ok(Self::new_with_repository(Arc::new(repository)))
	}
}

impl<T: TransactionRepositoryTrait> TransactionService<T> {
	pub fn new_with_repository(repository: Arc<T>) -> Self {
		Self { repository }
	}

	/// Records matching `query`, newest block first
	pub async fn get_transactions(
		&self,
		query: &TransactionQuery,
		pagination: Pagination,
	) -> Result<Page<TransactionRecord>, RepositoryError> {
		self.repository.list(query, pagination).await
	}

	/// Records written for one configuration, newest block first
	pub async fn get_transactions_by_configuration_id(
		&self,
		configuration_id: u64,
		pagination: Pagination,
	) -> Result<Page<TransactionRecord>, RepositoryError> {
		self.repository
			.list(
				&TransactionQuery::for_configuration(configuration_id),
				pagination,
			)
			.await
	}

	pub async fn get_transaction_by_hash(
		&self,
		hash: &str,
	) -> Result<Option<TransactionRecord>, RepositoryError> {
		self.repository.find_by_hash(hash).await
	}
}
