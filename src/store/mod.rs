//! File-per-record survey store.
//!
//! Each submission becomes one self-contained, pretty-printed JSON file
//! under the store directory. Filenames are derived from the sanitized
//! participant id and the write timestamp, so a participant submitting
//! twice lands in two different files under normal operation. Two writes
//! with the same id inside the same millisecond derive the same name and
//! silently overwrite one another; that race is accepted and documented
//! rather than guarded against.

use std::io;
use std::path::{Path, PathBuf};

use futures::future::{try_join_all, BoxFuture, FutureExt};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};

use crate::models::{StoredRecord, SurveyRecord};

/// File extension (without dot) for persisted records.
pub const RECORD_EXTENSION: &str = "json";

/// Storage failure. Messages carry paths for the operator log; public
/// handlers convert these into generic responses and never forward the
/// detail to callers.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to create record store directory {dir}")]
    CreateDir {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to serialize survey record")]
    Serialize(#[source] serde_json::Error),
    #[error("failed to write record file {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to list record store directory {dir}")]
    List {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read record file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed record file {path}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Storage seam between the submission writer and the reader/aggregator.
///
/// Keeping the two sides behind `append`/`scan_all` lets a future
/// embedded log or key-value backend replace the directory scan without
/// touching any read-side logic.
pub trait RecordStore: Send + Sync {
    /// Durably persist one record. Every call writes a new file; the
    /// operation is explicitly non-idempotent.
    fn append(&self, record: SurveyRecord) -> BoxFuture<'_, Result<(), StoreError>>;

    /// One enumeration pass over the store. A missing store directory is
    /// the normal empty state, not an error.
    fn scan_all(&self) -> BoxFuture<'_, Result<Vec<StoredRecord>, StoreError>>;
}

/// Replace every non-ASCII-alphanumeric character in the participant id
/// with `_`.
pub fn sanitize_participant_id(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Replace `:` and `.` in an ISO-8601 timestamp with `-` so it is safe
/// in a filename.
pub fn sanitize_timestamp(timestamp: &str) -> String {
    timestamp
        .chars()
        .map(|c| match c {
            ':' | '.' => '-',
            other => other,
        })
        .collect()
}

/// Derive the record filename: `survey_<sanitized-id>_<sanitized-ts>.json`.
pub fn derive_filename(participant_id: &str, timestamp: &str) -> String {
    format!(
        "survey_{}_{}.{}",
        sanitize_participant_id(participant_id),
        sanitize_timestamp(timestamp),
        RECORD_EXTENSION
    )
}

fn is_record_file(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e == RECORD_EXTENSION)
}

/// Directory-backed [`RecordStore`].
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    async fn write_record(&self, record: SurveyRecord) -> Result<(), StoreError> {
        // Idempotent and safe to race with other writers.
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| StoreError::CreateDir {
                dir: self.dir.clone(),
                source,
            })?;

        let json = serde_json::to_string_pretty(&record).map_err(StoreError::Serialize)?;
        let path = self
            .dir
            .join(derive_filename(&record.participant_id, &record.timestamp));

        fs::write(&path, json)
            .await
            .map_err(|source| StoreError::Write {
                path: path.clone(),
                source,
            })?;

        debug!(path = %path.display(), "stored survey record");
        Ok(())
    }

    async fn scan_directory(&self) -> Result<Vec<StoredRecord>, StoreError> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            // No directory means no submission has ever been stored.
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::List {
                    dir: self.dir.clone(),
                    source,
                })
            }
        };

        let mut filenames = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|source| StoreError::List {
                dir: self.dir.clone(),
                source,
            })?
        {
            let name = entry.file_name().to_string_lossy().to_string();
            if !is_record_file(&name) {
                continue;
            }
            let is_file = entry
                .file_type()
                .await
                .map(|t| t.is_file())
                .unwrap_or(false);
            if is_file {
                filenames.push(name);
            }
        }

        let reads = filenames.into_iter().map(|name| self.read_record(name));
        let records = try_join_all(reads).await?;
        Ok(records.into_iter().flatten().collect())
    }

    /// Read and parse a single record file. Returns `Ok(None)` when the
    /// file vanished between listing and reading; a present-but-malformed
    /// file fails the whole scan.
    async fn read_record(&self, filename: String) -> Result<Option<StoredRecord>, StoreError> {
        let path = self.dir.join(&filename);

        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "record file vanished mid-scan");
                return Ok(None);
            }
            Err(source) => return Err(StoreError::Read { path, source }),
        };

        let record: SurveyRecord = serde_json::from_str(&content)
            .map_err(|source| StoreError::Malformed { path, source })?;

        Ok(Some(StoredRecord { filename, record }))
    }
}

impl RecordStore for FileStore {
    fn append(&self, record: SurveyRecord) -> BoxFuture<'_, Result<(), StoreError>> {
        self.write_record(record).boxed()
    }

    fn scan_all(&self) -> BoxFuture<'_, Result<Vec<StoredRecord>, StoreError>> {
        self.scan_directory().boxed()
    }
}
