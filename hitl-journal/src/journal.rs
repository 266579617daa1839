//! Durable newline-delimited JSON journals.

use std::fmt;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{JournalError, JournalResult};

/// Append-only store of entries of type `T`.
#[async_trait]
pub trait Journal<T>: Send + Sync
where
    T: Send + Sync + 'static,
{
    /// Appends an entry.
    async fn append(&self, entry: &T) -> JournalResult<()>;

    /// Returns the most recent `limit` entries, ordered oldest to newest.
    async fn tail(&self, limit: usize) -> JournalResult<Vec<T>>;

    /// Clears the journal contents.
    async fn clear(&self) -> JournalResult<()>;
}

/// File-backed journal writing one JSON document per line.
pub struct FileJournal<T> {
    path: PathBuf,
    file: Mutex<tokio::fs::File>,
    _entries: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for FileJournal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileJournal").field("path", &self.path).finish_non_exhaustive()
    }
}

impl<T> FileJournal<T> {
    /// Opens (or creates) a journal file at the provided path.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors encountered while preparing the file.
    pub async fn open(path: impl Into<PathBuf>) -> JournalResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(&path)
            .await?;
        debug!(path = %path.display(), "journal opened");

        Ok(Self {
            path,
            file: Mutex::new(file),
            _entries: PhantomData,
        })
    }

    /// Returns the underlying path of the journal file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl<T> Journal<T> for FileJournal<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn append(&self, entry: &T) -> JournalResult<()> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');
        let mut guard = self.file.lock().await;
        guard.write_all(&line).await?;
        guard.flush().await?;
        Ok(())
    }

    async fn tail(&self, limit: usize) -> JournalResult<Vec<T>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let data = fs::read(&self.path).await?;
        let lines: Vec<(usize, &[u8])> = data
            .split(|byte| *byte == b'\n')
            .enumerate()
            .filter(|(_, chunk)| !chunk.iter().all(u8::is_ascii_whitespace))
            .collect();

        let skip = lines.len().saturating_sub(limit);
        lines
            .into_iter()
            .skip(skip)
            .map(|(index, chunk)| {
                serde_json::from_slice(chunk).map_err(|source| JournalError::CorruptEntry {
                    line: index + 1,
                    source,
                })
            })
            .collect()
    }

    async fn clear(&self) -> JournalResult<()> {
        let mut guard = self.file.lock().await;
        guard.rewind().await?;
        guard.set_len(0).await?;
        guard.flush().await?;
        debug!(path = %self.path.display(), "journal cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use uuid::Uuid;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Note {
        text: String,
    }

    fn temp_path() -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("hitl-journal-{}.jsonl", Uuid::new_v4()));
        path
    }

    fn note(text: &str) -> Note {
        Note { text: text.into() }
    }

    #[tokio::test]
    async fn append_and_tail_keep_order() {
        let path = temp_path();
        let journal = FileJournal::<Note>::open(&path).await.unwrap();

        for text in ["one", "two", "three"] {
            journal.append(&note(text)).await.unwrap();
        }

        let tail = journal.tail(2).await.unwrap();
        assert_eq!(tail, [note("two"), note("three")]);
        assert_eq!(journal.tail(10).await.unwrap().len(), 3);

        journal.clear().await.unwrap();
        assert!(journal.tail(10).await.unwrap().is_empty());

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn reopening_appends_to_existing_entries() {
        let path = temp_path();
        FileJournal::<Note>::open(&path)
            .await
            .unwrap()
            .append(&note("first"))
            .await
            .unwrap();

        let journal = FileJournal::<Note>::open(&path).await.unwrap();
        journal.append(&note("second")).await.unwrap();
        assert_eq!(journal.tail(5).await.unwrap(), [note("first"), note("second")]);

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn corrupt_lines_are_reported_with_line_number() {
        let path = temp_path();
        std::fs::write(&path, "{\"text\":\"ok\"}\n{broken\n").unwrap();
        let journal = FileJournal::<Note>::open(&path).await.unwrap();

        let err = journal.tail(5).await.unwrap_err();
        assert!(matches!(err, JournalError::CorruptEntry { line: 2, .. }));
        assert_eq!(journal.tail(0).await.unwrap(), Vec::<Note>::new());

        let _ = std::fs::remove_file(path);
    }
}
