use async_trait::async_trait;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, warn};

use super::{LeaderboardStore, StoreError};
use crate::models::LeaderboardEntry;

const EMPTY_DOCUMENT: &[u8] = b"[]";

/// Leaderboard kept as one JSON array document on local disk.
///
/// An unparsable document is reset to an empty leaderboard on load rather
/// than reported; the lost entries are only visible in the log.
pub struct FileStore {
    path: PathBuf,
    write_seq: AtomicU64,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_seq: AtomicU64::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn ensure_dir(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Create the directory and an empty document if missing.
    async fn ensure_file(&self) -> Result<(), StoreError> {
        self.ensure_dir().await?;

        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .await
        {
            Ok(mut file) => {
                debug!("Creating leaderboard file at {}", self.path.display());
                file.write_all(EMPTY_DOCUMENT).await?;
                file.flush().await?;
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write to a sibling temp file, then rename over the document.
    async fn replace_document(&self, bytes: &[u8]) -> Result<(), StoreError> {
        self.ensure_dir().await?;

        let seq = self.write_seq.fetch_add(1, Ordering::Relaxed);
        let mut tmp_name = OsString::from(".");
        tmp_name.push(self.path.file_name().unwrap_or_else(|| "leaderboard.json".as_ref()));
        tmp_name.push(format!(".{}.{}.tmp", std::process::id(), seq));
        let tmp_path = self.path.with_file_name(tmp_name);

        let replaced = match fs::write(&tmp_path, bytes).await {
            Ok(()) => fs::rename(&tmp_path, &self.path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = replaced {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
        Ok(())
    }
}

#[async_trait]
impl LeaderboardStore for FileStore {
    async fn load(&self) -> Result<Vec<LeaderboardEntry>, StoreError> {
        self.ensure_file().await?;

        let bytes = fs::read(&self.path).await?;
        match serde_json::from_slice::<Vec<LeaderboardEntry>>(&bytes) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                error!(
                    "Failed to read leaderboard at {}, resetting: {}",
                    self.path.display(),
                    e
                );
                self.replace_document(EMPTY_DOCUMENT).await?;
                warn!("Leaderboard reset to empty after corruption");
                Ok(Vec::new())
            }
        }
    }

    async fn save(&self, entries: &[LeaderboardEntry]) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(entries)?;
        self.replace_document(&bytes).await
    }

    fn backend(&self) -> &'static str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ranking;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn entry(name: &str, score: u64, minute: u32) -> LeaderboardEntry {
        LeaderboardEntry::new(
            name,
            score,
            Utc.with_ymd_and_hms(2024, 3, 1, 9, minute, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_load_creates_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("data").join("leaderboard.json");
        let store = FileStore::new(&path);

        let entries = store.load().await.unwrap();

        assert!(entries.is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
    }

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("leaderboard.json"));
        let board = ranking::rank(vec![entry("Ada", 120, 0), entry("Bob", 90, 1), entry("Cy", 90, 2)]);

        store.save(&board).await.unwrap();
        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, board);

        // Saving what was loaded changes nothing
        store.save(&loaded).await.unwrap();
        assert_eq!(store.load().await.unwrap(), board);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_reset() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("leaderboard.json");
        std::fs::write(&path, "{ not json").unwrap();
        let store = FileStore::new(&path);

        assert!(store.load().await.unwrap().is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
    }

    #[tokio::test]
    async fn test_wrong_shape_is_treated_as_corruption() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("leaderboard.json");
        std::fs::write(&path, r#"[{"name":"Ada","score":"lots"}]"#).unwrap();
        let store = FileStore::new(&path);

        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("leaderboard.json"));

        store.save(&[entry("Ada", 1, 0)]).await.unwrap();
        store.save(&[entry("Bob", 2, 1)]).await.unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["leaderboard.json".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_replace_removes_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("leaderboard.json");
        // A non-empty directory cannot be replaced by a rename
        std::fs::create_dir_all(path.join("occupied")).unwrap();
        let store = FileStore::new(&path);

        assert!(matches!(store.save(&[entry("Ada", 1, 0)]).await, Err(StoreError::Io(_))));

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["leaderboard.json".to_string()]);
    }

    #[tokio::test]
    async fn test_unwritable_location_is_an_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "file, not a directory").unwrap();
        let store = FileStore::new(blocker.join("leaderboard.json"));

        assert!(matches!(store.load().await, Err(StoreError::Io(_))));
        assert!(matches!(store.save(&[]).await, Err(StoreError::Io(_))));
    }
}
