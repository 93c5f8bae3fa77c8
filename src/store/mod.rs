use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::models::GameRecord;

pub const RECORD_SUFFIX: &str = "json";

/// Directory of per-game record files, one `<id>.json` each
pub struct RecordStore {
    dir: PathBuf,
}

impl RecordStore {
    /// Opens the store for writing, creating the directory if needed
    pub async fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();

        if !tokio::fs::try_exists(&dir).await.unwrap_or(false) {
            info!("Creating record directory {}", dir.display());
        }
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create record directory {}", dir.display()))?;

        Ok(Self { dir })
    }

    /// Opens an existing store for reading
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();

        let metadata = tokio::fs::metadata(&dir)
            .await
            .with_context(|| format!("Record directory {} is not readable", dir.display()))?;
        if !metadata.is_dir() {
            bail!("Record store {} is not a directory", dir.display());
        }

        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.{RECORD_SUFFIX}"))
    }

    /// Writes a record, replacing any earlier record with the same id
    pub async fn save_record(&self, record: &GameRecord) -> Result<()> {
        let path = self.path_for(&record.id);
        let json = serde_json::to_string_pretty(record)?;

        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        Ok(())
    }

    /// Record files in directory listing order
    pub async fn record_files(&self) -> Result<Vec<PathBuf>> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .with_context(|| format!("Failed to list {}", self.dir.display()))?;

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == RECORD_SUFFIX) && entry.file_type().await?.is_file() {
                files.push(path);
            }
        }

        Ok(files)
    }
}

impl Clone for RecordStore {
    fn clone(&self) -> Self {
        Self {
            dir: self.dir.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, rating: &str) -> GameRecord {
        GameRecord {
            id: id.to_string(),
            name: format!("Game {id}"),
            slug: format!("Game-{id}"),
            url: format!("https://x.test/Game-{id}"),
            embed_url: format!("https://x.test/embed/Game-{id}"),
            image: format!("https://x.test/thumb/Game-{id}.jpg"),
            rating: rating.to_string(),
        }
    }

    #[tokio::test]
    async fn save_overwrites_by_id() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RecordStore::create(tmp.path().join("games")).await.unwrap();

        store.save_record(&record("5", "1.0")).await.unwrap();
        store.save_record(&record("5", "2.0")).await.unwrap();

        let files = store.record_files().await.unwrap();
        assert_eq!(files, vec![store.path_for("5")]);

        let saved: GameRecord =
            serde_json::from_str(&std::fs::read_to_string(&files[0]).unwrap()).unwrap();
        assert_eq!(saved.rating, "2.0");
    }

    #[tokio::test]
    async fn lists_only_json_files() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RecordStore::create(tmp.path()).await.unwrap();

        store.save_record(&record("1", "1.0")).await.unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();
        std::fs::create_dir(tmp.path().join("nested.json")).unwrap();

        assert_eq!(store.record_files().await.unwrap(), vec![store.path_for("1")]);
    }

    #[tokio::test]
    async fn open_requires_existing_directory() {
        let tmp = tempfile::tempdir().unwrap();

        assert!(RecordStore::open(tmp.path().join("missing")).await.is_err());
        assert!(RecordStore::open(tmp.path()).await.is_ok());
    }
}
