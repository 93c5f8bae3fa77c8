use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::models::GameRecord;
use crate::store::RecordStore;

#[derive(Debug, Clone, Default)]
pub struct MergeReport {
    pub merged: usize,
    /// Record files that could not be read or parsed
    pub skipped: Vec<PathBuf>,
}

/// Combines the record store into one catalog array
pub struct Merger {
    store: RecordStore,
    output: PathBuf,
}

impl Merger {
    pub fn new(store: RecordStore, output: impl Into<PathBuf>) -> Self {
        Self {
            store,
            output: output.into(),
        }
    }

    /// Reads every record file in listing order and writes the catalog.
    ///
    /// Unparsable files are logged and left out; they never fail the merge.
    pub async fn merge(&self) -> Result<(Vec<GameRecord>, MergeReport)> {
        info!("Reading files from {}", self.store.dir().display());

        let files = self.store.record_files().await?;
        info!("Found {} JSON files", files.len());

        let mut games = Vec::with_capacity(files.len());
        let mut report = MergeReport::default();

        for file in files {
            match read_record(&file).await {
                Ok(game) => games.push(game),
                Err(e) => {
                    warn!("Failed to parse {}: {:#}", file.display(), e);
                    report.skipped.push(file);
                }
            }
        }

        report.merged = games.len();
        info!("Merged {} games", report.merged);

        write_catalog(&self.output, &games).await?;
        info!("Wrote catalog to {}", self.output.display());

        Ok((games, report))
    }
}

async fn read_record(path: &Path) -> Result<GameRecord> {
    let content = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&content)?)
}

/// Writes the catalog in full, replacing any previous file
pub async fn write_catalog(path: &Path, games: &[GameRecord]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(games)?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write catalog {}", path.display()))?;

    Ok(())
}

pub async fn read_catalog(path: &Path) -> Result<Vec<GameRecord>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read catalog {}", path.display()))?;

    serde_json::from_str(&content).with_context(|| format!("Catalog {} is not a valid game list", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> GameRecord {
        GameRecord {
            id: id.to_string(),
            name: format!("Game {id}"),
            slug: format!("Game-{id}"),
            url: format!("https://x.test/Game-{id}"),
            embed_url: format!("https://x.test/embed/Game-{id}"),
            image: format!("https://x.test/thumb/Game-{id}.jpg"),
            rating: "3.5".to_string(),
        }
    }

    #[tokio::test]
    async fn merges_valid_files_and_skips_invalid_ones() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RecordStore::create(tmp.path().join("games")).await.unwrap();
        for id in ["1", "2", "3"] {
            store.save_record(&record(id)).await.unwrap();
        }
        std::fs::write(store.path_for("bad"), "{ not json").unwrap();
        std::fs::write(store.path_for("partial"), r#"{"id":"9","name":"Nine"}"#).unwrap();
        std::fs::write(store.dir().join("readme.txt"), "not a record").unwrap();

        let output = tmp.path().join("web/public/games.json");
        let (games, report) = Merger::new(store, &output).merge().await.unwrap();

        assert_eq!(games.len(), 3);
        assert_eq!(report.merged, 3);
        assert_eq!(report.skipped.len(), 2);

        let mut catalog = read_catalog(&output).await.unwrap();
        catalog.sort_by(|a, b| a.id.cmp(&b.id));
        assert_eq!(catalog, vec![record("1"), record("2"), record("3")]);
    }

    #[tokio::test]
    async fn empty_store_writes_empty_array() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RecordStore::create(tmp.path().join("games")).await.unwrap();
        let output = tmp.path().join("games.json");

        let (games, _) = Merger::new(store, &output).merge().await.unwrap();

        assert!(games.is_empty());
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "[]");
    }

    #[tokio::test]
    async fn overwrites_previous_catalog() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RecordStore::create(tmp.path().join("games")).await.unwrap();
        store.save_record(&record("1")).await.unwrap();
        let output = tmp.path().join("games.json");
        write_catalog(&output, &[record("7"), record("8")]).await.unwrap();

        Merger::new(store, &output).merge().await.unwrap();

        assert_eq!(read_catalog(&output).await.unwrap(), vec![record("1")]);
    }
}
