use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::assets::{AssetFetcher, AssetReport};
use crate::client::HttpClient;
use crate::config::Config;
use crate::extractor::{ExtractionReport, Extractor};
use crate::merger::{self, MergeReport, Merger};
use crate::scrapers::build_extractor;
use crate::store::RecordStore;
use crate::traits::HttpSource;

/// Runs the ingestion stages against one configuration
#[derive(Clone)]
pub struct CatalogPipeline {
    config: Config,
    source: Arc<dyn HttpSource>,
}

impl CatalogPipeline {
    pub fn new(config: Config) -> Result<Self> {
        let client = HttpClient::new(&config.user_agent, config.timeout)?;
        Ok(Self::with_source(config, Arc::new(client)))
    }

    pub fn with_source(config: Config, source: Arc<dyn HttpSource>) -> Self {
        Self { config, source }
    }

    pub async fn extract(&self) -> Result<ExtractionReport> {
        let store = RecordStore::create(&self.config.records_dir).await?;
        let extractor = Extractor::new(
            Arc::clone(&self.source),
            build_extractor(self.config.extractor)?,
            self.config.source.clone(),
            store,
        );

        let report = extractor.run(&self.config.source.endpoints()).await?;
        for endpoint in &report.endpoints {
            info!(
                "{}: {} found, {} saved{}",
                endpoint.url,
                endpoint.found,
                endpoint.saved,
                endpoint.error.as_deref().map(|e| format!(" ({e})")).unwrap_or_default()
            );
        }

        Ok(report)
    }

    pub async fn merge(&self) -> Result<MergeReport> {
        let store = RecordStore::open(&self.config.records_dir).await?;
        let (_, report) = Merger::new(store, &self.config.catalog_path).merge().await?;
        Ok(report)
    }

    pub async fn download_images(&self) -> Result<AssetReport> {
        info!("Reading games from {}...", self.config.catalog_path.display());
        let games = merger::read_catalog(&self.config.catalog_path).await?;

        AssetFetcher::new(
            Arc::clone(&self.source),
            &self.config.images_dir,
            self.config.concurrency,
        )?
        .fetch_all(&games)
        .await
    }

    /// Extract, merge and download, stopping at the first fatal error
    pub async fn run_all(&self) -> Result<()> {
        let extraction = self.extract().await?;
        let merge = self.merge().await?;
        let assets = self.download_images().await?;

        info!(
            "Pipeline finished: {} records extracted, {} merged ({} skipped), {} images downloaded",
            extraction.total_saved(),
            merge.merged,
            merge.skipped.len(),
            assets.downloaded
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::tests::StubSource;
    use crate::scrapers::fixtures;

    fn config(root: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.source.origin = "https://games.test".to_string();
        config.source.kinds = vec!["hot".to_string()];
        config.records_dir = root.join("games");
        config.catalog_path = root.join("web/public/games.json");
        config.images_dir = root.join("images");
        config
    }

    #[tokio::test]
    async fn end_to_end_with_stub_site() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path());
        let listing_url = config.source.listing_url("hot");
        let source = StubSource::default()
            .with(&listing_url, 200, fixtures::listing())
            .with("https://cdn.test/thumb/Foo-Game.jpg", 200, b"foo-bytes".to_vec())
            .with("https://cdn.test/thumb/Bar-Game.jpg", 200, b"bar-bytes".to_vec());
        let pipeline = CatalogPipeline::with_source(config, Arc::new(source));

        let extraction = pipeline.extract().await.unwrap();
        assert_eq!(extraction.total_saved(), 2);
        assert_eq!(std::fs::read_dir(tmp.path().join("games")).unwrap().count(), 2);

        let merge = pipeline.merge().await.unwrap();
        assert_eq!(merge.merged, 2);
        let catalog = merger::read_catalog(&tmp.path().join("web/public/games.json")).await.unwrap();
        assert_eq!(catalog.len(), 2);

        let assets = pipeline.download_images().await.unwrap();
        assert_eq!(assets.downloaded, 2);

        let mut images: Vec<_> = std::fs::read_dir(tmp.path().join("images"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        images.sort();
        assert_eq!(images, vec!["Bar-Game.jpg", "Foo-Game.jpg"]);
        assert_eq!(std::fs::read(tmp.path().join("images/Foo-Game.jpg")).unwrap(), b"foo-bytes");
    }

    #[tokio::test]
    async fn second_run_downloads_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path());
        let listing_url = config.source.listing_url("hot");
        let source = Arc::new(
            StubSource::default()
                .with(&listing_url, 200, fixtures::listing())
                .with("https://cdn.test/thumb/Foo-Game.jpg", 200, b"foo".to_vec())
                .with("https://cdn.test/thumb/Bar-Game.jpg", 200, b"bar".to_vec()),
        );
        let pipeline = CatalogPipeline::with_source(config, source.clone());

        pipeline.run_all().await.unwrap();
        let requests_after_first = source.requested().len();
        pipeline.run_all().await.unwrap();

        // only the listing is fetched again
        assert_eq!(source.requested().len(), requests_after_first + 1);
    }

    #[tokio::test]
    async fn merge_without_record_store_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let pipeline = CatalogPipeline::with_source(config(tmp.path()), Arc::new(StubSource::default()));

        assert!(pipeline.merge().await.is_err());
    }
}
