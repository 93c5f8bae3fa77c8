use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info};

use crate::config::SourceConfig;
use crate::models::GameRecord;
use crate::store::RecordStore;
use crate::traits::{HttpSource, RecordExtractor};

/// Outcome of one listing endpoint
#[derive(Debug, Clone)]
pub struct EndpointReport {
    pub url: String,
    /// Entries matched in the response
    pub found: usize,
    /// Records written to the store
    pub saved: usize,
    /// Set when the endpoint answered with a non-success status
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ExtractionReport {
    pub endpoints: Vec<EndpointReport>,
}

impl ExtractionReport {
    pub fn total_saved(&self) -> usize {
        self.endpoints.iter().map(|e| e.saved).sum()
    }

    pub fn failed_endpoints(&self) -> usize {
        self.endpoints.iter().filter(|e| e.error.is_some()).count()
    }
}

/// Fetches listing pages and writes one record per matched entry
pub struct Extractor {
    source: Arc<dyn HttpSource>,
    extractor: Box<dyn RecordExtractor>,
    config: SourceConfig,
    store: RecordStore,
}

impl Extractor {
    pub fn new(
        source: Arc<dyn HttpSource>,
        extractor: Box<dyn RecordExtractor>,
        config: SourceConfig,
        store: RecordStore,
    ) -> Self {
        Self {
            source,
            extractor,
            config,
            store,
        }
    }

    /// Processes the endpoints one after another.
    ///
    /// A non-success status only loses that endpoint. Transport failures end
    /// the run with an error.
    pub async fn run(&self, endpoints: &[String]) -> Result<ExtractionReport> {
        info!(
            "Extracting from {} endpoint(s) with the {} extractor",
            endpoints.len(),
            self.extractor.name()
        );

        let mut report = ExtractionReport::default();

        for url in endpoints {
            let endpoint = self.extract_endpoint(url).await?;
            report.endpoints.push(endpoint);
        }

        info!(
            "Saved {} records to '{}' ({} endpoint(s) failed)",
            report.total_saved(),
            self.store.dir().display(),
            report.failed_endpoints()
        );

        Ok(report)
    }

    async fn extract_endpoint(&self, url: &str) -> Result<EndpointReport> {
        info!("Fetching data from {}", url);

        let response = self.source.get(url).await?;

        if !response.is_success() {
            let message = format!("HTTP error! status: {}", response.status);
            error!("Failed to fetch listing {}: {}", url, message);
            return Ok(EndpointReport {
                url: url.to_string(),
                found: 0,
                saved: 0,
                error: Some(message),
            });
        }

        let html = response.text();
        info!("Successfully fetched {} bytes of data", html.len());

        let entries = self.extractor.extract(&html)?;
        let found = entries.len();
        info!("Found {} games", found);

        let mut saved = 0;
        for raw in entries {
            let record = GameRecord::from_raw(raw, &self.config.origin, &self.config.embed_segment);

            match self.store.save_record(&record).await {
                Ok(()) => saved += 1,
                Err(e) => error!("Error saving game {}: {:#}", record.id, e),
            }
        }

        Ok(EndpointReport {
            url: url.to_string(),
            found,
            saved,
            error: None,
        })
    }
}
