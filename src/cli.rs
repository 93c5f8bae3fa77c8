use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::config::{Config, ExtractorKind};

/// Scrape the game listing into a JSON catalog and download its thumbnails
#[derive(Debug, Parser)]
#[command(name = "game-catalog", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Site origin prefixed to relative links
    #[arg(long, global = true)]
    pub origin: Option<String>,

    /// Listing kinds to query, in order (e.g. hot,new)
    #[arg(long, global = true, value_delimiter = ',')]
    pub kinds: Option<Vec<String>>,

    /// Entries requested per listing
    #[arg(long, global = true)]
    pub page_size: Option<u32>,

    /// Directory holding one record file per game
    #[arg(long, global = true)]
    pub records_dir: Option<PathBuf>,

    /// Merged catalog file
    #[arg(long, global = true)]
    pub output: Option<PathBuf>,

    /// Directory for downloaded thumbnails
    #[arg(long, global = true)]
    pub images_dir: Option<PathBuf>,

    /// Downloads per batch
    #[arg(long, global = true)]
    pub concurrency: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    /// User agent sent with every request
    #[arg(long, global = true)]
    pub user_agent: Option<String>,

    /// Path segment inserted into embed URLs
    #[arg(long, global = true)]
    pub embed_segment: Option<String>,

    /// How listing markup is read: literal pattern or full HTML parse
    #[arg(long, global = true, value_enum)]
    pub extractor: Option<ExtractorKind>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
pub enum Command {
    /// Fetch listings and write per-game record files
    Extract,
    /// Merge record files into the catalog
    Merge,
    /// Download thumbnails for every catalog entry
    Images,
    /// Extract, merge and download in one go
    Run,
}

impl Cli {
    /// Flags take precedence over the environment
    pub fn apply(&self, config: &mut Config) {
        if let Some(origin) = &self.origin {
            config.source.origin.clone_from(origin);
        }
        if let Some(kinds) = &self.kinds {
            config.source.kinds.clone_from(kinds);
        }
        if let Some(page_size) = self.page_size {
            config.source.page_size = page_size;
        }
        if let Some(dir) = &self.records_dir {
            config.records_dir.clone_from(dir);
        }
        if let Some(path) = &self.output {
            config.catalog_path.clone_from(path);
        }
        if let Some(dir) = &self.images_dir {
            config.images_dir.clone_from(dir);
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(secs) = self.timeout_secs {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(user_agent) = &self.user_agent {
            config.user_agent.clone_from(user_agent);
        }
        if let Some(segment) = &self.embed_segment {
            config.source.embed_segment.clone_from(segment);
        }
        if let Some(extractor) = self.extractor {
            config.extractor = extractor;
        }
    }
}
