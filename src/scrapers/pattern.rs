//! Literal-pattern listing extractor

use anyhow::{Context, Result};
use regex::Regex;

use super::decode_entities;
use crate::models::RawEntry;
use crate::traits::RecordExtractor;

/// One catalog entry exactly as the listing endpoint renders it:
/// id, link path, image, name, rating.
const LISTING_PATTERN: &str = r#"<div class="thumb" id='game-(\d+)'><a href="([^"]+)"><img src='([^']+)' alt="[^"]*"  /><span class='GameName'>(.*?)</span><span class='GameRating'>([\d.]+)</span></a></div>"#;

/// Extracts entries with a single left-to-right regex scan
pub struct PatternExtractor {
    pattern: Regex,
}

impl PatternExtractor {
    pub fn new() -> Result<Self> {
        let pattern = Regex::new(LISTING_PATTERN).context("Failed to compile listing pattern")?;
        Ok(Self { pattern })
    }
}

impl RecordExtractor for PatternExtractor {
    fn name(&self) -> &'static str {
        "pattern"
    }

    fn extract(&self, html: &str) -> Result<Vec<RawEntry>> {
        let entries = self
            .pattern
            .captures_iter(html)
            .map(|caps| RawEntry {
                id: caps[1].to_string(),
                path: caps[2].to_string(),
                image: caps[3].to_string(),
                name: decode_entities(&caps[4]),
                rating: caps[5].to_string(),
            })
            .collect();

        Ok(entries)
    }
}
