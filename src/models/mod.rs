//! Data models for scraped game listings

use reqwest::Url;
use serde::{Deserialize, Serialize};

/// A game listing scraped from the source site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub url: String,
    #[serde(rename = "embedUrl")]
    pub embed_url: String,
    pub image: String,
    pub rating: String,
}

/// Fields captured from one listing fragment, before any URL is resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub id: String,
    /// Relative link path, e.g. `/Magic-Piano-Online`
    pub path: String,
    pub image: String,
    pub name: String,
    pub rating: String,
}

impl GameRecord {
    /// Resolves a raw entry against the site origin.
    ///
    /// `embed_segment` is inserted between the origin and the link path to
    /// form the embeddable player URL.
    pub fn from_raw(raw: RawEntry, origin: &str, embed_segment: &str) -> Self {
        let origin = origin.trim_end_matches('/');
        let path = if raw.path.starts_with('/') {
            raw.path
        } else {
            format!("/{}", raw.path)
        };

        let slug = path.trim_start_matches('/').to_string();
        let embed_segment = embed_segment.trim_matches('/');
        let embed_url = if embed_segment.is_empty() {
            format!("{origin}{path}")
        } else {
            format!("{origin}/{embed_segment}{path}")
        };

        let image = Url::parse(origin)
            .and_then(|base| base.join(&raw.image))
            .map(String::from)
            .unwrap_or(raw.image);

        Self {
            id: raw.id,
            name: raw.name,
            slug,
            url: format!("{origin}{path}"),
            embed_url,
            image,
            rating: raw.rating,
        }
    }
}
