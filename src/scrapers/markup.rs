//! HTML-parsing listing extractor

use anyhow::Result;
use scraper::{ElementRef, Html, Selector};

use crate::models::RawEntry;
use crate::traits::RecordExtractor;

/// CSS selectors for the parts of one listing entry
#[derive(Debug, Clone)]
pub struct EntrySelectors {
    /// Container for a single entry; its `id` carries the game id
    pub container: String,
    pub link: String,
    pub image: String,
    pub name: String,
    pub rating: String,
}

impl Default for EntrySelectors {
    fn default() -> Self {
        Self {
            container: "div.thumb".to_string(),
            link: "a[href]".to_string(),
            image: "img[src]".to_string(),
            name: "span.GameName".to_string(),
            rating: "span.GameRating".to_string(),
        }
    }
}

/// Extracts entries from a parsed document, independent of attribute order
pub struct MarkupExtractor {
    selectors: EntrySelectors,
}

impl MarkupExtractor {
    pub fn new() -> Self {
        Self {
            selectors: EntrySelectors::default(),
        }
    }
}

fn parse_selector(selector: &str, what: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| anyhow::anyhow!("Failed to parse {what} selector: {:?}", e))
}

fn text_of(element: &ElementRef, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
}

fn is_rating(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit() || c == '.')
}

impl RecordExtractor for MarkupExtractor {
    fn name(&self) -> &'static str {
        "markup"
    }

    fn extract(&self, html: &str) -> Result<Vec<RawEntry>> {
        let container_selector = parse_selector(&self.selectors.container, "container")?;
        let link_selector = parse_selector(&self.selectors.link, "link")?;
        let image_selector = parse_selector(&self.selectors.image, "image")?;
        let name_selector = parse_selector(&self.selectors.name, "name")?;
        let rating_selector = parse_selector(&self.selectors.rating, "rating")?;

        let document = Html::parse_document(html);
        let mut entries = Vec::new();

        for container in document.select(&container_selector) {
            let Some(id) = container
                .value()
                .id()
                .and_then(|id| id.strip_prefix("game-"))
                .filter(|id| !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()))
            else {
                continue;
            };

            let Some(path) = container
                .select(&link_selector)
                .next()
                .and_then(|a| a.value().attr("href"))
            else {
                continue;
            };

            let Some(image) = container
                .select(&image_selector)
                .next()
                .and_then(|img| img.value().attr("src"))
            else {
                continue;
            };

            let (Some(name), Some(rating)) = (
                text_of(&container, &name_selector),
                text_of(&container, &rating_selector).filter(|r| is_rating(r)),
            ) else {
                continue;
            };

            entries.push(RawEntry {
                id: id.to_string(),
                path: path.to_string(),
                image: image.to_string(),
                name,
                rating,
            });
        }

        Ok(entries)
    }
}
