//! Runtime configuration, read from the environment (and `.env`)

use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use reqwest::Url;

pub const DEFAULT_ORIGIN: &str = "https://www.4j.com";
pub const DEFAULT_CONCURRENCY: usize = 50;

/// Which `RecordExtractor` reads the listing markup
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExtractorKind {
    /// Literal structural pattern over the raw text
    Pattern,
    /// Full HTML parse, tolerant of attribute order
    Markup,
}

impl FromStr for ExtractorKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pattern" | "regex" => Ok(Self::Pattern),
            "markup" | "html" => Ok(Self::Markup),
            other => Err(anyhow!("unknown extractor '{other}' (expected 'pattern' or 'markup')")),
        }
    }
}

/// Where listings come from and how their links are resolved
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Site origin, prefixed to every relative path
    pub origin: String,
    /// Path of the listing endpoint on the origin
    pub listing_path: String,
    /// Listing kinds to query, in order. Later kinds win on duplicate ids.
    pub kinds: Vec<String>,
    /// `num` parameter for each listing request
    pub page_size: u32,
    /// Path segment inserted into embed URLs
    pub embed_segment: String,
}

impl SourceConfig {
    /// Builds the listing URL for one kind
    pub fn listing_url(&self, kind: &str) -> String {
        format!(
            "{}{}?from=0&num={}&type={}",
            self.origin.trim_end_matches('/'),
            self.listing_path,
            self.page_size,
            urlencoding::encode(kind)
        )
    }

    /// Every listing URL, in query order
    pub fn endpoints(&self) -> Vec<String> {
        self.kinds.iter().map(|kind| self.listing_url(kind)).collect()
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_string(),
            listing_path: "/ajax_loadmoregames.php".to_string(),
            kinds: vec!["hot".to_string(), "new".to_string()],
            page_size: 120_000,
            embed_segment: "embed".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub source: SourceConfig,
    /// Record store: one `<id>.json` per game
    pub records_dir: PathBuf,
    /// Merged catalog file
    pub catalog_path: PathBuf,
    /// Downloaded thumbnails
    pub images_dir: PathBuf,
    /// Downloads per batch
    pub concurrency: usize,
    /// Per-request timeout
    pub timeout: Duration,
    pub user_agent: String,
    pub extractor: ExtractorKind,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            records_dir: PathBuf::from("games"),
            catalog_path: PathBuf::from("web/public/games.json"),
            images_dir: PathBuf::from("images"),
            concurrency: DEFAULT_CONCURRENCY,
            timeout: Duration::from_secs(30),
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36"
                .to_string(),
            extractor: ExtractorKind::Pattern,
        }
    }
}

impl Config {
    /// Loads configuration from `CATALOG_*` environment variables.
    ///
    /// Unset variables keep their defaults; set but unparsable ones are errors.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(origin) = lookup("CATALOG_ORIGIN") {
            config.source.origin = origin;
        }
        if let Some(kinds) = lookup("CATALOG_ENDPOINTS") {
            config.source.kinds = split_list(&kinds);
        }
        if let Some(page_size) = parse_var(&lookup, "CATALOG_PAGE_SIZE")? {
            config.source.page_size = page_size;
        }
        if let Some(segment) = lookup("CATALOG_EMBED_SEGMENT") {
            config.source.embed_segment = segment;
        }
        if let Some(dir) = lookup("CATALOG_RECORDS_DIR") {
            config.records_dir = PathBuf::from(dir);
        }
        if let Some(path) = lookup("CATALOG_OUTPUT") {
            config.catalog_path = PathBuf::from(path);
        }
        if let Some(dir) = lookup("CATALOG_IMAGES_DIR") {
            config.images_dir = PathBuf::from(dir);
        }
        if let Some(concurrency) = parse_var(&lookup, "CATALOG_CONCURRENCY")? {
            config.concurrency = concurrency;
        }
        if let Some(secs) = parse_var(&lookup, "CATALOG_TIMEOUT_SECS")? {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(user_agent) = lookup("CATALOG_USER_AGENT") {
            config.user_agent = user_agent;
        }
        if let Some(extractor) = parse_var(&lookup, "CATALOG_EXTRACTOR")? {
            config.extractor = extractor;
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            bail!("Concurrency must be at least 1");
        }
        if self.timeout.is_zero() {
            bail!("Request timeout must be at least one second");
        }
        let origin = Url::parse(&self.source.origin)
            .with_context(|| format!("Origin '{}' is not a valid URL", self.source.origin))?;
        if !matches!(origin.scheme(), "http" | "https") || origin.host_str().is_none_or(str::is_empty) {
            bail!("Origin must be an http(s) URL with a host, got '{}'", self.source.origin);
        }
        if self.source.kinds.is_empty() {
            bail!("At least one listing endpoint is required");
        }
        Ok(())
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow!("Invalid {key}='{value}': {e}")),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn defaults_query_hot_then_new() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(
            config.source.endpoints(),
            vec![
                "https://www.4j.com/ajax_loadmoregames.php?from=0&num=120000&type=hot",
                "https://www.4j.com/ajax_loadmoregames.php?from=0&num=120000&type=new",
            ]
        );
        assert_eq!(config.concurrency, 50);
        assert_eq!(config.extractor, ExtractorKind::Pattern);
        config.validate().unwrap();
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            ("CATALOG_ORIGIN", "https://games.test/"),
            ("CATALOG_ENDPOINTS", "top rated, ,new"),
            ("CATALOG_PAGE_SIZE", "10"),
            ("CATALOG_CONCURRENCY", "8"),
            ("CATALOG_TIMEOUT_SECS", "5"),
            ("CATALOG_EXTRACTOR", "HTML"),
        ]))
        .unwrap();

        assert_eq!(
            config.source.endpoints(),
            vec![
                "https://games.test/ajax_loadmoregames.php?from=0&num=10&type=top%20rated",
                "https://games.test/ajax_loadmoregames.php?from=0&num=10&type=new",
            ]
        );
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.extractor, ExtractorKind::Markup);
    }

    #[test]
    fn invalid_numbers_are_errors() {
        let err = Config::from_lookup(lookup_from(&[("CATALOG_CONCURRENCY", "many")])).unwrap_err();
        assert!(err.to_string().contains("CATALOG_CONCURRENCY"));
    }

    #[test]
    fn origin_must_be_an_http_url_with_a_host() {
        for origin in ["https://", "ftp://games.test", "games.test", "not a url"] {
            let config = Config::from_lookup(lookup_from(&[("CATALOG_ORIGIN", origin)])).unwrap();
            assert!(config.validate().is_err(), "{origin} should be rejected");
        }

        let config = Config::from_lookup(lookup_from(&[("CATALOG_ORIGIN", "http://localhost:8080")])).unwrap();
        config.validate().unwrap();
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let config = Config::from_lookup(lookup_from(&[("CATALOG_CONCURRENCY", "0")])).unwrap();
        assert!(config.validate().is_err());
    }
}
