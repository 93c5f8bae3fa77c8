//! Traits and interfaces for pluggable extraction and HTTP access

use anyhow::Result;
use async_trait::async_trait;

use crate::models::RawEntry;

/// Status and body of a completed HTTP request
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded as UTF-8, replacing invalid sequences
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Anything that can issue a GET request.
///
/// Transport failures (unreachable host, timeout, broken body) are returned as
/// errors. A response with a non-success status is still `Ok`, callers decide
/// what a bad status means for them.
#[async_trait]
pub trait HttpSource: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpResponse>;
}

/// Turns listing markup into raw entries
pub trait RecordExtractor: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Scan a listing document and return every complete entry, in document order.
    ///
    /// Fragments missing any field are dropped without error.
    fn extract(&self, html: &str) -> Result<Vec<RawEntry>>;
}
