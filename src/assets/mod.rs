//! Thumbnail downloader
//!
//! Entries are processed in batches of `concurrency`. Every download in a batch
//! runs concurrently and the next batch is only dispatched once the whole batch
//! has settled, so no more than `concurrency` requests are ever in flight.
//! Files that already exist are skipped without a request, which makes a rerun
//! pick up exactly the downloads that failed before.

use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result, bail};
use reqwest::Url;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::models::GameRecord;
use crate::traits::HttpSource;

const PROGRESS_INTERVAL: usize = 100;
const DEFAULT_EXTENSION: &str = ".jpg";

/// Completion counter shared by the download tasks
pub struct Progress {
    completed: AtomicUsize,
    total: usize,
    interval: usize,
}

impl Progress {
    pub fn new(total: usize) -> Self {
        Self {
            completed: AtomicUsize::new(0),
            total,
            interval: PROGRESS_INTERVAL,
        }
    }

    /// Counts one settled entry, whatever its outcome.
    ///
    /// Returns the progress line when this completion lands on a reporting
    /// interval; that line has already been printed.
    pub fn complete_one(&self) -> Option<String> {
        let completed = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        if completed % self.interval != 0 {
            return None;
        }

        let line = self.line(completed);
        print_progress(&line);
        Some(line)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    fn percent(&self, completed: usize) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            completed as f64 / self.total as f64 * 100.0
        }
    }

    fn line(&self, completed: usize) -> String {
        format!(
            "Progress: {}/{} ({:.1}%)",
            completed,
            self.total,
            self.percent(completed)
        )
    }

    /// Prints and returns the final progress line
    pub fn finish(&self) -> String {
        let line = self.line(self.completed());
        print_progress(&line);
        println!();
        line
    }
}

fn print_progress(line: &str) {
    let mut stdout = std::io::stdout().lock();
    let _ = write!(stdout, "\r{line}");
    let _ = stdout.flush();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Downloaded,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetReport {
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Batch barriers passed
    pub batches: usize,
}

impl AssetReport {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Downloaded => self.downloaded += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::Failed => self.failed += 1,
        }
    }
}

/// Extension of the image URL's last path segment, including the dot
fn image_extension(url: &str) -> Option<String> {
    let url = Url::parse(url).ok()?;
    let file_name = url.path_segments()?.last()?;

    let dot = file_name.rfind('.')?;
    if dot == 0 || dot + 1 == file_name.len() {
        return None;
    }
    Some(file_name[dot..].to_string())
}

/// Local file name for a record's thumbnail: `<slug><ext>`
pub fn image_filename(record: &GameRecord) -> String {
    let ext = image_extension(&record.image).unwrap_or_else(|| DEFAULT_EXTENSION.to_string());
    format!("{}{}", record.slug, ext)
}

/// A slug must name exactly one plain file inside the image directory
fn is_safe_slug(slug: &str) -> bool {
    if slug.is_empty() || slug.contains(['/', '\\']) {
        return false;
    }

    let mut components = Path::new(slug).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Downloads catalog thumbnails into one directory
pub struct AssetFetcher {
    source: Arc<dyn HttpSource>,
    images_dir: PathBuf,
    concurrency: usize,
}

impl AssetFetcher {
    pub fn new(source: Arc<dyn HttpSource>, images_dir: impl Into<PathBuf>, concurrency: usize) -> Result<Self> {
        if concurrency == 0 {
            bail!("Download concurrency must be at least 1");
        }

        Ok(Self {
            source,
            images_dir: images_dir.into(),
            concurrency,
        })
    }

    pub async fn fetch_all(&self, games: &[GameRecord]) -> Result<AssetReport> {
        tokio::fs::create_dir_all(&self.images_dir)
            .await
            .with_context(|| format!("Failed to create image directory {}", self.images_dir.display()))?;

        info!(
            "Found {} games. Starting download to {}...",
            games.len(),
            self.images_dir.display()
        );

        let progress = Arc::new(Progress::new(games.len()));
        let mut report = AssetReport::default();

        for batch in games.chunks(self.concurrency) {
            let mut tasks = JoinSet::new();

            for game in batch {
                let source = Arc::clone(&self.source);
                let images_dir = self.images_dir.clone();
                let progress = Arc::clone(&progress);
                let game = game.clone();

                tasks.spawn(async move {
                    let outcome = download_image(source.as_ref(), &images_dir, &game).await;
                    progress.complete_one();
                    outcome
                });
            }

            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(outcome) => report.record(outcome),
                    Err(e) => {
                        error!("Download task panicked: {}", e);
                        report.record(Outcome::Failed);
                    }
                }
            }

            report.batches += 1;
            debug!("Batch {} settled ({} entries)", report.batches, batch.len());
        }

        progress.finish();
        info!(
            "Download complete: {} downloaded, {} already present, {} failed",
            report.downloaded, report.skipped, report.failed
        );

        Ok(report)
    }
}

async fn download_image(source: &dyn HttpSource, images_dir: &Path, game: &GameRecord) -> Outcome {
    if !is_safe_slug(&game.slug) {
        error!("Refusing to download {}: slug '{}' is not a plain file name", game.id, game.slug);
        return Outcome::Failed;
    }

    let path = images_dir.join(image_filename(game));

    if tokio::fs::try_exists(&path).await.unwrap_or(false) {
        return Outcome::Skipped;
    }

    match fetch_to_file(source, &game.image, &path).await {
        Ok(()) => {
            debug!("Downloaded: {}", path.display());
            Outcome::Downloaded
        }
        Err(e) => {
            error!("Error downloading {}: {:#}", game.slug, e);
            Outcome::Failed
        }
    }
}

async fn fetch_to_file(source: &dyn HttpSource, url: &str, path: &Path) -> Result<()> {
    let response = source.get(url).await?;
    if !response.is_success() {
        bail!("Failed to fetch {}: status {}", url, response.status);
    }

    tokio::fs::write(path, &response.body)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(())
}
