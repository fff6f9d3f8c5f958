//! Fetching payload bytes for a [`Url`] resource.

pub mod engine;
pub mod progress;

pub use engine::HttpDownloader;
pub use progress::{DownloadProgress, ProgressTracker};

use anyhow::Result;
use async_trait::async_trait;

use crate::model::{File, Url};

#[async_trait]
pub trait Downloader: Send + Sync {
    fn supports(&self, url: &Url) -> bool;

    async fn fetch(&self, url: &Url) -> Result<Vec<u8>>;
}

/// First resource of `file`, in document order, that `downloader` can fetch.
pub fn first_supported<'a>(file: &'a File, downloader: &dyn Downloader) -> Option<&'a Url> {
    file.resources().find(|url| downloader.supports(url))
}
