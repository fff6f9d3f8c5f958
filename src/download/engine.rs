use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::{DownloadProgress, Downloader};
use crate::config::FetchConfig;
use crate::model::Url;

const PROGRESS_UPDATE_INTERVAL: Duration = Duration::from_millis(250);

/// Plain HTTP(S) downloader buffering the payload in memory.
pub struct HttpDownloader {
    client: Client,
    progress_sender: Option<mpsc::UnboundedSender<DownloadProgress>>,
}

impl HttpDownloader {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            progress_sender: None,
        })
    }

    pub fn with_progress(mut self, sender: mpsc::UnboundedSender<DownloadProgress>) -> Self {
        self.progress_sender = Some(sender);
        self
    }

    fn report(&self, event: DownloadProgress) {
        if let Some(sender) = &self.progress_sender {
            let _ = sender.send(event);
        }
    }

    async fn download(&self, url: &Url) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(&url.uri)
            .send()
            .await
            .context("Failed to send HTTP request")?;

        if !response.status().is_success() {
            bail!("HTTP request failed with status: {}", response.status());
        }

        let total_bytes = response.content_length();
        self.report(DownloadProgress::Started {
            uri: url.uri.clone(),
            total_bytes,
        });

        let mut payload = Vec::with_capacity(total_bytes.unwrap_or(0).min(64 * 1024 * 1024) as usize);
        let mut last_progress_update = Instant::now();
        let mut last_bytes = 0u64;

        let mut stream = response.bytes_stream();
        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.context("Failed to read chunk from response")?;
            payload.extend_from_slice(&chunk);

            if last_progress_update.elapsed() >= PROGRESS_UPDATE_INTERVAL {
                let downloaded = payload.len() as u64;
                let elapsed = last_progress_update.elapsed().as_secs_f64();
                let speed_bps = if elapsed > 0.0 {
                    ((downloaded - last_bytes) as f64 / elapsed) as u64
                } else {
                    0
                };

                self.report(DownloadProgress::Progress {
                    bytes_downloaded: downloaded,
                    total_bytes,
                    speed_bps,
                });

                last_progress_update = Instant::now();
                last_bytes = downloaded;
            }
        }

        Ok(payload)
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    fn supports(&self, url: &Url) -> bool {
        matches!(url.kind(), Some(kind) if kind.eq_ignore_ascii_case("http") || kind.eq_ignore_ascii_case("https"))
    }

    async fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        if !self.supports(url) {
            bail!("Unsupported resource type for {}", url);
        }
        debug!("fetching {}", url.uri);

        match self.download(url).await {
            Ok(payload) => {
                info!("downloaded {} bytes from {}", payload.len(), url.uri);
                self.report(DownloadProgress::Completed {
                    bytes_downloaded: payload.len() as u64,
                });
                Ok(payload)
            }
            Err(e) => {
                self.report(DownloadProgress::Failed {
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }
}
