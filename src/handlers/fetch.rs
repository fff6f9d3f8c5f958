use anyhow::{Context, Result, bail};
use console::{Term, style};
use indicatif::{ProgressBar, ProgressStyle};
use plml::config::ConfigManager;
use plml::download::{self, DownloadProgress, Downloader, HttpDownloader, ProgressTracker};
use std::path::{Path, PathBuf};
use std::process;
use tokio::sync::mpsc;
use tracing::debug;

use super::verify::run_checks;
use super::{load_metalink, select_files};

pub async fn handle_fetch(
    config_manager: &ConfigManager,
    metalink: PathBuf,
    file_name: Option<String>,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let document = load_metalink(config_manager, &metalink)?;
    let files = select_files(&document, file_name.as_deref())?;
    let output_dir = output_dir.unwrap_or_else(|| config_manager.config().fetch.output_dir.clone());

    tokio::fs::create_dir_all(&output_dir)
        .await
        .with_context(|| format!("Failed to create output directory: {:?}", output_dir))?;

    let term = Term::stdout();
    let mut failures = 0;

    for file in files {
        let Some(name) = file.name.as_deref() else {
            continue;
        };
        let target = output_path(&output_dir, name)?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let downloader = HttpDownloader::new(&config_manager.config().fetch)?.with_progress(sender);
        let Some(url) = download::first_supported(file, &downloader) else {
            term.write_line(&format!(
                "{} {}: no http(s) resource listed",
                style("⚠️").yellow(),
                name
            ))?;
            failures += 1;
            continue;
        };

        term.write_line(&format!(
            "{} Fetching {} from {}",
            style("⬇️").cyan(),
            style(name).green(),
            url.uri
        ))?;

        let bar = progress_bar(file.known_size());
        let watcher = tokio::spawn(watch_progress(receiver, bar.clone()));
        let result = downloader.fetch(url).await;
        drop(downloader);
        let _ = watcher.await;

        let payload = match result {
            Ok(payload) => payload,
            Err(e) => {
                bar.abandon_with_message(format!("{} {}", style("❌").red(), e));
                failures += 1;
                continue;
            }
        };
        bar.finish_with_message(format!(
            "{} {}",
            style("✅").green(),
            ProgressTracker::format_bytes(payload.len() as u64)
        ));

        let engine = config_manager.verification_engine();
        let (summary, payload) = run_checks(&term, engine, file, payload).await?;
        if summary.mismatched > 0 {
            term.write_line(&format!(
                "{} {} failed verification, not saved",
                style("❌").red(),
                name
            ))?;
            failures += 1;
            continue;
        }

        tokio::fs::write(&target, &payload)
            .await
            .with_context(|| format!("Failed to write payload: {:?}", target))?;
        term.write_line(&format!(
            "{} Saved {}",
            style("💾").cyan(),
            style(target.display()).bold()
        ))?;
    }

    if failures > 0 {
        eprintln!("{} {} file(s) failed", style("❌").red(), failures);
        process::exit(1);
    }
    Ok(())
}

/// Join `name` onto `dir`, refusing names that would escape it.
fn output_path(dir: &Path, name: &str) -> Result<PathBuf> {
    let candidate = Path::new(name);
    let Some(file_name) = candidate.file_name() else {
        bail!("Invalid file name in document: {:?}", name);
    };
    if candidate != Path::new(file_name) {
        bail!("Refusing file name with directory components: {:?}", name);
    }
    Ok(dir.join(file_name))
}

fn progress_bar(total: Option<u64>) -> ProgressBar {
    let bar = match total {
        Some(total) => ProgressBar::new(total),
        None => ProgressBar::new_spinner(),
    };
    if let Ok(bar_style) = ProgressStyle::default_bar().template(
        "{spinner:.green} [{elapsed_precise}] [{bar:.cyan/blue}] {bytes}/{total_bytes} {msg}",
    ) {
        bar.set_style(bar_style.progress_chars("#>-"));
    }
    bar
}

async fn watch_progress(mut receiver: mpsc::UnboundedReceiver<DownloadProgress>, bar: ProgressBar) {
    while let Some(event) = receiver.recv().await {
        match event {
            DownloadProgress::Started { uri, total_bytes } => {
                debug!("started {} ({:?} bytes)", uri, total_bytes);
                if let Some(total) = total_bytes {
                    bar.set_length(total);
                }
            }
            DownloadProgress::Progress {
                bytes_downloaded,
                total_bytes,
                speed_bps,
            } => {
                bar.set_position(bytes_downloaded);
                bar.set_message(rate_message(bytes_downloaded, total_bytes, speed_bps));
            }
            DownloadProgress::Completed { bytes_downloaded } => bar.set_position(bytes_downloaded),
            DownloadProgress::Failed { error } => debug!("download failed: {}", error),
        }
    }
}

/// Speed and remaining time, e.g. `(1.5 MB/s, 2m 5s left)`.
fn rate_message(bytes_downloaded: u64, total_bytes: Option<u64>, speed_bps: u64) -> String {
    let speed = ProgressTracker::format_speed(speed_bps);
    match ProgressTracker::calculate_eta(bytes_downloaded, total_bytes, speed_bps) {
        Some(eta) => format!("({}, {} left)", speed, ProgressTracker::format_duration(eta)),
        None => format!("({})", speed),
    }
}
