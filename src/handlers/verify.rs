use anyhow::{Context, Result};
use console::{Term, style};
use plml::config::ConfigManager;
use plml::{Descriptor, File, Outcome, Summary, VerificationEngine};
use std::path::PathBuf;
use std::process;
use tracing::warn;

use super::{load_metalink, outcome_label, select_files};

pub async fn handle_verify(
    config_manager: &ConfigManager,
    metalink: PathBuf,
    payload: PathBuf,
    file_name: Option<String>,
) -> Result<()> {
    let document = load_metalink(config_manager, &metalink)?;
    let files = select_files(&document, file_name.as_deref())?;
    if files.len() > 1 {
        warn!(
            "document lists {} files, verifying against the first; use --file to choose",
            files.len()
        );
    }
    let file = files[0];

    let data = tokio::fs::read(&payload)
        .await
        .with_context(|| format!("Failed to read payload: {:?}", payload))?;

    let term = Term::stdout();
    term.write_line(&format!(
        "{} Verifying {} against {}",
        style("🔍").cyan(),
        style(payload.display()).bold(),
        style(file).green()
    ))?;

    if let Some(size) = file.known_size() {
        if size != data.len() as u64 {
            term.write_line(&format!(
                "   {} size {} differs from listed {}",
                style("⚠️").yellow(),
                data.len(),
                size
            ))?;
        }
    }

    let engine = config_manager.verification_engine();
    let (summary, _) = run_checks(&term, engine, file, data).await?;

    if summary.is_verified() {
        term.write_line(&format!("{} Payload verified", style("✅").green()))?;
        Ok(())
    } else {
        term.write_line(&format!(
            "{} Verification failed ({} matched, {} mismatched, {} not checked)",
            style("❌").red(),
            summary.matched,
            summary.mismatched,
            summary.unsupported + summary.unavailable
        ))?;
        process::exit(1);
    }
}

/// Run every descriptor of `file` on a blocking thread and print one line
/// per result. The payload is handed back once the checks are done.
pub async fn run_checks(
    term: &Term,
    engine: VerificationEngine,
    file: &File,
    payload: Vec<u8>,
) -> Result<(Summary, Vec<u8>)> {
    let descriptors: Vec<Descriptor> = file.descriptors().to_vec();
    let (descriptors, outcomes, payload) = tokio::task::spawn_blocking(move || {
        let outcomes: Vec<Outcome> = engine
            .verify(&descriptors, &payload)
            .map(|result| result.outcome)
            .collect();
        (descriptors, outcomes, payload)
    })
    .await
    .context("Verification task panicked")?;

    if descriptors.is_empty() {
        term.write_line(&format!(
            "   {} no verification descriptors listed",
            style("⚠️").yellow()
        ))?;
    }

    let mut summary = Summary::default();
    for (descriptor, outcome) in descriptors.iter().zip(&outcomes) {
        term.write_line(&format!("   {:<24} {}", descriptor.to_string(), outcome_label(outcome)))?;
        summary.record(outcome);
    }
    Ok((summary, payload))
}
