use anyhow::{Context, Result};
use console::{Term, style};
use plml::config::ConfigManager;
use plml::File;
use plml::model::DATE_FORMAT;
use std::path::PathBuf;

use super::load_metalink;

pub async fn handle_show(
    config_manager: &ConfigManager,
    metalink: PathBuf,
    json: bool,
    long: bool,
) -> Result<()> {
    let document = load_metalink(config_manager, &metalink)?;

    if json {
        let rendered =
            serde_json::to_string_pretty(&document).context("Failed to serialize document")?;
        println!("{}", rendered);
        return Ok(());
    }

    let term = Term::stdout();
    term.write_line(&format!(
        "{} {}",
        style("📄").cyan(),
        style(metalink.display()).bold()
    ))?;

    if let Some(version) = &document.meta_version {
        term.write_line(&format!("   Metalink version: {}", version))?;
    }
    if let Some(date) = &document.release_date {
        term.write_line(&format!("   Published: {}", date.format(DATE_FORMAT)))?;
    }
    if document.is_dynamic {
        let origin = document.origin.as_deref().unwrap_or("unknown origin");
        term.write_line(&format!("   Dynamic, refreshed from {}", origin))?;
    }
    if let Some(generator) = &document.generator {
        term.write_line(&format!("   Generator: {}", generator))?;
    }
    for (key, value) in &document.info {
        term.write_line(&format!("   {}: {}", key, value))?;
    }

    term.write_line("")?;
    term.write_line(&format!(
        "{} {} file(s)",
        style("📦").cyan(),
        document.files.len()
    ))?;
    for file in &document {
        show_file(&term, file, long)?;
    }

    Ok(())
}

fn show_file(term: &Term, file: &File, long: bool) -> Result<()> {
    term.write_line(&format!("\n   {}", style(file).green()))?;

    if let Some(id) = &file.id {
        term.write_line(&format!("     Identity: {}", id))?;
    }
    if let Some(os) = &file.os {
        term.write_line(&format!("     OS: {}", os))?;
    }
    if let Some(description) = &file.description {
        term.write_line(&format!("     {}", description))?;
    }
    if let Some(upgrade) = &file.upgrade {
        let note = if upgrade.is_valid() { "" } else { " (unrecognized)" };
        term.write_line(&format!("     Upgrade: {}{}", upgrade, note))?;
    }

    term.write_line(&format!(
        "     {} descriptor(s), {} resource(s)",
        file.verinfo.len(),
        file.resources.len()
    ))?;

    if !long {
        if let Some(first) = file.resources().next() {
            term.write_line(&format!("     🌐 {}", first))?;
        }
        return Ok(());
    }

    for descriptor in file.descriptors() {
        term.write_line(&format!("     🔐 {}", descriptor))?;
    }
    for url in file {
        term.write_line(&format!("     🌐 {}", url))?;
    }
    if let Some(multimedia) = &file.multimedia {
        for kind in multimedia.kinds() {
            term.write_line(&format!("     🎞️  {}", kind))?;
        }
    }

    Ok(())
}
