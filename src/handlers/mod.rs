pub mod config;
pub mod fetch;
pub mod hash;
pub mod show;
pub mod verify;

use anyhow::{Context, Result, bail};
use console::style;
use plml::config::ConfigManager;
use plml::{File, Metalink, Outcome};
use std::path::Path;

pub use config::handle_config;
pub use fetch::handle_fetch;
pub use hash::handle_hash;
pub use show::handle_show;
pub use verify::handle_verify;

/// Parse `path` with the schema the config selects.
pub fn load_metalink(config_manager: &ConfigManager, path: &Path) -> Result<Metalink> {
    let schema = config_manager.load_schema()?;
    Metalink::from_path(path, &schema)
        .with_context(|| format!("Failed to load metalink document: {:?}", path))
}

/// The named file, or every file when no name is given.
pub fn select_files<'a>(metalink: &'a Metalink, name: Option<&str>) -> Result<Vec<&'a File>> {
    match name {
        Some(name) => match metalink.file(name) {
            Some(file) => Ok(vec![file]),
            None => bail!("No file named '{}' in document", name),
        },
        None if metalink.files.is_empty() => bail!("Document lists no files"),
        None => Ok(metalink.files().collect()),
    }
}

/// Colored one-word label for an outcome.
pub fn outcome_label(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Match => format!("{} match", style("✅").green()),
        Outcome::Mismatch => format!("{} MISMATCH", style("❌").red()),
        Outcome::UnsupportedAlgorithm(name) => {
            format!("{} unsupported ({})", style("⚠️").yellow(), name)
        }
        Outcome::VerificationUnavailable(reason) => {
            format!("{} unavailable ({})", style("⚠️").yellow(), reason)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plml::Schema;

    const DOCUMENT: &[u8] = br#"<metalink version="3.0"><files>
        <file name="a.iso"/>
        <file name="b.iso"/>
    </files></metalink>"#;

    #[test]
    fn selects_named_or_all_files() {
        let metalink = Metalink::parse(DOCUMENT, &Schema::builtin()).unwrap();

        let all = select_files(&metalink, None).unwrap();
        assert_eq!(all.len(), 2);

        let one = select_files(&metalink, Some("b.iso")).unwrap();
        assert_eq!(one[0].name.as_deref(), Some("b.iso"));

        assert!(select_files(&metalink, Some("c.iso")).is_err());
    }

    #[test]
    fn empty_document_has_nothing_to_select() {
        let metalink = Metalink::parse(b"<metalink/>", &Schema::builtin()).unwrap();
        assert!(select_files(&metalink, None).is_err());
    }
}
