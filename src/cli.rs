use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "plml")]
#[command(about = "Inspect Metalink documents and verify downloads against them")]
#[command(long_about = "
plml parses Metalink 3.0 documents into a typed model, prints their contents,
and checks payloads against every hash, piece and signature descriptor the
document lists.

Examples:
  plml show ubuntu.metalink               # Summarize files and mirrors
  plml verify ubuntu.metalink ubuntu.iso  # Check a local payload
  plml fetch ubuntu.metalink -o ~/isos    # Download, verify and save
  plml hash sha256 ubuntu.iso             # Print a single digest
")]
#[command(version)]
pub struct Cli {
    /// Override config file path
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the parsed document
    #[command(visible_alias = "s")]
    Show {
        /// Metalink document
        metalink: PathBuf,

        /// Emit the model as JSON
        #[arg(short, long)]
        json: bool,

        /// Include descriptors and every resource
        #[arg(short, long)]
        long: bool,
    },

    /// Verify a local payload against a file's descriptors
    #[command(visible_alias = "v")]
    Verify {
        /// Metalink document
        metalink: PathBuf,

        /// Downloaded payload
        payload: PathBuf,

        /// File entry to verify against (defaults to the only or first file)
        #[arg(short, long, value_name = "NAME")]
        file: Option<String>,
    },

    /// Download, verify and save the files a document describes
    #[command(visible_alias = "f")]
    Fetch {
        /// Metalink document
        metalink: PathBuf,

        /// Only fetch this file entry
        #[arg(short, long, value_name = "NAME")]
        file: Option<String>,

        /// Directory to write payloads to (overrides config)
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
    },

    /// Print the digest of a local file
    Hash {
        /// Algorithm name (md5, sha1, sha256, ...)
        algorithm: String,

        /// File to hash
        path: PathBuf,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Print the config file location
    Path,

    /// Create sample configuration
    Sample,

    /// Validate configuration
    #[command(visible_alias = "check")]
    Validate,
}

impl Cli {
    /// Validate CLI arguments and show helpful error messages
    pub fn validate(&self) -> Result<(), String> {
        match &self.command {
            Commands::Hash { algorithm, .. } if algorithm.trim().is_empty() => {
                Err("Algorithm name cannot be empty".to_string())
            }
            Commands::Verify { file: Some(name), .. } | Commands::Fetch { file: Some(name), .. }
                if name.is_empty() =>
            {
                Err("File name cannot be empty".to_string())
            }
            _ => Ok(()),
        }
    }

    /// Whether startup config validation should be skipped
    pub fn skips_config_validation(&self) -> bool {
        matches!(
            self.command,
            Commands::Config {
                action: ConfigAction::Validate | ConfigAction::Path | ConfigAction::Sample
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_verify_with_file() {
        let cli = Cli::try_parse_from(["plml", "verify", "a.metalink", "a.iso", "--file", "a.iso"])
            .unwrap();
        match cli.command {
            Commands::Verify {
                metalink,
                payload,
                file,
            } => {
                assert_eq!(metalink, PathBuf::from("a.metalink"));
                assert_eq!(payload, PathBuf::from("a.iso"));
                assert_eq!(file.as_deref(), Some("a.iso"));
            }
            _ => panic!("expected verify"),
        }
    }

    #[test]
    fn global_flags_work_after_subcommand() {
        let cli = Cli::try_parse_from(["plml", "show", "a.metalink", "-v", "--config", "c.toml"])
            .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("c.toml")));
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn empty_names_are_rejected() {
        let cli = Cli::try_parse_from(["plml", "hash", "", "a.iso"]).unwrap();
        assert!(cli.validate().is_err());

        let cli = Cli::try_parse_from(["plml", "fetch", "a.metalink", "--file", ""]).unwrap();
        assert!(cli.validate().is_err());
    }

    #[test]
    fn config_validate_skips_startup_validation() {
        let cli = Cli::try_parse_from(["plml", "config", "validate"]).unwrap();
        assert!(cli.skips_config_validation());
        let cli = Cli::try_parse_from(["plml", "config", "show"]).unwrap();
        assert!(!cli.skips_config_validation());
    }
}
