mod cli;
mod handlers;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use plml::ConfigManager;
use std::process;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    // Validate CLI arguments first
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    // Initialize logging based on verbosity
    if args.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_writer(std::io::stderr)
            .init();
    }

    let config_manager = match &args.config {
        Some(path) => ConfigManager::from_file(path)?,
        None => ConfigManager::new()?,
    };

    if !args.skips_config_validation() {
        if let Err(e) = config_manager.validate() {
            eprintln!("Configuration validation failed: {}", e);
            eprintln!("Run 'plml config validate' for a detailed report");
            process::exit(1);
        }
    }

    match args.command {
        Commands::Show {
            metalink,
            json,
            long,
        } => {
            handlers::handle_show(&config_manager, metalink, json, long || args.verbose).await?;
        }
        Commands::Verify {
            metalink,
            payload,
            file,
        } => {
            handlers::handle_verify(&config_manager, metalink, payload, file).await?;
        }
        Commands::Fetch {
            metalink,
            file,
            output_dir,
        } => {
            handlers::handle_fetch(&config_manager, metalink, file, output_dir).await?;
        }
        Commands::Hash { algorithm, path } => {
            handlers::handle_hash(algorithm, path).await?;
        }
        Commands::Config { action } => {
            handlers::handle_config(&config_manager, action).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Once;
    use tempfile::TempDir;

    static INIT: Once = Once::new();

    fn init_test_logging() {
        INIT.call_once(|| {
            tracing_subscriber::fmt()
                .with_max_level(tracing::Level::DEBUG)
                .with_test_writer()
                .init();
        });
    }

    #[tokio::test]
    async fn test_config_override_initialization() {
        init_test_logging();

        let dir = TempDir::new().unwrap();
        let result = ConfigManager::from_file(&dir.path().join("plml.toml"));
        assert!(result.is_ok(), "Config manager should initialize from a path");
        assert!(result.unwrap().validate().is_ok());
    }

    #[tokio::test]
    async fn test_show_handler_reads_document() {
        init_test_logging();

        let dir = TempDir::new().unwrap();
        let config_manager = ConfigManager::from_file(&dir.path().join("plml.toml")).unwrap();
        let document = dir.path().join("a.metalink");
        std::fs::write(
            &document,
            r#"<metalink version="3.0"><files><file name="a.iso"><size>3</size></file></files></metalink>"#,
        )
        .unwrap();

        let result = handlers::handle_show(&config_manager, document, false, true).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_show_handler_rejects_invalid_document() {
        init_test_logging();

        let dir = TempDir::new().unwrap();
        let config_manager = ConfigManager::from_file(&dir.path().join("plml.toml")).unwrap();
        let document = dir.path().join("bad.metalink");
        std::fs::write(&document, "<metalink><files>").unwrap();

        let result = handlers::handle_show(&config_manager, document, true, false).await;
        assert!(result.is_err(), "Malformed documents should fail to load");
    }

    #[test]
    fn test_cli_integration() {
        let cli = Cli::try_parse_from(["plml", "config", "path"]).unwrap();
        assert!(cli.skips_config_validation());

        let cli = Cli::try_parse_from(["plml", "hash", "sha256", "a.iso"]).unwrap();
        assert!(matches!(cli.command, Commands::Hash { .. }));
        assert!(!cli.skips_config_validation());
    }
}
