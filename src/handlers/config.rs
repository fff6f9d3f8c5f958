use crate::cli::ConfigAction;
use anyhow::Result;
use console::{Term, style};
use plml::config::ConfigManager;
use std::process;

pub async fn handle_config(config_manager: &ConfigManager, action: ConfigAction) -> Result<()> {
    let term = Term::stdout();

    match action {
        ConfigAction::Show => {
            term.write_line(&format!("{} Current configuration:", style("⚙️").cyan()))?;
            term.write_line("")?;
            term.write_line(&toml::to_string_pretty(config_manager.config())?)?;
        }

        ConfigAction::Path => {
            term.write_line(&config_manager.config_file().display().to_string())?;
        }

        ConfigAction::Sample => {
            let sample = config_manager.create_sample_config()?;
            term.write_line(&format!(
                "{} Sample configuration written to {}",
                style("✅").green(),
                style(sample.display()).cyan()
            ))?;
        }

        ConfigAction::Validate => {
            term.write_line(&format!(
                "{} Validating configuration...",
                style("🔍").cyan()
            ))?;

            let schema = config_manager.load_schema();
            match config_manager.validate().and(schema.map(|_| ())) {
                Ok(()) => {
                    term.write_line(&format!("{} Configuration is valid", style("✅").green()))?;
                }
                Err(e) => {
                    term.write_line(&format!(
                        "{} Configuration validation failed:",
                        style("❌").red()
                    ))?;
                    term.write_line(&format!("   {:#}", e))?;
                    process::exit(1);
                }
            }
        }
    }

    Ok(())
}
