use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::hashes::HashRegistry;
use crate::schema::Schema;
use crate::verify::{GpgVerifier, VerificationEngine};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub schema: SchemaConfig,
    #[serde(default)]
    pub signature: SignatureConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// TOML schema replacing the built-in Metalink 3.0 rules.
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub strict: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureConfig {
    #[serde(default = "default_signature_program")]
    pub program: String,
    #[serde(default = "default_signature_args")]
    pub args: Vec<String>,
    #[serde(default = "default_signature_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_good_marker")]
    pub good_marker: String,
    #[serde(default = "default_bad_marker")]
    pub bad_marker: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_fetch_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

// Default value functions
fn default_signature_program() -> String {
    "gpg".to_string()
}
fn default_signature_args() -> Vec<String> {
    vec!["--batch".to_string()]
}
fn default_signature_timeout_secs() -> u64 {
    30
}
fn default_good_marker() -> String {
    "Good signature from".to_string()
}
fn default_bad_marker() -> String {
    "BAD signature from".to_string()
}
fn default_fetch_timeout_secs() -> u64 {
    300
}
fn default_user_agent() -> String {
    format!("plml/{}", env!("CARGO_PKG_VERSION"))
}
fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            program: default_signature_program(),
            args: default_signature_args(),
            timeout_secs: default_signature_timeout_secs(),
            good_marker: default_good_marker(),
            bad_marker: default_bad_marker(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout_secs(),
            user_agent: default_user_agent(),
            output_dir: default_output_dir(),
        }
    }
}

pub struct ConfigManager {
    config_dir: PathBuf,
    config_file: PathBuf,
    config: Config,
}

impl ConfigManager {
    /// Load the per-user config, writing a default one on first run
    pub fn new() -> Result<Self> {
        let project_dirs =
            ProjectDirs::from("", "", "plml").context("Failed to determine config directory")?;

        let config_dir = project_dirs.config_dir().to_path_buf();
        Self::in_dir(&config_dir)
    }

    /// Load `config.toml` from `config_dir`, creating directory and file if missing
    pub fn in_dir(config_dir: &Path) -> Result<Self> {
        if !config_dir.exists() {
            fs::create_dir_all(config_dir)
                .with_context(|| format!("Failed to create config directory: {:?}", config_dir))?;
        }

        let config_file = config_dir.join("config.toml");
        let config = if config_file.exists() {
            Self::load_config(&config_file)?
        } else {
            let default_config = Config::default();
            Self::save_config(&config_file, &default_config)?;
            default_config
        };

        Ok(Self {
            config_dir: config_dir.to_path_buf(),
            config_file,
            config,
        })
    }

    /// Use an explicit config file. A missing file means defaults; nothing is written.
    pub fn from_file(config_file: &Path) -> Result<Self> {
        let config = if config_file.exists() {
            Self::load_config(config_file)?
        } else {
            Config::default()
        };
        let config_dir = config_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            config_dir,
            config_file: config_file.to_path_buf(),
            config,
        })
    }

    /// Get a reference to the current config
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Save the current config to disk
    pub fn save(&self) -> Result<()> {
        Self::save_config(&self.config_file, &self.config)
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Schema selected by the config: a TOML file if configured, else the
    /// built-in rules.
    pub fn load_schema(&self) -> Result<Schema> {
        let mut schema = match &self.config.schema.path {
            Some(path) => Schema::from_path(path)
                .with_context(|| format!("Failed to load schema: {:?}", path))?,
            None => Schema::builtin(),
        };
        if self.config.schema.strict {
            schema.strict = true;
        }
        Ok(schema)
    }

    /// Engine with the standard digests and a `pgp` verifier built from
    /// the `[signature]` section.
    pub fn verification_engine(&self) -> VerificationEngine {
        let mut engine = VerificationEngine::new(HashRegistry::new());
        engine.register_signature("pgp", GpgVerifier::from_config(&self.config.signature));
        engine
    }

    fn load_config(config_file: &Path) -> Result<Config> {
        let content = fs::read_to_string(config_file)
            .with_context(|| format!("Failed to read config file: {:?}", config_file))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", config_file))?;

        Ok(config)
    }

    fn save_config(config_file: &Path, config: &Config) -> Result<()> {
        let content = toml::to_string_pretty(config).context("Failed to serialize config")?;

        fs::write(config_file, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_file))?;

        Ok(())
    }

    /// Create a sample config file for user reference
    pub fn create_sample_config(&self) -> Result<PathBuf> {
        let sample_file = self.config_dir.join("config.sample.toml");
        Self::save_config(&sample_file, &Config::default())?;
        Ok(sample_file)
    }

    /// Validate the current configuration
    pub fn validate(&self) -> Result<()> {
        let signature = &self.config.signature;
        if signature.program.trim().is_empty() {
            anyhow::bail!("signature.program cannot be empty");
        }
        if signature.timeout_secs == 0 {
            anyhow::bail!("signature.timeout_secs must be greater than 0");
        }
        if signature.good_marker.is_empty() || signature.bad_marker.is_empty() {
            anyhow::bail!("signature markers cannot be empty");
        }

        if self.config.fetch.timeout_secs == 0 {
            anyhow::bail!("fetch.timeout_secs must be greater than 0");
        }
        if self.config.fetch.user_agent.trim().is_empty() {
            anyhow::bail!("fetch.user_agent cannot be empty");
        }

        if let Some(path) = &self.config.schema.path {
            if !path.exists() {
                anyhow::bail!("schema file {:?} does not exist", path);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn first_run_writes_defaults() {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::in_dir(&dir.path().join("plml")).unwrap();

        assert!(manager.config_file().exists());
        assert_eq!(manager.config(), &Config::default());
        assert!(manager.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("custom.toml");
        fs::write(&file, "[signature]\nprogram = \"gpg2\"\ntimeout_secs = 5\n").unwrap();

        let manager = ConfigManager::from_file(&file).unwrap();
        let signature = &manager.config().signature;
        assert_eq!(signature.program, "gpg2");
        assert_eq!(signature.timeout_secs, 5);
        assert_eq!(signature.args, ["--batch"]);
        assert_eq!(manager.config().fetch, FetchConfig::default());
    }

    #[test]
    fn missing_override_file_is_not_created() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("absent.toml");
        let manager = ConfigManager::from_file(&file).unwrap();
        assert!(!file.exists());
        assert_eq!(manager.config(), &Config::default());
    }

    #[test]
    fn save_and_reload() {
        let dir = TempDir::new().unwrap();
        let mut manager = ConfigManager::in_dir(dir.path()).unwrap();
        manager.config_mut().fetch.timeout_secs = 12;
        manager.save().unwrap();

        let reloaded = ConfigManager::in_dir(dir.path()).unwrap();
        assert_eq!(reloaded.config().fetch.timeout_secs, 12);
    }

    #[test]
    fn validation_rejects_zero_timeouts() {
        let dir = TempDir::new().unwrap();
        let mut manager = ConfigManager::in_dir(dir.path()).unwrap();
        manager.config_mut().signature.timeout_secs = 0;
        assert!(manager.validate().is_err());

        manager.config_mut().signature.timeout_secs = 1;
        manager.config_mut().schema.path = Some(dir.path().join("missing.toml"));
        assert!(manager.validate().is_err());
    }

    #[test]
    fn strict_flag_applies_to_builtin_schema() {
        let dir = TempDir::new().unwrap();
        let mut manager = ConfigManager::in_dir(dir.path()).unwrap();
        assert!(!manager.load_schema().unwrap().strict);

        manager.config_mut().schema.strict = true;
        assert!(manager.load_schema().unwrap().strict);
    }

    #[test]
    fn sample_config_is_written_next_to_config() {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::in_dir(dir.path()).unwrap();
        let sample = manager.create_sample_config().unwrap();
        assert_eq!(sample.parent(), Some(dir.path()));
        let content = fs::read_to_string(sample).unwrap();
        assert!(content.contains("[signature]"));
    }
}
