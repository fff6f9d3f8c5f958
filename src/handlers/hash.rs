use anyhow::{Context, Result};
use plml::HashRegistry;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

pub async fn handle_hash(algorithm: String, path: PathBuf) -> Result<()> {
    let registry = HashRegistry::new();
    if !registry.contains(&algorithm) {
        anyhow::bail!(
            "Unsupported algorithm '{}' (available: {})",
            algorithm,
            registry.algorithms().join(", ")
        );
    }

    let digest = tokio::task::spawn_blocking(move || -> Result<String> {
        let file = File::open(&path).with_context(|| format!("Failed to open {:?}", path))?;
        let digest = registry
            .digest_reader(&algorithm, BufReader::new(file))
            .with_context(|| format!("Failed to hash {:?}", path))?;
        Ok(format!("{}  {}", digest, path.display()))
    })
    .await
    .context("Hashing task panicked")??;

    println!("{}", digest);
    Ok(())
}
