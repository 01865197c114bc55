use anyhow::{bail, Result};
use std::path::PathBuf;
use tracing::info;

use super::resolve_root;
use crate::Config;

pub async fn run(path: Option<PathBuf>, force: bool) -> Result<()> {
    let root = resolve_root(path)?;

    if Config::is_initialized(&root) && !force {
        bail!(
            "repoindex is already initialized in {:?} (use --force to overwrite)",
            Config::repoindex_dir(&root)
        );
    }

    let config = Config::default();
    config.save(&root)?;

    info!("Initialized repoindex in {:?}", Config::repoindex_dir(&root));
    println!(
        "✓ Created {} with default configuration",
        Config::repoindex_dir(&root).display()
    );
    println!("\nNext steps:");
    println!("  1. Edit .repoindex/config.toml to pick an embedding provider");
    println!("  2. Run 'repoindex index' to index the repository");
    println!("  3. Run 'repoindex search <query>' to search it");

    Ok(())
}
