use anyhow::{Context as _, Result};
use clap::Args;
use pricebook_core::config::DEFAULT_PROJECT_CONFIG;
use pricebook_core::store::{FileStore, PRICEBOOK_DIR};
use serde::Serialize;
use std::path::Path;

use crate::output::{OutputMode, render};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Re-create the snapshot even if `.pricebook/` already exists.
    #[arg(long)]
    pub force: bool,
}

const GITIGNORE: &str = "lock\n*.tmp\n";

#[derive(Debug, Serialize)]
struct InitReport {
    path: String,
    config: String,
}

/// Execute `pb init`. Creates the project skeleton:
///
/// ```text
/// .pricebook/
///   snapshot.json   (empty book)
///   snapshot.b3     (BLAKE3 checksum of snapshot.json)
///   config.toml     (default project config)
///   .gitignore      (lock file and temp files)
/// ```
///
/// # Errors
///
/// Returns an error if `.pricebook/` already exists and `--force` is not
/// set, or if any filesystem operation fails.
pub fn run_init(args: &InitArgs, project_root: &Path, output: OutputMode) -> Result<()> {
    let dir = project_root.join(PRICEBOOK_DIR);
    if dir.exists() && !args.force {
        anyhow::bail!("{PRICEBOOK_DIR}/ already exists. Use `pb init --force` to reinitialize.");
    }

    let store = FileStore::init(project_root)?;

    let config_path = store.dir().join("config.toml");
    if !config_path.exists() {
        std::fs::write(&config_path, DEFAULT_PROJECT_CONFIG)
            .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
    }

    let gitignore_path = store.dir().join(".gitignore");
    std::fs::write(&gitignore_path, GITIGNORE)
        .with_context(|| format!("Failed to write .gitignore: {}", gitignore_path.display()))?;

    let report = InitReport {
        path: store.dir().display().to_string(),
        config: config_path.display().to_string(),
    };
    render(output, &report, |_, w| {
        writeln!(w, "✓ Initialized {PRICEBOOK_DIR}/")?;
        writeln!(w)?;
        writeln!(w, "Next steps:")?;
        writeln!(w, "  pb customer add <CODE> <NAME>")?;
        writeln!(w, "  pb header add --customer C-0001 --name <NAME> --effective <YYYY-MM-DD>")?;
        writeln!(w, "  pb item add --header PH-0001 --name <PRODUCT> --price <PRICE>")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_creates_store_and_config() {
        let dir = tempfile::tempdir().unwrap();
        run_init(&InitArgs { force: false }, dir.path(), OutputMode::Json).unwrap();
        let root = dir.path().join(PRICEBOOK_DIR);
        assert!(root.join("snapshot.json").exists());
        assert!(root.join("snapshot.b3").exists());
        assert!(root.join("config.toml").exists());
    }

    #[test]
    fn init_refuses_to_clobber_without_force() {
        let dir = tempfile::tempdir().unwrap();
        run_init(&InitArgs { force: false }, dir.path(), OutputMode::Json).unwrap();
        assert!(run_init(&InitArgs { force: false }, dir.path(), OutputMode::Json).is_err());
        run_init(&InitArgs { force: true }, dir.path(), OutputMode::Json).unwrap();
    }
}
