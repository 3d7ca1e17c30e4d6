use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::io::IsTerminal;
use std::path::Path;

use crate::store::PRICEBOOK_DIR;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub edit: EditConfig,
    #[serde(default)]
    pub grid: GridConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Currency for headers created without an explicit one.
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            currency: default_currency(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditConfig {
    /// Ask before leaving grid edit mode with unsaved changes. When off,
    /// leaving saves them instead.
    #[serde(default = "default_true")]
    pub confirm_exit: bool,
}

impl Default for EditConfig {
    fn default() -> Self {
        Self {
            confirm_exit: default_true(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridConfig {
    /// Rows moved by page up / page down.
    #[serde(default = "default_page_rows")]
    pub page_rows: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            page_rows: default_page_rows(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub project: ProjectConfig,
    pub user: UserConfig,
    pub resolved_output: String,
}

/// Default `.pricebook/config.toml` written by `pb init`.
pub const DEFAULT_PROJECT_CONFIG: &str = "[pricing]\n\
    currency = \"USD\"\n\
    \n\
    [edit]\n\
    confirm_exit = true\n\
    \n\
    [grid]\n\
    page_rows = 20\n";

/// # Errors
///
/// Returns an error when the config file exists but cannot be read or parsed.
pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_root.join(PRICEBOOK_DIR).join("config.toml");
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// # Errors
///
/// Returns an error when the user config exists but cannot be read or parsed.
pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };

    let path = config_dir.join("pricebook/config.toml");
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Project config, user config, and the output mode they resolve to.
///
/// # Errors
///
/// Returns an error when either config file is unreadable or malformed.
pub fn resolve_config(project_root: &Path, cli_json: bool) -> Result<EffectiveConfig> {
    let project = load_project_config(project_root)?;
    let user = load_user_config()?;

    let env_format = env::var("FORMAT").ok();
    let resolved_output = resolve_output(cli_json, user.output.as_deref(), env_format.as_deref());

    Ok(EffectiveConfig {
        project,
        user,
        resolved_output,
    })
}

/// Output mode by precedence: flag, `FORMAT`, user config, then TTY.
#[must_use]
pub fn resolve_output(
    cli_json: bool,
    user_output: Option<&str>,
    env_format: Option<&str>,
) -> String {
    fn normalize_output_mode(raw: &str) -> Option<&'static str> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" | "human" => Some("pretty"),
            "text" | "table" | "tsv" => Some("text"),
            "json" => Some("json"),
            _ => None,
        }
    }

    if cli_json {
        return "json".to_string();
    }

    if let Some(mode) = env_format.and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if let Some(mode) = user_output.and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if std::io::stdout().is_terminal() {
        "pretty".to_string()
    } else {
        "text".to_string()
    }
}

const fn default_true() -> bool {
    true
}

fn default_currency() -> String {
    "USD".to_string()
}

const fn default_page_rows() -> usize {
    20
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_project_config_uses_defaults() {
        let root = tempfile::tempdir().unwrap();
        let cfg = load_project_config(root.path()).unwrap();
        assert_eq!(cfg.pricing.currency, "USD");
        assert!(cfg.edit.confirm_exit);
        assert_eq!(cfg.grid.page_rows, 20);
    }

    #[test]
    fn default_template_parses_to_defaults() {
        let cfg: ProjectConfig = toml::from_str(DEFAULT_PROJECT_CONFIG).unwrap();
        assert_eq!(cfg, ProjectConfig::default());
    }

    #[test]
    fn partial_project_config_keeps_other_defaults() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join(PRICEBOOK_DIR);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("config.toml"), "[grid]\npage_rows = 5\n").unwrap();

        let cfg = load_project_config(root.path()).unwrap();
        assert_eq!(cfg.grid.page_rows, 5);
        assert_eq!(cfg.pricing.currency, "USD");
    }

    #[test]
    fn malformed_project_config_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join(PRICEBOOK_DIR);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("config.toml"), "[grid\n").unwrap();

        let err = load_project_config(root.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn cli_json_overrides_env_and_config() {
        assert_eq!(resolve_output(true, Some("pretty"), Some("text")), "json");
    }

    #[test]
    fn env_beats_user_config_and_aliases_normalize() {
        assert_eq!(resolve_output(false, Some("table"), Some("human")), "pretty");
        assert_eq!(resolve_output(false, Some("human"), Some("table")), "text");
        assert_eq!(resolve_output(false, Some("json"), Some("bogus")), "json");
    }
}
