//! Configuration file loading
//!
//! This module handles finding and loading TOML configuration files
//! from various locations (explicit path, working directory, system directory).
//!
//! ```toml
//! [diagram]
//! title = "Billing Models"
//! rankdir = "TB"
//! palette = ["#FF9999", "#99FF99"]
//!
//! [analysis]
//! extra_builtins = ["UUID", "Decimal"]
//! follow_imports = true
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use log::{debug, info};
use serde::Deserialize;
use thiserror::Error;

use crate::analysis::BuiltinTypes;
use crate::export::DiagramStyle;

/// File name searched for in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "schemaviz.toml";

const RANK_DIRECTIONS: &[&str] = &["TB", "LR", "BT", "RL"];

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML configuration: {0}")]
    Parse(String),

    #[error("Missing configuration file: {0}")]
    MissingFile(PathBuf),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Application configuration loaded from TOML file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Diagram appearance section
    #[serde(default)]
    pub diagram: DiagramConfig,

    /// Analysis section
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

/// Diagram appearance section
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiagramConfig {
    /// Graph title
    #[serde(default)]
    pub title: Option<String>,

    /// Graphviz rank direction
    #[serde(default)]
    pub rankdir: Option<String>,

    /// Module colors
    #[serde(default)]
    pub palette: Option<Vec<String>>,

    /// Color for classes without a module
    #[serde(default)]
    pub default_color: Option<String>,

    /// Font used for all text
    #[serde(default)]
    pub font: Option<String>,
}

impl DiagramConfig {
    /// Build the diagram style, filling unset values with defaults.
    pub fn style(&self) -> DiagramStyle {
        let defaults = DiagramStyle::default();
        DiagramStyle {
            title: self.title.clone().unwrap_or(defaults.title),
            rankdir: self
                .rankdir
                .as_ref()
                .map(|r| r.to_uppercase())
                .unwrap_or(defaults.rankdir),
            palette: self.palette.clone().unwrap_or(defaults.palette),
            default_color: self.default_color.clone().unwrap_or(defaults.default_color),
            font: self.font.clone().or(defaults.font),
        }
    }
}

/// Analysis section
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Names treated as built-in in addition to the defaults
    #[serde(default)]
    pub extra_builtins: Vec<String>,

    /// Parse modules outside the targets to resolve references
    #[serde(default = "default_follow_imports")]
    pub follow_imports: bool,
}

fn default_follow_imports() -> bool {
    true
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            extra_builtins: Vec::new(),
            follow_imports: default_follow_imports(),
        }
    }
}

impl AnalysisConfig {
    /// The built-in type set including configured extras.
    pub fn builtins(&self) -> BuiltinTypes {
        BuiltinTypes::with_extra(self.extra_builtins.iter().cloned())
    }
}

impl AppConfig {
    /// Check values that deserialize fine but cannot be rendered.
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(rankdir) = &self.diagram.rankdir {
            if !RANK_DIRECTIONS.contains(&rankdir.to_uppercase().as_str()) {
                return Err(ConfigError::Validation(format!(
                    "rankdir must be one of {}, got '{}'",
                    RANK_DIRECTIONS.join(", "),
                    rankdir
                )));
            }
        }

        if let Some(palette) = &self.diagram.palette {
            if palette.is_empty() {
                return Err(ConfigError::Validation(
                    "palette must contain at least one color".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Find and load configuration from various locations
///
/// Search order:
/// 1. Explicit path if provided
/// 2. `schemaviz.toml` in the working directory
/// 3. Platform-specific config directory
/// 4. Default config if none found
///
/// # Errors
///
/// Returns error if:
/// - Explicit path is provided but file doesn't exist
/// - Config file exists but cannot be parsed or fails validation
pub fn load_config(explicit_path: Option<impl AsRef<Path>>) -> ConfigResult<AppConfig> {
    if let Some(path) = explicit_path {
        let path = path.as_ref();
        info!(path = path.display().to_string(); "Loading configuration from explicit path");
        return load_config_file(path);
    }

    let local_config = Path::new(LOCAL_CONFIG_FILE);
    if local_config.exists() {
        info!(path = local_config.display().to_string(); "Loading configuration from local path");
        return load_config_file(local_config);
    }

    if let Some(proj_dirs) = ProjectDirs::from("dev", "schemaviz", "schemaviz") {
        let system_config = proj_dirs.config_dir().join("config.toml");

        if system_config.exists() {
            info!(path = system_config.display().to_string(); "Loading configuration from system path");
            return load_config_file(system_config);
        }

        debug!(path = system_config.display().to_string(); "System configuration file not found");
    } else {
        debug!("Could not determine platform-specific config directory");
    }

    debug!("No configuration file found, using default configuration");
    Ok(AppConfig::default())
}

/// Load configuration from a TOML file
fn load_config_file(path: impl AsRef<Path>) -> ConfigResult<AppConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ConfigError::MissingFile(path.to_path_buf()));
    }

    let content = fs::read_to_string(path)?;
    let config: AppConfig =
        toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
    config.validate()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(content: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("schemaviz.toml");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert!(config.analysis.follow_imports);
        assert_eq!(config.diagram.style(), DiagramStyle::default());
        assert!(config.analysis.builtins().contains("int"));
    }

    #[test]
    fn test_load_explicit_path() {
        let (_dir, path) = write_config(
            r##"
[diagram]
title = "Billing"
rankdir = "tb"
palette = ["#000000"]

[analysis]
extra_builtins = ["UUID"]
follow_imports = false
"##,
        );

        let config = load_config(Some(&path)).unwrap();
        let style = config.diagram.style();
        assert_eq!(style.title, "Billing");
        assert_eq!(style.rankdir, "TB");
        assert_eq!(style.palette, vec!["#000000".to_string()]);
        assert_eq!(style.default_color, "#CCCCCC");

        assert!(!config.analysis.follow_imports);
        assert!(config.analysis.builtins().contains("uuid.UUID"));
    }

    #[test]
    fn test_partial_sections_use_defaults() {
        let (_dir, path) = write_config("[analysis]\nextra_builtins = []\n");
        let config = load_config(Some(&path)).unwrap();
        assert!(config.analysis.follow_imports);
        assert_eq!(config.diagram.style().title, "Schemas Diagram");
    }

    #[test]
    fn test_missing_explicit_file() {
        let dir = TempDir::new().unwrap();
        let result = load_config(Some(dir.path().join("nope.toml")));
        assert!(matches!(result, Err(ConfigError::MissingFile(_))));
    }

    #[test]
    fn test_invalid_toml() {
        let (_dir, path) = write_config("[diagram\ntitle = ");
        assert!(matches!(load_config(Some(&path)), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let (_dir, path) = write_config("[diagram]\ncolour = \"red\"\n");
        assert!(matches!(load_config(Some(&path)), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_validation() {
        let (_dir, path) = write_config("[diagram]\nrankdir = \"sideways\"\n");
        assert!(matches!(
            load_config(Some(&path)),
            Err(ConfigError::Validation(_))
        ));

        let (_dir, path) = write_config("[diagram]\npalette = []\n");
        assert!(matches!(
            load_config(Some(&path)),
            Err(ConfigError::Validation(_))
        ));
    }
}
