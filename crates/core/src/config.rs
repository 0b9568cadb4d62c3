//! Application configuration loaded from an optional TOML file.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{Error, Result};

/// Top-level configuration for the viewer.
///
/// Every field has a sensible default, so a missing config file is not an
/// error. A `meshview.toml` next to the binary overrides the defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub window: WindowConfig,
    pub assets: AssetConfig,
}

/// Initial window geometry and title.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

/// Paths to the model, texture, and compiled shader blobs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    pub model: PathBuf,
    pub texture: PathBuf,
    pub vertex_shader: PathBuf,
    pub fragment_shader: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            assets: AssetConfig::default(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            title: "meshview".to_string(),
        }
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            model: PathBuf::from("assets/models/viking_room.obj"),
            texture: PathBuf::from("assets/textures/viking_room.png"),
            vertex_shader: PathBuf::from("shaders/model.vert.spv"),
            fragment_shader: PathBuf::from("shaders/model.frag.spv"),
        }
    }
}

impl AppConfig {
    /// Parse a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text)
            .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))
    }

    /// Parse the file at `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.window.width, 800);
        assert_eq!(config.window.height, 600);
        assert_eq!(config.window.title, "meshview");
        assert_eq!(
            config.assets.model,
            PathBuf::from("assets/models/viking_room.obj")
        );
    }

    #[test]
    fn test_parse_partial_override() {
        let toml = r#"
            [window]
            width = 1280
            height = 720
        "#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.window.width, 1280);
        assert_eq!(config.window.height, 720);
        // Untouched sections keep their defaults.
        assert_eq!(config.window.title, "meshview");
        assert_eq!(
            config.assets.texture,
            PathBuf::from("assets/textures/viking_room.png")
        );
    }

    #[test]
    fn test_parse_asset_paths() {
        let toml = r#"
            [assets]
            model = "data/bunny.obj"
            texture = "data/bunny.png"
            vertex_shader = "data/shaders/bunny.vert.spv"
            fragment_shader = "data/shaders/bunny.frag.spv"
        "#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.assets.model, PathBuf::from("data/bunny.obj"));
        assert_eq!(
            config.assets.fragment_shader,
            PathBuf::from("data/shaders/bunny.frag.spv")
        );
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let result: std::result::Result<AppConfig, _> = toml::from_str("window = 3");
        assert!(result.is_err());
    }
}
