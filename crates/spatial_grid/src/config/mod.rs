//! Configuration system
//!
//! Grids are rebuilt at startup from a static description: for each root,
//! its box and the level specifications that subdivide it. The description
//! can be kept in TOML or RON.

use crate::foundation::math::Vec3;
use crate::spatial::{BroadPhase, LevelSpec};
pub use serde::{Deserialize, Serialize};
use std::path::Path;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML
    Toml,
    /// Rusty Object Notation
    Ron,
}

impl ConfigFormat {
    /// Pick a format from a file extension
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("ron") => Ok(Self::Ron),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Parse configuration text
    fn parse(contents: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        match format {
            ConfigFormat::Toml => toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string())),
            ConfigFormat::Ron => ron::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string())),
        }
    }

    /// Render configuration text
    fn render(&self, format: ConfigFormat) -> Result<String, ConfigError> {
        match format {
            ConfigFormat::Toml => {
                toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
            }
            ConfigFormat::Ron => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string())),
        }
    }

    /// Load configuration from file
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents, format)
    }

    /// Save configuration to file
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = self.render(ConfigFormat::from_path(path)?)?;
        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// One root grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootConfig {
    /// Center of the root box
    pub center: [f32; 3],
    /// Full edge lengths of the root box
    pub size: [f32; 3],
    /// Subdivision levels, outermost first
    #[serde(default)]
    pub levels: Vec<LevelSpec>,
}

impl RootConfig {
    /// Center as a vector
    pub fn center(&self) -> Vec3 {
        Vec3::from(self.center)
    }

    /// Size as a vector
    pub fn size(&self) -> Vec3 {
        Vec3::from(self.size)
    }
}

/// Spatial index configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    /// Cell-level test used by range queries
    #[serde(default)]
    pub broad_phase: BroadPhase,
    /// Root grids, in index order
    pub roots: Vec<RootConfig>,
}

impl Default for GridConfig {
    /// A single 2500×1200×2500 terrain volume, split into 2×1×2 regions,
    /// then 5×4×5 sectors, then 4×4×4 leaves
    fn default() -> Self {
        Self {
            broad_phase: BroadPhase::default(),
            roots: vec![RootConfig {
                center: [1250.0, 400.0, 1250.0],
                size: [2500.0, 1200.0, 2500.0],
                levels: vec![
                    LevelSpec::new(2, 1, 2),
                    LevelSpec::new(5, 4, 5),
                    LevelSpec::new(4, 4, 4),
                ],
            }],
        }
    }
}

impl Config for GridConfig {}
