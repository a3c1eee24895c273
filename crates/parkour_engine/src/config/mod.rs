//! Configuration files
//!
//! Settings structs implement [`Config`] to be read from and written to
//! `.toml` or `.ron` files. The format follows the file extension.

use std::path::Path;

pub use serde::{Deserialize, Serialize};

/// On-disk formats understood by [`Config`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML via the `toml` crate
    Toml,
    /// Rusty Object Notation via the `ron` crate
    Ron,
}

impl ConfigFormat {
    /// Format named by the extension of `path`
    pub fn from_path(path: &str) -> Result<Self, ConfigError> {
        match Path::new(path).extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("ron") => Ok(Self::Ron),
            _ => Err(ConfigError::UnsupportedFormat(path.to_string())),
        }
    }
}

/// Settings loadable from and savable to a config file
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Reads and parses `path`
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config = Self::parse(path, &contents)?;
        log::info!("Loaded configuration from {}", path);
        Ok(config)
    }

    /// Parses `contents` in the format named by `path`
    fn parse(path: &str, contents: &str) -> Result<Self, ConfigError> {
        match ConfigFormat::from_path(path)? {
            ConfigFormat::Toml => toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string())),
            ConfigFormat::Ron => ron::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string())),
        }
    }

    /// Serializes in the format named by `path`
    fn to_text(&self, path: &str) -> Result<String, ConfigError> {
        let text = match ConfigFormat::from_path(path)? {
            ConfigFormat::Toml => toml::to_string_pretty(self).map_err(|e| e.to_string()),
            ConfigFormat::Ron => {
                ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default()).map_err(|e| e.to_string())
            }
        };
        text.map_err(ConfigError::Serialize)
    }

    /// Writes the settings to `path`
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_text(path)?)?;
        Ok(())
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// Reading or writing the file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file did not parse
    #[error("Parse error: {0}")]
    Parse(String),

    /// The settings did not serialize
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Neither `.toml` nor `.ron`
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A value failed validation
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_follows_extension() {
        assert_eq!(ConfigFormat::from_path("level/engine.toml").unwrap(), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path("engine.ron").unwrap(), ConfigFormat::Ron);
        assert!(matches!(
            ConfigFormat::from_path("engine.json"),
            Err(ConfigError::UnsupportedFormat(_))
        ));
        assert!(ConfigFormat::from_path("toml").is_err());
    }
}
