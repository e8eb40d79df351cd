//! Load and store the shared configuration document
//!
//! The document lives at `<config_dir>/clipqa/config.toml` unless a path is
//! given explicitly. A missing file is created with defaults. A malformed
//! file is left alone: the caller gets defaults and a warning.

use std::fs;
use std::path::{Path, PathBuf};

use clipqa_types::Configuration;
use thiserror::Error;

pub const APP_NAME: &str = "clipqa";
const CONFIG_NAME: &str = "config";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot determine the configuration directory: {0}")]
    Location(#[source] confy::ConfyError),

    #[error("cannot read configuration {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("configuration {path:?} is malformed: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("cannot write configuration {path:?}: {source}")]
    Store {
        path: PathBuf,
        source: confy::ConfyError,
    },
}

/// Per-user location of the configuration document
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    confy::get_configuration_file_path(APP_NAME, CONFIG_NAME).map_err(ConfigError::Location)
}

/// Startup load: create the file with defaults if absent, fall back to
/// defaults if it is malformed. Never fails.
pub fn load_configuration(path: &Path) -> Configuration {
    if !path.exists() {
        let defaults = Configuration::default();
        match store_configuration(path, &defaults) {
            Ok(()) => tracing::info!(path = %path.display(), "Wrote default configuration"),
            Err(e) => tracing::warn!(error = %e, "Failed to write default configuration"),
        }
        return defaults;
    }

    match read_configuration(path) {
        Ok(config) => {
            tracing::info!(path = %path.display(), "Configuration loaded");
            config
        }
        Err(e) => {
            tracing::warn!(error = %e, "Using default configuration");
            Configuration::default()
        }
    }
}

/// Strict read with no fallback, used for live reload. Values outside their
/// documented ranges are clamped.
pub fn read_configuration(path: &Path) -> Result<Configuration, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let config: Configuration = toml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(config.sanitized())
}

/// Write the full document, creating parent directories as needed
pub fn store_configuration(path: &Path, config: &Configuration) -> Result<(), ConfigError> {
    confy::store_path(path, config).map_err(|e| ConfigError::Store {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipqa_types::{HexColor, ScreenAnchor};

    #[test]
    fn test_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = load_configuration(&path);
        assert_eq!(config, Configuration::default());
        assert!(path.exists());
        assert_eq!(read_configuration(&path).unwrap(), Configuration::default());
    }

    #[test]
    fn test_round_trip_all_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Configuration::default();
        config.overlay.position = ScreenAnchor::LeftBottom;
        config.overlay.width = 800;
        config.overlay.height = 300;
        config.overlay.transparency = 70;
        config.text.font_family = "DejaVu Sans".to_string();
        config.text.font_size = 16;
        config.text.bold = false;
        config.text.text_color = HexColor::rgb(0xFF, 0xEE, 0x00);
        config.text.outline_color = HexColor([0x10, 0x20, 0x30, 0x80]);
        config.text.background_color = HexColor::rgb(0, 0, 0);
        config.text.outline_width = 1;
        config.text.line_spacing = 20;
        config.text.question_prefix = "Q:".to_string();
        config.text.answer_prefix = "-".to_string();
        config.behavior.auto_hide_seconds = 0;
        config.behavior.animations_enabled = false;

        store_configuration(&path, &config).unwrap();
        assert_eq!(read_configuration(&path).unwrap(), config);
        assert_eq!(load_configuration(&path), config);
    }

    #[test]
    fn test_values_beyond_field_type_keep_the_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[overlay]\nposition = \"left-top\"\ntransparency = 300\nwidth = -5\n",
        )
        .unwrap();

        let config = load_configuration(&path);
        assert_eq!(config.overlay.position, ScreenAnchor::LeftTop);
        assert_eq!(config.overlay.transparency, 100);
        assert_eq!(config.overlay.width, 100);
        assert_eq!(config.text, Configuration::default().text);
    }

    #[test]
    fn test_empty_document_is_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "").unwrap();
        assert_eq!(read_configuration(&path).unwrap(), Configuration::default());
    }

    #[test]
    fn test_malformed_file_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let broken = "[overlay]\nposition = \"upside-down\"\n";
        fs::write(&path, broken).unwrap();

        assert!(matches!(
            read_configuration(&path),
            Err(ConfigError::Parse { .. })
        ));
        assert_eq!(load_configuration(&path), Configuration::default());
        assert_eq!(fs::read_to_string(&path).unwrap(), broken);
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[overlay]\nwidth = 10\ntransparency = 5\n[behavior]\nauto_hide_seconds = 9999\n",
        )
        .unwrap();

        let config = read_configuration(&path).unwrap();
        assert_eq!(config.overlay.width, 100);
        assert_eq!(config.overlay.transparency, 50);
        assert_eq!(config.behavior.auto_hide_seconds, 120);
    }
}
