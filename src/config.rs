//! Decoder configuration

use serde::{Deserialize, Serialize};

use crate::{MetopError, Result};

/// Pixel orientation of decoded rasters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Mirror northbound (ascending) products so north is up
    #[default]
    Auto,
    /// Always mirror rows and columns
    Flip,
    /// Keep the on-disk order
    Keep,
}

impl Orientation {
    /// Whether a product with the given orbit direction is mirrored
    #[must_use]
    pub fn mirrors(self, ascending: bool) -> bool {
        match self {
            Self::Auto => ascending,
            Self::Flip => true,
            Self::Keep => false,
        }
    }
}

/// Decoder configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Pixel orientation
    #[serde(default)]
    pub orientation: Orientation,
    /// Earth-sun distance used by reflectance calibration, overriding the
    /// main header value
    #[serde(default)]
    pub earth_sun_distance_ratio: Option<f64>,
}

impl DecoderConfig {
    /// Load configuration from TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read, parsed or validated
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MetopError::ConfigError(format!("Failed to read config file: {e}")))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| MetopError::ConfigError(format!("Failed to parse config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns error if the distance ratio override is not a finite
    /// positive number
    pub fn validate(&self) -> Result<()> {
        if let Some(ratio) = self.earth_sun_distance_ratio {
            if !ratio.is_finite() || ratio <= 0.0 {
                return Err(MetopError::ConfigError(format!(
                    "earth_sun_distance_ratio must be a positive number, got {ratio}"
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_parse() {
        let config_toml = r#"
            orientation = "flip"
            earth_sun_distance_ratio = 0.9833
        "#;

        let config: DecoderConfig = toml::from_str(config_toml).unwrap();
        assert_eq!(config.orientation, Orientation::Flip);
        assert_eq!(config.earth_sun_distance_ratio, Some(0.9833));
    }

    #[test]
    fn test_config_defaults() {
        let config: DecoderConfig = toml::from_str("").unwrap();
        assert_eq!(config, DecoderConfig::default());
        assert_eq!(config.orientation, Orientation::Auto);
        assert!(config.earth_sun_distance_ratio.is_none());
    }

    #[test]
    fn test_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"orientation = \"keep\"\n").unwrap();

        let config = DecoderConfig::from_file(file.path()).unwrap();
        assert_eq!(config.orientation, Orientation::Keep);
    }

    #[test]
    fn test_invalid_ratio() {
        let config = DecoderConfig {
            earth_sun_distance_ratio: Some(-1.0),
            ..DecoderConfig::default()
        };
        assert!(matches!(config.validate(), Err(MetopError::ConfigError(_))));

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"earth_sun_distance_ratio = 0.0\n").unwrap();
        assert!(DecoderConfig::from_file(file.path()).is_err());
    }

    #[test]
    fn test_unknown_orientation_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"orientation = \"sideways\"\n").unwrap();

        let err = DecoderConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, MetopError::ConfigError(_)));
    }

    #[test]
    fn test_orientation_mirrors() {
        assert!(Orientation::Auto.mirrors(true));
        assert!(!Orientation::Auto.mirrors(false));
        assert!(Orientation::Flip.mirrors(false));
        assert!(!Orientation::Keep.mirrors(true));
    }
}
