//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading engine
//! configuration from YAML files.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::{EngineError, EngineResult};

use super::types::{CalendarConfig, EndMarksConfig, EngineConfig, StaffingConfig};

/// Loads and provides access to engine configuration.
///
/// # Directory Structure
///
/// The configuration directory should have the following structure:
/// ```text
/// config/default/
/// ├── staffing.yaml   # Age bands, ratios, and the at-risk threshold
/// ├── calendar.yaml   # Query range bound and facility UTC offset
/// └── end_marks.yaml  # Default settings for system end marks
/// ```
///
/// # Example
///
/// ```no_run
/// use childcare_attendance::config::ConfigLoader;
///
/// let loader = ConfigLoader::load("./config/default").unwrap();
/// println!("Age bands: {}", loader.config().age_bands().len());
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config: EngineConfig,
}

impl ConfigLoader {
    /// Loads configuration from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration directory (e.g., "./config/default")
    ///
    /// # Returns
    ///
    /// Returns a `ConfigLoader` instance on success, or an error if:
    /// - Any required file is missing
    /// - Any file contains invalid YAML
    /// - The loaded values fail validation
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();

        let staffing = Self::load_yaml::<StaffingConfig>(&path.join("staffing.yaml"))?;
        let calendar = Self::load_yaml::<CalendarConfig>(&path.join("calendar.yaml"))?;
        let end_marks = Self::load_yaml::<EndMarksConfig>(&path.join("end_marks.yaml"))?;

        let config = EngineConfig::new(staffing, calendar, end_marks.end_marks)?;

        info!(
            path = %path.display(),
            age_bands = config.age_bands().len(),
            max_range_days = config.max_range_days(),
            "Loaded engine configuration"
        );

        Ok(Self { config })
    }

    /// Loads and parses a YAML file.
    fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> EngineResult<T> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
            path: path_str,
            message: e.to_string(),
        })
    }

    /// Returns the underlying configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Consumes the loader and returns the configuration.
    pub fn into_config(self) -> EngineConfig {
        self.config
    }
}
