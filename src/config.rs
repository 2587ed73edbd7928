use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::diary::DiarySettings;

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Path to the SQLite database
    pub database_path: ConfigValue<PathBuf>,
    /// Meal names, in category order; empty names hide a category
    pub meal_names: ConfigValue<Vec<String>>,
    /// Weight (kg) offered before any has been recorded
    pub default_weight: ConfigValue<f64>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    database_path: Option<PathBuf>,
    meal_names: Option<Vec<String>>,
    default_weight: Option<f64>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let defaults = DiarySettings::default();

        // Start with defaults
        let mut database_path = ConfigValue::new(
            Self::default_data_dir().join("diary.db"),
            ConfigSource::Default,
        );
        let mut meal_names = ConfigValue::new(defaults.meal_names, ConfigSource::Default);
        let mut default_weight = ConfigValue::new(70.0, ConfigSource::Default);
        let mut config_file = None;

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(db_path) = file_config.database_path {
                // Resolve relative paths against config file's directory
                let resolved_path = if db_path.is_relative() {
                    path.parent().map(|p| p.join(&db_path)).unwrap_or(db_path)
                } else {
                    db_path
                };
                database_path = ConfigValue::new(resolved_path, ConfigSource::File);
            }
            if let Some(names) = file_config.meal_names {
                meal_names = ConfigValue::new(names, ConfigSource::File);
            }
            if let Some(weight) = file_config.default_weight {
                default_weight = ConfigValue::new(weight, ConfigSource::File);
            }
        }

        // Apply environment variable overrides
        if let Ok(db_path) = std::env::var("FITDIARY_DATABASE_PATH") {
            database_path = ConfigValue::new(PathBuf::from(db_path), ConfigSource::Environment);
        }
        if let Ok(names) = std::env::var("FITDIARY_MEAL_NAMES") {
            let names = names.split(',').map(|n| n.trim().to_string()).collect();
            meal_names = ConfigValue::new(names, ConfigSource::Environment);
        }
        if let Ok(weight) = std::env::var("FITDIARY_DEFAULT_WEIGHT") {
            let weight = weight
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue("FITDIARY_DEFAULT_WEIGHT", weight))?;
            default_weight = ConfigValue::new(weight, ConfigSource::Environment);
        }

        Ok(Self {
            database_path,
            meal_names,
            default_weight,
            config_file,
        })
    }

    /// Settings handed to the diary; `last_weight` wins over the configured
    /// default once a weight has been recorded.
    pub fn diary_settings(&self, last_weight: Option<String>) -> DiarySettings {
        DiarySettings {
            meal_names: self.meal_names.value.clone(),
            default_weight: last_weight.unwrap_or_else(|| self.default_weight.value.to_string()),
        }
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/fitdiary/
    /// - macOS: ~/Library/Application Support/fitdiary/
    /// - Windows: %APPDATA%/fitdiary/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fitdiary")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/fitdiary/
    /// - macOS: ~/Library/Application Support/fitdiary/
    /// - Windows: %APPDATA%/fitdiary/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fitdiary")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    InvalidValue(&'static str, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::InvalidValue(name, value) => {
                write!(f, "Invalid value for {}: '{}'", name, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
