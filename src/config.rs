//! Configuration management for promptpair
//!
//! Settings are loaded from environment variables with defaults; command-line
//! flags override individual fields afterwards.
//!
//! # Environment Variables
//!
//! - `PROMPTPAIR_LOG_DIRS`: Base directories searched for logs, separated by
//!   the platform path-list separator (`:` on Unix) - default: "logs"
//! - `PROMPTPAIR_TYPES_DIR`: Signature artifacts directory - default: "prompt_types"
//! - `PROMPTPAIR_PROMPTS_DIR`: Sample prompt templates - default: "prompts"
//! - `PROMPTPAIR_OUTPUT_DIR`: Output root - default: "data"
//! - `PROMPTPAIR_VARIANTS_FILE`: Optional variants file
//! - `PROMPTPAIR_EXCEPTIONS_FILE`: Optional list of templates without a system block
//! - `PROMPTPAIR_MIN_CONFIDENCE`: Classifier threshold in (0, 1] - default: "0.5"
//! - `PROMPTPAIR_LOG_LEVEL`: Logging level - default: "info"
//!
//! # Example
//!
//! ```no_run
//! use promptpair::HarvestConfig;
//!
//! let config = HarvestConfig::default();
//! config.validate().expect("Invalid configuration");
//! println!("{}", config);
//! ```

use crate::classify::ClassifierConfig;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_TYPES_DIR: &str = "prompt_types";
const DEFAULT_PROMPTS_DIR: &str = "prompts";
const DEFAULT_OUTPUT_DIR: &str = "data";
const DEFAULT_MIN_CONFIDENCE: f64 = 0.5;
const DEFAULT_LOG_LEVEL: &str = "info";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Settings shared by every subcommand
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    /// Base directories searched recursively for log files
    pub log_dirs: Vec<PathBuf>,

    /// Directory holding one signature artifact per prompt type
    pub types_dir: PathBuf,

    /// Directory of sample `*.prompt` templates
    pub prompts_dir: PathBuf,

    /// Root of the request/response output layout
    pub output_dir: PathBuf,

    pub variants_file: Option<PathBuf>,

    pub exceptions_file: Option<PathBuf>,

    /// Minimum marker score for a classification
    pub min_confidence: f64,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

impl Default for HarvestConfig {
    /// Loads `PROMPTPAIR_*` environment variables, falling back to defaults
    /// for missing or unparsable values.
    fn default() -> Self {
        let log_dirs = env::var_os("PROMPTPAIR_LOG_DIRS")
            .filter(|v| !v.is_empty())
            .map(|v| env::split_paths(&v).collect::<Vec<_>>())
            .filter(|dirs| !dirs.is_empty())
            .unwrap_or_else(|| vec![PathBuf::from(DEFAULT_LOG_DIR)]);

        let min_confidence = env::var("PROMPTPAIR_MIN_CONFIDENCE")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(DEFAULT_MIN_CONFIDENCE);

        let log_level = env::var("PROMPTPAIR_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        Self {
            log_dirs,
            types_dir: env_path("PROMPTPAIR_TYPES_DIR")
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TYPES_DIR)),
            prompts_dir: env_path("PROMPTPAIR_PROMPTS_DIR")
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PROMPTS_DIR)),
            output_dir: env_path("PROMPTPAIR_OUTPUT_DIR")
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            variants_file: env_path("PROMPTPAIR_VARIANTS_FILE"),
            exceptions_file: env_path("PROMPTPAIR_EXCEPTIONS_FILE"),
            min_confidence,
            log_level,
        }
    }
}

impl HarvestConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the threshold is outside (0, 1], no log
    /// directory is set, or the log level is unknown.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_confidence > 0.0 && self.min_confidence <= 1.0) {
            return Err(ConfigError::ValidationFailed(format!(
                "Minimum confidence must be in (0, 1], got {}",
                self.min_confidence
            )));
        }

        if self.log_dirs.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "At least one log directory is required".to_string(),
            ));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    pub fn classifier_config(&self) -> ClassifierConfig {
        ClassifierConfig {
            min_confidence: self.min_confidence,
            ..Default::default()
        }
    }

    /// Converts configuration to a display map for output formatting
    pub fn to_display_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();

        map.insert(
            "log_dirs".to_string(),
            self.log_dirs
                .iter()
                .map(|d| d.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        );
        map.insert(
            "types_dir".to_string(),
            self.types_dir.display().to_string(),
        );
        map.insert(
            "prompts_dir".to_string(),
            self.prompts_dir.display().to_string(),
        );
        map.insert(
            "output_dir".to_string(),
            self.output_dir.display().to_string(),
        );
        if let Some(ref file) = self.variants_file {
            map.insert("variants_file".to_string(), file.display().to_string());
        }
        if let Some(ref file) = self.exceptions_file {
            map.insert("exceptions_file".to_string(), file.display().to_string());
        }
        map.insert(
            "min_confidence".to_string(),
            self.min_confidence.to_string(),
        );
        map.insert("log_level".to_string(), self.log_level.clone());

        map
    }
}

impl fmt::Display for HarvestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Promptpair Configuration:")?;
        for dir in &self.log_dirs {
            writeln!(f, "  Log Dir: {}", dir.display())?;
        }
        writeln!(f, "  Types Dir: {}", self.types_dir.display())?;
        writeln!(f, "  Prompts Dir: {}", self.prompts_dir.display())?;
        writeln!(f, "  Output Dir: {}", self.output_dir.display())?;
        if let Some(ref file) = self.variants_file {
            writeln!(f, "  Variants File: {}", file.display())?;
        }
        if let Some(ref file) = self.exceptions_file {
            writeln!(f, "  Exceptions File: {}", file.display())?;
        }
        writeln!(f, "  Min Confidence: {}", self.min_confidence)?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}
