//! Configuration for buildgen
//!
//! Naming conventions of the source tree are read from environment variables
//! and fall back to defaults that match the vendor layout.
//!
//! # Environment Variables
//!
//! - `BUILDGEN_VENDOR_PREFIX`: prefix of external vendor references - default: "DevExpress"
//! - `BUILDGEN_EXCLUDED_FRAGMENTS`: comma separated name fragments that are never built - default: "SharePoint"
//! - `BUILDGEN_PRODUCT_FOLDER`: directory name that marks product projects - default: "XPF"
//! - `BUILDGEN_SOURCE_DIR_PROPERTY`: template property holding the source root - default: "DevExpressSourceDir"
//! - `BUILDGEN_TASK_ASSEMBLY_PREFIX`: file name prefix of the build task assembly - default: "DevExpress.Build.XamlResourceProcessing"
//! - `BUILDGEN_LOG_LEVEL`: logging level - default: "info"
//!
//! # Example
//!
//! ```
//! use buildgen::GeneratorConfig;
//!
//! let config = GeneratorConfig::default();
//! config.validate().expect("Invalid configuration");
//! println!("{}", config);
//! ```

use std::env;
use std::fmt;
use thiserror::Error;

const DEFAULT_VENDOR_PREFIX: &str = "DevExpress";
const DEFAULT_EXCLUDED_FRAGMENTS: &str = "SharePoint";
const DEFAULT_PRODUCT_FOLDER: &str = "XPF";
const DEFAULT_SOURCE_DIR_PROPERTY: &str = "DevExpressSourceDir";
const DEFAULT_TASK_ASSEMBLY_PREFIX: &str = "DevExpress.Build.XamlResourceProcessing";
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// References starting with this prefix are looked up as reference files.
    pub vendor_prefix: String,

    /// Units whose name contains any of these fragments are always skipped.
    pub excluded_fragments: Vec<String>,

    pub product_folder: String,

    /// Template property the source directory is written to; also the
    /// variable every project item path is rooted at.
    pub source_dir_property: String,

    pub task_assembly_prefix: String,

    pub log_level: String,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|| default.to_string())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

impl Default for GeneratorConfig {
    /// Reads `BUILDGEN_*` environment variables, falling back to defaults.
    fn default() -> Self {
        Self {
            vendor_prefix: env_or("BUILDGEN_VENDOR_PREFIX", DEFAULT_VENDOR_PREFIX),
            excluded_fragments: split_list(&env_or(
                "BUILDGEN_EXCLUDED_FRAGMENTS",
                DEFAULT_EXCLUDED_FRAGMENTS,
            )),
            product_folder: env_or("BUILDGEN_PRODUCT_FOLDER", DEFAULT_PRODUCT_FOLDER),
            source_dir_property: env_or(
                "BUILDGEN_SOURCE_DIR_PROPERTY",
                DEFAULT_SOURCE_DIR_PROPERTY,
            ),
            task_assembly_prefix: env_or(
                "BUILDGEN_TASK_ASSEMBLY_PREFIX",
                DEFAULT_TASK_ASSEMBLY_PREFIX,
            ),
            log_level: env_or("BUILDGEN_LOG_LEVEL", DEFAULT_LOG_LEVEL).to_lowercase(),
        }
    }
}

fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

impl GeneratorConfig {
    /// # Errors
    ///
    /// Returns `ConfigError` when a prefix is empty, the source directory
    /// property is not a valid element name, or the log level is unknown.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.vendor_prefix.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Vendor prefix must not be empty".to_string(),
            ));
        }
        if self.task_assembly_prefix.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Task assembly prefix must not be empty".to_string(),
            ));
        }
        if !is_xml_name(&self.source_dir_property) {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid source directory property name: '{}'",
                self.source_dir_property
            )));
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

    /// True when `name` contains one of the hard-excluded fragments.
    pub fn is_hard_excluded(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.excluded_fragments
            .iter()
            .any(|f| lower.contains(&f.to_lowercase()))
    }
}

impl fmt::Display for GeneratorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Buildgen Configuration:")?;
        writeln!(f, "  Vendor Prefix: {}", self.vendor_prefix)?;
        writeln!(f, "  Excluded Fragments: {}", self.excluded_fragments.join(", "))?;
        writeln!(f, "  Product Folder: {}", self.product_folder)?;
        writeln!(f, "  Source Dir Property: {}", self.source_dir_property)?;
        writeln!(f, "  Task Assembly Prefix: {}", self.task_assembly_prefix)?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}
