//! # GridWatch Configuration System
//!
//! Hierarchical configuration for all GridWatch subsystems.
//!
//! ## Features
//! - **Unified Configuration**: single source of truth across the pipeline
//! - **Validation**: runtime validation of every loaded parameter
//! - **Environment Awareness**: `GRIDWATCH_*` variables override file values

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

mod capture;
mod dashboard;
mod detection;
mod error;
mod prevention;
mod validation;

pub use capture::{CaptureConfig, CaptureMode};
pub use dashboard::DashboardConfig;
pub use detection::DetectionConfig;
pub use error::ConfigError;
pub use prevention::PreventionConfig;

/// Default configuration file consulted when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "config/gridwatch.yaml";

/// Top-level configuration container for all GridWatch components.
#[derive(Debug, Serialize, Deserialize, Validate, Default, Clone)]
pub struct GridwatchConfig {
    /// Raw-socket capture parameters.
    #[validate(nested)]
    pub capture: CaptureConfig,

    /// Detector thresholds and scan-table bounds.
    #[validate(nested)]
    pub detection: DetectionConfig,

    /// Firewall enforcement parameters.
    #[validate(nested)]
    pub prevention: PreventionConfig,

    /// Dashboard publication parameters.
    #[validate(nested)]
    pub dashboard: DashboardConfig,
}

impl GridwatchConfig {
    /// Load configuration from the default file and environment.
    ///
    /// Hierarchy:
    /// 1. Default values
    /// 2. `config/gridwatch.yaml`, when present
    /// 3. `GRIDWATCH_*` environment variables (`__` separates nesting)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new(DEFAULT_CONFIG_FILE))
    }

    /// Load configuration with an explicit file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(GridwatchConfig::default()));

        if path.exists() {
            figment = figment.merge(Yaml::file(path));
        }

        let config: GridwatchConfig = figment
            .merge(Env::prefixed("GRIDWATCH_").split("__"))
            .extract()?;

        config.validate()?;
        Ok(config)
    }
}
