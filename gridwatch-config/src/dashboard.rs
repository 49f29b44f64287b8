//! Dashboard publication configuration.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

use crate::validation;

/// Dashboard JSON feed configuration.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct DashboardConfig {
    /// Output path of the JSON document; the parent directory is created on
    /// first write.
    #[validate(custom(function = validation::validate_output_path))]
    #[serde(default = "default_path")]
    pub path: String,

    /// Seconds between periodic rewrites when no events arrive.
    #[validate(range(min = 1, max = 60))]
    #[serde(default = "default_publish_interval_secs")]
    pub publish_interval_secs: u64,
}

fn default_path() -> String {
    "www/dashboard_data.json".into()
}

fn default_publish_interval_secs() -> u64 {
    2
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            publish_interval_secs: default_publish_interval_secs(),
        }
    }
}
