//! Firewall enforcement configuration.

use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};
use validator::{self, Validate};

use crate::validation;

/// Prevention system configuration.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct PreventionConfig {
    /// Install real firewall rules. When false the executor keeps its
    /// in-memory model but invokes no CLI, which lets the pipeline run
    /// without privileges.
    #[serde(default = "default_enforce")]
    pub enforce: bool,

    /// Source networks that are never blocked.
    #[validate(custom(function = validation::validate_cidr_list))]
    #[serde(default)]
    pub whitelist: Vec<IpNetwork>,
}

fn default_enforce() -> bool {
    true
}

impl Default for PreventionConfig {
    fn default() -> Self {
        Self {
            enforce: default_enforce(),
            whitelist: Vec::new(),
        }
    }
}
