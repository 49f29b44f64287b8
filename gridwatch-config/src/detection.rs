//! Detector thresholds and scan-table bounds.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

/// Detection configuration parameters.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct DetectionConfig {
    /// Distinct destination ports from one source before a scan is reported.
    #[validate(range(min = 2, max = 1024))]
    #[serde(default = "default_scan_port_threshold")]
    pub scan_port_threshold: usize,

    /// Maximum sources tracked in the scan table before idle entries are
    /// evicted.
    #[validate(range(min = 64, max = 1_000_000))]
    #[serde(default = "default_scan_max_tracked")]
    pub scan_max_tracked: usize,

    /// Idle window after which an over-capacity tracker is evictable.
    #[validate(range(min = 1, max = 3600))]
    #[serde(default = "default_scan_idle_secs")]
    pub scan_idle_secs: u64,

    /// TCP port treated as Modbus/TCP.
    #[validate(range(min = 1))]
    #[serde(default = "default_modbus_port")]
    pub modbus_port: u16,
}

fn default_scan_port_threshold() -> usize {
    10
}

fn default_scan_max_tracked() -> usize {
    4096
}

fn default_scan_idle_secs() -> u64 {
    60
}

fn default_modbus_port() -> u16 {
    502
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            scan_port_threshold: default_scan_port_threshold(),
            scan_max_tracked: default_scan_max_tracked(),
            scan_idle_secs: default_scan_idle_secs(),
            modbus_port: default_modbus_port(),
        }
    }
}
