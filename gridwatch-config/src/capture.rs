//! Raw-socket capture configuration.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

/// Where the capture path anchors delivered buffers.
///
/// Link-layer capture prepends a 14-byte Ethernet header to every frame;
/// IP-layer capture delivers the IP header first. The analyzer is configured
/// with the matching offset at startup.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
    /// `AF_PACKET`/`SOCK_RAW` capture of whole link-layer frames.
    Link,
    /// `SOCK_RAW`/`IPPROTO_IP` capture starting at the IP header.
    Ip,
}

impl CaptureMode {
    /// Fixed offset from the start of a delivered buffer to its IP header.
    pub fn ip_header_offset(&self) -> usize {
        match self {
            CaptureMode::Link => 14,
            CaptureMode::Ip => 0,
        }
    }
}

/// Packet capture configuration.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct CaptureConfig {
    /// Capture mode, which fixes the IP-header offset.
    #[serde(default = "default_mode")]
    pub mode: CaptureMode,

    /// Per-read buffer size in bytes.
    #[validate(range(min = 4096, max = 1048576))]
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Ask the OS for promiscuous-equivalent delivery.
    #[serde(default = "default_promiscuous")]
    pub promiscuous: bool,
}

fn default_mode() -> CaptureMode {
    CaptureMode::Link
}

fn default_buffer_size() -> usize {
    65536
}

fn default_promiscuous() -> bool {
    true
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            buffer_size: default_buffer_size(),
            promiscuous: default_promiscuous(),
        }
    }
}
