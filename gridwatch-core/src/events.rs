//! Event types carried by the pipeline channels.

use bytes::Bytes;

/// A raw frame as delivered by the capture path.
///
/// The payload starts at the link layer or the IP header depending on the
/// capture mode; the analyzer is configured with the matching offset.
#[derive(Clone, Debug)]
pub struct CapturedFrame {
    /// Monotonic capture timestamp in nanoseconds.
    pub timestamp_ns: u64,
    /// Immutable frame bytes.
    pub payload: Bytes,
}

impl CapturedFrame {
    #[inline]
    pub fn new(timestamp_ns: u64, payload: Bytes) -> Self {
        Self {
            timestamp_ns,
            payload,
        }
    }
}

/// Mitigation request emitted by the analyzer and consumed by the executor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionEvent {
    /// Install a host-firewall drop rule for the source address.
    BlockIp { ip: String, reason: String },
    /// Remove a previously installed drop rule.
    UnblockIp { ip: String },
    /// Record an alert without touching enforcement state.
    LogSuspicious { ip: String, reason: String },
}

impl ActionEvent {
    /// Source address the event refers to.
    pub fn ip(&self) -> &str {
        match self {
            ActionEvent::BlockIp { ip, .. }
            | ActionEvent::UnblockIp { ip }
            | ActionEvent::LogSuspicious { ip, .. } => ip,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_event_exposes_ip() {
        let block = ActionEvent::BlockIp {
            ip: "10.0.0.7".into(),
            reason: "Port scanning activity".into(),
        };
        assert_eq!(block.ip(), "10.0.0.7");

        let unblock = ActionEvent::UnblockIp {
            ip: "10.0.0.8".into(),
        };
        assert_eq!(unblock.ip(), "10.0.0.8");
    }
}
