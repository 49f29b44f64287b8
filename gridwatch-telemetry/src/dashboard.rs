//! Dashboard state publisher.
//!
//! Aggregates counters, the latest alert, and the blocked list, and rewrites
//! a JSON document atomically (temp file + rename) so an external reader
//! never observes a partial write. Every mutator takes the internal mutex;
//! callers never hold it, so no call sequence can self-deadlock.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Local;
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to serialize dashboard state: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write dashboard file: {0}")]
    Io(#[from] std::io::Error),
}

/// Operational state advertised to the dashboard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SystemStatus {
    Initializing,
    Running,
    Stopped,
}

/// Alert classification shown in the `latest_alert.type` field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlertKind {
    ModbusWrite,
    PortScan,
    Suspicious,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::ModbusWrite => "MODBUS_WRITE",
            AlertKind::PortScan => "PORT_SCAN",
            AlertKind::Suspicious => "SUSPICIOUS",
        }
    }

    /// Classification rule used by the executor: a block reason mentioning
    /// Modbus is a write alert, anything else a scan alert.
    pub fn from_block_reason(reason: &str) -> Self {
        if reason.contains("Modbus") {
            AlertKind::ModbusWrite
        } else {
            AlertKind::PortScan
        }
    }
}

#[derive(Clone, Debug, Default, Serialize)]
struct DashboardAlert {
    #[serde(rename = "type")]
    kind: String,
    src_ip: String,
    reason: String,
    timestamp: String,
}

struct DashboardState {
    status: SystemStatus,
    total_blocked: u64,
    total_threats: u64,
    latest_alert: DashboardAlert,
    blocked_list: Vec<String>,
}

#[derive(Serialize)]
struct DashboardDocument<'a> {
    system_status: SystemStatus,
    total_blocked: u64,
    total_threats: u64,
    packets_analyzed: u64,
    uptime_seconds: u64,
    latest_alert: &'a DashboardAlert,
    blocked_list: &'a [String],
    last_update: String,
}

/// Thread-safe aggregation point for everything the dashboard shows.
pub struct DashboardPublisher {
    path: PathBuf,
    started: Instant,
    packets_analyzed: Arc<AtomicU64>,
    state: Mutex<DashboardState>,
}

impl DashboardPublisher {
    /// Creates the publisher and writes the initial INITIALIZING document.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let publisher = Self {
            path: path.into(),
            started: Instant::now(),
            packets_analyzed: Arc::new(AtomicU64::new(0)),
            state: Mutex::new(DashboardState {
                status: SystemStatus::Initializing,
                total_blocked: 0,
                total_threats: 0,
                latest_alert: DashboardAlert::default(),
                blocked_list: Vec::new(),
            }),
        };
        publisher.write();
        info!("dashboard publisher initialized: {}", publisher.path.display());
        publisher
    }

    /// Shared counter the analyzer bumps once per inspected frame.
    pub fn packets_analyzed_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.packets_analyzed)
    }

    pub fn set_system_status(&self, status: SystemStatus) {
        self.state.lock().status = status;
    }

    pub fn increment_blocked(&self) {
        self.state.lock().total_blocked += 1;
    }

    pub fn increment_threats(&self) {
        self.state.lock().total_threats += 1;
    }

    /// Appends to the blocked list, preserving insertion order. Duplicates
    /// are ignored.
    pub fn add_blocked_ip(&self, ip: &str) {
        let mut state = self.state.lock();
        if !state.blocked_list.iter().any(|b| b == ip) {
            state.blocked_list.push(ip.to_string());
        }
    }

    /// Removes the first matching entry from the blocked list.
    pub fn remove_blocked_ip(&self, ip: &str) {
        let mut state = self.state.lock();
        if let Some(pos) = state.blocked_list.iter().position(|b| b == ip) {
            state.blocked_list.remove(pos);
        }
    }

    pub fn set_latest_alert(&self, kind: AlertKind, src_ip: &str, reason: &str) {
        let mut state = self.state.lock();
        state.latest_alert = DashboardAlert {
            kind: kind.as_str().to_string(),
            src_ip: src_ip.to_string(),
            reason: reason.to_string(),
            timestamp: current_timestamp(),
        };
    }

    /// Current blocked list, in insertion order.
    pub fn blocked_list(&self) -> Vec<String> {
        self.state.lock().blocked_list.clone()
    }

    pub fn total_blocked(&self) -> u64 {
        self.state.lock().total_blocked
    }

    /// Serializes the current state and atomically replaces the output
    /// file. Failures are logged and retried by the next write.
    pub fn write(&self) {
        if let Err(e) = self.try_write() {
            error!("dashboard publication failed: {e}");
        }
    }

    fn try_write(&self) -> Result<(), PublishError> {
        let state = self.state.lock();
        let document = DashboardDocument {
            system_status: state.status,
            total_blocked: state.total_blocked,
            total_threats: state.total_threats,
            packets_analyzed: self.packets_analyzed.load(Ordering::Relaxed),
            uptime_seconds: self.started.elapsed().as_secs(),
            latest_alert: &state.latest_alert,
            blocked_list: &state.blocked_list,
            last_update: current_timestamp(),
        };
        let body = serde_json::to_vec_pretty(&document)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = tmp_path(&self.path);
        fs::write(&tmp, &body)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

fn current_timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn read_document(path: &Path) -> serde_json::Value {
        let body = fs::read_to_string(path).expect("dashboard file");
        serde_json::from_str(&body).expect("valid JSON document")
    }

    #[test]
    fn initial_document_reports_initializing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("www/dashboard_data.json");
        let _publisher = DashboardPublisher::new(&path);

        let doc = read_document(&path);
        assert_eq!(doc["system_status"], "INITIALIZING");
        assert_eq!(doc["total_blocked"], 0);
        assert_eq!(doc["blocked_list"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn block_membership_and_counters_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        let publisher = DashboardPublisher::new(&path);

        publisher.set_system_status(SystemStatus::Running);
        publisher.increment_blocked();
        publisher.increment_threats();
        publisher.add_blocked_ip("10.0.0.7");
        publisher.add_blocked_ip("10.0.0.7");
        publisher.set_latest_alert(AlertKind::PortScan, "10.0.0.7", "Port scanning activity");
        publisher.write();

        let doc = read_document(&path);
        assert_eq!(doc["system_status"], "RUNNING");
        assert_eq!(doc["total_blocked"], 1);
        assert_eq!(doc["total_threats"], 1);
        assert_eq!(doc["blocked_list"], serde_json::json!(["10.0.0.7"]));
        assert_eq!(doc["latest_alert"]["type"], "PORT_SCAN");
        assert_eq!(doc["latest_alert"]["src_ip"], "10.0.0.7");

        publisher.remove_blocked_ip("10.0.0.7");
        publisher.write();
        let doc = read_document(&path);
        assert_eq!(doc["blocked_list"].as_array().unwrap().len(), 0);
        // The block counter is monotonic.
        assert_eq!(doc["total_blocked"], 1);
    }

    #[test]
    fn blocked_list_preserves_insertion_order() {
        let dir = tempdir().unwrap();
        let publisher = DashboardPublisher::new(dir.path().join("s.json"));
        for ip in ["2.2.2.2", "1.1.1.1", "3.3.3.3"] {
            publisher.add_blocked_ip(ip);
        }
        assert_eq!(
            publisher.blocked_list(),
            vec!["2.2.2.2", "1.1.1.1", "3.3.3.3"]
        );
    }

    #[test]
    fn alert_classification_follows_reason() {
        assert_eq!(
            AlertKind::from_block_reason("Unauthorized Modbus write (0x06)"),
            AlertKind::ModbusWrite
        );
        assert_eq!(
            AlertKind::from_block_reason("Port scanning activity"),
            AlertKind::PortScan
        );
    }

    #[test]
    fn reasons_with_control_and_quote_characters_stay_valid_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("s.json");
        let publisher = DashboardPublisher::new(&path);
        publisher.set_latest_alert(AlertKind::Suspicious, "10.0.0.9", "odd \"reason\"\n\twith\x01controls");
        publisher.write();

        let doc = read_document(&path);
        assert_eq!(
            doc["latest_alert"]["reason"],
            "odd \"reason\"\n\twith\x01controls"
        );
    }

    #[test]
    fn packets_counter_feeds_the_document() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("s.json");
        let publisher = DashboardPublisher::new(&path);
        let counter = publisher.packets_analyzed_counter();
        counter.fetch_add(17, Ordering::Relaxed);
        publisher.write();
        assert_eq!(read_document(&path)["packets_analyzed"], 17);
    }

    #[test]
    fn rewrite_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("s.json");
        let publisher = DashboardPublisher::new(&path);
        publisher.write();
        assert!(path.exists());
        assert!(!tmp_path(&path).exists());
    }
}
