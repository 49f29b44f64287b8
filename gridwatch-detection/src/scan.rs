//! Stateful port-scan tracking.
//!
//! One tracker per source address that has sent SYN probes. A tracker
//! records the distinct destination ports hit and when the source was last
//! seen; crossing the port threshold reports the source and removes the
//! tracker, so a source that is later unblocked starts fresh.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

/// Tuning knobs for the scan detector.
#[derive(Clone, Debug)]
pub struct ScanPolicy {
    /// Distinct ports from one source before it is reported.
    pub port_threshold: usize,
    /// Table capacity; exceeding it triggers idle eviction.
    pub max_tracked: usize,
    /// Idle age at which an over-capacity tracker may be evicted.
    pub idle_window: Duration,
}

impl Default for ScanPolicy {
    fn default() -> Self {
        Self {
            port_threshold: 10,
            max_tracked: 4096,
            idle_window: Duration::from_secs(60),
        }
    }
}

struct ScanTracker {
    ports: HashSet<u16>,
    last_seen: Instant,
}

/// Per-source probe table. Callers provide the lock.
pub struct ScanTable {
    policy: ScanPolicy,
    trackers: HashMap<String, ScanTracker>,
}

impl ScanTable {
    pub fn new(policy: ScanPolicy) -> Self {
        Self {
            policy,
            trackers: HashMap::new(),
        }
    }

    /// Records one SYN probe. Returns `true` exactly when the source crosses
    /// the port threshold; its tracker is removed in the same call.
    pub fn record_probe(&mut self, src_ip: &str, dst_port: u16, now: Instant) -> bool {
        self.evict_idle(now);

        let tracker = self
            .trackers
            .entry(src_ip.to_string())
            .or_insert_with(|| ScanTracker {
                ports: HashSet::new(),
                last_seen: now,
            });
        tracker.last_seen = now;
        tracker.ports.insert(dst_port);

        if tracker.ports.len() >= self.policy.port_threshold {
            self.trackers.remove(src_ip);
            return true;
        }
        false
    }

    /// Sources currently tracked.
    pub fn tracked(&self) -> usize {
        self.trackers.len()
    }

    /// The table has no pruning on the hot path; only when it outgrows its
    /// bound are trackers idle past the window dropped.
    fn evict_idle(&mut self, now: Instant) {
        if self.trackers.len() <= self.policy.max_tracked {
            return;
        }
        let window = self.policy.idle_window;
        self.trackers
            .retain(|_, t| now.duration_since(t.last_seen) <= window);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(threshold: usize, max_tracked: usize) -> ScanPolicy {
        ScanPolicy {
            port_threshold: threshold,
            max_tracked,
            idle_window: Duration::from_secs(60),
        }
    }

    #[test]
    fn reports_on_tenth_distinct_port_only() {
        let mut table = ScanTable::new(ScanPolicy::default());
        let now = Instant::now();
        for port in 1000..1009 {
            assert!(!table.record_probe("10.0.0.7", port, now));
        }
        assert!(table.record_probe("10.0.0.7", 1009, now));
    }

    #[test]
    fn repeated_ports_do_not_advance_the_count() {
        let mut table = ScanTable::new(policy(3, 64));
        let now = Instant::now();
        assert!(!table.record_probe("10.0.0.7", 80, now));
        assert!(!table.record_probe("10.0.0.7", 80, now));
        assert!(!table.record_probe("10.0.0.7", 443, now));
        assert!(table.record_probe("10.0.0.7", 8080, now));
    }

    #[test]
    fn tracker_removed_after_report() {
        let mut table = ScanTable::new(policy(2, 64));
        let now = Instant::now();
        table.record_probe("10.0.0.7", 1, now);
        assert!(table.record_probe("10.0.0.7", 2, now));
        assert_eq!(table.tracked(), 0);
        // Fresh start for the same source.
        assert!(!table.record_probe("10.0.0.7", 3, now));
    }

    #[test]
    fn sources_are_tracked_independently() {
        let mut table = ScanTable::new(policy(2, 64));
        let now = Instant::now();
        table.record_probe("10.0.0.1", 1, now);
        table.record_probe("10.0.0.2", 1, now);
        assert!(table.record_probe("10.0.0.1", 2, now));
        assert_eq!(table.tracked(), 1);
    }

    #[test]
    fn evicts_idle_trackers_over_capacity() {
        let mut table = ScanTable::new(policy(100, 1));
        let start = Instant::now();
        table.record_probe("10.0.0.1", 1, start);
        table.record_probe("10.0.0.2", 1, start);
        // Table is over its bound and both entries are well past the idle
        // window by the time a third source shows up.
        let later = start + Duration::from_secs(120);
        table.record_probe("10.0.0.3", 1, later);
        assert_eq!(table.tracked(), 1);
    }

    #[test]
    fn active_trackers_survive_eviction() {
        let mut table = ScanTable::new(policy(100, 1));
        let start = Instant::now();
        table.record_probe("10.0.0.1", 1, start);
        table.record_probe("10.0.0.2", 1, start + Duration::from_secs(30));
        // Both entries are inside the 60 s window when the eviction pass
        // runs: nothing is dropped.
        table.record_probe("10.0.0.3", 1, start + Duration::from_secs(50));
        assert_eq!(table.tracked(), 3);
    }
}
