//! Executor worker: consumes action events, enforces firewall policy, and
//! keeps the dashboard current.

use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ipnetwork::IpNetwork;
use parking_lot::Mutex;
use tracing::{error, info, warn};

use gridwatch_core::channel::PopTimeout;
use gridwatch_core::{ActionEvent, Channel};
use gridwatch_prevention::FirewallEnforcer;
use gridwatch_telemetry::{AlertKind, DashboardPublisher, MetricsRecorder, SystemStatus};

/// Consumer end of the action channel.
///
/// The block set is the executor's model of intent: a failed CLI call is
/// logged but never rolls it back. The block-set mutex and the publisher
/// mutex are never held at the same time.
pub struct ActionExecutor {
    actions: Arc<Channel<ActionEvent>>,
    firewall: Box<dyn FirewallEnforcer>,
    publisher: Arc<DashboardPublisher>,
    metrics: MetricsRecorder,
    blocked: Mutex<HashSet<String>>,
    whitelist: Vec<IpNetwork>,
    publish_interval: Duration,
    running: AtomicBool,
}

impl ActionExecutor {
    pub fn new(
        actions: Arc<Channel<ActionEvent>>,
        firewall: Box<dyn FirewallEnforcer>,
        publisher: Arc<DashboardPublisher>,
        metrics: MetricsRecorder,
        whitelist: Vec<IpNetwork>,
        publish_interval: Duration,
    ) -> Self {
        Self {
            actions,
            firewall,
            publisher,
            metrics,
            blocked: Mutex::new(HashSet::new()),
            whitelist,
            publish_interval,
            running: AtomicBool::new(false),
        }
    }

    pub fn start(&self) {
        self.running.store(true, Ordering::SeqCst);
        self.publisher.set_system_status(SystemStatus::Running);
        self.publisher.write();
        info!("action executor started");
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.publisher.set_system_status(SystemStatus::Stopped);
        self.publisher.write();
        info!("action executor stopped");
    }

    /// Drains the action channel; returns when it is closed and empty. The
    /// dashboard is rewritten whenever the publish interval elapses between
    /// pops, so `uptime_seconds` stays fresh on a quiet network.
    pub fn run(&self) {
        let mut last_write = Instant::now();

        loop {
            match self.actions.pop_timeout(self.publish_interval) {
                PopTimeout::Item(action) => self.execute(&action),
                PopTimeout::TimedOut => {}
                PopTimeout::Closed => break,
            }

            if last_write.elapsed() >= self.publish_interval {
                self.publisher.write();
                last_write = Instant::now();
            }
        }
    }

    pub fn is_blocked(&self, ip: &str) -> bool {
        self.blocked.lock().contains(ip)
    }

    fn execute(&self, action: &ActionEvent) {
        match action {
            ActionEvent::BlockIp { ip, reason } => self.block(ip, reason),
            ActionEvent::UnblockIp { ip } => self.unblock(ip),
            ActionEvent::LogSuspicious { ip, reason } => {
                warn!("suspicious activity from {ip}: {reason}");
                self.publisher
                    .set_latest_alert(AlertKind::Suspicious, ip, reason);
                self.publisher.write();
            }
        }
    }

    fn block(&self, ip: &str, reason: &str) {
        if self.whitelisted(ip) {
            warn!("refusing to block whitelisted source {ip}");
            return;
        }

        {
            let mut blocked = self.blocked.lock();
            if !blocked.insert(ip.to_string()) {
                return;
            }
        }

        error!("BLOCKING IP: {ip}");
        self.metrics.blocks_issued.inc();
        self.publisher.increment_blocked();
        self.publisher.increment_threats();
        self.publisher.add_blocked_ip(ip);
        self.publisher
            .set_latest_alert(AlertKind::from_block_reason(reason), ip, reason);

        if let Err(e) = self.firewall.block(ip) {
            error!("failed to install firewall rule for {ip}: {e}");
        }

        self.publisher.write();
    }

    fn unblock(&self, ip: &str) {
        self.blocked.lock().remove(ip);

        info!("UNBLOCKING IP: {ip}");
        self.publisher.remove_blocked_ip(ip);

        // Unblock CLI status is ignored.
        let _ = self.firewall.unblock(ip);

        self.publisher.write();
    }

    fn whitelisted(&self, ip: &str) -> bool {
        let Ok(addr) = ip.parse::<Ipv4Addr>() else {
            return false;
        };
        self.whitelist
            .iter()
            .any(|net| net.contains(IpAddr::V4(addr)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridwatch_prevention::FirewallError;
    use std::sync::atomic::AtomicUsize;
    use tempfile::tempdir;

    /// Counts invocations instead of touching any real firewall.
    struct RecordingFirewall {
        blocks: Arc<AtomicUsize>,
        unblocks: Arc<AtomicUsize>,
        fail: bool,
    }

    impl FirewallEnforcer for RecordingFirewall {
        fn block(&self, _ip: &str) -> Result<(), FirewallError> {
            self.blocks.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(FirewallError::CommandFailed(1))
            } else {
                Ok(())
            }
        }

        fn unblock(&self, _ip: &str) -> Result<(), FirewallError> {
            self.unblocks.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Fixture {
        executor: ActionExecutor,
        publisher: Arc<DashboardPublisher>,
        blocks: Arc<AtomicUsize>,
        unblocks: Arc<AtomicUsize>,
        _dir: tempfile::TempDir,
    }

    fn fixture(whitelist: Vec<IpNetwork>, fail_cli: bool) -> Fixture {
        let dir = tempdir().unwrap();
        let publisher = Arc::new(DashboardPublisher::new(dir.path().join("state.json")));
        let blocks = Arc::new(AtomicUsize::new(0));
        let unblocks = Arc::new(AtomicUsize::new(0));
        let firewall = RecordingFirewall {
            blocks: Arc::clone(&blocks),
            unblocks: Arc::clone(&unblocks),
            fail: fail_cli,
        };
        let executor = ActionExecutor::new(
            Arc::new(Channel::new()),
            Box::new(firewall),
            Arc::clone(&publisher),
            MetricsRecorder::new(),
            whitelist,
            Duration::from_secs(2),
        );
        Fixture {
            executor,
            publisher,
            blocks,
            unblocks,
            _dir: dir,
        }
    }

    fn block(ip: &str, reason: &str) -> ActionEvent {
        ActionEvent::BlockIp {
            ip: ip.into(),
            reason: reason.into(),
        }
    }

    #[test]
    fn duplicate_block_invokes_firewall_once() {
        let f = fixture(Vec::new(), false);
        f.executor.execute(&block("1.2.3.4", "Port scanning activity"));
        f.executor.execute(&block("1.2.3.4", "Port scanning activity"));

        assert_eq!(f.blocks.load(Ordering::SeqCst), 1);
        assert_eq!(f.publisher.total_blocked(), 1);
        assert_eq!(f.publisher.blocked_list(), vec!["1.2.3.4"]);
        assert!(f.executor.is_blocked("1.2.3.4"));
    }

    #[test]
    fn block_then_unblock_round_trips() {
        let f = fixture(Vec::new(), false);
        f.executor.execute(&block("1.2.3.4", "Port scanning activity"));
        f.executor.execute(&ActionEvent::UnblockIp {
            ip: "1.2.3.4".into(),
        });

        assert!(!f.executor.is_blocked("1.2.3.4"));
        assert!(f.publisher.blocked_list().is_empty());
        // Monotonic counter survives the unblock.
        assert_eq!(f.publisher.total_blocked(), 1);
        assert_eq!(f.unblocks.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cli_failure_keeps_in_memory_model() {
        let f = fixture(Vec::new(), true);
        f.executor.execute(&block("1.2.3.4", "Port scanning activity"));

        assert!(f.executor.is_blocked("1.2.3.4"));
        assert_eq!(f.publisher.blocked_list(), vec!["1.2.3.4"]);
    }

    #[test]
    fn whitelisted_sources_are_never_blocked() {
        let f = fixture(vec!["10.0.0.0/8".parse().unwrap()], false);
        f.executor.execute(&block("10.1.2.3", "Port scanning activity"));

        assert!(!f.executor.is_blocked("10.1.2.3"));
        assert_eq!(f.blocks.load(Ordering::SeqCst), 0);
        assert_eq!(f.publisher.total_blocked(), 0);
    }

    #[test]
    fn log_suspicious_updates_alert_only() {
        let f = fixture(Vec::new(), false);
        f.executor.execute(&ActionEvent::LogSuspicious {
            ip: "10.9.9.9".into(),
            reason: "odd traffic".into(),
        });

        assert_eq!(f.publisher.total_blocked(), 0);
        assert!(f.publisher.blocked_list().is_empty());
        assert!(!f.executor.is_blocked("10.9.9.9"));
    }

    #[test]
    fn distinct_blocks_accumulate_in_order() {
        let f = fixture(Vec::new(), false);
        for ip in ["5.5.5.5", "1.1.1.1", "9.9.9.9"] {
            f.executor.execute(&block(ip, "Port scanning activity"));
        }
        assert_eq!(f.publisher.total_blocked(), 3);
        assert_eq!(
            f.publisher.blocked_list(),
            vec!["5.5.5.5", "1.1.1.1", "9.9.9.9"]
        );
    }

    #[test]
    fn run_drains_channel_and_processes_actions() {
        let dir = tempdir().unwrap();
        let publisher = Arc::new(DashboardPublisher::new(dir.path().join("state.json")));
        let blocks = Arc::new(AtomicUsize::new(0));
        let actions = Arc::new(Channel::new());
        let executor = ActionExecutor::new(
            Arc::clone(&actions),
            Box::new(RecordingFirewall {
                blocks: Arc::clone(&blocks),
                unblocks: Arc::new(AtomicUsize::new(0)),
                fail: false,
            }),
            Arc::clone(&publisher),
            MetricsRecorder::new(),
            Vec::new(),
            Duration::from_millis(50),
        );

        for i in 0..20 {
            actions.push(block(&format!("10.0.0.{i}"), "Port scanning activity"));
        }
        actions.shutdown();

        executor.start();
        executor.run();
        executor.stop();

        assert_eq!(blocks.load(Ordering::SeqCst), 20);
        assert_eq!(publisher.total_blocked(), 20);
    }
}
