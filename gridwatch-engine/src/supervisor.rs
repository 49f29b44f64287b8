//! Pipeline supervision: wiring, worker threads, signals, and shutdown.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::{error, info};

use gridwatch_capture::{PacketSource, Sniffer};
use gridwatch_config::{CaptureMode, GridwatchConfig};
use gridwatch_core::{ActionEvent, CapturedFrame, Channel, ShutdownToken};
use gridwatch_detection::{PacketAnalyzer, ScanPolicy};
use gridwatch_prevention::{platform_enforcer, DisabledFirewall, FirewallEnforcer};
use gridwatch_telemetry::{DashboardPublisher, MetricsRecorder};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to install signal handler: {0}")]
    Signal(#[from] ctrlc::Error),

    #[error("failed to spawn worker thread: {0}")]
    Spawn(std::io::Error),

    #[error("worker thread panicked: {0}")]
    Worker(&'static str),
}

/// Owns the pipeline wiring and the shutdown sequence.
///
/// Exactly three long-running worker threads are spawned: sniffer, analyzer,
/// executor. The supervisor itself polls the shutdown token once per second
/// and then tears the pipeline down in order: sniffer stop, packet channel
/// shutdown, analyzer stop, action channel shutdown, executor stop.
pub struct Supervisor {
    config: GridwatchConfig,
}

impl Supervisor {
    pub fn new(config: GridwatchConfig) -> Self {
        Self { config }
    }

    /// Runs the pipeline until SIGINT or SIGTERM trips the shutdown token.
    pub fn run(&self) -> Result<(), PipelineError> {
        let shutdown = ShutdownToken::new();
        {
            let token = shutdown.clone();
            ctrlc::set_handler(move || {
                info!("shutdown signal received");
                token.trip();
            })?;
        }

        let firewall: Box<dyn FirewallEnforcer> = if self.config.prevention.enforce {
            platform_enforcer()
        } else {
            Box::new(DisabledFirewall)
        };

        self.run_with(self.acquire_source(), firewall, shutdown)
    }

    /// Runs the pipeline with explicit collaborators. `source` may be `None`
    /// when acquisition failed: the analyzer and executor stay live and
    /// simply starve, per the sniffer's failure semantics.
    pub fn run_with(
        &self,
        source: Option<Box<dyn PacketSource>>,
        firewall: Box<dyn FirewallEnforcer>,
        shutdown: ShutdownToken,
    ) -> Result<(), PipelineError> {
        banner();

        let packet_channel: Arc<Channel<CapturedFrame>> = Arc::new(Channel::new());
        let action_channel: Arc<Channel<ActionEvent>> = Arc::new(Channel::new());

        let publisher = Arc::new(DashboardPublisher::new(&self.config.dashboard.path));
        let metrics = MetricsRecorder::new();

        let ip_offset = source
            .as_ref()
            .map(|s| s.ip_header_offset())
            .unwrap_or_else(|| self.config.capture.mode.ip_header_offset());

        let sniffer = source.map(|s| {
            Arc::new(Sniffer::new(
                s,
                Arc::clone(&packet_channel),
                self.config.capture.buffer_size,
            ))
        });

        let analyzer = Arc::new(PacketAnalyzer::new(
            Arc::clone(&packet_channel),
            Arc::clone(&action_channel),
            ip_offset,
            self.config.detection.modbus_port,
            ScanPolicy {
                port_threshold: self.config.detection.scan_port_threshold,
                max_tracked: self.config.detection.scan_max_tracked,
                idle_window: Duration::from_secs(self.config.detection.scan_idle_secs),
            },
            publisher.packets_analyzed_counter(),
            metrics.clone(),
        ));

        let executor = Arc::new(crate::ActionExecutor::new(
            Arc::clone(&action_channel),
            firewall,
            Arc::clone(&publisher),
            metrics,
            self.config.prevention.whitelist.clone(),
            Duration::from_secs(self.config.dashboard.publish_interval_secs),
        ));

        if let Some(sniffer) = &sniffer {
            sniffer.start();
        }
        analyzer.start();
        executor.start();

        let sniffer_thread = sniffer.as_ref().map(|sniffer| {
            let sniffer = Arc::clone(sniffer);
            thread::Builder::new()
                .name("gw-sniffer".into())
                .spawn(move || sniffer.run())
                .map_err(PipelineError::Spawn)
        });
        let sniffer_thread = match sniffer_thread {
            Some(handle) => Some(handle?),
            None => None,
        };

        let analyzer_thread = {
            let analyzer = Arc::clone(&analyzer);
            thread::Builder::new()
                .name("gw-analyzer".into())
                .spawn(move || analyzer.run())
                .map_err(PipelineError::Spawn)?
        };

        let executor_thread = {
            let executor = Arc::clone(&executor);
            thread::Builder::new()
                .name("gw-executor".into())
                .spawn(move || executor.run())
                .map_err(PipelineError::Spawn)?
        };

        info!("all systems operational, monitoring traffic");

        while !shutdown.is_tripped() {
            thread::sleep(Duration::from_secs(1));
        }

        info!("initiating shutdown sequence");

        if let Some(sniffer) = &sniffer {
            sniffer.stop();
        }
        packet_channel.shutdown();
        if let Some(handle) = sniffer_thread {
            handle.join().map_err(|_| PipelineError::Worker("sniffer"))?;
        }

        analyzer.stop();
        analyzer_thread
            .join()
            .map_err(|_| PipelineError::Worker("analyzer"))?;

        action_channel.shutdown();
        executor_thread
            .join()
            .map_err(|_| PipelineError::Worker("executor"))?;
        executor.stop();

        info!("gridwatch terminated");
        Ok(())
    }

    /// Opens the live source named by the capture config. Acquisition
    /// failure is fatal to the sniffer only; the rest of the pipeline runs.
    fn acquire_source(&self) -> Option<Box<dyn PacketSource>> {
        let promiscuous = self.config.capture.promiscuous;
        match self.config.capture.mode {
            CaptureMode::Link => open_link_source(promiscuous),
            CaptureMode::Ip => open_ip_source(promiscuous),
        }
    }
}

#[cfg(target_os = "linux")]
fn open_link_source(promiscuous: bool) -> Option<Box<dyn PacketSource>> {
    match gridwatch_capture::AfPacketSource::open(promiscuous) {
        Ok(source) => Some(Box::new(source)),
        Err(e) => {
            error!("failed to initialize sniffer: {e}");
            None
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn open_link_source(_promiscuous: bool) -> Option<Box<dyn PacketSource>> {
    error!("link-layer capture is not supported on this platform");
    None
}

#[cfg(unix)]
fn open_ip_source(promiscuous: bool) -> Option<Box<dyn PacketSource>> {
    match gridwatch_capture::IpRawSource::open(promiscuous) {
        Ok(source) => Some(Box::new(source)),
        Err(e) => {
            error!("failed to initialize sniffer: {e}");
            None
        }
    }
}

#[cfg(not(unix))]
fn open_ip_source(_promiscuous: bool) -> Option<Box<dyn PacketSource>> {
    error!("IP-layer capture is not supported on this platform");
    None
}

fn banner() {
    info!("========================================");
    info!("  GridWatch IPS v{}", env!("CARGO_PKG_VERSION"));
    info!("  SCADA Intrusion Prevention System");
    #[cfg(target_os = "linux")]
    info!("  Platform: Linux (Production)");
    #[cfg(not(target_os = "linux"))]
    info!("  Platform: Compatibility Mode");
    info!("========================================");
}
