//! Analyzer worker: parses frames off the packet channel and emits actions.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{info, warn};

use gridwatch_core::{ActionEvent, CapturedFrame, Channel};
use gridwatch_protocols::{FrameView, ModbusFrame};
use gridwatch_telemetry::MetricsRecorder;

use crate::scan::{ScanPolicy, ScanTable};

/// Consumer of the packet channel, producer of the action channel.
///
/// Parse failures are silent drops; detection hits are logged at warning
/// level, but the emitted action is the authoritative signal. The analyzer
/// never touches enforcement state.
pub struct PacketAnalyzer {
    packets: Arc<Channel<CapturedFrame>>,
    actions: Arc<Channel<ActionEvent>>,
    ip_offset: usize,
    modbus_port: u16,
    scan_table: Mutex<ScanTable>,
    running: AtomicBool,
    packets_analyzed: Arc<AtomicU64>,
    metrics: MetricsRecorder,
}

impl PacketAnalyzer {
    pub fn new(
        packets: Arc<Channel<CapturedFrame>>,
        actions: Arc<Channel<ActionEvent>>,
        ip_offset: usize,
        modbus_port: u16,
        scan_policy: ScanPolicy,
        packets_analyzed: Arc<AtomicU64>,
        metrics: MetricsRecorder,
    ) -> Self {
        Self {
            packets,
            actions,
            ip_offset,
            modbus_port,
            scan_table: Mutex::new(ScanTable::new(scan_policy)),
            running: AtomicBool::new(false),
            packets_analyzed,
            metrics,
        }
    }

    pub fn start(&self) {
        self.running.store(true, Ordering::SeqCst);
        info!("packet analyzer started");
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        info!("packet analyzer stopped");
    }

    /// Drains the packet channel; returns when it is closed and empty.
    /// All actions for frame N are published before frame N+1 is touched.
    pub fn run(&self) {
        while let Some(frame) = self.packets.pop() {
            self.analyze(&frame.payload);
            self.packets_analyzed.fetch_add(1, Ordering::Relaxed);
            self.metrics.packets_analyzed.inc();
        }
    }

    fn analyze(&self, buf: &[u8]) {
        let Some(view) = FrameView::new(buf, self.ip_offset) else {
            return;
        };
        let src_ip = view.src_ip().to_string();

        self.check_modbus_write(&view, &src_ip);

        if view.is_syn() {
            match view.dst_port() {
                Some(port) if port != 0 => self.check_port_scan(&src_ip, port),
                _ => {}
            }
        }
    }

    /// Stateless detector: any write-class Modbus function aimed at the
    /// Modbus port earns the source an immediate block.
    fn check_modbus_write(&self, view: &FrameView<'_>, src_ip: &str) {
        if view.dst_port() != Some(self.modbus_port) {
            return;
        }
        let Some(payload) = view.tcp_payload() else {
            return;
        };
        let Ok(modbus) = ModbusFrame::parse(payload) else {
            return;
        };
        if !modbus.function.is_write() {
            return;
        }

        let code = modbus.function.code();
        warn!("SCADA write attempt from {src_ip} (function code 0x{code:02X})");
        self.metrics.threats_detected.inc();
        self.actions.push(ActionEvent::BlockIp {
            ip: src_ip.to_string(),
            reason: format!("Unauthorized Modbus write (0x{code:02X})"),
        });
    }

    fn check_port_scan(&self, src_ip: &str, dst_port: u16) {
        if src_ip.is_empty() {
            return;
        }
        let tripped = self
            .scan_table
            .lock()
            .record_probe(src_ip, dst_port, Instant::now());

        if tripped {
            warn!("port scan detected from {src_ip}");
            self.metrics.threats_detected.inc();
            self.actions.push(ActionEvent::BlockIp {
                ip: src_ip.to_string(),
                reason: "Port scanning activity".to_string(),
            });
        }
    }
}
