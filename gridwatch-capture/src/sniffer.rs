//! Sniffer worker: streams frames from a [`PacketSource`] into the packet
//! channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tracing::{error, info};

use gridwatch_core::{CapturedFrame, Channel};

use crate::source::PacketSource;

/// Producer end of the pipeline. One sniffer owns one source; the source is
/// released on `stop` or drop, never leaked past shutdown.
pub struct Sniffer {
    source: Box<dyn PacketSource>,
    packets: Arc<Channel<CapturedFrame>>,
    running: AtomicBool,
    buffer_size: usize,
}

impl Sniffer {
    pub fn new(
        source: Box<dyn PacketSource>,
        packets: Arc<Channel<CapturedFrame>>,
        buffer_size: usize,
    ) -> Self {
        Self {
            source,
            packets,
            running: AtomicBool::new(false),
            buffer_size,
        }
    }

    /// Offset the analyzer must be configured with.
    pub fn ip_header_offset(&self) -> usize {
        self.source.ip_header_offset()
    }

    pub fn start(&self) {
        self.running.store(true, Ordering::SeqCst);
        info!("packet sniffer started");
    }

    /// Stops the read loop. Closing the source fails any in-progress read.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.source.close();
        info!("packet sniffer stopped");
    }

    /// Read loop. Each successful read of N > 0 bytes pushes a newly owned
    /// N-byte buffer; zero-byte reads are ignored. Read errors after `stop`
    /// exit the loop; any other error is logged and the loop continues.
    pub fn run(&self) {
        let mut buf = vec![0u8; self.buffer_size];

        while self.running.load(Ordering::SeqCst) {
            match self.source.read_frame(&mut buf) {
                Ok(0) => continue,
                Ok(n) => {
                    let frame = CapturedFrame::new(now_ns(), Bytes::copy_from_slice(&buf[..n]));
                    self.packets.push(frame);
                }
                Err(e) => {
                    if !self.running.load(Ordering::SeqCst) {
                        break;
                    }
                    error!("capture read failed: {e}");
                }
            }
        }
    }
}

#[cfg(unix)]
#[inline]
fn now_ns() -> u64 {
    unsafe {
        let mut ts = std::mem::MaybeUninit::uninit();
        libc::clock_gettime(libc::CLOCK_MONOTONIC, ts.as_mut_ptr());
        let ts = ts.assume_init();
        (ts.tv_sec as u64) * 1_000_000_000 + (ts.tv_nsec as u64)
    }
}

#[cfg(not(unix))]
#[inline]
fn now_ns() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
