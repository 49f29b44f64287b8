//! Packet source capability.
//!
//! The sniffer depends only on this interface; the concrete source fixes the
//! capture mode and therefore the IP-header offset the analyzer must use.
//! Cancellation is the socket itself: closing it from another thread makes a
//! blocked read fail promptly, which is the only way out of a quiet network.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
#[cfg(unix)]
use std::sync::atomic::AtomicI32;

use parking_lot::{Condvar, Mutex};
use thiserror::Error;
#[cfg(unix)]
use tracing::warn;

#[derive(Debug, Error)]
pub enum CaptureError {
    /// The raw socket could not be created or bound, usually for lack of
    /// privileges.
    #[error("failed to acquire raw socket (run with root privileges): {0}")]
    Socket(#[from] io::Error),

    /// No live capture backend exists for this platform.
    #[error("live capture is not supported on this platform")]
    Unsupported,
}

/// A source of raw frames.
///
/// `read_frame` blocks; `close` breaks a blocked read from another thread
/// and is the cancellation primitive for the sniffer loop.
pub trait PacketSource: Send + Sync {
    /// Fixed offset from the start of a delivered buffer to its IP header.
    fn ip_header_offset(&self) -> usize;

    /// Reads one frame into `buf`, returning its length.
    fn read_frame(&self, buf: &mut [u8]) -> io::Result<usize>;

    /// Releases the underlying descriptor, failing any in-progress read.
    fn close(&self);
}

/// Shared descriptor state for the live sources. The descriptor is swapped
/// to -1 on close so a concurrent reader never touches a reused fd.
#[cfg(unix)]
struct RawSocketFd {
    fd: AtomicI32,
}

#[cfg(unix)]
impl RawSocketFd {
    fn new(fd: libc::c_int) -> Self {
        Self {
            fd: AtomicI32::new(fd),
        }
    }

    fn recv_into(&self, buf: &mut [u8]) -> io::Result<usize> {
        let fd = self.fd.load(Ordering::SeqCst);
        if fd < 0 {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "socket closed"));
        }
        let n = unsafe {
            libc::recvfrom(
                fd,
                buf.as_mut_ptr() as *mut libc::c_void,
                buf.len(),
                0,
                std::ptr::null_mut(),
                std::ptr::null_mut(),
            )
        };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(n as usize)
    }

    fn close(&self) {
        let fd = self.fd.swap(-1, Ordering::SeqCst);
        if fd >= 0 {
            unsafe {
                libc::shutdown(fd, libc::SHUT_RDWR);
                libc::close(fd);
            }
        }
    }
}

#[cfg(unix)]
impl Drop for RawSocketFd {
    fn drop(&mut self) {
        self.close();
    }
}

/// Live link-layer source: `AF_PACKET`/`SOCK_RAW` with `ETH_P_ALL`, so every
/// frame the host sees is delivered with its Ethernet header intact.
#[cfg(target_os = "linux")]
pub struct AfPacketSource {
    sock: RawSocketFd,
}

#[cfg(target_os = "linux")]
impl AfPacketSource {
    /// Opens the raw socket. Requires `CAP_NET_RAW` or root. When
    /// `promiscuous` is set, `PACKET_MR_PROMISC` membership is requested on
    /// every interface; engage failure is a warning, not an error.
    pub fn open(promiscuous: bool) -> Result<Self, CaptureError> {
        let protocol = (libc::ETH_P_ALL as u16).to_be() as libc::c_int;
        let fd = unsafe { libc::socket(libc::AF_PACKET, libc::SOCK_RAW, protocol) };
        if fd < 0 {
            return Err(CaptureError::Socket(io::Error::last_os_error()));
        }

        if promiscuous {
            if let Err(e) = engage_promiscuous(fd) {
                warn!("failed to engage promiscuous receive: {e}");
            }
        }

        Ok(Self {
            sock: RawSocketFd::new(fd),
        })
    }
}

/// Adds `PACKET_MR_PROMISC` membership for each interface on the host.
/// Succeeds when at least one interface accepts the membership.
#[cfg(target_os = "linux")]
fn engage_promiscuous(fd: libc::c_int) -> io::Result<()> {
    unsafe {
        let interfaces = libc::if_nameindex();
        if interfaces.is_null() {
            return Err(io::Error::last_os_error());
        }

        let mut engaged = false;
        let mut last_err = io::Error::new(io::ErrorKind::NotFound, "no interfaces found");
        let mut cursor = interfaces;
        while (*cursor).if_index != 0 && !(*cursor).if_name.is_null() {
            let mut mreq: libc::packet_mreq = std::mem::zeroed();
            mreq.mr_ifindex = (*cursor).if_index as libc::c_int;
            mreq.mr_type = libc::PACKET_MR_PROMISC as libc::c_ushort;

            let rc = libc::setsockopt(
                fd,
                libc::SOL_PACKET,
                libc::PACKET_ADD_MEMBERSHIP,
                &mreq as *const libc::packet_mreq as *const libc::c_void,
                std::mem::size_of::<libc::packet_mreq>() as libc::socklen_t,
            );
            if rc == 0 {
                engaged = true;
            } else {
                last_err = io::Error::last_os_error();
            }
            cursor = cursor.add(1);
        }
        libc::if_freenameindex(interfaces);

        if engaged {
            Ok(())
        } else {
            Err(last_err)
        }
    }
}

#[cfg(target_os = "linux")]
impl PacketSource for AfPacketSource {
    fn ip_header_offset(&self) -> usize {
        14
    }

    fn read_frame(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.sock.recv_into(buf)
    }

    fn close(&self) {
        self.sock.close();
    }
}

/// Live IP-layer source: `SOCK_RAW`/`IPPROTO_IP` bound to `INADDR_ANY`.
/// Delivered buffers start at the IP header, so the offset is 0.
#[cfg(unix)]
pub struct IpRawSource {
    sock: RawSocketFd,
}

#[cfg(unix)]
impl IpRawSource {
    /// Opens and binds the raw socket. The driver-specific promiscuous
    /// toggle this capture mode relies on elsewhere has no counterpart
    /// here; when `promiscuous` is requested the engage failure is logged
    /// as a warning and capture continues.
    pub fn open(promiscuous: bool) -> Result<Self, CaptureError> {
        let fd = unsafe { libc::socket(libc::AF_INET, libc::SOCK_RAW, libc::IPPROTO_IP) };
        if fd < 0 {
            return Err(CaptureError::Socket(io::Error::last_os_error()));
        }

        let mut addr: libc::sockaddr_in = unsafe { std::mem::zeroed() };
        addr.sin_family = libc::AF_INET as libc::sa_family_t;
        addr.sin_addr.s_addr = libc::INADDR_ANY.to_be();
        addr.sin_port = 0;

        let rc = unsafe {
            libc::bind(
                fd,
                &addr as *const libc::sockaddr_in as *const libc::sockaddr,
                std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
            )
        };
        if rc < 0 {
            let err = io::Error::last_os_error();
            unsafe { libc::close(fd) };
            return Err(CaptureError::Socket(err));
        }

        if promiscuous {
            warn!("promiscuous receive toggle is unavailable for IP-layer capture on this platform");
        }

        Ok(Self {
            sock: RawSocketFd::new(fd),
        })
    }
}

#[cfg(unix)]
impl PacketSource for IpRawSource {
    fn ip_header_offset(&self) -> usize {
        0
    }

    fn read_frame(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.sock.recv_into(buf)
    }

    fn close(&self) {
        self.sock.close();
    }
}

/// Scripted source delivering a fixed frame sequence, then blocking until
/// closed. Used by tests and replay, and lets the whole pipeline run
/// without privileges.
pub struct ScriptedSource {
    offset: usize,
    frames: Mutex<VecDeque<Vec<u8>>>,
    drained: Condvar,
    closed: AtomicBool,
}

impl ScriptedSource {
    pub fn new(offset: usize, frames: Vec<Vec<u8>>) -> Self {
        Self {
            offset,
            frames: Mutex::new(frames.into()),
            drained: Condvar::new(),
            closed: AtomicBool::new(false),
        }
    }
}

impl PacketSource for ScriptedSource {
    fn ip_header_offset(&self) -> usize {
        self.offset
    }

    fn read_frame(&self, buf: &mut [u8]) -> io::Result<usize> {
        let mut frames = self.frames.lock();
        loop {
            if let Some(frame) = frames.pop_front() {
                let n = frame.len().min(buf.len());
                buf[..n].copy_from_slice(&frame[..n]);
                return Ok(n);
            }
            if self.closed.load(Ordering::SeqCst) {
                return Err(io::Error::new(io::ErrorKind::NotConnected, "source closed"));
            }
            self.drained.wait(&mut frames);
        }
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.drained.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn scripted_source_replays_in_order() {
        let source = ScriptedSource::new(0, vec![vec![1, 2, 3], vec![4]]);
        let mut buf = [0u8; 16];
        assert_eq!(source.read_frame(&mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], &[1, 2, 3]);
        assert_eq!(source.read_frame(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], 4);
    }

    #[test]
    fn close_fails_blocked_read() {
        let source = Arc::new(ScriptedSource::new(0, Vec::new()));
        let reader = {
            let source = Arc::clone(&source);
            thread::spawn(move || {
                let mut buf = [0u8; 16];
                source.read_frame(&mut buf)
            })
        };
        thread::sleep(Duration::from_millis(50));
        source.close();
        assert!(reader.join().unwrap().is_err());
    }
}
