//! IPv4/TCP frame view over a raw capture buffer.
//!
//! The capture path delivers either a link-layer frame (14-byte Ethernet
//! header first) or a bare IP datagram, so every accessor is relative to the
//! IP-header offset fixed at sniffer construction. All reads are bounds
//! checked; a failed check means the frame is not what the accessor asked
//! for and the caller drops it silently.

use std::net::Ipv4Addr;

const IPV4_MIN_HEADER: usize = 20;
/// TCP options are not inspected; the transport payload is taken after the
/// fixed 20-byte TCP header.
const TCP_FIXED_HEADER: usize = 20;

const TCP_PROTOCOL: u8 = 6;
const TCP_FLAG_SYN: u8 = 0x02;
const TCP_FLAG_ACK: u8 = 0x10;

/// Borrowed view of a captured frame, anchored at its IP header.
#[derive(Clone, Copy, Debug)]
pub struct FrameView<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> FrameView<'a> {
    /// Anchors a view at `offset` bytes into `buf`. Returns `None` when the
    /// buffer cannot hold a minimal IPv4 header at that offset.
    pub fn new(buf: &'a [u8], offset: usize) -> Option<Self> {
        if buf.len() < offset + IPV4_MIN_HEADER {
            return None;
        }
        Some(Self { buf, offset })
    }

    #[inline]
    fn ip(&self) -> &'a [u8] {
        &self.buf[self.offset..]
    }

    /// IP header length in bytes, from the IHL nibble.
    #[inline]
    pub fn ihl(&self) -> usize {
        ((self.ip()[0] & 0x0F) as usize) * 4
    }

    #[inline]
    pub fn protocol(&self) -> u8 {
        self.ip()[9]
    }

    #[inline]
    pub fn is_tcp(&self) -> bool {
        self.protocol() == TCP_PROTOCOL
    }

    /// Source address from bytes 12..16 of the IP header.
    pub fn src_ip(&self) -> Ipv4Addr {
        let ip = self.ip();
        Ipv4Addr::new(ip[12], ip[13], ip[14], ip[15])
    }

    /// TCP/UDP destination port, or `None` when the frame is too short to
    /// carry one.
    pub fn dst_port(&self) -> Option<u16> {
        let ip = self.ip();
        let ihl = self.ihl();
        if ip.len() < ihl + 4 {
            return None;
        }
        Some(u16::from_be_bytes([ip[ihl + 2], ip[ihl + 3]]))
    }

    /// True for a TCP segment with SYN set and ACK clear: the shape of a
    /// scan probe, never of a SYN-ACK response.
    pub fn is_syn(&self) -> bool {
        if !self.is_tcp() {
            return false;
        }
        let ip = self.ip();
        let ihl = self.ihl();
        if ip.len() < ihl + 14 {
            return false;
        }
        let flags = ip[ihl + 13];
        flags & TCP_FLAG_SYN != 0 && flags & TCP_FLAG_ACK == 0
    }

    /// Transport payload after the fixed-size TCP header, or `None` for
    /// non-TCP frames and frames truncated before the payload.
    pub fn tcp_payload(&self) -> Option<&'a [u8]> {
        if !self.is_tcp() {
            return None;
        }
        let ip = self.ip();
        let start = self.ihl() + TCP_FIXED_HEADER;
        if ip.len() < start {
            return None;
        }
        Some(&ip[start..])
    }
}
