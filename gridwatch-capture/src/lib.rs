//! # GridWatch Capture
//!
//! Packet acquisition for the GridWatch pipeline. A [`PacketSource`] hands
//! raw frames to the [`Sniffer`], which streams them into the packet
//! channel. Two live sources cover the capture modes: an `AF_PACKET`
//! link-layer socket and a `SOCK_RAW` IP-layer socket. A scripted source
//! feeds canned frames for tests and replay.

pub mod sniffer;
pub mod source;

pub use sniffer::Sniffer;
pub use source::{CaptureError, PacketSource, ScriptedSource};

#[cfg(target_os = "linux")]
pub use source::AfPacketSource;

#[cfg(unix)]
pub use source::IpRawSource;
