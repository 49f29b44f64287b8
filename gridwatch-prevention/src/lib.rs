//! # GridWatch Prevention
//!
//! Host-firewall enforcement. The executor depends only on the
//! [`FirewallEnforcer`] capability; the concrete backend wraps the platform
//! firewall CLI (`iptables` or `netsh`) behind a structured argv invocation,
//! with the address validated before it reaches any command line.

pub mod firewall;

pub use firewall::{
    platform_enforcer, DisabledFirewall, FirewallEnforcer, FirewallError, IptablesFirewall,
    NetshFirewall,
};
