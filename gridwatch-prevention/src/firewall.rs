//! Firewall enforcement backends.
//!
//! Rules are installed through the platform firewall CLI, invoked with a
//! structured argument vector. Addresses are parsed as dotted-quad IPv4
//! before any invocation; a string that does not parse never reaches a
//! command line.

use std::net::Ipv4Addr;
use std::process::{Command, Stdio};

use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum FirewallError {
    /// The address is not a dotted-quad IPv4 string.
    #[error("refusing to enforce non-IPv4 address: {0:?}")]
    InvalidAddress(String),

    /// The firewall CLI could not be spawned.
    #[error("failed to invoke firewall command: {0}")]
    Spawn(#[from] std::io::Error),

    /// The firewall CLI ran and reported failure.
    #[error("firewall command exited with status {0}")]
    CommandFailed(i32),
}

/// Capability interface the executor enforces through.
///
/// Enforcement is best-effort: the caller keeps its in-memory model even
/// when a call fails, and unblock failures are ignored entirely.
pub trait FirewallEnforcer: Send + Sync {
    /// Installs a drop rule for all traffic from `ip`.
    fn block(&self, ip: &str) -> Result<(), FirewallError>;

    /// Removes the drop rule for `ip`.
    fn unblock(&self, ip: &str) -> Result<(), FirewallError>;
}

/// Validates and normalizes a dotted-quad address.
fn parse_dotted_quad(ip: &str) -> Result<Ipv4Addr, FirewallError> {
    ip.parse::<Ipv4Addr>()
        .map_err(|_| FirewallError::InvalidAddress(ip.to_string()))
}

fn run_quiet(program: &str, args: &[&str]) -> Result<(), FirewallError> {
    let status = Command::new(program)
        .args(args)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()?;
    if status.success() {
        Ok(())
    } else {
        Err(FirewallError::CommandFailed(status.code().unwrap_or(-1)))
    }
}

/// Linux backend: `iptables` drop rules on the INPUT chain.
#[derive(Debug, Default)]
pub struct IptablesFirewall;

impl FirewallEnforcer for IptablesFirewall {
    fn block(&self, ip: &str) -> Result<(), FirewallError> {
        let addr = parse_dotted_quad(ip)?.to_string();
        run_quiet(
            "iptables",
            &["-A", "INPUT", "-s", &addr, "-j", "DROP"],
        )
    }

    fn unblock(&self, ip: &str) -> Result<(), FirewallError> {
        let addr = parse_dotted_quad(ip)?.to_string();
        run_quiet(
            "iptables",
            &["-D", "INPUT", "-s", &addr, "-j", "DROP"],
        )
    }
}

/// Windows backend: named rules in the advanced firewall.
#[derive(Debug, Default)]
pub struct NetshFirewall;

impl NetshFirewall {
    fn rule_name(addr: &Ipv4Addr) -> String {
        format!("GridWatch_{addr}")
    }
}

impl FirewallEnforcer for NetshFirewall {
    fn block(&self, ip: &str) -> Result<(), FirewallError> {
        let addr = parse_dotted_quad(ip)?;
        let name = format!("name={}", Self::rule_name(&addr));
        let remote = format!("remoteip={addr}");
        run_quiet(
            "netsh",
            &[
                "advfirewall",
                "firewall",
                "add",
                "rule",
                &name,
                "dir=in",
                "interface=any",
                "action=block",
                &remote,
            ],
        )
    }

    fn unblock(&self, ip: &str) -> Result<(), FirewallError> {
        let addr = parse_dotted_quad(ip)?;
        let name = format!("name={}", Self::rule_name(&addr));
        run_quiet(
            "netsh",
            &["advfirewall", "firewall", "delete", "rule", &name],
        )
    }
}

/// Dry-run backend: validates the address and logs, installs nothing.
/// Selected when enforcement is disabled, and lets the pipeline run without
/// privileges.
#[derive(Debug, Default)]
pub struct DisabledFirewall;

impl FirewallEnforcer for DisabledFirewall {
    fn block(&self, ip: &str) -> Result<(), FirewallError> {
        let addr = parse_dotted_quad(ip)?;
        info!("enforcement disabled; would block {addr}");
        Ok(())
    }

    fn unblock(&self, ip: &str) -> Result<(), FirewallError> {
        let addr = parse_dotted_quad(ip)?;
        info!("enforcement disabled; would unblock {addr}");
        Ok(())
    }
}

/// The enforcer matching the build platform.
pub fn platform_enforcer() -> Box<dyn FirewallEnforcer> {
    if cfg!(windows) {
        Box::new(NetshFirewall)
    } else {
        Box::new(IptablesFirewall)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_injection_shaped_addresses() {
        let disabled = DisabledFirewall;
        for bad in [
            "10.0.0.1; rm -rf /",
            "1.2.3.4 -j ACCEPT",
            "256.1.1.1",
            "10.0.0",
            "",
            "fe80::1",
        ] {
            assert!(matches!(
                disabled.block(bad),
                Err(FirewallError::InvalidAddress(_))
            ));
        }
    }

    #[test]
    fn accepts_plain_dotted_quads() {
        let disabled = DisabledFirewall;
        assert!(disabled.block("10.0.0.7").is_ok());
        assert!(disabled.unblock("10.0.0.7").is_ok());
    }

    #[test]
    fn netsh_rule_name_embeds_address() {
        let addr: Ipv4Addr = "192.168.1.42".parse().unwrap();
        assert_eq!(NetshFirewall::rule_name(&addr), "GridWatch_192.168.1.42");
    }
}
