//! Custom validation functions shared across configuration modules.

use ipnetwork::IpNetwork;
use regex::Regex;
use validator::ValidationError;

/// Validate that a whitelist contains no catch-all or zero networks.
pub fn validate_cidr_list(cidrs: &[IpNetwork]) -> Result<(), ValidationError> {
    if cidrs.iter().any(|n| match n {
        IpNetwork::V4(net) => net.ip().octets() == [0, 0, 0, 0],
        IpNetwork::V6(_) => true,
    }) {
        return Err(ValidationError::new("invalid_cidr"));
    }
    Ok(())
}

/// Validate a dashboard output path: non-empty, no NUL, no trailing slash.
pub fn validate_output_path(path: &str) -> Result<(), ValidationError> {
    let re = Regex::new(r"^[^\0]+[^/\0]$").map_err(|_| ValidationError::new("invalid_regex"))?;
    if re.is_match(path) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_output_path"))
    }
}
