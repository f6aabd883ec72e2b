// src/network.rs
// Preflight: make sure something is listening before seeding anything

use port_check::is_port_reachable;
use reqwest::Url;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetAddress {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for TargetAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreflightError {
    InvalidUrl(String),
    Unreachable(TargetAddress),
}

impl fmt::Display for PreflightError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreflightError::InvalidUrl(msg) => write!(f, "Invalid base URL: {}", msg),
            PreflightError::Unreachable(addr) => {
                write!(f, "Nothing is listening on {}; is the forum running?", addr)
            }
        }
    }
}

impl std::error::Error for PreflightError {}

pub struct NetworkUtils;

impl NetworkUtils {
    /// Host and port a base URL points at, with the scheme's default port.
    pub fn target_address(base_url: &str) -> Result<TargetAddress, PreflightError> {
        let url = Url::parse(base_url).map_err(|e| PreflightError::InvalidUrl(e.to_string()))?;

        let host = url
            .host_str()
            .ok_or_else(|| PreflightError::InvalidUrl(format!("{} has no host", base_url)))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| PreflightError::InvalidUrl(format!("{} has no port", base_url)))?;

        Ok(TargetAddress {
            host: host.to_string(),
            port,
        })
    }

    pub fn is_reachable(addr: &TargetAddress) -> bool {
        is_port_reachable(addr.to_string())
    }

    /// Fails when no TCP connection can be opened to the base URL's host.
    pub fn preflight(base_url: &str) -> Result<TargetAddress, PreflightError> {
        let addr = Self::target_address(base_url)?;
        if Self::is_reachable(&addr) {
            log::debug!("preflight: {} is accepting connections", addr);
            Ok(addr)
        } else {
            Err(PreflightError::Unreachable(addr))
        }
    }
}
