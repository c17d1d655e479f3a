//! IPv4-only address parsing, used by components that generate on-wire
//! configuration (ignition/butane, Kubernetes objects) where an IPv6 or
//! otherwise malformed address would silently produce a broken fabric.

use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Errors parsing an [`Addr`] or [`AddrOrDhcp`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddrError {
    /// The string parsed as a valid IP address, but not an IPv4 one.
    #[error("address must be IPv4, got {0:?}")]
    Ipv4Only(String),
    /// The string did not parse as any IP address.
    #[error("invalid IPv4 address {0:?}")]
    Invalid(String),
}

/// A string expected to hold a literal IPv4 address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Addr(pub String);

impl Addr {
    /// Parse the address, requiring IPv4.
    pub fn parse(&self) -> Result<Ipv4Addr, AddrError> {
        match self.0.parse::<IpAddr>() {
            Ok(IpAddr::V4(v4)) => Ok(v4),
            Ok(IpAddr::V6(_)) => Err(AddrError::Ipv4Only(self.0.clone())),
            Err(_) => Err(AddrError::Invalid(self.0.clone())),
        }
    }
}

/// A string that is either the literal `dhcp` or an [`Addr`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddrOrDhcp(pub String);

impl AddrOrDhcp {
    /// Parse, returning `(true, Ipv4Addr::UNSPECIFIED)` for `"dhcp"`, or
    /// `(false, addr)` for a literal IPv4 address.
    pub fn parse(&self) -> Result<(bool, Ipv4Addr), AddrError> {
        if self.0.eq_ignore_ascii_case("dhcp") {
            return Ok((true, Ipv4Addr::UNSPECIFIED));
        }
        Addr(self.0.clone()).parse().map(|addr| (false, addr))
    }
}
