//! Target URL parsing and address resolution

use std::net::{IpAddr, SocketAddr, ToSocketAddrs};

use crate::error::ConnectionError;

/// Identifies a streaming receiver: `scheme://host:port`.
///
/// The scheme names the transport family; the host may be a literal
/// address or a name requiring resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetUrl {
    pub scheme: String,
    pub host: String,
    pub port: u16,
}

impl TargetUrl {
    /// Parse a `scheme://host:port` string.
    pub fn parse(input: &str) -> Result<Self, ConnectionError> {
        let (scheme, rest) = input
            .split_once("://")
            .ok_or_else(|| ConnectionError::InvalidUrl(format!("missing scheme in '{input}'")))?;

        if scheme.is_empty() {
            return Err(ConnectionError::InvalidUrl(format!(
                "missing scheme in '{input}'"
            )));
        }

        // IPv6 literals carry their own colons: [::1]:9000
        let (host, port) = if let Some(stripped) = rest.strip_prefix('[') {
            let (host, tail) = stripped.split_once(']').ok_or_else(|| {
                ConnectionError::InvalidUrl(format!("unterminated IPv6 literal in '{input}'"))
            })?;
            let port = tail.strip_prefix(':').ok_or_else(|| {
                ConnectionError::InvalidUrl(format!("missing port in '{input}'"))
            })?;
            (host, port)
        } else {
            rest.rsplit_once(':').ok_or_else(|| {
                ConnectionError::InvalidUrl(format!("missing port in '{input}'"))
            })?
        };

        if host.is_empty() {
            return Err(ConnectionError::InvalidUrl(format!(
                "missing host in '{input}'"
            )));
        }

        let port: u16 = port
            .parse()
            .map_err(|_| ConnectionError::InvalidUrl(format!("invalid port in '{input}'")))?;

        Ok(Self {
            scheme: scheme.to_ascii_lowercase(),
            host: host.to_string(),
            port,
        })
    }

    /// Resolve the host to a socket address: numeric literal first, then
    /// hostname lookup.
    pub fn resolve(&self) -> Result<SocketAddr, ConnectionError> {
        if let Ok(ip) = self.host.parse::<IpAddr>() {
            return Ok(SocketAddr::new(ip, self.port));
        }

        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|err| {
                ConnectionError::AddressResolution(format!("{}: {}", self.host, err))
            })?
            .next()
            .ok_or_else(|| {
                ConnectionError::AddressResolution(format!("{}: no addresses", self.host))
            })
    }
}

impl std::fmt::Display for TargetUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.host.contains(':') {
            write!(f, "{}://[{}]:{}", self.scheme, self.host, self.port)
        } else {
            write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
        }
    }
}
