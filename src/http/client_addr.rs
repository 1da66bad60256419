//! Client address detection.
//!
//! The result is advisory and only ever logged. Proxy headers are
//! client-controlled, so nothing here feeds an access decision.

use std::fmt;

use axum::http::HeaderMap;

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_REAL_IP: &str = "x-real-ip";

/// Where the client address came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressSource {
    /// `X-Forwarded-For` or `X-Real-Ip`.
    Header,
    /// The TCP peer address.
    Socket,
}

impl fmt::Display for AddressSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressSource::Header => f.write_str("header"),
            AddressSource::Socket => f.write_str("socket"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientAddress {
    pub address: String,
    pub source: AddressSource,
}

/// Determine the client address from proxy headers, falling back to `peer`.
pub fn resolve_client_address(headers: &HeaderMap, peer: &str) -> ClientAddress {
    if let Some(forwarded) = header_str(headers, X_FORWARDED_FOR) {
        let first = forwarded.split(',').next().unwrap_or_default().trim();
        if !first.is_empty() {
            return ClientAddress {
                address: first.to_string(),
                source: AddressSource::Header,
            };
        }
    }

    if let Some(real_ip) = header_str(headers, X_REAL_IP) {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return ClientAddress {
                address: real_ip.to_string(),
                source: AddressSource::Header,
            };
        }
    }

    ClientAddress {
        address: strip_port(peer).to_string(),
        source: AddressSource::Socket,
    }
}

/// Drop everything from the last `:` on.
pub fn strip_port(remote: &str) -> &str {
    match remote.rfind(':') {
        Some(pos) => &remote[..pos],
        None => remote,
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}
