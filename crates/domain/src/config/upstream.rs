use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

use super::tls::TlsOptions;

/// HTTP method used for DNS-over-HTTPS queries (RFC 8484 §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    #[default]
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
            HttpMethod::Post => write!(f, "POST"),
        }
    }
}

/// Transport the HTTPS exchange runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpsTransportKind {
    /// HTTP/2 (or HTTP/1.1, as negotiated) over TLS over TCP.
    #[default]
    Tcp,
    /// HTTP/3 over QUIC.
    Quic,
}

impl fmt::Display for HttpsTransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpsTransportKind::Tcp => write!(f, "tcp"),
            HttpsTransportKind::Quic => write!(f, "quic"),
        }
    }
}

/// Construction-time options for a DNS-over-HTTPS upstream.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HttpsUpstreamConfig {
    #[serde(default)]
    pub method: HttpMethod,

    /// IP to connect to instead of resolving the endpoint hostname,
    /// avoiding a chicken-and-egg DNS lookup. TLS SNI and certificate
    /// verification still use the hostname from the endpoint URL.
    #[serde(default)]
    pub bootstrap_addr: Option<IpAddr>,

    #[serde(default)]
    pub transport: HttpsTransportKind,

    /// Source IP for outbound connections. Unset lets the OS choose.
    #[serde(default)]
    pub local_addr: Option<IpAddr>,

    #[serde(default)]
    pub tls: TlsOptions,
}

/// Options for the fastest-IP probing resolver.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FastestProbeConfig {
    /// Port number for TCP probes. 0 falls back to 443.
    #[serde(default)]
    pub port: u16,
}
