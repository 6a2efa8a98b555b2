//! HTTPS transports for the DoH client.
//!
//! Two transport kinds share one round-trip boundary so the client never
//! needs to know which one carries its requests: [`TcpTransport`] speaks
//! HTTP/2 (or HTTP/1.1, as negotiated) over TLS over TCP, the QUIC
//! transport in [`super::h3`] speaks HTTP/3.

use relay_dns_domain::{HttpMethod, HttpsUpstreamConfig, ResolveError};
use reqwest::Url;
use std::net::SocketAddr;
use std::time::Duration;

use super::h3::QuicTransport;

pub(crate) const DNS_MESSAGE_CONTENT_TYPE: &str = "application/dns-message";

/// Time allowed for the upstream to produce a response.
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(10);

/// How long idle connections are kept for reuse.
const IDLE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug)]
pub(crate) struct DohRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub body: Option<Vec<u8>>,
}

#[derive(Debug)]
pub(crate) struct DohResponse {
    pub status: u16,
    pub body: bytes::Bytes,
}

/// Transport-stage failure, categorized so the client can attribute it to
/// the right metrics label.
#[derive(Debug)]
pub(crate) enum TransportError {
    /// The request could not be constructed.
    Request(String),
    /// The round trip failed before a response arrived.
    Send(String),
    /// The response body could not be read.
    Read(String),
}

pub(crate) enum HttpsTransport {
    Tcp(TcpTransport),
    Quic(QuicTransport),
}

impl HttpsTransport {
    pub async fn round_trip(&self, request: DohRequest) -> Result<DohResponse, TransportError> {
        match self {
            HttpsTransport::Tcp(t) => t.round_trip(request).await,
            HttpsTransport::Quic(t) => t.round_trip(request).await,
        }
    }
}

/// HTTP-over-TCP transport backed by a shared `reqwest` client.
pub(crate) struct TcpTransport {
    client: reqwest::Client,
}

impl TcpTransport {
    pub fn new(
        endpoint: &Url,
        config: &HttpsUpstreamConfig,
        mut tls: rustls::ClientConfig,
    ) -> Result<Self, ResolveError> {
        // With a preconfigured TLS config reqwest will not negotiate h2 on
        // its own; the ALPN list must carry it explicitly.
        tls.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

        let mut builder = reqwest::Client::builder()
            .use_preconfigured_tls(tls)
            .no_gzip()
            .timeout(RESPONSE_TIMEOUT)
            .pool_idle_timeout(IDLE_TIMEOUT);

        if let Some(bootstrap) = config.bootstrap_addr {
            let (host, target) = pin_target(endpoint, bootstrap)?;
            builder = builder.resolve(&host, target);
        }
        if let Some(local) = config.local_addr {
            builder = builder.local_address(local);
        }

        let client = builder
            .build()
            .map_err(|e| ResolveError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    pub async fn round_trip(&self, request: DohRequest) -> Result<DohResponse, TransportError> {
        let mut builder = match request.method {
            HttpMethod::Post => self.client.post(request.url),
            HttpMethod::Get => self.client.get(request.url),
        };
        builder = builder.header("accept", DNS_MESSAGE_CONTENT_TYPE);
        if let Some(body) = request.body {
            builder = builder
                .header("content-type", DNS_MESSAGE_CONTENT_TYPE)
                .body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::Send(e.to_string()))?;

        let status = response.status().as_u16();
        if !(200..=299).contains(&status) {
            // The client rejects the response on status alone; its body
            // is never read.
            return Ok(DohResponse {
                status,
                body: bytes::Bytes::new(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Read(e.to_string()))?;

        Ok(DohResponse { status, body })
    }
}

/// Computes the dialer override for a bootstrap address: the endpoint
/// hostname is pinned to `bootstrap:port`, skipping its DNS lookup while
/// leaving SNI and certificate verification on the hostname itself.
pub(crate) fn pin_target(
    endpoint: &Url,
    bootstrap: std::net::IpAddr,
) -> Result<(String, SocketAddr), ResolveError> {
    let host = endpoint
        .host_str()
        .ok_or_else(|| ResolveError::Config(format!("endpoint '{}' has no host", endpoint)))?;
    let port = endpoint.port_or_known_default().unwrap_or(443);
    Ok((host.to_string(), SocketAddr::new(bootstrap, port)))
}
