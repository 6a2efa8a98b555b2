//! HTTP/3-over-QUIC transport for the DoH client.
//!
//! quinn's endpoint does no session management of its own: a connection
//! that hits the server's idle timeout is dead, and every stream opened on
//! it afterwards fails. [`QuicSession`] owns the live connection behind a
//! mutex and transparently redials it on the first stream-open failure, so
//! callers never observe an expired session.

use bytes::{Buf, Bytes, BytesMut};
use quinn::VarInt;
use relay_dns_domain::{HttpMethod, HttpsUpstreamConfig, ResolveError};
use reqwest::Url;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

use super::transport::{DohRequest, DohResponse, TransportError, DNS_MESSAGE_CONTENT_TYPE};

type H3SendRequest = h3::client::SendRequest<h3_quinn::OpenStreams, Bytes>;
type H3RequestStream = h3::client::RequestStream<h3_quinn::BidiStream<Bytes>, Bytes>;

/// Time allowed for each stage of the HTTP/3 exchange.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) struct QuicTransport {
    session: QuicSession,
}

impl QuicTransport {
    pub fn new(
        endpoint_url: &Url,
        config: &HttpsUpstreamConfig,
        mut tls: rustls::ClientConfig,
    ) -> Result<Self, ResolveError> {
        tls.alpn_protocols = vec![b"h3".to_vec()];

        let hostname = endpoint_url
            .host_str()
            .ok_or_else(|| {
                ResolveError::Config(format!("endpoint '{}' has no host", endpoint_url))
            })?
            .to_string();
        let port = endpoint_url.port_or_known_default().unwrap_or(443);

        // With a bootstrap address the dial target is rewritten while SNI
        // stays on the URL hostname.
        let dial_addr = match config.bootstrap_addr {
            Some(ip) => SocketAddr::new(ip, port).to_string(),
            None => format!("{}:{}", hostname, port),
        };

        let bind_addr = match (config.local_addr, config.bootstrap_addr) {
            (Some(ip), _) => SocketAddr::new(ip, 0),
            (None, Some(IpAddr::V6(_))) => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
            (None, _) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
        };

        let quic_tls = quinn::crypto::rustls::QuicClientConfig::try_from(std::sync::Arc::new(tls))
            .map_err(|e| ResolveError::Tls(format!("invalid QUIC TLS configuration: {}", e)))?;
        let mut endpoint = quinn::Endpoint::client(bind_addr).map_err(|e| {
            ResolveError::Config(format!("failed to bind QUIC endpoint on {}: {}", bind_addr, e))
        })?;
        endpoint.set_default_client_config(quinn::ClientConfig::new(std::sync::Arc::new(quic_tls)));

        Ok(Self {
            session: QuicSession::new(hostname, dial_addr, endpoint),
        })
    }

    pub async fn round_trip(&self, request: DohRequest) -> Result<DohResponse, TransportError> {
        let uri: http::Uri = request
            .url
            .as_str()
            .parse()
            .map_err(|e| TransportError::Request(format!("invalid request URL: {}", e)))?;

        // Never blocks; the session hides its own handshakes.
        self.session.ready().await;

        let mut stream = self
            .session
            .start_request(request.method, &uri, request.body.is_some())
            .await?;

        if let Some(body) = request.body {
            tokio::time::timeout(REQUEST_TIMEOUT, stream.send_data(Bytes::from(body)))
                .await
                .map_err(|_| TransportError::Send(format!("timeout sending body to {}", uri)))?
                .map_err(|e| TransportError::Send(format!("failed to send body to {}: {}", uri, e)))?;
        }

        tokio::time::timeout(REQUEST_TIMEOUT, stream.finish())
            .await
            .map_err(|_| TransportError::Send(format!("timeout finishing stream to {}", uri)))?
            .map_err(|e| TransportError::Send(format!("failed to finish stream to {}: {}", uri, e)))?;

        let response = tokio::time::timeout(REQUEST_TIMEOUT, stream.recv_response())
            .await
            .map_err(|_| TransportError::Send(format!("timeout awaiting response from {}", uri)))?
            .map_err(|e| {
                TransportError::Send(format!("failed to receive response from {}: {}", uri, e))
            })?;
        let status = response.status().as_u16();
        if !(200..=299).contains(&status) {
            // The client rejects the response on status alone; its body
            // is never read.
            return Ok(DohResponse {
                status,
                body: Bytes::new(),
            });
        }

        let mut body = BytesMut::new();
        while let Some(mut chunk) = tokio::time::timeout(REQUEST_TIMEOUT, stream.recv_data())
            .await
            .map_err(|_| TransportError::Read(format!("timeout reading body from {}", uri)))?
            .map_err(|e| TransportError::Read(format!("failed to read body from {}: {}", uri, e)))?
        {
            body.extend_from_slice(chunk.chunk());
            chunk.advance(chunk.remaining());
        }

        Ok(DohResponse {
            status,
            body: body.freeze(),
        })
    }
}

struct H3Conn {
    connection: quinn::Connection,
    send_request: H3SendRequest,
}

/// The live HTTP/3 connection plus everything needed to dial it again.
///
/// Stream opens are serialized by the mutex. The first open after an idle
/// timeout fails; the session then closes the dead connection, redials
/// with the stored parameters, installs the replacement atomically and
/// retries the open exactly once. Callers observe either success or a
/// single propagated error.
pub(crate) struct QuicSession {
    hostname: String,
    dial_addr: String,
    endpoint: quinn::Endpoint,
    conn: Mutex<Option<H3Conn>>,
    redials: AtomicU64,
}

impl QuicSession {
    fn new(hostname: String, dial_addr: String, endpoint: quinn::Endpoint) -> Self {
        Self {
            hostname,
            dial_addr,
            endpoint,
            conn: Mutex::new(None),
            redials: AtomicU64::new(0),
        }
    }

    /// Always ready. Session replacement re-runs a QUIC handshake behind
    /// the mutex, so the inner handshake signal would go stale across
    /// rotations; callers must treat the session as ready at all times.
    pub fn ready(&self) -> std::future::Ready<()> {
        std::future::ready(())
    }

    /// Number of redials performed over the session's lifetime.
    pub fn redial_count(&self) -> u64 {
        self.redials.load(Ordering::Relaxed)
    }

    async fn start_request(
        &self,
        method: HttpMethod,
        uri: &http::Uri,
        has_body: bool,
    ) -> Result<H3RequestStream, TransportError> {
        let mut live = self.conn.lock().await;
        let fresh = live.is_none();
        if fresh {
            *live = Some(self.dial().await?);
        }
        let Some(conn) = live.as_mut() else {
            // The dial above installed a connection; this only guards the
            // lock invariant.
            return Err(TransportError::Send(
                "QUIC session not established".to_string(),
            ));
        };

        match conn.send_request.send_request(build_request(method, uri, has_body)?).await {
            Ok(stream) => Ok(stream),
            Err(err) if fresh => Err(TransportError::Send(format!(
                "failed to open request stream to {}: {}",
                self.dial_addr, err
            ))),
            Err(err) => {
                debug!(server = %self.dial_addr, error = %err, "HTTP/3 connection stale, redialing");
                conn.connection.close(VarInt::from_u32(0), b"");

                let conn = live.insert(self.dial().await?);
                self.redials.fetch_add(1, Ordering::Relaxed);
                debug!(server = %self.dial_addr, redials = self.redial_count(), "HTTP/3 session replaced");

                conn.send_request
                    .send_request(build_request(method, uri, has_body)?)
                    .await
                    .map_err(|e| {
                        TransportError::Send(format!(
                            "failed to open request stream to {}: {}",
                            self.dial_addr, e
                        ))
                    })
            }
        }
    }

    async fn dial(&self) -> Result<H3Conn, TransportError> {
        let mut addrs = tokio::time::timeout(
            REQUEST_TIMEOUT,
            tokio::net::lookup_host(&self.dial_addr),
        )
        .await
        .map_err(|_| TransportError::Send(format!("timeout resolving {}", self.dial_addr)))?
        .map_err(|e| {
            TransportError::Send(format!("DNS resolution failed for {}: {}", self.dial_addr, e))
        })?;
        let addr = addrs.next().ok_or_else(|| {
            TransportError::Send(format!("no address found for {}", self.dial_addr))
        })?;

        let connecting = self.endpoint.connect(addr, &self.hostname).map_err(|e| {
            TransportError::Send(format!("failed to initiate QUIC connection to {}: {}", addr, e))
        })?;
        let connection = tokio::time::timeout(REQUEST_TIMEOUT, connecting)
            .await
            .map_err(|_| TransportError::Send(format!("timeout connecting to {}", addr)))?
            .map_err(|e| {
                TransportError::Send(format!(
                    "QUIC handshake with {}({}) failed: {}",
                    self.hostname, addr, e
                ))
            })?;

        let h3_conn = h3_quinn::Connection::new(connection.clone());
        let (mut driver, send_request) = h3::client::new(h3_conn).await.map_err(|e| {
            TransportError::Send(format!("failed to create HTTP/3 client for {}: {}", addr, e))
        })?;

        tokio::spawn(async move {
            let _ = std::future::poll_fn(|cx| driver.poll_close(cx)).await;
        });

        debug!(server = %self.dial_addr, hostname = %self.hostname, "HTTP/3 connection established");

        Ok(H3Conn {
            connection,
            send_request,
        })
    }
}

fn build_request(
    method: HttpMethod,
    uri: &http::Uri,
    has_body: bool,
) -> Result<http::Request<()>, TransportError> {
    let mut builder = http::Request::builder()
        .method(match method {
            HttpMethod::Get => http::Method::GET,
            HttpMethod::Post => http::Method::POST,
        })
        .uri(uri.clone())
        .header("accept", DNS_MESSAGE_CONTENT_TYPE);
    if has_body {
        builder = builder.header("content-type", DNS_MESSAGE_CONTENT_TYPE);
    }
    builder
        .body(())
        .map_err(|e| TransportError::Request(e.to_string()))
}
