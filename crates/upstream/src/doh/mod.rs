//! DNS-over-HTTPS client resolver (RFC 8484).
//!
//! Queries are carried as `application/dns-message` payloads, POSTed as
//! the request body or GET-encoded into a `dns` URL parameter as unpadded
//! base64url. The endpoint is an RFC 6570 URI template; for GET it must
//! expand a `dns` variable.

pub(crate) mod h3;
pub(crate) mod transport;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use hickory_proto::op::Message;
use relay_dns_domain::{ClientInfo, HttpMethod, HttpsTransportKind, HttpsUpstreamConfig, ResolveError};
use reqwest::Url;
use tracing::debug;
use uritemplate::UriTemplate;

use crate::metrics::{rcode_label, ResolverMetrics};
use crate::padding::pad_query;
use crate::resolver::Resolver;
use transport::{DohRequest, DohResponse, HttpsTransport, TcpTransport, TransportError};

/// DNS-over-HTTPS forwarder with pluggable TCP (HTTP/2) and QUIC (HTTP/3)
/// transports.
pub struct DohResolver {
    id: String,
    endpoint: String,
    method: HttpMethod,
    transport: HttpsTransport,
    metrics: ResolverMetrics,
}

impl DohResolver {
    pub fn new(
        id: &str,
        endpoint: &str,
        config: HttpsUpstreamConfig,
    ) -> Result<Self, ResolveError> {
        // The template must expand to a parseable URL even before any
        // variables are supplied; POST only ever uses this form.
        let base_url = expand_template(endpoint, None)?;

        if config.method == HttpMethod::Get {
            validate_get_template(endpoint)?;
        }

        let tls = crate::tls::build_client_config(&config.tls)?;
        let transport = match config.transport {
            HttpsTransportKind::Tcp => {
                HttpsTransport::Tcp(TcpTransport::new(&base_url, &config, tls)?)
            }
            HttpsTransportKind::Quic => {
                HttpsTransport::Quic(h3::QuicTransport::new(&base_url, &config, tls)?)
            }
        };

        Ok(Self {
            id: id.to_string(),
            endpoint: endpoint.to_string(),
            method: config.method,
            transport,
            metrics: ResolverMetrics::new("client", id),
        })
    }

    pub fn metrics(&self) -> &ResolverMetrics {
        &self.metrics
    }

    async fn resolve_post(&self, query: &Message) -> Result<Message, ResolveError> {
        let wire = query
            .to_vec()
            .map_err(|e| self.track(ResolveError::Encode(e.to_string())))?;
        let url = self.expand_url(None)?;

        let request = DohRequest {
            method: HttpMethod::Post,
            url,
            body: Some(wire),
        };
        let response = self
            .transport
            .round_trip(request)
            .await
            .map_err(|e| self.track(self.transport_failure(e)))?;

        self.decode(response)
    }

    async fn resolve_get(&self, query: &Message) -> Result<Message, ResolveError> {
        let wire = query
            .to_vec()
            .map_err(|e| self.track(ResolveError::Encode(e.to_string())))?;
        let encoded = URL_SAFE_NO_PAD.encode(&wire);
        let url = self.expand_url(Some(&encoded))?;
        if !url.as_str().contains(&encoded) {
            return Err(self.track(ResolveError::Template(format!(
                "endpoint '{}' did not expand the dns variable",
                self.endpoint
            ))));
        }

        let request = DohRequest {
            method: HttpMethod::Get,
            url,
            body: None,
        };
        let response = self
            .transport
            .round_trip(request)
            .await
            .map_err(|e| self.track(self.transport_failure(e)))?;

        self.decode(response)
    }

    fn decode(&self, response: DohResponse) -> Result<Message, ResolveError> {
        if !(200..=299).contains(&response.status) {
            return Err(self.track(ResolveError::Status(response.status)));
        }
        match Message::from_vec(&response.body) {
            Ok(answer) => {
                self.metrics
                    .record_response(&rcode_label(answer.response_code()));
                Ok(answer)
            }
            Err(e) => Err(self.track(ResolveError::Decode(e.to_string()))),
        }
    }

    fn expand_url(&self, dns: Option<&str>) -> Result<Url, ResolveError> {
        expand_template(&self.endpoint, dns).map_err(|e| self.track(e))
    }

    fn transport_failure(&self, err: TransportError) -> ResolveError {
        match err {
            TransportError::Request(e) => ResolveError::Request(e),
            TransportError::Read(e) => ResolveError::Read(e),
            TransportError::Send(e) => match self.method {
                HttpMethod::Post => ResolveError::Post(e),
                HttpMethod::Get => ResolveError::Get(e),
            },
        }
    }

    fn track(&self, err: ResolveError) -> ResolveError {
        if let Some(label) = err.metric_label() {
            self.metrics.record_error(&label);
        }
        err
    }
}

#[async_trait]
impl Resolver for DohResolver {
    async fn resolve(&self, query: &Message, ctx: &ClientInfo) -> Result<Message, ResolveError> {
        let domain = query
            .queries()
            .first()
            .map(|q| q.name().to_string())
            .unwrap_or_default();
        debug!(
            resolver = %self.endpoint,
            protocol = "doh",
            method = %self.method,
            client = %ctx.source_ip,
            domain = %domain,
            "querying upstream resolver"
        );

        // Pad before the query leaves the process so its length is
        // uniform under TLS.
        let mut query = query.clone();
        pad_query(&mut query);

        self.metrics.record_query();
        match self.method {
            HttpMethod::Post => self.resolve_post(&query).await,
            HttpMethod::Get => self.resolve_get(&query).await,
        }
    }

    fn id(&self) -> &str {
        &self.id
    }
}

fn expand_template(template: &str, dns: Option<&str>) -> Result<Url, ResolveError> {
    let mut uri_template = UriTemplate::new(template);
    if let Some(value) = dns {
        uri_template.set("dns", value);
    }
    let expanded = uri_template.build();
    Url::parse(&expanded)
        .map_err(|e| ResolveError::Template(format!("'{}': {}", expanded, e)))
}

/// A GET endpoint that never expands a `dns` variable would send the
/// query nowhere and draw a remote 4xx; reject it at construction.
fn validate_get_template(endpoint: &str) -> Result<(), ResolveError> {
    const PROBE: &str = "dnstemplateprobe";
    let expanded = UriTemplate::new(endpoint).set("dns", PROBE).build();
    if !expanded.contains(PROBE) {
        return Err(ResolveError::Config(format!(
            "GET endpoint '{}' does not expand a dns variable",
            endpoint
        )));
    }
    Ok(())
}
