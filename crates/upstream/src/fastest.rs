//! Fastest-IP filtering resolver.
//!
//! Resolves through a child resolver, then TCP-probes every address in
//! the answer and keeps only the one that answered first. Meant to sit
//! below a cache so the probe cost is amortized over the cache TTL.

use async_trait::async_trait;
use hickory_proto::op::Message;
use hickory_proto::rr::{RData, Record, RecordType};
use relay_dns_domain::{ClientInfo, FastestProbeConfig, ResolveError};
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::debug;

use crate::resolver::Resolver;

/// The probe race gives up after this long and the original response is
/// returned unchanged.
const PROBE_DEADLINE: Duration = Duration::from_secs(2);

const DEFAULT_PROBE_PORT: u16 = 443;

/// Wraps a child resolver and reorders nothing: it either returns the
/// child's response verbatim or narrows its answer section to the single
/// record whose address completed a TCP connect first.
pub struct FastestIp {
    id: String,
    inner: Arc<dyn Resolver>,
    port: u16,
}

impl FastestIp {
    pub fn new(id: &str, inner: Arc<dyn Resolver>, config: FastestProbeConfig) -> Self {
        let port = if config.port == 0 {
            DEFAULT_PROBE_PORT
        } else {
            config.port
        };
        Self {
            id: id.to_string(),
            inner,
            port,
        }
    }

    /// Probes all candidates and returns the record whose connect
    /// finished first, successful or not. Whatever comes back first is
    /// used; there is no second chance for a slower success.
    async fn probe(&self, candidates: Vec<(Record, IpAddr)>) -> Result<Record, io::Error> {
        let (report_tx, mut report_rx) = mpsc::channel(candidates.len());

        for (record, ip) in candidates {
            let report_tx = report_tx.clone();
            let addr = SocketAddr::new(ip, self.port);
            tokio::spawn(async move {
                let outcome = match tokio::time::timeout(PROBE_DEADLINE, TcpStream::connect(addr))
                    .await
                {
                    Ok(Ok(stream)) => {
                        drop(stream);
                        Ok(())
                    }
                    Ok(Err(e)) => Err(e),
                    Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "probe timed out")),
                };
                let _ = report_tx.send((record, outcome)).await;
            });
        }
        drop(report_tx);

        tokio::select! {
            report = report_rx.recv() => match report {
                Some((record, Ok(()))) => Ok(record),
                Some((_, Err(e))) => Err(e),
                None => Err(io::Error::new(io::ErrorKind::Other, "no probes were sent")),
            },
            _ = tokio::time::sleep(PROBE_DEADLINE) => {
                Err(io::Error::new(io::ErrorKind::TimedOut, "probe deadline expired"))
            }
        }
    }
}

#[async_trait]
impl Resolver for FastestIp {
    async fn resolve(&self, query: &Message, ctx: &ClientInfo) -> Result<Message, ResolveError> {
        let mut answer = self.inner.resolve(query, ctx).await?;

        let Some(question) = query.queries().first() else {
            return Ok(answer);
        };
        let question_type = question.query_type();
        if question_type != RecordType::A && question_type != RecordType::AAAA {
            return Ok(answer);
        }

        let candidates: Vec<(Record, IpAddr)> = answer
            .answers()
            .iter()
            .filter(|record| record.record_type() == question_type)
            .filter_map(|record| record_ip(record).map(|ip| (record.clone(), ip)))
            .collect();

        // A single address leaves nothing to race.
        if candidates.len() < 2 {
            return Ok(answer);
        }

        debug!(resolver = %self.id, probes = candidates.len(), port = self.port, "sending tcp probes");
        match self.probe(candidates).await {
            Ok(winner) => {
                answer.take_answers();
                answer.insert_answers(vec![winner]);
                Ok(answer)
            }
            Err(e) => {
                // Return the original response rather than trying to be
                // clever and pick one.
                debug!(resolver = %self.id, error = %e, "tcp probe failed");
                Ok(answer)
            }
        }
    }

    fn id(&self) -> &str {
        &self.id
    }
}

fn record_ip(record: &Record) -> Option<IpAddr> {
    match record.data() {
        Some(RData::A(a)) => Some(IpAddr::V4(a.0)),
        Some(RData::AAAA(aaaa)) => Some(IpAddr::V6(aaaa.0)),
        _ => None,
    }
}
