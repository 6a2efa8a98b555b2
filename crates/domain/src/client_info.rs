use std::net::IpAddr;
use std::sync::Arc;

/// Per-query context carried alongside the DNS message. Resolvers pass it
/// through unchanged; it is only consulted for logging and routing.
#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub source_ip: IpAddr,
    pub listener_id: Arc<str>,
}

impl ClientInfo {
    pub fn new(source_ip: IpAddr, listener_id: impl Into<Arc<str>>) -> Self {
        Self {
            source_ip,
            listener_id: listener_id.into(),
        }
    }
}
