use async_trait::async_trait;
use hickory_proto::op::Message;
use relay_dns_domain::{ClientInfo, ResolveError};

/// A resolver answers a DNS query, usually by forwarding it upstream.
///
/// Implementations may hold child resolvers and delegate to them inside
/// `resolve`; children are provided at construction, there is no global
/// registry. A successful response is a syntactically valid DNS message
/// whose transaction ID matches the query's.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, query: &Message, ctx: &ClientInfo) -> Result<Message, ResolveError>;

    /// Operator-assigned identifier, stable for the resolver's lifetime.
    /// Used in logs and metrics.
    fn id(&self) -> &str;
}
