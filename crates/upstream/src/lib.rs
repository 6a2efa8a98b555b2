//! Upstream resolvers for Relay DNS.
//!
//! Everything here implements the [`Resolver`] contract: a resolver maps a
//! DNS query plus client context to a DNS response. Resolvers compose, so
//! a filter such as [`FastestIp`] wraps a forwarder such as [`DohResolver`],
//! which in turn owns its HTTPS transport.

pub mod doh;
pub mod fastest;
pub mod metrics;
pub mod padding;
pub mod resolver;
mod tls;

pub use doh::DohResolver;
pub use fastest::FastestIp;
pub use metrics::ResolverMetrics;
pub use resolver::Resolver;
