pub mod client_info;
pub mod config;
pub mod errors;

pub use client_info::ClientInfo;
pub use config::{
    FastestProbeConfig, HttpMethod, HttpsTransportKind, HttpsUpstreamConfig, TlsOptions,
};
pub use errors::ResolveError;
