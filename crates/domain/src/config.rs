pub mod tls;
pub mod upstream;

pub use tls::TlsOptions;
pub use upstream::{FastestProbeConfig, HttpMethod, HttpsTransportKind, HttpsUpstreamConfig};
