use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// TLS material for an upstream connection. All fields optional: the
/// default trusts the bundled webpki roots and presents no client
/// certificate. `client_cert` and `client_key` must be set together.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TlsOptions {
    /// PEM bundle replacing the default root trust.
    #[serde(default)]
    pub ca_cert: Option<PathBuf>,

    /// PEM client certificate chain for mutual TLS.
    #[serde(default)]
    pub client_cert: Option<PathBuf>,

    /// PEM private key matching `client_cert`.
    #[serde(default)]
    pub client_key: Option<PathBuf>,
}
