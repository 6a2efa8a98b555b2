use relay_dns_domain::{ResolveError, TlsOptions};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Builds the rustls client configuration for an upstream from its
/// [`TlsOptions`]. Trust defaults to the bundled webpki roots; a CA bundle
/// path replaces them. ALPN is left empty here; each transport sets its
/// own protocol list.
pub(crate) fn build_client_config(options: &TlsOptions) -> Result<rustls::ClientConfig, ResolveError> {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let mut roots = rustls::RootCertStore::empty();
    match &options.ca_cert {
        Some(path) => {
            for cert in load_certs(path)? {
                roots.add(cert).map_err(|e| {
                    ResolveError::Tls(format!("invalid CA certificate in '{}': {}", path.display(), e))
                })?;
            }
        }
        None => roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned()),
    }

    let builder = rustls::ClientConfig::builder().with_root_certificates(roots);

    let config = match (&options.client_cert, &options.client_key) {
        (Some(cert_path), Some(key_path)) => {
            let certs = load_certs(cert_path)?;
            let key = load_key(key_path)?;
            builder.with_client_auth_cert(certs, key).map_err(|e| {
                ResolveError::Tls(format!("invalid client certificate or key: {}", e))
            })?
        }
        (None, None) => builder.with_no_client_auth(),
        _ => {
            return Err(ResolveError::Config(
                "client_cert and client_key must be set together".to_string(),
            ))
        }
    };

    Ok(config)
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, ResolveError> {
    let file = File::open(path)
        .map_err(|e| ResolveError::Tls(format!("failed to open '{}': {}", path.display(), e)))?;
    let certs: Result<Vec<_>, _> = rustls_pemfile::certs(&mut BufReader::new(file)).collect();
    let certs = certs
        .map_err(|e| ResolveError::Tls(format!("failed to parse '{}': {}", path.display(), e)))?;
    if certs.is_empty() {
        return Err(ResolveError::Tls(format!(
            "no certificates found in '{}'",
            path.display()
        )));
    }
    Ok(certs)
}

fn load_key(path: &Path) -> Result<PrivateKeyDer<'static>, ResolveError> {
    let file = File::open(path)
        .map_err(|e| ResolveError::Tls(format!("failed to open '{}': {}", path.display(), e)))?;
    rustls_pemfile::private_key(&mut BufReader::new(file))
        .map_err(|e| ResolveError::Tls(format!("failed to parse '{}': {}", path.display(), e)))?
        .ok_or_else(|| ResolveError::Tls(format!("no private key found in '{}'", path.display())))
}
