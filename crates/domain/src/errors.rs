use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ResolveError {
    #[error("failed to encode DNS query: {0}")]
    Encode(String),

    #[error("failed to expand endpoint template: {0}")]
    Template(String),

    #[error("failed to build HTTP request: {0}")]
    Request(String),

    #[error("POST request failed: {0}")]
    Post(String),

    #[error("GET request failed: {0}")]
    Get(String),

    #[error("unexpected status code {0}")]
    Status(u16),

    #[error("failed to read response body: {0}")]
    Read(String),

    #[error("failed to decode DNS response: {0}")]
    Decode(String),

    #[error("TLS configuration error: {0}")]
    Tls(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ResolveError {
    /// The error-histogram label for this failure, or `None` for
    /// construction-time errors that never reach a metrics sink.
    pub fn metric_label(&self) -> Option<String> {
        match self {
            ResolveError::Encode(_) => Some("pack".to_string()),
            ResolveError::Template(_) => Some("template".to_string()),
            ResolveError::Request(_) => Some("http".to_string()),
            ResolveError::Post(_) => Some("post".to_string()),
            ResolveError::Get(_) => Some("get".to_string()),
            ResolveError::Status(code) => Some(format!("http{}", code)),
            ResolveError::Read(_) => Some("read".to_string()),
            ResolveError::Decode(_) => Some("unpack".to_string()),
            ResolveError::Tls(_) | ResolveError::Config(_) => None,
        }
    }
}
