use dashmap::DashMap;
use hickory_proto::op::ResponseCode;
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-resolver counters: total queries, a response-code histogram and an
/// error histogram. Counters are monotonic and safe to update from any
/// thread. Rendering is left to exporters that iterate resolvers.
pub struct ResolverMetrics {
    role: String,
    id: String,
    queries: AtomicU64,
    responses: DashMap<String, u64>,
    errors: DashMap<String, u64>,
}

impl ResolverMetrics {
    pub fn new(role: &str, id: &str) -> Self {
        Self {
            role: role.to_string(),
            id: id.to_string(),
            queries: AtomicU64::new(0),
            responses: DashMap::new(),
            errors: DashMap::new(),
        }
    }

    pub fn record_query(&self) {
        self.queries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_response(&self, rcode: &str) {
        self.responses
            .entry(rcode.to_string())
            .and_modify(|c| *c += 1)
            .or_insert(1);
    }

    pub fn record_error(&self, category: &str) {
        self.errors
            .entry(category.to_string())
            .and_modify(|c| *c += 1)
            .or_insert(1);
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn queries(&self) -> u64 {
        self.queries.load(Ordering::Relaxed)
    }

    pub fn response_count(&self, rcode: &str) -> u64 {
        self.responses.get(rcode).map(|v| *v).unwrap_or(0)
    }

    pub fn error_count(&self, category: &str) -> u64 {
        self.errors.get(category).map(|v| *v).unwrap_or(0)
    }

    pub fn responses(&self) -> Vec<(String, u64)> {
        self.responses
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }

    pub fn errors(&self) -> Vec<(String, u64)> {
        self.errors
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }
}

/// Upper-case RCODE mnemonic used as the response-histogram key.
pub fn rcode_label(code: ResponseCode) -> String {
    match code {
        ResponseCode::NoError => "NOERROR".to_string(),
        ResponseCode::FormErr => "FORMERR".to_string(),
        ResponseCode::ServFail => "SERVFAIL".to_string(),
        ResponseCode::NXDomain => "NXDOMAIN".to_string(),
        ResponseCode::NotImp => "NOTIMP".to_string(),
        ResponseCode::Refused => "REFUSED".to_string(),
        ResponseCode::YXDomain => "YXDOMAIN".to_string(),
        ResponseCode::YXRRSet => "YXRRSET".to_string(),
        ResponseCode::NXRRSet => "NXRRSET".to_string(),
        ResponseCode::NotAuth => "NOTAUTH".to_string(),
        ResponseCode::NotZone => "NOTZONE".to_string(),
        other => format!("RCODE{}", u16::from(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let metrics = ResolverMetrics::new("client", "doh-test");
        assert_eq!(metrics.queries(), 0);
        assert_eq!(metrics.response_count("NOERROR"), 0);
        assert_eq!(metrics.error_count("post"), 0);
        assert_eq!(metrics.role(), "client");
        assert_eq!(metrics.id(), "doh-test");
    }

    #[test]
    fn counters_accumulate_per_label() {
        let metrics = ResolverMetrics::new("client", "doh-test");
        metrics.record_query();
        metrics.record_query();
        metrics.record_response("NOERROR");
        metrics.record_error("http500");
        metrics.record_error("http500");
        metrics.record_error("get");

        assert_eq!(metrics.queries(), 2);
        assert_eq!(metrics.response_count("NOERROR"), 1);
        assert_eq!(metrics.error_count("http500"), 2);
        assert_eq!(metrics.error_count("get"), 1);
        assert_eq!(metrics.error_count("post"), 0);
    }

    #[test]
    fn rcode_labels_use_dns_mnemonics() {
        assert_eq!(rcode_label(ResponseCode::NoError), "NOERROR");
        assert_eq!(rcode_label(ResponseCode::ServFail), "SERVFAIL");
        assert_eq!(rcode_label(ResponseCode::NXDomain), "NXDOMAIN");
    }
}
