use prometheus::{IntGaugeVec, Registry, opts};

pub struct PromMetrics {
    pub requests: IntGaugeVec,
    pub status_codes: IntGaugeVec,
    pub methods: IntGaugeVec,
    pub path_hits: IntGaugeVec,
    pub host_hits: IntGaugeVec,
    pub host_upstream_ms: IntGaugeVec,
    pub hour_hits: IntGaugeVec,
    pub registry: Registry,
}

impl PromMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let requests = IntGaugeVec::new(
            opts!("access_log_requests", "Requests by outcome (success, failure, slow)"),
            &["outcome"],
        )
        .unwrap();

        let status_codes = IntGaugeVec::new(
            opts!("access_log_status", "Requests per HTTP status code"),
            &["status"],
        )
        .unwrap();

        let methods =
            IntGaugeVec::new(opts!("access_log_methods", "Requests per method"), &["method"])
                .unwrap();

        let path_hits =
            IntGaugeVec::new(opts!("access_log_path_hits", "Hits per path"), &["path"]).unwrap();

        let host_hits =
            IntGaugeVec::new(opts!("access_log_host_hits", "Hits per hostname"), &["host"])
                .unwrap();

        let host_upstream_ms = IntGaugeVec::new(
            opts!(
                "access_log_host_upstream_ms",
                "Cumulative upstream time in milliseconds per hostname"
            ),
            &["host"],
        )
        .unwrap();

        let hour_hits = IntGaugeVec::new(
            opts!("access_log_hour_hits", "Requests per UTC hour"),
            &["hour"],
        )
        .unwrap();

        for collector in [
            &requests,
            &status_codes,
            &methods,
            &path_hits,
            &host_hits,
            &host_upstream_ms,
            &hour_hits,
        ] {
            registry.register(Box::new(collector.clone())).unwrap();
        }

        Self {
            requests,
            status_codes,
            methods,
            path_hits,
            host_hits,
            host_upstream_ms,
            hour_hits,
            registry,
        }
    }
}
