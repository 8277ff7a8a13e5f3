use lru::LruCache;
use parking_lot::RwLock;
use std::{collections::HashMap, num::NonZero, sync::LazyLock};

use crate::{
    invariants::{Endpoint, Hostname, Timestamp},
    metric::Metric,
    prometheus::PromMetrics,
};

static MAX_HOURS: LazyLock<NonZero<usize>> =
    LazyLock::new(|| NonZero::new(6).expect("nonzero const"));
static MAX_PATHS: LazyLock<NonZero<usize>> =
    LazyLock::new(|| NonZero::new(10).expect("nonzero const"));

const TOP_HOSTS: usize = 10;
const TOP_PATHS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Success,
    Failure,
    Slow,
}

impl Outcome {
    pub fn label(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Slow => "slow",
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HostStats {
    pub hits: u64,
    pub upstream_ms: u64,
}

#[derive(Debug)]
pub struct Analytics {
    outcomes: RwLock<HashMap<Outcome, u64>>,
    statuses: RwLock<HashMap<i64, u64>>,
    methods: RwLock<HashMap<String, u64>>,
    paths: RwLock<LruCache<Endpoint, u64>>,
    hosts: RwLock<HashMap<Hostname, HostStats>>,
    by_hour: RwLock<LruCache<Timestamp, u64>>,
}

impl Default for Analytics {
    fn default() -> Self {
        Self {
            outcomes: RwLock::default(),
            statuses: RwLock::default(),
            methods: RwLock::default(),
            paths: RwLock::new(LruCache::new(*MAX_PATHS)),
            hosts: RwLock::default(),
            by_hour: RwLock::new(LruCache::new(*MAX_HOURS)),
        }
    }
}

impl Analytics {
    pub fn record(&self, metric: &Metric) {
        let fields = metric.parsed();
        self.record_outcome(if fields.is_failure() {
            Outcome::Failure
        } else {
            Outcome::Success
        });
        if fields.is_slow() {
            self.record_outcome(Outcome::Slow);
        }
        self.record_status(fields.status_code);
        self.record_method(&fields.method);
        self.record_path(&fields.path);
        self.record_host(&fields.hostname, fields.upstream_time);
        self.record_hour_hit(metric.timestamp.into());
    }

    pub fn record_outcome(&self, outcome: Outcome) {
        *self.outcomes.write().entry(outcome).or_default() += 1;
    }
    pub fn record_status(&self, code: i64) {
        *self.statuses.write().entry(code).or_default() += 1;
    }
    pub fn record_method(&self, method: &str) {
        if method.is_empty() {
            return;
        }
        let mut map = self.methods.write();
        *map.entry(method.to_string()).or_default() += 1;
    }
    pub fn record_path(&self, path: &str) {
        if path.is_empty() {
            return;
        }
        let mut map = self.paths.write();
        *map.get_or_insert_mut(path.into(), || 0) += 1;
    }
    pub fn record_host(&self, host: &str, upstream_ms: i64) {
        if host.is_empty() {
            return;
        }
        let mut map = self.hosts.write();
        let stats = map.entry(host.into()).or_default();
        stats.hits += 1;
        stats.upstream_ms += u64::try_from(upstream_ms).unwrap_or_default();
    }
    pub fn record_hour_hit(&self, hour: Timestamp) {
        let mut map = self.by_hour.write();
        *map.get_or_insert_mut(hour, || 0) += 1;
    }

    pub fn outcome_count(&self, outcome: Outcome) -> u64 {
        self.outcomes.read().get(&outcome).copied().unwrap_or_default()
    }
    pub fn status_frequency(&self) -> HashMap<i64, u64> {
        self.statuses.read().clone()
    }
    pub fn method_frequency(&self) -> HashMap<String, u64> {
        self.methods.read().clone()
    }
    pub fn top_path_frequency(&self, n: usize) -> Vec<(String, u64)> {
        let map = self.paths.read();
        let mut entries: Vec<_> = map.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        entries.sort_unstable_by(|a, b| b.1.cmp(&a.1));
        entries.truncate(n);
        entries
    }
    pub fn top_hosts(&self, n: usize) -> Vec<(String, HostStats)> {
        let map = self.hosts.read();
        let mut entries: Vec<_> = map.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        entries.sort_unstable_by_key(|(_, stats)| std::cmp::Reverse(stats.hits));
        entries.truncate(n);
        entries
    }
    pub fn hits_per_hour(&self) -> Vec<(Timestamp, u64)> {
        let map = self.by_hour.read();
        let mut sorted: Vec<_> = map.iter().map(|(t, n)| (*t, *n)).collect();
        sorted.sort_unstable_by_key(|(ts, _)| *ts);
        sorted
    }

    /// Overwrites every gauge with the current totals, so repeated scrapes
    /// report the same values.
    pub fn export_to_prometheus(&self, metrics: &PromMetrics) {
        metrics.requests.reset();
        for outcome in [Outcome::Success, Outcome::Failure, Outcome::Slow] {
            metrics
                .requests
                .with_label_values(&[outcome.label()])
                .set(to_gauge(self.outcome_count(outcome)));
        }

        metrics.status_codes.reset();
        for (status, count) in self.status_frequency() {
            metrics
                .status_codes
                .with_label_values(&[&status.to_string()])
                .set(to_gauge(count));
        }

        metrics.methods.reset();
        for (method, count) in self.method_frequency() {
            metrics
                .methods
                .with_label_values(&[&method])
                .set(to_gauge(count));
        }

        metrics.path_hits.reset();
        for (path, count) in self.top_path_frequency(TOP_PATHS) {
            metrics
                .path_hits
                .with_label_values(&[&path])
                .set(to_gauge(count));
        }

        metrics.host_hits.reset();
        metrics.host_upstream_ms.reset();
        for (host, stats) in self.top_hosts(TOP_HOSTS) {
            metrics
                .host_hits
                .with_label_values(&[&host])
                .set(to_gauge(stats.hits));
            metrics
                .host_upstream_ms
                .with_label_values(&[&host])
                .set(to_gauge(stats.upstream_ms));
        }

        metrics.hour_hits.reset();
        for (hour, count) in self.hits_per_hour() {
            let ts = hour.into_utc().format("%Y%m%d%H").to_string();
            metrics
                .hour_hits
                .with_label_values(&[&ts])
                .set(to_gauge(count));
        }
    }
}

fn to_gauge(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::{AccessLogParser, Tags};
    use asserting::prelude::*;
    use chrono::{Duration, TimeZone, Utc};

    fn record_lines(analytics: &Analytics, lines: &[&str]) {
        let parser = AccessLogParser::new("access_log", Tags::new());
        for line in lines {
            analytics.record(&parser.parse_line(line).unwrap());
        }
    }

    #[test]
    fn record_classifies_outcomes() {
        let analytics = Analytics::default();
        record_lines(
            &analytics,
            &[
                "t 10.0.0.1 10.0.0.2 a.example.com GET /ok HTTP/1.1 12 200 9 -",
                "t 10.0.0.1 10.0.0.2 a.example.com GET /slow HTTP/1.1 2500 200 9 -",
                "t 10.0.0.1 10.0.0.2 b.example.com POST /err HTTP/1.1 30 502 9 -",
            ],
        );

        assert_eq!(analytics.outcome_count(Outcome::Success), 2);
        assert_eq!(analytics.outcome_count(Outcome::Failure), 1);
        assert_eq!(analytics.outcome_count(Outcome::Slow), 1);
        assert_eq!(analytics.status_frequency().get(&200), Some(&2));
        assert_eq!(analytics.method_frequency().get("POST"), Some(&1));
    }

    #[test]
    fn record_host_accumulates_upstream_time() {
        let analytics = Analytics::default();
        analytics.record_host("a.example.com", 100);
        analytics.record_host("a.example.com", 250);
        analytics.record_host("b.example.com", 5);
        analytics.record_host("", 5);

        let hosts = analytics.top_hosts(10);
        assert_eq!(
            hosts[0],
            (
                "a.example.com".into(),
                HostStats {
                    hits: 2,
                    upstream_ms: 350
                }
            )
        );
        assert_that!(hosts.len()).is_equal_to(2);
    }

    #[test]
    fn record_path_counts() {
        let analytics = Analytics::default();
        analytics.record_path("/foo");
        analytics.record_path("/bar");
        analytics.record_path("/foo");
        analytics.record_path("");

        let paths = analytics.top_path_frequency(5);
        assert_eq!(paths, vec![("/foo".into(), 2), ("/bar".into(), 1)]);
    }

    #[test]
    fn hour_buckets_dont_eat_ram() {
        let analytics = Analytics::default();
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        for i in 0..1000 {
            analytics.record_hour_hit((ts + Duration::hours(i)).into());
        }

        let result = analytics.hits_per_hour();
        assert_that!(result.len()).is_in_range(0..=MAX_HOURS.get());
    }

    #[test]
    fn export_is_stable_across_scrapes() {
        let analytics = Analytics::default();
        record_lines(
            &analytics,
            &["t 10.0.0.1 10.0.0.2 a.example.com GET /ok HTTP/1.1 12 404 9 -"],
        );
        let metrics = PromMetrics::new();
        analytics.export_to_prometheus(&metrics);
        analytics.export_to_prometheus(&metrics);

        assert_eq!(
            metrics.requests.with_label_values(&["failure"]).get(),
            1
        );
        assert_eq!(metrics.status_codes.with_label_values(&["404"]).get(), 1);
        assert_eq!(metrics.host_upstream_ms.with_label_values(&["a.example.com"]).get(), 12);
    }
}
