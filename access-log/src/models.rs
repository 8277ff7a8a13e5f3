use std::collections::BTreeMap;

use derive_more::From;
use serde::Serialize;

/// A single field value of a parsed line.
#[derive(Debug, From, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Str(String),
    Int(i64),
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

/// Fields extracted from one access-log line. Unmatched strings are empty and
/// unmatched or unconvertible integers are zero.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedFields {
    pub client_ip: String,
    pub host_ip: String,
    pub hostname: String,
    pub method: String,
    pub status_code: i64,
    pub upstream_time: i64,
    pub success_status: i64,
    pub fail_status: i64,
    pub slow_request: i64,
    pub path: String,
}

impl ParsedFields {
    pub fn is_slow(&self) -> bool {
        self.slow_request == 1
    }

    pub fn is_failure(&self) -> bool {
        self.fail_status == 1
    }

    pub fn into_map(self) -> BTreeMap<&'static str, FieldValue> {
        BTreeMap::from([
            ("client_ip", self.client_ip.into()),
            ("host_ip", self.host_ip.into()),
            ("hostname", self.hostname.into()),
            ("method", self.method.into()),
            ("status_code", self.status_code.into()),
            ("upstream_time", self.upstream_time.into()),
            ("success_status", self.success_status.into()),
            ("fail_status", self.fail_status.into()),
            ("slow_request", self.slow_request.into()),
            ("path", self.path.into()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asserting::prelude::*;

    #[test]
    fn default_fields_map_has_every_key() {
        let map = ParsedFields::default().into_map();
        assert_that!(map.len()).is_equal_to(10);
        assert_eq!(map.get("client_ip"), Some(&FieldValue::Str(String::new())));
        assert_eq!(map.get("status_code"), Some(&FieldValue::Int(0)));
        assert_eq!(map.get("path"), Some(&FieldValue::Str(String::new())));
    }

    #[test]
    fn field_values_serialize_untagged() {
        let json = serde_json::to_string(&vec![FieldValue::from("GET"), FieldValue::from(200)])
            .unwrap();
        assert_eq!(json, r#"["GET",200]"#);
    }
}
