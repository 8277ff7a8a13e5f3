use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use derive_more::{Display, Error};
use serde::Serialize;

use crate::{
    models::{FieldValue, ParsedFields},
    parser::LineParser,
};

pub type Tags = BTreeMap<String, String>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum MetricError {
    #[display("metric name must not be empty")]
    EmptyName,
    #[display("tag key must not be empty (value {value:?})")]
    EmptyTagKey { value: String },
    #[display("can not parse the line: {line:?}, no record produced")]
    NoRecord { line: String },
}

/// A timestamped, tagged record built from one parsed line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub name: String,
    pub tags: Tags,
    pub fields: BTreeMap<&'static str, FieldValue>,
    pub timestamp: DateTime<Utc>,
    #[serde(skip)]
    parsed: ParsedFields,
}

impl Metric {
    pub fn new(
        name: &str,
        tags: &Tags,
        parsed: ParsedFields,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, MetricError> {
        if name.is_empty() {
            return Err(MetricError::EmptyName);
        }
        if let Some(value) = tags.get("") {
            return Err(MetricError::EmptyTagKey {
                value: value.clone(),
            });
        }
        let tags = tags
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(Self {
            name: name.to_string(),
            tags,
            fields: parsed.clone().into_map(),
            timestamp,
            parsed,
        })
    }

    /// Typed view of [`Metric::fields`].
    pub fn parsed(&self) -> &ParsedFields {
        &self.parsed
    }
}

/// Turns raw access-log buffers into [`Metric`]s under a fixed name.
#[derive(Debug, Clone)]
pub struct AccessLogParser {
    metric_name: String,
    default_tags: Tags,
    line_parser: LineParser,
}

impl AccessLogParser {
    pub fn new(metric_name: impl Into<String>, default_tags: Tags) -> Self {
        Self {
            metric_name: metric_name.into(),
            default_tags,
            line_parser: LineParser,
        }
    }

    /// Zero metrics for a blank buffer, exactly one otherwise.
    pub fn parse(&self, buf: &[u8]) -> Result<Vec<Metric>, MetricError> {
        let line = String::from_utf8_lossy(buf);
        let Some(parsed) = self.line_parser.parse(&line) else {
            return Ok(Vec::new());
        };
        let metric = Metric::new(&self.metric_name, &self.default_tags, parsed, Utc::now())?;
        Ok(vec![metric])
    }

    pub fn parse_line(&self, line: &str) -> Result<Metric, MetricError> {
        self.parse(line.as_bytes())?
            .into_iter()
            .next()
            .ok_or_else(|| MetricError::NoRecord {
                line: line.to_string(),
            })
    }

    pub fn set_default_tags(&mut self, tags: Tags) {
        self.default_tags = tags;
    }

    pub fn metric_name(&self) -> &str {
        &self.metric_name
    }
}
