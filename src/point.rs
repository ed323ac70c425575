//! Time-series points and the builder that normalizes collector output.
//!
//! Every record a collector returns becomes one [`Point`] whose measurement
//! is the module name. Field values must be scalars; a field that is not
//! (null, array, object, non-finite float) is dropped and the rest of the
//! point is kept. A record left without fields produces no point.
//!
//! Points of one batch share a timestamp, so values that identify a record
//! (a device, a guest) are emitted as tags; otherwise the store would merge
//! them into a single point.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::collector::{Collected, RawRecord};

/// Static tags attached to every point (e.g. `host`).
pub type StaticTags = BTreeMap<String, String>;

/// A scalar field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
}

impl FieldValue {
    /// Convert a JSON value, rejecting anything that is not a finite scalar.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        use serde_json::Value;

        match value {
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Self::Int(i))
                } else if let Some(u) = n.as_u64() {
                    Some(Self::UInt(u))
                } else {
                    n.as_f64().filter(|f| f.is_finite()).map(Self::Float)
                }
            }
            Value::String(s) => Some(Self::Str(s.clone())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    fn write_line_protocol(&self, out: &mut String) {
        match self {
            Self::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Self::Int(i) => {
                let _ = write!(out, "{i}i");
            }
            Self::UInt(u) => {
                let _ = write!(out, "{u}u");
            }
            Self::Float(f) => {
                let _ = write!(out, "{f:?}");
            }
            Self::Str(s) => {
                out.push('"');
                for c in s.chars() {
                    if matches!(c, '"' | '\\') {
                        out.push('\\');
                    }
                    out.push(c);
                }
                out.push('"');
            }
        }
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

/// A single time-series point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Measurement name, always the producing module's name.
    pub measurement: String,
    /// Indexed tags.
    pub tags: BTreeMap<String, String>,
    /// Field values.
    pub fields: BTreeMap<String, FieldValue>,
    /// Time the point was built.
    pub timestamp: DateTime<Utc>,
}

impl Point {
    /// Encode as one line of InfluxDB line protocol (nanosecond precision).
    pub fn to_line_protocol(&self) -> String {
        let mut line = String::new();
        escape_into(&mut line, &self.measurement, &[',', ' ']);

        for (key, value) in self
            .tags
            .iter()
            .filter(|(k, v)| !k.is_empty() && !v.is_empty())
        {
            line.push(',');
            escape_into(&mut line, key, &[',', '=', ' ']);
            line.push('=');
            escape_into(&mut line, value, &[',', '=', ' ']);
        }

        line.push(' ');
        for (idx, (key, value)) in self.fields.iter().enumerate() {
            if idx > 0 {
                line.push(',');
            }
            escape_into(&mut line, key, &[',', '=', ' ']);
            line.push('=');
            value.write_line_protocol(&mut line);
        }

        if let Some(ns) = self.timestamp.timestamp_nanos_opt() {
            let _ = write!(line, " {ns}");
        }
        line
    }
}

fn escape_into(out: &mut String, s: &str, special: &[char]) {
    for c in s.chars() {
        if c == '\\' || special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
}

/// Turns raw collector output into points.
#[derive(Debug, Clone, Default)]
pub struct PointBuilder {
    static_tags: StaticTags,
}

impl PointBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach these tags to every built point.
    ///
    /// Tags with an empty key or value cannot be encoded and are dropped.
    pub fn with_static_tags(mut self, tags: StaticTags) -> Self {
        self.static_tags = tags
            .into_iter()
            .filter(|(key, value)| {
                let keep = !key.is_empty() && !value.is_empty();
                if !keep {
                    tracing::warn!(tag = %key, "Dropping static tag with empty key or value");
                }
                keep
            })
            .collect();
        self
    }

    /// Build points for one module's output. Never fails.
    pub fn build(&self, module_name: &str, data: Collected) -> Vec<Point> {
        self.build_tagged(module_name, &[], data)
    }

    /// Like [`PointBuilder::build`], but record values under `tag_keys`
    /// become tags of their point instead of fields.
    pub fn build_tagged(
        &self,
        module_name: &str,
        tag_keys: &[&str],
        data: Collected,
    ) -> Vec<Point> {
        let timestamp = Utc::now();
        match data {
            Collected::Nothing => Vec::new(),
            Collected::One(record) => self
                .build_one(module_name, tag_keys, record, timestamp)
                .into_iter()
                .collect(),
            Collected::Many(records) => records
                .into_iter()
                .filter_map(|record| self.build_one(module_name, tag_keys, record, timestamp))
                .collect(),
        }
    }

    fn build_one(
        &self,
        module_name: &str,
        tag_keys: &[&str],
        record: RawRecord,
        timestamp: DateTime<Utc>,
    ) -> Option<Point> {
        let mut tags = self.static_tags.clone();
        let mut fields = BTreeMap::new();
        for (key, value) in record {
            if tag_keys.contains(&key.as_str()) {
                match tag_value(&value) {
                    Some(tag) => {
                        tags.insert(key, tag);
                    }
                    None => {
                        tracing::debug!(
                            module = %module_name, tag = %key, value = %value,
                            "Dropping unusable tag value"
                        );
                    }
                }
                continue;
            }

            match FieldValue::from_json(&value) {
                Some(field) => {
                    fields.insert(key, field);
                }
                None => {
                    tracing::debug!(
                        module = %module_name, field = %key, value = %value,
                        "Dropping non-scalar field"
                    );
                }
            }
        }

        if fields.is_empty() {
            tracing::debug!(module = %module_name, "Record has no usable fields, skipping point");
            return None;
        }

        Some(Point {
            measurement: module_name.to_string(),
            tags,
            fields,
            timestamp,
        })
    }
}

/// Render a scalar as a tag value; empty strings are not valid tags.
fn tag_value(value: &serde_json::Value) -> Option<String> {
    use serde_json::Value;

    let tag = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    (!tag.is_empty()).then_some(tag)
}
