use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;

/// A single telemetry value as published by a station gateway.
///
/// Gateways are not consistent about types: the same flag can arrive as
/// `true`, `1` or `"ON"` depending on firmware, so values are kept loosely
/// typed here and coerced by the consumer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Converts a JSON scalar. Nulls, arrays and objects carry no usable value.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Number(n) => n.as_f64().map(Self::Number),
            Value::String(s) => Some(Self::Text(s.clone())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Parses a cell from a delimited export. Empty cells are absent.
    pub fn from_text(cell: &str) -> Option<Self> {
        let trimmed = cell.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.eq_ignore_ascii_case("true") {
            return Some(Self::Bool(true));
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return Some(Self::Bool(false));
        }
        match trimmed.parse::<f64>() {
            Ok(n) => Some(Self::Number(n)),
            Err(_) => Some(Self::Text(trimmed.to_string())),
        }
    }

    pub fn as_bool(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::Text(s) => {
                let s = s.trim();
                s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("on") || s == "1"
            }
        }
    }

    /// Numeric view of the value; `None` when it cannot be read as a finite number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::Number(n) => n.is_finite().then_some(*n),
            Self::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        }
    }
}

/// Timestamp of a snapshot as it was stored or exported.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotTime {
    /// Already typed by the store driver.
    Instant(OffsetDateTime),
    /// Textual form from a file export (RFC 3339 or `YYYY-MM-DD HH:MM:SS`).
    Text(String),
    /// Milliseconds since the Unix epoch.
    EpochMillis(i64),
}

impl SnapshotTime {
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self::Text(s.clone())),
            Value::Number(n) => n.as_i64().map(Self::EpochMillis),
            _ => None,
        }
    }
}

/// One raw telemetry snapshot for a site, before any normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSnapshot {
    pub timestamp: Option<SnapshotTime>,
    pub site_id: String,
    pub topic: Option<String>,
    pub fields: BTreeMap<String, FieldValue>,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum SnapshotDecodeError {
    #[error("snapshot is not a JSON object")]
    NotAnObject,
    #[error("snapshot has no siteId")]
    MissingSiteId,
}

impl RawSnapshot {
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Collects the scalar members of a JSON object into a field map.
    ///
    /// Anything that is not an object yields an empty map; downstream code
    /// treats missing fields as zero.
    pub fn fields_from_json(data: &Value) -> BTreeMap<String, FieldValue> {
        match data {
            Value::Object(map) => map
                .iter()
                .filter_map(|(k, v)| FieldValue::from_json(v).map(|fv| (k.clone(), fv)))
                .collect(),
            _ => BTreeMap::new(),
        }
    }

    /// Decodes a document of the form
    /// `{ "timeStamp": ..., "siteId": ..., "topic": ..., "data": { ... } }`.
    ///
    /// A missing or oddly typed `timeStamp` is kept as `None` so the record can
    /// be dropped (and counted) at normalization time rather than here.
    pub fn from_json(doc: &Value) -> Result<Self, SnapshotDecodeError> {
        let obj = doc.as_object().ok_or(SnapshotDecodeError::NotAnObject)?;

        let site_id = match obj.get("siteId") {
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(SnapshotDecodeError::MissingSiteId),
        };

        let timestamp = obj.get("timeStamp").and_then(SnapshotTime::from_json);
        let topic = obj
            .get("topic")
            .and_then(Value::as_str)
            .map(str::to_string);
        let fields = obj
            .get("data")
            .map(Self::fields_from_json)
            .unwrap_or_default();

        Ok(Self {
            timestamp,
            site_id,
            topic,
            fields,
        })
    }
}
