//! Replica log records -> display lines
//!
//! Replicas return their log output as a JSON array in the logs response
//! header. Each record carries `level`, `time` (epoch milliseconds), `name`
//! and `message`; any other keys are printed after the message in key order.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

/// Log payload parse errors
#[derive(Debug, Error)]
pub enum LogFormatError {
    /// Payload is not a JSON array of objects
    #[error("log payload is not a JSON array of objects: {0}")]
    Decode(#[from] serde_json::Error),

    /// Record lacks a required key
    #[error("log record {index} is missing '{field}'")]
    MissingField { index: usize, field: &'static str },

    /// Required key holds the wrong JSON type
    #[error("log record {index}: '{field}' must be a {expected}")]
    WrongType {
        index: usize,
        field: &'static str,
        expected: &'static str,
    },

    /// `time` does not map to a representable instant
    #[error("log record {index}: time {time} is out of range")]
    Timestamp { index: usize, time: f64 },
}

/// A validated log record
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub level: String,
    pub time: DateTime<Utc>,
    pub name: String,
    pub message: String,
    /// Remaining keys, sorted by key
    pub fields: Vec<(String, Value)>,
}

impl LogRecord {
    fn from_object(index: usize, mut object: Map<String, Value>) -> Result<Self, LogFormatError> {
        let level = take_string(&mut object, index, "level")?;
        let time_ms = take_number(&mut object, index, "time")?;
        let name = take_string(&mut object, index, "name")?;
        let message = take_string(&mut object, index, "message")?;

        let time = epoch_millis(time_ms).ok_or(LogFormatError::Timestamp {
            index,
            time: time_ms,
        })?;

        let mut fields: Vec<(String, Value)> = object.into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(Self {
            level,
            time,
            name,
            message,
            fields,
        })
    }

    /// Render as `<timestamp>  [<level>]  <name>   <message>, key: value...`
    pub fn to_line(&self) -> String {
        let mut line = format!(
            "{}  [{}]  {}   {}",
            self.time.format("%Y-%m-%d %H:%M:%S%.3f UTC"),
            self.level,
            self.name,
            self.message
        );
        for (key, value) in &self.fields {
            line.push_str(&format!(", {key}: {}", display_value(value)));
        }
        line
    }
}

/// Parse a log payload into records
pub fn parse_logs(payload: &[u8]) -> Result<Vec<LogRecord>, LogFormatError> {
    let objects: Vec<Map<String, Value>> = serde_json::from_slice(payload)?;
    objects
        .into_iter()
        .enumerate()
        .map(|(index, object)| LogRecord::from_object(index, object))
        .collect()
}

/// Parse a log payload into display lines, one per record
///
/// Fails as a whole on the first malformed record.
pub fn format_logs(payload: &[u8]) -> Result<Vec<String>, LogFormatError> {
    Ok(parse_logs(payload)?.iter().map(LogRecord::to_line).collect())
}

fn take_string(
    object: &mut Map<String, Value>,
    index: usize,
    field: &'static str,
) -> Result<String, LogFormatError> {
    match object.remove(field) {
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(LogFormatError::WrongType {
            index,
            field,
            expected: "string",
        }),
        None => Err(LogFormatError::MissingField { index, field }),
    }
}

fn take_number(
    object: &mut Map<String, Value>,
    index: usize,
    field: &'static str,
) -> Result<f64, LogFormatError> {
    match object.remove(field) {
        Some(Value::Number(n)) => n.as_f64().ok_or(LogFormatError::WrongType {
            index,
            field,
            expected: "number",
        }),
        Some(_) => Err(LogFormatError::WrongType {
            index,
            field,
            expected: "number",
        }),
        None => Err(LogFormatError::MissingField { index, field }),
    }
}

/// seconds = floor(ms / 1000), remainder kept as whole milliseconds
fn epoch_millis(time_ms: f64) -> Option<DateTime<Utc>> {
    if !time_ms.is_finite() || time_ms.abs() > i64::MAX as f64 {
        return None;
    }
    let secs = (time_ms / 1000.0).floor() as i64;
    let millis = (time_ms as i64).rem_euclid(1000) as u32;
    DateTime::from_timestamp(secs, millis * 1_000_000)
}

/// Strings print bare; everything else prints as JSON
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
