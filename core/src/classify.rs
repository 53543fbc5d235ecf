//! Body parsing and envelope-shape detection.
//!
//! # Design
//! A parsed body is sorted into one of three shapes by `classify`:
//!
//! - `SelfDescribed`: the server already answered with an envelope, whose
//!   outcome is adopted as-is.
//! - `FalsyEnvelope`: an envelope-looking object whose `payload` (or `error`)
//!   is missing, `null`, `false`, `0` or `""`. These are wrapped like any raw
//!   body. A deliberately empty payload such as `0` is misread by this rule;
//!   existing servers depend on it, so it stays.
//! - `Raw`: everything else.
//!
//! Truthiness follows the protocol's loose rules: empty objects and arrays
//! count as present.

use serde_json::Value;

use crate::envelope::Outcome;

#[derive(Debug, Clone, PartialEq)]
pub enum BodyShape {
    Raw(Value),
    SelfDescribed(Outcome),
    FalsyEnvelope(Value),
}

impl BodyShape {
    pub fn label(&self) -> &'static str {
        match self {
            BodyShape::Raw(_) => "raw",
            BodyShape::SelfDescribed(_) => "self_described",
            BodyShape::FalsyEnvelope(_) => "falsy_envelope",
        }
    }
}

/// Parse a response body, falling back to the raw text and then to `{}`.
pub fn parse_body(text: &str) -> Value {
    match serde_json::from_str(text) {
        Ok(value) => value,
        Err(_) if text.is_empty() => Value::Object(serde_json::Map::new()),
        Err(_) => Value::String(text.to_string()),
    }
}

pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

pub fn classify(body: Value) -> BodyShape {
    let mut map = match body {
        Value::Object(map) => map,
        other => return BodyShape::Raw(other),
    };

    let companion = match map.get("success") {
        Some(Value::Bool(true)) => "payload",
        Some(Value::Bool(false)) => "error",
        _ => return BodyShape::Raw(Value::Object(map)),
    };

    if !map.get(companion).is_some_and(is_truthy) {
        return BodyShape::FalsyEnvelope(Value::Object(map));
    }

    match map.remove(companion) {
        Some(value) if companion == "payload" => BodyShape::SelfDescribed(Outcome::Payload(value)),
        Some(value) => BodyShape::SelfDescribed(Outcome::Error(value)),
        None => BodyShape::FalsyEnvelope(Value::Object(map)),
    }
}
