//! The normalized response contract handed back to callers.
//!
//! # Design
//! On the wire an envelope is `{ success, payload | error, meta }`. In Rust
//! the `payload`/`error` pair is a single `Outcome` enum, so "exactly one of
//! the two is present, matching `success`" holds by construction. `meta` is
//! `None` when no HTTP response exists and serializes as `{}`.
//!
//! Serialization goes through a private wire struct so the JSON form stays
//! byte-compatible with servers that already speak the protocol.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;

/// Success value or error value carried by an envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Payload(Value),
    Error(Value),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Payload(_))
    }
}

/// Status, status text and flattened headers of the HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    pub status: u16,
    /// Canonical reason phrase for `status` as reported by the transport.
    /// `UreqTransport` never exposes a server's custom reason phrase, and
    /// unregistered codes get an empty string.
    pub status_text: String,
    pub headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub outcome: Outcome,
    pub meta: Option<ResponseMeta>,
}

impl Envelope {
    pub fn payload(value: Value, meta: Option<ResponseMeta>) -> Self {
        Self {
            outcome: Outcome::Payload(value),
            meta,
        }
    }

    pub fn error(value: Value, meta: Option<ResponseMeta>) -> Self {
        Self {
            outcome: Outcome::Error(value),
            meta,
        }
    }

    pub fn success(&self) -> bool {
        self.outcome.is_success()
    }

    pub fn payload_value(&self) -> Option<&Value> {
        match &self.outcome {
            Outcome::Payload(value) => Some(value),
            Outcome::Error(_) => None,
        }
    }

    pub fn error_value(&self) -> Option<&Value> {
        match &self.outcome {
            Outcome::Error(value) => Some(value),
            Outcome::Payload(_) => None,
        }
    }

    pub fn meta(&self) -> Option<&ResponseMeta> {
        self.meta.as_ref()
    }

    pub fn status(&self) -> Option<u16> {
        self.meta.as_ref().map(|meta| meta.status)
    }

    /// Decode the payload into `T`, or surface the error side as
    /// `ApiError::Remote`.
    pub fn into_result<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        let status = self.status();
        match self.outcome {
            Outcome::Payload(value) => {
                serde_json::from_value(value).map_err(ApiError::Deserialization)
            }
            Outcome::Error(error) => Err(ApiError::Remote { status, error }),
        }
    }

    pub fn to_json(&self) -> Value {
        Value::from(EnvelopeWire::from(self.clone()))
    }
}

impl Serialize for Envelope {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        EnvelopeWire::from(self.clone()).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Envelope {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = EnvelopeWire::deserialize(deserializer)?;
        Envelope::try_from(wire).map_err(serde::de::Error::custom)
    }
}

#[derive(Serialize, Deserialize)]
struct EnvelopeWire {
    success: bool,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    payload: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    error: Option<Value>,
    #[serde(default)]
    meta: MetaWire,
}

// An explicit `null` is a present value; only a missing key is `None`.
fn present<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

#[derive(Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetaWire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    headers: Option<BTreeMap<String, String>>,
}

impl From<Envelope> for EnvelopeWire {
    fn from(envelope: Envelope) -> Self {
        let (success, payload, error) = match envelope.outcome {
            Outcome::Payload(value) => (true, Some(value), None),
            Outcome::Error(value) => (false, None, Some(value)),
        };
        let meta = match envelope.meta {
            Some(meta) => MetaWire {
                status: Some(meta.status),
                status_text: Some(meta.status_text),
                headers: Some(meta.headers),
            },
            None => MetaWire::default(),
        };
        EnvelopeWire {
            success,
            payload,
            error,
            meta,
        }
    }
}

impl TryFrom<EnvelopeWire> for Envelope {
    type Error = String;

    fn try_from(wire: EnvelopeWire) -> Result<Self, Self::Error> {
        let outcome = match (wire.success, wire.payload, wire.error) {
            (true, Some(payload), None) => Outcome::Payload(payload),
            (false, None, Some(error)) => Outcome::Error(error),
            (true, _, _) => {
                return Err("a successful envelope needs `payload` and no `error`".to_string())
            }
            (false, _, _) => {
                return Err("a failed envelope needs `error` and no `payload`".to_string())
            }
        };
        let meta = wire.meta.status.map(|status| ResponseMeta {
            status,
            status_text: wire.meta.status_text.unwrap_or_default(),
            headers: wire.meta.headers.unwrap_or_default(),
        });
        Ok(Envelope { outcome, meta })
    }
}

impl From<EnvelopeWire> for Value {
    fn from(wire: EnvelopeWire) -> Self {
        let mut map = serde_json::Map::new();
        map.insert("success".to_string(), Value::Bool(wire.success));
        if let Some(payload) = wire.payload {
            map.insert("payload".to_string(), payload);
        }
        if let Some(error) = wire.error {
            map.insert("error".to_string(), error);
        }
        let mut meta = serde_json::Map::new();
        if let Some(status) = wire.meta.status {
            meta.insert("status".to_string(), Value::from(status));
        }
        if let Some(status_text) = wire.meta.status_text {
            meta.insert("statusText".to_string(), Value::String(status_text));
        }
        if let Some(headers) = wire.meta.headers {
            let headers = headers
                .into_iter()
                .map(|(name, value)| (name, Value::String(value)))
                .collect();
            meta.insert("headers".to_string(), Value::Object(headers));
        }
        map.insert("meta".to_string(), Value::Object(meta));
        Value::Object(map)
    }
}
