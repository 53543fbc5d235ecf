//! Error types for the protocol client.
//!
//! # Design
//! Normalization itself never fails: transport failures, error statuses and
//! malformed bodies all end up inside an `Envelope`. `ApiError` covers the
//! few places outside that path where a caller can still get an `Err`:
//! encoding request data, decoding a payload into a typed value, and bad
//! client configuration.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The request data could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The envelope payload could not be decoded into the requested type.
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] serde_json::Error),

    /// The envelope carried `success: false`. `status` is absent when no
    /// HTTP response was received.
    #[error("request failed (status {}): {error}", status_label(.status))]
    Remote { status: Option<u16>, error: Value },

    #[error("invalid configuration: {0}")]
    Config(String),
}

fn status_label(status: &Option<u16>) -> String {
    match status {
        Some(status) => status.to_string(),
        None => "none".to_string(),
    }
}
