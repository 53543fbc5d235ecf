//! Response normalization: one `TransportOutcome` in, one `Envelope` out.
//!
//! # Design
//! The normalizer is pure. The transport has already read the body, so
//! normalizing the same outcome twice gives equal envelopes.
//!
//! For a response the steps are: parse the body (`parse_body`), classify it
//! (`classify`), then either adopt a self-described outcome or wrap the body
//! according to the HTTP status. `meta` always describes the real HTTP
//! response, even when the server's own envelope overrides `success`.
//!
//! Transport failures become `success: false` with an empty `meta`, unless
//! `FailureMeta::FromResponse` is selected and the failure carries the head of
//! a response that broke off mid-body.

use std::collections::BTreeMap;

use crate::classify::{classify, parse_body, BodyShape};
use crate::envelope::{Envelope, Outcome, ResponseMeta};
use crate::http::{HttpResponse, ResponseHead};
use crate::transport::{TransportFailure, TransportOutcome};

/// How `meta` is filled for a transport failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailureMeta {
    /// Always `{}`.
    #[default]
    Empty,
    /// Describe the partial response attached to the failure, if any.
    FromResponse,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Normalizer {
    failure_meta: FailureMeta,
}

impl Normalizer {
    pub fn new(failure_meta: FailureMeta) -> Self {
        Self { failure_meta }
    }

    pub fn failure_meta(&self) -> FailureMeta {
        self.failure_meta
    }

    pub fn normalize(&self, outcome: &TransportOutcome) -> Envelope {
        match outcome {
            TransportOutcome::Failure(failure) => self.normalize_failure(failure),
            TransportOutcome::Response(response) => normalize_response(response),
        }
    }

    fn normalize_failure(&self, failure: &TransportFailure) -> Envelope {
        let meta = match (self.failure_meta, &failure.response) {
            (FailureMeta::FromResponse, Some(head)) => Some(head_meta(head)),
            _ => None,
        };
        Envelope::error(failure.to_value(), meta)
    }
}

/// Normalize with the default options.
pub fn normalize(outcome: &TransportOutcome) -> Envelope {
    Normalizer::default().normalize(outcome)
}

fn normalize_response(response: &HttpResponse) -> Envelope {
    let shape = classify(parse_body(&response.body));
    tracing::debug!(
        status = response.status,
        shape = shape.label(),
        "normalizing http response"
    );

    let outcome = match shape {
        BodyShape::SelfDescribed(outcome) => outcome,
        BodyShape::Raw(body) | BodyShape::FalsyEnvelope(body) => {
            if response.is_ok() {
                Outcome::Payload(body)
            } else {
                Outcome::Error(body)
            }
        }
    };

    Envelope {
        outcome,
        meta: Some(response_meta(response)),
    }
}

pub fn response_meta(response: &HttpResponse) -> ResponseMeta {
    ResponseMeta {
        status: response.status,
        status_text: response.status_text.clone(),
        headers: flatten_headers(&response.headers),
    }
}

fn head_meta(head: &ResponseHead) -> ResponseMeta {
    ResponseMeta {
        status: head.status,
        status_text: head.status_text.clone(),
        headers: flatten_headers(&head.headers),
    }
}

/// One string per header name; repeated values are concatenated in order
/// with no separator.
pub fn flatten_headers(headers: &[(String, String)]) -> BTreeMap<String, String> {
    let mut flat: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        flat.entry(name.clone()).or_default().push_str(value);
    }
    flat
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportFailureKind;
    use serde_json::json;

    fn response(status: u16, status_text: &str, body: &str) -> TransportOutcome {
        TransportOutcome::Response(HttpResponse {
            status,
            status_text: status_text.to_string(),
            headers: vec![
                ("content-type".to_string(), "application/json".to_string()),
                ("test".to_string(), "test-header".to_string()),
            ],
            body: body.to_string(),
        })
    }

    fn expected_meta(status: u16, status_text: &str) -> Option<ResponseMeta> {
        Some(ResponseMeta {
            status,
            status_text: status_text.to_string(),
            headers: BTreeMap::from([
                ("content-type".to_string(), "application/json".to_string()),
                ("test".to_string(), "test-header".to_string()),
            ]),
        })
    }

    #[test]
    fn json_body_on_ok_becomes_payload() {
        let envelope = normalize(&response(200, "OK", r#"{"message":"hi"}"#));
        assert_eq!(
            envelope,
            Envelope::payload(json!({"message": "hi"}), expected_meta(200, "OK"))
        );
    }

    #[test]
    fn text_body_on_ok_becomes_string_payload() {
        let envelope = normalize(&response(200, "OK", "hi"));
        assert_eq!(envelope, Envelope::payload(json!("hi"), expected_meta(200, "OK")));
    }

    #[test]
    fn empty_body_becomes_empty_object() {
        let envelope = normalize(&response(204, "No Content", ""));
        assert_eq!(
            envelope,
            Envelope::payload(json!({}), expected_meta(204, "No Content"))
        );
    }

    #[test]
    fn error_status_wraps_body_as_error() {
        let envelope = normalize(&response(
            500,
            "Internal Server Error",
            r#"{"message":"something bad happened"}"#,
        ));
        assert_eq!(
            envelope,
            Envelope::error(
                json!({"message": "something bad happened"}),
                expected_meta(500, "Internal Server Error")
            )
        );
    }

    #[test]
    fn error_status_with_text_body() {
        let envelope = normalize(&response(404, "Not Found", "nope"));
        assert_eq!(envelope, Envelope::error(json!("nope"), expected_meta(404, "Not Found")));
    }

    #[test]
    fn self_described_success_wins_over_error_status() {
        let envelope = normalize(&response(
            500,
            "Internal Server Error",
            r#"{"success":true,"payload":{"message":"hi"}}"#,
        ));
        assert_eq!(
            envelope,
            Envelope::payload(
                json!({"message": "hi"}),
                expected_meta(500, "Internal Server Error")
            )
        );
    }

    #[test]
    fn self_described_error_on_ok_status() {
        let envelope = normalize(&response(
            200,
            "OK",
            r#"{"success":false,"error":{"message":"bad"}}"#,
        ));
        assert_eq!(
            envelope,
            Envelope::error(json!({"message": "bad"}), expected_meta(200, "OK"))
        );
    }

    #[test]
    fn falsy_payload_falls_back_to_status_wrapping() {
        let body = r#"{"success":true,"payload":0}"#;
        let envelope = normalize(&response(200, "OK", body));
        assert_eq!(
            envelope,
            Envelope::payload(json!({"success": true, "payload": 0}), expected_meta(200, "OK"))
        );

        let envelope = normalize(&response(400, "Bad Request", body));
        assert_eq!(
            envelope,
            Envelope::error(
                json!({"success": true, "payload": 0}),
                expected_meta(400, "Bad Request")
            )
        );
    }

    #[test]
    fn null_body_is_raw() {
        let envelope = normalize(&response(200, "OK", "null"));
        assert_eq!(envelope, Envelope::payload(json!(null), expected_meta(200, "OK")));
    }

    #[test]
    fn transport_failure_has_empty_meta() {
        let outcome = TransportOutcome::Failure(TransportFailure::new(
            TransportFailureKind::HostNotFound,
            "dns lookup failed",
        ));
        let envelope = normalize(&outcome);
        assert!(!envelope.success());
        assert_eq!(
            envelope.error_value(),
            Some(&json!({"name": "HostNotFound", "message": "dns lookup failed"}))
        );
        assert!(envelope.meta().is_none());
    }

    #[test]
    fn failure_meta_policy_controls_partial_responses() {
        let head = ResponseHead {
            status: 200,
            status_text: "OK".to_string(),
            headers: vec![("test".to_string(), "test-header".to_string())],
        };
        let outcome = TransportOutcome::Failure(
            TransportFailure::new(TransportFailureKind::Io, "connection reset").with_response(head),
        );

        let empty = Normalizer::new(FailureMeta::Empty).normalize(&outcome);
        assert!(empty.meta().is_none());

        let described = Normalizer::new(FailureMeta::FromResponse).normalize(&outcome);
        assert!(!described.success());
        let meta = described.meta().unwrap();
        assert_eq!(meta.status, 200);
        assert_eq!(meta.headers.get("test").map(String::as_str), Some("test-header"));
    }

    #[test]
    fn from_response_without_head_stays_empty() {
        let outcome = TransportOutcome::Failure(TransportFailure::new(
            TransportFailureKind::ConnectionFailed,
            "refused",
        ));
        let envelope = Normalizer::new(FailureMeta::FromResponse).normalize(&outcome);
        assert!(envelope.meta().is_none());
    }

    #[test]
    fn normalizing_twice_is_idempotent() {
        let outcome = response(200, "OK", r#"{"success":false,"error":"x"}"#);
        assert_eq!(normalize(&outcome), normalize(&outcome));
    }

    #[test]
    fn repeated_headers_are_concatenated() {
        let headers = vec![
            ("set-cookie".to_string(), "a=1".to_string()),
            ("test".to_string(), "test-header".to_string()),
            ("set-cookie".to_string(), "b=2".to_string()),
        ];
        let flat = flatten_headers(&headers);
        assert_eq!(flat.len(), 2);
        assert_eq!(flat["set-cookie"], "a=1b=2");
        assert_eq!(flat["test"], "test-header");
    }

    #[test]
    fn header_name_casing_is_preserved() {
        let headers = vec![("X-Custom".to_string(), "v".to_string())];
        let flat = flatten_headers(&headers);
        assert_eq!(flat.get("X-Custom").map(String::as_str), Some("v"));
        assert!(flat.get("x-custom").is_none());
    }
}
