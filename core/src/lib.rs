//! Client core that normalizes HTTP responses into a single envelope shape.
//!
//! # Overview
//! Every request ends in an `Envelope`: `{ success, payload | error, meta }`.
//! A server that already answers in that shape is passed through; raw JSON,
//! plain text, empty bodies, error statuses and transport failures are all
//! wrapped into it. Callers branch on `success` instead of handling errors.
//!
//! # Design
//! - Host-does-IO: requests and responses are plain data and the normalizer
//!   is pure. Network access lives behind the `Transport` trait, with a
//!   ureq-backed `UreqTransport` provided.
//! - `ProtocolClient` replaces partial application with an explicit
//!   `ClientConfig` (base URL + default options).
//! - Body sniffing is a typed classifier (`BodyShape`).
//! - One attempt per call; no retries, caching or streaming.

pub mod classify;
pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod http;
pub mod normalize;
pub mod transport;

pub use classify::{classify, parse_body, BodyShape};
pub use client::ProtocolClient;
pub use config::ClientConfig;
pub use envelope::{Envelope, Outcome, ResponseMeta};
pub use error::ApiError;
pub use http::{FetchOptions, HttpMethod, HttpRequest, HttpResponse, ResponseHead};
pub use normalize::{flatten_headers, normalize, FailureMeta, Normalizer};
pub use transport::{
    fetch_outcome, Transport, TransportFailure, TransportFailureKind, TransportOutcome, UreqTransport,
};
