//! # Image Derivatives
//!
//! Turns an uploaded image into a fixed set of resized derivatives stored
//! under deterministic keys, and reports every outcome as a stable,
//! client-safe envelope.
//!
//! # Architecture
//!
//! ```text
//! trigger event ─▶ key::decode ─▶ store.get ─▶ DerivativeGenerator ─▶ upload_all ─▶ Response
//!                                     │              (rayon fan-out)     (join_all)       ▲
//!                                     └── absent: no-op success                        │
//!                       any failure ──▶ Failure ──▶ envelope::build_envelope ─────────────┘
//! ```
//!
//! A source at `input/abc.jpg` produces `resized/abc/50.jpg`,
//! `resized/abc/100.jpg` and `resized/abc/500.jpg`. Keys and bytes depend only
//! on the source, so a redelivered event rewrites the same objects with the
//! same content and partial failures heal on retry.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`types`] | Shared types: trigger event, decoded key, derivative spec/result, request context |
//! | [`key`] | Percent-decoding of trigger keys and derivative key naming |
//! | [`imaging`] | Decode, resize and encode, with the per-derivative fan-out |
//! | [`store`] | Async object store contract with in-memory and filesystem implementations |
//! | [`upload`] | Concurrent upload of a derivative set |
//! | [`envelope`] | Closed failure taxonomy and redacting envelope builder |
//! | [`response`] | Success/failure envelopes and their HTTP rendering |
//! | [`pipeline`] | Per-invocation coordinator |
//! | [`presign`] | Upload and download URL entry points |
//! | [`config`] | `config.toml` loading, merging, environment overrides |
//! | [`logging`] | JSON `tracing` subscriber |
//!
//! # Design Decisions
//!
//! ## Failures Are Typed Where They Happen
//!
//! Each module has its own `thiserror` enum. A `From` impl converts it into
//! [`envelope::Failure`] (upstream, domain or unrecognized) at the `?` that
//! leaves the module, so classification never inspects error shapes. A 500
//! envelope never carries detail; the full detail goes to the error log record.
//!
//! ## Explicit Request Context
//!
//! [`types::RequestContext`] is built per invocation and passed by reference.
//! Every log record of the invocation is emitted inside its span.
//!
//! ## Pure-Rust Imaging
//!
//! The `image` crate decodes and encodes JPEG and PNG with Lanczos3
//! resampling. No system libraries, and encoding is deterministic.

pub mod config;
pub mod envelope;
pub mod imaging;
pub mod key;
pub mod logging;
pub mod pipeline;
pub mod presign;
pub mod response;
pub mod store;
pub mod types;
pub mod upload;

#[cfg(test)]
pub(crate) mod test_helpers;
