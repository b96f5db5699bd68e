//! # smarttrack-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve a small **JSON API** through which a presentation layer drives
//!   the tracker: connect, discover, retry, forget, and the session
//!   lifecycle (`/api/connect`, `/api/session/start`, …)
//! - Expose the published state: supervisor status, remembered device,
//!   the telemetry window and the current session
//! - Stream domain events as **Server-Sent Events** (`/api/events/stream`)
//!
//! ## Dependency rule
//! Depends on `smarttrack-app` (for services and port traits) and
//! `smarttrack-domain` (for types used in request/response mapping). Never
//! leaks axum types into the domain.

pub mod api;
pub mod error;
pub mod router;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;
