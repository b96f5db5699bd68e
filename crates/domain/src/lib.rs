//! # smarttrack-domain
//!
//! Pure domain model for the smarttrack sensor client.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **device references** (the remembered sensor)
//! - Define **adapter** and **connection** states, plus failure reasons
//! - Define **telemetry samples** (one axis of an X/Y/Z triplet)
//! - Define **sessions** (one tracking run and its serialised readings)
//! - Publish **events** describing what happened, for UI consumers
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod adapter;
pub mod connection;
pub mod device;
pub mod event;
pub mod session;
pub mod telemetry;
