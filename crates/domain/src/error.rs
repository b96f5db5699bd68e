//! Common error type shared across the workspace.
//!
//! Each adapter defines its own typed error and converts into
//! [`TrackerError`] at the port boundary. Expected outcomes of the
//! connection state machine (timeouts, adapter not ready) are not errors
//! here: they are [`FailureReason`](crate::connection::FailureReason)s
//! carried by the `Failed` state.

/// Boxed error source coming from an adapter.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Errors crossing port boundaries.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// Device identifiers must be non-empty.
    #[error("device identifier must not be empty")]
    InvalidDeviceId,

    /// The key-value store failed.
    #[error("storage error")]
    Storage(#[source] BoxedError),

    /// The radio adapter rejected or failed an operation.
    #[error("radio error")]
    Radio(#[source] BoxedError),

    /// The backend collaborator failed.
    #[error("backend error")]
    Backend(#[source] BoxedError),
}
