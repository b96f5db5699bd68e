//! Session backend port: where finished sessions are submitted.

use std::future::Future;

use smarttrack_domain::error::TrackerError;
use smarttrack_domain::session::Session;

/// Receives finished sessions. Treated as an opaque operation that may fail;
/// the caller never retries.
pub trait SessionBackend {
    /// Submit a finished session.
    fn add_session(&self, session: &Session)
    -> impl Future<Output = Result<(), TrackerError>> + Send;
}

impl<T: SessionBackend + Send + Sync> SessionBackend for std::sync::Arc<T> {
    fn add_session(
        &self,
        session: &Session,
    ) -> impl Future<Output = Result<(), TrackerError>> + Send {
        (**self).add_session(session)
    }
}
