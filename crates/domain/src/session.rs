//! Session: one tracking run, from "start tracking" to "stop tracking".

use serde::{Deserialize, Serialize};

use crate::id::SessionId;
use crate::time::{self, Timestamp};

/// A tracking session.
///
/// `end_time` stays `None` until the session is stopped; `serialized_data`
/// stays `None` until the stop step found at least one reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub start_time: Timestamp,
    pub end_time: Option<Timestamp>,
    pub serialized_data: Option<String>,
}

impl Session {
    /// Open a new session starting now.
    #[must_use]
    pub fn start() -> Self {
        Self {
            id: SessionId::new(),
            start_time: time::now(),
            end_time: None,
            serialized_data: None,
        }
    }

    /// Close the session now and attach the readings, if any.
    ///
    /// Readings are encoded as a JSON array of the raw payload strings.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if encoding fails.
    pub fn finish(&mut self, readings: &[String]) -> Result<(), serde_json::Error> {
        self.end_time = Some(time::now());
        if !readings.is_empty() {
            self.serialized_data = Some(serde_json::to_string(readings)?);
        }
        Ok(())
    }

    /// Whether the session has been stopped.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.end_time.is_some()
    }

    /// Whether there is anything worth submitting.
    #[must_use]
    pub fn has_data(&self) -> bool {
        self.serialized_data.is_some()
    }
}
