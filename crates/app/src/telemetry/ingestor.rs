//! Payload decoding: `"x,y,z"` text into three axis-tagged samples.

use smarttrack_domain::telemetry::{Axis, TelemetrySample};
use smarttrack_domain::time::{self, Timestamp};

/// Decode one raw payload, timestamped now.
///
/// Returns an empty list for anything that is not valid UTF-8 holding
/// exactly three comma-separated numbers. Fields are parsed as written:
/// no trimming, and `inf` / `NaN` are numbers like any other.
#[must_use]
pub fn ingest(raw: &[u8]) -> Vec<TelemetrySample> {
    ingest_at(raw, time::now())
}

/// Decode one raw payload with an explicit timestamp.
#[must_use]
pub fn ingest_at(raw: &[u8], received_at: Timestamp) -> Vec<TelemetrySample> {
    let Some(values) = parse_triplet(raw) else {
        tracing::debug!(len = raw.len(), "dropping malformed telemetry payload");
        return Vec::new();
    };
    Axis::ALL
        .into_iter()
        .zip(values)
        .map(|(axis, value)| TelemetrySample::new(axis, value, received_at))
        .collect()
}

fn parse_triplet(raw: &[u8]) -> Option<[f64; 3]> {
    let text = std::str::from_utf8(raw).ok()?;
    let mut fields = text.split(',');
    let mut values = [0.0; 3];
    for slot in &mut values {
        *slot = fields.next()?.parse().ok()?;
    }
    if fields.next().is_some() {
        return None;
    }
    Some(values)
}
