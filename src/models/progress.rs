//! Per-source progress telemetry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The latest progress sample for one camera source.
///
/// Samples are replaced wholesale as new telemetry arrives for a source id;
/// fields are never patched individually.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceProgress {
    pub source_id: String,
    /// Percent complete in [0, 100].
    pub progress_percent: f64,
    pub sample_time: DateTime<Utc>,
    pub start_time: Option<DateTime<Utc>>,
}

impl SourceProgress {
    /// True while this source has started but not finished.
    pub fn is_active(&self) -> bool {
        self.progress_percent > 0.0 && self.progress_percent < 100.0
    }

    /// True for a source the scheduler has not started yet.
    pub fn is_pending(&self) -> bool {
        self.progress_percent == 0.0
    }
}
