//! Inbound feed events and outbound published views.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::estimator::EtaReport;
use crate::models::{DetectionResult, Page};

use super::SessionSnapshot;

/// Detection payload as the transport hands it over. `id` and `score` stay
/// optional here so a malformed event can be counted and dropped instead of
/// failing deserialization of the whole message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDetection {
    pub id: Option<String>,
    pub score: Option<f64>,
    pub timestamp: DateTime<Utc>,
    pub source_id: String,
    pub image_pointer: String,
    pub kind: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl RawDetection {
    /// Validates the payload into an owned result, or `None` when id or
    /// score is missing.
    pub fn validate(self) -> Option<DetectionResult> {
        let id = self.id.filter(|id| !id.is_empty())?;
        let score = self.score?;
        Some(DetectionResult {
            id,
            score,
            timestamp: self.timestamp,
            source_id: self.source_id,
            image_pointer: self.image_pointer,
            kind: self.kind.unwrap_or_else(|| "detection".to_string()),
            metadata: self.metadata,
        })
    }
}

/// Per-source progress telemetry as delivered by the feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub source_id: String,
    pub progress_percent: f64,
    pub sample_time: DateTime<Utc>,
    pub start_time: Option<DateTime<Utc>>,
}

/// Everything the event-feed collaborator can deliver for one job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum FeedEvent {
    Detection(RawDetection),
    Progress(ProgressEvent),
    /// The job finished on the backend; trailing detections may still follow.
    Completed,
    /// The transport lost the stream and is retrying on its own.
    Stalled,
}

/// Views published to the rendering collaborator over the session's
/// broadcast channel. Fire-and-forget: a slow or absent consumer never
/// blocks event processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum ViewEvent {
    PageUpdated {
        page: Page,
        total: usize,
        total_pages: u32,
    },
    EtaUpdated(EtaReport),
    StateChanged(SessionSnapshot),
    SearchCompleted {
        job_id: String,
        total: usize,
    },
    FeedStalled {
        job_id: String,
    },
}
