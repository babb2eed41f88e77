//! Detection-result data model and sort/page descriptors.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single scored detection emitted by one camera source.
///
/// Immutable once built; ownership passes to the [`ResultStore`] it is
/// inserted into. The image itself lives outside this subsystem — only an
/// opaque pointer is carried.
///
/// [`ResultStore`]: crate::store::ResultStore
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    pub id: String,
    pub score: f64,
    pub timestamp: DateTime<Utc>,
    pub source_id: String,
    pub image_pointer: String,
    #[serde(default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

fn default_kind() -> String {
    "detection".to_string()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
    Score,
    Date,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::Score => "score",
            SortBy::Date => "date",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Display ordering for snapshots and pages. Never affects what the store
/// retains — retention is always score-based.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SortSpec {
    pub by: SortBy,
    pub direction: SortDirection,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            by: SortBy::Score,
            direction: SortDirection::Desc,
        }
    }
}

impl SortSpec {
    pub fn score_desc() -> Self {
        Self::default()
    }

    pub fn date_desc() -> Self {
        Self {
            by: SortBy::Date,
            direction: SortDirection::Desc,
        }
    }

    /// Total order over results under this spec.
    ///
    /// Score sort breaks exact-score ties with the more recent timestamp
    /// first, so the ordering is deterministic. Date sort is purely by
    /// timestamp (capture timestamps are distinct in practice).
    pub fn compare(&self, a: &DetectionResult, b: &DetectionResult) -> Ordering {
        match self.by {
            SortBy::Score => {
                let primary = match self.direction {
                    SortDirection::Desc => b.score.total_cmp(&a.score),
                    SortDirection::Asc => a.score.total_cmp(&b.score),
                };
                primary.then_with(|| b.timestamp.cmp(&a.timestamp))
            }
            SortBy::Date => match self.direction {
                SortDirection::Desc => b.timestamp.cmp(&a.timestamp),
                SortDirection::Asc => a.timestamp.cmp(&b.timestamp),
            },
        }
    }
}

/// One pagination window, derived on demand — never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub page_number: u32,
    pub page_size: u32,
    pub items: Vec<DetectionResult>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn result(id: &str, score: f64, ts_secs: i64) -> DetectionResult {
        DetectionResult {
            id: id.to_string(),
            score,
            timestamp: Utc.timestamp_opt(ts_secs, 0).unwrap(),
            source_id: "cam-1".to_string(),
            image_pointer: format!("frames/{id}"),
            kind: "detection".to_string(),
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn score_desc_orders_by_score_then_recency() {
        let spec = SortSpec::score_desc();
        let older = result("a", 0.8, 100);
        let newer = result("b", 0.8, 200);
        let best = result("c", 0.9, 50);

        assert_eq!(spec.compare(&best, &older), Ordering::Less);
        // Equal scores: the more recent capture sorts first.
        assert_eq!(spec.compare(&newer, &older), Ordering::Less);
    }

    #[test]
    fn date_sort_ignores_score() {
        let spec = SortSpec {
            by: SortBy::Date,
            direction: SortDirection::Asc,
        };
        let low_but_old = result("a", 0.1, 100);
        let high_but_new = result("b", 0.9, 200);
        assert_eq!(spec.compare(&low_but_old, &high_but_new), Ordering::Less);
    }

    #[test]
    fn detection_event_deserializes_with_defaults() {
        let raw = r#"{
            "id": "frame-1",
            "score": 0.42,
            "timestamp": "2024-05-01T12:00:00Z",
            "sourceId": "cam-7",
            "imagePointer": "frames/frame-1"
        }"#;
        let parsed: DetectionResult = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.kind, "detection");
        assert!(parsed.metadata.is_empty());
    }
}
