//! Session state for one forensic search job.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{SortSpec, SourceProgress};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    Idle,
    Searching,
    Completed,
}

impl Default for SessionStatus {
    fn default() -> Self {
        SessionStatus::Idle
    }
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Idle => "Idle",
            SessionStatus::Searching => "Searching",
            SessionStatus::Completed => "Completed",
        }
    }
}

/// What the operator asked to search. The camera enumeration and query form
/// live outside this subsystem; by the time a query reaches the session it
/// is just source ids and a time range.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub source_ids: Vec<String>,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub job_id: Option<String>,
    pub status: SessionStatus,
    pub sort: SortSpec,
    pub current_page: u32,
    /// Live only while the job is running and page 1 is on display.
    pub is_live: bool,
    pub sources: HashMap<String, SourceProgress>,
    pub total: usize,
    pub total_pages: u32,
    /// Events dropped for missing id or score. Diagnostic only.
    pub malformed_events: u64,
    pub feed_stalled: bool,
}

impl SessionState {
    pub fn begin_job(&mut self, job_id: String, sort: SortSpec) {
        *self = Self {
            job_id: Some(job_id),
            status: SessionStatus::Searching,
            sort,
            current_page: 1,
            is_live: true,
            ..Self::default()
        };
    }

    pub fn sources_snapshot(&self) -> Vec<SourceProgress> {
        self.sources.values().cloned().collect()
    }
}

/// Wire-facing snapshot published on state transitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub job_id: Option<String>,
    pub status: SessionStatus,
    pub sort: SortSpec,
    pub current_page: u32,
    pub is_live: bool,
    pub total: usize,
    pub total_pages: u32,
    pub malformed_events: u64,
    pub feed_stalled: bool,
}

impl From<&SessionState> for SessionSnapshot {
    fn from(state: &SessionState) -> Self {
        Self {
            job_id: state.job_id.clone(),
            status: state.status,
            sort: state.sort,
            current_page: state.current_page,
            is_live: state.is_live,
            total: state.total,
            total_pages: state.total_pages,
            malformed_events: state.malformed_events,
            feed_stalled: state.feed_stalled,
        }
    }
}
