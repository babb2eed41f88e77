//! Collaborator seams.
//!
//! Transport, authentication and storage live outside this subsystem. The
//! session only needs three capabilities from the outside world: a stream
//! of feed events for a job, a server-side paginated query for non-live
//! pages, and the job registry's pagination metadata.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::models::{DetectionResult, SortBy, SourceProgress};

use super::events::FeedEvent;
use super::state::SearchQuery;

/// The live event stream for one job. The transport owns reconnection and
/// backoff; on a dropped stream it either resumes transparently or delivers
/// [`FeedEvent::Stalled`].
#[async_trait]
pub trait ResultFeed: Send + Sync {
    async fn subscribe(&self, job_id: &str, query: &SearchQuery)
        -> Result<mpsc::Receiver<FeedEvent>>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    pub job_id: String,
    pub page: u32,
    pub page_size: u32,
    pub sort_by: SortBy,
    pub descending: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse {
    pub results: Vec<DetectionResult>,
    pub total: usize,
    pub total_pages: u32,
    pub page: u32,
    pub page_size: u32,
    pub status: String,
    #[serde(default)]
    pub sources_progress: Vec<SourceProgress>,
}

/// Server-side paginated query used for every page other than the live one.
#[async_trait]
pub trait PagedQuery: Send + Sync {
    async fn fetch_page(&self, request: PageRequest) -> Result<PageResponse>;
}

/// Pagination metadata for one job as the registry tracks it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskMetadata {
    pub count: usize,
    pub total_pages: u32,
}

/// The job/task registry. Polled periodically while a job runs so the
/// pager can show stable totals even between live renders.
#[async_trait]
pub trait TaskRegistry: Send + Sync {
    async fn tasks(&self) -> Result<HashMap<String, TaskMetadata>>;
}
