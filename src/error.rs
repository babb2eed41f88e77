use thiserror::Error;

use crate::session::SessionStatus;

/// Recoverable failures surfaced to the caller.
///
/// Duplicate results, capacity rejections and malformed events are normal
/// outcomes of the streaming design, not errors; they are absorbed (and
/// counted, for malformed events) without ever reaching this type. Nothing
/// here is fatal to the process — the worst case is a stale or empty view.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The external paginated query did not answer within the deadline.
    /// The session stays in its current state; the operator may retry the
    /// page navigation.
    #[error("paginated query for job {job_id} page {page} timed out after {timeout_ms}ms")]
    QueryTimeout {
        job_id: String,
        page: u32,
        timeout_ms: u64,
    },

    /// An operation was invoked in a state that does not allow it.
    #[error("operation not allowed while session is {status:?}")]
    InvalidState { status: SessionStatus },

    /// The event feed collaborator reported a stall. Retry and backoff are
    /// the transport's responsibility; this subsystem only surfaces it.
    #[error("event feed stalled for job {job_id}")]
    FeedStalled { job_id: String },
}
