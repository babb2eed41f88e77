//! Live, bounded, rank-consistent views over streaming forensic
//! video-search results.
//!
//! One [`SearchSession`](session::SearchSession) per job owns a bounded
//! top-K [`ResultStore`](store::ResultStore), consumes detection and
//! progress events from an external feed, keeps page 1 continuously up to
//! date while the job runs, serves other pages from the server-side
//! paginated query, and turns noisy per-source progress into
//! human-readable completion estimates.
//!
//! Transport, authentication, camera enumeration and rendering are
//! external collaborators behind the traits in [`session::traits`].

pub mod error;
pub mod estimator;
pub mod models;
pub mod session;
pub mod store;

pub use error::SessionError;
pub use estimator::{format_duration, time_remaining_report, EtaReport};
pub use models::{DetectionResult, Page, SortBy, SortDirection, SortSpec, SourceProgress};
pub use session::{
    FeedEvent, ProgressEvent, RawDetection, SearchQuery, SearchSession, SessionConfig,
    SessionSnapshot, SessionStatus, ViewEvent,
};
pub use store::{InsertOutcome, ResultStore};
