pub mod controller;
pub mod events;
pub mod state;
pub mod traits;

pub use controller::{SearchSession, SessionConfig};
pub use events::{FeedEvent, ProgressEvent, RawDetection, ViewEvent};
pub use state::{SearchQuery, SessionSnapshot, SessionState, SessionStatus};
pub use traits::{PageRequest, PageResponse, PagedQuery, ResultFeed, TaskMetadata, TaskRegistry};
