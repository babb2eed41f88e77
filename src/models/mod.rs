pub mod progress;
pub mod result;

pub use progress::SourceProgress;
pub use result::{DetectionResult, Page, SortBy, SortDirection, SortSpec};
