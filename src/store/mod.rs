pub mod heap;
pub mod page_view;

pub use heap::{InsertOutcome, ResultStore, DEFAULT_CAPACITY};
pub use page_view::{get_page, total_pages, would_affect_page};
