pub mod eta;
pub mod format;

pub use eta::{
    estimate_combined_remaining, estimate_source_remaining, time_remaining_report, EtaReport,
};
pub use format::format_duration;
