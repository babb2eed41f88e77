//! Completion-time estimation from noisy per-source progress samples.
//!
//! All estimates are linear extrapolations and the combined figure assumes
//! pending sources start sequentially after the active ones finish. This is
//! a UI-facing approximation of the scheduler, not a simulation of it.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::SourceProgress;

use super::format_duration;

/// Below this much elapsed time there is too little data to extrapolate
/// reliably.
const MIN_CONFIDENCE_MS: i64 = 5_000;

/// Remaining milliseconds for a single source, extrapolated linearly from
/// how long it took to reach `progress_percent`.
///
/// Returns `None` when the source has not started, has already finished,
/// has been running for under the confidence window, or the extrapolation
/// is non-finite.
pub fn estimate_source_remaining(
    progress_percent: f64,
    start_time: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Option<u64> {
    if progress_percent <= 0.0 || progress_percent >= 100.0 {
        return None;
    }

    let elapsed_ms = (now - start_time).num_milliseconds();
    if elapsed_ms <= MIN_CONFIDENCE_MS {
        return None;
    }

    let rate = progress_percent / elapsed_ms as f64;
    let remaining_ms = (100.0 - progress_percent) / rate;
    if !remaining_ms.is_finite() || remaining_ms <= 0.0 {
        return None;
    }
    Some(remaining_ms as u64)
}

/// Combined remaining milliseconds across all sources of one search.
///
/// Sources with progress in (0, 100) run concurrently, so the active part
/// of the estimate is the longest individual ETA. Sources still at 0 are
/// assumed to queue behind them, costed at the average progress rate
/// observed across the active sources. `None` when no active source yields
/// an ETA yet.
pub fn estimate_combined_remaining(
    sources: &[SourceProgress],
    now: DateTime<Utc>,
) -> Option<u64> {
    let active: Vec<&SourceProgress> = sources.iter().filter(|s| s.is_active()).collect();
    let pending_count = sources.iter().filter(|s| s.is_pending()).count();

    let active_etas: Vec<u64> = active
        .iter()
        .filter_map(|source| {
            source
                .start_time
                .and_then(|start| estimate_source_remaining(source.progress_percent, start, now))
        })
        .collect();

    let longest_active = *active_etas.iter().max()?;
    if pending_count == 0 {
        return Some(longest_active);
    }

    let rate_sum: f64 = active
        .iter()
        .filter_map(|source| {
            let start = source.start_time?;
            let elapsed_ms = (now - start).num_milliseconds();
            if elapsed_ms <= 0 {
                return None;
            }
            Some(source.progress_percent / elapsed_ms as f64)
        })
        .sum();
    let average_rate = rate_sum / active.len() as f64;
    if !average_rate.is_finite() || average_rate <= 0.0 {
        return Some(longest_active);
    }

    let pending_ms = pending_count as f64 * (100.0 / average_rate);
    Some(longest_active + pending_ms as u64)
}

/// Formatted remaining-time strings for the UI: one combined estimate plus
/// one entry per source (`None` while a source cannot be estimated).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EtaReport {
    pub combined: Option<String>,
    pub per_source: HashMap<String, Option<String>>,
}

impl EtaReport {
    pub fn empty() -> Self {
        Self {
            combined: None,
            per_source: HashMap::new(),
        }
    }
}

/// Builds the full report published after each progress event.
pub fn time_remaining_report(sources: &[SourceProgress], now: DateTime<Utc>) -> EtaReport {
    if sources.is_empty() {
        return EtaReport::empty();
    }

    let per_source = sources
        .iter()
        .map(|source| {
            let eta = source.start_time.and_then(|start| {
                estimate_source_remaining(source.progress_percent, start, now)
            });
            (source.source_id.clone(), eta.map(format_duration))
        })
        .collect();

    EtaReport {
        combined: estimate_combined_remaining(sources, now).map(format_duration),
        per_source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample(source_id: &str, percent: f64, started_secs_ago: Option<i64>, now: DateTime<Utc>) -> SourceProgress {
        SourceProgress {
            source_id: source_id.to_string(),
            progress_percent: percent,
            sample_time: now,
            start_time: started_secs_ago.map(|secs| now - Duration::seconds(secs)),
        }
    }

    #[test]
    fn halfway_source_doubles_elapsed() {
        let now = Utc::now();
        let start = now - Duration::seconds(60);
        let remaining = estimate_source_remaining(50.0, start, now).unwrap();
        // 50% in 60s extrapolates to ~60s remaining.
        assert!((59_000..=61_000).contains(&remaining));
    }

    #[test]
    fn unstarted_and_finished_sources_have_no_eta() {
        let now = Utc::now();
        let start = now - Duration::seconds(60);
        assert_eq!(estimate_source_remaining(0.0, start, now), None);
        assert_eq!(estimate_source_remaining(100.0, start, now), None);
        assert_eq!(estimate_source_remaining(-3.0, start, now), None);
    }

    #[test]
    fn too_little_elapsed_time_yields_none() {
        let now = Utc::now();
        let start = now - Duration::seconds(3);
        assert_eq!(estimate_source_remaining(40.0, start, now), None);
    }

    #[test]
    fn combined_is_longest_active_when_nothing_pending() {
        let now = Utc::now();
        let sources = vec![
            sample("cam-1", 50.0, Some(60), now),  // ~60s left
            sample("cam-2", 25.0, Some(60), now),  // ~180s left
            sample("cam-3", 100.0, Some(60), now), // finished
        ];
        let combined = estimate_combined_remaining(&sources, now).unwrap();
        assert!((175_000..=185_000).contains(&combined));
    }

    #[test]
    fn pending_sources_queue_behind_active_ones() {
        let now = Utc::now();
        let sources = vec![
            sample("cam-1", 50.0, Some(60), now), // rate 50/60s, ~60s left
            sample("cam-2", 0.0, None, now),      // pending: ~120s at the average rate
        ];
        let combined = estimate_combined_remaining(&sources, now).unwrap();
        // 60s active + 120s pending.
        assert!((175_000..=185_000).contains(&combined));
    }

    #[test]
    fn no_active_etas_means_no_combined_estimate() {
        let now = Utc::now();
        let only_pending = vec![sample("cam-1", 0.0, None, now)];
        assert_eq!(estimate_combined_remaining(&only_pending, now), None);

        // Active but inside the confidence window.
        let too_fresh = vec![sample("cam-1", 10.0, Some(2), now)];
        assert_eq!(estimate_combined_remaining(&too_fresh, now), None);
    }

    #[test]
    fn report_formats_combined_and_per_source() {
        let now = Utc::now();
        let sources = vec![
            sample("cam-1", 30.0, Some(60), now),
            sample("cam-2", 0.0, None, now),
        ];
        let report = time_remaining_report(&sources, now);
        // cam-1: 30% in 60s leaves ~140s; pending cam-2 adds ~200s.
        assert_eq!(report.combined.as_deref(), Some("about 6 minutes"));
        assert_eq!(
            report.per_source.get("cam-1").unwrap().as_deref(),
            Some("about 3 minutes")
        );
        assert_eq!(report.per_source.get("cam-2").unwrap(), &None);
    }

    #[test]
    fn empty_telemetry_yields_empty_report() {
        let report = time_remaining_report(&[], Utc::now());
        assert_eq!(report, EtaReport::empty());
    }
}
