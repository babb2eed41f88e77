//! Pagination queries over a [`ResultStore`] snapshot.
//!
//! The point of `would_affect_page` is to avoid a full resort on every
//! incoming event: the session runs it once per event and only re-renders
//! when the visible page would actually change.

use crate::models::{DetectionResult, Page, SortBy, SortDirection, SortSpec};

use super::ResultStore;

/// Number of pages needed to show `total` items at `page_size` per page.
pub fn total_pages(total: usize, page_size: u32) -> u32 {
    if page_size == 0 {
        return 0;
    }
    ((total as u64).div_ceil(page_size as u64)) as u32
}

/// Sorted slice for one 1-based page. Out-of-range page numbers yield an
/// empty page rather than an error.
pub fn get_page(store: &ResultStore, page_number: u32, page_size: u32, sort: SortSpec) -> Page {
    let items = if page_number == 0 || page_size == 0 {
        Vec::new()
    } else {
        let snapshot = store.ordered_snapshot(sort);
        let start = (page_number as usize - 1) * page_size as usize;
        if start >= snapshot.len() {
            Vec::new()
        } else {
            let end = (start + page_size as usize).min(snapshot.len());
            snapshot[start..end].to_vec()
        }
    };
    Page {
        page_number,
        page_size,
        items,
    }
}

/// Would admitting `candidate` change what page `page_number` shows?
///
/// Fast path for the live page (page 1, score descending): a short page is
/// changed by any admitted candidate; a full page only by a candidate that
/// strictly outscores the worst score on display. Every other page/sort
/// combination ranks the candidate against the full snapshot — O(n log n),
/// acceptable because n is bounded by the store capacity.
pub fn would_affect_page(
    store: &ResultStore,
    candidate: &DetectionResult,
    page_number: u32,
    page_size: u32,
    sort: SortSpec,
) -> bool {
    if page_number == 0 || page_size == 0 {
        return false;
    }

    if page_number == 1 && sort.by == SortBy::Score && sort.direction == SortDirection::Desc {
        let shown = get_page(store, 1, page_size, sort);
        if (shown.items.len() as u32) < page_size {
            return true;
        }
        let min_shown = shown
            .items
            .last()
            .map(|result| result.score)
            .unwrap_or(f64::NEG_INFINITY);
        return candidate.score > min_shown;
    }

    // Exact rank of the candidate within the current ordering.
    let snapshot = store.ordered_snapshot(sort);
    let rank = snapshot
        .iter()
        .filter(|existing| sort.compare(existing, candidate) == std::cmp::Ordering::Less)
        .count();
    let start = (page_number as usize - 1) * page_size as usize;
    let end = start + page_size as usize;
    rank >= start && rank < end
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;

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

    fn seeded_store(scores: &[f64]) -> ResultStore {
        let mut store = ResultStore::new(100);
        for (i, &score) in scores.iter().enumerate() {
            store.insert(result(&format!("r{i}"), score, i as i64));
        }
        store
    }

    #[test]
    fn pages_concatenate_to_full_snapshot() {
        let store = seeded_store(&[0.9, 0.1, 0.5, 0.7, 0.3, 0.8, 0.2]);
        let sort = SortSpec::score_desc();
        let snapshot = store.ordered_snapshot(sort);

        let page_size = 3;
        let pages = total_pages(store.len(), page_size);
        assert_eq!(pages, 3);

        let mut stitched = Vec::new();
        for page_number in 1..=pages {
            stitched.extend(get_page(&store, page_number, page_size, sort).items);
        }
        let stitched_ids: Vec<&String> = stitched.iter().map(|r| &r.id).collect();
        let snapshot_ids: Vec<&String> = snapshot.iter().map(|r| &r.id).collect();
        assert_eq!(stitched_ids, snapshot_ids);
    }

    #[test]
    fn out_of_range_page_is_empty() {
        let store = seeded_store(&[0.5, 0.6]);
        let page = get_page(&store, 9, 10, SortSpec::score_desc());
        assert!(page.items.is_empty());
        assert!(get_page(&store, 0, 10, SortSpec::score_desc()).items.is_empty());
    }

    #[test]
    fn full_page_one_gates_on_min_displayed_score() {
        // Full page 1 of size 4; minimum displayed score is 0.6.
        let store = seeded_store(&[0.9, 0.8, 0.7, 0.6, 0.5]);
        let sort = SortSpec::score_desc();

        let weak = result("weak", 0.4, 99);
        let strong = result("strong", 0.8, 99);
        assert!(!would_affect_page(&store, &weak, 1, 4, sort));
        assert!(would_affect_page(&store, &strong, 1, 4, sort));
    }

    #[test]
    fn short_page_one_is_affected_by_anything() {
        let store = seeded_store(&[0.9]);
        let weak = result("weak", 0.01, 99);
        assert!(would_affect_page(&store, &weak, 1, 4, SortSpec::score_desc()));
    }

    #[test]
    fn rank_fallback_covers_later_pages() {
        let store = seeded_store(&[0.9, 0.8, 0.7, 0.6, 0.5, 0.4]);
        let sort = SortSpec::score_desc();

        // Would land at rank 4 (0-based), i.e. inside page 2 of size 3.
        let candidate = result("mid", 0.55, 99);
        assert!(!would_affect_page(&store, &candidate, 1, 3, sort));
        assert!(would_affect_page(&store, &candidate, 2, 3, sort));
        assert!(!would_affect_page(&store, &candidate, 3, 3, sort));
    }

    #[test]
    fn date_sort_ranks_by_timestamp() {
        let store = seeded_store(&[0.9, 0.8, 0.7]);
        let sort = SortSpec::date_desc();

        // Newest capture lands at the top of page 1 regardless of score.
        let newest = result("new", 0.05, 1000);
        assert!(would_affect_page(&store, &newest, 1, 2, sort));
        // Oldest capture falls onto page 2.
        let oldest = result("old", 0.99, -10);
        assert!(!would_affect_page(&store, &oldest, 1, 2, sort));
        assert!(would_affect_page(&store, &oldest, 2, 2, sort));
    }
}
