//! Bounded top-K retention for streaming detection results.
//!
//! An explicit array-backed binary min-heap keyed by score holds the
//! retained set, with a parallel id set for O(1) duplicate detection. The
//! root is always the worst retained result, so admission and eviction are
//! both O(log n).

use std::collections::HashSet;

use log::debug;

use crate::models::{DetectionResult, SortSpec};

/// Default retention bound for one search job.
pub const DEFAULT_CAPACITY: usize = 5000;

/// What happened to a result offered to the store. None of these are
/// errors: duplicates and capacity rejections are normal outcomes of
/// bounded retention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Added,
    Duplicate,
    CapacityRejected,
}

impl InsertOutcome {
    pub fn was_added(&self) -> bool {
        matches!(self, InsertOutcome::Added)
    }
}

/// Retains the `capacity` best-scoring results seen so far for one job.
///
/// Constructed per search job and owned by its session; never shared across
/// jobs. Retention eligibility is always score-based, even while the view
/// sorts by date: a low-scoring result with a very recent timestamp can be
/// evicted (or never admitted) although it would rank first under a date
/// sort. Under sustained low-score-variance streams the "best by date" view
/// is therefore measurably incomplete. That staleness bound is intentional
/// and matches the shipped behavior.
#[derive(Debug)]
pub struct ResultStore {
    capacity: usize,
    heap: Vec<DetectionResult>,
    ids: HashSet<String>,
}

impl ResultStore {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be greater than zero");
        Self {
            capacity,
            heap: Vec::with_capacity(capacity),
            ids: HashSet::with_capacity(capacity),
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Score of the worst retained result, i.e. the current admission floor
    /// once the store is full.
    pub fn min_score(&self) -> Option<f64> {
        self.heap.first().map(|result| result.score)
    }

    /// Offers a result to the store.
    ///
    /// Duplicates by id are ignored. Under capacity everything is admitted.
    /// At capacity the result must strictly outscore the current minimum;
    /// otherwise it is discarded permanently — it can never be retained
    /// later even if it would outrank a future eviction candidate. Accepted
    /// lossy design.
    pub fn insert(&mut self, result: DetectionResult) -> InsertOutcome {
        if self.ids.contains(&result.id) {
            return InsertOutcome::Duplicate;
        }

        if self.heap.len() < self.capacity {
            self.ids.insert(result.id.clone());
            self.heap.push(result);
            self.sift_up(self.heap.len() - 1);
            return InsertOutcome::Added;
        }

        // Full store: the root is the worst retained result.
        let floor = self.heap[0].score;
        if result.score <= floor {
            return InsertOutcome::CapacityRejected;
        }

        let evicted = std::mem::replace(&mut self.heap[0], result);
        self.ids.remove(&evicted.id);
        self.ids.insert(self.heap[0].id.clone());
        self.sift_down(0);
        debug!(
            "evicted {} (score {:.3}) for {} (score {:.3})",
            evicted.id, evicted.score, self.heap[0].id, self.heap[0].score
        );
        InsertOutcome::Added
    }

    /// Materializes the retained set in the requested display order.
    pub fn ordered_snapshot(&self, sort: SortSpec) -> Vec<DetectionResult> {
        let mut items = self.heap.clone();
        items.sort_by(|a, b| sort.compare(a, b));
        items
    }

    /// Empties the store; used when a new search starts.
    pub fn clear(&mut self) {
        self.heap.clear();
        self.ids.clear();
    }

    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if self.heap[index].score >= self.heap[parent].score {
                break;
            }
            self.heap.swap(index, parent);
            index = parent;
        }
    }

    fn sift_down(&mut self, mut index: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * index + 1;
            let right = left + 1;
            let mut smallest = index;
            if left < len && self.heap[left].score < self.heap[smallest].score {
                smallest = left;
            }
            if right < len && self.heap[right].score < self.heap[smallest].score {
                smallest = right;
            }
            if smallest == index {
                break;
            }
            self.heap.swap(index, smallest);
            index = smallest;
        }
    }
}
