//! In-memory page windowing and substring search over a caller-loaded result set.

use serde::Serialize;
use tracing::debug;

use crate::error::PagerError;

pub mod search;

pub use search::{FieldAccessor, SearchPolicy, normalize_term};

/// What a bound surface should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PagerStatus {
    /// No records have been loaded (or an empty result set was loaded).
    Idle,
    /// Records are loaded but the current search matched none of them.
    NoMatches,
    /// At least one record is visible.
    Showing,
}

/// One window of the filtered result set.
#[derive(Debug, Clone)]
pub struct VisiblePage<'a, T> {
    pub items: Vec<&'a T>,
    pub page_index: usize,
    pub total_pages: usize,
    pub total_filtered: usize,
    pub page_size: usize,
}

impl<T> VisiblePage<'_, T> {
    /// Zero-based offset of the first item on this page within the filtered set.
    pub fn offset(&self) -> usize {
        self.page_index.saturating_mul(self.page_size)
    }
}

pub struct TablePager<T> {
    records: Vec<T>,
    page_size: usize,
    policy: SearchPolicy<T>,
    search_term: String,
    filtered: Vec<usize>,
    page_index: usize,
}

impl<T: Serialize + 'static> TablePager<T> {
    /// Builds a pager searching `fields`, or every record value when `fields`
    /// is empty.
    pub fn configure(page_size: usize, fields: Vec<FieldAccessor<T>>) -> Result<Self, PagerError> {
        Self::with_policy(page_size, SearchPolicy::from_fields(fields))
    }
}

impl<T> TablePager<T> {
    pub fn with_policy(page_size: usize, policy: SearchPolicy<T>) -> Result<Self, PagerError> {
        if page_size == 0 {
            return Err(PagerError::InvalidPageSize(page_size));
        }
        Ok(Self {
            records: Vec::new(),
            page_size,
            policy,
            search_term: String::new(),
            filtered: Vec::new(),
            page_index: 0,
        })
    }

    /// Replaces the result set. The current search term stays applied.
    pub fn set_data(&mut self, records: Vec<T>) {
        self.records = records;
        self.page_index = 0;
        self.refilter();
    }

    /// Applies a new search term; a blank term shows every record.
    pub fn search(&mut self, term: &str) {
        self.search_term = normalize_term(term);
        self.page_index = 0;
        self.refilter();
    }

    /// Moves to `requested`, clamped into the valid page range.
    pub fn go_to_page(&mut self, requested: i64) {
        let last = self.total_pages().saturating_sub(1);
        let clamped = usize::try_from(requested.max(0)).map_or(last, |index| index.min(last));
        if clamped != self.page_index {
            debug!(requested, page_index = clamped, "pager page change");
        }
        self.page_index = clamped;
    }

    pub fn next_page(&mut self) {
        let next = i64::try_from(self.page_index).map_or(i64::MAX, |index| index.saturating_add(1));
        self.go_to_page(next);
    }

    pub fn prev_page(&mut self) {
        let prev = i64::try_from(self.page_index).map_or(i64::MAX, |index| index - 1);
        self.go_to_page(prev);
    }

    pub fn visible_page(&self) -> VisiblePage<'_, T> {
        let start = self
            .page_index
            .saturating_mul(self.page_size)
            .min(self.filtered.len());
        let end = start.saturating_add(self.page_size).min(self.filtered.len());
        VisiblePage {
            items: self.filtered[start..end]
                .iter()
                .map(|&index| &self.records[index])
                .collect(),
            page_index: self.page_index,
            total_pages: self.total_pages(),
            total_filtered: self.filtered.len(),
            page_size: self.page_size,
        }
    }

    pub fn status(&self) -> PagerStatus {
        if self.records.is_empty() {
            PagerStatus::Idle
        } else if self.filtered.is_empty() {
            PagerStatus::NoMatches
        } else {
            PagerStatus::Showing
        }
    }

    pub fn total_pages(&self) -> usize {
        self.filtered.len().div_ceil(self.page_size).max(1)
    }

    pub fn total_filtered(&self) -> usize {
        self.filtered.len()
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// The normalized term currently applied (empty when unfiltered).
    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn records(&self) -> &[T] {
        &self.records
    }

    /// Indices into [`Self::records`] that pass the current search, in order.
    pub fn filtered_indices(&self) -> &[usize] {
        &self.filtered
    }

    fn refilter(&mut self) {
        let term = self.search_term.as_str();
        self.filtered = if term.is_empty() {
            (0..self.records.len()).collect()
        } else {
            self.records
                .iter()
                .enumerate()
                .filter(|(_, record)| self.policy.matches(record, term))
                .map(|(index, _)| index)
                .collect()
        };
        debug!(
            records = self.records.len(),
            filtered = self.filtered.len(),
            term,
            "pager refiltered"
        );
    }
}

impl<T> std::fmt::Debug for TablePager<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TablePager")
            .field("records", &self.records.len())
            .field("page_size", &self.page_size)
            .field("policy", &self.policy)
            .field("search_term", &self.search_term)
            .field("filtered", &self.filtered.len())
            .field("page_index", &self.page_index)
            .finish()
    }
}
