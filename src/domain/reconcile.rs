//! Record reconciliation: merge several sources' records for one symbol into a
//! single canonical timeline.
//!
//! The merge key is the period end date. When two records share a date the
//! configured [`SourcePriority`] decides which one stays; anything the
//! priority list does not rank is overwritten by whichever source is merged
//! later, so callers must merge sources in a fixed order.

use crate::domain::record::{FinancialRecord, SourceTag};
use std::collections::HashMap;

/// Ordered list of preferred sources. A listed source occupying a date slot is
/// never replaced by an unlisted source or by one listed after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePriority {
    order: Vec<SourceTag>,
}

impl SourcePriority {
    pub fn new(order: Vec<SourceTag>) -> Self {
        Self { order }
    }

    pub fn tags(&self) -> &[SourceTag] {
        &self.order
    }

    fn rank(&self, tag: SourceTag) -> Option<usize> {
        self.order.iter().position(|t| *t == tag)
    }

    /// Whether `existing` must be kept over `candidate` at the same date.
    pub fn keeps(&self, existing: SourceTag, candidate: SourceTag) -> bool {
        match (self.rank(existing), self.rank(candidate)) {
            (Some(_), None) => true,
            (Some(e), Some(c)) => c > e,
            (None, _) => false,
        }
    }
}

impl Default for SourcePriority {
    fn default() -> Self {
        Self::new(vec![SourceTag::YahooJp])
    }
}

/// A per-symbol series sorted by end date descending (most recent first) with
/// at most one record per end date.
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline<R> {
    records: Vec<R>,
}

impl<R: FinancialRecord> Timeline<R> {
    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Build a timeline from an arbitrary record list. Forecast rows are
    /// dropped and the first record seen for a date wins.
    pub fn from_records(records: Vec<R>) -> Self {
        let mut seen = std::collections::HashSet::new();
        let mut kept: Vec<R> = records
            .into_iter()
            .filter(|r| !r.is_forecast())
            .filter(|r| seen.insert(r.end_date()))
            .collect();
        kept.sort_by(|a, b| b.end_date().cmp(&a.end_date()));
        Self { records: kept }
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&R> {
        self.records.get(index)
    }

    pub fn into_records(self) -> Vec<R> {
        self.records
    }
}

/// Merge record lists (given in source call order) into one canonical timeline.
pub fn merge_records<R: FinancialRecord>(
    priority: &SourcePriority,
    record_sets: impl IntoIterator<Item = Vec<R>>,
) -> Timeline<R> {
    let mut merged: HashMap<chrono::NaiveDate, R> = HashMap::new();

    for records in record_sets {
        for record in records {
            if record.is_forecast() {
                continue;
            }
            let key = record.end_date();
            if let Some(existing) = merged.get(&key) {
                if priority.keeps(existing.source(), record.source()) {
                    continue;
                }
            }
            merged.insert(key, record);
        }
    }

    let mut records: Vec<R> = merged.into_values().collect();
    records.sort_by(|a, b| b.end_date().cmp(&a.end_date()));
    Timeline { records }
}
