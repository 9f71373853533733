//! Bounded range detection
//!
//! `(&(attr>=low)(attr<=high))` is answered by one range scan over the
//! equality index instead of two half-open scans and an intersection. The
//! pair is also merged when the AND has other children.

use crate::filter::{attr, Filter, FilterChoice};
use crate::storage::{IndexKey, KeyRange};

/// A GE and an LE child of one AND on the same attribute type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundedRange<'f> {
    pub attr: &'f str,
    pub low: &'f str,
    pub high: &'f str,
    /// Child positions of the GE and LE filters
    pub ge: usize,
    pub le: usize,
}

impl BoundedRange<'_> {
    /// Position at which the merged range is evaluated; the other half of
    /// the pair is skipped.
    pub fn evaluated_at(&self) -> usize {
        self.ge.max(self.le)
    }

    pub fn skipped_at(&self) -> usize {
        self.ge.min(self.le)
    }
}

/// Finds the first GE child with an LE partner on the same attribute type
/// (options included, case ignored).
pub fn bounded_range_pair(children: &[Filter]) -> Option<BoundedRange<'_>> {
    let bounds = |choice: FilterChoice| {
        children
            .iter()
            .enumerate()
            .filter(move |(_, f)| f.choice() == choice)
            .filter_map(|(i, f)| f.get_ava().ok().map(|(attr, value)| (i, attr, value)))
    };

    bounds(FilterChoice::Ge).find_map(|(ge, low_attr, low)| {
        bounds(FilterChoice::Le)
            .find(|(_, high_attr, _)| attr::types_exact(low_attr, high_attr))
            .map(|(le, _, high)| BoundedRange {
                attr: low_attr,
                low,
                high,
                ge,
                le,
            })
    })
}

/// Key interval covering every key of the assertion values.
///
/// The lowest low key and the highest high key are used, so the scan never
/// narrows below what either bound allows. Returns `None` when a given
/// bound produced no keys (cannot be indexed) or neither bound is given.
pub fn key_range(low_keys: Option<Vec<IndexKey>>, high_keys: Option<Vec<IndexKey>>) -> Option<KeyRange> {
    let low = match low_keys {
        Some(keys) => Some(keys.into_iter().min()?),
        None => None,
    };
    let high = match high_keys {
        Some(keys) => Some(keys.into_iter().max()?),
        None => None,
    };
    match (low, high) {
        (Some(low), Some(high)) => Some(KeyRange::between(low, high)),
        (Some(low), None) => Some(KeyRange::at_least(low)),
        (None, Some(high)) => Some(KeyRange::at_most(high)),
        (None, None) => None,
    }
}
