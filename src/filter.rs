use std::collections::HashSet;

use rayon::prelude::*;
use tracing::trace;

use crate::dataset::{Column, Dataset, Record};

/// Free text query plus the categorical constraints of the two selectors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub query: String,
    pub kind: Option<String>,
    pub country: Option<String>,
}

impl FilterState {
    /// Active categorical constraints as (column, required value).
    pub fn constraints(&self) -> impl Iterator<Item = (Column, &str)> {
        [(Column::Type, &self.kind), (Column::Country, &self.country)]
            .into_iter()
            .filter_map(|(column, value)| value.as_deref().map(|v| (column, v)))
    }

    pub fn is_empty(&self) -> bool {
        self.query.is_empty() && self.constraints().next().is_none()
    }

    fn matches_with_needle(record: &Record, needle: &str, filter: &FilterState) -> bool {
        let matches_search = needle.is_empty()
            || Column::ALL
                .iter()
                .any(|&c| record.cell(c).to_lowercase().contains(needle));

        matches_search
            && filter
                .constraints()
                .all(|(column, value)| record.cell(column) == value)
    }
}

/// Keep the rows of `rows` whose records match `filter`, preserving their order.
pub fn apply_filters(dataset: &Dataset, rows: &[usize], filter: &FilterState) -> Vec<usize> {
    if filter.is_empty() {
        return rows.to_vec();
    }
    let needle = filter.query.to_lowercase();
    let records = dataset.records();
    let matches: Vec<usize> = rows
        .par_iter()
        .copied()
        .filter(|&ridx| FilterState::matches_with_needle(&records[ridx], &needle, filter))
        .collect();
    trace!("Filter {:?} kept {}/{} rows", filter, matches.len(), rows.len());
    matches
}

/// Distinct values of `column` in first seen order.
pub fn derive_options(dataset: &Dataset, column: Column) -> Vec<String> {
    let mut seen = HashSet::new();
    dataset
        .records()
        .iter()
        .filter_map(|record| {
            let value = record.cell(column);
            if seen.contains(value.as_ref()) {
                None
            } else {
                seen.insert(value.to_string());
                Some(value.into_owned())
            }
        })
        .collect()
}

/// A categorical selector: an "all" sentinel followed by the derived options.
#[derive(Debug, Clone)]
pub struct Selector {
    column: Column,
    all_label: &'static str,
    values: Vec<String>,
    selected: usize, // 0 is the sentinel
}

impl Selector {
    pub fn new(column: Column, all_label: &'static str, values: Vec<String>) -> Self {
        Self {
            column,
            all_label,
            values,
            selected: 0,
        }
    }

    pub fn column(&self) -> Column {
        self.column
    }

    pub fn options(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.all_label).chain(self.values.iter().map(String::as_str))
    }

    pub fn len(&self) -> usize {
        self.values.len() + 1
    }

    /// The selected value, `None` while the sentinel is selected.
    pub fn value(&self) -> Option<&str> {
        self.selected
            .checked_sub(1)
            .and_then(|i| self.values.get(i))
            .map(String::as_str)
    }

    pub fn label(&self) -> &str {
        self.options().nth(self.selected).unwrap_or(self.all_label)
    }

    pub fn next(&mut self) {
        self.selected = (self.selected + 1) % self.len();
    }

    pub fn prev(&mut self) {
        self.selected = self.selected.checked_sub(1).unwrap_or(self.len() - 1);
    }

    pub fn reset(&mut self) {
        self.selected = 0;
    }
}
