use std::ops::Range;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, trace, warn};

use crate::dataset::{Column, Dataset};
use crate::domain::TableError;
use crate::filter::{FilterState, apply_filters, derive_options};
use crate::labels::Lang;
use crate::render::{Header, Presentation, render};
use crate::sort::{SortState, TextOrder, apply_sort, sort_by_column};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableStatus {
    Uninitialized,
    Loading,
    Loaded,
    LoadFailed,
}

/// Owns the dataset and everything derived from it.
///
/// The view is a list of dataset row indices. It is rebuilt from the full
/// dataset on every filter change and swapped in as a whole.
#[derive(Debug)]
pub struct TableStore {
    status: TableStatus,
    dataset: Arc<Dataset>,
    filter: FilterState,
    sort: SortState,
    view: Arc<Vec<usize>>,
    type_options: Vec<String>,
    country_options: Vec<String>,
    text_order: TextOrder,
}

impl Default for TableStore {
    fn default() -> Self {
        Self::new(Lang::default())
    }
}

impl TableStore {
    /// Text cells are ordered by the collation rules of `lang`.
    pub fn new(lang: Lang) -> Self {
        Self {
            status: TableStatus::Uninitialized,
            dataset: Arc::new(Dataset::default()),
            filter: FilterState::default(),
            sort: SortState::default(),
            view: Arc::new(Vec::new()),
            type_options: Vec::new(),
            country_options: Vec::new(),
            text_order: TextOrder::for_lang(lang),
        }
    }

    pub fn status(&self) -> TableStatus {
        self.status
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn sort(&self) -> SortState {
        self.sort
    }

    pub fn view(&self) -> &[usize] {
        &self.view
    }

    pub fn options(&self, column: Column) -> &[String] {
        match column {
            Column::Type => &self.type_options,
            Column::Country => &self.country_options,
            _ => &[],
        }
    }

    /// Marks the load as in flight. Only valid once, from `Uninitialized`.
    pub fn begin_load(&mut self) -> bool {
        if self.status != TableStatus::Uninitialized {
            warn!("Ignoring load request in state {:?}", self.status);
            return false;
        }
        self.status = TableStatus::Loading;
        debug!("Table status: Uninitialized -> Loading");
        true
    }

    pub fn finish_load(&mut self, result: Result<Dataset, TableError>) {
        if self.status != TableStatus::Loading {
            warn!("Ignoring load result in state {:?}", self.status);
            return;
        }
        match result {
            Ok(dataset) => {
                if dataset.is_empty() {
                    warn!("Loaded an empty dataset");
                }
                self.type_options = derive_options(&dataset, Column::Type);
                self.country_options = derive_options(&dataset, Column::Country);
                self.view = Arc::new((0..dataset.len()).collect());
                self.dataset = Arc::new(dataset);
                self.status = TableStatus::Loaded;
                info!(
                    "Table status: Loading -> Loaded ({} records, {} types, {} countries)",
                    self.dataset.len(),
                    self.type_options.len(),
                    self.country_options.len()
                );
                self.rebuild_view();
            }
            Err(e) => {
                error!("Loading data failed: {e}");
                self.status = TableStatus::LoadFailed;
            }
        }
    }

    /// Replace the filter and rebuild the view from the full dataset.
    pub fn set_filter(&mut self, filter: FilterState) {
        if filter == self.filter {
            return;
        }
        self.filter = filter;
        self.rebuild_view();
    }

    /// Header activation: toggle or switch the sort column.
    pub fn sort_by(&mut self, column: Column) {
        if self.status != TableStatus::Loaded {
            return;
        }
        let start_time = Instant::now();
        let (view, sort) = sort_by_column(
            &self.dataset,
            &self.view,
            column,
            self.sort,
            &self.text_order,
        );
        self.view = Arc::new(view);
        self.sort = sort;
        trace!(
            "Sorted {} rows by {:?} in {}ms",
            self.view.len(),
            self.sort,
            start_time.elapsed().as_millis()
        );
    }

    pub fn set_sort(&mut self, sort: SortState) {
        self.sort = sort;
        self.rebuild_view();
    }

    pub fn presentation(&self, headers: &[Header], window: Range<usize>) -> Presentation {
        render(
            self.status,
            &self.dataset,
            &self.view,
            self.sort,
            headers,
            window,
        )
    }

    fn rebuild_view(&mut self) {
        if self.status != TableStatus::Loaded {
            return;
        }
        let start_time = Instant::now();
        let all_rows: Vec<usize> = (0..self.dataset.len()).collect();
        let filtered = apply_filters(&self.dataset, &all_rows, &self.filter);
        self.view = Arc::new(apply_sort(
            &self.dataset,
            &filtered,
            self.sort,
            &self.text_order,
        ));
        trace!(
            "Rebuilt view: {} rows in {}ms",
            self.view.len(),
            start_time.elapsed().as_millis()
        );
    }
}
