use std::time::SystemTime;

use chrono::{DateTime, Local};
use ratatui::crossterm::event::KeyEvent;
use rayon::prelude::*;
use tracing::{debug, info, trace, warn};

use crate::dataset::{Column, Dataset};
use crate::domain::{Config, Message, TableError};
use crate::filter::{FilterState, Selector};
use crate::inputter::{InputResult, Inputter};
use crate::labels::Labels;
use crate::prefs::{PreferenceStore, Preferences, Theme};
use crate::render::{Header, Presentation, bind_headers};
use crate::store::{TableStatus, TableStore};
use crate::ui::{
    CMDLINE_HEIGH, COLUMN_WIDTH_MARGIN, FILTERBAR_HEIGHT, TABLE_HEADER_HEIGHT, TITLE_HEIGHT,
};

/// Rows below the top after which the scroll-to-top hint is shown.
pub const SCROLL_TOP_THRESHOLD: usize = 10;

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Modus {
    TABLE,
    SEARCH,
    HELP,
}

/// Screen slot of a visible header cell.
///
/// Slots only change on load, resize and horizontal scrolling, never on
/// filtering or sorting.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderSlot {
    pub column: Column,
    pub x: usize,
    pub width: usize,
}

#[derive(Default, Clone, Debug)]
pub struct UILayout {
    pub width: usize,
    pub height: usize,
    pub table_top: usize,
    pub table_height: usize,
}

impl UILayout {
    pub fn from_values(ui_width: usize, ui_height: usize) -> Self {
        let table_top = TITLE_HEIGHT + FILTERBAR_HEIGHT;
        let layout = UILayout {
            width: ui_width,
            height: ui_height,
            table_top,
            table_height: ui_height.saturating_sub(table_top + TABLE_HEADER_HEIGHT + CMDLINE_HEIGH),
        };
        trace!("Build UILayout: {:?}", layout);
        layout
    }
}

pub struct Model {
    config: Config,
    labels: &'static Labels,
    pub status: Status,
    modus: Modus,
    store: TableStore,
    headers: Vec<Header>,
    column_widths: Vec<usize>,
    slots: Vec<HeaderSlot>,
    type_selector: Selector,
    country_selector: Selector,
    input: Inputter,
    last_input: InputResult,
    curser_row: usize,
    curser_column: usize,
    offset_row: usize,
    offset_column: usize,
    uilayout: UILayout,
    presentation: Presentation,
    prefs: PreferenceStore,
    theme: Theme,
    last_updated: Option<String>,
    status_message: String,
}

impl Model {
    pub fn init(config: &Config, ui_width: usize, ui_height: usize) -> Self {
        let labels = Labels::for_lang(config.lang);
        let prefs = PreferenceStore::new(config.prefs_path.clone());
        let theme = prefs.load().theme;
        let headers = bind_headers(labels);

        let mut model = Self {
            config: config.clone(),
            labels,
            status: Status::READY,
            modus: Modus::TABLE,
            store: TableStore::new(config.lang),
            column_widths: Self::header_widths(&headers, config.max_column_width),
            headers,
            slots: Vec::new(),
            type_selector: Selector::new(Column::Type, labels.all_types, Vec::new()),
            country_selector: Selector::new(Column::Country, labels.all_countries, Vec::new()),
            input: Inputter::default(),
            last_input: InputResult::default(),
            curser_row: 0,
            curser_column: 0,
            offset_row: 0,
            offset_column: 0,
            uilayout: UILayout::from_values(ui_width, ui_height),
            presentation: Presentation::Loading,
            prefs,
            theme,
            last_updated: None,
            status_message: String::new(),
        };
        model.store.begin_load();
        model.set_status_message(labels.loading);
        model.rebuild_slots();
        model.refresh();
        model
    }

    pub fn update(&mut self, message: Option<Message>) -> Result<(), TableError> {
        let Some(msg) = message else {
            return Ok(());
        };
        trace!("Update: Modus {:?}, Message {:?}", self.modus, msg);

        // Messages that apply regardless of the modus.
        let msg = match msg {
            Message::Loaded(result) => {
                self.loaded(result);
                return Ok(());
            }
            Message::Resize(width, height) => {
                self.ui_resize(width, height);
                return Ok(());
            }
            Message::Quit => {
                self.quit();
                return Ok(());
            }
            msg => msg,
        };

        match self.modus {
            Modus::TABLE => match msg {
                Message::Exit => self.clear_filters(),
                Message::MoveDown => self.move_selection_down(1),
                Message::MoveUp => self.move_selection_up(1),
                Message::MovePageDown => self.move_selection_down(self.uilayout.table_height),
                Message::MovePageUp => self.move_selection_up(self.uilayout.table_height),
                Message::MoveBeginning => self.select_row(0),
                Message::MoveEnd => self.select_row(self.store.view().len().saturating_sub(1)),
                Message::MoveLeft => self.move_column_selection(-1),
                Message::MoveRight => self.move_column_selection(1),
                Message::Search => self.enter_search(),
                Message::SortBy(column) => self.sort_by(column),
                Message::SortCurrentColumn => self.sort_by(Column::ALL[self.curser_column]),
                Message::NextTypeFilter => self.cycle_selector(Column::Type, true),
                Message::PrevTypeFilter => self.cycle_selector(Column::Type, false),
                Message::NextCountryFilter => self.cycle_selector(Column::Country, true),
                Message::PrevCountryFilter => self.cycle_selector(Column::Country, false),
                Message::ClearFilters => self.clear_filters(),
                Message::ToggleTheme => self.toggle_theme(),
                Message::Help => self.modus = Modus::HELP,
                _ => (),
            },
            Modus::SEARCH => {
                if let Message::RawKey(key) = msg {
                    self.raw_input(key)
                }
            }
            Modus::HELP => match msg {
                Message::Exit | Message::Enter | Message::Help => self.modus = Modus::TABLE,
                _ => (),
            },
        }
        Ok(())
    }

    // -------------------- Accessors for the UI ---------------------- //

    pub fn labels(&self) -> &'static Labels {
        self.labels
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn modus(&self) -> Modus {
        self.modus
    }

    pub fn raw_keyevents(&self) -> bool {
        self.modus == Modus::SEARCH
    }

    pub fn presentation(&self) -> &Presentation {
        &self.presentation
    }

    pub fn slots(&self) -> &[HeaderSlot] {
        &self.slots
    }

    pub fn uilayout(&self) -> &UILayout {
        &self.uilayout
    }

    pub fn selected_row(&self) -> usize {
        self.curser_row
    }

    pub fn selected_column(&self) -> Column {
        Column::ALL[self.curser_column]
    }

    pub fn search_input(&self) -> &InputResult {
        &self.last_input
    }

    pub fn selector_labels(&self) -> (&str, &str) {
        (self.type_selector.label(), self.country_selector.label())
    }

    pub fn last_updated(&self) -> Option<&str> {
        self.last_updated.as_deref()
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    pub fn record_counts(&self) -> (usize, usize) {
        (self.store.view().len(), self.store.dataset().len())
    }

    pub fn show_scroll_top(&self) -> bool {
        self.offset_row + self.curser_row > SCROLL_TOP_THRESHOLD
    }

    /// Column whose header cell covers the screen position, if any.
    pub fn header_at(&self, x: usize, y: usize) -> Option<Column> {
        if y != self.uilayout.table_top || self.store.status() != TableStatus::Loaded {
            return None;
        }
        self.slots
            .iter()
            .find(|s| x >= s.x && x < s.x + s.width)
            .map(|s| s.column)
    }

    // -------------------- Control handling functions ---------------------- //

    fn loaded(&mut self, result: Result<Dataset, TableError>) {
        self.store.finish_load(result);
        match self.store.status() {
            TableStatus::Loaded => {
                let dataset = self.store.dataset();
                self.column_widths =
                    Self::measure_column_widths(dataset, &self.headers, self.config.max_column_width);
                self.last_updated = dataset.last_modified().map(format_updated);
                self.type_selector = Selector::new(
                    Column::Type,
                    self.labels.all_types,
                    self.store.options(Column::Type).to_vec(),
                );
                self.country_selector = Selector::new(
                    Column::Country,
                    self.labels.all_countries,
                    self.store.options(Column::Country).to_vec(),
                );
                let nrecords = dataset.len();
                self.set_status_message(format!("{nrecords} {}", self.labels.found));
            }
            TableStatus::LoadFailed => self.set_status_message(self.labels.load_failed),
            _ => {}
        }
        self.curser_row = 0;
        self.offset_row = 0;
        self.rebuild_slots();
        self.refresh();
    }

    fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.uilayout.width, width, self.uilayout.height, height
        );
        self.uilayout = UILayout::from_values(width, height);
        self.ensure_column_visible();
        let row = self.offset_row + self.curser_row;
        self.select_row(row);
    }

    fn enter_search(&mut self) {
        self.input.set(&self.store.filter().query);
        self.last_input = self.input.get();
        self.modus = Modus::SEARCH;
    }

    fn raw_input(&mut self, key: KeyEvent) {
        self.last_input = self.input.read(key);
        self.apply_filter();
        if self.last_input.finished {
            debug!(
                "Search finished: {:?} (canceled: {})",
                self.last_input.input, self.last_input.canceled
            );
            self.modus = Modus::TABLE;
        }
    }

    fn cycle_selector(&mut self, column: Column, forward: bool) {
        let selector = match column {
            Column::Country => &mut self.country_selector,
            _ => &mut self.type_selector,
        };
        if forward {
            selector.next();
        } else {
            selector.prev();
        }
        trace!("Selector {} -> {:?}", selector.column(), selector.value());
        self.apply_filter();
    }

    fn clear_filters(&mut self) {
        self.input.clear();
        self.last_input = self.input.get();
        self.type_selector.reset();
        self.country_selector.reset();
        self.apply_filter();
    }

    fn apply_filter(&mut self) {
        let filter = FilterState {
            query: self.last_input.input.clone(),
            kind: self.type_selector.value().map(str::to_string),
            country: self.country_selector.value().map(str::to_string),
        };
        if &filter == self.store.filter() {
            return;
        }
        self.store.set_filter(filter);
        let (nrows, nrecords) = self.record_counts();
        self.set_status_message(format!("{nrows}/{nrecords} {}", self.labels.found));
        self.curser_row = 0;
        self.offset_row = 0;
        self.refresh();
    }

    fn sort_by(&mut self, column: Column) {
        self.store.sort_by(column);
        let sort = self.store.sort();
        if let Some(active) = sort.column {
            self.set_status_message(format!(
                "{} {}",
                self.labels.title(active),
                sort.direction.arrow()
            ));
        }
        self.refresh();
    }

    fn toggle_theme(&mut self) {
        self.theme = self.theme.toggled();
        info!("Theme switched to {:?}", self.theme);
        let prefs = Preferences { theme: self.theme };
        if let Err(e) = self.prefs.save(&prefs) {
            warn!("Could not save preferences to {}: {e}", self.prefs.path().display());
            self.set_status_message(format!("{e}"));
        }
    }

    fn move_selection_down(&mut self, size: usize) {
        let nrows = self.store.view().len();
        if nrows == 0 {
            return;
        }
        let row = (self.offset_row + self.curser_row + size.max(1)).min(nrows - 1);
        self.select_row(row);
    }

    fn move_selection_up(&mut self, size: usize) {
        let row = (self.offset_row + self.curser_row).saturating_sub(size.max(1));
        self.select_row(row);
    }

    fn select_row(&mut self, row: usize) {
        let nrows = self.store.view().len();
        let row = row.min(nrows.saturating_sub(1));
        let height = self.uilayout.table_height.max(1);
        if row < self.offset_row {
            self.offset_row = row;
        } else if row >= self.offset_row + height {
            self.offset_row = row + 1 - height;
        }
        self.curser_row = row - self.offset_row;
        self.refresh();
    }

    fn move_column_selection(&mut self, step: isize) {
        let last = Column::COUNT - 1;
        self.curser_column = self.curser_column.saturating_add_signed(step).min(last);
        self.ensure_column_visible();
    }

    fn ensure_column_visible(&mut self) {
        if self.curser_column < self.offset_column {
            self.offset_column = self.curser_column;
        }
        self.rebuild_slots();
        while self.offset_column < self.curser_column && !self.fully_visible(self.curser_column) {
            self.offset_column += 1;
            self.rebuild_slots();
        }
    }

    fn fully_visible(&self, cidx: usize) -> bool {
        self.slots
            .iter()
            .any(|s| s.column.index() == cidx && s.width == self.column_widths[cidx])
    }

    fn rebuild_slots(&mut self) {
        self.slots.clear();
        let table_width = self.uilayout.width;
        let mut x = 0;
        for &column in &Column::ALL[self.offset_column..] {
            if x >= table_width {
                break;
            }
            let width = self.column_widths[column.index()];
            if x + width <= table_width {
                self.slots.push(HeaderSlot { column, x, width });
                x += width + 1;
            } else {
                // The last, partially visible column
                self.slots.push(HeaderSlot {
                    column,
                    x,
                    width: table_width - x,
                });
                break;
            }
        }
        trace!("Header slots: {:?}", self.slots);
    }

    fn refresh(&mut self) {
        let nrows = self.store.view().len();
        if self.offset_row >= nrows {
            self.offset_row = 0;
        }
        self.curser_row = self
            .curser_row
            .min(nrows.saturating_sub(self.offset_row + 1));
        let window = self.offset_row..self.offset_row + self.uilayout.table_height;
        self.presentation = self.store.presentation(&self.headers, window);
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
    }

    fn header_widths(headers: &[Header], max_column_width: usize) -> Vec<usize> {
        headers
            .iter()
            .map(|h| Self::clamp_width(h.title.chars().count() + 2, max_column_width))
            .collect()
    }

    // One rayon task per column, like the column pre-processing on load.
    fn measure_column_widths(dataset: &Dataset, headers: &[Header], max_column_width: usize) -> Vec<usize> {
        headers
            .par_iter()
            .map(|h| {
                let max_width = dataset
                    .records()
                    .iter()
                    .map(|r| r.cell(h.column).chars().count())
                    .max()
                    .unwrap_or(0);
                // Room for the sort marker next to the title
                let title_width = h.title.chars().count() + 2;
                Self::clamp_width(title_width.max(max_width), max_column_width)
            })
            .collect()
    }

    fn clamp_width(width: usize, max_column_width: usize) -> usize {
        (width + COLUMN_WIDTH_MARGIN).min(max_column_width.max(4))
    }
}

/// `dd.mm.yyyy` in local time.
pub fn format_updated(time: SystemTime) -> String {
    DateTime::<Local>::from(time).format("%d.%m.%Y").to_string()
}
