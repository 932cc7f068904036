use std::io::{self, ErrorKind};
use std::path::PathBuf;

use derive_setters::Setters;
use ratatui::crossterm::event::KeyEvent;
use thiserror::Error;
use tracing_subscriber::util::TryInitError;

use crate::dataset::{Column, Dataset};
use crate::labels::Lang;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("i/o error: {0}")]
    IoError(io::Error),
    #[error("data file not found")]
    FileNotFound,
    #[error("permission denied")]
    PermissionDenied,
    #[error("loading failed: {0}")]
    LoadingFailed(String),
    #[error("malformed data: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("unknown column \"{0}\"")]
    UnknownColumn(String),
    #[error("unknown sort direction \"{0}\"")]
    UnknownDirection(String),
    #[error("could not set up logging: {0}")]
    LoggingError(#[from] TryInitError),
}

impl From<io::Error> for TableError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            ErrorKind::NotFound => TableError::FileNotFound,
            ErrorKind::PermissionDenied => TableError::PermissionDenied,
            _ => TableError::IoError(err),
        }
    }
}

#[derive(Debug)]
pub enum Message {
    Quit,
    Exit,
    Enter,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    Resize(usize, usize),
    Help,
    Search,
    RawKey(KeyEvent),
    SortBy(Column),
    SortCurrentColumn,
    NextTypeFilter,
    PrevTypeFilter,
    NextCountryFilter,
    PrevCountryFilter,
    ClearFilters,
    ToggleTheme,
    Loaded(Result<Dataset, TableError>),
}

#[derive(Debug, Clone, Setters)]
pub struct Config {
    pub data_path: PathBuf,
    pub prefs_path: PathBuf,
    pub event_poll_time: u64,
    pub max_column_width: usize,
    pub lang: Lang,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data.json"),
            prefs_path: PathBuf::from("prefs.json"),
            event_poll_time: 100,
            max_column_width: 40,
            lang: Lang::En,
        }
    }
}
