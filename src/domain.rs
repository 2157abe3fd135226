use std::io::Error;
use std::path::PathBuf;

use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;

pub const DEFAULT_PAGE_SIZE: usize = 5;

pub const HELP_TEXT: &str = "\
/            Search (global filter)
Esc          Clear search while typing
Enter        Keep search
Left/Right   Select column
s            Toggle sort of selected column
n  PgDn      Next page
p  PgUp      Previous page
g  Home      First page
G  End       Last page
?            Help
q            Quit";

/// Raised when a column is used in a way its definition does not allow.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("column '{key}' has no accessor")]
    NoAccessor { key: String },
    #[error("column '{key}' reads unknown field '{field}'")]
    UnknownField { key: String, field: String },
    #[error("no leaf column with key '{key}'")]
    UnknownColumn { key: String },
    #[error("duplicate column key '{key}'")]
    DuplicateKey { key: String },
    #[error("group column '{key}' has no children")]
    EmptyGroup { key: String },
}

#[derive(Debug, thiserror::Error)]
pub enum TVError {
    #[error("I/O error: {0}")]
    IoError(#[from] Error),
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Schema error: {0}")]
    SchemaError(#[from] SchemaError),
    #[error("Loading failed: {0}")]
    LoadingFailed(String),
    #[error("File not found: {0:?}")]
    FileNotFound(PathBuf),
    #[error("Permission denied: {0:?}")]
    PermissionDenied(PathBuf),
    #[error("Unknown file type: {0:?}")]
    UnknownFileType(PathBuf),
    #[error("Dataset has no column '{0}'")]
    MissingColumn(String),
    #[error("Invalid value {value:?} for '{field}' in row {row}")]
    InvalidRecord {
        row: usize,
        field: String,
        value: String,
    },
    #[error("Duplicate id {0}")]
    DuplicateId(i64),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

#[derive(Debug, Clone, Setters)]
#[setters(prefix = "with_")]
pub struct TableConfig {
    pub event_poll_time: u64,
    pub page_size: usize,
    pub clamp_pages: bool,
    #[setters(into)]
    pub log_file: PathBuf,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            event_poll_time: 100,
            page_size: DEFAULT_PAGE_SIZE,
            clamp_pages: false,
            log_file: PathBuf::from("tq.log"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Quit,
    Help,
    Exit,
    EnterFilter,
    RawKey(KeyEvent),
    MoveLeft,
    MoveRight,
    ToggleSort,
    FirstPage,
    LastPage,
    PreviousPage,
    NextPage,
}
