use std::fmt;
use std::io::Error;

use derive_setters::Setters;

/// Note shown below the metrics. Surfaced verbatim.
pub const CAPTION: &str = "All calculations use the latest successful attempts only. Modules marked with “–” are excluded.";

/// Placeholder used in the score column for modules that do not count.
pub const SCORE_PLACEHOLDER: &str = "–";

/// Number of banner rows at the top of the sheet that are always discarded.
pub const SKIPPED_ROWS: usize = 3;

pub const DEFAULT_SCORE_COLUMN: &str = "Average Score";

/// Errors raised while turning bytes into a table.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    InvalidWorkbook(String),
    NoSheet,
    NoDataRows,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::InvalidWorkbook(reason) => write!(f, "not a readable spreadsheet ({reason})"),
            ParseError::NoSheet => write!(f, "the workbook has no sheet"),
            ParseError::NoDataRows => write!(f, "no data rows after the header"),
        }
    }
}

impl std::error::Error for ParseError {}

/// A score cell that could not be read as a number.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionError {
    pub value: String,
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" is not a number", self.value)
    }
}

impl std::error::Error for ConversionError {}

#[derive(Debug)]
pub enum TRError {
    IoError(Error),
    Parse(ParseError),
    FileNotFound,
    PermissionDenied,
    NotAFile,
    UnknownFileType,
}

impl fmt::Display for TRError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TRError::IoError(e) => write!(f, "io error: {e}"),
            TRError::Parse(e) => write!(f, "{e}"),
            TRError::FileNotFound => write!(f, "file not found"),
            TRError::PermissionDenied => write!(f, "permission denied"),
            TRError::NotAFile => write!(f, "not a file"),
            TRError::UnknownFileType => write!(f, "unsupported file type"),
        }
    }
}

impl std::error::Error for TRError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TRError::IoError(e) => Some(e),
            TRError::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<Error> for TRError {
    fn from(err: Error) -> Self {
        TRError::IoError(err)
    }
}

impl From<ParseError> for TRError {
    fn from(err: ParseError) -> Self {
        TRError::Parse(err)
    }
}

/// Where a column sits in the sheet.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnRef {
    Index(usize),
    /// Counted from the right edge, 1 being the last column.
    FromEnd(usize),
    Label(String),
}

impl ColumnRef {
    /// Resolve against a header. Returns None if the column does not exist.
    pub fn resolve(&self, headers: &[String]) -> Option<usize> {
        match self {
            ColumnRef::Index(idx) => (*idx < headers.len()).then_some(*idx),
            ColumnRef::FromEnd(n) => headers.len().checked_sub(*n).filter(|_| *n > 0),
            ColumnRef::Label(label) => headers.iter().position(|h| h == label),
        }
    }
}

/// Positional contract of the training sheet.
#[derive(Debug, Clone, PartialEq, Setters)]
pub struct ColumnLayout {
    pub identity: ColumnRef,
    pub department: ColumnRef,
    pub assigned: ColumnRef,
    pub completed: ColumnRef,
    pub status: ColumnRef,
    pub average_score: ColumnRef,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            identity: ColumnRef::Index(1),
            department: ColumnRef::Index(3),
            assigned: ColumnRef::Index(6),
            completed: ColumnRef::Index(7),
            status: ColumnRef::FromEnd(2),
            average_score: ColumnRef::Label(DEFAULT_SCORE_COLUMN.to_string()),
        }
    }
}

#[derive(Debug, Clone, Setters)]
pub struct ReportConfig {
    pub event_poll_time: u64,
    pub max_column_width: usize,
    pub layout: ColumnLayout,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            event_poll_time: 100,
            max_column_width: 30,
            layout: ColumnLayout::default(),
        }
    }
}
