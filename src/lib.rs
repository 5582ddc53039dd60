//! Training report over an employee training spreadsheet.
//!
//! The library side holds everything that can be computed without a
//! terminal: loading and cleaning the first sheet, listing filter options,
//! filtering and the summary metrics. The `trainview` binary renders it.

pub mod domain;
pub mod loader;
pub mod report;
pub mod table;

pub use domain::{
    CAPTION, ColumnLayout, ColumnRef, ConversionError, ParseError, ReportConfig, TRError,
};
pub use report::{
    AverageScore, ReportSession, Selection, Summary, apply_filters, compute_summary,
    distinct_value_counts, distinct_values,
};
pub use table::{Cell, CleanedTable, FilteredView, RawTable};
