use std::fmt;
use std::hash::{Hash, Hasher};

use tracing::debug;

use crate::domain::{ColumnRef, ConversionError};

/// Glyph used to render an empty cell.
pub const EMPTY_CELL: &str = "∅";

#[derive(Debug, Clone, Default)]
pub enum Cell {
    Text(String),
    Number(f64),
    #[default]
    Empty,
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Numeric value of the cell. Text is trimmed before parsing.
    pub fn as_number(&self) -> Result<f64, ConversionError> {
        let value = match self {
            Cell::Number(n) => Ok(*n),
            Cell::Text(s) => s.trim().parse::<f64>().map_err(|_| ConversionError {
                value: s.clone(),
            }),
            Cell::Empty => Err(ConversionError {
                value: String::new(),
            }),
        }?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(ConversionError {
                value: self.to_string(),
            })
        }
    }

    fn number_key(n: f64) -> u64 {
        // -0.0 and 0.0 are the same value on screen
        if n == 0.0 { 0.0f64.to_bits() } else { n.to_bits() }
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Cell::Text(a), Cell::Text(b)) => a == b,
            (Cell::Number(a), Cell::Number(b)) => Cell::number_key(*a) == Cell::number_key(*b),
            (Cell::Empty, Cell::Empty) => true,
            _ => false,
        }
    }
}

impl Eq for Cell {}

impl Hash for Cell {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Cell::Text(s) => s.hash(state),
            Cell::Number(n) => Cell::number_key(*n).hash(state),
            Cell::Empty => {}
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) => write!(f, "{}", s.replace("\r\n", " ↵ ").replace('\n', " ↵ ")),
            Cell::Number(n) => write!(f, "{n}"),
            Cell::Empty => write!(f, "{EMPTY_CELL}"),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s.to_string())
        }
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

pub type Row = Vec<Cell>;

/// Sheet content after the banner rows, header row split off.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl RawTable {
    /// Build a table, padding every row to the header width.
    pub fn new(headers: Vec<String>, rows: Vec<Row>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Cell::Empty);
                row
            })
            .collect();
        Self { headers, rows }
    }

    /// Drop every row without a value in the identity column.
    pub fn clean(self, identity: &ColumnRef) -> CleanedTable {
        let total = self.rows.len();
        let rows: Vec<Row> = match identity.resolve(&self.headers) {
            Some(cidx) => self
                .rows
                .into_iter()
                .filter(|row| !row[cidx].is_empty())
                .collect(),
            None => Vec::new(),
        };
        debug!("Cleaning kept {} of {} rows", rows.len(), total);
        CleanedTable {
            headers: self.headers,
            rows,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanedTable {
    headers: Vec<String>,
    rows: Vec<Row>,
}

impl CleanedTable {
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn nrows(&self) -> usize {
        self.rows.len()
    }

    pub fn ncolumns(&self) -> usize {
        self.headers.len()
    }

    pub fn cell(&self, row: usize, column: usize) -> &Cell {
        static EMPTY: Cell = Cell::Empty;
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&EMPTY)
    }

    /// View over every row, in order.
    pub fn view(&self) -> FilteredView<'_> {
        FilteredView {
            table: self,
            rows: (0..self.rows.len()).collect(),
        }
    }
}

/// Ordered subset of a cleaned table. Holds row indices only.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    table: &'a CleanedTable,
    rows: Vec<usize>,
}

impl<'a> FilteredView<'a> {
    pub fn new(table: &'a CleanedTable, rows: Vec<usize>) -> Self {
        Self { table, rows }
    }

    pub fn table(&self) -> &'a CleanedTable {
        self.table
    }

    /// Indices into the cleaned table.
    pub fn row_indices(&self) -> &[usize] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = &'a Row> + '_ {
        let table = self.table;
        self.rows.iter().map(move |&ridx| &table.rows[ridx])
    }

    /// Cells of one column, in view order.
    pub fn column(&self, column: usize) -> impl Iterator<Item = &'a Cell> + '_ {
        let table = self.table;
        self.rows.iter().map(move |&ridx| table.cell(ridx, column))
    }
}

impl PartialEq for FilteredView<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.table, other.table) && self.rows == other.rows
    }
}
