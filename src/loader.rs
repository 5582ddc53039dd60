use std::collections::HashMap;
use std::fs;
use std::io::{Cursor, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::Instant;

use calamine::{Data, ExcelDateTime, Range, Reader, open_workbook_auto_from_rs};
use chrono::Timelike;
use tracing::{debug, info, trace};

use crate::domain::{ColumnRef, ParseError, SKIPPED_ROWS, TRError};
use crate::table::{Cell, CleanedTable, RawTable, Row};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileType {
    XLSX,
    XLSB,
    XLS,
    ODS,
}

#[derive(Debug)]
pub struct FileInfo {
    pub path: PathBuf,
    pub file_size: u64,
    pub file_type: FileType,
}

/// Expand `~` and environment variables in a user supplied path.
pub fn expand_path(input: &str) -> PathBuf {
    match shellexpand::full(input.trim()) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(e) => {
            debug!("Could not expand {input}: {e}");
            PathBuf::from(input.trim())
        }
    }
}

pub fn detect_file_type(path: &Path) -> Result<FileType, TRError> {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_uppercase())
        .as_deref()
    {
        Some("XLSX") | Some("XLSM") => Ok(FileType::XLSX),
        Some("XLSB") => Ok(FileType::XLSB),
        Some("XLS") => Ok(FileType::XLS),
        Some("ODS") => Ok(FileType::ODS),
        _ => Err(TRError::UnknownFileType),
    }
}

pub fn get_file_info(path: PathBuf) -> Result<FileInfo, TRError> {
    let metadata = fs::metadata(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => TRError::FileNotFound,
        ErrorKind::PermissionDenied => TRError::PermissionDenied,
        _ => TRError::IoError(e),
    })?;
    if !metadata.is_file() {
        return Err(TRError::NotAFile);
    }

    let file_type = detect_file_type(&path)?;

    Ok(FileInfo {
        path,
        file_size: metadata.len(),
        file_type,
    })
}

/// Read the first sheet of a workbook. The banner rows are skipped and the
/// next row becomes the header.
pub fn parse(bytes: &[u8]) -> Result<RawTable, ParseError> {
    let start_time = Instant::now();

    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| ParseError::InvalidWorkbook(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(ParseError::NoSheet)?
        .map_err(|e| ParseError::InvalidWorkbook(e.to_string()))?;

    let mut grid = absolute_rows(&range).into_iter().skip(SKIPPED_ROWS);
    let header_row = grid.next().ok_or(ParseError::NoDataRows)?;
    let rows: Vec<Row> = grid.collect();
    if rows.is_empty() {
        return Err(ParseError::NoDataRows);
    }

    let table = RawTable::new(header_labels(&header_row), rows);
    info!(
        "Parsed {} rows x {} columns in {}ms",
        table.rows.len(),
        table.headers.len(),
        start_time.elapsed().as_millis()
    );
    Ok(table)
}

/// Parse and clean in one step.
pub fn load(bytes: &[u8], identity: &ColumnRef) -> Result<CleanedTable, ParseError> {
    Ok(parse(bytes)?.clean(identity))
}

pub fn load_file(path: PathBuf, identity: &ColumnRef) -> Result<CleanedTable, TRError> {
    let file_info = get_file_info(path)?;
    debug!(
        "Loading {:?} ({:?}, {} bytes)",
        file_info.path, file_info.file_type, file_info.file_size
    );
    let bytes = fs::read(&file_info.path)?;
    Ok(load(&bytes, identity)?)
}

/// Rows of the sheet addressed from A1, whatever cell the used range
/// starts at. Trailing rows that are entirely empty are dropped.
fn absolute_rows(range: &Range<Data>) -> Vec<Row> {
    let Some((row_start, col_start)) = range.start() else {
        return Vec::new();
    };
    let (row_start, col_start) = (row_start as usize, col_start as usize);
    let width = col_start + range.width();

    let mut rows: Vec<Row> = vec![vec![Cell::Empty; width]; row_start];
    for sheet_row in range.rows() {
        let mut row = vec![Cell::Empty; col_start];
        row.extend(sheet_row.iter().map(to_cell));
        rows.push(row);
    }
    while rows.last().is_some_and(|r| r.iter().all(Cell::is_empty)) {
        rows.pop();
    }
    trace!("Sheet spans {} rows x {} columns", rows.len(), width);
    rows
}

fn to_cell(data: &Data) -> Cell {
    match data {
        // Error cells (#DIV/0!, #N/A) carry no value
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(s) if s.is_empty() => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::Bool(b) => Cell::Number(if *b { 1.0 } else { 0.0 }),
        Data::DateTime(dt) => date_cell(dt),
        Data::DateTimeIso(s) => Cell::Text(s.strip_suffix("T00:00:00").unwrap_or(s).to_string()),
        Data::DurationIso(s) => Cell::Text(s.clone()),
    }
}

/// Dates render as `YYYY-MM-DD`, with the time only when it is set.
fn date_cell(dt: &ExcelDateTime) -> Cell {
    match dt.as_datetime() {
        Some(datetime) if !dt.is_duration() => {
            let text = if datetime.time().num_seconds_from_midnight() == 0 {
                datetime.format("%Y-%m-%d").to_string()
            } else {
                datetime.format("%Y-%m-%d %H:%M:%S").to_string()
            };
            Cell::Text(text)
        }
        _ => Cell::Text(dt.to_string()),
    }
}

/// Labels for the header row. Blank labels become `Unnamed: <idx>` and
/// repeated labels get a `.<n>` suffix.
fn header_labels(row: &[Cell]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    row.iter()
        .enumerate()
        .map(|(idx, cell)| {
            let base = match cell {
                Cell::Text(s) if !s.trim().is_empty() => s.trim().to_string(),
                Cell::Text(_) | Cell::Empty => format!("Unnamed: {idx}"),
                Cell::Number(n) => n.to_string(),
            };
            let count = seen.entry(base.clone()).or_insert(0);
            let label = if *count == 0 {
                base
            } else {
                format!("{base}.{count}")
            };
            *count += 1;
            label
        })
        .collect()
}
