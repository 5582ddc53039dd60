use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;
use std::time::Instant;

use tracing::{debug, info, trace, warn};

use crate::domain::{ColumnLayout, ColumnRef, ConversionError, SCORE_PLACEHOLDER, TRError};
use crate::loader;
use crate::table::{Cell, CleanedTable, FilteredView};

/// Distinct values of a column in first-seen order.
pub fn distinct_values(table: &CleanedTable, column: usize) -> Vec<Cell> {
    distinct_value_counts(table, column)
        .into_iter()
        .map(|(value, _)| value)
        .collect()
}

/// Distinct values of a column in first-seen order, with the number of rows
/// holding each.
pub fn distinct_value_counts(table: &CleanedTable, column: usize) -> Vec<(Cell, usize)> {
    let mut order: Vec<Cell> = Vec::new();
    let mut counts: HashMap<&Cell, usize> = HashMap::new();
    for ridx in 0..table.nrows() {
        let value = table.cell(ridx, column);
        let count = counts.entry(value).or_insert_with(|| {
            order.push(value.clone());
            0
        });
        *count += 1;
    }
    order
        .into_iter()
        .map(|value| {
            let count = counts.get(&value).copied().unwrap_or(0);
            (value, count)
        })
        .collect()
}

/// Values picked in the two filter selectors. An empty set does not
/// restrict its column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub departments: HashSet<Cell>,
    pub statuses: HashSet<Cell>,
}

impl Selection {
    pub fn new(
        departments: impl IntoIterator<Item = Cell>,
        statuses: impl IntoIterator<Item = Cell>,
    ) -> Self {
        Self {
            departments: departments.into_iter().collect(),
            statuses: statuses.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.departments.is_empty() && self.statuses.is_empty()
    }

    fn admits(set: &HashSet<Cell>, cell: &Cell) -> bool {
        set.is_empty() || set.contains(cell)
    }

    fn retain(&self, table: &CleanedTable, rows: &[usize], layout: &ColumnLayout) -> Vec<usize> {
        let department = layout.department.resolve(table.headers());
        let status = layout.status.resolve(table.headers());
        let empty = Cell::Empty;
        rows.iter()
            .copied()
            .filter(|&ridx| {
                let dep = department.map_or(&empty, |c| table.cell(ridx, c));
                let st = status.map_or(&empty, |c| table.cell(ridx, c));
                Self::admits(&self.departments, dep) && Self::admits(&self.statuses, st)
            })
            .collect()
    }
}

/// Rows of the table matching the selection, original order preserved.
pub fn apply_filters<'a>(
    table: &'a CleanedTable,
    selection: &Selection,
    layout: &ColumnLayout,
) -> FilteredView<'a> {
    table.view().apply_filters(selection, layout)
}

impl<'a> FilteredView<'a> {
    /// Narrow this view further with the same rules as [`apply_filters`].
    pub fn apply_filters(&self, selection: &Selection, layout: &ColumnLayout) -> FilteredView<'a> {
        if selection.is_empty() {
            return self.clone();
        }
        let start_time = Instant::now();
        let rows = selection.retain(self.table(), self.row_indices(), layout);
        trace!(
            "Filter kept {} of {} rows in {}ms",
            rows.len(),
            self.len(),
            start_time.elapsed().as_millis()
        );
        FilteredView::new(self.table(), rows)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AverageScore {
    Mean(f64),
    NoData,
}

impl fmt::Display for AverageScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AverageScore::Mean(mean) => write!(f, "{mean:.1}"),
            AverageScore::NoData => write!(f, "no data"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub assigned: usize,
    pub completed: usize,
    pub average_score: AverageScore,
}

impl Summary {
    pub fn empty() -> Self {
        Summary {
            assigned: 0,
            completed: 0,
            average_score: AverageScore::NoData,
        }
    }
}

pub fn compute_summary(view: &FilteredView<'_>, layout: &ColumnLayout) -> Summary {
    let headers = view.table().headers();
    let count_filled = |column: Option<usize>| {
        column.map_or(0, |c| view.column(c).filter(|cell| !cell.is_empty()).count())
    };

    let average_score = match layout.average_score.resolve(headers) {
        Some(c) => match mean_score(view.column(c)) {
            Ok(Some(mean)) => AverageScore::Mean(mean),
            Ok(None) => AverageScore::NoData,
            Err(e) => {
                debug!("Average score unavailable: {e}");
                AverageScore::NoData
            }
        },
        None => {
            debug!("No score column {:?} in table", layout.average_score);
            AverageScore::NoData
        }
    };

    Summary {
        assigned: count_filled(layout.assigned.resolve(headers)),
        completed: count_filled(layout.completed.resolve(headers)),
        average_score,
    }
}

fn is_placeholder(cell: &Cell) -> bool {
    match cell {
        Cell::Empty => true,
        Cell::Text(s) => s.trim() == SCORE_PLACEHOLDER,
        Cell::Number(_) => false,
    }
}

/// Mean of the scores that are not empty or a placeholder. `None` when no
/// score remains. A single unreadable score makes the mean unavailable.
pub fn mean_score<'a>(
    cells: impl Iterator<Item = &'a Cell>,
) -> Result<Option<f64>, ConversionError> {
    let mut sum = 0.0;
    let mut n = 0usize;
    for cell in cells.filter(|c| !is_placeholder(c)) {
        sum += cell.as_number()?;
        n += 1;
    }
    Ok((n > 0).then(|| sum / n as f64))
}

/// The loaded table and the current filter selection. Every derived value is
/// recomputed from the cleaned table; the file is parsed only on load.
#[derive(Debug, Default)]
pub struct ReportSession {
    layout: ColumnLayout,
    table: Option<CleanedTable>,
    selection: Selection,
    source: Option<String>,
}

impl ReportSession {
    pub fn new(layout: ColumnLayout) -> Self {
        Self {
            layout,
            ..Default::default()
        }
    }

    pub fn layout(&self) -> &ColumnLayout {
        &self.layout
    }

    pub fn table(&self) -> Option<&CleanedTable> {
        self.table.as_ref()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Name of the loaded file, if any.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn load_bytes(&mut self, name: &str, bytes: &[u8]) -> Result<(), TRError> {
        let result = loader::load(bytes, &self.layout.identity).map_err(TRError::from);
        self.replace(name, result)
    }

    pub fn load_file(&mut self, path: PathBuf) -> Result<(), TRError> {
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("???")
            .to_string();
        let result = loader::load_file(path, &self.layout.identity);
        self.replace(&name, result)
    }

    fn replace(&mut self, name: &str, result: Result<CleanedTable, TRError>) -> Result<(), TRError> {
        self.selection = Selection::default();
        match result {
            Ok(table) => {
                info!("Loaded {name}: {} rows", table.nrows());
                self.table = Some(table);
                self.source = Some(name.to_string());
                Ok(())
            }
            Err(e) => {
                warn!("Loading {name} failed: {e}");
                self.table = None;
                self.source = None;
                Err(e)
            }
        }
    }

    pub fn clear(&mut self) {
        self.table = None;
        self.source = None;
        self.selection = Selection::default();
    }

    fn options(&self, column: Option<usize>) -> Vec<(Cell, usize)> {
        match (&self.table, column) {
            (Some(table), Some(c)) => distinct_value_counts(table, c),
            _ => Vec::new(),
        }
    }

    fn resolve(&self, column: &ColumnRef) -> Option<usize> {
        column.resolve(self.table.as_ref()?.headers())
    }

    pub fn department_options(&self) -> Vec<(Cell, usize)> {
        self.options(self.resolve(&self.layout.department))
    }

    pub fn status_options(&self) -> Vec<(Cell, usize)> {
        self.options(self.resolve(&self.layout.status))
    }

    /// Label of the department column, for selector titles.
    pub fn department_label(&self) -> Option<&str> {
        let c = self.resolve(&self.layout.department)?;
        self.table.as_ref().map(|t| t.headers()[c].as_str())
    }

    pub fn status_label(&self) -> Option<&str> {
        let c = self.resolve(&self.layout.status)?;
        self.table.as_ref().map(|t| t.headers()[c].as_str())
    }

    pub fn toggle_department(&mut self, value: Cell) {
        Self::toggle(&mut self.selection.departments, value);
    }

    pub fn toggle_status(&mut self, value: Cell) {
        Self::toggle(&mut self.selection.statuses, value);
    }

    fn toggle(set: &mut HashSet<Cell>, value: Cell) {
        if !set.remove(&value) {
            set.insert(value);
        }
    }

    pub fn clear_filters(&mut self) {
        self.selection = Selection::default();
    }

    pub fn view(&self) -> Option<FilteredView<'_>> {
        self.table
            .as_ref()
            .map(|t| apply_filters(t, &self.selection, &self.layout))
    }

    pub fn summary(&self) -> Summary {
        self.view()
            .map_or_else(Summary::empty, |v| compute_summary(&v, &self.layout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::RawTable;

    const WIDTH: usize = 10;

    fn headers() -> Vec<String> {
        let mut h: Vec<String> = (0..WIDTH).map(|i| format!("c{i}")).collect();
        h[1] = "Name".into();
        h[3] = "Department".into();
        h[6] = "Assigned".into();
        h[7] = "Completed".into();
        h[8] = "Status".into();
        h[9] = "Average Score".into();
        h
    }

    fn row(name: &str, dep: &str, assigned: &str, completed: &str, status: &str, score: Cell) -> Vec<Cell> {
        let mut r = vec![Cell::Empty; WIDTH];
        r[1] = name.into();
        r[3] = dep.into();
        r[6] = assigned.into();
        r[7] = completed.into();
        r[8] = status.into();
        r[9] = score;
        r
    }

    fn table() -> CleanedTable {
        RawTable::new(
            headers(),
            vec![
                row("Ivanov", "HR", "2024-01-10", "2024-02-01", "Passed", Cell::Number(80.0)),
                row("Petrova", "IT", "2024-01-10", "", "In progress", Cell::from("–")),
                row("Sidorov", "HR", "2024-01-12", "", "Not started", Cell::Empty),
                row("Kuznetsova", "Sales", "2024-01-15", "2024-03-01", "Passed", Cell::from("90")),
                row("Smirnov", "IT", "", "", "Not assigned", Cell::Empty),
            ],
        )
        .clean(&ColumnRef::Index(1))
    }

    fn layout() -> ColumnLayout {
        ColumnLayout::default()
    }

    fn sel(deps: &[&str], statuses: &[&str]) -> Selection {
        Selection::new(
            deps.iter().map(|&d| Cell::from(d)),
            statuses.iter().map(|&s| Cell::from(s)),
        )
    }

    fn names(view: &FilteredView<'_>) -> Vec<String> {
        view.column(1).map(|c| c.to_string()).collect()
    }

    #[test]
    fn distinct_values_are_first_seen_and_unique() {
        let t = table();
        assert_eq!(
            distinct_values(&t, 3),
            vec![Cell::from("HR"), Cell::from("IT"), Cell::from("Sales")]
        );
        assert_eq!(
            distinct_value_counts(&t, 8),
            vec![
                (Cell::from("Passed"), 2),
                (Cell::from("In progress"), 1),
                (Cell::from("Not started"), 1),
                (Cell::from("Not assigned"), 1),
            ]
        );
    }

    #[test]
    fn distinct_values_include_empty_cells() {
        let t = table();
        let values = distinct_values(&t, 7);
        assert_eq!(values.iter().filter(|c| c.is_empty()).count(), 1);
        assert_eq!(values.len(), 3);
    }

    #[test]
    fn empty_selection_returns_the_table_unchanged() {
        let t = table();
        let view = apply_filters(&t, &Selection::default(), &layout());
        assert_eq!(view, t.view());
        assert_eq!(view.row_indices(), &[0, 1, 2, 3, 4]);
    }

    #[test]
    fn filters_intersect_across_columns() {
        let t = table();
        let view = apply_filters(&t, &sel(&["HR", "IT"], &["Passed", "In progress"]), &layout());
        assert_eq!(names(&view), vec!["Ivanov", "Petrova"]);

        let view = apply_filters(&t, &sel(&["Sales"], &[]), &layout());
        assert_eq!(names(&view), vec!["Kuznetsova"]);

        let view = apply_filters(&t, &sel(&[], &["Passed"]), &layout());
        assert_eq!(names(&view), vec!["Ivanov", "Kuznetsova"]);
    }

    #[test]
    fn no_match_is_an_empty_view() {
        let t = table();
        let view = apply_filters(&t, &sel(&["Finance"], &[]), &layout());
        assert!(view.is_empty());
        assert_eq!(compute_summary(&view, &layout()), Summary::empty());
    }

    #[test]
    fn restricting_an_open_column_never_adds_rows() {
        let t = table();
        for dep in ["HR", "IT", "Sales", "Finance"] {
            for statuses in [&[][..], &["Passed"][..]] {
                let open = apply_filters(&t, &sel(&[], statuses), &layout());
                let narrowed = apply_filters(&t, &sel(&[dep], statuses), &layout());
                assert!(narrowed.row_indices().iter().all(|r| open.row_indices().contains(r)));
                assert!(narrowed.len() <= open.len());
            }
        }
    }

    #[test]
    fn adding_a_value_to_a_restricted_column_widens_the_view() {
        let t = table();
        let hr = apply_filters(&t, &sel(&["HR"], &[]), &layout());
        let hr_it = apply_filters(&t, &sel(&["HR", "IT"], &[]), &layout());
        assert!(hr.row_indices().iter().all(|r| hr_it.row_indices().contains(r)));
        assert_eq!(names(&hr_it), vec!["Ivanov", "Petrova", "Sidorov", "Smirnov"]);
    }

    #[test]
    fn filtering_is_idempotent() {
        let t = table();
        for s in [sel(&["HR"], &[]), sel(&["IT", "Sales"], &["Passed"]), sel(&[], &[])] {
            let once = apply_filters(&t, &s, &layout());
            let twice = once.apply_filters(&s, &layout());
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn average_excludes_placeholders_and_blanks() {
        let cells = [Cell::Number(80.0), Cell::from("–"), Cell::Empty, Cell::from("90")];
        assert_eq!(mean_score(cells.iter()), Ok(Some(85.0)));

        let summary = compute_summary(&table().view(), &layout());
        assert_eq!(summary.average_score, AverageScore::Mean(85.0));
        assert_eq!(summary.average_score.to_string(), "85.0");
    }

    #[test]
    fn average_is_no_data_when_everything_is_excluded() {
        let cells = [Cell::from("–"), Cell::Empty, Cell::from("–")];
        assert_eq!(mean_score(cells.iter()), Ok(None));

        let t = table();
        let view = apply_filters(&t, &sel(&["IT"], &[]), &layout());
        let summary = compute_summary(&view, &layout());
        assert_eq!(summary.average_score, AverageScore::NoData);
        assert_eq!(summary.average_score.to_string(), "no data");
    }

    #[test]
    fn unreadable_score_degrades_only_the_average() {
        let cells = [Cell::Number(80.0), Cell::from("excellent")];
        assert_eq!(
            mean_score(cells.iter()),
            Err(ConversionError {
                value: "excellent".into()
            })
        );

        let mut rows = vec![row("A", "HR", "x", "x", "Passed", Cell::from("n/a"))];
        rows.push(row("B", "HR", "x", "", "Passed", Cell::Number(70.0)));
        let t = RawTable::new(headers(), rows).clean(&ColumnRef::Index(1));
        let summary = compute_summary(&t.view(), &layout());
        assert_eq!(summary.assigned, 2);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.average_score, AverageScore::NoData);
    }

    #[test]
    fn counts_filled_assignment_and_completion_cells() {
        let summary = compute_summary(&table().view(), &layout());
        assert_eq!(summary.assigned, 4);
        assert_eq!(summary.completed, 2);
    }

    #[test]
    fn missing_score_column_is_no_data() {
        let l = layout().average_score(ColumnRef::Label("Средний балл".into()));
        let summary = compute_summary(&table().view(), &l);
        assert_eq!(summary.average_score, AverageScore::NoData);
        assert_eq!(summary.assigned, 4);
    }

    #[test]
    fn mean_is_reported_to_one_decimal() {
        assert_eq!(AverageScore::Mean(81.24).to_string(), "81.2");
        assert_eq!(AverageScore::Mean(81.26).to_string(), "81.3");
        assert_eq!(AverageScore::Mean(90.0).to_string(), "90.0");
    }

    #[test]
    fn session_recomputes_from_the_loaded_table() {
        let mut session = ReportSession::new(layout());
        session.table = Some(table());
        assert_eq!(session.department_options().len(), 3);
        assert_eq!(session.department_label(), Some("Department"));
        assert_eq!(session.status_label(), Some("Status"));

        session.toggle_department(Cell::from("HR"));
        assert_eq!(session.view().map(|v| v.len()), Some(2));
        assert_eq!(session.summary().assigned, 2);

        session.toggle_department(Cell::from("HR"));
        assert!(session.selection().is_empty());
        assert_eq!(session.view().map(|v| v.len()), Some(5));

        session.toggle_status(Cell::from("Passed"));
        session.toggle_department(Cell::from("IT"));
        assert_eq!(session.view().map(|v| v.len()), Some(0));
        session.clear_filters();
        assert_eq!(session.view().map(|v| v.len()), Some(5));
    }

    #[test]
    fn failed_load_leaves_no_stale_data() {
        let mut session = ReportSession::new(layout());
        session.table = Some(table());
        session.source = Some("old.xlsx".into());
        session.toggle_department(Cell::from("HR"));

        let err = session.load_bytes("broken.xlsx", b"garbage").unwrap_err();
        assert!(matches!(err, TRError::Parse(_)));
        assert!(session.table().is_none());
        assert!(session.source().is_none());
        assert!(session.selection().is_empty());
        assert!(session.department_options().is_empty());
        assert!(session.view().is_none());
        assert_eq!(session.summary(), Summary::empty());
    }
}
