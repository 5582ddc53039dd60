use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, error, info, trace};

use trainview::loader::expand_path;
use trainview::{Cell, ReportConfig, ReportSession, Summary, TRError, compute_summary};

use crate::inputter::{InputResult, Inputter};
use crate::message::{CMDMode, HELP_TEXT, Message};
use crate::ui::{
    CAPTION_HEIGHT, CMDLINE_HEIGHT, COLUMN_WIDTH_MARGIN, METRICS_HEIGHT, SELECTOR_HEIGHT,
    TABLE_BORDER_WIDTH, TABLE_HEADER_HEIGHT, TITLE_HEIGHT,
};

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    REPORT,
    POPUP,
    CMDINPUT,
}

/// Pane receiving the movement keys.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Focus {
    #[default]
    Departments,
    Statuses,
    Table,
}

impl Focus {
    fn next(self) -> Self {
        match self {
            Focus::Departments => Focus::Statuses,
            Focus::Statuses => Focus::Table,
            Focus::Table => Focus::Departments,
        }
    }

    fn previous(self) -> Self {
        match self {
            Focus::Departments => Focus::Table,
            Focus::Statuses => Focus::Departments,
            Focus::Table => Focus::Statuses,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ColumnView {
    pub name: String,
    pub width: usize,
    pub data: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct OptionView {
    pub label: String,
    pub count: usize,
    pub selected: bool,
}

#[derive(Clone, Debug, Default)]
pub struct SelectorView {
    pub title: String,
    pub options: Vec<OptionView>,
    pub cursor: usize,
}

pub struct UIData {
    pub name: String,
    pub table: Vec<ColumnView>,
    pub nrows: usize,      // Rows in the filtered view
    pub total_rows: usize, // Rows in the cleaned table
    pub visible_columns: Vec<usize>,
    pub ncolumns: usize,
    pub selected_row: usize,
    pub abs_selected_row: usize,
    pub departments: SelectorView,
    pub statuses: SelectorView,
    pub focus: Focus,
    pub summary: Summary,
    pub show_popup: bool,
    pub popup_message: String,
    pub cmdinput: InputResult,
    pub cmd_mode: Option<CMDMode>,
    pub active_cmdinput: bool,
    pub status_message: String,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            name: String::new(),
            table: Vec::new(),
            nrows: 0,
            total_rows: 0,
            visible_columns: Vec::new(),
            ncolumns: 0,
            selected_row: 0,
            abs_selected_row: 0,
            departments: SelectorView::default(),
            statuses: SelectorView::default(),
            focus: Focus::default(),
            summary: Summary::empty(),
            show_popup: false,
            popup_message: String::new(),
            cmdinput: InputResult::default(),
            cmd_mode: None,
            active_cmdinput: false,
            status_message: String::new(),
        }
    }
}

#[derive(Default, Clone, Debug)]
pub struct UILayout {
    pub width: usize,
    pub height: usize,
    pub table_width: usize,
    pub table_height: usize,
}

impl UILayout {
    pub fn from_values(ui_width: usize, ui_height: usize) -> Self {
        let chrome = TITLE_HEIGHT
            + SELECTOR_HEIGHT
            + METRICS_HEIGHT
            + CAPTION_HEIGHT
            + CMDLINE_HEIGHT
            + TABLE_HEADER_HEIGHT;
        let layout = UILayout {
            width: ui_width,
            height: ui_height,
            table_width: ui_width.saturating_sub(TABLE_BORDER_WIDTH as usize),
            table_height: ui_height.saturating_sub(chrome as usize),
        };
        trace!("Build UILayout: {:?}", layout);
        layout
    }
}

pub struct Model {
    config: ReportConfig,
    session: ReportSession,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    focus: Focus,
    last_path: Option<PathBuf>,
    view_rows: Vec<usize>, // Cleaned table rows passing the current filters
    summary: Summary,
    department_options: Vec<(Cell, usize)>,
    status_options: Vec<(Cell, usize)>,
    department_cursor: usize,
    status_cursor: usize,
    column_widths: Vec<usize>,
    visible_columns: Vec<usize>,
    table_columns: Vec<ColumnView>,
    cursor_row: usize, // Index into view_rows
    offset_row: usize,
    offset_column: usize,
    uilayout: UILayout,
    uidata: UIData,
    clipboard: Option<Clipboard>,
    input: Inputter,
    cmd_mode: Option<CMDMode>,
    last_input: InputResult,
    active_cmdinput: bool,
    status_message: String,
}

impl Model {
    pub fn init(config: &ReportConfig, ui_width: usize, ui_height: usize) -> Self {
        let mut model = Self {
            config: config.clone(),
            session: ReportSession::new(config.layout.clone()),
            status: Status::READY,
            modus: Modus::REPORT,
            previous_modus: Modus::REPORT,
            focus: Focus::default(),
            last_path: None,
            view_rows: Vec::new(),
            summary: Summary::empty(),
            department_options: Vec::new(),
            status_options: Vec::new(),
            department_cursor: 0,
            status_cursor: 0,
            column_widths: Vec::new(),
            visible_columns: Vec::new(),
            table_columns: Vec::new(),
            cursor_row: 0,
            offset_row: 0,
            offset_column: 0,
            uilayout: UILayout::from_values(ui_width, ui_height),
            uidata: UIData::empty(),
            clipboard: None,
            input: Inputter::default(),
            cmd_mode: None,
            last_input: InputResult::default(),
            active_cmdinput: false,
            status_message: "Press o to open a training report, ? for help".to_string(),
        };
        model.update_table_data();
        model
    }

    pub fn load_data_file(&mut self, path: PathBuf) -> Result<(), TRError> {
        let start_time = Instant::now();
        self.last_path = Some(path.clone());
        let result = self.session.load_file(path);
        self.finish_load(result, start_time)
    }

    /// Load a workbook that is already in memory (e.g. read from stdin).
    pub fn load_data_bytes(&mut self, name: &str, bytes: &[u8]) -> Result<(), TRError> {
        let start_time = Instant::now();
        let result = self.session.load_bytes(name, bytes);
        self.finish_load(result, start_time)
    }

    fn finish_load(
        &mut self,
        result: Result<(), TRError>,
        start_time: Instant,
    ) -> Result<(), TRError> {
        self.reset_for_new_table();
        match result {
            Ok(()) => {
                let duration = start_time.elapsed().as_millis();
                info!("Loading data took {duration}ms ...");
                self.set_status_message(format!(
                    "Loaded {} records in {}ms",
                    self.view_rows.len(),
                    duration
                ));
                Ok(())
            }
            Err(e) => {
                error!("Loading failed: {e}");
                self.set_status_message(format!("No valid data found: {e}"));
                Err(e)
            }
        }
    }

    fn reset_for_new_table(&mut self) {
        self.department_options = self.session.department_options();
        self.status_options = self.session.status_options();
        self.department_cursor = 0;
        self.status_cursor = 0;
        self.cursor_row = 0;
        self.offset_row = 0;
        self.offset_column = 0;
        self.column_widths = match self.session.table() {
            Some(table) => (0..table.ncolumns())
                .map(|cidx| {
                    let content = table
                        .rows()
                        .iter()
                        .map(|r| r[cidx].to_string().chars().count())
                        .max()
                        .unwrap_or(0);
                    let width = std::cmp::max(table.headers()[cidx].chars().count(), content)
                        + COLUMN_WIDTH_MARGIN;
                    std::cmp::min(width, self.config.max_column_width)
                })
                .collect(),
            None => Vec::new(),
        };
        debug!("Column widths {:?}", self.column_widths);
        self.refresh_report();
    }

    /// Recompute the filtered rows and the metrics from the cleaned table.
    fn refresh_report(&mut self) {
        let (rows, summary) = match self.session.view() {
            Some(view) => {
                let summary = compute_summary(&view, self.session.layout());
                (view.row_indices().to_vec(), summary)
            }
            None => (Vec::new(), Summary::empty()),
        };
        trace!("Report has {} rows, {:?}", rows.len(), summary);
        self.view_rows = rows;
        self.summary = summary;
        self.cursor_row = 0;
        self.offset_row = 0;
        self.update_table_data();
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.uidata.status_message = self.status_message.clone();
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    pub fn raw_keyevents(&self) -> bool {
        self.active_cmdinput
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    fn get_visible_name(name: &str, width: usize) -> String {
        if width < 3 {
            return String::new();
        }
        if name.chars().count() > width {
            let mut reduced: String = name.chars().take(width - 3).collect();
            reduced.push_str("...");
            reduced
        } else {
            name.to_string()
        }
    }

    fn update_table_data(&mut self) {
        let table_width = self.uilayout.table_width;
        let (visible_columns, columns) = match self.session.table() {
            None => (Vec::new(), Vec::new()),
            Some(table) => {
                let rbegin = self.offset_row;
                let rend = std::cmp::min(rbegin + self.uilayout.table_height, self.view_rows.len());

                // Columns that fit, the last one possibly cut
                let mut visible: Vec<(usize, usize)> = Vec::new();
                let mut visible_width = 0;
                for (cidx, &width) in self.column_widths.iter().enumerate().skip(self.offset_column)
                {
                    if visible_width + width + 1 <= table_width {
                        visible.push((cidx, width));
                        visible_width += width + 1;
                    } else {
                        if visible_width < table_width {
                            visible.push((cidx, table_width - visible_width));
                        }
                        break;
                    }
                }

                let columns: Vec<ColumnView> = visible
                    .iter()
                    .map(|&(cidx, width)| ColumnView {
                        name: Self::get_visible_name(&table.headers()[cidx], width),
                        width,
                        data: self.view_rows[rbegin..rend]
                            .iter()
                            .map(|&ridx| table.cell(ridx, cidx).to_string())
                            .collect(),
                    })
                    .collect();
                (visible.into_iter().map(|(c, _)| c).collect(), columns)
            }
        };
        self.visible_columns = visible_columns;
        self.table_columns = columns;
        self.update_uidata();
    }

    fn selector_view(
        title: String,
        options: &[(Cell, usize)],
        selected: &std::collections::HashSet<Cell>,
        cursor: usize,
    ) -> SelectorView {
        SelectorView {
            title,
            options: options
                .iter()
                .map(|(value, count)| OptionView {
                    label: value.to_string(),
                    count: *count,
                    selected: selected.contains(value),
                })
                .collect(),
            cursor,
        }
    }

    fn update_uidata(&mut self) {
        let selection = self.session.selection();
        let departments = Self::selector_view(
            self.session.department_label().unwrap_or("Department").to_string(),
            &self.department_options,
            &selection.departments,
            self.department_cursor,
        );
        let statuses = Self::selector_view(
            self.session.status_label().unwrap_or("Status").to_string(),
            &self.status_options,
            &selection.statuses,
            self.status_cursor,
        );
        let popup = (self.modus == Modus::POPUP).then(|| HELP_TEXT.to_string());

        self.uidata = UIData {
            name: self.session.source().unwrap_or("no file").to_string(),
            table: self.table_columns.clone(),
            nrows: self.view_rows.len(),
            total_rows: self.session.table().map_or(0, |t| t.nrows()),
            visible_columns: self.visible_columns.clone(),
            ncolumns: self.column_widths.len(),
            selected_row: self.cursor_row.saturating_sub(self.offset_row),
            abs_selected_row: self.cursor_row,
            departments,
            statuses,
            focus: self.focus,
            summary: self.summary,
            show_popup: popup.is_some(),
            popup_message: popup.unwrap_or_default(),
            cmdinput: self.last_input.clone(),
            cmd_mode: self.cmd_mode,
            active_cmdinput: self.active_cmdinput,
            status_message: self.status_message.clone(),
        };
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.uilayout.width, width, self.uilayout.height, height
        );
        self.uilayout = UILayout::from_values(width, height);
        self.scroll_to_cursor();
        self.update_table_data();
    }

    pub fn update(&mut self, message: Option<Message>) -> Result<(), TRError> {
        let Some(msg) = message else {
            return Ok(());
        };
        match self.modus {
            Modus::REPORT => match msg {
                Message::Quit => self.quit(),
                Message::MoveDown => self.move_down(1),
                Message::MoveUp => self.move_up(1),
                Message::MovePageDown => self.move_down(self.page_size()),
                Message::MovePageUp => self.move_up(self.page_size()),
                Message::MoveBeginning => self.move_up(usize::MAX),
                Message::MoveEnd => self.move_down(usize::MAX),
                Message::MoveLeft => self.scroll_columns(false),
                Message::MoveRight => self.scroll_columns(true),
                Message::FocusNext => self.set_focus(self.focus.next()),
                Message::FocusPrevious => self.set_focus(self.focus.previous()),
                Message::Toggle => self.toggle_option(),
                Message::ClearFilters => self.clear_filters(),
                Message::OpenFile => self.enter_cmd_mode(CMDMode::OpenFile),
                Message::CopyRow => self.copy_table_row(),
                Message::Help => self.show_help(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
            Modus::POPUP => match msg {
                Message::Quit => self.quit(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                Message::Exit | Message::Help => self.exit_popup(),
                _ => (),
            },
            Modus::CMDINPUT => match msg {
                Message::RawKey(key) => self.raw_input(key),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
        }
        Ok(())
    }

    // -------------------- Control handling functions ---------------------- //

    fn page_size(&self) -> usize {
        std::cmp::max(self.uilayout.table_height, 1)
    }

    fn set_focus(&mut self, focus: Focus) {
        self.focus = focus;
        self.update_uidata();
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
        self.update_uidata();
    }

    fn exit_popup(&mut self) {
        trace!("Close popup ...");
        self.modus = self.previous_modus;
        self.previous_modus = Modus::POPUP;
        self.update_uidata();
    }

    fn move_down(&mut self, size: usize) {
        match self.focus {
            Focus::Departments => {
                self.department_cursor =
                    Self::step_down(self.department_cursor, size, self.department_options.len());
                self.update_uidata();
            }
            Focus::Statuses => {
                self.status_cursor =
                    Self::step_down(self.status_cursor, size, self.status_options.len());
                self.update_uidata();
            }
            Focus::Table => {
                self.cursor_row = Self::step_down(self.cursor_row, size, self.view_rows.len());
                self.scroll_to_cursor();
                self.update_table_data();
            }
        }
    }

    fn move_up(&mut self, size: usize) {
        match self.focus {
            Focus::Departments => {
                self.department_cursor = self.department_cursor.saturating_sub(size);
                self.update_uidata();
            }
            Focus::Statuses => {
                self.status_cursor = self.status_cursor.saturating_sub(size);
                self.update_uidata();
            }
            Focus::Table => {
                self.cursor_row = self.cursor_row.saturating_sub(size);
                self.scroll_to_cursor();
                self.update_table_data();
            }
        }
    }

    fn step_down(cursor: usize, size: usize, len: usize) -> usize {
        std::cmp::min(cursor.saturating_add(size), len.saturating_sub(1))
    }

    /// Shift the row offset so the cursor stays inside the window.
    fn scroll_to_cursor(&mut self) {
        let height = self.page_size();
        if self.cursor_row < self.offset_row {
            self.offset_row = self.cursor_row;
        } else if self.cursor_row >= self.offset_row + height {
            self.offset_row = self.cursor_row + 1 - height;
        }
    }

    fn scroll_columns(&mut self, right: bool) {
        if self.focus != Focus::Table {
            return;
        }
        if right {
            // Stop once the last column is the first visible one
            if self.offset_column + 1 < self.column_widths.len() {
                self.offset_column += 1;
            }
        } else {
            self.offset_column = self.offset_column.saturating_sub(1);
        }
        self.update_table_data();
    }

    fn toggle_option(&mut self) {
        match self.focus {
            Focus::Departments => {
                if let Some((value, _)) = self.department_options.get(self.department_cursor) {
                    debug!("Toggle department {value}");
                    self.session.toggle_department(value.clone());
                }
            }
            Focus::Statuses => {
                if let Some((value, _)) = self.status_options.get(self.status_cursor) {
                    debug!("Toggle status {value}");
                    self.session.toggle_status(value.clone());
                }
            }
            Focus::Table => return,
        }
        self.refresh_report();
        self.set_status_message(format!("{} matching records", self.view_rows.len()));
    }

    fn clear_filters(&mut self) {
        self.session.clear_filters();
        self.refresh_report();
        self.set_status_message("Filters cleared");
    }

    fn raw_input(&mut self, key: KeyEvent) {
        if self.active_cmdinput {
            self.last_input = self.input.read(key);
            if self.last_input.finished {
                self.handle_cmd_input();
            }
            self.update_uidata();
        }
    }

    fn enter_cmd_mode(&mut self, mode: CMDMode) {
        trace!("Entering command mode ...");
        self.previous_modus = self.modus;
        self.modus = Modus::CMDINPUT;
        self.cmd_mode = Some(mode);

        self.active_cmdinput = true;
        self.input.clear();
        if let Some(path) = &self.last_path {
            self.input.set(&path.to_string_lossy());
        }
        self.last_input = self.input.get();
        self.update_uidata();
    }

    fn handle_cmd_input(&mut self) {
        trace!("Handle cmd input {}", self.last_input.input);

        self.active_cmdinput = false;
        self.modus = self.previous_modus;
        self.previous_modus = Modus::CMDINPUT;

        let cmd_input = self.last_input.input.clone();
        let canceled = self.last_input.canceled;
        self.last_input = InputResult::default();
        match self.cmd_mode.take() {
            Some(CMDMode::OpenFile) if canceled => {}
            Some(CMDMode::OpenFile) if cmd_input.trim().is_empty() => {
                self.set_status_message("No file given");
            }
            Some(CMDMode::OpenFile) => {
                if let Err(e) = self.load_data_file(expand_path(&cmd_input)) {
                    debug!("Open from prompt failed, reported in the status line: {e}");
                }
            }
            None => {
                info!("Cmd mode is none!")
            }
        }
    }

    fn wrap_cell_content(c: &str) -> String {
        let needs_escaping = c.contains('"');
        let needs_wrapping = c.chars().any(|c| c == ' ' || c == '\t' || c == ',');
        let mut out = String::from(c);

        if needs_escaping {
            out = out.replace('"', "\"\"");
        }
        if needs_wrapping || needs_escaping {
            out = format!("\"{out}\"");
        }
        out
    }

    fn current_row_as_csv(&self) -> Option<String> {
        let table = self.session.table()?;
        let ridx = *self.view_rows.get(self.cursor_row)?;
        let content = table.rows()[ridx]
            .iter()
            .map(|c| match c {
                Cell::Empty => String::new(),
                other => Self::wrap_cell_content(&other.to_string()),
            })
            .collect::<Vec<String>>();
        Some(content.join(","))
    }

    fn copy_table_row(&mut self) {
        let Some(row_content) = self.current_row_as_csv() else {
            return;
        };
        if self.clipboard.is_none() {
            self.clipboard = Clipboard::new()
                .map_err(|e| debug!("No clipboard available: {e:?}"))
                .ok();
        }
        let outcome = self.clipboard.as_mut().map(|c| c.set_text(row_content));
        self.report_copy(outcome);
    }

    fn report_copy(&mut self, outcome: Option<Result<(), arboard::Error>>) {
        match outcome {
            Some(Ok(_)) => self.set_status_message("Copied row to clipboard"),
            Some(Err(e)) => {
                debug!("Error copying to clipboard: {e:?}");
                self.set_status_message(format!("Copy failed: {e}"));
            }
            None => self.set_status_message("Clipboard not available"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::{KeyCode, KeyModifiers};
    use rust_xlsxwriter::Workbook;
    use trainview::AverageScore;

    enum V {
        S(&'static str),
        N(f64),
        E,
    }
    use V::{E, N, S};

    fn workbook(rows: &[Vec<V>]) -> Vec<u8> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.write_string(0, 0, "Training report").unwrap();
        worksheet.write_string(1, 0, "Period: Q1").unwrap();
        let header = [
            "№", "Full name", "Position", "Department", "Module", "Attempts", "Assigned",
            "Completed", "Average Score", "Status", "Comment",
        ];
        for (c, h) in header.iter().enumerate() {
            worksheet.write_string(3, c as u16, *h).unwrap();
        }
        for (r, row) in rows.iter().enumerate() {
            for (c, v) in row.iter().enumerate() {
                let (r, c) = (r as u32 + 4, c as u16);
                match v {
                    S(s) => {
                        worksheet.write_string(r, c, *s).unwrap();
                    }
                    N(n) => {
                        worksheet.write_number(r, c, *n).unwrap();
                    }
                    E => {}
                }
            }
        }
        workbook.save_to_buffer().unwrap()
    }

    fn record(
        name: V,
        dep: &'static str,
        assigned: bool,
        done: bool,
        score: V,
        status: &'static str,
    ) -> Vec<V> {
        vec![
            N(1.0),
            name,
            S("Engineer"),
            S(dep),
            S("Safety"),
            N(1.0),
            if assigned { S("2024-01-10") } else { E },
            if done { S("2024-02-01") } else { E },
            score,
            S(status),
        ]
    }

    fn loaded_model() -> Model {
        let bytes = workbook(&[
            record(S("Ivanov"), "HR", true, true, N(80.0), "Passed"),
            record(S("Petrova"), "IT", true, false, S("–"), "In progress"),
            record(E, "IT", true, true, N(10.0), "Passed"),
            record(S("Sidorov"), "HR", true, false, E, "Not started"),
            record(S("Kuznetsova"), "Sales", true, true, S("90"), "Passed"),
            record(S("Smirnov"), "IT", false, false, E, "Not assigned"),
        ]);
        let mut model = Model::init(&ReportConfig::default(), 120, 40);
        model.load_data_bytes("report.xlsx", &bytes).unwrap();
        model
    }

    fn send(model: &mut Model, msg: Message) {
        model.update(Some(msg)).unwrap();
    }

    #[test]
    fn loading_fills_selectors_table_and_metrics() {
        let model = loaded_model();
        let ui = model.get_uidata();
        assert_eq!(ui.name, "report.xlsx");
        assert_eq!(ui.nrows, 5);
        assert_eq!(ui.total_rows, 5);
        assert_eq!(ui.departments.title, "Department");
        let deps: Vec<&str> = ui.departments.options.iter().map(|o| o.label.as_str()).collect();
        assert_eq!(deps, vec!["HR", "IT", "Sales"]);
        assert_eq!(ui.statuses.title, "Status");
        assert_eq!(ui.summary.assigned, 4);
        assert_eq!(ui.summary.completed, 2);
        assert_eq!(ui.summary.average_score, AverageScore::Mean(85.0));
        assert_eq!(ui.table[1].name, "Full name");
        assert_eq!(ui.table[1].data[0], "Ivanov");
    }

    #[test]
    fn toggling_a_department_filters_the_report() {
        let mut model = loaded_model();
        send(&mut model, Message::MoveDown);
        send(&mut model, Message::Toggle);
        let ui = model.get_uidata();
        assert!(ui.departments.options[1].selected);
        assert_eq!(ui.nrows, 2);
        assert_eq!(ui.table[1].data, vec!["Petrova", "Smirnov"]);
        assert_eq!(ui.summary.average_score, AverageScore::NoData);

        send(&mut model, Message::ClearFilters);
        assert_eq!(model.get_uidata().nrows, 5);
    }

    #[test]
    fn status_selector_combines_with_departments() {
        let mut model = loaded_model();
        send(&mut model, Message::Toggle); // HR
        send(&mut model, Message::FocusNext);
        send(&mut model, Message::Toggle); // Passed
        let ui = model.get_uidata();
        assert_eq!(ui.focus, Focus::Statuses);
        assert_eq!(ui.table[1].data, vec!["Ivanov"]);
        assert_eq!(ui.summary.average_score, AverageScore::Mean(80.0));
    }

    #[test]
    fn table_cursor_stays_in_range() {
        let mut model = loaded_model();
        send(&mut model, Message::FocusPrevious);
        assert_eq!(model.get_uidata().focus, Focus::Table);
        send(&mut model, Message::MoveEnd);
        assert_eq!(model.get_uidata().abs_selected_row, 4);
        send(&mut model, Message::MoveDown);
        assert_eq!(model.get_uidata().abs_selected_row, 4);
        send(&mut model, Message::MoveBeginning);
        assert_eq!(model.get_uidata().abs_selected_row, 0);
        assert_eq!(model.current_row_as_csv().unwrap().split(',').nth(1), Some("Ivanov"));
    }

    #[test]
    fn failed_open_clears_the_report() {
        let mut model = loaded_model();
        send(&mut model, Message::OpenFile);
        assert!(model.raw_keyevents());
        for c in "/no/such/file.xlsx".chars() {
            send(&mut model, Message::RawKey(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)));
        }
        send(&mut model, Message::RawKey(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)));
        assert!(!model.raw_keyevents());
        let ui = model.get_uidata();
        assert!(ui.status_message.starts_with("No valid data found"));
        assert_eq!(ui.nrows, 0);
        assert!(ui.table.is_empty());
        assert!(ui.departments.options.is_empty());
        assert_eq!(ui.summary, Summary::empty());
    }

    #[test]
    fn canceled_open_keeps_the_report() {
        let mut model = loaded_model();
        send(&mut model, Message::OpenFile);
        send(&mut model, Message::RawKey(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)));
        assert_eq!(model.get_uidata().nrows, 5);
    }

    #[test]
    fn help_popup_opens_and_closes() {
        let mut model = loaded_model();
        send(&mut model, Message::Help);
        assert!(model.get_uidata().show_popup);
        send(&mut model, Message::MoveDown);
        send(&mut model, Message::Exit);
        assert!(!model.get_uidata().show_popup);
        send(&mut model, Message::Quit);
        assert_eq!(model.status, Status::QUITTING);
    }

    #[test]
    fn long_names_are_cut_on_char_boundaries() {
        assert_eq!(Model::get_visible_name("Подразделение", 8), "Подра...");
        assert_eq!(Model::get_visible_name("Отдел", 8), "Отдел");
        assert_eq!(Model::get_visible_name("Отдел", 2), "");
    }

    #[test]
    fn clipboard_outcome_is_shown_in_the_status_line() {
        let mut model = loaded_model();
        model.report_copy(Some(Err(arboard::Error::ContentNotAvailable)));
        assert!(model.get_uidata().status_message.starts_with("Copy failed: "));
        model.report_copy(None);
        assert_eq!(model.get_uidata().status_message, "Clipboard not available");
        model.report_copy(Some(Ok(())));
        assert_eq!(model.get_uidata().status_message, "Copied row to clipboard");
    }

    #[test]
    fn csv_cells_are_quoted_when_needed() {
        assert_eq!(Model::wrap_cell_content("plain"), "plain");
        assert_eq!(Model::wrap_cell_content("a, b"), "\"a, b\"");
        assert_eq!(Model::wrap_cell_content("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
