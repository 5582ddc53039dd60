use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Clear, List, ListItem, ListState, Paragraph, Row, Table, TableState},
};

use trainview::CAPTION;

use crate::message::CMDMode;
use crate::model::{Focus, SelectorView, UIData};

pub const TITLE_HEIGHT: u16 = 1;
pub const SELECTOR_HEIGHT: u16 = 8;
pub const METRICS_HEIGHT: u16 = 3;
pub const CAPTION_HEIGHT: u16 = 1;
pub const CMDLINE_HEIGHT: u16 = 1;
/// Table borders plus the header row.
pub const TABLE_HEADER_HEIGHT: u16 = 3;
pub const TABLE_BORDER_WIDTH: u16 = 2;
pub const COLUMN_WIDTH_MARGIN: usize = 1;

const SELECTED_MARKER: &str = "[x] ";
const UNSELECTED_MARKER: &str = "[ ] ";

fn pane_block(title: String, focused: bool) -> Block<'static> {
    let block = Block::bordered().title(Line::from(title).bold());
    if focused {
        block.border_style(Style::new().fg(Color::Yellow))
    } else {
        block.border_style(Style::new().fg(Color::DarkGray))
    }
}

fn draw_selector(frame: &mut Frame, area: Rect, selector: &SelectorView, focused: bool) {
    let nselected = selector.options.iter().filter(|o| o.selected).count();
    let title = if nselected == 0 {
        format!(" {} (all) ", selector.title)
    } else {
        format!(" {} ({} selected) ", selector.title, nselected)
    };

    let items: Vec<ListItem> = selector
        .options
        .iter()
        .map(|o| {
            let marker = if o.selected { SELECTED_MARKER } else { UNSELECTED_MARKER };
            let mut label = Span::raw(o.label.clone());
            if o.selected {
                label = label.bold();
            }
            ListItem::new(Line::from(vec![
                Span::raw(marker),
                label,
                Span::styled(format!(" {}", o.count), Style::new().fg(Color::DarkGray)),
            ]))
        })
        .collect();

    let highlight = if focused {
        Style::new().add_modifier(Modifier::REVERSED)
    } else {
        Style::new()
    };
    let list = List::new(items)
        .block(pane_block(title, focused))
        .highlight_style(highlight);

    let mut state = ListState::default();
    if !selector.options.is_empty() {
        state.select(Some(selector.cursor));
    }
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_table(frame: &mut Frame, area: Rect, uidata: &UIData) {
    let focused = uidata.focus == Focus::Table;
    let columns_info = match (uidata.visible_columns.first(), uidata.visible_columns.last()) {
        (Some(first), Some(last)) => format!(" cols {}-{}/{}", first + 1, last + 1, uidata.ncolumns),
        _ => String::new(),
    };
    let title = format!(
        " Records {}/{}{} ",
        uidata.nrows, uidata.total_rows, columns_info
    );

    let header = Row::new(uidata.table.iter().map(|c| c.name.clone()))
        .style(Style::new().add_modifier(Modifier::BOLD).fg(Color::Cyan));
    let nvisible = uidata.table.first().map_or(0, |c| c.data.len());
    let rows: Vec<Row> = (0..nvisible)
        .map(|ridx| Row::new(uidata.table.iter().map(|c| c.data[ridx].clone())))
        .collect();
    let widths: Vec<Constraint> = uidata
        .table
        .iter()
        .map(|c| Constraint::Length(c.width as u16))
        .collect();

    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(pane_block(title, focused))
        .row_highlight_style(if focused {
            Style::new().add_modifier(Modifier::REVERSED)
        } else {
            Style::new().add_modifier(Modifier::BOLD)
        });

    let mut state = TableState::default();
    if nvisible > 0 {
        state.select(Some(uidata.selected_row));
    }
    frame.render_stateful_widget(table, area, &mut state);
}

fn draw_metric(frame: &mut Frame, area: Rect, label: &str, value: String) {
    let paragraph = Paragraph::new(Line::from(value).bold())
        .centered()
        .block(Block::bordered().title(Line::from(format!(" {label} ")).centered()));
    frame.render_widget(paragraph, area);
}

fn draw_metrics(frame: &mut Frame, area: Rect, uidata: &UIData) {
    let [assigned, completed, average] =
        Layout::horizontal([Constraint::Ratio(1, 3); 3]).areas(area);
    let summary = &uidata.summary;
    draw_metric(frame, assigned, "Training assigned", summary.assigned.to_string());
    draw_metric(frame, completed, "Training completed", summary.completed.to_string());
    draw_metric(frame, average, "Average score", summary.average_score.to_string());
}

fn draw_cmdline(frame: &mut Frame, area: Rect, uidata: &UIData) {
    if uidata.active_cmdinput {
        let prompt = match uidata.cmd_mode {
            Some(CMDMode::OpenFile) | None => "Open: ",
        };
        let line = Line::from(vec![
            Span::styled(prompt, Style::new().fg(Color::Yellow)),
            Span::raw(uidata.cmdinput.input.clone()),
        ]);
        frame.render_widget(Paragraph::new(line), area);
        let x = area.x + (prompt.chars().count() + uidata.cmdinput.cursor_pos) as u16;
        frame.set_cursor_position((x.min(area.right().saturating_sub(1)), area.y));
    } else {
        let position = if uidata.nrows > 0 {
            format!("{}/{} ", uidata.abs_selected_row + 1, uidata.nrows)
        } else {
            String::new()
        };
        let [message_area, position_area] = Layout::horizontal([
            Constraint::Min(0),
            Constraint::Length(position.chars().count() as u16),
        ])
        .areas(area);
        frame.render_widget(Paragraph::new(uidata.status_message.clone()), message_area);
        frame.render_widget(Paragraph::new(position).right_aligned(), position_area);
    }
}

fn popup_area(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let [area] = Layout::vertical([Constraint::Percentage(percent_y)])
        .flex(Flex::Center)
        .areas(area);
    let [area] = Layout::horizontal([Constraint::Percentage(percent_x)])
        .flex(Flex::Center)
        .areas(area);
    area
}

pub fn draw(uidata: &UIData, frame: &mut Frame) {
    let [title_area, selector_area, table_area, metrics_area, caption_area, cmd_area] =
        Layout::vertical([
            Constraint::Length(TITLE_HEIGHT),
            Constraint::Length(SELECTOR_HEIGHT),
            Constraint::Min(TABLE_HEADER_HEIGHT),
            Constraint::Length(METRICS_HEIGHT),
            Constraint::Length(CAPTION_HEIGHT),
            Constraint::Length(CMDLINE_HEIGHT),
        ])
        .areas(frame.area());

    let title = Line::from(vec![
        " Training report ".bold(),
        Span::styled(uidata.name.clone(), Style::new().fg(Color::Yellow)),
    ]);
    frame.render_widget(Paragraph::new(title), title_area);

    let [departments_area, statuses_area] =
        Layout::horizontal([Constraint::Percentage(50); 2]).areas(selector_area);
    draw_selector(
        frame,
        departments_area,
        &uidata.departments,
        uidata.focus == Focus::Departments,
    );
    draw_selector(
        frame,
        statuses_area,
        &uidata.statuses,
        uidata.focus == Focus::Statuses,
    );

    draw_table(frame, table_area, uidata);
    draw_metrics(frame, metrics_area, uidata);
    frame.render_widget(
        Paragraph::new(CAPTION).style(Style::new().fg(Color::DarkGray).add_modifier(Modifier::ITALIC)),
        caption_area,
    );
    draw_cmdline(frame, cmd_area, uidata);

    if uidata.show_popup {
        let area = popup_area(frame.area(), 60, 70);
        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(uidata.popup_message.clone())
                .block(Block::bordered().title(Line::from(" Help ").bold().centered())),
            area,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ColumnView, OptionView};
    use ratatui::{Terminal, backend::TestBackend};
    use trainview::{AverageScore, Summary};

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        buffer
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect::<Vec<&str>>()
            .join("")
    }

    #[test]
    fn renders_filters_table_metrics_and_caption() {
        let mut uidata = UIData::empty();
        uidata.name = "report.xlsx".into();
        uidata.departments = SelectorView {
            title: "Department".into(),
            options: vec![OptionView {
                label: "HR".into(),
                count: 2,
                selected: true,
            }],
            cursor: 0,
        };
        uidata.table = vec![ColumnView {
            name: "Full name".into(),
            width: 12,
            data: vec!["Ivanov".into()],
        }];
        uidata.visible_columns = vec![0];
        uidata.ncolumns = 1;
        uidata.nrows = 1;
        uidata.total_rows = 3;
        uidata.summary = Summary {
            assigned: 1,
            completed: 0,
            average_score: AverageScore::NoData,
        };

        let mut terminal = Terminal::new(TestBackend::new(140, 30)).unwrap();
        terminal.draw(|f| draw(&uidata, f)).unwrap();
        let text = buffer_text(&terminal);
        assert!(text.contains("report.xlsx"));
        assert!(text.contains("[x] HR"));
        assert!(text.contains("Ivanov"));
        assert!(text.contains("Records 1/3"));
        assert!(text.contains("no data"));
        assert!(text.contains("Modules marked with"));
    }
}
