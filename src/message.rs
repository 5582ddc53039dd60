use ratatui::crossterm::event::KeyEvent;

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    FocusNext,
    FocusPrevious,
    Toggle,
    ClearFilters,
    OpenFile,
    CopyRow,
    Help,
    Exit,
    Resize(usize, usize),
    RawKey(KeyEvent),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CMDMode {
    OpenFile,
}

pub const HELP_TEXT: &str = "\
q          quit
Tab        next pane (departments, status, table)
Shift+Tab  previous pane
j/k ↑/↓    move
h/l ←/→    scroll table columns
PgUp/PgDn  page
g/G        first/last
Space      toggle the highlighted filter value
c          clear all filters
o          open another file
y          copy the current row
?          this help
Esc        close";
