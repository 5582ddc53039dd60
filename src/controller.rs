use std::time::Duration;
use tracing::trace;

use ratatui::crossterm::event::{self, Event, KeyCode, KeyModifiers};
use trainview::{ReportConfig, TRError};

use crate::message::Message;
use crate::model::Model;

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &ReportConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, TRError> {
        if !event::poll(Duration::from_millis(self.event_poll_time))? {
            return Ok(None);
        }
        let message = match event::read()? {
            Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                if model.raw_keyevents() {
                    Some(Message::RawKey(key))
                } else {
                    Self::handle_key(key)
                }
            }
            Event::Resize(width, height) => Some(Message::Resize(width as usize, height as usize)),
            _ => None,
        };
        Ok(message)
    }

    fn handle_key(key: event::KeyEvent) -> Option<Message> {
        let message = match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Message::Quit),
            (KeyCode::Char('q'), _) => Some(Message::Quit),
            (KeyCode::Tab, _) => Some(Message::FocusNext),
            (KeyCode::BackTab, _) => Some(Message::FocusPrevious),
            (KeyCode::Char('j'), _) | (KeyCode::Down, _) => Some(Message::MoveDown),
            (KeyCode::Char('k'), _) | (KeyCode::Up, _) => Some(Message::MoveUp),
            (KeyCode::Char('h'), _) | (KeyCode::Left, _) => Some(Message::MoveLeft),
            (KeyCode::Char('l'), _) | (KeyCode::Right, _) => Some(Message::MoveRight),
            (KeyCode::PageUp, _) => Some(Message::MovePageUp),
            (KeyCode::PageDown, _) => Some(Message::MovePageDown),
            (KeyCode::Char('g'), _) | (KeyCode::Home, _) => Some(Message::MoveBeginning),
            (KeyCode::Char('G'), _) | (KeyCode::End, _) => Some(Message::MoveEnd),
            (KeyCode::Char(' '), _) | (KeyCode::Enter, _) => Some(Message::Toggle),
            (KeyCode::Char('c'), _) => Some(Message::ClearFilters),
            (KeyCode::Char('o'), _) => Some(Message::OpenFile),
            (KeyCode::Char('y'), _) => Some(Message::CopyRow),
            (KeyCode::Char('?'), _) => Some(Message::Help),
            (KeyCode::Esc, _) => Some(Message::Exit),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}
