use std::time::Duration;
use tracing::trace;

use ratatui::crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};

use crate::dataset::Column;
use crate::domain::{Config, Message, TableError};
use crate::model::Model;

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &Config) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, TableError> {
        if !event::poll(Duration::from_millis(self.event_poll_time))? {
            return Ok(None);
        }
        Ok(self.map_event(model, event::read()?))
    }

    fn map_event(&self, model: &Model, event: Event) -> Option<Message> {
        match event {
            Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                if model.raw_keyevents() {
                    Some(Message::RawKey(key))
                } else {
                    self.handle_key(key)
                }
            }
            Event::Mouse(mouse) => self.handle_mouse(model, mouse),
            Event::Resize(width, height) => {
                Some(Message::Resize(width as usize, height as usize))
            }
            _ => None,
        }
    }

    fn handle_key(&self, key: KeyEvent) -> Option<Message> {
        let message = match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Message::Quit),
            (KeyCode::Char('q'), _) => Some(Message::Quit),
            (KeyCode::Esc, _) => Some(Message::Exit),
            (KeyCode::Enter, _) => Some(Message::Enter),
            (KeyCode::Char('j') | KeyCode::Down, _) => Some(Message::MoveDown),
            (KeyCode::Char('k') | KeyCode::Up, _) => Some(Message::MoveUp),
            (KeyCode::Char('h') | KeyCode::Left, _) => Some(Message::MoveLeft),
            (KeyCode::Char('l') | KeyCode::Right, _) => Some(Message::MoveRight),
            (KeyCode::PageDown, _) => Some(Message::MovePageDown),
            (KeyCode::PageUp, _) => Some(Message::MovePageUp),
            (KeyCode::Char('g') | KeyCode::Home, _) => Some(Message::MoveBeginning),
            (KeyCode::Char('G') | KeyCode::End, _) => Some(Message::MoveEnd),
            (KeyCode::Char('/'), _) => Some(Message::Search),
            (KeyCode::Char('s'), _) => Some(Message::SortCurrentColumn),
            (KeyCode::Char('t'), _) => Some(Message::NextTypeFilter),
            (KeyCode::Char('T'), _) => Some(Message::PrevTypeFilter),
            (KeyCode::Char('c'), _) => Some(Message::NextCountryFilter),
            (KeyCode::Char('C'), _) => Some(Message::PrevCountryFilter),
            (KeyCode::Char('x'), _) => Some(Message::ClearFilters),
            (KeyCode::Char('d'), _) => Some(Message::ToggleTheme),
            (KeyCode::Char('?'), _) => Some(Message::Help),
            (KeyCode::Char(c @ '1'..='9'), _) => c
                .to_digit(10)
                .and_then(|d| Column::ALL.get(d as usize - 1))
                .map(|&column| Message::SortBy(column)),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }

    fn handle_mouse(&self, model: &Model, mouse: MouseEvent) -> Option<Message> {
        let message = match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => model
                .header_at(mouse.column as usize, mouse.row as usize)
                .map(Message::SortBy),
            MouseEventKind::ScrollDown => Some(Message::MoveDown),
            MouseEventKind::ScrollUp => Some(Message::MoveUp),
            _ => None,
        };
        if message.is_some() {
            trace!("Mapped: {mouse:?} => {message:?}");
        }
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Dataset, Record};
    use ratatui::crossterm::event::KeyEventKind;

    fn loaded_model(dir: &tempfile::TempDir) -> Model {
        let config = Config::default().prefs_path(dir.path().join("prefs.json"));
        let mut model = Model::init(&config, 100, 20);
        let records = vec![Record {
            id: "1".into(),
            name: "Proton".into(),
            ..Record::default()
        }];
        model
            .update(Some(Message::Loaded(Ok(Dataset::new(records)))))
            .unwrap();
        model
    }

    fn press(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn click(column: u16, row: u16) -> Event {
        Event::Mouse(MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column,
            row,
            modifiers: KeyModifiers::NONE,
        })
    }

    #[test]
    fn number_keys_sort_by_column() {
        let dir = tempfile::tempdir().unwrap();
        let model = loaded_model(&dir);
        let controller = Controller::new(&Config::default());
        assert!(matches!(
            controller.map_event(&model, press(KeyCode::Char('2'))),
            Some(Message::SortBy(Column::Name))
        ));
        assert!(matches!(
            controller.map_event(&model, press(KeyCode::Char('8'))),
            Some(Message::SortBy(Column::Description))
        ));
        assert!(controller.map_event(&model, press(KeyCode::Char('9'))).is_none());
    }

    #[test]
    fn header_clicks_sort_and_body_clicks_do_not() {
        let dir = tempfile::tempdir().unwrap();
        let model = loaded_model(&dir);
        let controller = Controller::new(&Config::default());
        let top = model.uilayout().table_top as u16;
        let slot = model.slots()[1].clone();

        assert!(matches!(
            controller.map_event(&model, click(slot.x as u16, top)),
            Some(Message::SortBy(Column::Name))
        ));
        assert!(controller.map_event(&model, click(slot.x as u16, top + 1)).is_none());
    }

    #[test]
    fn search_mode_forwards_raw_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = loaded_model(&dir);
        let controller = Controller::new(&Config::default());
        model.update(Some(Message::Search)).unwrap();
        assert!(matches!(
            controller.map_event(&model, press(KeyCode::Char('q'))),
            Some(Message::RawKey(_))
        ));

        let release = Event::Key(KeyEvent::new_with_kind(
            KeyCode::Char('q'),
            KeyModifiers::NONE,
            KeyEventKind::Release,
        ));
        assert!(controller.map_event(&model, release).is_none());
    }

    #[test]
    fn resize_events_carry_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let model = loaded_model(&dir);
        let controller = Controller::new(&Config::default());
        assert!(matches!(
            controller.map_event(&model, Event::Resize(90, 30)),
            Some(Message::Resize(90, 30))
        ));
    }
}
