use std::borrow::Cow;

use ratatui::{
    Frame,
    buffer::Buffer,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols::border,
    text::{Line, Span},
    widgets::{Block, Clear, Paragraph, Widget},
};

use crate::model::{Modus, Model};
use crate::prefs::Theme;
use crate::render::{Presentation, TableBody};

pub const TITLE_HEIGHT: usize = 1;
pub const FILTERBAR_HEIGHT: usize = 1;
pub const TABLE_HEADER_HEIGHT: usize = 1;
pub const CMDLINE_HEIGH: usize = 1;
pub const COLUMN_WIDTH_MARGIN: usize = 1;

struct Palette {
    base: Style,
    header: Style,
    selected: Style,
    accent: Style,
    muted: Style,
}

impl Palette {
    fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Palette {
                base: Style::new().fg(Color::Black).bg(Color::White),
                header: Style::new().fg(Color::White).bg(Color::Blue).bold(),
                selected: Style::new().fg(Color::Black).bg(Color::LightCyan),
                accent: Style::new().fg(Color::Blue).bg(Color::White).bold(),
                muted: Style::new().fg(Color::DarkGray).bg(Color::White),
            },
            Theme::Dark => Palette {
                base: Style::new().fg(Color::Gray).bg(Color::Black),
                header: Style::new().fg(Color::Black).bg(Color::Yellow).bold(),
                selected: Style::new().fg(Color::White).bg(Color::DarkGray),
                accent: Style::new().fg(Color::Yellow).bg(Color::Black).bold(),
                muted: Style::new().fg(Color::DarkGray).bg(Color::Black),
            },
        }
    }
}

#[derive(Debug, Default)]
pub struct TableUI;

impl TableUI {
    pub fn new() -> Self {
        Self
    }

    pub fn draw(&self, model: &Model, frame: &mut Frame) {
        let area = frame.area();
        let palette = Palette::for_theme(model.theme());
        frame.render_widget(Block::new().style(palette.base), area);

        let [title_area, filter_area, table_area, status_area] = Layout::vertical([
            Constraint::Length(TITLE_HEIGHT as u16),
            Constraint::Length(FILTERBAR_HEIGHT as u16),
            Constraint::Min(0),
            Constraint::Length(CMDLINE_HEIGH as u16),
        ])
        .areas(area);

        self.draw_title(model, title_area, frame.buffer_mut(), &palette);
        self.draw_filter_bar(model, filter_area, frame, &palette);

        let labels = model.labels();
        match model.presentation() {
            Presentation::Table(body) => {
                self.draw_table(model, body, table_area, frame.buffer_mut(), &palette)
            }
            other => {
                let message = other.message(labels).unwrap_or_default();
                let [line] = Layout::vertical([Constraint::Length(1)])
                    .flex(Flex::Center)
                    .areas(table_area);
                Paragraph::new(message)
                    .style(palette.muted)
                    .centered()
                    .render(line, frame.buffer_mut());
            }
        }

        self.draw_status_line(model, status_area, frame.buffer_mut(), &palette);

        if model.modus() == Modus::HELP {
            self.draw_help(model, area, frame.buffer_mut(), &palette);
        }
    }

    fn draw_title(&self, model: &Model, area: Rect, buf: &mut Buffer, palette: &Palette) {
        Line::from(" rtable ".bold())
            .style(palette.accent)
            .render(area, buf);

        let labels = model.labels();
        let mut right = Vec::new();
        if let Some(date) = model.last_updated() {
            right.push(Span::styled(format!("{}: {date}  ", labels.updated), palette.muted));
        }
        right.push(Span::raw(model.theme().icon()));
        right.push(Span::styled(" <d> ", palette.muted));
        Line::from(right).right_aligned().render(area, buf);
    }

    fn draw_filter_bar(&self, model: &Model, area: Rect, frame: &mut Frame, palette: &Palette) {
        let labels = model.labels();
        let search = model.search_input();
        let (type_label, country_label) = model.selector_labels();
        let (nrows, nrecords) = model.record_counts();

        let prefix = format!(" {}: ", labels.search);
        let line = Line::from(vec![
            Span::styled(prefix.clone(), palette.accent),
            Span::styled(format!("{} ", search.input), palette.base.underlined()),
            Span::styled(format!("  {}: ", labels.type_filter), palette.accent),
            Span::styled(format!("{type_label} <t>"), palette.base),
            Span::styled(format!("  {}: ", labels.country_filter), palette.accent),
            Span::styled(format!("{country_label} <c>"), palette.base),
            Span::styled(format!("  {nrows}/{nrecords}"), palette.muted),
        ]);
        line.render(area, frame.buffer_mut());

        if model.modus() == Modus::SEARCH {
            let offset = prefix.chars().count() + search.curser_pos;
            let x = area.x.saturating_add(offset as u16);
            frame.set_cursor_position((x.min(area.right().saturating_sub(1)), area.y));
        }
    }

    fn draw_table(
        &self,
        model: &Model,
        body: &TableBody,
        area: Rect,
        buf: &mut Buffer,
        palette: &Palette,
    ) {
        if area.height == 0 {
            return;
        }
        let selected_column = model.selected_column();

        buf.set_style(Rect::new(area.x, area.y, area.width, 1), palette.header);
        for slot in model.slots() {
            let cell = &body.header[slot.column.index()];
            let title = match cell.marker {
                Some(direction) => format!("{} {}", cell.title, direction.arrow()),
                None => cell.title.to_string(),
            };
            let style = if slot.column == selected_column {
                palette.header.add_modifier(Modifier::UNDERLINED)
            } else {
                palette.header
            };
            buf.set_stringn(area.x + slot.x as u16, area.y, title, slot.width, style);
        }

        let body_rows = usize::from(area.height.saturating_sub(1)).min(model.uilayout().table_height);
        for (i, row) in body.rows.iter().take(body_rows).enumerate() {
            let y = area.y + 1 + i as u16;
            let style = if i == model.selected_row() {
                palette.selected
            } else {
                palette.base
            };
            buf.set_style(Rect::new(area.x, y, area.width, 1), style);
            for slot in model.slots() {
                let value = single_line(&row[slot.column.index()]);
                buf.set_stringn(area.x + slot.x as u16, y, value, slot.width, style);
            }
        }
    }

    fn draw_status_line(&self, model: &Model, area: Rect, buf: &mut Buffer, palette: &Palette) {
        Line::from(format!(" {}", model.status_message()))
            .style(palette.muted)
            .render(area, buf);

        let labels = model.labels();
        let mut hints = Vec::new();
        if model.show_scroll_top() {
            hints.push(Span::styled(format!("{}  ", labels.scroll_top), palette.accent));
        }
        hints.push(Span::styled("<?> ", palette.muted));
        Line::from(hints).right_aligned().render(area, buf);
    }

    fn draw_help(&self, model: &Model, area: Rect, buf: &mut Buffer, palette: &Palette) {
        let help = model.labels().help;
        let height = help.lines().count() as u16 + 2;
        let width = help.lines().map(|l| l.chars().count()).max().unwrap_or(0) as u16 + 4;
        let [vertical] = Layout::vertical([Constraint::Length(height)])
            .flex(Flex::Center)
            .areas(area);
        let [popup] = Layout::horizontal([Constraint::Length(width)])
            .flex(Flex::Center)
            .areas(vertical);

        Clear.render(popup, buf);
        let block = Block::bordered()
            .title(Line::from(" ? ".bold()).centered())
            .border_set(border::THICK)
            .style(palette.base);
        Paragraph::new(help).block(block).render(popup, buf);
    }
}

fn single_line(value: &str) -> Cow<'_, str> {
    if value.contains('\n') {
        Cow::Owned(value.replace("\r\n", " ↵ ").replace('\n', " ↵ "))
    } else {
        Cow::Borrowed(value)
    }
}
