use std::fmt::Write;
use std::ops::Range;

use crate::dataset::{Column, Dataset};
use crate::labels::Labels;
use crate::sort::{Direction, SortState};
use crate::store::TableStatus;

/// A header cell bound to the column it sorts.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub column: Column,
    pub title: &'static str,
}

/// Builds the header row once; rendering only decorates it with sort markers.
pub fn bind_headers(labels: &Labels) -> Vec<Header> {
    Column::ALL
        .into_iter()
        .map(|column| Header {
            column,
            title: labels.title(column),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderCell {
    pub column: Column,
    pub title: &'static str,
    pub marker: Option<Direction>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableBody {
    pub header: Vec<HeaderCell>,
    pub rows: Vec<Vec<String>>,
    /// Position of `rows[0]` within the whole view.
    pub first_row: usize,
    pub total_rows: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Presentation {
    Loading,
    LoadFailed,
    NoData,
    Table(TableBody),
}

impl Presentation {
    pub fn message<'a>(&self, labels: &'a Labels) -> Option<&'a str> {
        match self {
            Presentation::Loading => Some(labels.loading),
            Presentation::LoadFailed => Some(labels.load_failed),
            Presentation::NoData => Some(labels.no_data),
            Presentation::Table(_) => None,
        }
    }
}

/// Project the rows of `view` that fall into `window` into a presentation.
pub fn render(
    status: TableStatus,
    dataset: &Dataset,
    view: &[usize],
    sort: SortState,
    headers: &[Header],
    window: Range<usize>,
) -> Presentation {
    match status {
        TableStatus::Uninitialized | TableStatus::Loading => return Presentation::Loading,
        TableStatus::LoadFailed => return Presentation::LoadFailed,
        TableStatus::Loaded => {}
    }
    if view.is_empty() {
        return Presentation::NoData;
    }

    let header = headers
        .iter()
        .map(|h| HeaderCell {
            column: h.column,
            title: h.title,
            marker: sort.marker(h.column),
        })
        .collect();

    let end = window.end.min(view.len());
    let start = window.start.min(end);
    let rows = view[start..end]
        .iter()
        .map(|&ridx| {
            headers
                .iter()
                .map(|h| dataset.cell(ridx, h.column).into_owned())
                .collect()
        })
        .collect();

    Presentation::Table(TableBody {
        header,
        rows,
        first_row: start,
        total_rows: view.len(),
    })
}

pub fn to_html(presentation: &Presentation, labels: &Labels) -> String {
    let body = match presentation {
        Presentation::Table(body) => body,
        other => {
            let message = other.message(labels).unwrap_or_default();
            return format!("<div class=\"no-data\">{}</div>\n", escape_html(message));
        }
    };

    let mut html = String::from("<table>\n  <thead>\n    <tr>\n");
    for cell in &body.header {
        let class = match cell.marker {
            Some(Direction::Ascending) => " class=\"sort-asc\"",
            Some(Direction::Descending) => " class=\"sort-desc\"",
            None => "",
        };
        let _ = writeln!(
            html,
            "      <th data-col=\"{}\"{}>{}</th>",
            cell.column.key(),
            class,
            escape_html(cell.title)
        );
    }
    html.push_str("    </tr>\n  </thead>\n  <tbody>\n");
    for row in &body.rows {
        html.push_str("    <tr>");
        for value in row {
            let _ = write!(html, "<td>{}</td>", escape_html(value));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("  </tbody>\n</table>\n");
    html
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
