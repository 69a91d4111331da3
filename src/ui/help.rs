//! Help overlay listing every binding, grouped by where it applies.
//!
//! User overrides from config show up here because the table is read back
//! from the live registry.

use crate::app::App;
use crate::keybindings::Context;
use ratatui::{
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Row, Table},
    Frame,
};

use super::render::centered_rect;

/// Section order, most general first.
const SECTIONS: [Context; 7] = [
    Context::Global,
    Context::Genres,
    Context::Catalog,
    Context::Detail,
    Context::Episode,
    Context::Search,
    Context::CommentForm,
];

/// Borders plus the header row.
const CHROME_ROWS: u16 = 3;

fn help_rows(app: &App) -> Vec<Row<'static>> {
    let bindings = app.keybindings.all_bindings();
    let heading = Style::default().add_modifier(Modifier::BOLD);

    let mut sections = Vec::new();
    for ctx in SECTIONS {
        let mut section: Vec<Row<'static>> = bindings
            .iter()
            .filter(|(c, ..)| *c == ctx)
            .map(|(_, key, _, description)| {
                Row::new(vec![format!("  {}", key), description.to_string()])
            })
            .collect();
        if section.is_empty() {
            continue;
        }
        section.insert(
            0,
            Row::new(vec![
                Line::from(Span::styled(format!("-- {} --", ctx.title()), heading)),
                Line::default(),
            ])
            .style(app.style("episode_heading")),
        );
        sections.push(section);
    }

    let blank = || Row::new(vec![String::new(), String::new()]);
    let mut rows = Vec::new();
    for (i, section) in sections.into_iter().enumerate() {
        if i > 0 {
            rows.push(blank());
        }
        rows.extend(section);
    }
    rows
}

/// First visible row and the largest valid one.
fn scroll_window(total: usize, visible: usize, requested: usize) -> (usize, usize) {
    let max_scroll = total.saturating_sub(visible);
    (requested.min(max_scroll), max_scroll)
}

pub fn render(f: &mut Frame, app: &App) {
    let overlay = centered_rect(80, 80, f.area());
    if overlay.width < 20 || overlay.height < 6 {
        return;
    }
    f.render_widget(Clear, overlay);

    let rows = help_rows(app);
    let visible = overlay.height.saturating_sub(CHROME_ROWS) as usize;
    let (scroll, max_scroll) = scroll_window(rows.len(), visible, app.help_scroll_offset);

    let title = if max_scroll == 0 {
        " Help (? to close) ".to_string()
    } else {
        format!(" Help ({}/{}) ", scroll + 1, max_scroll + 1)
    };

    let header = Row::new(vec!["Key", "Action"])
        .style(
            Style::default()
                .add_modifier(Modifier::BOLD)
                .add_modifier(Modifier::UNDERLINED),
        )
        .bottom_margin(1);

    let table = Table::new(
        rows.into_iter().skip(scroll).take(visible),
        [Constraint::Length(16), Constraint::Min(20)],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(app.style("panel_border_focused"))
            .title(title),
    )
    .style(app.style("detail_body"));
    f.render_widget(table, overlay);

    if scroll < max_scroll {
        let hint_area = Rect {
            x: overlay.x + 1,
            y: overlay.bottom().saturating_sub(1),
            width: overlay.width.saturating_sub(2),
            height: 1,
        };
        let hint = Span::styled(" j/k to scroll, ? or Esc to close ", app.style("detail_views"));
        f.render_widget(Paragraph::new(Line::from(hint)), hint_area);
    }
}
