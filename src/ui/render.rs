//! Render functions for the TUI.
//!
//! This module handles all rendering logic, dispatching to the appropriate
//! view based on application state.

use crate::app::{App, View};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use super::loop_runner::SPINNER_FRAMES;
use super::{catalog, comment_form, detail, episode, genres, help, status};

/// Minimum terminal dimensions required for normal operation.
pub(super) const MIN_WIDTH: u16 = 50;
pub(super) const MIN_HEIGHT: u16 = 10;

/// Width of the genre sidebar.
const GENRE_PANEL_WIDTH: u16 = 16;

const SPINNER: [&str; SPINNER_FRAMES] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Current spinner glyph.
pub(super) fn spinner(app: &App) -> &'static str {
    SPINNER[app.spinner_frame % SPINNER_FRAMES]
}

/// Main render dispatch function.
///
/// Routes to the appropriate view renderer based on current application state.
/// Handles terminal size validation before rendering.
pub(super) fn render(f: &mut Frame, app: &mut App) {
    let area = f.area();

    // Guard against zero-sized terminals during extreme resizes
    if area.width < 1 || area.height < 1 {
        return;
    }

    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        let msg = if area.height < 3 || area.width < 20 {
            Paragraph::new("Too small")
        } else {
            Paragraph::new(format!(
                "Terminal too small\n\nMinimum: {}x{}\nCurrent: {}x{}",
                MIN_WIDTH, MIN_HEIGHT, area.width, area.height
            ))
            .alignment(Alignment::Center)
        };
        f.render_widget(msg, area);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(area);

    match app.view {
        View::Browse => render_browse(f, app, chunks[0]),
        View::Detail => detail::render(f, app, chunks[0]),
        View::Episode => episode::render(f, app, chunks[0]),
    }
    status::render(f, app, chunks[1]);

    if app.comment_form.is_some() {
        comment_form::render(f, app);
    }

    // Help overlay on top of any view when active
    if app.show_help {
        help::render(f, app);
    }
}

/// Render the browse view: optional genre sidebar, catalog list, and the
/// search prompt while typing.
fn render_browse(f: &mut Frame, app: &mut App, area: Rect) {
    let (main, prompt) = if app.search_mode {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(area);
        (rows[0], Some(rows[1]))
    } else {
        (area, None)
    };

    if app.show_genres {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(GENRE_PANEL_WIDTH), Constraint::Min(0)])
            .split(main);
        genres::render(f, app, columns[0]);
        catalog::render(f, app, columns[1]);
    } else {
        catalog::render(f, app, main);
    }

    if let Some(prompt) = prompt {
        render_search_prompt(f, app, prompt);
    }
}

fn render_search_prompt(f: &mut Frame, app: &App, area: Rect) {
    let line = Line::from(vec![
        Span::styled("Search: ", app.style("search_prompt")),
        Span::raw(app.search_input.as_str()),
        Span::styled("_", app.style("search_prompt")),
    ]);
    f.render_widget(Paragraph::new(line), area);
}

/// Create a centered rectangle with the given percentage of the parent area.
pub(super) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let width = area.width * percent_x / 100;
    let height = area.height * percent_y / 100;
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}
