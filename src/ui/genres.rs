use crate::api::GENRES;
use crate::app::{App, Focus};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
    Frame,
};

/// Render the genre sidebar. The genre of the current feed is highlighted.
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    if area.width < 3 || area.height < 3 {
        return;
    }

    let is_focused = app.focus == Focus::Genres;
    let active = app.active_genre();

    let style_selected = app.style("list_selected");
    let style_active = app.style("genre_active");
    let style_normal = app.style("genre_normal");

    let items: Vec<ListItem> = GENRES
        .iter()
        .enumerate()
        .map(|(i, genre)| {
            let is_active = active == Some(*genre);
            let style = if is_focused && i == app.genre_selected {
                style_selected
            } else if is_active {
                style_active
            } else {
                style_normal
            };
            let marker = if is_active { "> " } else { "  " };
            ListItem::new(Line::from(vec![
                Span::styled(marker, style),
                Span::styled(*genre, style),
            ]))
        })
        .collect();

    let border_style = if is_focused {
        app.style("panel_border_focused")
    } else {
        app.style("panel_border")
    };

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title("Genres"),
        )
        .highlight_style(Style::default());

    let mut state = ListState::default().with_selected(Some(app.genre_selected));
    f.render_stateful_widget(list, area, &mut state);
}
