use crate::app::{App, Focus};
use crate::util::{strip_control_chars, truncate_to_width};
use ratatui::{
    layout::{Alignment, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use super::render::spinner;

/// Render the catalog panel.
///
/// Shows the merged record list plus one footer row for the feed state:
/// loading more, a dismissable error, or the end of the catalog. Before
/// anything has loaded the whole panel is given to the loading indicator,
/// the error, or the empty message.
///
/// Writes the list offset and visible row count back into `app` so the
/// load-more trigger sees the viewport as drawn.
pub fn render(f: &mut Frame, app: &mut App, area: Rect) {
    if area.width < 3 || area.height < 3 {
        return;
    }

    let is_focused = app.focus == Focus::Catalog;
    let border_style = if is_focused {
        app.style("panel_border_focused")
    } else {
        app.style("panel_border")
    };

    let title = match app.feed.context() {
        Some(context) if !app.feed.records().is_empty() => {
            format!("{} ({})", context.label(), app.feed.records().len())
        }
        Some(context) => context.label(),
        None => "Novels".to_string(),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(title);

    let inner_width = area.width.saturating_sub(2) as usize;
    app.catalog_visible_rows = area.height.saturating_sub(2) as usize;

    let view = app.feed.view();

    // Nothing to list yet: the panel shows the feed state instead
    if view.items.is_empty() {
        let lines = if view.is_initial_error() {
            let message = view.error_message.clone().unwrap_or_default();
            vec![
                Line::from(Span::styled(message, app.style("feed_error"))),
                Line::from(""),
                Line::from(Span::styled("Press r to retry", app.style("feed_end"))),
            ]
        } else if view.is_loading_initial || app.feed.context().is_none() {
            vec![Line::from(Span::styled(
                format!("{} Loading novels...", spinner(app)),
                app.style("feed_loading"),
            ))]
        } else if !view.has_more {
            let message = app
                .feed
                .context()
                .map(|c| c.empty_message())
                .unwrap_or("No novels available");
            vec![Line::from(Span::styled(message, app.style("feed_end")))]
        } else {
            // Error dismissed before anything loaded
            vec![Line::from(Span::styled(
                "Press r to retry",
                app.style("feed_end"),
            ))]
        };

        let paragraph = Paragraph::new(lines)
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        f.render_widget(paragraph, area);
        app.catalog_offset = 0;
        return;
    }

    let style_selected = app.style("list_selected");
    let style_title = app.style("novel_title");
    let style_no_image = app.style("novel_no_image");
    const NO_COVER: &str = "  (no cover)";

    let mut items: Vec<ListItem> = view
        .items
        .iter()
        .enumerate()
        .map(|(i, novel)| {
            let title = strip_control_chars(&novel.title);
            let has_cover = novel.img.as_deref().is_some_and(|s| !s.trim().is_empty());
            let budget = if has_cover {
                inner_width
            } else {
                inner_width.saturating_sub(NO_COVER.len())
            };
            let title = truncate_to_width(&title, budget).into_owned();

            let mut spans = Vec::with_capacity(2);
            if i == app.selected_novel && is_focused {
                spans.push(Span::styled(title, style_selected));
            } else {
                spans.push(Span::styled(title, style_title));
            }
            if !has_cover {
                spans.push(Span::styled(NO_COVER, style_no_image));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let footer = if view.is_loading_more {
        Some(Line::from(Span::styled(
            format!("{} Loading more...", spinner(app)),
            app.style("feed_loading"),
        )))
    } else if let Some(message) = &view.error_message {
        Some(Line::from(vec![
            Span::styled(format!("! {}", message), app.style("feed_error")),
            Span::styled("  (r retry · x dismiss)", app.style("feed_end")),
        ]))
    } else if !view.has_more {
        Some(Line::from(Span::styled(
            "No more novels available",
            app.style("feed_end"),
        )))
    } else {
        None
    };
    if let Some(footer) = footer {
        items.push(ListItem::new(footer));
    }

    let list = List::new(items).block(block);

    let mut state = ListState::default()
        .with_offset(app.catalog_offset)
        .with_selected(Some(app.selected_novel));
    f.render_stateful_widget(list, area, &mut state);
    app.catalog_offset = state.offset();
}
