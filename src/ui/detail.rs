use crate::app::{App, LoadState};
use crate::util::{strip_control_chars, wrapped_rows};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use super::render::spinner;

/// Largest share of the panel the synopsis may take, in percent.
const SYNOPSIS_MAX_PERCENT: u16 = 40;

/// Render a novel's detail page: title, synopsis, and its episodes newest
/// first with view counts.
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    if area.width < 3 || area.height < 3 {
        return;
    }

    let heading = app
        .detail_novel
        .as_ref()
        .map(|n| strip_control_chars(&n.title).into_owned())
        .unwrap_or_default();

    let detail = match &app.detail {
        LoadState::Loaded(detail) => detail,
        LoadState::Idle | LoadState::Loading => {
            let paragraph = Paragraph::new(Line::from(Span::styled(
                format!("{} Loading...", spinner(app)),
                app.style("feed_loading"),
            )))
            .block(panel(app, &heading));
            f.render_widget(paragraph, area);
            return;
        }
        LoadState::Failed(message) => {
            let paragraph = Paragraph::new(vec![
                Line::from(Span::styled(message.as_str(), app.style("feed_error"))),
                Line::from(""),
                Line::from(Span::styled(
                    "Press r to retry, Esc to go back",
                    app.style("feed_end"),
                )),
            ])
            .block(panel(app, &heading))
            .wrap(Wrap { trim: true });
            f.render_widget(paragraph, area);
            return;
        }
    };

    let synopsis = strip_control_chars(&detail.description);
    let text_width = area.width.saturating_sub(2) as usize;
    let synopsis_rows: usize = synopsis
        .lines()
        .map(|line| wrapped_rows(line, text_width))
        .sum();
    let max_rows = area.height * SYNOPSIS_MAX_PERCENT / 100;
    let synopsis_height = u16::try_from(synopsis_rows)
        .unwrap_or(u16::MAX)
        .saturating_add(2)
        .min(max_rows.max(3));

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(synopsis_height), Constraint::Min(0)])
        .split(area);

    let synopsis = Paragraph::new(synopsis.into_owned())
        .style(app.style("detail_body"))
        .block(panel(app, &heading))
        .wrap(Wrap { trim: false });
    f.render_widget(synopsis, chunks[0]);

    let style_selected = app.style("list_selected");
    let style_episode = app.style("detail_episode");
    let style_views = app.style("detail_views");

    let items: Vec<ListItem> = if detail.viewer_counts.is_empty() {
        vec![ListItem::new(Span::styled("No episodes yet", app.style("feed_end")))]
    } else {
        detail
            .viewer_counts
            .iter()
            .enumerate()
            .map(|(i, ep)| {
                let style = if i == app.detail_selected {
                    style_selected
                } else {
                    style_episode
                };
                ListItem::new(Line::from(vec![
                    Span::styled(format!("Episode {}", ep.episode_no), style),
                    Span::styled(format!(" — {} views", ep.viewer_count), style_views),
                ]))
            })
            .collect()
    };

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(app.style("panel_border"))
            .title(format!("Episodes ({})", detail.viewer_counts.len())),
    );
    let mut state = ListState::default().with_selected(Some(app.detail_selected));
    f.render_stateful_widget(list, chunks[1], &mut state);
}

fn panel<'a>(app: &App, title: &'a str) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(app.style("panel_border_focused"))
        .title(Span::styled(title, app.style("detail_heading")))
}
