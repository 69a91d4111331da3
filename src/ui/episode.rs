use crate::api::{split_line_breaks, EpisodeDetail, EpisodeKey};
use crate::app::{App, LoadState, MAX_SCROLL};
use crate::util::{strip_control_chars, wrapped_rows};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use super::render::spinner;

/// Render the episode reader: heading, body, prev/next bar, then comments.
pub fn render(f: &mut Frame, app: &mut App, area: Rect) {
    if area.width < 3 || area.height < 3 {
        return;
    }

    app.episode_visible_lines = area.height.saturating_sub(2) as usize;
    let text_width = area.width.saturating_sub(2) as usize;

    let title = app
        .episode_key
        .as_ref()
        .map(|key| format!("Episode {}", key.episode_no))
        .unwrap_or_else(|| "Episode".to_string());

    let lines: Vec<Line<'static>> = match (&app.episode, &app.episode_key) {
        (LoadState::Loaded(detail), Some(key)) => document(app, detail, key),
        (LoadState::Failed(message), _) => vec![
            Line::from(Span::styled(message.clone(), app.style("feed_error"))),
            Line::from(""),
            Line::from(Span::styled(
                "Press r to retry, b to go back",
                app.style("feed_end"),
            )),
        ],
        _ => vec![Line::from(Span::styled(
            format!("{} Loading episode...", spinner(app)),
            app.style("feed_loading"),
        ))],
    };

    // Clamp before drawing so a resize never shows an out-of-range frame
    app.episode_content_rows = lines
        .iter()
        .map(|line| wrapped_rows(&line_text(line), text_width))
        .sum();
    app.clamp_scroll(app.episode_content_rows, app.episode_visible_lines);

    let paragraph = Paragraph::new(Text::from(lines))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(app.style("panel_border_focused"))
                .title(title),
        )
        .wrap(Wrap { trim: false })
        .scroll((app.scroll_offset.min(MAX_SCROLL) as u16, 0));
    f.render_widget(paragraph, area);
}

fn line_text(line: &Line<'_>) -> String {
    line.spans.iter().map(|s| s.content.as_ref()).collect()
}

/// The full reader document for a loaded episode.
fn document(app: &App, detail: &EpisodeDetail, key: &EpisodeKey) -> Vec<Line<'static>> {
    let body_style = app.style("episode_body");
    let mut lines = Vec::with_capacity(16 + detail.comments.len() * 2);

    if !detail.title.is_empty() {
        lines.push(Line::from(Span::styled(
            strip_control_chars(&detail.title).into_owned(),
            app.style("detail_heading"),
        )));
    }
    lines.push(Line::from(Span::styled(
        strip_control_chars(&detail.heading(key.episode_no)).into_owned(),
        app.style("episode_heading"),
    )));
    lines.push(Line::from(""));

    for line in detail.body_lines() {
        lines.push(Line::from(Span::styled(
            strip_control_chars(line).into_owned(),
            body_style,
        )));
    }

    lines.push(Line::from(""));
    lines.push(nav_line(app, detail, key));
    lines.push(Line::from(""));

    lines.push(Line::from(Span::styled(
        format!("Comments ({})", detail.comments.len()),
        app.style("episode_heading"),
    )));
    if detail.comments.is_empty() {
        lines.push(Line::from(Span::styled(
            "No comments yet.",
            app.style("feed_end"),
        )));
    }
    let author_style = app.style("comment_author");
    let comment_style = app.style("comment_body");
    for comment in &detail.comments {
        lines.push(Line::from(Span::styled(
            strip_control_chars(&comment.name).into_owned(),
            author_style,
        )));
        for text in split_line_breaks(&comment.comment) {
            lines.push(Line::from(Span::styled(
                format!("  {}", strip_control_chars(text)),
                comment_style,
            )));
        }
    }

    lines
}

/// "< Previous | Next >", with unavailable directions dimmed.
fn nav_line(app: &App, detail: &EpisodeDetail, key: &EpisodeKey) -> Line<'static> {
    let enabled = app.style("episode_nav");
    let disabled = app.style("episode_nav_disabled");
    let pick = |available: bool| -> Style {
        if available {
            enabled
        } else {
            disabled
        }
    };

    let prev = key.previous().is_some();
    let next = key.next(detail.episode_count).is_some();
    Line::from(vec![
        Span::styled("< Previous [h]", pick(prev)),
        Span::raw("   "),
        Span::styled(
            format!("{} / {}", key.episode_no, detail.episode_count),
            app.style("detail_views"),
        ),
        Span::raw("   "),
        Span::styled("[l] Next >", pick(next)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{CatalogClient, Comment, EpisodeBody, NovelId};
    use crate::config::Config;
    use ratatui::{backend::TestBackend, Terminal};
    use std::sync::Arc;
    use std::time::Duration;

    fn loaded_app(comments: Vec<Comment>) -> App {
        let client =
            CatalogClient::new("http://127.0.0.1:9/api", None, Duration::from_secs(1)).unwrap();
        let mut app = App::new(Arc::new(client), &Config::default());
        app.open_episode(EpisodeKey::new(NovelId::from(9u64), 2));
        app.episode = LoadState::Loaded(EpisodeDetail {
            episode: EpisodeBody {
                episode_titles: Some("새벽".to_string()),
                description: "line one\r\nline two\rline three\nline four".to_string(),
            },
            episode_count: 3,
            count: 10,
            title: "검의 노래".to_string(),
            description: String::new(),
            comments,
        });
        app
    }

    fn screen(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(60, 30)).unwrap();
        terminal
            .draw(|f| {
                let area = f.area();
                render(f, app, area)
            })
            .unwrap();
        let buffer = terminal.backend().buffer().clone();
        let mut out = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                out.push_str(buffer[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn test_heading_and_body_lines() {
        let mut app = loaded_app(vec![]);
        let out = screen(&mut app);
        assert!(out.contains("Episode 2 - "));
        for line in ["line one", "line two", "line three", "line four"] {
            assert!(out.contains(line), "missing {}", line);
        }
        assert!(out.contains("No comments yet."));
    }

    #[test]
    fn test_comments_listed() {
        let mut app = loaded_app(vec![Comment {
            name: "reader".to_string(),
            comment: "great chapter".to_string(),
        }]);
        let out = screen(&mut app);
        assert!(out.contains("Comments (1)"));
        assert!(out.contains("great chapter"));
        assert!(!out.contains("No comments yet."));
    }

    #[test]
    fn test_render_records_content_rows() {
        let mut app = loaded_app(vec![]);
        screen(&mut app);
        assert_eq!(app.episode_visible_lines, 28);
        // title, heading, blank, 4 body, blank, nav, blank, comments header, empty notice
        assert_eq!(app.episode_content_rows, 12);
    }

    #[test]
    fn test_scrolled_to_end_shows_last_comment_of_word_wrapped_body() {
        let mut app = loaded_app(vec![Comment {
            name: "reader".to_string(),
            comment: "the very last comment".to_string(),
        }]);
        // Eleven 9-letter words per line: 2 rows by characters, 3 by words at 58 columns
        let line = vec!["abcdefghi"; 11].join(" ");
        let body = vec![line; 30].join("\n");
        if let LoadState::Loaded(detail) = &mut app.episode {
            detail.episode.description = body;
        }

        app.scroll_offset = 10_000;
        let out = screen(&mut app);

        assert!(out.contains("the very last comment"), "{}", out);
        assert_eq!(
            app.scroll_offset,
            app.episode_content_rows - app.episode_visible_lines
        );
    }
}
