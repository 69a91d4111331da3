use crate::app::{App, CommentField};
use ratatui::{
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use super::render::{centered_rect, spinner};

/// Render the comment form overlay centered over the reader.
pub fn render(f: &mut Frame, app: &App) {
    let Some(form) = app.comment_form.as_ref() else {
        return;
    };

    let overlay = centered_rect(70, 60, f.area());
    if overlay.width < 20 || overlay.height < 8 {
        return;
    }
    f.render_widget(Clear, overlay);

    let label_style = app.style("form_label");
    let mut lines = Vec::with_capacity(12);
    for field in CommentField::ALL {
        let focused = field == form.field;
        let value_style = if focused {
            app.style("form_field_focused")
        } else {
            app.style("form_field")
        };
        let cursor = if focused && !form.submitting { "_" } else { "" };

        lines.push(Line::from(Span::styled(
            format!("{}:", field.label()),
            label_style,
        )));
        lines.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(format!("{}{}", form.value(field), cursor), value_style),
        ]));
        lines.push(Line::from(""));
    }

    let hint = if form.submitting {
        format!("{} Posting...", spinner(app))
    } else {
        "Tab next field · Enter submit · Esc cancel".to_string()
    };
    lines.push(Line::from(Span::styled(hint, app.style("feed_end"))));

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(app.style("panel_border_focused"))
                .title(" Write a comment "),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, overlay);
}
