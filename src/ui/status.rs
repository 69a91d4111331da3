use crate::app::{App, View};
use ratatui::{layout::Rect, widgets::Paragraph, Frame};
use std::borrow::Cow;

/// Render the status bar
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    if area.width < 1 || area.height < 1 {
        return;
    }

    // Borrow static hints and the status message instead of allocating
    let text: Cow<'_, str> = if let Some((msg, _)) = &app.status_message {
        Cow::Borrowed(msg.as_ref())
    } else if app.comment_form.is_some() {
        Cow::Borrowed("Writing comment | Tab next field | ENTER submit | ESC cancel")
    } else if app.search_mode {
        Cow::Borrowed("Type to search | ESC cancel | ENTER search")
    } else {
        match app.view {
            View::Browse => Cow::Borrowed(
                "[/]search [g]enres [H]ome [Enter]open [r]etry [o]pen web [?]help [q]uit",
            ),
            View::Detail => Cow::Borrowed("[b]ack [j/k]select [Enter]read [o]pen web [q]uit"),
            View::Episode => {
                Cow::Borrowed("[b]ack [j/k]scroll [h/l]prev/next [c]omment [o]pen web [q]uit")
            }
        }
    };

    let paragraph = Paragraph::new(text).style(app.style("status_bar"));
    f.render_widget(paragraph, area);
}
