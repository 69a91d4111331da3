//! Input handling for the TUI.
//!
//! This module processes keyboard input and dispatches to the appropriate
//! handler based on current view and mode.

use crate::api::{EpisodeKey, GENRES};
use crate::app::{App, AppEvent, Focus, View};
use crate::feed::QueryContext;
use crate::keybindings::{Action as KbAction, Context as KbContext};
use crate::util::MAX_SEARCH_QUERY_LENGTH;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyModifiers};
use tokio::sync::mpsc;

use super::helpers::{
    apply_context, maybe_load_more, open_in_browser, retry_page, show_episode,
    spawn_detail_load, spawn_episode_load, submit_comment_form,
};
use super::Action;

/// Rows moved by PageDown/PageUp when the viewport size is not known yet.
const FALLBACK_PAGE_ROWS: usize = 10;

/// Map the current focus panel to a keybinding context.
fn focus_to_context(focus: Focus) -> KbContext {
    match focus {
        Focus::Genres => KbContext::Genres,
        Focus::Catalog => KbContext::Catalog,
    }
}

/// Main input dispatch function.
///
/// Routes input to the appropriate handler based on current mode and view.
pub(super) fn handle_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Result<Action> {
    // Help overlay captures all keys when visible
    if app.show_help {
        return Ok(handle_help_input(app, code));
    }

    if app.comment_form.is_some() {
        return Ok(handle_comment_form_input(app, code, modifiers, event_tx));
    }

    if app.search_mode {
        return Ok(handle_search_input(app, code, modifiers, event_tx));
    }

    let action = match app.view {
        View::Browse => handle_browse_input(app, code, modifiers, event_tx),
        View::Detail => handle_detail_input(app, code, modifiers, event_tx),
        View::Episode => handle_episode_input(app, code, modifiers, event_tx),
    };

    // Any cursor movement may have brought the catalog end into view
    if app.view == View::Browse {
        maybe_load_more(app, event_tx);
    }
    Ok(action)
}

/// Handle input while the help overlay is visible.
///
/// Captures all keys: j/k/Up/Down scroll, Esc/q/? dismiss.
fn handle_help_input(app: &mut App, code: KeyCode) -> Action {
    match code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?') => {
            app.show_help = false;
            app.help_scroll_offset = 0;
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.help_scroll_offset = app.help_scroll_offset.saturating_add(1);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.help_scroll_offset = app.help_scroll_offset.saturating_sub(1);
        }
        _ => {}
    }
    Action::Continue
}

/// Actions that behave the same in every view.
///
/// Returns `None` when the action was handled here.
fn handle_common_action(app: &mut App, action: KbAction) -> Option<KbAction> {
    match action {
        KbAction::ShowHelp => {
            app.show_help = true;
            app.help_scroll_offset = 0;
        }
        KbAction::CycleTheme => {
            let name = app.cycle_theme();
            app.set_status(format!("Theme: {}", name));
        }
        KbAction::OpenInBrowser => open_in_browser(app),
        other => return Some(other),
    }
    None
}

fn page_rows(visible: usize) -> usize {
    if visible == 0 {
        FALLBACK_PAGE_ROWS
    } else {
        visible
    }
}

// ============================================================================
// Browse view
// ============================================================================

/// Handle input in browse view (genre sidebar + catalog list).
fn handle_browse_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Action {
    let context = focus_to_context(app.focus);
    let Some(action) = app.keybindings.action_for_key(code, modifiers, context) else {
        return Action::Continue;
    };
    let Some(action) = handle_common_action(app, action) else {
        return Action::Continue;
    };

    match action {
        KbAction::Quit => return Action::Quit,
        KbAction::NavDown => app.nav_down(),
        KbAction::NavUp => app.nav_up(),
        KbAction::PageDown => app.page_down(page_rows(app.catalog_visible_rows)),
        KbAction::PageUp => app.page_up(page_rows(app.catalog_visible_rows)),
        KbAction::CycleFocus => {
            app.focus = match app.focus {
                Focus::Genres => Focus::Catalog,
                Focus::Catalog if app.show_genres => Focus::Genres,
                Focus::Catalog => Focus::Catalog,
            };
        }
        KbAction::ToggleGenres => {
            app.show_genres = !app.show_genres;
            if app.show_genres {
                app.focus = Focus::Genres;
            } else if app.focus == Focus::Genres {
                app.focus = Focus::Catalog;
            }
        }
        KbAction::Select => match app.focus {
            Focus::Genres => {
                if let Some(genre) = GENRES.get(app.genre_selected) {
                    apply_context(app, QueryContext::type_filter(genre), event_tx);
                    app.focus = Focus::Catalog;
                }
            }
            Focus::Catalog => {
                if let Some((title, generation)) = app.enter_detail() {
                    spawn_detail_load(app, title, generation, event_tx);
                }
            }
        },
        KbAction::Home => apply_context(app, QueryContext::Catalog, event_tx),
        KbAction::EnterSearch => {
            app.search_mode = true;
            app.search_input.clear();
        }
        KbAction::Back => {
            // Leaving a filtered or searched feed goes back to the full catalog
            if !matches!(app.feed.context(), Some(QueryContext::Catalog) | None) {
                apply_context(app, QueryContext::Catalog, event_tx);
            }
        }
        KbAction::Retry => {
            if !retry_page(app, event_tx) {
                app.set_status("Nothing to retry");
            }
        }
        KbAction::DismissError => {
            app.feed.dismiss_error();
        }
        _ => {}
    }
    Action::Continue
}

// ============================================================================
// Search prompt
// ============================================================================

/// Handle input while the search prompt is open.
///
/// Printable characters go into the query; only the search bindings act.
fn handle_search_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Action {
    match app
        .keybindings
        .action_for_key(code, modifiers, KbContext::Search)
    {
        Some(KbAction::ExitSearch) => {
            app.search_mode = false;
            app.search_input.clear();
        }
        Some(KbAction::CommitSearch) => {
            let term = app.search_input.trim();
            if term.is_empty() {
                app.set_status("Enter a search term");
                return Action::Continue;
            }
            let context = QueryContext::search(term);
            app.search_mode = false;
            app.search_input.clear();
            app.focus = Focus::Catalog;
            apply_context(app, context, event_tx);
        }
        _ => match code {
            KeyCode::Backspace => {
                app.search_input.pop();
            }
            KeyCode::Char(c) if !modifiers.contains(KeyModifiers::CONTROL) => {
                if app.search_input.chars().count() >= MAX_SEARCH_QUERY_LENGTH {
                    app.set_status(format!(
                        "Search query too long (max {} chars)",
                        MAX_SEARCH_QUERY_LENGTH
                    ));
                } else {
                    app.search_input.push(c);
                }
            }
            _ => {}
        },
    }
    Action::Continue
}

// ============================================================================
// Detail view
// ============================================================================

fn handle_detail_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Action {
    let Some(action) = app
        .keybindings
        .action_for_key(code, modifiers, KbContext::Detail)
    else {
        return Action::Continue;
    };
    let Some(action) = handle_common_action(app, action) else {
        return Action::Continue;
    };

    match action {
        KbAction::Quit => return Action::Quit,
        KbAction::Back => app.exit_detail(),
        KbAction::NavDown => app.nav_down(),
        KbAction::NavUp => app.nav_up(),
        KbAction::Select => {
            let novel_id = app.detail.loaded().map(|d| d.id.clone());
            match (novel_id, app.selected_episode_no()) {
                (Some(novel_id), Some(episode_no)) => {
                    show_episode(app, EpisodeKey::new(novel_id, episode_no), event_tx);
                }
                _ => app.set_status("No episode selected"),
            }
        }
        KbAction::Retry => {
            if let Some(title) = app.detail_novel.as_ref().map(|n| n.title.clone()) {
                app.detail = crate::app::LoadState::Loading;
                app.detail_generation = app.detail_generation.wrapping_add(1);
                let generation = app.detail_generation;
                spawn_detail_load(app, title, generation, event_tx);
            }
        }
        KbAction::EnterSearch => {
            app.exit_detail();
            app.search_mode = true;
            app.search_input.clear();
        }
        KbAction::Home => {
            app.exit_detail();
            apply_context(app, QueryContext::Catalog, event_tx);
        }
        _ => {}
    }
    Action::Continue
}

// ============================================================================
// Episode reader
// ============================================================================

fn handle_episode_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Action {
    let Some(action) = app
        .keybindings
        .action_for_key(code, modifiers, KbContext::Episode)
    else {
        return Action::Continue;
    };
    let Some(action) = handle_common_action(app, action) else {
        return Action::Continue;
    };

    match action {
        KbAction::Quit => return Action::Quit,
        KbAction::Back => app.exit_episode(),
        KbAction::ScrollDown | KbAction::NavDown => app.scroll_down(1),
        KbAction::ScrollUp | KbAction::NavUp => app.scroll_up(1),
        KbAction::PageDown => app.scroll_down(page_rows(app.episode_visible_lines)),
        KbAction::PageUp => app.scroll_up(page_rows(app.episode_visible_lines)),
        KbAction::PrevEpisode => match app.previous_episode() {
            Some(key) => show_episode(app, key, event_tx),
            None => app.set_status("This is the first episode"),
        },
        KbAction::NextEpisode => match app.next_episode() {
            Some(key) => show_episode(app, key, event_tx),
            None => app.set_status("No next episode"),
        },
        KbAction::WriteComment => {
            if !app.open_comment_form() {
                app.set_status("Wait for the episode to load");
            }
        }
        KbAction::Retry => {
            if let Some((key, generation)) = app.reload_episode() {
                spawn_episode_load(app, key, generation, event_tx);
            }
        }
        _ => {}
    }
    Action::Continue
}

// ============================================================================
// Comment form
// ============================================================================

fn handle_comment_form_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Action {
    match app
        .keybindings
        .action_for_key(code, modifiers, KbContext::CommentForm)
    {
        Some(KbAction::CancelComment) => app.comment_form = None,
        Some(KbAction::NextField) => {
            if let Some(form) = app.comment_form.as_mut() {
                form.field = form.field.next();
            }
        }
        Some(KbAction::SubmitComment) => submit_comment_form(app, event_tx),
        _ => {
            let Some(form) = app.comment_form.as_mut() else {
                return Action::Continue;
            };
            if form.submitting {
                return Action::Continue;
            }
            match code {
                KeyCode::Backspace => form.pop(),
                KeyCode::Char(c) if !modifiers.contains(KeyModifiers::CONTROL) => {
                    if !form.push(c) {
                        app.set_status("Field is full");
                    }
                }
                _ => {}
            }
        }
    }
    Action::Continue
}
