//! Helper functions for UI operations.
//!
//! Spawning of background loads and the glue between the scroll trigger and
//! the feed controller live here so input and event handlers share them.

use crate::app::{App, AppEvent, LoadState};
use crate::api::{EpisodeKey, Novel};
use crate::feed::{FetchError, FetchRequest, QueryContext};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tokio::sync::mpsc;

/// Wraps a future to catch panics and convert them to errors.
///
/// Instead of a spawned task silently disappearing, a panic becomes
/// `Err(String)` carrying the panic message.
///
/// # Example
///
/// ```ignore
/// tokio::spawn(async move {
///     match catch_task_panic(async { do_work().await }).await {
///         Ok(result) => handle_result(result),
///         Err(panic_msg) => {
///             tracing::error!(error = %panic_msg, "Task panicked");
///             let _ = tx.send(AppEvent::TaskPanicked { task: "work", error: panic_msg }).await;
///         }
///     }
/// });
/// ```
pub(super) async fn catch_task_panic<F, T>(future: F) -> Result<T, String>
where
    F: std::future::Future<Output = T>,
{
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(|panic| {
            if let Some(s) = panic.downcast_ref::<&'static str>() {
                s.to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else if let Some(e) = panic.downcast_ref::<Box<dyn std::error::Error + Send>>() {
                e.to_string()
            } else {
                format!("Unknown panic: {:?}", (*panic).type_id())
            }
        })
}

async fn send_event(tx: &mpsc::Sender<AppEvent>, event: AppEvent, what: &'static str) {
    if let Err(e) = tx.send(event).await {
        tracing::warn!(error = %e, task = what, "Failed to send result (receiver dropped)");
    }
}

// ============================================================================
// Catalog feed
// ============================================================================

/// Switch the catalog to `context` and start its first page.
pub(super) fn apply_context(app: &mut App, context: QueryContext, event_tx: &mpsc::Sender<AppEvent>) {
    tracing::info!(context = %context, "Switching catalog context");
    match app.set_query_context(context) {
        Some(request) => spawn_page_fetch(app, request, event_tx),
        None => tracing::debug!("Context unchanged, keeping current feed"),
    }
}

/// Run `request` on a background task and report it as `PageLoaded`.
///
/// A panic inside the fetch is reported both as `TaskPanicked` and as a
/// transport failure of the request, so the controller leaves `Loading`
/// and the user can retry.
pub(super) fn spawn_page_fetch(
    app: &mut App,
    request: FetchRequest,
    event_tx: &mpsc::Sender<AppEvent>,
) {
    let client = app.client.clone();
    let tx = event_tx.clone();

    tracing::debug!(
        context = %request.context,
        page = request.page,
        generation = request.generation(),
        "Spawning page fetch"
    );

    app.feed_handle = Some(tokio::spawn(async move {
        let result = match catch_task_panic(request.run::<Novel, _>(client.as_ref())).await {
            Ok(result) => result,
            Err(panic_msg) => {
                tracing::error!(error = %panic_msg, "Page fetch task panicked");
                send_event(
                    &tx,
                    AppEvent::TaskPanicked {
                        task: "page fetch",
                        error: panic_msg.clone(),
                    },
                    "page fetch",
                )
                .await;
                Err(FetchError::Transport(format!("task panicked: {}", panic_msg)))
            }
        };
        send_event(&tx, AppEvent::PageLoaded { request, result }, "page fetch").await;
    }));
}

/// Ask the controller for the next page if the catalog is scrolled near its
/// end. Called after anything that can move the viewport or change the feed.
pub(super) fn maybe_load_more(app: &mut App, event_tx: &mpsc::Sender<AppEvent>) {
    let metrics = app.catalog_metrics();
    if !app.scroll_trigger.should_fire(metrics, &app.feed) {
        return;
    }
    if let Some(request) = app.feed.request_next_page() {
        spawn_page_fetch(app, request, event_tx);
    }
}

/// Re-issue the failed page.
pub(super) fn retry_page(app: &mut App, event_tx: &mpsc::Sender<AppEvent>) -> bool {
    match app.feed.retry() {
        Some(request) => {
            spawn_page_fetch(app, request, event_tx);
            true
        }
        None => false,
    }
}

// ============================================================================
// Detail and episode loads
// ============================================================================

/// Load the detail page for `title`, superseding any earlier detail load.
pub(super) fn spawn_detail_load(
    app: &mut App,
    title: String,
    generation: u64,
    event_tx: &mpsc::Sender<AppEvent>,
) {
    if let Some(handle) = app.detail_handle.take() {
        handle.abort();
        tracing::debug!("Aborted previous detail load");
    }

    let client = app.client.clone();
    let tx = event_tx.clone();
    tracing::debug!(title = %title, generation, "Spawning detail load");

    app.detail_handle = Some(tokio::spawn(async move {
        match catch_task_panic(client.fetch_detail(&title)).await {
            Ok(result) => {
                let event = AppEvent::DetailLoaded {
                    title,
                    generation,
                    result,
                };
                send_event(&tx, event, "detail load").await;
            }
            Err(panic_msg) => {
                tracing::error!(error = %panic_msg, "Detail load task panicked");
                let event = AppEvent::TaskPanicked {
                    task: "detail load",
                    error: panic_msg,
                };
                send_event(&tx, event, "detail load").await;
            }
        }
    }));
}

pub(super) fn spawn_episode_load(
    app: &mut App,
    key: EpisodeKey,
    generation: u64,
    event_tx: &mpsc::Sender<AppEvent>,
) {
    if let Some(handle) = app.episode_handle.take() {
        handle.abort();
        tracing::debug!("Aborted previous episode load");
    }

    let client = app.client.clone();
    let tx = event_tx.clone();
    tracing::debug!(novel_id = %key.novel_id, episode = key.episode_no, generation, "Spawning episode load");

    app.episode_handle = Some(tokio::spawn(async move {
        match catch_task_panic(client.fetch_episode(&key)).await {
            Ok(result) => {
                let event = AppEvent::EpisodeLoaded {
                    key,
                    generation,
                    result,
                };
                send_event(&tx, event, "episode load").await;
            }
            Err(panic_msg) => {
                tracing::error!(error = %panic_msg, "Episode load task panicked");
                let event = AppEvent::TaskPanicked {
                    task: "episode load",
                    error: panic_msg,
                };
                send_event(&tx, event, "episode load").await;
            }
        }
    }));
}

/// Open `key` in the reader, fetching it only if it is a different episode.
pub(super) fn show_episode(app: &mut App, key: EpisodeKey, event_tx: &mpsc::Sender<AppEvent>) {
    if let Some(generation) = app.open_episode(key.clone()) {
        spawn_episode_load(app, key, generation, event_tx);
    }
}

// ============================================================================
// Comments
// ============================================================================

/// Validate the comment form and POST it in the background.
///
/// Blank fields are reported in the status bar and nothing is sent.
pub(super) fn submit_comment_form(app: &mut App, event_tx: &mpsc::Sender<AppEvent>) {
    let Some(key) = app.episode_key.clone() else {
        return;
    };
    let submission = match app.comment_form.as_ref() {
        Some(form) if !form.submitting => form.submission(&key),
        _ => return,
    };
    if let Some(field) = submission.missing_field() {
        app.set_status(format!("Please fill in the {} field", field));
        return;
    }
    if let Some(form) = app.comment_form.as_mut() {
        form.submitting = true;
    }

    let client = app.client.clone();
    let tx = event_tx.clone();
    tracing::debug!(novel_id = %key.novel_id, episode = key.episode_no, "Submitting comment");

    tokio::spawn(async move {
        let echo = submission.echo();
        match catch_task_panic(client.submit_comment(&submission)).await {
            Ok(result) => {
                let event = AppEvent::CommentPosted {
                    key,
                    result: result.map(|()| echo),
                };
                send_event(&tx, event, "comment submit").await;
            }
            Err(panic_msg) => {
                tracing::error!(error = %panic_msg, "Comment submit task panicked");
                let event = AppEvent::TaskPanicked {
                    task: "comment submit",
                    error: panic_msg,
                };
                send_event(&tx, event, "comment submit").await;
            }
        }
    });
}

// ============================================================================
// Browser
// ============================================================================

/// Open the web page of the novel in focus, after URL validation.
pub(super) fn open_in_browser(app: &mut App) {
    let Some(url) = app.browser_url() else {
        app.set_status("Nothing selected to open");
        return;
    };
    // SEC: Validate URL before open::that() to prevent command injection
    match crate::util::validate_url_for_open(url.as_str()) {
        Ok(url) => {
            if let Err(e) = open::that(url.as_str()) {
                app.set_status(format!("Failed to open browser: {}", e));
            }
        }
        Err(e) => app.set_status(e.to_string()),
    }
}

/// Mark a panicked load as failed so its spinner stops.
pub(super) fn fail_panicked_task(app: &mut App, task: &str, error: &str) {
    let message = format!("Internal error: {}", error);
    match task {
        "detail load" if app.detail.is_loading() => app.detail = LoadState::Failed(message),
        "episode load" if app.episode.is_loading() => app.episode = LoadState::Failed(message),
        "comment submit" => {
            if let Some(form) = app.comment_form.as_mut() {
                form.submitting = false;
            }
        }
        _ => {}
    }
}
