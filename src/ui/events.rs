//! Application event handling.
//!
//! This module applies the results of background tasks (page fetches,
//! detail and episode loads, comment posts) to application state.

use crate::app::{App, AppEvent, LoadState, View};
use crate::feed::Completion;
use tokio::sync::mpsc;

use super::helpers::{fail_panicked_task, maybe_load_more};

/// Handle application events from background tasks.
pub(super) fn handle_app_event(app: &mut App, event: AppEvent, event_tx: &mpsc::Sender<AppEvent>) {
    match event {
        AppEvent::PageLoaded { request, result } => {
            let completion = app.feed.complete(&request, result);
            handle_page_completion(app, completion);
            // A short first page may not fill the viewport
            maybe_load_more(app, event_tx);
        }
        AppEvent::DetailLoaded {
            title,
            generation,
            result,
        } => {
            if generation != app.detail_generation {
                tracing::debug!(
                    title = %title,
                    generation,
                    current = app.detail_generation,
                    "Dropping stale detail load"
                );
                return;
            }
            app.detail_handle = None;
            app.detail = match result {
                Ok(detail) => {
                    tracing::debug!(title = %title, episodes = detail.viewer_counts.len(), "Detail loaded");
                    LoadState::Loaded(detail)
                }
                Err(e) => {
                    tracing::warn!(title = %title, error = %e, "Detail load failed");
                    LoadState::Failed(e.user_message())
                }
            };
            app.clamp_selections();
        }
        AppEvent::EpisodeLoaded {
            key,
            generation,
            result,
        } => {
            if generation != app.episode_generation || app.episode_key.as_ref() != Some(&key) {
                tracing::debug!(
                    novel_id = %key.novel_id,
                    episode = key.episode_no,
                    generation,
                    current = app.episode_generation,
                    "Dropping stale episode load"
                );
                return;
            }
            app.episode_handle = None;
            app.episode = match result {
                Ok(detail) => LoadState::Loaded(detail),
                Err(e) => {
                    tracing::warn!(
                        novel_id = %key.novel_id,
                        episode = key.episode_no,
                        error = %e,
                        "Episode load failed"
                    );
                    LoadState::Failed(e.user_message())
                }
            };
        }
        AppEvent::CommentPosted { key, result } => match result {
            Ok(echo) => {
                app.prepend_comment(&key, echo);
                if app.episode_key.as_ref() == Some(&key) {
                    app.comment_form = None;
                }
                app.set_status("Comment posted");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Comment submission failed");
                if let Some(form) = app.comment_form.as_mut() {
                    form.submitting = false;
                }
                app.set_status(format!("Comment failed: {}", e.user_message()));
            }
        },
        AppEvent::TaskPanicked { task, error } => {
            tracing::error!(task = task, error = %error, "Background task panicked");
            fail_panicked_task(app, task, &error);
            app.set_status(format!("Internal error in {}: {}", task, error));
        }
    }
}

/// Reflect a page completion in the selection and the status bar.
fn handle_page_completion(app: &mut App, completion: Completion) {
    match completion {
        Completion::Merged { page, added } => {
            tracing::debug!(page, added, total = app.feed.records().len(), "Catalog page merged");
            app.feed_handle = None;
        }
        Completion::Exhausted { page } => {
            tracing::debug!(page, "Catalog exhausted");
            app.feed_handle = None;
        }
        Completion::Failed(e) => {
            app.feed_handle = None;
            // The list keeps its records; the footer carries the retry hint
            if !app.feed.records().is_empty() && app.view != View::Browse {
                app.set_status(e.user_message());
            }
        }
        Completion::Stale => {}
    }
    app.clamp_selections();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{
        ApiError, CatalogClient, Comment, EpisodeBody, EpisodeDetail, EpisodeKey, Novel, NovelId,
    };
    use crate::app::CommentForm;
    use crate::config::Config;
    use crate::feed::{FeedStatus, FetchError, QueryContext};
    use std::sync::Arc;
    use std::time::Duration;

    fn test_app() -> App {
        let client =
            CatalogClient::new("http://127.0.0.1:9/api", None, Duration::from_secs(1)).unwrap();
        App::new(Arc::new(client), &Config::default())
    }

    fn novels(ids: &[u64]) -> Vec<Novel> {
        ids.iter()
            .map(|&id| Novel {
                id: NovelId::from(id),
                title: format!("novel {}", id),
                img: None,
            })
            .collect()
    }

    fn channel() -> (mpsc::Sender<AppEvent>, mpsc::Receiver<AppEvent>) {
        mpsc::channel(16)
    }

    #[tokio::test]
    async fn test_page_loaded_merges_records() {
        let (tx, _rx) = channel();
        let mut app = test_app();
        let request = app.set_query_context(QueryContext::Catalog).unwrap();
        // Viewport far from the end so no follow-up fetch is spawned
        app.catalog_visible_rows = 1;
        app.scroll_trigger = crate::feed::ScrollTrigger::new(0);

        handle_app_event(
            &mut app,
            AppEvent::PageLoaded {
                request,
                result: Ok(novels(&[1, 2, 3])),
            },
            &tx,
        );

        assert_eq!(app.feed.records().len(), 3);
        assert_eq!(app.feed.page(), 2);
        assert_eq!(app.feed.status(), FeedStatus::Idle);
    }

    #[tokio::test]
    async fn test_stale_page_is_ignored() {
        let (tx, _rx) = channel();
        let mut app = test_app();
        let old = app.set_query_context(QueryContext::Catalog).unwrap();
        let _current = app
            .set_query_context(QueryContext::type_filter("판타지"))
            .unwrap();

        handle_app_event(
            &mut app,
            AppEvent::PageLoaded {
                request: old,
                result: Ok(novels(&[1, 2])),
            },
            &tx,
        );

        assert!(app.feed.records().is_empty());
        assert_eq!(app.feed.status(), FeedStatus::Loading);
    }

    #[tokio::test]
    async fn test_page_failure_sets_error() {
        let (tx, _rx) = channel();
        let mut app = test_app();
        let request = app.set_query_context(QueryContext::Catalog).unwrap();

        handle_app_event(
            &mut app,
            AppEvent::PageLoaded {
                request,
                result: Err(FetchError::Server(503)),
            },
            &tx,
        );

        assert_eq!(app.feed.status(), FeedStatus::Error);
        assert!(app.feed.view().is_initial_error());
    }

    #[tokio::test]
    async fn test_stale_detail_dropped() {
        let (tx, _rx) = channel();
        let mut app = test_app();
        app.detail_generation = 2;
        app.detail = LoadState::Loading;

        handle_app_event(
            &mut app,
            AppEvent::DetailLoaded {
                title: "old".to_string(),
                generation: 1,
                result: Err(ApiError::InvalidInput("title")),
            },
            &tx,
        );

        assert!(app.detail.is_loading());
    }

    #[tokio::test]
    async fn test_episode_failure_shown() {
        let (tx, _rx) = channel();
        let mut app = test_app();
        let key = EpisodeKey::new(NovelId::from(1u64), 2);
        let generation = app.open_episode(key.clone()).unwrap();

        handle_app_event(
            &mut app,
            AppEvent::EpisodeLoaded {
                key,
                generation,
                result: Err(ApiError::Request(FetchError::Server(404))),
            },
            &tx,
        );

        assert!(matches!(app.episode, LoadState::Failed(_)));
    }

    #[tokio::test]
    async fn test_comment_posted_prepends_and_clears_form() {
        let (tx, _rx) = channel();
        let mut app = test_app();
        let key = EpisodeKey::new(NovelId::from(1u64), 1);
        app.open_episode(key.clone());
        app.episode = LoadState::Loaded(EpisodeDetail {
            episode: EpisodeBody {
                episode_titles: None,
                description: String::new(),
            },
            episode_count: 1,
            count: 0,
            title: String::new(),
            description: String::new(),
            comments: vec![Comment {
                name: "a".to_string(),
                comment: "old".to_string(),
            }],
        });
        app.comment_form = Some(CommentForm {
            submitting: true,
            ..CommentForm::default()
        });

        handle_app_event(
            &mut app,
            AppEvent::CommentPosted {
                key,
                result: Ok(Comment {
                    name: "b".to_string(),
                    comment: "new".to_string(),
                }),
            },
            &tx,
        );

        let comments = &app.episode.loaded().unwrap().comments;
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].comment, "new");
        assert!(app.comment_form.is_none());
    }

    #[tokio::test]
    async fn test_comment_failure_keeps_form() {
        let (tx, _rx) = channel();
        let mut app = test_app();
        let key = EpisodeKey::new(NovelId::from(1u64), 1);
        app.open_episode(key.clone());
        app.comment_form = Some(CommentForm {
            name: "me".to_string(),
            submitting: true,
            ..CommentForm::default()
        });

        handle_app_event(
            &mut app,
            AppEvent::CommentPosted {
                key,
                result: Err(ApiError::Request(FetchError::Server(500))),
            },
            &tx,
        );

        let form = app.comment_form.as_ref().unwrap();
        assert_eq!(form.name, "me");
        assert!(!form.submitting);
        assert!(app.status_message.is_some());
    }

    #[tokio::test]
    async fn test_task_panic_stops_detail_spinner() {
        let (tx, _rx) = channel();
        let mut app = test_app();
        app.detail = LoadState::Loading;

        handle_app_event(
            &mut app,
            AppEvent::TaskPanicked {
                task: "detail load",
                error: "boom".to_string(),
            },
            &tx,
        );

        assert!(matches!(app.detail, LoadState::Failed(_)));
    }
}
