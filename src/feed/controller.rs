//! Fetch-on-demand pagination state machine.
//!
//! The controller never performs I/O itself. Every public operation that
//! starts a fetch returns a [`FetchRequest`]; the caller runs it against a
//! [`PageFetcher`] (inline or on a spawned task) and hands the outcome back
//! through [`FeedController::complete`]. The request carries the context and
//! generation it was issued under, which is how responses for a superseded
//! feed are recognized and dropped.

use super::fetcher::{ErrorKind, FetchError, PageFetcher};
use super::query::QueryContext;
use super::record_set::{Record, RecordSet};

/// Lifecycle status of the current feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStatus {
    /// Ready to fetch `page` on request.
    Idle,
    /// A fetch for `page` is in flight.
    Loading,
    /// The last fetch failed; `retry()` re-issues the same page.
    Error,
    /// An empty page arrived. Terminal until the context changes.
    Exhausted,
}

/// Everything the controller owns for one query context.
#[derive(Debug, Clone)]
pub struct FeedState<R: Record> {
    /// Next page to fetch, 1-based. Advances only on a non-empty page.
    pub page: u32,
    pub status: FeedStatus,
    pub records: RecordSet<R>,
    pub last_error: Option<FetchError>,
}

impl<R: Record> Default for FeedState<R> {
    fn default() -> Self {
        Self {
            page: 1,
            status: FeedStatus::Idle,
            records: RecordSet::new(),
            last_error: None,
        }
    }
}

/// A page fetch the caller must run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub context: QueryContext,
    pub page: u32,
    generation: u64,
}

impl FetchRequest {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Run this request against `fetcher`.
    pub async fn run<R, F>(&self, fetcher: &F) -> Result<Vec<R>, FetchError>
    where
        F: PageFetcher<R>,
    {
        fetcher.fetch_page(&self.context, self.page).await
    }
}

/// What applying a fetch outcome did to the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Non-empty page merged; `added` excludes duplicates of known ids.
    Merged { page: u32, added: usize },
    /// Empty page: the feed is now exhausted.
    Exhausted { page: u32 },
    /// Fetch failed; records and page are untouched.
    Failed(FetchError),
    /// Response belonged to a superseded request and was discarded.
    Stale,
}

/// Read-only projection consumed by the rendering layer.
#[derive(Debug)]
pub struct FeedView<'a, R> {
    pub items: &'a [R],
    pub is_loading_initial: bool,
    pub is_loading_more: bool,
    pub error_message: Option<String>,
    pub has_more: bool,
}

impl<R> FeedView<'_, R> {
    /// True when there is nothing to show but an error.
    pub fn is_initial_error(&self) -> bool {
        self.items.is_empty() && self.error_message.is_some()
    }
}

/// Drives fetch, merge and page advance for a single feed view.
#[derive(Debug)]
pub struct FeedController<R: Record> {
    context: Option<QueryContext>,
    state: FeedState<R>,
    /// Bumped on every context change; stamps outgoing requests.
    generation: u64,
    in_flight: Option<FetchRequest>,
    /// Bumped on every status transition. Lets observers detect "something
    /// happened since I last acted" without diffing state.
    revision: u64,
    error_dismissed: bool,
}

impl<R: Record> Default for FeedController<R> {
    fn default() -> Self {
        Self {
            context: None,
            state: FeedState::default(),
            generation: 0,
            in_flight: None,
            revision: 0,
            error_dismissed: false,
        }
    }
}

impl<R: Record> FeedController<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch to `context`, discarding the current feed, and request page 1.
    ///
    /// Returns `None` when `context` equals the current one.
    pub fn set_query_context(&mut self, context: QueryContext) -> Option<FetchRequest> {
        if self.context.as_ref() == Some(&context) {
            tracing::debug!(context = %context, "Query context unchanged, ignoring");
            return None;
        }

        if let Some(stale) = self.in_flight.take() {
            tracing::debug!(
                page = stale.page,
                generation = stale.generation,
                "Superseding in-flight request on context change"
            );
        }

        self.generation = self.generation.wrapping_add(1);
        self.state = FeedState::default();
        self.error_dismissed = false;
        self.revision = self.revision.wrapping_add(1);
        tracing::info!(context = %context, generation = self.generation, "Query context changed");
        self.context = Some(context);

        Some(self.begin_fetch())
    }

    /// Request the next page. No-op unless the feed is `Idle`.
    pub fn request_next_page(&mut self) -> Option<FetchRequest> {
        if self.context.is_none() || self.state.status != FeedStatus::Idle {
            return None;
        }
        Some(self.begin_fetch())
    }

    /// Re-issue the failed page. Only legal from `Error`.
    pub fn retry(&mut self) -> Option<FetchRequest> {
        if self.state.status != FeedStatus::Error {
            return None;
        }
        tracing::debug!(page = self.state.page, "Retrying failed page");
        Some(self.begin_fetch())
    }

    /// Hide the error indicator without leaving `Error`; `retry()` stays available.
    pub fn dismiss_error(&mut self) -> bool {
        if self.state.status == FeedStatus::Error && !self.error_dismissed {
            self.error_dismissed = true;
            return true;
        }
        false
    }

    /// Apply the outcome of `request`.
    ///
    /// Outcomes for anything other than the live in-flight request (older
    /// context, older generation, or a request already resolved) are
    /// discarded without touching state.
    pub fn complete(
        &mut self,
        request: &FetchRequest,
        result: Result<Vec<R>, FetchError>,
    ) -> Completion {
        if self.in_flight.as_ref() != Some(request)
            || self.context.as_ref() != Some(&request.context)
        {
            tracing::debug!(
                context = %request.context,
                page = request.page,
                generation = request.generation,
                live_generation = self.generation,
                "Dropping stale page response"
            );
            return Completion::Stale;
        }
        self.in_flight = None;
        self.revision = self.revision.wrapping_add(1);

        match result {
            Ok(records) if records.is_empty() => {
                self.state.status = FeedStatus::Exhausted;
                self.state.last_error = None;
                tracing::debug!(page = request.page, "Empty page, feed exhausted");
                Completion::Exhausted { page: request.page }
            }
            Ok(records) => {
                let received = records.len();
                let added = self.state.records.merge(records);
                self.state.page = self.state.page.saturating_add(1);
                self.state.status = FeedStatus::Idle;
                self.state.last_error = None;
                tracing::debug!(
                    page = request.page,
                    received,
                    added,
                    total = self.state.records.len(),
                    "Merged page"
                );
                Completion::Merged {
                    page: request.page,
                    added,
                }
            }
            Err(e) => {
                tracing::warn!(page = request.page, error = %e, "Page fetch failed");
                self.state.status = FeedStatus::Error;
                self.state.last_error = Some(e.clone());
                self.error_dismissed = false;
                Completion::Failed(e)
            }
        }
    }

    /// Run `request` against `fetcher` and apply the outcome.
    ///
    /// Convenience for callers that can hold the controller across the await.
    pub async fn fulfil<F>(&mut self, fetcher: &F, request: FetchRequest) -> Completion
    where
        F: PageFetcher<R>,
    {
        let result = request.run(fetcher).await;
        self.complete(&request, result)
    }

    pub fn context(&self) -> Option<&QueryContext> {
        self.context.as_ref()
    }

    pub fn state(&self) -> &FeedState<R> {
        &self.state
    }

    pub fn status(&self) -> FeedStatus {
        self.state.status
    }

    pub fn page(&self) -> u32 {
        self.state.page
    }

    pub fn records(&self) -> &RecordSet<R> {
        &self.state.records
    }

    pub fn last_error(&self) -> Option<ErrorKind> {
        self.state.last_error.as_ref().map(FetchError::kind)
    }

    pub fn has_more(&self) -> bool {
        self.state.status != FeedStatus::Exhausted
    }

    pub fn is_loading(&self) -> bool {
        self.state.status == FeedStatus::Loading
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn in_flight(&self) -> Option<&FetchRequest> {
        self.in_flight.as_ref()
    }

    pub fn view(&self) -> FeedView<'_, R> {
        let loading = self.state.status == FeedStatus::Loading;
        let error_message = match (&self.state.status, &self.state.last_error) {
            (FeedStatus::Error, Some(e)) if !self.error_dismissed => Some(e.user_message()),
            _ => None,
        };
        FeedView {
            items: self.state.records.as_slice(),
            is_loading_initial: loading && self.state.page == 1,
            is_loading_more: loading && self.state.page > 1,
            error_message,
            has_more: self.has_more(),
        }
    }

    fn begin_fetch(&mut self) -> FetchRequest {
        let context = self
            .context
            .clone()
            .unwrap_or_default();
        let request = FetchRequest {
            context,
            page: self.state.page,
            generation: self.generation,
        };
        self.state.status = FeedStatus::Loading;
        self.revision = self.revision.wrapping_add(1);
        self.in_flight = Some(request.clone());
        tracing::debug!(
            context = %request.context,
            page = request.page,
            generation = request.generation,
            "Requesting page"
        );
        request
    }
}
