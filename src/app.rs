use crate::api::{
    novel_page_url, ApiError, CatalogClient, Comment, CommentSubmission, EpisodeDetail,
    EpisodeKey, Novel, NovelDetail, GENRES,
};
use crate::config::Config;
use crate::feed::{
    FeedController, FetchError, FetchRequest, QueryContext, ScrollTrigger, ViewportMetrics,
};
use crate::keybindings::KeybindingRegistry;
use crate::theme::{StyleMap, ThemeVariant};
use ratatui::style::Style;
use std::borrow::Cow;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use url::Url;

/// Maximum scroll offset for the episode reader (ratatui u16 limit).
pub const MAX_SCROLL: usize = u16::MAX as usize;

/// Longest value accepted in any comment form field, in characters.
pub const MAX_COMMENT_FIELD_LENGTH: usize = 2000;

// ============================================================================
// View and Focus Enums
// ============================================================================

/// Current view mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Browse,  // Genre sidebar + catalog list
    Detail,  // One novel and its episodes
    Episode, // Full-screen episode reader with comments
}

/// Which panel has focus in Browse view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Genres,
    Catalog,
}

// ============================================================================
// Load State
// ============================================================================

/// Progress of a single-shot load (detail page, episode).
#[derive(Debug, Clone, PartialEq)]
pub enum LoadState<T> {
    Idle,
    Loading,
    Loaded(T),
    Failed(String),
}

impl<T> LoadState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn loaded(&self) -> Option<&T> {
        match self {
            Self::Loaded(value) => Some(value),
            _ => None,
        }
    }
}

impl<T> Default for LoadState<T> {
    fn default() -> Self {
        Self::Idle
    }
}

// ============================================================================
// Comment Form
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommentField {
    #[default]
    Name,
    Email,
    Comment,
}

impl CommentField {
    pub const ALL: [CommentField; 3] = [Self::Name, Self::Email, Self::Comment];

    /// Name → Email → Comment → Name.
    pub fn next(self) -> Self {
        match self {
            Self::Name => Self::Email,
            Self::Email => Self::Comment,
            Self::Comment => Self::Name,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Email => "Email",
            Self::Comment => "Comment",
        }
    }
}

/// Draft comment for the episode being read.
#[derive(Debug, Clone, Default)]
pub struct CommentForm {
    pub name: String,
    pub email: String,
    pub comment: String,
    pub field: CommentField,
    /// A POST is in flight; further submits are ignored.
    pub submitting: bool,
}

impl CommentForm {
    pub fn value(&self, field: CommentField) -> &str {
        match field {
            CommentField::Name => &self.name,
            CommentField::Email => &self.email,
            CommentField::Comment => &self.comment,
        }
    }

    fn focused_mut(&mut self) -> &mut String {
        match self.field {
            CommentField::Name => &mut self.name,
            CommentField::Email => &mut self.email,
            CommentField::Comment => &mut self.comment,
        }
    }

    /// Append to the focused field. Returns false when the field is full.
    pub fn push(&mut self, c: char) -> bool {
        let value = self.focused_mut();
        if value.chars().count() >= MAX_COMMENT_FIELD_LENGTH {
            return false;
        }
        value.push(c);
        true
    }

    pub fn pop(&mut self) {
        self.focused_mut().pop();
    }

    pub fn submission(&self, key: &EpisodeKey) -> CommentSubmission {
        CommentSubmission::new(key, &self.name, &self.email, &self.comment)
    }
}

// ============================================================================
// Events
// ============================================================================

/// Events from background tasks
#[derive(Debug)]
pub enum AppEvent {
    /// A catalog page fetch finished. The request is handed back so the
    /// controller can tell live responses from superseded ones.
    PageLoaded {
        request: FetchRequest,
        result: Result<Vec<Novel>, FetchError>,
    },
    DetailLoaded {
        title: String,
        generation: u64,
        result: Result<NovelDetail, ApiError>,
    },
    EpisodeLoaded {
        key: EpisodeKey,
        generation: u64,
        result: Result<EpisodeDetail, ApiError>,
    },
    /// Comment POST finished; `Ok` carries the local echo to prepend.
    CommentPosted {
        key: EpisodeKey,
        result: Result<Comment, ApiError>,
    },
    /// A background task panicked.
    ///
    /// Sent by `catch_task_panic` wrappers so the UI can surface the failure
    /// instead of leaving a load spinner running forever.
    TaskPanicked { task: &'static str, error: String },
}

// ============================================================================
// Application State
// ============================================================================

/// Central application state
pub struct App {
    pub client: Arc<CatalogClient>,
    /// Public site root for "open in browser".
    pub site_url: String,

    // Theme
    pub theme_variant: ThemeVariant,
    pub theme: StyleMap,

    pub keybindings: KeybindingRegistry,

    // Catalog feed
    /// The one feed controller. Every query context change goes through it.
    pub feed: FeedController<Novel>,
    pub scroll_trigger: ScrollTrigger,
    pub feed_handle: Option<JoinHandle<()>>,
    pub selected_novel: usize,
    /// First visible catalog row, written back by the renderer.
    pub catalog_offset: usize,
    /// Catalog rows that fit in the panel, written back by the renderer.
    pub catalog_visible_rows: usize,

    // Genres
    pub show_genres: bool,
    pub genre_selected: usize,

    // UI State
    pub view: View,
    pub focus: Focus,

    // Search
    pub search_mode: bool,
    pub search_input: String,

    // Detail
    pub detail_novel: Option<Novel>,
    pub detail: LoadState<NovelDetail>,
    /// Index into the detail's (descending) episode list.
    pub detail_selected: usize,
    pub detail_generation: u64,
    pub detail_handle: Option<JoinHandle<()>>,

    // Episode reader
    pub episode_key: Option<EpisodeKey>,
    pub episode: LoadState<EpisodeDetail>,
    pub episode_generation: u64,
    pub episode_handle: Option<JoinHandle<()>>,
    pub scroll_offset: usize,
    /// Text rows in the viewport (area height minus borders).
    pub episode_visible_lines: usize,
    /// Wrapped rows of the whole episode document at the current width.
    pub episode_content_rows: usize,
    pub comment_form: Option<CommentForm>,

    pub status_message: Option<(Cow<'static, str>, Instant)>,
    pub needs_redraw: bool,
    /// Current frame of the loading spinner animation.
    pub spinner_frame: usize,
    pub show_help: bool,
    pub help_scroll_offset: usize,
}

impl App {
    pub fn new(client: Arc<CatalogClient>, config: &Config) -> Self {
        let theme_variant = ThemeVariant::from_str_name(&config.theme).unwrap_or_else(|| {
            tracing::warn!(theme = %config.theme, "Unknown theme, falling back to dark");
            ThemeVariant::Dark
        });

        let mut keybindings = KeybindingRegistry::new();
        for warning in keybindings.apply_overrides(&config.keybindings) {
            tracing::warn!(warning = %warning, "Ignoring keybinding override");
        }

        Self {
            client,
            site_url: config.site_url.clone(),
            theme_variant,
            theme: StyleMap::from_palette(&theme_variant.palette()),
            keybindings,
            feed: FeedController::new(),
            scroll_trigger: ScrollTrigger::new(u32::from(config.scroll_threshold)),
            feed_handle: None,
            selected_novel: 0,
            catalog_offset: 0,
            catalog_visible_rows: 0,
            show_genres: true,
            genre_selected: 0,
            view: View::Browse,
            focus: Focus::Catalog,
            search_mode: false,
            search_input: String::new(),
            detail_novel: None,
            detail: LoadState::Idle,
            detail_selected: 0,
            detail_generation: 0,
            detail_handle: None,
            episode_key: None,
            episode: LoadState::Idle,
            episode_generation: 0,
            episode_handle: None,
            scroll_offset: 0,
            episode_visible_lines: 0,
            episode_content_rows: 0,
            comment_form: None,
            status_message: None,
            needs_redraw: true,
            spinner_frame: 0,
            show_help: false,
            help_scroll_offset: 0,
        }
    }

    /// Resolve a semantic role name to its `Style`.
    pub fn style(&self, role: &str) -> Style {
        self.theme.resolve(role)
    }

    pub fn set_theme(&mut self, variant: ThemeVariant) {
        self.theme_variant = variant;
        self.theme = StyleMap::from_palette(&variant.palette());
        self.needs_redraw = true;
    }

    /// Cycle to the next theme variant and return its name.
    pub fn cycle_theme(&mut self) -> &'static str {
        let next = self.theme_variant.next();
        self.set_theme(next);
        next.name()
    }

    pub fn set_status(&mut self, msg: impl Into<Cow<'static, str>>) {
        self.status_message = Some((msg.into(), Instant::now()));
    }

    /// Clear status message if expired (older than 3 seconds)
    /// Returns true if a message was actually cleared
    pub fn clear_expired_status(&mut self) -> bool {
        if let Some((_, time)) = &self.status_message {
            if time.elapsed().as_secs() >= 3 {
                self.status_message = None;
                return true;
            }
        }
        false
    }

    // ------------------------------------------------------------------------
    // Catalog feed
    // ------------------------------------------------------------------------

    /// Switch the catalog to `context`.
    ///
    /// Returns the first-page request to run, or `None` when `context` is
    /// already showing. On a real switch the selection and the scroll
    /// trigger start over, and any fetch still running for the old context
    /// is aborted.
    pub fn set_query_context(&mut self, context: QueryContext) -> Option<FetchRequest> {
        let request = self.feed.set_query_context(context)?;
        if let Some(handle) = self.feed_handle.take() {
            handle.abort();
            tracing::debug!("Aborted page fetch for previous context");
        }
        self.selected_novel = 0;
        self.catalog_offset = 0;
        self.scroll_trigger.reset();
        if let Some(idx) = self
            .active_genre()
            .and_then(|genre| GENRES.iter().position(|g| *g == genre))
        {
            self.genre_selected = idx;
        }
        self.needs_redraw = true;
        Some(request)
    }

    /// Genre of the current `TypeFilter` context, if any.
    pub fn active_genre(&self) -> Option<&str> {
        self.feed.context().and_then(QueryContext::genre)
    }

    pub fn selected_novel(&self) -> Option<&Novel> {
        self.feed.records().get(self.selected_novel)
    }

    /// Scroll position of the catalog list, for the load-more trigger.
    pub fn catalog_metrics(&self) -> ViewportMetrics {
        ViewportMetrics::new(
            saturating_u32(self.catalog_offset),
            saturating_u32(self.catalog_visible_rows),
            saturating_u32(self.feed.records().len()),
        )
    }

    /// Keep the catalog selection inside the record list.
    pub fn clamp_selections(&mut self) {
        let len = self.feed.records().len();
        self.selected_novel = self.selected_novel.min(len.saturating_sub(1));
        let episodes = self.detail.loaded().map_or(0, |d| d.viewer_counts.len());
        self.detail_selected = self.detail_selected.min(episodes.saturating_sub(1));
    }

    // ------------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------------

    /// Navigate up in current list
    pub fn nav_up(&mut self) {
        match (self.view, self.focus) {
            (View::Browse, Focus::Genres) => {
                self.genre_selected = self.genre_selected.saturating_sub(1);
            }
            (View::Browse, Focus::Catalog) => {
                self.selected_novel = self.selected_novel.saturating_sub(1);
            }
            (View::Detail, _) => {
                self.detail_selected = self.detail_selected.saturating_sub(1);
            }
            (View::Episode, _) => self.scroll_up(1),
        }
    }

    /// Navigate down in current list
    pub fn nav_down(&mut self) {
        match (self.view, self.focus) {
            (View::Browse, Focus::Genres) => {
                let max_index = GENRES.len().saturating_sub(1);
                self.genre_selected = self.genre_selected.saturating_add(1).min(max_index);
            }
            (View::Browse, Focus::Catalog) => {
                let len = self.feed.records().len();
                if len > 0 {
                    self.selected_novel = self.selected_novel.saturating_add(1).min(len - 1);
                }
            }
            (View::Detail, _) => {
                let len = self.detail.loaded().map_or(0, |d| d.viewer_counts.len());
                if len > 0 {
                    self.detail_selected = self.detail_selected.saturating_add(1).min(len - 1);
                }
            }
            (View::Episode, _) => self.scroll_down(1),
        }
    }

    /// Move the catalog selection by a page of rows.
    pub fn page_down(&mut self, rows: usize) {
        let len = self.feed.records().len();
        if len > 0 {
            self.selected_novel = self.selected_novel.saturating_add(rows).min(len - 1);
        }
    }

    pub fn page_up(&mut self, rows: usize) {
        self.selected_novel = self.selected_novel.saturating_sub(rows);
    }

    // ------------------------------------------------------------------------
    // Detail view
    // ------------------------------------------------------------------------

    /// Open the detail view for the selected novel.
    ///
    /// Returns the title to load and the generation stamped on the load, or
    /// `None` when nothing is selected.
    pub fn enter_detail(&mut self) -> Option<(String, u64)> {
        let novel = self.selected_novel()?.clone();
        let title = novel.title.clone();
        self.detail_novel = Some(novel);
        self.detail = LoadState::Loading;
        self.detail_selected = 0;
        self.detail_generation = self.detail_generation.wrapping_add(1);
        self.view = View::Detail;
        Some((title, self.detail_generation))
    }

    pub fn exit_detail(&mut self) {
        self.view = View::Browse;
    }

    /// Episode number under the detail cursor.
    pub fn selected_episode_no(&self) -> Option<u32> {
        self.detail
            .loaded()?
            .viewer_counts
            .get(self.detail_selected)
            .map(|v| v.episode_no)
    }

    // ------------------------------------------------------------------------
    // Episode reader
    // ------------------------------------------------------------------------

    /// Show the episode reader for `key`.
    ///
    /// Returns the generation to stamp on a new load, or `None` when `key` is
    /// the episode already loaded or loading. The fetch is keyed on
    /// (novel, episode) only, so re-entering the same episode reuses it.
    pub fn open_episode(&mut self, key: EpisodeKey) -> Option<u64> {
        self.view = View::Episode;
        self.comment_form = None;
        if self.episode_key.as_ref() == Some(&key) {
            return None;
        }
        self.episode_key = Some(key);
        self.episode = LoadState::Loading;
        self.scroll_offset = 0;
        self.episode_content_rows = 0;
        self.episode_generation = self.episode_generation.wrapping_add(1);
        Some(self.episode_generation)
    }

    /// Re-issue the load of the current episode.
    pub fn reload_episode(&mut self) -> Option<(EpisodeKey, u64)> {
        let key = self.episode_key.clone()?;
        self.episode = LoadState::Loading;
        self.episode_generation = self.episode_generation.wrapping_add(1);
        Some((key, self.episode_generation))
    }

    pub fn previous_episode(&self) -> Option<EpisodeKey> {
        self.episode_key.as_ref()?.previous()
    }

    /// Next episode, once the current one has reported its episode count.
    pub fn next_episode(&self) -> Option<EpisodeKey> {
        let count = self.episode.loaded()?.episode_count;
        self.episode_key.as_ref()?.next(count)
    }

    /// Leave the reader for the detail view it was opened from.
    pub fn exit_episode(&mut self) {
        self.comment_form = None;
        self.view = if self.detail_novel.is_some() {
            View::Detail
        } else {
            View::Browse
        };
    }

    /// Scroll up in episode reader
    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    /// Scroll down in episode reader, stopping at the last page.
    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_add(lines);
        self.clamp_scroll(self.episode_content_rows, self.episode_visible_lines);
    }

    /// Clamp scroll offset so the last page of content stays on screen.
    pub fn clamp_scroll(&mut self, content_lines: usize, visible_lines: usize) {
        let max_scroll = content_lines.saturating_sub(visible_lines);
        self.scroll_offset = self.scroll_offset.min(max_scroll).min(MAX_SCROLL);
    }

    // ------------------------------------------------------------------------
    // Comments
    // ------------------------------------------------------------------------

    /// Open the comment form. Only possible once the episode has loaded.
    pub fn open_comment_form(&mut self) -> bool {
        if self.episode.loaded().is_none() {
            return false;
        }
        if self.comment_form.is_none() {
            self.comment_form = Some(CommentForm::default());
        }
        true
    }

    /// Prepend a posted comment to the episode it was posted on.
    ///
    /// Returns false when the reader has since moved to another episode.
    pub fn prepend_comment(&mut self, key: &EpisodeKey, comment: Comment) -> bool {
        if self.episode_key.as_ref() != Some(key) {
            return false;
        }
        match &mut self.episode {
            LoadState::Loaded(detail) => {
                detail.comments.insert(0, comment);
                true
            }
            _ => false,
        }
    }

    // ------------------------------------------------------------------------
    // Misc
    // ------------------------------------------------------------------------

    /// Web page of the novel in focus for the current view.
    pub fn browser_url(&self) -> Option<Url> {
        let title = match self.view {
            View::Browse => &self.selected_novel()?.title,
            View::Detail | View::Episode => &self.detail_novel.as_ref()?.title,
        };
        novel_page_url(&self.site_url, title)
    }

    /// True while any load the user is waiting on is running.
    pub fn is_busy(&self) -> bool {
        self.feed.is_loading()
            || self.detail.is_loading()
            || self.episode.is_loading()
            || self.comment_form.as_ref().is_some_and(|f| f.submitting)
    }
}

fn saturating_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

// ============================================================================
// Resource Cleanup
// ============================================================================

/// Abort all in-flight tasks so nothing outlives the event loop.
impl Drop for App {
    fn drop(&mut self) {
        for (name, handle) in [
            ("page fetch", self.feed_handle.take()),
            ("detail load", self.detail_handle.take()),
            ("episode load", self.episode_handle.take()),
        ] {
            if let Some(handle) = handle {
                handle.abort();
                tracing::debug!(task = name, "Aborted task on App drop");
            }
        }
    }
}
