//! Keybinding registry: maps actions to key events with config overrides.
//!
//! Bindings are data, not match arms, so users can remap them from
//! config.toml.
use crossterm::event::{KeyCode, KeyModifiers};
use std::collections::HashMap;

// ============================================================================
// Action Enum
// ============================================================================

/// All user-facing actions that can be triggered by keybindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Quit,
    NavDown,
    NavUp,
    CycleFocus,
    Back,
    Select,
    Home,
    ToggleGenres,
    EnterSearch,
    ExitSearch,
    CommitSearch,
    Retry,
    DismissError,
    OpenInBrowser,
    ScrollDown,
    ScrollUp,
    PageDown,
    PageUp,
    PrevEpisode,
    NextEpisode,
    WriteComment,
    NextField,
    SubmitComment,
    CancelComment,
    CycleTheme,
    ShowHelp,
}

impl Action {
    /// Human-readable description for the help screen.
    pub fn describe(self) -> &'static str {
        match self {
            Self::Quit => "Quit application",
            Self::NavDown => "Navigate down",
            Self::NavUp => "Navigate up",
            Self::CycleFocus => "Cycle panel focus",
            Self::Back => "Go back / dismiss",
            Self::Select => "Select / open",
            Self::Home => "Back to the full catalog",
            Self::ToggleGenres => "Toggle genre panel",
            Self::EnterSearch => "Search novels",
            Self::ExitSearch => "Cancel search",
            Self::CommitSearch => "Run search",
            Self::Retry => "Retry failed load",
            Self::DismissError => "Dismiss error",
            Self::OpenInBrowser => "Open in browser",
            Self::ScrollDown => "Scroll down one line",
            Self::ScrollUp => "Scroll up one line",
            Self::PageDown => "Page down",
            Self::PageUp => "Page up",
            Self::PrevEpisode => "Previous episode",
            Self::NextEpisode => "Next episode",
            Self::WriteComment => "Write a comment",
            Self::NextField => "Next form field",
            Self::SubmitComment => "Submit comment",
            Self::CancelComment => "Close comment form",
            Self::CycleTheme => "Cycle theme",
            Self::ShowHelp => "Show help",
        }
    }
}

// ============================================================================
// Context Enum
// ============================================================================

/// Dispatch context; determines which bindings are active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Context {
    Global,
    Genres,
    Catalog,
    Detail,
    Episode,
    Search,
    CommentForm,
}

impl Context {
    /// Section heading on the help screen.
    pub fn title(self) -> &'static str {
        match self {
            Self::Global => "Global",
            Self::Genres => "Genres",
            Self::Catalog => "Novel List",
            Self::Detail => "Novel Detail",
            Self::Episode => "Episode Reader",
            Self::Search => "Search",
            Self::CommentForm => "Comment Form",
        }
    }
}

// ============================================================================
// Key Specification
// ============================================================================

/// A key event: code + modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeySpec {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeySpec {
    pub const fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    pub const fn plain(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::NONE)
    }

    pub const fn ch(c: char) -> Self {
        Self::plain(KeyCode::Char(c))
    }

    pub const fn ctrl(c: char) -> Self {
        Self::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }
}

/// Parse a key string from config into a KeySpec.
///
/// Accepts single characters ("q", "/"), named keys ("Enter", "PageDown"),
/// `Ctrl+<char>` and function keys "F1" through "F12".
fn parse_key_string(s: &str) -> Option<KeySpec> {
    let s = s.trim();

    if let Some(rest) = s.strip_prefix("Ctrl+") {
        let mut chars = rest.trim().chars();
        return match (chars.next(), chars.next()) {
            (Some(c), None) => Some(KeySpec::ctrl(c)),
            _ => None,
        };
    }

    let named = match s.to_lowercase().as_str() {
        "enter" | "return" => Some(KeyCode::Enter),
        "esc" | "escape" => Some(KeyCode::Esc),
        "tab" => Some(KeyCode::Tab),
        "up" => Some(KeyCode::Up),
        "down" => Some(KeyCode::Down),
        "left" => Some(KeyCode::Left),
        "right" => Some(KeyCode::Right),
        "pageup" => Some(KeyCode::PageUp),
        "pagedown" => Some(KeyCode::PageDown),
        "home" => Some(KeyCode::Home),
        "end" => Some(KeyCode::End),
        "backspace" => Some(KeyCode::Backspace),
        "space" => Some(KeyCode::Char(' ')),
        _ => None,
    };
    if let Some(code) = named {
        return Some(KeySpec::plain(code));
    }

    if let Some(n) = s
        .strip_prefix(['F', 'f'])
        .and_then(|rest| rest.parse::<u8>().ok())
    {
        return (1..=12).contains(&n).then(|| KeySpec::plain(KeyCode::F(n)));
    }

    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(KeySpec::ch(c)),
        _ => None,
    }
}

/// Format a KeySpec for the help screen.
fn format_key(key: &KeySpec) -> String {
    let modifier = if key.modifiers.contains(KeyModifiers::CONTROL) {
        "Ctrl+"
    } else {
        ""
    };

    let key_name = match key.code {
        KeyCode::Char(' ') => "Space".to_string(),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::Esc => "Esc".to_string(),
        KeyCode::Tab => "Tab".to_string(),
        KeyCode::Up => "Up".to_string(),
        KeyCode::Down => "Down".to_string(),
        KeyCode::Left => "Left".to_string(),
        KeyCode::Right => "Right".to_string(),
        KeyCode::PageUp => "PageUp".to_string(),
        KeyCode::PageDown => "PageDown".to_string(),
        KeyCode::Home => "Home".to_string(),
        KeyCode::End => "End".to_string(),
        KeyCode::Backspace => "Backspace".to_string(),
        KeyCode::F(n) => format!("F{}", n),
        _ => "?".to_string(),
    };

    format!("{}{}", modifier, key_name)
}

// ============================================================================
// Default Bindings
// ============================================================================

const DEFAULT_BINDINGS: &[(Context, KeySpec, Action)] = &[
    // Browse
    (Context::Global, KeySpec::ch('q'), Action::Quit),
    (Context::Global, KeySpec::ch('j'), Action::NavDown),
    (Context::Global, KeySpec::plain(KeyCode::Down), Action::NavDown),
    (Context::Global, KeySpec::ch('k'), Action::NavUp),
    (Context::Global, KeySpec::plain(KeyCode::Up), Action::NavUp),
    (Context::Global, KeySpec::ctrl('d'), Action::PageDown),
    (Context::Global, KeySpec::plain(KeyCode::PageDown), Action::PageDown),
    (Context::Global, KeySpec::ctrl('u'), Action::PageUp),
    (Context::Global, KeySpec::plain(KeyCode::PageUp), Action::PageUp),
    (Context::Global, KeySpec::plain(KeyCode::Tab), Action::CycleFocus),
    (Context::Global, KeySpec::plain(KeyCode::Esc), Action::Back),
    (Context::Global, KeySpec::plain(KeyCode::Enter), Action::Select),
    (Context::Global, KeySpec::ch('H'), Action::Home),
    (Context::Global, KeySpec::ch('g'), Action::ToggleGenres),
    (Context::Global, KeySpec::ch('/'), Action::EnterSearch),
    (Context::Global, KeySpec::ch('r'), Action::Retry),
    (Context::Global, KeySpec::ch('x'), Action::DismissError),
    (Context::Global, KeySpec::ch('o'), Action::OpenInBrowser),
    (Context::Global, KeySpec::ch('T'), Action::CycleTheme),
    (Context::Global, KeySpec::ch('?'), Action::ShowHelp),
    // Detail
    (Context::Detail, KeySpec::ch('b'), Action::Back),
    // Episode reader
    (Context::Episode, KeySpec::ch('b'), Action::Back),
    (Context::Episode, KeySpec::ch('j'), Action::ScrollDown),
    (Context::Episode, KeySpec::plain(KeyCode::Down), Action::ScrollDown),
    (Context::Episode, KeySpec::ch('k'), Action::ScrollUp),
    (Context::Episode, KeySpec::plain(KeyCode::Up), Action::ScrollUp),
    (Context::Episode, KeySpec::ch('h'), Action::PrevEpisode),
    (Context::Episode, KeySpec::plain(KeyCode::Left), Action::PrevEpisode),
    (Context::Episode, KeySpec::ch('l'), Action::NextEpisode),
    (Context::Episode, KeySpec::plain(KeyCode::Right), Action::NextEpisode),
    (Context::Episode, KeySpec::ch('c'), Action::WriteComment),
    (Context::Episode, KeySpec::ch('o'), Action::OpenInBrowser),
    // Search prompt
    (Context::Search, KeySpec::plain(KeyCode::Esc), Action::ExitSearch),
    (Context::Search, KeySpec::plain(KeyCode::Enter), Action::CommitSearch),
    // Comment form
    (Context::CommentForm, KeySpec::plain(KeyCode::Tab), Action::NextField),
    (Context::CommentForm, KeySpec::plain(KeyCode::Enter), Action::SubmitComment),
    (Context::CommentForm, KeySpec::plain(KeyCode::Esc), Action::CancelComment),
];

// ============================================================================
// Keybinding Registry
// ============================================================================

/// Registry of keybindings, supporting default bindings and config overrides.
///
/// The same key can map to different actions in different contexts; lookups
/// fall back to `Global` when the specific context has no binding.
pub struct KeybindingRegistry {
    lookup: HashMap<(Context, KeySpec), Action>,
    /// All bindings in registration order, for the help screen.
    bindings: Vec<(Context, KeySpec, Action)>,
}

impl KeybindingRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            lookup: HashMap::new(),
            bindings: Vec::with_capacity(DEFAULT_BINDINGS.len()),
        };
        for &(context, key, action) in DEFAULT_BINDINGS {
            registry.bind(context, key, action);
        }
        registry
    }

    fn bind(&mut self, context: Context, key: KeySpec, action: Action) {
        self.lookup.insert((context, key), action);
        self.bindings.push((context, key, action));
    }

    /// Apply user overrides from the config `[keybindings]` table.
    ///
    /// Keys are action names ("quit", "next_episode"), values are key strings
    /// ("q", "Ctrl+d", "F5"). The new key replaces every default binding of
    /// that action, in the same contexts.
    ///
    /// Returns warnings for unknown actions or unparseable keys.
    pub fn apply_overrides(&mut self, overrides: &HashMap<String, String>) -> Vec<String> {
        let mut warnings = Vec::new();

        for (action_name, key_str) in overrides {
            let Some(action) = parse_action_name(action_name) else {
                warnings.push(format!("Unknown action '{}', ignoring", action_name));
                continue;
            };
            let Some(key) = parse_key_string(key_str) else {
                warnings.push(format!(
                    "Cannot parse key '{}' for action '{}', ignoring",
                    key_str, action_name
                ));
                continue;
            };

            let mut contexts: Vec<Context> = self
                .bindings
                .iter()
                .filter(|(_, _, a)| *a == action)
                .map(|(c, _, _)| *c)
                .collect();
            contexts.dedup();

            self.lookup.retain(|_, a| *a != action);
            self.bindings.retain(|(_, _, a)| *a != action);
            for context in contexts {
                self.bind(context, key, action);
            }

            tracing::info!(action = %action_name, key = %key_str, "Applied keybinding override");
        }

        warnings
    }

    /// Action for `code`+`modifiers` in `context`, falling back to Global.
    ///
    /// Text-entry contexts (search, comment form) do not fall back, so typed
    /// characters never trigger browse actions.
    pub fn action_for_key(
        &self,
        code: KeyCode,
        modifiers: KeyModifiers,
        context: Context,
    ) -> Option<Action> {
        // Uppercase letters arrive with SHIFT set; the char already encodes it
        let modifiers = match code {
            KeyCode::Char(_) => modifiers - KeyModifiers::SHIFT,
            _ => modifiers,
        };
        let key = KeySpec::new(code, modifiers);
        if let Some(&action) = self.lookup.get(&(context, key)) {
            return Some(action);
        }
        match context {
            Context::Global | Context::Search | Context::CommentForm => None,
            _ => self.lookup.get(&(Context::Global, key)).copied(),
        }
    }

    /// (context, key label, action, description) for every binding.
    pub fn all_bindings(&self) -> Vec<(Context, String, Action, &'static str)> {
        self.bindings
            .iter()
            .map(|(ctx, key, action)| (*ctx, format_key(key), *action, action.describe()))
            .collect()
    }

    /// First key bound to `action` in `context`, for inline hints.
    pub fn key_label(&self, action: Action, context: Context) -> Option<String> {
        self.bindings
            .iter()
            .find(|(c, _, a)| *a == action && (*c == context || *c == Context::Global))
            .map(|(_, key, _)| format_key(key))
    }
}

impl Default for KeybindingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse an action name from config. Accepts snake_case and a few aliases.
fn parse_action_name(name: &str) -> Option<Action> {
    let normalized = name.to_lowercase().replace('-', "_");
    let action = match normalized.as_str() {
        "quit" => Action::Quit,
        "nav_down" | "down" => Action::NavDown,
        "nav_up" | "up" => Action::NavUp,
        "cycle_focus" | "focus" => Action::CycleFocus,
        "back" => Action::Back,
        "select" | "open_item" => Action::Select,
        "home" | "catalog" => Action::Home,
        "toggle_genres" | "genres" => Action::ToggleGenres,
        "enter_search" | "search" => Action::EnterSearch,
        "exit_search" => Action::ExitSearch,
        "commit_search" => Action::CommitSearch,
        "retry" => Action::Retry,
        "dismiss_error" | "dismiss" => Action::DismissError,
        "open_in_browser" | "open" => Action::OpenInBrowser,
        "scroll_down" => Action::ScrollDown,
        "scroll_up" => Action::ScrollUp,
        "page_down" => Action::PageDown,
        "page_up" => Action::PageUp,
        "prev_episode" | "previous_episode" => Action::PrevEpisode,
        "next_episode" => Action::NextEpisode,
        "write_comment" | "comment" => Action::WriteComment,
        "next_field" => Action::NextField,
        "submit_comment" => Action::SubmitComment,
        "cancel_comment" => Action::CancelComment,
        "cycle_theme" | "theme" => Action::CycleTheme,
        "show_help" | "help" => Action::ShowHelp,
        _ => return None,
    };
    Some(action)
}

// ============================================================================
// Tests
// ============================================================================
