//! Theme system for the TUI.
//!
//! Widgets ask for semantic roles ("feed_error", "episode_heading") rather
//! than colors. `ThemeVariant` picks a palette and `StyleMap` resolves role
//! names to concrete ratatui styles.

use ratatui::style::{Color, Modifier, Style};
use std::collections::HashMap;

// ============================================================================
// Theme Variant
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThemeVariant {
    #[default]
    Dark,
    Light,
}

impl ThemeVariant {
    /// Parse a variant name (case-insensitive).
    pub fn from_str_name(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dark" => Some(Self::Dark),
            "light" => Some(Self::Light),
            _ => None,
        }
    }

    pub fn palette(self) -> ColorPalette {
        match self {
            Self::Dark => ColorPalette::dark(),
            Self::Light => ColorPalette::light(),
        }
    }

    /// Dark → Light → Dark.
    pub fn next(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Dark => "Dark",
            Self::Light => "Light",
        }
    }
}

// ============================================================================
// Color Palette
// ============================================================================

/// Every semantic UI role mapped to a `Style`.
#[derive(Debug, Clone)]
pub struct ColorPalette {
    // -- Genre sidebar --
    pub genre_normal: Style,
    pub genre_active: Style,

    // -- Novel list --
    pub list_selected: Style,
    pub novel_title: Style,
    pub novel_no_image: Style,
    pub feed_loading: Style,
    pub feed_error: Style,
    pub feed_end: Style,

    // -- Detail --
    pub detail_heading: Style,
    pub detail_body: Style,
    pub detail_episode: Style,
    pub detail_views: Style,

    // -- Episode reader --
    pub episode_heading: Style,
    pub episode_body: Style,
    pub episode_nav: Style,
    pub episode_nav_disabled: Style,
    pub comment_author: Style,
    pub comment_body: Style,

    // -- Forms --
    pub search_prompt: Style,
    pub form_label: Style,
    pub form_field: Style,
    pub form_field_focused: Style,

    // -- Chrome --
    pub status_bar: Style,
    pub panel_border: Style,
    pub panel_border_focused: Style,
}

impl ColorPalette {
    fn dark() -> Self {
        let selected = Style::default().bg(Color::DarkGray).fg(Color::White);
        Self {
            genre_normal: Style::default(),
            genre_active: Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),

            list_selected: selected,
            novel_title: Style::default().add_modifier(Modifier::BOLD),
            novel_no_image: Style::default().fg(Color::DarkGray),
            feed_loading: Style::default().fg(Color::Cyan),
            feed_error: Style::default().fg(Color::Red),
            feed_end: Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),

            detail_heading: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            detail_body: Style::default(),
            detail_episode: Style::default(),
            detail_views: Style::default().fg(Color::DarkGray),

            episode_heading: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            episode_body: Style::default(),
            episode_nav: Style::default().fg(Color::Yellow),
            episode_nav_disabled: Style::default().fg(Color::DarkGray),
            comment_author: Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
            comment_body: Style::default(),

            search_prompt: Style::default().fg(Color::Yellow),
            form_label: Style::default().fg(Color::Gray),
            form_field: Style::default(),
            form_field_focused: Style::default().fg(Color::Black).bg(Color::Cyan),

            status_bar: selected,
            panel_border: Style::default(),
            panel_border_focused: Style::default().fg(Color::Cyan),
        }
    }

    /// For light terminal backgrounds.
    fn light() -> Self {
        let selected = Style::default().bg(Color::Blue).fg(Color::White);
        let ink = Style::default().fg(Color::Black);
        Self {
            genre_normal: ink,
            genre_active: Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),

            list_selected: selected,
            novel_title: ink.add_modifier(Modifier::BOLD),
            novel_no_image: Style::default().fg(Color::DarkGray),
            feed_loading: Style::default().fg(Color::Blue),
            feed_error: Style::default().fg(Color::Red),
            feed_end: Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),

            detail_heading: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            detail_body: ink,
            detail_episode: ink,
            detail_views: Style::default().fg(Color::DarkGray),

            episode_heading: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            episode_body: ink,
            episode_nav: Style::default().fg(Color::Magenta),
            episode_nav_disabled: Style::default().fg(Color::Gray),
            comment_author: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            comment_body: ink,

            search_prompt: Style::default().fg(Color::Magenta),
            form_label: Style::default().fg(Color::DarkGray),
            form_field: ink,
            form_field_focused: Style::default().fg(Color::White).bg(Color::Blue),

            status_bar: Style::default().bg(Color::White).fg(Color::Black),
            panel_border: Style::default().fg(Color::DarkGray),
            panel_border_focused: Style::default().fg(Color::Blue),
        }
    }

    /// (role name, style) for every field, in declaration order.
    fn roles(&self) -> [(&'static str, Style); 25] {
        [
            ("genre_normal", self.genre_normal),
            ("genre_active", self.genre_active),
            ("list_selected", self.list_selected),
            ("novel_title", self.novel_title),
            ("novel_no_image", self.novel_no_image),
            ("feed_loading", self.feed_loading),
            ("feed_error", self.feed_error),
            ("feed_end", self.feed_end),
            ("detail_heading", self.detail_heading),
            ("detail_body", self.detail_body),
            ("detail_episode", self.detail_episode),
            ("detail_views", self.detail_views),
            ("episode_heading", self.episode_heading),
            ("episode_body", self.episode_body),
            ("episode_nav", self.episode_nav),
            ("episode_nav_disabled", self.episode_nav_disabled),
            ("comment_author", self.comment_author),
            ("comment_body", self.comment_body),
            ("search_prompt", self.search_prompt),
            ("form_label", self.form_label),
            ("form_field", self.form_field),
            ("form_field_focused", self.form_field_focused),
            ("status_bar", self.status_bar),
            ("panel_border", self.panel_border),
            ("panel_border_focused", self.panel_border_focused),
        ]
    }
}

// ============================================================================
// Style Map
// ============================================================================

/// Role-name lookup built from a `ColorPalette`.
#[derive(Debug, Clone)]
pub struct StyleMap {
    map: HashMap<&'static str, Style>,
}

impl StyleMap {
    pub fn from_palette(p: &ColorPalette) -> Self {
        Self {
            map: p.roles().into_iter().collect(),
        }
    }

    /// `Style::default()` for unknown roles.
    pub fn resolve(&self, role: &str) -> Style {
        self.map.get(role).copied().unwrap_or_default()
    }
}

impl Default for StyleMap {
    fn default() -> Self {
        Self::from_palette(&ThemeVariant::default().palette())
    }
}

// ============================================================================
// Tests
// ============================================================================
