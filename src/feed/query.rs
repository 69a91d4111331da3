use std::fmt;

/// The parameters that define which feed is being browsed.
///
/// Two contexts are equal iff kind and payload match. Switching to a
/// different context starts a new feed rather than continuing the old one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum QueryContext {
    /// Full catalog listing.
    #[default]
    Catalog,
    /// Catalog restricted to one genre type.
    TypeFilter(String),
    /// Keyword search.
    SearchTerm(String),
}

impl QueryContext {
    /// Search context with the term normalized the way the search box submits it.
    pub fn search(term: &str) -> Self {
        Self::SearchTerm(term.trim().to_lowercase())
    }

    pub fn type_filter(genre: &str) -> Self {
        Self::TypeFilter(genre.trim().to_string())
    }

    /// Short label for panel titles.
    pub fn label(&self) -> String {
        match self {
            Self::Catalog => "Novels".to_string(),
            Self::TypeFilter(genre) => format!("Genre: {}", genre),
            Self::SearchTerm(term) => format!("Search: {}", term),
        }
    }

    pub fn genre(&self) -> Option<&str> {
        match self {
            Self::TypeFilter(genre) => Some(genre),
            _ => None,
        }
    }

    pub fn is_search(&self) -> bool {
        matches!(self, Self::SearchTerm(_))
    }

    /// Message shown when the feed ends without producing anything.
    pub fn empty_message(&self) -> &'static str {
        match self {
            Self::SearchTerm(_) => "No results found",
            Self::Catalog | Self::TypeFilter(_) => "No novels available",
        }
    }
}

impl fmt::Display for QueryContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Catalog => write!(f, "catalog"),
            Self::TypeFilter(genre) => write!(f, "type={}", genre),
            Self::SearchTerm(term) => write!(f, "search={}", term),
        }
    }
}
