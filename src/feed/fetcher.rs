use super::query::QueryContext;
use std::future::Future;
use thiserror::Error;

/// Failure taxonomy for a page fetch.
///
/// The controller treats all three the same way (the feed moves to `Error`
/// and can be retried); the distinction only drives user-facing messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Connection, DNS, TLS, timeout or body-read failure.
    #[error("Network error: {0}")]
    Transport(String),
    /// Non-success HTTP status.
    #[error("HTTP error: status {0}")]
    Server(u16),
    /// Payload did not match the expected shape.
    #[error("Malformed response: {0}")]
    Decode(String),
}

/// Discriminant of [`FetchError`], kept in feed state as `last_error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Server,
    Decode,
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) => ErrorKind::Transport,
            Self::Server(_) => ErrorKind::Server,
            Self::Decode(_) => ErrorKind::Decode,
        }
    }

    /// Message suitable for the status bar or an error panel.
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport(_) => "Could not reach the server. Check your connection.".to_string(),
            Self::Server(status) => format!("The server returned an error (status {})", status),
            Self::Decode(_) => "The server sent a response we could not read".to_string(),
        }
    }
}

/// Source of feed pages.
///
/// `page` is 1-based. An empty `Vec` is the end-of-data signal, not an
/// error. Implementations own their timeouts and must eventually resolve.
pub trait PageFetcher<R>: Send + Sync {
    fn fetch_page(
        &self,
        context: &QueryContext,
        page: u32,
    ) -> impl Future<Output = Result<Vec<R>, FetchError>> + Send;
}
