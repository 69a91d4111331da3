//! novella: a terminal browser for a serialized-fiction catalog.
//!
//! The catalog is an infinite list fetched a page at a time. [`feed`] holds
//! the pagination core (record merging, query contexts, the fetch state
//! machine and the scroll trigger); [`api`] talks to the catalog server;
//! [`app`] and [`ui`] put both behind a ratatui interface.

pub mod api;
pub mod app;
pub mod config;
pub mod feed;
pub mod keybindings;
pub mod theme;
pub mod ui;
pub mod util;
