//! Terminal interface.
//!
//! One loop owns the [`App`](crate::app::App). Keys are dispatched through
//! the keybinding registry, background fetches report back as
//! [`AppEvent`](crate::app::AppEvent)s, and every frame is drawn from state.
//! In the browse view the scroll trigger is consulted after every key,
//! frame and page result.
//!
//! - `loop_runner`: terminal guard, signals, `select!` loop
//! - `input` / `events`: keys and task results applied to the app
//! - `helpers`: spawning fetches and the load-more check
//! - `render` plus one module per widget (`catalog`, `genres`, `detail`,
//!   `episode`, `comment_form`, `help`, `status`)

mod catalog;
mod comment_form;
mod detail;
mod episode;
mod events;
mod genres;
mod help;
mod helpers;
mod input;
mod loop_runner;
mod render;
mod status;

pub use loop_runner::{run, Action};
