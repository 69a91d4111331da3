//! Main event loop for the TUI.
//!
//! Multiplexes shutdown signals, terminal input, background task results and
//! a periodic tick. The terminal is owned by a guard that restores it on drop.

use crate::app::{App, AppEvent, View};
use crate::feed::QueryContext;
use anyhow::{Context as _, Result};
use crossterm::{
    event::{Event, EventStream, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::future::Future;
use std::io::{self, Stdout};
use std::time::Duration;
use tokio::sync::mpsc;

use super::events::handle_app_event;
use super::helpers::{apply_context, maybe_load_more};
use super::input::handle_input;
use super::render::render;

/// Number of frames in the loading spinner animation.
pub(super) const SPINNER_FRAMES: usize = 10;

const TICK: Duration = Duration::from_millis(250);

/// What the loop should do after an input.
pub enum Action {
    Continue,
    Quit,
}

/// Raw-mode alternate screen, left again when dropped.
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalGuard {
    fn enter() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(e.into());
        }
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Resolves with the signal name once the process is asked to stop.
#[cfg(unix)]
fn shutdown_signal() -> io::Result<impl Future<Output = &'static str>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    Ok(async move {
        tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        }
    })
}

#[cfg(not(unix))]
fn shutdown_signal() -> io::Result<impl Future<Output = &'static str>> {
    Ok(async {
        let _ = tokio::signal::ctrl_c().await;
        "Ctrl+C"
    })
}

/// Run the TUI until the user quits or a shutdown signal arrives.
///
/// The first page of `initial` is requested before the first frame. Results
/// from background tasks come back through `event_rx`; anything spawned from
/// here gets a clone of `event_tx`.
///
/// A panic hook leaves raw mode before the default hook prints, so a crash
/// does not leave the shell unusable.
pub async fn run(
    app: &mut App,
    initial: QueryContext,
    event_tx: mpsc::Sender<AppEvent>,
    mut event_rx: mpsc::Receiver<AppEvent>,
) -> Result<()> {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let shutdown = shutdown_signal().context("Failed to install signal handlers")?;
    tokio::pin!(shutdown);

    let mut guard = TerminalGuard::enter().context("Failed to initialize terminal")?;
    let mut input = EventStream::new();
    let mut ticker = tokio::time::interval(TICK);

    apply_context(app, initial, &event_tx);

    loop {
        if app.needs_redraw {
            guard.terminal.draw(|f| render(f, app))?;
            app.needs_redraw = false;
            // A frame can move the catalog viewport
            if app.view == View::Browse {
                maybe_load_more(app, &event_tx);
            }
        }

        if app.clear_expired_status() {
            app.needs_redraw = true;
        }

        // Apply finished work before the next key
        while let Ok(event) = event_rx.try_recv() {
            app.needs_redraw = true;
            handle_app_event(app, event, &event_tx);
        }

        tokio::select! {
            biased;

            signal = &mut shutdown => {
                tracing::info!(signal, "Shutting down");
                break;
            }

            maybe_event = input.next() => {
                let Some(event) = maybe_event else {
                    tracing::info!("Terminal event stream closed");
                    break;
                };
                if let Action::Quit = on_terminal_event(app, event, &event_tx) {
                    break;
                }
            }

            Some(event) = event_rx.recv() => {
                app.needs_redraw = true;
                handle_app_event(app, event, &event_tx);
            }

            _ = ticker.tick() => on_tick(app),
        }
    }

    drop(guard);
    Ok(())
}

fn on_terminal_event(
    app: &mut App,
    event: io::Result<Event>,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Action {
    match event {
        Ok(Event::Key(key)) if key.kind != KeyEventKind::Release => {
            app.needs_redraw = true;
            match handle_input(app, key.code, key.modifiers, event_tx) {
                Ok(action) => return action,
                Err(e) => app.set_status(format!("Error: {}", e)),
            }
        }
        Ok(Event::Resize(_, _)) => app.needs_redraw = true,
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "Terminal event stream error"),
    }
    Action::Continue
}

/// Spin while something the user waits on is loading.
fn on_tick(app: &mut App) {
    if app.is_busy() {
        app.spinner_frame = (app.spinner_frame + 1) % SPINNER_FRAMES;
        app.needs_redraw = true;
    }
}
