//! memefeed — an infinitely scrolling community meme feed for the terminal.
//!
//! ## Architecture overview
//!
//! ```text
//!                 spawn ┌───────────┐  fetch_page  ┌───────────┐
//!   ┌──────────┐ ─────► │ worker.rs │ ───────────► │ source/   │
//!   │ trigger  │        │  (tasks)  │              │  (HTTP)   │
//!   └──────────┘        └───────────┘              └───────────┘
//!        ▲                    │ WorkerMsg
//!        │ sync/observe       ▼
//!   ┌──────────┐ snapshot ┌──────────┐  draw()  ┌──────────┐
//!   │  feed/   │ ───────► │  app.rs  │ ───────► │  ui.rs   │
//!   │ (state)  │          │ (state)  │          │ (render) │
//!   └──────────┘          └──────────┘          └──────────┘
//!                              ▲
//!                              │ handle_key_event()
//!                         ┌──────────┐
//!                         │ input.rs │
//!                         └──────────┘
//! ```
//!
//! * **`feed`** — the paginated, de-duplicated feed and its cursor.
//! * **`trigger`** — requests the next page when the last row nears the
//!   viewport.
//! * **`source/`** — the `FeedSource` trait and the HTTP implementation.
//! * **`session`** — the signed-in viewer.
//! * **`worker`** — runs feed operations as tokio tasks.
//! * **`app`** / **`ui`** / **`input`** — UI state, rendering, keys.
//! * **`config`** / **`logging`** — settings and log file setup.
//! * **`main`** — wires everything together and runs the event loop.

mod app;
mod config;
mod feed;
mod input;
mod logging;
mod session;
mod source;
mod trigger;
mod ui;
mod worker;

use std::io;
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use app::App;
use config::{Cli, Config, SignIn};
use feed::{FeedManager, FeedScope};
use input::Action;
use session::{Session, Viewer};
use source::{FeedSource, HttpSource};
use trigger::ProximityTrigger;

// ---------------------------------------------------------------------------
// RAII terminal guard
// ---------------------------------------------------------------------------

/// Manages terminal raw-mode and alternate-screen lifetime via [`Drop`].
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalGuard {
    fn new() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
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

/// Install a panic hook that restores the terminal before printing the
/// panic message.
fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(info);
    }));
}

/// Establish the viewer described by `sign_in`, before the UI starts so
/// failures print plainly.
async fn sign_in(source: &HttpSource, session: &Session, how: &SignIn) -> Result<()> {
    let viewer = match how {
        SignIn::Token(token) => Viewer::from_token(token).context("reading --token")?,
        SignIn::Password { email, password } => source
            .login(email, password)
            .await
            .with_context(|| format!("signing in as {email}"))?,
        SignIn::Anonymous => return Ok(()),
    };
    session.establish(viewer);
    Ok(())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    install_panic_hook();

    // -- configuration -------------------------------------------------------
    let config = Config::load(Cli::parse())?;
    logging::init(config.log_file.as_deref())?;

    // -- feed wiring ---------------------------------------------------------
    let source = HttpSource::new(&config.api_url).context("building HTTP client")?;
    let session = Session::new();
    sign_in(&source, &session, &config.sign_in).await?;

    let manager = Arc::new(FeedManager::new(source, session.clone()).with_page_size(config.page_size));
    tracing::info!(
        api = manager.source().name(),
        page_size = manager.page_size(),
        "starting"
    );
    let (tx, rx) = mpsc::channel();

    if session.is_established() {
        worker::spawn_first_page(Arc::clone(&manager), tx.clone());
    }

    let mut trigger = {
        let manager = Arc::clone(&manager);
        let tx = tx.clone();
        ProximityTrigger::new(config.trigger_margin, move || {
            worker::spawn_load_next(Arc::clone(&manager), tx.clone())
        })
    };

    // -- terminal setup (RAII — Drop restores on exit or panic) --------------
    let mut guard = TerminalGuard::new()?;
    let mut app = App::new();

    // -- main event loop -----------------------------------------------------
    // Runs at ~10 fps (100 ms tick).  Each iteration:
    //   1. Drain worker results and take a fresh feed snapshot.
    //   2. Re-arm the trigger against it.
    //   3. Render, then let the trigger look at what is on screen.
    //   4. Poll for keyboard input (up to tick_rate).
    let tick_rate = Duration::from_millis(100);

    loop {
        // 1. Feed state
        while let Ok(msg) = rx.try_recv() {
            app.apply(msg);
        }
        app.viewer = session.viewer().map(|v| v.username);
        app.refresh(manager.snapshot());

        // 2. Trigger
        trigger.sync(&app.feed);

        // 3. Render
        guard.terminal.draw(|f| ui::draw(&mut app, f))?;
        if app.may_load(Instant::now()) {
            trigger.observe(app.viewport);
        }

        // 4. Handle input
        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                match input::handle_key_event(&mut app, key) {
                    Some(Action::Reload) => {
                        app.status = "Reloading…".into();
                        worker::spawn_first_page(Arc::clone(&manager), tx.clone());
                    }
                    Some(Action::ToggleLike(id)) => {
                        worker::spawn_toggle_like(Arc::clone(&manager), id, tx.clone());
                    }
                    Some(Action::SwitchScope) => {
                        app.status = match manager.toggle_scope() {
                            FeedScope::Community => "Community feed…".into(),
                            FeedScope::Own => "Your memes…".into(),
                        };
                        worker::spawn_first_page(Arc::clone(&manager), tx.clone());
                    }
                    Some(Action::SignOut) => {
                        session.terminate();
                        manager.reset();
                        app.status = "Signed out".into();
                    }
                    None => {}
                }
            }
        }

        if app.quit {
            break;
        }
    }

    // The trigger goes first so no load is spawned during teardown.
    trigger.release();
    Ok(())
}
