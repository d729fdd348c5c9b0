use std::time::{Duration, Instant};

use ratatui::widgets::ListState;

use crate::feed::{FeedSnapshot, LoadNext};
use crate::source::Record;
use crate::trigger::Viewport;
use crate::worker::WorkerMsg;

/// How long scroll-triggered loading pauses after a failed fetch.
pub const RETRY_DELAY: Duration = Duration::from_secs(5);

pub struct App {
    /// Feed as of the last tick.
    pub feed: FeedSnapshot,
    /// Username of the signed-in viewer, `None` when signed out.
    pub viewer: Option<String>,
    /// List selection state for scrolling.
    pub list_state: ListState,
    /// Rows of the list visible in the last frame.
    pub viewport: Viewport,
    /// Whether the user has requested to quit.
    pub quit: bool,
    /// Last status message.
    pub status: String,
    /// Scroll-triggered loading is paused until this instant.
    retry_at: Option<Instant>,
}

impl App {
    pub fn new() -> Self {
        Self {
            feed: FeedSnapshot::default(),
            viewer: None,
            list_state: ListState::default(),
            viewport: Viewport::default(),
            quit: false,
            status: "Starting…".into(),
            retry_at: None,
        }
    }

    /// Take the latest feed snapshot, keeping the selection in range.
    pub fn refresh(&mut self, feed: FeedSnapshot) {
        self.feed = feed;
        match (self.list_state.selected(), self.feed.records.len()) {
            (Some(_), 0) => self.list_state.select(None),
            (Some(i), len) if i >= len => self.list_state.select(Some(len - 1)),
            _ => {}
        }
    }

    /// Fold a worker result into the status line.
    pub fn apply(&mut self, msg: WorkerMsg) {
        self.status = match msg {
            WorkerMsg::FirstPage(shown) => format!("Loaded {shown} posts"),
            WorkerMsg::Next(LoadNext::Appended { page, added }) => {
                format!("Page {page}: {added} new posts")
            }
            WorkerMsg::Next(LoadNext::Exhausted) => "That's everything".into(),
            WorkerMsg::Next(LoadNext::Busy | LoadNext::Discarded) | WorkerMsg::Stale => return,
            WorkerMsg::Liked { id, likes } => format!("{id} now has {likes} likes"),
            WorkerMsg::Failed(e) => {
                self.retry_at = Some(Instant::now() + RETRY_DELAY);
                format!("Error: {e}")
            }
        };
    }

    /// Whether scroll-triggered loading may run at `now`.
    pub fn may_load(&mut self, now: Instant) -> bool {
        match self.retry_at {
            Some(at) if now < at => false,
            _ => {
                self.retry_at = None;
                true
            }
        }
    }

    pub fn selected_record(&self) -> Option<&Record> {
        self.list_state.selected().and_then(|i| self.feed.records.get(i))
    }

    // -- navigation ----------------------------------------------------------

    pub fn select_next(&mut self) {
        if self.feed.records.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => (i + 1).min(self.feed.records.len() - 1),
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn select_previous(&mut self) {
        if self.feed.records.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => i.saturating_sub(1),
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn select_first(&mut self) {
        if !self.feed.records.is_empty() {
            self.list_state.select(Some(0));
        }
    }

    pub fn select_last(&mut self) {
        if !self.feed.records.is_empty() {
            self.list_state.select(Some(self.feed.records.len() - 1));
        }
    }
}
