//! Keyboard input handling.
//!
//! Maps terminal key events to [`App`] changes.  Keys that need the network
//! (reload, like, switching feeds, sign out) come back as an [`Action`] for the main loop to
//! dispatch, since only it owns the feed manager.
//!
//! ## For contributors
//!
//! To add a new keybinding:
//!
//! 1. Add a method on [`App`] for the action, or an [`Action`] variant if it
//!    has to reach the feed manager.
//! 2. Add a `KeyCode` match arm in [`handle_key_event`].
//! 3. Update the help text in `ui::draw_status_bar`.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};

use crate::app::App;

/// Work the main loop has to do in response to a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Reset the feed and load the first page again.
    Reload,
    /// Like or unlike the post with this id.
    ToggleLike(String),
    /// Switch between the community feed and the viewer's own posts.
    SwitchScope,
    /// Forget the viewer and clear the feed.
    SignOut,
}

/// Process a single key event, updating app state accordingly.
///
/// Only reacts to key-press events (ignoring release / repeat) so that each
/// physical keypress triggers exactly one action.
pub fn handle_key_event(app: &mut App, key: KeyEvent) -> Option<Action> {
    if key.kind != KeyEventKind::Press {
        return None;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.quit = true,
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::Up | KeyCode::Char('k') => app.select_previous(),
        KeyCode::Home | KeyCode::Char('g') => app.select_first(),
        KeyCode::End | KeyCode::Char('G') => app.select_last(),
        KeyCode::Char('r') if app.viewer.is_some() => return Some(Action::Reload),
        KeyCode::Char('l') | KeyCode::Enter => {
            return app
                .selected_record()
                .map(|record| Action::ToggleLike(record.id.clone()));
        }
        KeyCode::Char('m') if app.viewer.is_some() => return Some(Action::SwitchScope),
        KeyCode::Char('o') if app.viewer.is_some() => return Some(Action::SignOut),
        _ => {}
    }
    None
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crossterm::event::{KeyEventState, KeyModifiers};

    use super::*;
    use crate::feed::{CursorState, FeedSnapshot};
    use crate::source::Record;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app_with_posts() -> App {
        let mut app = App::new();
        app.viewer = Some("alice".into());
        app.refresh(FeedSnapshot {
            records: Arc::new(
                ["p1", "p2"]
                    .into_iter()
                    .map(|id| Record {
                        id: id.to_string(),
                        image_url: String::new(),
                        caption: String::new(),
                        author: "bob".into(),
                        author_id: "u2".into(),
                        likes: 0,
                        created_at: None,
                    })
                    .collect(),
            ),
            cursor: CursorState::default(),
            ..FeedSnapshot::default()
        });
        app
    }

    #[test]
    fn q_quits() {
        let mut app = App::new();
        assert_eq!(handle_key_event(&mut app, press(KeyCode::Char('q'))), None);
        assert!(app.quit);
    }

    #[test]
    fn release_events_are_ignored() {
        let mut app = App::new();
        let release = KeyEvent {
            code: KeyCode::Char('q'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        };
        handle_key_event(&mut app, release);
        assert!(!app.quit);
    }

    #[test]
    fn like_targets_the_selected_post() {
        let mut app = app_with_posts();
        assert_eq!(handle_key_event(&mut app, press(KeyCode::Char('l'))), None, "nothing selected");

        handle_key_event(&mut app, press(KeyCode::Char('j')));
        handle_key_event(&mut app, press(KeyCode::Char('j')));
        assert_eq!(
            handle_key_event(&mut app, press(KeyCode::Char('l'))),
            Some(Action::ToggleLike("p2".into()))
        );
    }

    #[test]
    fn network_keys_need_a_viewer() {
        let mut app = App::new();
        assert_eq!(handle_key_event(&mut app, press(KeyCode::Char('r'))), None);
        assert_eq!(handle_key_event(&mut app, press(KeyCode::Char('o'))), None);
        assert_eq!(handle_key_event(&mut app, press(KeyCode::Char('m'))), None);

        let mut app = app_with_posts();
        assert_eq!(handle_key_event(&mut app, press(KeyCode::Char('r'))), Some(Action::Reload));
        assert_eq!(
            handle_key_event(&mut app, press(KeyCode::Char('m'))),
            Some(Action::SwitchScope)
        );
        assert_eq!(handle_key_event(&mut app, press(KeyCode::Char('o'))), Some(Action::SignOut));
    }
}
