//! Terminal UI rendering.
//!
//! All drawing logic lives here, separated from application state ([`App`])
//! and input handling ([`crate::input`]).  Rendering only reads the feed
//! snapshot; the one thing it writes back is [`App::viewport`], which the
//! proximity trigger needs after every frame.
//!
//! ## For contributors
//!
//! * The layout is a two-row split: the feed on top and a one-line status
//!   bar at the bottom.
//! * The feed area shows one of four things: a sign-in prompt, a loading
//!   notice, an empty notice, or the list with a footer row.
//! * Titles and notices follow the feed's [`FeedScope`].

use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use crate::app::App;
use crate::feed::FeedScope;
use crate::source::Record;
use crate::trigger::Viewport;

/// Draw the complete UI for one frame.
pub fn draw(app: &mut App, frame: &mut Frame) {
    let [main_area, status_area] = Layout::vertical([
        Constraint::Min(1),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    draw_feed(app, frame, main_area);
    draw_status_bar(app, frame, status_area);
}

fn feed_block(scope: FeedScope) -> Block<'static> {
    let title = match scope {
        FeedScope::Community => " Meme Feed ",
        FeedScope::Own => " My Memes ",
    };
    Block::default().title(title).borders(Borders::ALL)
}

fn draw_feed(app: &mut App, frame: &mut Frame, area: Rect) {
    let cursor = app.feed.cursor;
    let scope = app.feed.scope;
    let notice = if app.viewer.is_none() {
        Some(("Please sign in", "Start with --token or --email/--password to view the feed."))
    } else if app.feed.records.is_empty() && cursor.is_fetching {
        Some(("Loading memes…", "Fetching the latest memes for you."))
    } else if app.feed.records.is_empty() {
        let detail = match scope {
            FeedScope::Community => "Nobody else has posted yet. Press r to check again.",
            FeedScope::Own => "You haven't posted anything yet. Press m for the community feed.",
        };
        Some(("No memes to show", detail))
    } else {
        None
    };

    if let Some((title, detail)) = notice {
        app.viewport = Viewport::default();
        let text = vec![
            Line::from(Span::styled(title, Style::default().add_modifier(Modifier::BOLD))),
            Line::from(Span::styled(detail, Style::default().fg(Color::DarkGray))),
        ];
        let paragraph = Paragraph::new(text)
            .alignment(Alignment::Center)
            .block(feed_block(scope));
        frame.render_widget(paragraph, area);
        return;
    }

    let [list_area, footer_area] = Layout::vertical([
        Constraint::Min(1),
        Constraint::Length(2),
    ])
    .areas(area);

    let list_items: Vec<ListItem> = app
        .feed
        .records
        .iter()
        .map(|record| ListItem::new(record_line(record)))
        .collect();

    let list = List::new(list_items)
        .block(feed_block(scope).borders(Borders::TOP | Borders::LEFT | Borders::RIGHT))
        .highlight_style(
            Style::default()
                .add_modifier(Modifier::BOLD)
                .bg(Color::DarkGray),
        )
        .highlight_symbol("▸ ");

    frame.render_stateful_widget(list, list_area, &mut app.list_state);

    // Rendering has settled the scroll offset; record what is on screen.
    app.viewport = Viewport::new(
        app.list_state.offset(),
        usize::from(list_area.height.saturating_sub(1)),
    );

    let footer = if cursor.is_fetching {
        Span::styled("Loading more memes…", Style::default().fg(Color::Yellow))
    } else if !cursor.has_more {
        let done = match scope {
            FeedScope::Community => "You've seen all the community memes!",
            FeedScope::Own => "That's all of your memes!",
        };
        Span::styled(done, Style::default().fg(Color::Green))
    } else {
        Span::raw("")
    };
    let footer = Paragraph::new(Line::from(footer))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::BOTTOM | Borders::LEFT | Borders::RIGHT));
    frame.render_widget(footer, footer_area);
}

fn record_line(record: &Record) -> Line<'_> {
    let date_str = record
        .created_at
        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "no date".into());

    let caption = if record.caption.is_empty() {
        "(no caption)"
    } else {
        record.caption.as_str()
    };

    Line::from(vec![
        Span::styled(format!("{:<18}", date_str), Style::default().fg(Color::DarkGray)),
        Span::raw(" "),
        Span::styled(caption, Style::default().fg(Color::White)),
        Span::raw("  "),
        Span::styled(format!("@{}", record.author), Style::default().fg(Color::Cyan)),
        Span::raw("  "),
        Span::styled(format!("♥ {}", record.likes), Style::default().fg(Color::Magenta)),
    ])
}

/// Render the bottom status bar.
fn draw_status_bar(app: &App, frame: &mut Frame, area: Rect) {
    let who = app.viewer.as_deref().unwrap_or("signed out");
    let status = Paragraph::new(Line::from(vec![
        Span::styled(format!(" {who} "), Style::default().fg(Color::Cyan)),
        Span::styled(&app.status, Style::default().fg(Color::Yellow)),
        Span::raw("  "),
        Span::styled(
            format!(
                "{} posts · page {}",
                app.feed.records.len(),
                app.feed.cursor.current_page
            ),
            Style::default().fg(Color::Green),
        ),
        Span::raw("  q: quit  ↑/↓: scroll  l: like  r: reload  m: mine/all  o: sign out"),
    ]));
    frame.render_widget(status, area);
}
