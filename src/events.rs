//! Terminal event polling and key handling.

use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent};

use crate::app::{App, View};

/// Poll for events with a timeout
pub fn poll_event(timeout: Duration) -> Result<Option<Event>> {
    if event::poll(timeout)? {
        Ok(Some(event::read()?))
    } else {
        Ok(None)
    }
}

/// Handle a key event
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    // If help is shown, any key closes it
    if app.show_help {
        app.show_help = false;
        return;
    }

    // If the detail overlay is shown, handle overlay-specific keys
    if app.show_detail_overlay {
        match key.code {
            KeyCode::Esc | KeyCode::Enter | KeyCode::Backspace | KeyCode::Char('q') => {
                app.go_back();
            }
            // Allow scrolling through devices while the overlay is open
            KeyCode::Up | KeyCode::Char('k') => app.select_prev(),
            KeyCode::Down | KeyCode::Char('j') => app.select_next(),
            KeyCode::Home => app.select_first(),
            KeyCode::End => app.select_last(),
            _ => {}
        }
        return;
    }

    match key.code {
        // Quit
        KeyCode::Char('q') => app.quit(),

        // View switching
        KeyCode::Tab => app.next_view(),
        KeyCode::BackTab => app.prev_view(),
        KeyCode::Char('1') => app.set_view(View::Devices),
        KeyCode::Char('2') => app.set_view(View::Sensors),

        // Navigation (up/down for items, left/right for tabs)
        KeyCode::Up | KeyCode::Char('k') => app.select_prev(),
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::Left | KeyCode::Char('h') => app.prev_view(),
        KeyCode::Right | KeyCode::Char('l') => app.next_view(),
        KeyCode::Home => app.select_first(),
        KeyCode::End => app.select_last(),

        // Enter detail overlay
        KeyCode::Enter => app.enter_detail(),

        // Go back
        KeyCode::Esc | KeyCode::Backspace => app.go_back(),

        // Online-only filter
        KeyCode::Char('o') => {
            if app.current_view == View::Devices {
                app.toggle_online_filter();
            }
        }

        // Re-fetch the REST snapshot
        KeyCode::Char('r') => app.request_refresh(),

        // Help
        KeyCode::Char('?') => app.toggle_help(),

        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SensorCatalog;
    use crate::persist::MemoryStore;
    use crate::source::ChannelSource;
    use chrono::Utc;
    use crossterm::event::KeyModifiers;
    use std::sync::Arc;
    use std::time::Duration;

    fn test_app() -> App {
        let (_tx, source) = ChannelSource::create("test");
        App::new(
            Box::new(source),
            Arc::new(MemoryStore::new()),
            SensorCatalog::default(),
            Duration::from_secs(60),
            Utc::now(),
        )
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_quit_key() {
        let mut app = test_app();
        handle_key_event(&mut app, key(KeyCode::Char('q')));
        assert!(!app.running);
    }

    #[test]
    fn test_view_switching() {
        let mut app = test_app();
        assert_eq!(app.current_view, View::Devices);
        handle_key_event(&mut app, key(KeyCode::Tab));
        assert_eq!(app.current_view, View::Sensors);
        handle_key_event(&mut app, key(KeyCode::Tab));
        assert_eq!(app.current_view, View::Devices);
    }

    #[test]
    fn test_any_key_closes_help() {
        let mut app = test_app();
        handle_key_event(&mut app, key(KeyCode::Char('?')));
        assert!(app.show_help);
        handle_key_event(&mut app, key(KeyCode::Char('x')));
        assert!(!app.show_help);
    }

    #[test]
    fn test_refresh_request() {
        let mut app = test_app();
        handle_key_event(&mut app, key(KeyCode::Char('r')));
        assert!(app.take_refresh_request());
        assert!(!app.take_refresh_request());
    }

    #[test]
    fn test_online_filter_only_in_devices_view() {
        let mut app = test_app();
        handle_key_event(&mut app, key(KeyCode::Char('o')));
        assert!(app.show_only_online);

        app.set_view(View::Sensors);
        handle_key_event(&mut app, key(KeyCode::Char('o')));
        assert!(app.show_only_online);
    }
}
