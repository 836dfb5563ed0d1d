//! Common UI components shared across views.
//!
//! This module contains the header bar, tab bar, status bar, and help overlay.

use chrono::{DateTime, Utc};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Frame,
};

use crate::app::{App, View};
use crate::source::ConnectionState;

/// Render the header bar with fleet overview and the monitor badge.
pub fn render_header(frame: &mut Frame, app: &App, area: Rect, now: DateTime<Utc>) {
    let total = app.store.len();
    let online = app.store.online_count(app.ttl, now);
    let offline = total - online;

    let monitor = app.monitor.liveness();
    let monitor_label = format!("monitor: {}", monitor.label());

    let (push_label, push_style) = match app.connection_state() {
        ConnectionState::Connected => ("push: up", Style::default().fg(app.theme.online)),
        ConnectionState::Disconnected => {
            ("push: down", Style::default().fg(app.theme.offline))
        }
    };

    let line = Line::from(vec![
        Span::styled(" FLEET ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("│ "),
        Span::styled(format!("{online}"), Style::default().fg(app.theme.online)),
        Span::raw(" online "),
        if offline > 0 {
            Span::styled(
                format!("{offline}"),
                Style::default().fg(app.theme.offline).add_modifier(Modifier::BOLD),
            )
        } else {
            Span::styled("0", Style::default().add_modifier(Modifier::DIM))
        },
        Span::raw(" offline │ "),
        Span::styled(format!("{total}"), Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" devices │ "),
        Span::styled(monitor_label, app.theme.liveness_style(monitor)),
        Span::raw(" │ "),
        Span::styled(push_label, push_style),
    ]);

    frame.render_widget(Paragraph::new(line), area);
}

/// Render the tab bar showing available views.
///
/// Highlights the currently active view.
pub fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = vec![Line::from(" 1:Devices "), Line::from(" 2:Sensors ")];

    let selected = match app.current_view {
        View::Devices => 0,
        View::Sensors => 1,
    };

    let tabs = Tabs::new(titles)
        .select(selected)
        .style(app.theme.tab_inactive)
        .highlight_style(app.theme.tab_active)
        .divider("|");

    frame.render_widget(tabs, area);
}

/// Render the status bar at the bottom.
///
/// Shows the push-source description, available controls, temporary status
/// messages, and load errors.
pub fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    // Check for temporary status message first
    if let Some(msg) = app.get_status_message() {
        let paragraph =
            Paragraph::new(format!(" {} ", msg)).style(Style::default().fg(app.theme.highlight));
        frame.render_widget(paragraph, area);
        return;
    }

    let status = if let Some(ref err) = app.load_error {
        format!(" Error: {} | r:retry q:quit", err)
    } else {
        let controls = match app.current_view {
            View::Devices => "o:online-only Enter:detail r:refresh Tab:switch ?:help q:quit",
            View::Sensors => "Tab:switch ?:help q:quit",
        };
        format!(" {} | {}", app.source_description(), controls)
    };

    let paragraph = Paragraph::new(status).style(Style::default().add_modifier(Modifier::DIM));
    frame.render_widget(paragraph, area);
}

/// Render the help overlay with keyboard shortcuts.
///
/// Displayed as a centered modal on top of the current view.
pub fn render_help(frame: &mut Frame, app: &App, area: Rect) {
    let help_text = vec![
        Line::from(vec![Span::styled("Keyboard Shortcuts", app.theme.header)]),
        Line::from(""),
        Line::from(vec![Span::styled(
            " Navigation",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from("  ←/→ h/l     Switch views"),
        Line::from("  ↑/↓ j/k     Navigate list"),
        Line::from("  Home/End    Jump to first/last"),
        Line::from("  Enter       Device detail"),
        Line::from("  Esc         Go back"),
        Line::from(""),
        Line::from(vec![Span::styled(
            " Devices",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from("  o         Show only online devices"),
        Line::from("  r         Re-fetch the device snapshot"),
        Line::from(""),
        Line::from(vec![Span::styled(
            " General",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from("  q         Quit"),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Press any key to close",
            Style::default().add_modifier(Modifier::DIM),
        )]),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));

    let paragraph = Paragraph::new(help_text).block(block);

    // Center the help overlay - responsive to terminal size
    let help_width = 42u16.min(area.width.saturating_sub(4));
    let help_height = 22u16.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(help_width)) / 2;
    let y = area.y + (area.height.saturating_sub(help_height)) / 2;
    let help_area = Rect::new(x, y, help_width, help_height);

    // Clear the area behind the help
    frame.render_widget(ratatui::widgets::Clear, help_area);
    frame.render_widget(paragraph, help_area);
}

/// Format how long ago a timestamp was, for display (e.g. "12s ago").
pub fn format_age(ts: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(ts) = ts else {
        return "never".to_string();
    };
    let secs = (now - ts).num_seconds().max(0);
    if secs < 60 {
        format!("{secs}s ago")
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else if secs < 86_400 {
        format!("{}h ago", secs / 3600)
    } else {
        format!("{}d ago", secs / 86_400)
    }
}

/// Format an uptime in seconds (e.g. "2d 3h", "4h 12m", "53s").
pub fn format_uptime(secs: u64) -> String {
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs < 86_400 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d {}h", secs / 86_400, (secs % 86_400) / 3600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_age() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let at = |secs: i64| Some(Utc.timestamp_opt(1_700_000_000 - secs, 0).unwrap());

        assert_eq!(format_age(None, now), "never");
        assert_eq!(format_age(at(5), now), "5s ago");
        assert_eq!(format_age(at(150), now), "2m ago");
        assert_eq!(format_age(at(7200), now), "2h ago");
        assert_eq!(format_age(at(200_000), now), "2d ago");
    }

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(53), "53s");
        assert_eq!(format_uptime(252), "4m 12s");
        assert_eq!(format_uptime(15_120), "4h 12m");
        assert_eq!(format_uptime(183_600), "2d 3h");
    }
}
