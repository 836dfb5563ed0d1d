//! Device detail overlay.
//!
//! A centered modal with the full record, the latest value of each sensor
//! the device reports, and a recent-history sparkline per sensor.

use chrono::{DateTime, Utc};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use super::common::{format_age, format_uptime};
use crate::app::App;

/// Sparkline characters (8 levels of height).
const SPARKLINE_CHARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Render the detail overlay for the currently selected device.
pub fn render_overlay(frame: &mut Frame, app: &App, area: Rect, now: DateTime<Utc>) {
    let Some(row) = app.selected_row() else {
        return;
    };
    let record = &row.record;

    let mut lines: Vec<Line> = Vec::new();

    lines.push(Line::from(vec![
        Span::styled(
            record.model.clone().unwrap_or_else(|| "Unknown Device".to_string()),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(
            if row.online { "ONLINE" } else { "OFFLINE" },
            app.theme.online_style(row.online),
        ),
    ]));
    lines.push(Line::from(""));

    let field = |label: &str, value: String| {
        Line::from(vec![
            Span::styled(format!("{label:<10}"), Style::default().add_modifier(Modifier::DIM)),
            Span::raw(value),
        ])
    };

    lines.push(field("Device ID", record.device_id.clone()));
    lines.push(field(
        "Location",
        record.location.clone().unwrap_or_else(|| "Unknown".to_string()),
    ));
    lines.push(field(
        "IP",
        record.ip_addr.clone().unwrap_or_else(|| "N/A".to_string()),
    ));
    lines.push(field(
        "Uptime",
        match (record.uptime, row.online) {
            (Some(secs), true) => format_uptime(secs),
            _ => "N/A".to_string(),
        },
    ));
    lines.push(field(
        "Updated",
        format_age(record.last_status_update, now),
    ));
    if !record.sensors.is_empty() {
        lines.push(field("Sensors", record.sensors.join(", ")));
    }

    lines.push(Line::from(""));
    match &record.last_reading {
        Some(reading) if !reading.values.is_empty() => {
            lines.push(Line::from(Span::styled(
                format!("Latest reading ({})", format_age(Some(reading.time), now)),
                app.theme.header,
            )));
            for (code, value) in &reading.values {
                let spark = render_sparkline(&app.history.sparkline(&record.device_id, code));
                lines.push(Line::from(vec![
                    Span::raw(format!(
                        "  {:<16} {:>12}  ",
                        app.sensors.display_name(code),
                        app.sensors.format_value(code, *value),
                    )),
                    Span::styled(spark, Style::default().fg(app.theme.highlight)),
                ]));
            }
        }
        _ => {
            lines.push(Line::from(Span::styled(
                "No readings yet",
                Style::default().add_modifier(Modifier::DIM),
            )));
        }
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Esc to close",
        Style::default().add_modifier(Modifier::DIM),
    )));

    let block = Block::default()
        .title(format!(" {} ", record.device_id))
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));

    let width = 64u16.min(area.width.saturating_sub(4));
    let height = (lines.len() as u16 + 2).min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    let overlay_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, overlay_area);
    frame.render_widget(Paragraph::new(lines).block(block), overlay_area);
}

/// Render sparkline levels as a string of bar characters.
fn render_sparkline(levels: &[u8]) -> String {
    levels
        .iter()
        .map(|&level| SPARKLINE_CHARS[(level as usize).min(7)])
        .collect()
}
