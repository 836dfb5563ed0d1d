//! Devices view rendering.
//!
//! Displays a table of all known devices with derived liveness badges.
//! Rows mutated within the last second are rendered with the pulse style,
//! the terminal equivalent of the card flash in a browser dashboard.

use chrono::{DateTime, Utc};
use ratatui::{
    layout::{Constraint, Rect},
    widgets::{Block, Borders, Cell, Row, Table, TableState},
    Frame,
};

use super::common::{format_age, format_uptime};
use crate::app::{App, DeviceRow};

/// Render the Devices view.
pub fn render(frame: &mut Frame, app: &mut App, area: Rect, now: DateTime<Utc>) {
    let rows_data = app.visible_rows();

    let header = Row::new(vec![
        Cell::from("Device"),
        Cell::from("Model"),
        Cell::from("Location"),
        Cell::from("IP"),
        Cell::from("Uptime"),
        Cell::from("Reading"),
        Cell::from("Updated"),
        Cell::from("Status"),
    ])
    .height(1)
    .style(app.theme.header);

    let rows: Vec<Row> = rows_data
        .iter()
        .map(|row| {
            let record = &row.record;
            let status_cell = Cell::from(if row.online { "ONLINE" } else { "OFFLINE" })
                .style(app.theme.online_style(row.online));

            // Uptime is only meaningful while the device is reporting.
            let uptime = match (record.uptime, row.online) {
                (Some(secs), true) => format_uptime(secs),
                _ => "-".to_string(),
            };

            let table_row = Row::new(vec![
                Cell::from(record.device_id.clone()),
                Cell::from(record.model.clone().unwrap_or_else(|| "-".to_string())),
                Cell::from(record.location.clone().unwrap_or_else(|| "-".to_string())),
                Cell::from(record.ip_addr.clone().unwrap_or_else(|| "-".to_string())),
                Cell::from(uptime),
                Cell::from(reading_summary(row, app)),
                Cell::from(format_age(record.last_status_update, now)),
                status_cell,
            ]);

            if record.recently_updated(now) {
                table_row.style(app.theme.pulse)
            } else {
                table_row
            }
        })
        .collect();

    let count = rows_data.len();
    let title = if app.show_only_online {
        format!(" Devices ({count}, online only) ")
    } else {
        format!(" Devices ({count}) ")
    };

    let table = Table::new(
        rows,
        [
            Constraint::Min(14),
            Constraint::Length(16),
            Constraint::Length(14),
            Constraint::Length(15),
            Constraint::Length(9),
            Constraint::Min(18),
            Constraint::Length(9),
            Constraint::Length(8),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_type(app.theme.border_type),
    )
    .row_highlight_style(app.theme.selected);

    let mut state = TableState::default();
    if !rows_data.is_empty() {
        state.select(Some(app.selected_index.min(rows_data.len() - 1)));
    }

    frame.render_stateful_widget(table, area, &mut state);
}

/// Compact latest-reading summary for the table (first two sensor values).
fn reading_summary(row: &DeviceRow, app: &App) -> String {
    let Some(reading) = &row.record.last_reading else {
        return "-".to_string();
    };
    if reading.values.is_empty() {
        return "-".to_string();
    }

    let mut parts: Vec<String> = reading
        .values
        .iter()
        .take(2)
        .map(|(code, value)| {
            format!(
                "{} {}",
                app.sensors.display_name(code),
                app.sensors.format_value(code, *value)
            )
        })
        .collect();
    if reading.values.len() > 2 {
        parts.push("…".to_string());
    }
    parts.join("  ")
}
