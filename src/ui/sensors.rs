//! Sensor catalog view rendering.

use ratatui::{
    layout::{Constraint, Rect},
    widgets::{Block, Borders, Cell, Row, Table},
    Frame,
};

use crate::app::App;

/// Render the Sensors view: the immutable catalog for the session.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let header = Row::new(vec![
        Cell::from("Code"),
        Cell::from("Name"),
        Cell::from("Unit"),
        Cell::from("Icon"),
    ])
    .height(1)
    .style(app.theme.header);

    let rows: Vec<Row> = app
        .sensors
        .entries()
        .iter()
        .map(|sensor| {
            Row::new(vec![
                Cell::from(sensor.code.clone()),
                Cell::from(sensor.name.clone()),
                Cell::from(sensor.unit.clone().unwrap_or_else(|| "-".to_string())),
                Cell::from(sensor.icon.clone().unwrap_or_else(|| "-".to_string())),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(16),
            Constraint::Min(20),
            Constraint::Length(8),
            Constraint::Length(16),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .title(format!(" Sensors ({}) ", app.sensors.entries().len()))
            .borders(Borders::ALL)
            .border_type(app.theme.border_type),
    );

    frame.render_widget(table, area);
}
