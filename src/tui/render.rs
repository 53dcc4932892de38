use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols;
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Axis, Block, Borders, Chart, Clear, Dataset, GraphType, List, ListItem, Paragraph, Wrap,
};
use serde_json::Value;

use crate::feed::ConnectionState;
use crate::model::{NoticeLevel, Series};

use super::app::{App, Modal};

pub(super) fn draw(frame: &mut ratatui::Frame, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Percentage(45),
            Constraint::Min(6),
            Constraint::Length(3),
        ])
        .split(frame.area());

    draw_header(frame, app, rows[0]);

    let charts = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);
    draw_series(frame, "Packets", &app.view.packets, Color::Cyan, charts[0]);
    draw_series(frame, "Anomalies", &app.view.anomalies, Color::Red, charts[1]);

    let panels = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(35),
            Constraint::Percentage(35),
            Constraint::Percentage(30),
        ])
        .split(rows[2]);
    draw_backups(frame, app, panels[0]);
    draw_system(frame, app, panels[1]);
    draw_lists(frame, app, panels[2]);

    draw_footer(frame, app, rows[3]);

    if let Some(modal) = &app.modal {
        draw_modal(frame, modal);
    }
}

fn draw_header(frame: &mut ratatui::Frame, app: &App, area: Rect) {
    let (label, color) = match app.view.connection {
        ConnectionState::Connected => ("live", Color::Green),
        ConnectionState::Connecting => ("connecting", Color::Yellow),
        ConnectionState::Disconnected => ("offline", Color::Red),
    };
    let mut spans = vec![
        Span::styled("WIRES", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("  "),
        Span::styled(label, Style::default().fg(color)),
        Span::raw("  "),
        Span::styled(app.base_url.as_str(), Style::default().fg(Color::Gray)),
        Span::raw("  "),
        Span::styled(app.feed_url.as_str(), Style::default().fg(Color::Gray)),
    ];
    if app.view.loading {
        spans.push(Span::raw("  "));
        spans.push(Span::styled("loading...", Style::default().fg(Color::Yellow)));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_series(frame: &mut ratatui::Frame, title: &str, series: &Series, color: Color, area: Rect) {
    let latest = series
        .values
        .last()
        .map(|v| format!("{} (latest {})", title, v))
        .unwrap_or_else(|| title.to_string());
    let block = Block::default().borders(Borders::ALL).title(latest);

    if series.is_empty() {
        frame.render_widget(
            Paragraph::new("waiting for samples").block(block),
            area,
        );
        return;
    }

    let points: Vec<(f64, f64)> = series
        .values
        .iter()
        .enumerate()
        .map(|(i, v)| (i as f64, *v))
        .collect();
    let max = series.values.iter().copied().fold(0.0_f64, f64::max).max(1.0);
    let x_max = (points.len().saturating_sub(1)).max(1) as f64;

    let first = series.labels.first().map(|t| t.to_string()).unwrap_or_default();
    let last = series.labels.last().map(|t| t.to_string()).unwrap_or_default();

    let dataset = Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(color))
        .data(&points);
    let chart = Chart::new(vec![dataset])
        .block(block)
        .x_axis(
            Axis::default()
                .bounds([0.0, x_max])
                .labels(vec![Span::raw(first), Span::raw(last)]),
        )
        .y_axis(
            Axis::default()
                .bounds([0.0, max])
                .labels(vec![Span::raw("0"), Span::raw(format!("{:.0}", max))]),
        );
    frame.render_widget(chart, area);
}

fn draw_backups(frame: &mut ratatui::Frame, app: &App, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title("Backups");
    if app.view.packet_backups.is_none() && app.view.anomaly_backups.is_none() {
        frame.render_widget(Paragraph::new("loading...").block(block), area);
        return;
    }
    let items: Vec<ListItem> = app
        .view
        .backup_rows()
        .into_iter()
        .map(|(kind, file)| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<8}", kind.label()),
                    Style::default().fg(Color::Yellow),
                ),
                Span::raw(file.to_string()),
            ]))
        })
        .collect();
    if items.is_empty() {
        frame.render_widget(Paragraph::new("no backups").block(block), area);
    } else {
        frame.render_widget(List::new(items).block(block), area);
    }
}

fn draw_system(frame: &mut ratatui::Frame, app: &App, area: Rect) {
    let mut lines = Vec::new();
    for (title, doc) in [
        ("info", &app.view.system_info),
        ("summary", &app.view.system_summary),
    ] {
        lines.push(Line::from(Span::styled(
            title,
            Style::default().add_modifier(Modifier::BOLD),
        )));
        match doc {
            None => lines.push(Line::from("  loading...")),
            Some(doc) => lines.extend(document_lines(doc).into_iter().map(Line::from)),
        }
    }
    frame.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title("System")),
        area,
    );
}

/// Flattens a system document into `key: value` lines. Nested values are shown
/// as compact JSON.
fn document_lines(doc: &Value) -> Vec<String> {
    match doc {
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| match v {
                Value::String(s) => format!("  {}: {}", k, s),
                other => format!("  {}: {}", k, other),
            })
            .collect(),
        other => vec![format!("  {}", other)],
    }
}

fn draw_lists(frame: &mut ratatui::Frame, app: &App, area: Rect) {
    let mut lines = vec![Line::from(Span::styled(
        "blacklist",
        Style::default().fg(Color::Red),
    ))];
    lines.extend(app.view.blacklist.iter().map(|ip| Line::from(format!("  {}", ip))));
    lines.push(Line::from(Span::styled(
        "whitelist",
        Style::default().fg(Color::Green),
    )));
    lines.extend(app.view.whitelist.iter().map(|ip| Line::from(format!("  {}", ip))));
    frame.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Access")),
        area,
    );
}

fn draw_footer(frame: &mut ratatui::Frame, app: &App, area: Rect) {
    let notice = match app.view.latest_notice() {
        Some(n) => {
            let color = match n.level {
                NoticeLevel::Info => Color::Green,
                NoticeLevel::Error => Color::Red,
            };
            Line::from(Span::styled(n.text.as_str(), Style::default().fg(color)))
        }
        None => Line::from(""),
    };
    let keys = Line::from(Span::styled(
        "q quit  r reload  p/a backup  b/B w/W lists  R reboot  S shutdown  C clear",
        Style::default().fg(Color::Gray),
    ));
    frame.render_widget(
        Paragraph::new(vec![notice, keys]).block(Block::default().borders(Borders::TOP)),
        area,
    );
}

fn draw_modal(frame: &mut ratatui::Frame, modal: &Modal) {
    let area = frame.area();
    let w = area.width.saturating_sub(6).clamp(20, 60);
    let h = 5;
    let box_area = Rect {
        x: area.x + (area.width.saturating_sub(w)) / 2,
        y: area.y + (area.height.saturating_sub(h)) / 2,
        width: w,
        height: h.min(area.height),
    };

    frame.render_widget(Clear, box_area);
    let block = Block::default().borders(Borders::ALL).title(modal.title());
    let inner = block.inner(box_area);
    frame.render_widget(block, box_area);

    match modal {
        Modal::Confirm { command } => {
            frame.render_widget(
                Paragraph::new(vec![
                    Line::from(format!("{} takes effect immediately.", command.describe())),
                    Line::from("y to confirm, any other key to cancel"),
                ])
                .wrap(Wrap { trim: false }),
                inner,
            );
        }
        Modal::ListEntry { input, .. } => {
            frame.render_widget(
                Paragraph::new(vec![
                    Line::from("IPv4 address, Enter to send, Esc to cancel"),
                    Line::from(input.buf.as_str()),
                ]),
                inner,
            );
            frame.set_cursor_position((inner.x + input.cursor as u16, inner.y + 1));
        }
    }
}
