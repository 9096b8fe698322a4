use paylink_sync::SyncStatus;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
    Frame,
};

use crate::app::*;

pub fn draw(f: &mut Frame, app: &App) {
    let area = f.area();
    f.render_widget(Clear, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(3),
        ])
        .split(area);

    draw_header(f, app, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(40), Constraint::Length(30)])
        .split(chunks[1]);
    draw_records(f, app, body[0]);
    draw_summary(f, app, body[1]);

    draw_status(f, app, chunks[2]);
}

fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let dur = app.session_duration();
    let header = Paragraph::new(Line::from(vec![
        Span::styled("  paylink-sync ", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
        Span::raw("│ "),
        Span::styled(app.provider.clone(), Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
        Span::raw(format!(" │ {} links", app.links.len())),
        Span::raw(format!(" │ {} runs", app.runs)),
        Span::raw(format!(" │ {} exported", app.exported_count)),
        Span::raw(format!(" │ {}m {}s", dur.num_minutes(), dur.num_seconds() % 60)),
    ]))
    .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Green)));
    f.render_widget(header, area);
}

fn draw_records(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Exported sessions ")
        .border_style(Style::default().fg(Color::DarkGray));

    if app.exported.is_empty() {
        let waiting = Paragraph::new(Line::from(vec![
            Span::styled("  Waiting for paid sessions", Style::default().fg(Color::DarkGray)),
            Span::styled(dots_animation(app.tick), Style::default().fg(Color::DarkGray)),
        ]))
        .block(block);
        f.render_widget(waiting, area);
        return;
    }

    // Newest first, only as many as fit.
    let visible = area.height.saturating_sub(3) as usize;
    let rows: Vec<Row> = app
        .exported
        .iter()
        .rev()
        .take(visible)
        .map(|r| {
            Row::new(vec![
                Cell::from(r.created.clone()),
                Cell::from(format!("{} {}", r.amount, r.currency)).style(Style::default().fg(Color::Yellow)),
                Cell::from(r.customer_name.clone().unwrap_or_else(|| "-".to_string())),
                Cell::from(r.customer_email.clone().unwrap_or_else(|| "-".to_string())),
                Cell::from(r.resource_id.clone()).style(Style::default().fg(Color::DarkGray)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(16),
            Constraint::Length(14),
            Constraint::Length(20),
            Constraint::Min(20),
            Constraint::Length(24),
        ],
    )
    .header(
        Row::new(vec!["Created", "Amount", "Name", "Email", "Payment link"])
            .style(Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
    )
    .block(block);
    f.render_widget(table, area);
}

fn draw_summary(f: &mut Frame, app: &App, area: Rect) {
    let mut lines = vec![
        Line::from(Span::styled("Totals", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))),
    ];
    if app.totals.is_empty() {
        lines.push(Line::from(Span::styled("  none yet", Style::default().fg(Color::DarkGray))));
    }
    for (currency, total) in &app.totals {
        lines.push(Line::from(format!("  {:>12} {}", total, currency)));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("Checkpoint", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))));
    lines.push(Line::from(format!("  {}", format_checkpoint(app.checkpoint))));

    lines.push(Line::from(""));
    lines.push(Line::from(format!("Snapshots: {}", app.snapshots_written)));
    lines.push(Line::from(format!("Failures:  {}", app.failures)));

    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL));
    f.render_widget(p, area);
}

fn draw_status(f: &mut Frame, app: &App, area: Rect) {
    let (text, color) = if let Some(ref err) = app.error_message {
        (format!(" ✗ {}", err), Color::Red)
    } else if app.state == RunState::Syncing {
        (format!(" Syncing{}", dots_animation(app.tick)), Color::Yellow)
    } else {
        match &app.last_run {
            Some(run) => (
                format!(
                    " {} at {} ({} new) │ every {}s │ r sync now  q quit",
                    status_label(run.status),
                    run.at.format("%H:%M:%S"),
                    run.records,
                    app.interval_secs
                ),
                Color::DarkGray,
            ),
            None => (format!(" every {}s │ r sync now  q quit", app.interval_secs), Color::DarkGray),
        }
    };

    let status = Paragraph::new(text)
        .style(Style::default().fg(color))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(status, area);
}

fn status_label(status: SyncStatus) -> &'static str {
    match status {
        SyncStatus::Success => "✓ exported",
        SyncStatus::NoNewData => "· no new data",
        SyncStatus::Error => "✗ failed",
    }
}

fn format_checkpoint(checkpoint: Option<i64>) -> String {
    match checkpoint.and_then(|ts| chrono::DateTime::from_timestamp(ts, 0)) {
        Some(at) => at
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => "not yet advanced".to_string(),
    }
}

fn dots_animation(tick: u32) -> String {
    match tick % 4 {
        0 => "".to_string(),
        1 => ".".to_string(),
        2 => "..".to_string(),
        _ => "...".to_string(),
    }
}
