pub mod helpers;
mod help;
mod history;
mod live;
mod stats;
mod students;
mod theme;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    prelude::Alignment,
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
};

use crate::app::{App, AppView, FocusMode, Popup, TABS};
use crate::sync::SyncStatus;
use theme::Theme;

use helpers::{clamp_name, format_clock};

/// Renders the entire UI for a single frame.
pub fn draw(frame: &mut Frame, app: &App) {
    let area = frame.area();
    let body_text = match app.view {
        AppView::Live => live::build_live_text(app),
        AppView::Stats => stats::build_stats_text(app),
        AppView::History => history::build_history_text(app),
        AppView::SessionDetail => history::build_session_detail_text(app),
        AppView::Students => students::build_students_text(app),
        AppView::Help => help::build_help_text(),
    };

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(3),
        ])
        .split(area);

    let header_lines = vec![Line::from(vec![
        Span::styled(
            "  Speakr  ",
            Style::default().fg(Color::Black).bg(Theme::primary()),
        ),
        Span::raw(" "),
        Span::styled(
            "speaking time",
            Style::default()
                .fg(Theme::secondary())
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        sync_span(app.sync_status),
    ])];
    let header = Paragraph::new(Text::from(header_lines))
        .alignment(Alignment::Left)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .style(Style::default().fg(Theme::secondary())),
        );
    frame.render_widget(header, layout[0]);

    let mut body_lines = vec![
        tabs_line(app),
        Line::from(""),
        Line::from(Span::styled(
            format!("  {}", app.view.title()),
            Style::default()
                .fg(Theme::accent())
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    body_lines.extend(body_text.lines);
    body_lines.push(Line::from(""));
    if let Some(status) = &app.status {
        body_lines.push(Line::from(Span::styled(
            format!("  {status}"),
            Style::default().fg(Theme::warn()),
        )));
    }
    body_lines.push(Line::from(Span::styled(
        "----------------------------------------",
        Style::default().fg(Theme::dim()),
    )));
    body_lines.extend(keybinds_lines(app));
    let body = Paragraph::new(Text::from(body_lines))
        .style(Style::default().fg(Theme::text()))
        .alignment(Alignment::Left)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .style(Style::default().fg(Theme::secondary())),
        );
    frame.render_widget(body, layout[1]);

    let footer = Paragraph::new(Text::from(running_timers_line(app)))
        .alignment(Alignment::Left)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .style(Style::default().fg(Theme::secondary())),
        );
    frame.render_widget(footer, layout[2]);

    if let Some(popup) = &app.popup {
        render_popup(frame, popup);
    }
}

fn render_popup(frame: &mut Frame, popup: &Popup) {
    let area = centered_rect(60, 30, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(Span::styled(
            popup.title.as_str(),
            Style::default()
                .fg(Theme::accent())
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("> ", Style::default().fg(Theme::selection_marker())),
            Span::styled(
                popup.input.as_str(),
                Style::default()
                    .fg(Theme::highlight())
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(""),
        Line::from(Span::styled(popup.hint(), Style::default().fg(Theme::dim()))),
        Line::from(Span::styled(
            "Enter: save. Esc: cancel.",
            Style::default().fg(Theme::dim()),
        )),
    ];

    let widget = Paragraph::new(Text::from(lines))
        .alignment(Alignment::Left)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .style(Style::default().fg(Theme::secondary())),
        );
    frame.render_widget(widget, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn sync_span(status: SyncStatus) -> Span<'static> {
    let style = match status {
        SyncStatus::Unsynced => Style::default()
            .fg(Theme::warn())
            .add_modifier(Modifier::BOLD),
        SyncStatus::Online => Style::default().fg(Theme::active()),
        SyncStatus::Local => Style::default().fg(Theme::dim()),
    };
    Span::styled(format!("[{}]", status.label()), style)
}

fn tabs_line(app: &App) -> Line<'_> {
    let mut spans = Vec::new();
    for (index, view) in TABS.iter().enumerate() {
        if index > 0 {
            spans.push(Span::raw("  "));
        }
        let active = match app.view {
            AppView::SessionDetail => *view == AppView::History,
            _ => *view == app.view,
        };
        let focused = app.focus_mode == FocusMode::TabBar && app.selected_tab_index == index;
        let style = if active {
            Style::default()
                .fg(Color::Black)
                .bg(Theme::highlight())
                .add_modifier(Modifier::BOLD)
        } else if focused {
            Style::default()
                .fg(Theme::highlight())
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Theme::dim())
        };
        spans.push(Span::styled(format!(" {} ", view.title()), style));
    }

    Line::from(spans)
}

fn running_timers_line(app: &App) -> Line<'_> {
    let mut running: Vec<_> = app.engine.running().collect();
    if running.is_empty() {
        return Line::from(Span::styled(
            "● No timer running",
            Style::default().fg(Theme::dim()),
        ));
    }
    running.sort_by_key(|student_id| app.student_name(student_id).to_lowercase());

    let mut spans = vec![Span::styled(
        "● ",
        Style::default()
            .fg(Theme::active())
            .add_modifier(Modifier::BOLD),
    )];
    for (index, student_id) in running.into_iter().enumerate() {
        if index > 0 {
            spans.push(Span::raw("  "));
        }
        let passage = app
            .current_result(student_id)
            .map(|result| result.current_passage())
            .unwrap_or(0);
        spans.push(Span::styled(
            clamp_name(app.student_name(student_id), 16),
            Style::default()
                .fg(Theme::text())
                .add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::styled(
            format!(" {}", format_clock(passage)),
            Style::default()
                .fg(Theme::active())
                .add_modifier(Modifier::BOLD),
        ));
    }
    Line::from(spans)
}

fn keybinds_lines(app: &App) -> Vec<Line<'static>> {
    let focus_hint = if app.focus_mode == FocusMode::TabBar {
        "Tab: Switch to content  ←/→: Navigate tabs  Enter: Select"
    } else {
        "Tab: Switch to tab bar  l/t/h/s: Quick nav"
    };

    let (primary, secondary) = match app.view {
        AppView::Live => (
            "Up/Down: Select  space: Start/Stop  p: Passage  a: Adjust  r: Reset",
            "d: Drop passage  x: Stop all  n: New student  ?: Help  q: Quit",
        ),
        AppView::Stats => (
            "d/w/m: Period  ←/→: Previous/Next  [/]: Month  0: Today",
            "?: Help  q: Quit",
        ),
        AppView::History => (
            "Up/Down: Select  Enter: Open  ←/→: Month  n: New session",
            "?: Help  q: Quit",
        ),
        AppView::SessionDetail => (
            "Up/Down: Select  e: Set total  x: Remove  a: Add roster",
            "esc: Back  ?: Help  q: Quit",
        ),
        AppView::Students => ("Up/Down: Select  n: New  d: Delete", "?: Help  q: Quit"),
        AppView::Help => ("Press ? or ESC to close this help screen", ""),
    };
    vec![
        Line::from(Span::styled(
            focus_hint,
            Style::default().fg(Theme::highlight()),
        )),
        Line::from(Span::styled(primary, Style::default().fg(Theme::dim()))),
        Line::from(Span::styled(secondary, Style::default().fg(Theme::dim()))),
    ]
}
