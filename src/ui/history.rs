use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span, Text},
};

use super::helpers::{clamp_name, format_clock, format_duration};
use super::live::section_title;
use super::theme::Theme;
use crate::app::App;

pub fn build_history_text(app: &App) -> Text<'_> {
    let mut lines = Vec::new();
    let sessions = app.history_sessions();

    lines.push(section_title(&format!("Sessions of {}", app.history_month)));
    lines.push(Line::from(""));
    if sessions.is_empty() {
        lines.push(Line::from(Span::styled(
            "  No sessions this month.",
            Style::default().fg(Theme::dim()),
        )));
    }

    for (index, session) in sessions.iter().enumerate() {
        let selected = index == app.selected_session_index;
        let spoke = session
            .results
            .iter()
            .filter(|(_, result)| result.is_active())
            .count();
        let kind = if session.is_supplementary() {
            "extra"
        } else {
            "day"
        };
        lines.push(Line::from(vec![
            Span::styled(
                if selected { "> " } else { "  " },
                Style::default()
                    .fg(Theme::selection_marker())
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("{} {:<5}", session.day_id(), kind),
                if selected {
                    Style::default()
                        .fg(Theme::highlight())
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Theme::text())
                },
            ),
            Span::styled(
                format!("  {}", format_duration(session.recorded_seconds())),
                Style::default().fg(Theme::accent()),
            ),
            Span::styled(
                format!("  {spoke} spoke"),
                Style::default().fg(Theme::dim()),
            ),
        ]));
    }

    Text::from(lines)
}

pub fn build_session_detail_text(app: &App) -> Text<'_> {
    let mut lines = Vec::new();
    let Some(session) = app.selected_session() else {
        lines.push(Line::from("  Session not found."));
        return Text::from(lines);
    };

    lines.push(section_title(&format!("Session {}", session.id)));
    lines.push(Line::from(Span::styled(
        format!("  Total {}", format_duration(session.recorded_seconds())),
        Style::default().fg(Theme::accent()),
    )));
    lines.push(Line::from(""));

    if session.results.is_empty() {
        lines.push(Line::from(Span::styled(
            "  No results. Press a to add the roster.",
            Style::default().fg(Theme::dim()),
        )));
    }

    for (index, (student_id, result)) in session.results.iter().enumerate() {
        let selected = index == app.selected_result_index;
        let passages = result
            .passages
            .iter()
            .map(|p| format_clock(*p))
            .collect::<Vec<_>>()
            .join(" + ");
        let mut spans = vec![
            Span::styled(
                if selected { "> " } else { "  " },
                Style::default()
                    .fg(Theme::selection_marker())
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                clamp_name(app.student_name(student_id), 20),
                if selected {
                    Style::default()
                        .fg(Theme::highlight())
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Theme::text())
                },
            ),
            Span::styled(
                format!("  {}", format_clock(result.total)),
                Style::default().fg(Theme::accent()),
            ),
            Span::styled(format!("  {passages}"), Style::default().fg(Theme::dim())),
        ];
        if !result.is_consistent() {
            spans.push(Span::styled(" *", Style::default().fg(Theme::warn())));
        }
        lines.push(Line::from(spans));
    }

    Text::from(lines)
}
