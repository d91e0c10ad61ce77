use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span, Text},
};

use super::helpers::{clamp_name, format_clock};
use super::theme::Theme;
use crate::app::App;

pub fn build_live_text(app: &App) -> Text<'_> {
    let mut lines = Vec::new();
    let summary = app.live_summary();

    lines.push(section_title(&format!(
        "Session {}",
        app.engine.current_session_id()
    )));
    lines.push(Line::from(vec![
        Span::styled("  Total: ", Style::default().fg(Theme::dim())),
        Span::styled(format_clock(summary.total), Style::default().fg(Theme::accent())),
        Span::styled("   Average: ", Style::default().fg(Theme::dim())),
        Span::styled(format_clock(summary.average), Style::default().fg(Theme::accent())),
        Span::styled("   Spoke: ", Style::default().fg(Theme::dim())),
        Span::styled(
            format!("{}/{}", summary.participating, summary.roster_size),
            Style::default().fg(Theme::accent()),
        ),
        Span::styled("   Running: ", Style::default().fg(Theme::dim())),
        Span::styled(
            app.engine.running_count().to_string(),
            Style::default().fg(Theme::active()),
        ),
    ]));
    lines.push(Line::from(""));

    if app.students.is_empty() {
        lines.push(Line::from(Span::styled(
            "  No students yet. Press n to add one.",
            Style::default().fg(Theme::dim()),
        )));
        return Text::from(lines);
    }

    for (index, student) in app.students.iter().enumerate() {
        let selected = index == app.selected_student_index;
        let running = app.engine.is_running(&student.id);
        let result = app.current_result(&student.id);
        let total = result.map_or(0, |r| r.total);
        let passage_count = result.map_or(0, |r| r.passage_count());
        let current = result.map_or(0, |r| r.current_passage());

        let marker_style = Style::default()
            .fg(Theme::selection_marker())
            .add_modifier(Modifier::BOLD);
        let name_style = if selected {
            Style::default()
                .fg(Theme::highlight())
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Theme::text())
        };
        let state = if running {
            Span::styled(
                "● ",
                Style::default()
                    .fg(Theme::active())
                    .add_modifier(Modifier::BOLD),
            )
        } else {
            Span::styled("○ ", Style::default().fg(Theme::dim()))
        };

        let mut spans = vec![
            Span::styled(if selected { "> " } else { "  " }, marker_style),
            state,
            Span::styled(clamp_name(&student.name, 20), name_style),
            Span::raw("  "),
            Span::styled(
                format_clock(total),
                Style::default().fg(if running { Theme::active() } else { Theme::text() }),
            ),
        ];
        if passage_count > 0 {
            spans.push(Span::styled(
                format!("   Passage {passage_count}: {}", format_clock(current)),
                Style::default().fg(Theme::dim()),
            ));
        }
        if let Some(previous) = result.and_then(|r| r.previous_passage()) {
            spans.push(Span::styled(
                format!("   last {}", format_clock(previous)),
                Style::default().fg(Theme::dim()),
            ));
        }
        lines.push(Line::from(spans));
    }

    Text::from(lines)
}

pub(super) fn section_title(title: &str) -> Line<'static> {
    Line::from(Span::styled(
        format!("  {title}"),
        Style::default()
            .fg(Theme::secondary())
            .add_modifier(Modifier::BOLD),
    ))
}
