use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span, Text},
};

use super::helpers::{bar, clamp_name, format_clock, format_duration};
use super::live::section_title;
use super::theme::Theme;
use crate::app::App;
use crate::stats::{PeriodKind, Trend};

pub fn build_stats_text(app: &App) -> Text<'_> {
    let report = app.report();
    let mut lines = Vec::new();

    lines.push(Line::from(vec![
        Span::styled(
            format!("  {} ", report.kind.label()),
            Style::default()
                .fg(Theme::accent())
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(report.range.label(), Style::default().fg(Theme::text())),
        Span::styled(
            format!("   vs {}", report.previous_range.label()),
            Style::default().fg(Theme::dim()),
        ),
    ]));
    lines.push(Line::from(""));

    lines.push(section_title("Summary"));
    lines.push(Line::from(Span::styled(
        "  ─────────",
        Style::default().fg(Theme::dim()),
    )));
    let trends = report.trends;
    lines.push(metric_line(
        "Total time",
        format_duration(report.totals.total_time),
        trends.total_time,
    ));
    lines.push(metric_line(
        "Active students",
        report.totals.active_students.len().to_string(),
        trends.active_students,
    ));
    lines.push(metric_line(
        "Interventions",
        report.totals.sessions_count.to_string(),
        trends.sessions_count,
    ));
    lines.push(metric_line(
        "Avg per student",
        format_clock(report.averages.per_active_student),
        trends.average_per_student,
    ));
    lines.push(metric_line(
        "Avg per intervention",
        format_clock(report.averages.per_intervention),
        trends.average_per_intervention,
    ));
    lines.push(metric_line(
        "Avg per day",
        format_clock(report.averages.per_day),
        trends.average_per_day,
    ));
    lines.push(Line::from(""));

    if report.kind != PeriodKind::Day {
        lines.push(section_title("Minutes per day"));
        let max = report.series.iter().map(|p| p.minutes).max().unwrap_or(0);
        for point in &report.series {
            let label = match report.kind {
                PeriodKind::Week => point.day.format("%a %d").to_string(),
                _ => point.day.format("%d").to_string(),
            };
            lines.push(Line::from(vec![
                Span::styled(format!("  {label:<6} "), Style::default().fg(Theme::dim())),
                Span::styled(bar(point.minutes, max, 30), Style::default().fg(Theme::accent())),
                Span::styled(format!(" {}", point.minutes), Style::default().fg(Theme::text())),
            ]));
        }
        lines.push(Line::from(""));
    }

    lines.push(section_title("Ranking"));
    if report.ranking.is_empty() {
        lines.push(Line::from(Span::styled(
            "  Nobody spoke in this period.",
            Style::default().fg(Theme::dim()),
        )));
    }
    for (position, entry) in report.ranking.iter().enumerate() {
        lines.push(Line::from(vec![
            Span::styled(
                format!("  {:>2}. ", position + 1),
                Style::default().fg(Theme::dim()),
            ),
            Span::styled(clamp_name(&entry.label, 20), Style::default().fg(Theme::text())),
            Span::styled(
                format!("  {}", format_duration(entry.seconds)),
                Style::default().fg(Theme::accent()),
            ),
            Span::styled(
                format!("  ({} interventions)", entry.interventions),
                Style::default().fg(Theme::dim()),
            ),
        ]));
    }

    Text::from(lines)
}

fn metric_line(label: &str, value: String, trend: Trend) -> Line<'static> {
    let (arrow, color) = match trend {
        Trend::Better => ("▲ better", Theme::better()),
        Trend::Worse => ("▼ worse", Theme::warn()),
        Trend::Unchanged => ("= same", Theme::dim()),
    };
    Line::from(vec![
        Span::styled(format!("  {label:<22}"), Style::default().fg(Theme::dim())),
        Span::styled(format!("{value:>10}"), Style::default().fg(Theme::text())),
        Span::styled(format!("  {arrow}"), Style::default().fg(color)),
    ])
}
