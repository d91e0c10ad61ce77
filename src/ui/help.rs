use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span, Text},
};

use super::theme::Theme;

pub fn build_help_text() -> Text<'static> {
    let mut lines = Vec::new();

    lines.push(Line::from(Span::styled(
        "Key bindings",
        Style::default()
            .fg(Theme::accent())
            .add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(""));

    lines.push(section_title("Global"));
    lines.extend(section_lines(&[
        "q: Stop all timers, save and quit",
        "?: Toggle help",
        "Tab: Toggle focus (tab bar / content)",
        "l/t/h/s: Live, Stats, History, Students",
        "esc: Back",
    ]));

    lines.push(Line::from(""));
    lines.push(section_title("Live"));
    lines.extend(section_lines(&[
        "Up/Down: Select student",
        "space: Start/stop timer",
        "p: New passage",
        "a: Adjust time (+/-seconds or mm:ss)",
        "d: Remove last passage",
        "r: Reset student",
        "x: Stop all timers",
    ]));

    lines.push(Line::from(""));
    lines.push(section_title("Stats"));
    lines.extend(section_lines(&[
        "d/w/m: Day, week or month",
        "Left/Right: Previous/next period",
        "[/]: Previous/next month",
        "0: Back to today",
    ]));

    lines.push(Line::from(""));
    lines.push(section_title("History"));
    lines.extend(section_lines(&[
        "Left/Right or [/]: Change month",
        "Enter: Open session",
        "n: New extra session",
        "e: Set total (session)",
        "x: Remove student (session)",
        "a: Add roster (session)",
    ]));

    lines.push(Line::from(""));
    lines.push(section_title("Students"));
    lines.extend(section_lines(&["n: New student", "d: Delete student"]));

    Text::from(lines)
}

fn section_title(title: &str) -> Line<'static> {
    Line::from(Span::styled(
        format!("  {title}"),
        Style::default()
            .fg(Theme::secondary())
            .add_modifier(Modifier::BOLD),
    ))
}

fn section_lines(items: &[&str]) -> Vec<Line<'static>> {
    items
        .iter()
        .map(|item| {
            Line::from(Span::styled(
                format!("  - {item}"),
                Style::default().fg(Theme::text()),
            ))
        })
        .collect()
}
